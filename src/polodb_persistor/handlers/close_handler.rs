// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use log::debug;
use crate::app_context::AppContext;
use crate::errors::{Error, Result};
use crate::handlers::Handler;
use crate::reply::Reply;

/// Releases a parked cursor the client no longer wants.
pub(crate) struct CloseHandler;

#[async_trait]
impl Handler for CloseHandler {

    type Request = i64;

    async fn handle(&self, ctx: &AppContext, cursor_id: i64) -> Result<Reply> {
        if ctx.cursors().remove(&[cursor_id]) == 0 {
            return Err(Error::CursorNotFound(cursor_id));
        }
        debug!("cursor closed: {}", cursor_id);
        Ok(Reply::ok())
    }

}
