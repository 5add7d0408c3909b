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
use crate::app_context::AppContext;
use crate::errors::{Error, Result};
use crate::handlers::{FindHandler, Handler};
use crate::reply::Reply;

/// Serves the next batch of a parked cursor.
pub(crate) struct ContinueHandler;

#[async_trait]
impl Handler for ContinueHandler {

    type Request = i64;

    async fn handle(&self, ctx: &AppContext, cursor_id: i64) -> Result<Reply> {
        let cursor = ctx
            .cursors()
            .take(cursor_id)
            .ok_or(Error::CursorNotFound(cursor_id))?;
        FindHandler::send_batch(ctx, cursor, Some(cursor_id)).await
    }

}
