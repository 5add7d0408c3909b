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
use bson::doc;
use log::debug;
use crate::app_context::AppContext;
use crate::errors::Result;
use crate::handlers::Handler;
use crate::reply::Reply;
use crate::request::DeleteRequest;

pub(crate) struct DeleteHandler;

#[async_trait]
impl Handler for DeleteHandler {

    type Request = DeleteRequest;

    async fn handle(&self, ctx: &AppContext, request: DeleteRequest) -> Result<Reply> {
        let deleted = ctx
            .store()
            .remove(&request.collection, request.matcher, request.write_concern)
            .await?;
        debug!("deleted {} documents from {}", deleted, request.collection);

        Ok(Reply::ok_with(doc! { "number": deleted as i64 }))
    }

}
