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
use crate::app_context::AppContext;
use crate::errors::Result;
use crate::handlers::Handler;
use crate::reply::Reply;
use crate::request::FindAndModifyRequest;
use crate::store::FindAndModify;

pub(crate) struct FindAndModifyHandler;

#[async_trait]
impl Handler for FindAndModifyHandler {

    type Request = FindAndModifyRequest;

    async fn handle(&self, ctx: &AppContext, request: FindAndModifyRequest) -> Result<Reply> {
        let modify = FindAndModify {
            matcher: request.matcher,
            update: request.update,
            sort: request.sort,
            return_new: request.return_new,
        };
        let result = ctx.store().find_and_modify(&request.collection, modify).await?;

        let reply = match result {
            Some(result) => Reply::ok_with(doc! { "result": result }),
            None => Reply::ok(),
        };
        Ok(reply)
    }

}
