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
use crate::cursors::OpenCursor;
use crate::errors::Result;
use crate::handlers::Handler;
use crate::reply::Reply;
use crate::request::FindOneRequest;
use crate::store::FindQuery;

pub(crate) struct FindOneHandler;

#[async_trait]
impl Handler for FindOneHandler {

    type Request = FindOneRequest;

    async fn handle(&self, ctx: &AppContext, request: FindOneRequest) -> Result<Reply> {
        let query = FindQuery {
            matcher: request.matcher,
            sort: request.sort,
            skip: None,
            limit: Some(1),
            projection: request.keys,
        };
        let cursor = ctx.store().query(&request.collection, query).await?;
        let cursor = OpenCursor::new(cursor, Some(1), ctx.settings().cursor_timeout);
        let (_, batch) = cursor.next_batch().await?;

        let reply = match batch.documents.into_iter().next() {
            Some(result) => Reply::ok_with(doc! { "result": result }),
            None => Reply::ok(),
        };
        Ok(reply)
    }

}
