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
use crate::request::UpdateRequest;

pub(crate) struct UpdateHandler;

#[async_trait]
impl Handler for UpdateHandler {

    type Request = UpdateRequest;

    async fn handle(&self, ctx: &AppContext, request: UpdateRequest) -> Result<Reply> {
        let number = ctx
            .store()
            .update(
                &request.collection,
                request.criteria,
                request.update,
                request.upsert,
                request.multi,
                request.write_concern,
            )
            .await?;
        debug!("update on {}: {} written", request.collection, number);

        Ok(Reply::ok_with(doc! { "number": number as i64 }))
    }

}
