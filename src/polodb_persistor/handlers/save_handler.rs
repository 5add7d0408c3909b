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
use crate::request::SaveRequest;
use crate::store::Saved;

pub(crate) struct SaveHandler;

#[async_trait]
impl Handler for SaveHandler {

    type Request = SaveRequest;

    async fn handle(&self, ctx: &AppContext, request: SaveRequest) -> Result<Reply> {
        let saved = ctx
            .store()
            .insert_or_upsert(&request.collection, request.document, request.write_concern)
            .await?;
        debug!("save into {}: {:?}", request.collection, saved);

        let reply = match saved {
            Saved::Generated(id) => Reply::ok_with(doc! { "_id": id }),
            Saved::Inserted | Saved::Replaced => Reply::ok(),
        };
        Ok(reply)
    }

}
