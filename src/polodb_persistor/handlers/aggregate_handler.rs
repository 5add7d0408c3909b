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
use bson::{doc, Bson};
use log::debug;
use crate::app_context::AppContext;
use crate::errors::Result;
use crate::handlers::Handler;
use crate::reply::Reply;
use crate::request::AggregateRequest;

pub(crate) struct AggregateHandler;

#[async_trait]
impl Handler for AggregateHandler {

    type Request = AggregateRequest;

    async fn handle(&self, ctx: &AppContext, request: AggregateRequest) -> Result<Reply> {
        debug!("aggregate on {} with {} stages", request.collection, request.pipelines.len());
        let results = ctx
            .store()
            .run_aggregation(&request.collection, request.pipelines)
            .await?;

        let results: Vec<Bson> = results.into_iter().map(Bson::Document).collect();
        Ok(Reply::ok_with(doc! { "results": results }))
    }

}
