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

//! Collection administration: drop, list and stats.

use async_trait::async_trait;
use bson::doc;
use log::info;
use crate::app_context::AppContext;
use crate::errors::Result;
use crate::handlers::Handler;
use crate::reply::Reply;

pub(crate) struct DropCollectionHandler;

#[async_trait]
impl Handler for DropCollectionHandler {

    type Request = String;

    async fn handle(&self, ctx: &AppContext, collection: String) -> Result<Reply> {
        ctx.store().drop_collection(&collection).await?;
        info!("collection dropped: {}", collection);
        Ok(Reply::ok())
    }

}

pub(crate) struct GetCollectionsHandler;

#[async_trait]
impl Handler for GetCollectionsHandler {

    type Request = ();

    async fn handle(&self, ctx: &AppContext, _request: ()) -> Result<Reply> {
        let collections = ctx.store().list_collections().await?;
        Ok(Reply::ok_with(doc! { "collections": collections }))
    }

}

pub(crate) struct CollectionStatsHandler;

#[async_trait]
impl Handler for CollectionStatsHandler {

    type Request = String;

    async fn handle(&self, ctx: &AppContext, collection: String) -> Result<Reply> {
        let stats = ctx.store().stats(&collection).await?;
        Ok(Reply::ok_with(doc! { "stats": stats }))
    }

}
