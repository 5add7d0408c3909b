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

mod save_handler;
mod update_handler;
mod find_handler;
mod continue_handler;
mod close_handler;
mod find_one_handler;
mod delete_handler;
mod count_handler;
mod aggregate_handler;
mod find_and_modify_handler;
mod collection_handlers;

use async_trait::async_trait;
use crate::app_context::AppContext;
use crate::errors::Result;
use crate::reply::Reply;
use crate::request::Request;

pub(crate) use save_handler::SaveHandler;
pub(crate) use update_handler::UpdateHandler;
pub(crate) use find_handler::FindHandler;
pub(crate) use continue_handler::ContinueHandler;
pub(crate) use close_handler::CloseHandler;
pub(crate) use find_one_handler::FindOneHandler;
pub(crate) use delete_handler::DeleteHandler;
pub(crate) use count_handler::CountHandler;
pub(crate) use aggregate_handler::AggregateHandler;
pub(crate) use find_and_modify_handler::FindAndModifyHandler;
pub(crate) use collection_handlers::{CollectionStatsHandler, DropCollectionHandler, GetCollectionsHandler};

#[async_trait]
pub(crate) trait Handler: Send + Sync {

    type Request: Send + 'static;

    async fn handle(&self, ctx: &AppContext, request: Self::Request) -> Result<Reply>;

}

/// Routes a validated request to its handler.
pub(crate) async fn dispatch(ctx: &AppContext, request: Request) -> Result<Reply> {
    match request {
        Request::Save(req) => SaveHandler.handle(ctx, req).await,
        Request::Update(req) => UpdateHandler.handle(ctx, req).await,
        Request::Find(req) => FindHandler.handle(ctx, req).await,
        Request::Continue { cursor_id } => ContinueHandler.handle(ctx, cursor_id).await,
        Request::Close { cursor_id } => CloseHandler.handle(ctx, cursor_id).await,
        Request::FindOne(req) => FindOneHandler.handle(ctx, req).await,
        Request::Delete(req) => DeleteHandler.handle(ctx, req).await,
        Request::Count(req) => CountHandler.handle(ctx, req).await,
        Request::Aggregate(req) => AggregateHandler.handle(ctx, req).await,
        Request::FindAndModify(req) => FindAndModifyHandler.handle(ctx, req).await,
        Request::DropCollection { collection } => DropCollectionHandler.handle(ctx, collection).await,
        Request::GetCollections => GetCollectionsHandler.handle(ctx, ()).await,
        Request::CollectionStats { collection } => CollectionStatsHandler.handle(ctx, collection).await,
    }
}
