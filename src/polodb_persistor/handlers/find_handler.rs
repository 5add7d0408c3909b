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
use crate::cursors::{CursorState, OpenCursor};
use crate::errors::Result;
use crate::handlers::Handler;
use crate::reply::Reply;
use crate::request::FindRequest;
use crate::store::FindQuery;

pub(crate) struct FindHandler;

impl FindHandler {

    /// Fetches one batch from `cursor` and builds the reply.
    ///
    /// A cursor with documents left is parked under `cursor_id` (or a new
    /// handle) and the reply is `more-exist`; an exhausted cursor is dropped.
    pub(crate) async fn send_batch(ctx: &AppContext, cursor: OpenCursor, cursor_id: Option<i64>) -> Result<Reply> {
        let (cursor, batch) = cursor.next_batch().await?;
        debug!("batch of {} documents, state: {:?}", batch.documents.len(), cursor.state());

        if cursor.state() == CursorState::Done {
            if let Some(cursor_id) = cursor_id {
                debug!("cursor removed: {}", cursor_id);
            }
            return Ok(Reply::batch(batch.documents, None));
        }

        let cursor_id = match cursor_id {
            Some(cursor_id) => {
                ctx.cursors().restore(cursor_id, cursor);
                cursor_id
            },
            None => ctx.cursors().save(cursor),
        };
        Ok(Reply::batch(batch.documents, Some(cursor_id)))
    }

}

#[async_trait]
impl Handler for FindHandler {

    type Request = FindRequest;

    async fn handle(&self, ctx: &AppContext, request: FindRequest) -> Result<Reply> {
        debug!("find collection: {}, matcher: {:?}", request.collection, request.matcher);
        let query = FindQuery {
            matcher: request.matcher,
            sort: request.sort,
            skip: request.skip,
            limit: request.limit,
            projection: request.keys,
        };
        let cursor = ctx.store().query(&request.collection, query).await?;

        let timeout = request.timeout.unwrap_or(ctx.settings().cursor_timeout);
        let cursor = OpenCursor::new(cursor, request.batch_size, timeout);
        FindHandler::send_batch(ctx, cursor, None).await
    }

}
