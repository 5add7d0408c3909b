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

//! The document store gateway.
//!
//! Handlers only talk to a [`DocumentStore`]; [`PoloStore`] is the
//! implementation backed by the embedded PoloDB engine.

mod polo_store;
mod projection;

use async_trait::async_trait;
use bson::{Bson, Document};
use crate::errors::StoreResult;
use crate::write_concern::WriteConcern;

pub use polo_store::PoloStore;
pub(crate) use projection::Projection;

#[derive(Debug, Clone, Default)]
pub struct FindQuery {
    pub matcher: Document,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub projection: Option<Document>,
}

#[derive(Debug, Clone)]
pub struct FindAndModify {
    pub matcher: Document,
    pub update: Document,
    pub sort: Option<Document>,
    pub return_new: bool,
}

/// Result of a save.
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
    /// The document had no `_id`; it was stored under this generated one.
    Generated(Bson),
    /// Stored under its own `_id`, which was not taken yet.
    Inserted,
    Replaced,
}

/// One batch pulled from a [`StoreCursor`].
#[derive(Debug, Default)]
pub struct Batch {
    pub documents: Vec<Document>,
    /// Nothing is left after this batch.
    pub exhausted: bool,
}

/// Server-side iteration state of a query.
///
/// Fetching blocks, so callers run it on the blocking pool.
pub trait StoreCursor: Send {

    /// Pulls up to `max` documents, or everything left when `max` is `None`.
    fn next_batch(&mut self, max: Option<usize>) -> StoreResult<Batch>;

}

#[async_trait]
pub trait DocumentStore: Send + Sync {

    /// Inserts `document`, or replaces the stored one with the same `_id`.
    /// A missing or null `_id` is generated.
    async fn insert_or_upsert(&self, collection: &str, document: Document, wc: Option<WriteConcern>) -> StoreResult<Saved>;

    /// Applies `update` to the first (or every, with `multi`) match.
    /// Returns the number of documents written.
    async fn update(
        &self,
        collection: &str,
        criteria: Document,
        update: Document,
        upsert: bool,
        multi: bool,
        wc: Option<WriteConcern>,
    ) -> StoreResult<u64>;

    async fn query(&self, collection: &str, query: FindQuery) -> StoreResult<Box<dyn StoreCursor>>;

    async fn remove(&self, collection: &str, matcher: Document, wc: Option<WriteConcern>) -> StoreResult<u64>;

    async fn count(&self, collection: &str, matcher: Document) -> StoreResult<u64>;

    async fn run_aggregation(&self, collection: &str, stages: Vec<Document>) -> StoreResult<Vec<Document>>;

    /// Returns the pre-image, or the post-image with `return_new`.
    /// `None` when nothing matched.
    async fn find_and_modify(&self, collection: &str, request: FindAndModify) -> StoreResult<Option<Document>>;

    async fn drop_collection(&self, collection: &str) -> StoreResult<()>;

    async fn list_collections(&self) -> StoreResult<Vec<String>>;

    async fn stats(&self, collection: &str) -> StoreResult<Document>;

}

/// An update made only of `$` operators, as opposed to a replacement
/// document.
pub(crate) fn is_operator_update(update: &Document) -> bool {
    !update.is_empty() && update.keys().all(|k| k.starts_with('$'))
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use super::*;

    #[test]
    fn test_is_operator_update() {
        assert!(is_operator_update(&doc! { "$inc": { "age": 1 } }));
        assert!(is_operator_update(&doc! { "$set": { "a": 1 }, "$unset": { "b": "" } }));
        assert!(!is_operator_update(&doc! { "name": "fox" }));
        assert!(!is_operator_update(&doc! {}));
    }
}
