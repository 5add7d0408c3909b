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

use std::path::{Path, PathBuf};
use std::sync::Arc;
use async_trait::async_trait;
use bson::{doc, Bson, Document};
use log::{debug, info, warn};
use polodb_core::{ClientCursor, CollectionT, Database};
use tokio::task;
use uuid::Uuid;
use crate::config::PersistorConfig;
use crate::errors::{StoreError, StoreErrorKind, StoreResult};
use crate::store::{
    is_operator_update,
    Batch,
    DocumentStore,
    FindAndModify,
    FindQuery,
    Projection,
    Saved,
    StoreCursor,
};
use crate::write_concern::WriteConcern;

/// Removes a throwaway store directory once the store is gone.
struct ScratchDir(PathBuf);

impl Drop for ScratchDir {

    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }

}

/// [`DocumentStore`] backed by an embedded PoloDB database.
///
/// The engine API is blocking, so every call runs on the blocking pool.
pub struct PoloStore {
    db: Arc<Database>,
    db_name: String,
    // declared after `db` so the database is closed before the directory goes
    _scratch: Option<ScratchDir>,
}

impl PoloStore {

    pub fn open(config: &PersistorConfig) -> StoreResult<PoloStore> {
        if config.has_credentials() {
            warn!("credentials are ignored by the embedded store");
        }
        info!("store {} (configured server {}:{}, pool size {})",
              config.db_name, config.host, config.port, config.pool_size);

        if config.fake {
            let mut path = std::env::temp_dir();
            path.push(format!("{}-{}-persistor", config.db_name, Uuid::new_v4()));
            let db = PoloStore::open_database(&path)?;
            debug!("fake store opened at {}", path.display());
            return Ok(PoloStore {
                db: Arc::new(db),
                db_name: config.db_name.clone(),
                _scratch: Some(ScratchDir(path)),
            });
        }

        let path = config
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.db_name));
        let db = PoloStore::open_database(&path)?;
        Ok(PoloStore::from_database(db, &config.db_name))
    }

    pub fn from_database(db: Database, db_name: &str) -> PoloStore {
        PoloStore {
            db: Arc::new(db),
            db_name: db_name.to_string(),
            _scratch: None,
        }
    }

    fn open_database(path: &Path) -> StoreResult<Database> {
        Database::open_path(path).map_err(|e| {
            StoreError::new(StoreErrorKind::Connection, format!("open {} failed: {}", path.display(), e))
        })
    }

    async fn blocking<F, R>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&Database) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.db.clone();
        task::spawn_blocking(move || f(db.as_ref())).await?
    }

    fn log_write(op: &str, collection: &str, wc: Option<WriteConcern>) {
        match wc {
            Some(wc) => debug!("{} on {} with {} ({:?})", op, collection, wc, wc.acknowledgment()),
            None => debug!("{} on {} with store default", op, collection),
        }
    }

}

fn first_match<C>(collection: &C, matcher: Document, sort: Option<Document>) -> StoreResult<Option<Document>>
where
    C: CollectionT<Document>,
{
    let mut find = collection.find(matcher).limit(1);
    if let Some(sort) = sort {
        find = find.sort(sort);
    }
    let mut cursor = find.run()?;
    if cursor.advance()? {
        Ok(Some(cursor.deserialize_current()?))
    } else {
        Ok(None)
    }
}

fn id_of(doc: &Document) -> StoreResult<Bson> {
    doc.get("_id")
        .cloned()
        .ok_or_else(|| StoreError::internal("stored document has no _id"))
}

fn fresh_id() -> Bson {
    Bson::String(Uuid::new_v4().to_string())
}

/// Equality fields of a matcher, used to seed an upserted document.
fn upsert_seed(criteria: &Document) -> Document {
    let mut seed = Document::new();
    for (key, value) in criteria {
        if key.starts_with('$') || key.contains('.') {
            continue;
        }
        if let Bson::Document(d) = value {
            if d.keys().any(|k| k.starts_with('$')) {
                continue;
            }
        }
        seed.insert(key.clone(), value.clone());
    }
    seed
}

/// Replaces the stored document matched by `_id`, keeping that `_id`.
fn replace_by_id<C>(collection: &C, id: Bson, mut replacement: Document) -> StoreResult<()>
where
    C: CollectionT<Document>,
{
    replacement.insert("_id", id.clone());
    collection.delete_one(doc! { "_id": id })?;
    collection.insert_one(replacement)?;
    Ok(())
}

#[async_trait]
impl DocumentStore for PoloStore {

    async fn insert_or_upsert(&self, collection: &str, document: Document, wc: Option<WriteConcern>) -> StoreResult<Saved> {
        PoloStore::log_write("save", collection, wc);
        let name = collection.to_string();
        self.blocking(move |db| {
            let existing_id = document.get("_id").cloned();
            let id = match existing_id {
                Some(Bson::Null) | None => {
                    let mut document = document;
                    let id = fresh_id();
                    document.insert("_id", id.clone());
                    db.collection::<Document>(&name).insert_one(document)?;
                    return Ok(Saved::Generated(id));
                },
                Some(id) => id,
            };

            let txn = db.start_transaction()?;
            let coll = txn.collection::<Document>(&name);
            let replaced = coll.delete_one(doc! { "_id": id.clone() })?.deleted_count > 0;
            coll.insert_one(document)?;
            txn.commit()?;

            if replaced {
                Ok(Saved::Replaced)
            } else {
                Ok(Saved::Inserted)
            }
        }).await
    }

    async fn update(
        &self,
        collection: &str,
        criteria: Document,
        update: Document,
        upsert: bool,
        multi: bool,
        wc: Option<WriteConcern>,
    ) -> StoreResult<u64> {
        PoloStore::log_write("update", collection, wc);
        let name = collection.to_string();
        self.blocking(move |db| {
            let txn = db.start_transaction()?;
            let coll = txn.collection::<Document>(&name);
            let current = first_match(&coll, criteria.clone(), None)?;

            let written = match current {
                Some(current) if is_operator_update(&update) => {
                    if multi {
                        coll.update_many(criteria, update)?.matched_count
                    } else {
                        coll.update_one(doc! { "_id": id_of(&current)? }, update)?;
                        1
                    }
                },
                Some(current) => {
                    if multi {
                        txn.rollback()?;
                        return Err(StoreError::rejected("multi update only works with $ operators"));
                    }
                    replace_by_id(&coll, id_of(&current)?, update)?;
                    1
                },
                None if upsert => {
                    let mut seed = upsert_seed(&criteria);
                    if is_operator_update(&update) {
                        let id = seed.get("_id").cloned().unwrap_or_else(fresh_id);
                        seed.insert("_id", id.clone());
                        coll.insert_one(seed)?;
                        coll.update_one(doc! { "_id": id }, update)?;
                    } else {
                        let mut replacement = update;
                        if !replacement.contains_key("_id") {
                            let id = seed.get("_id").cloned().unwrap_or_else(fresh_id);
                            replacement.insert("_id", id);
                        }
                        coll.insert_one(replacement)?;
                    }
                    1
                },
                None => 0,
            };

            txn.commit()?;
            Ok(written)
        }).await
    }

    async fn query(&self, collection: &str, query: FindQuery) -> StoreResult<Box<dyn StoreCursor>> {
        let projection = match query.projection.as_ref() {
            Some(keys) => Projection::parse(keys)?,
            None => None,
        };
        let name = collection.to_string();
        self.blocking(move |db| {
            let coll = db.collection::<Document>(&name);
            let mut find = coll.find(query.matcher);
            if let Some(sort) = query.sort {
                find = find.sort(sort);
            }
            if let Some(skip) = query.skip {
                find = find.skip(skip);
            }
            if let Some(limit) = query.limit {
                find = find.limit(limit);
            }
            let cursor = find.run()?;
            let cursor: Box<dyn StoreCursor> = Box::new(PoloCursor::new(cursor, projection));
            Ok(cursor)
        }).await
    }

    async fn remove(&self, collection: &str, matcher: Document, wc: Option<WriteConcern>) -> StoreResult<u64> {
        PoloStore::log_write("delete", collection, wc);
        let name = collection.to_string();
        self.blocking(move |db| {
            let result = db.collection::<Document>(&name).delete_many(matcher)?;
            Ok(result.deleted_count)
        }).await
    }

    async fn count(&self, collection: &str, matcher: Document) -> StoreResult<u64> {
        let name = collection.to_string();
        self.blocking(move |db| {
            let coll = db.collection::<Document>(&name);
            if matcher.is_empty() {
                return Ok(coll.count_documents()?);
            }
            let mut cursor = coll.find(matcher).run()?;
            let mut count: u64 = 0;
            while cursor.advance()? {
                count += 1;
            }
            Ok(count)
        }).await
    }

    async fn run_aggregation(&self, collection: &str, stages: Vec<Document>) -> StoreResult<Vec<Document>> {
        let name = collection.to_string();
        self.blocking(move |db| {
            let coll = db.collection::<Document>(&name);
            let mut cursor = coll.aggregate(stages).run()?;
            let mut results = Vec::new();
            while cursor.advance()? {
                results.push(cursor.deserialize_current()?);
            }
            Ok(results)
        }).await
    }

    async fn find_and_modify(&self, collection: &str, request: FindAndModify) -> StoreResult<Option<Document>> {
        let name = collection.to_string();
        self.blocking(move |db| {
            let txn = db.start_transaction()?;
            let coll = txn.collection::<Document>(&name);

            let current = match first_match(&coll, request.matcher, request.sort)? {
                Some(doc) => doc,
                None => {
                    txn.rollback()?;
                    return Ok(None);
                },
            };
            let id = id_of(&current)?;

            if is_operator_update(&request.update) {
                coll.update_one(doc! { "_id": id.clone() }, request.update)?;
            } else {
                replace_by_id(&coll, id.clone(), request.update)?;
            }

            let result = if request.return_new {
                coll.find_one(doc! { "_id": id })?
            } else {
                Some(current)
            };
            txn.commit()?;
            Ok(result)
        }).await
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        let name = collection.to_string();
        self.blocking(move |db| {
            db.collection::<Document>(&name).drop()?;
            Ok(())
        }).await
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        self.blocking(|db| Ok(db.list_collection_names()?)).await
    }

    async fn stats(&self, collection: &str) -> StoreResult<Document> {
        let name = collection.to_string();
        let ns = format!("{}.{}", self.db_name, collection);
        self.blocking(move |db| {
            let names = db.list_collection_names()?;
            if !names.iter().any(|n| n == &name) {
                return Err(StoreError::not_found(format!("collection not found: {}", name)));
            }
            let count = db.collection::<Document>(&name).count_documents()?;
            Ok(doc! {
                "ns": ns,
                "collection": name,
                "count": count as i64,
            })
        }).await
    }

}

struct PoloCursor {
    inner: ClientCursor<Document>,
    lookahead: Option<Document>,
    projection: Option<Projection>,
}

impl PoloCursor {

    fn new(inner: ClientCursor<Document>, projection: Option<Projection>) -> PoloCursor {
        PoloCursor {
            inner,
            lookahead: None,
            projection,
        }
    }

    fn pull(&mut self) -> StoreResult<Option<Document>> {
        if let Some(doc) = self.lookahead.take() {
            return Ok(Some(doc));
        }
        if self.inner.advance()? {
            let doc = self.inner.deserialize_current()?;
            Ok(Some(doc))
        } else {
            Ok(None)
        }
    }

}

impl StoreCursor for PoloCursor {

    fn next_batch(&mut self, max: Option<usize>) -> StoreResult<Batch> {
        let mut documents = Vec::new();
        loop {
            if max.map_or(false, |max| documents.len() >= max) {
                break;
            }
            match self.pull()? {
                Some(doc) => {
                    let doc = match &self.projection {
                        Some(projection) => projection.apply(doc),
                        None => doc,
                    };
                    documents.push(doc);
                },
                None => return Ok(Batch { documents, exhausted: true }),
            }
        }

        // peek one ahead so the caller knows whether to expect more
        self.lookahead = self.pull()?;
        let exhausted = self.lookahead.is_none();
        Ok(Batch { documents, exhausted })
    }

}

#[cfg(test)]
mod tests {
    use bson::doc;
    use super::*;

    #[test]
    fn test_upsert_seed() {
        let seed = upsert_seed(&doc! {
            "name": "tim",
            "age": { "$gt": 10 },
            "address.city": "london",
            "$or": [{ "a": 1 }],
            "tags": { "kind": "x" },
        });
        assert_eq!(seed, doc! { "name": "tim", "tags": { "kind": "x" } });
    }

    #[test]
    fn test_fresh_ids_differ() {
        assert_ne!(fresh_id(), fresh_id());
    }
}
