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

//! Request parsing and validation.
//!
//! A request document is turned into one [`Request`] variant per action.
//! Every required field is checked here, so handlers never see a malformed
//! request and the store is never touched when validation fails.

use std::time::Duration;
use bson::{Bson, Document};
use log::warn;
use crate::app_context::Settings;
use crate::convert::{bson_as_i64, truly_value_for_bson};
use crate::errors::{Error, Result};
use crate::write_concern::{UnknownWriteConcern, WriteConcern};

pub(crate) const ACTION_SAVE: &str = "save";
pub(crate) const ACTION_UPDATE: &str = "update";
pub(crate) const ACTION_FIND: &str = "find";
pub(crate) const ACTION_CONTINUE: &str = "continue";
pub(crate) const ACTION_CLOSE: &str = "close";
pub(crate) const ACTION_FIND_ONE: &str = "findone";
pub(crate) const ACTION_DELETE: &str = "delete";
pub(crate) const ACTION_COUNT: &str = "count";
pub(crate) const ACTION_AGGREGATE: &str = "aggregate";
pub(crate) const ACTION_FIND_AND_MODIFY: &str = "find_and_modify";
pub(crate) const ACTION_DROP_COLLECTION: &str = "dropCollection";
pub(crate) const ACTION_GET_COLLECTIONS: &str = "getCollections";
pub(crate) const ACTION_COLLECTION_STATS: &str = "collectionStats";

#[derive(Debug, Clone)]
pub(crate) struct SaveRequest {
    pub collection: String,
    pub document: Document,
    pub write_concern: Option<WriteConcern>,
}

#[derive(Debug, Clone)]
pub(crate) struct UpdateRequest {
    pub collection: String,
    pub criteria: Document,
    pub update: Document,
    pub upsert: bool,
    pub multi: bool,
    pub write_concern: Option<WriteConcern>,
}

#[derive(Debug, Clone)]
pub(crate) struct FindRequest {
    pub collection: String,
    pub matcher: Document,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub keys: Option<Document>,
    pub batch_size: Option<usize>,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub(crate) struct FindOneRequest {
    pub collection: String,
    pub matcher: Document,
    pub sort: Option<Document>,
    pub keys: Option<Document>,
}

#[derive(Debug, Clone)]
pub(crate) struct DeleteRequest {
    pub collection: String,
    pub matcher: Document,
    pub write_concern: Option<WriteConcern>,
}

#[derive(Debug, Clone)]
pub(crate) struct CountRequest {
    pub collection: String,
    pub matcher: Document,
}

#[derive(Debug, Clone)]
pub(crate) struct AggregateRequest {
    pub collection: String,
    pub pipelines: Vec<Document>,
}

#[derive(Debug, Clone)]
pub(crate) struct FindAndModifyRequest {
    pub collection: String,
    pub matcher: Document,
    pub update: Document,
    pub sort: Option<Document>,
    pub return_new: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum Request {
    Save(SaveRequest),
    Update(UpdateRequest),
    Find(FindRequest),
    Continue { cursor_id: i64 },
    Close { cursor_id: i64 },
    FindOne(FindOneRequest),
    Delete(DeleteRequest),
    Count(CountRequest),
    Aggregate(AggregateRequest),
    FindAndModify(FindAndModifyRequest),
    DropCollection { collection: String },
    GetCollections,
    CollectionStats { collection: String },
}

impl Request {

    pub(crate) fn parse(doc: &Document, settings: &Settings) -> Result<Request> {
        let fields = Fields(doc);
        let action = match doc.get("action") {
            None | Some(Bson::Null) => return Err(Error::Protocol("action must be specified".into())),
            Some(Bson::String(s)) => s.as_str(),
            Some(_) => return Err(Error::Protocol("action must be a string".into())),
        };

        let request = match action {
            ACTION_SAVE => Request::Save(SaveRequest {
                collection: fields.mandatory_str("collection")?,
                document: fields.mandatory_doc("document")?,
                write_concern: fields.write_concern(settings)?,
            }),
            ACTION_UPDATE => Request::Update(UpdateRequest {
                collection: fields.mandatory_str("collection")?,
                criteria: fields.mandatory_doc("criteria")?,
                update: fields.mandatory_doc("objNew")?,
                upsert: truly_value_for_bson(doc.get("upsert"), false),
                multi: truly_value_for_bson(doc.get("multi"), false),
                write_concern: fields.write_concern(settings)?,
            }),
            ACTION_FIND => {
                let collection = fields.mandatory_str("collection")?;
                let batch_size = match fields.optional_i64("batch_size")? {
                    Some(n) if n <= 0 => return Err(Error::validation("batch_size must be a positive number")),
                    Some(n) => Some(n as usize),
                    None => settings.default_batch_size,
                };
                let timeout = match fields.optional_i64("timeout")? {
                    Some(ms) if ms > 0 => Some(Duration::from_millis(ms as u64)),
                    _ => None,
                };
                Request::Find(FindRequest {
                    collection,
                    matcher: fields.optional_doc("matcher")?.unwrap_or_default(),
                    sort: fields.sort()?,
                    skip: fields.non_negative("skip")?,
                    limit: fields.non_negative("limit")?.filter(|l| *l > 0),
                    keys: fields.optional_doc("keys")?,
                    batch_size,
                    timeout,
                })
            },
            ACTION_CONTINUE => Request::Continue {
                cursor_id: fields.cursor_id()?,
            },
            ACTION_CLOSE => Request::Close {
                cursor_id: fields.cursor_id()?,
            },
            ACTION_FIND_ONE => Request::FindOne(FindOneRequest {
                collection: fields.mandatory_str("collection")?,
                matcher: fields.optional_doc("matcher")?.unwrap_or_default(),
                sort: fields.sort()?,
                keys: fields.optional_doc("keys")?,
            }),
            ACTION_DELETE => Request::Delete(DeleteRequest {
                collection: fields.mandatory_str("collection")?,
                matcher: fields.mandatory_doc("matcher")?,
                write_concern: fields.write_concern(settings)?,
            }),
            ACTION_COUNT => Request::Count(CountRequest {
                collection: fields.mandatory_str("collection")?,
                matcher: fields.mandatory_doc("matcher")?,
            }),
            ACTION_AGGREGATE => Request::Aggregate(AggregateRequest {
                collection: fields.mandatory_str("collection")?,
                pipelines: fields.pipelines()?,
            }),
            ACTION_FIND_AND_MODIFY => Request::FindAndModify(FindAndModifyRequest {
                collection: fields.mandatory_str("collection")?,
                matcher: fields.mandatory_doc("matcher")?,
                update: fields.mandatory_doc("update")?,
                sort: fields.sort()?,
                return_new: truly_value_for_bson(doc.get("new"), false),
            }),
            ACTION_DROP_COLLECTION => Request::DropCollection {
                collection: fields.mandatory_str("collection")?,
            },
            ACTION_GET_COLLECTIONS => Request::GetCollections,
            ACTION_COLLECTION_STATS => Request::CollectionStats {
                collection: fields.mandatory_str("collection")?,
            },
            other => return Err(Error::Protocol(format!("Invalid action: {}", other))),
        };

        Ok(request)
    }

    pub(crate) fn action(&self) -> &'static str {
        match self {
            Request::Save(_) => ACTION_SAVE,
            Request::Update(_) => ACTION_UPDATE,
            Request::Find(_) => ACTION_FIND,
            Request::Continue { .. } => ACTION_CONTINUE,
            Request::Close { .. } => ACTION_CLOSE,
            Request::FindOne(_) => ACTION_FIND_ONE,
            Request::Delete(_) => ACTION_DELETE,
            Request::Count(_) => ACTION_COUNT,
            Request::Aggregate(_) => ACTION_AGGREGATE,
            Request::FindAndModify(_) => ACTION_FIND_AND_MODIFY,
            Request::DropCollection { .. } => ACTION_DROP_COLLECTION,
            Request::GetCollections => ACTION_GET_COLLECTIONS,
            Request::CollectionStats { .. } => ACTION_COLLECTION_STATS,
        }
    }

}

struct Fields<'a>(&'a Document);

impl<'a> Fields<'a> {

    // null counts as absent
    fn get(&self, field: &str) -> Option<&'a Bson> {
        match self.0.get(field) {
            Some(Bson::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    fn mandatory_str(&self, field: &str) -> Result<String> {
        match self.get(field) {
            Some(Bson::String(s)) => Ok(s.clone()),
            Some(_) => Err(Error::wrong_type(field, "a string")),
            None => Err(Error::missing(field)),
        }
    }

    fn mandatory_doc(&self, field: &str) -> Result<Document> {
        self.optional_doc(field)?.ok_or_else(|| Error::missing(field))
    }

    fn optional_doc(&self, field: &str) -> Result<Option<Document>> {
        match self.get(field) {
            Some(Bson::Document(d)) => Ok(Some(d.clone())),
            Some(_) => Err(Error::wrong_type(field, "an object")),
            None => Ok(None),
        }
    }

    fn optional_i64(&self, field: &str) -> Result<Option<i64>> {
        match self.get(field) {
            Some(v) => bson_as_i64(v)
                .map(Some)
                .ok_or_else(|| Error::wrong_type(field, "an integer")),
            None => Ok(None),
        }
    }

    fn non_negative(&self, field: &str) -> Result<Option<u64>> {
        match self.optional_i64(field)? {
            Some(n) if n < 0 => Err(Error::wrong_type(field, "a non-negative integer")),
            Some(n) => Ok(Some(n as u64)),
            None => Ok(None),
        }
    }

    fn cursor_id(&self) -> Result<i64> {
        self.optional_i64("cursor")?.ok_or_else(|| Error::missing("cursor"))
    }

    /// `sort` is either one object or an array of objects merged in order.
    fn sort(&self) -> Result<Option<Document>> {
        match self.get("sort") {
            Some(Bson::Document(d)) => Ok(Some(d.clone())),
            Some(Bson::Array(arr)) => {
                let mut merged = Document::new();
                for item in arr {
                    let part = item
                        .as_document()
                        .ok_or_else(|| Error::validation(format!("Cannot handle sort element {}", item)))?;
                    for (k, v) in part {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                Ok(Some(merged))
            },
            Some(other) => Err(Error::validation(format!("Cannot handle sort {}", other))),
            None => Ok(None),
        }
    }

    fn pipelines(&self) -> Result<Vec<Document>> {
        let arr = match self.get("pipelines") {
            Some(Bson::Array(arr)) => arr,
            Some(_) => return Err(Error::wrong_type("pipelines", "an array")),
            None => return Err(Error::missing("pipelines")),
        };
        if arr.is_empty() {
            return Err(Error::validation("pipelines must not be empty"));
        }
        let mut stages = Vec::with_capacity(arr.len());
        for (index, stage) in arr.iter().enumerate() {
            let d = stage
                .as_document()
                .ok_or_else(|| Error::validation(format!("the {}th element of pipelines should be an object", index)))?;
            stages.push(d.clone());
        }
        Ok(stages)
    }

    /// Resolves the write concern: request field, legacy field, configured
    /// default. Unrecognised names follow the configured policy.
    fn write_concern(&self, settings: &Settings) -> Result<Option<WriteConcern>> {
        let raw = self.get("writeConcern").or_else(|| self.get("write_concern"));
        let name = match raw {
            Some(Bson::String(s)) => s,
            Some(_) => return Err(Error::wrong_type("writeConcern", "a string")),
            None => return Ok(settings.write_concern),
        };
        match name.parse::<WriteConcern>() {
            Ok(wc) => Ok(Some(wc)),
            Err(msg) => match settings.unknown_write_concern {
                UnknownWriteConcern::Reject => Err(Error::Validation(msg)),
                UnknownWriteConcern::Default => {
                    warn!("{}, using default", msg);
                    Ok(settings.write_concern)
                },
            },
        }
    }

}
