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

//! Conversion between the JSON documents carried on the bus and the BSON
//! documents the store works with.

use bson::{Bson, Document};
use serde_json::Value;
use crate::errors::{Error, Result};

/// Converts a JSON object into a BSON document.
///
/// Extended JSON forms such as `{"$oid": "..."}` are honoured.
pub fn json_to_document(value: Value) -> Result<Document> {
    if !value.is_object() {
        return Err(Error::validation("message body must be a JSON object"));
    }
    let bson = Bson::try_from(value)
        .map_err(|e| Error::validation(format!("invalid document: {}", e)))?;
    match bson {
        Bson::Document(doc) => Ok(doc),
        _ => Err(Error::validation("message body must be a JSON object")),
    }
}

/// Renders a BSON document as relaxed extended JSON.
pub fn document_to_json(doc: Document) -> Value {
    Bson::Document(doc).into_relaxed_extjson()
}

/// Reads an integral number whatever its BSON width.
pub(crate) fn bson_as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(i) => Some(*i as i64),
        Bson::Int64(i) => Some(*i),
        Bson::Double(d) if d.fract() == 0.0 && d.is_finite() => Some(*d as i64),
        _ => None,
    }
}

pub(crate) fn truly_value_for_bson(value: Option<&Bson>, default: bool) -> bool {
    match value {
        Some(Bson::Boolean(b)) => *b,
        Some(Bson::Int32(i)) => *i == 1,
        Some(Bson::Int64(i)) => *i == 1,
        _ => default,
    }
}
