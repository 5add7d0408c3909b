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

use core::fmt::Debug;
use bson::{doc, Bson, Document};
use serde_json::Value;
use crate::convert::document_to_json;

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";
pub const STATUS_MORE_EXIST: &str = "more-exist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Status {
    Ok,
    Error,
    MoreExist,
}

impl Status {

    fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => STATUS_OK,
            Status::Error => STATUS_ERROR,
            Status::MoreExist => STATUS_MORE_EXIST,
        }
    }

}

pub(crate) struct Reply {
    pub(crate) status: Status,
    body: Document,
}

impl Reply {

    pub(crate) fn ok() -> Reply {
        Reply::ok_with(Document::new())
    }

    pub(crate) fn ok_with(body: Document) -> Reply {
        Reply { status: Status::Ok, body }
    }

    pub(crate) fn error(message: impl Into<String>) -> Reply {
        let message: String = message.into();
        Reply {
            status: Status::Error,
            body: doc! { "message": message },
        }
    }

    /// A batch of a cursor; `cursor` is the continuation handle when more
    /// results exist.
    pub(crate) fn batch(results: Vec<Document>, cursor: Option<i64>) -> Reply {
        let number = results.len() as i64;
        let results: Vec<Bson> = results.into_iter().map(Bson::Document).collect();
        let mut body = doc! {
            "results": results,
            "number": number,
        };
        let status = match cursor {
            Some(cursor_id) => {
                body.insert("cursor", cursor_id);
                Status::MoreExist
            },
            None => Status::Ok,
        };
        Reply { status, body }
    }

    pub(crate) fn into_document(self) -> Document {
        let mut doc = doc! { "status": self.status.as_str() };
        for (key, value) in self.body {
            doc.insert(key, value);
        }
        doc
    }

    pub(crate) fn into_json(self) -> Value {
        document_to_json(self.into_document())
    }

}

impl Debug for Reply {

    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reply {{ status: {}, payload: {:?} }}", self.status.as_str(), self.body)
    }

}
