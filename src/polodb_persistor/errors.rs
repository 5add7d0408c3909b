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

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The store could not be opened or reached.
    Connection,
    /// The store refused the operation: bad matcher, bad pipeline stage,
    /// constraint violation.
    Rejected,
    NotFound,
    Internal,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreErrorKind::Connection => "connection error",
            StoreErrorKind::Rejected => "rejected",
            StoreErrorKind::NotFound => "not found",
            StoreErrorKind::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// Uniform error surfaced by a [`crate::store::DocumentStore`].
#[derive(Debug, Error)]
#[error("{kind}: {detail}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub detail: String,
}

impl StoreError {

    pub fn new(kind: StoreErrorKind, detail: impl Into<String>) -> StoreError {
        StoreError {
            kind,
            detail: detail.into(),
        }
    }

    pub fn rejected(detail: impl Into<String>) -> StoreError {
        StoreError::new(StoreErrorKind::Rejected, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> StoreError {
        StoreError::new(StoreErrorKind::NotFound, detail)
    }

    pub fn internal(detail: impl Into<String>) -> StoreError {
        StoreError::new(StoreErrorKind::Internal, detail)
    }

}

impl From<polodb_core::Error> for StoreError {
    fn from(value: polodb_core::Error) -> Self {
        StoreError::rejected(value.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(value: tokio::task::JoinError) -> Self {
        StoreError::internal(format!("store task failed: {}", value))
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(value: bson::de::Error) -> Self {
        StoreError::internal(value.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Everything a request can fail with. All of it ends up as a
/// `status: "error"` reply.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing request fields.
    #[error("{0}")]
    Validation(String),
    /// Missing or unrecognised action.
    #[error("{0}")]
    Protocol(String),
    #[error("cursor not found: {0}")]
    CursorNotFound(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {

    pub(crate) fn validation(msg: impl Into<String>) -> Error {
        Error::Validation(msg.into())
    }

    pub(crate) fn missing(field: &str) -> Error {
        Error::Validation(format!("{} must be specified", field))
    }

    pub(crate) fn wrong_type(field: &str, expected: &str) -> Error {
        Error::Validation(format!("{} must be {}", field, expected))
    }

}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("address already registered: {0}")]
    AddressInUse(String),
    #[error("no handlers for address: {0}")]
    NoHandlers(String),
    #[error("reply dropped by handler at: {0}")]
    ReplyDropped(String),
}
