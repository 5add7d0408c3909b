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

//! A bus-addressed persistor backed by PoloDB.
//!
//! Request documents arrive on an [`EventBus`] address, are validated,
//! served against a [`DocumentStore`] and answered with exactly one reply:
//!
//! ```json
//! { "action": "find", "collection": "users", "matcher": { "age": 40 }, "batch_size": 10 }
//! ```
//!
//! Large finds are answered in batches. Every batch but the last has
//! `status: "more-exist"` and a `cursor` handle; the client asks for the
//! next one with `{ "action": "continue", "cursor": <handle> }`, or releases
//! it early with `{ "action": "close", "cursor": <handle> }`.

mod app_context;
mod cursors;
mod handlers;
mod reply;
mod request;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod convert;
pub mod errors;
pub mod persistor;
pub mod store;
pub mod write_concern;

pub use bus::{Envelope, EventBus};
pub use config::{PersistorConfig, DEFAULT_ADDRESS};
pub use errors::{BusError, Error, Result, StoreError, StoreErrorKind, StoreResult};
pub use persistor::Persistor;
pub use reply::{STATUS_ERROR, STATUS_MORE_EXIST, STATUS_OK};
pub use store::{DocumentStore, PoloStore};
pub use write_concern::{Acknowledgment, UnknownWriteConcern, WriteConcern};
