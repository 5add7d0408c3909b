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

//! In-process message bus.
//!
//! Handlers register an address and receive [`Envelope`]s; senders call
//! [`EventBus::request`] and wait for the single reply. The persistor only
//! depends on `Envelope`, so any other transport can feed it by producing
//! envelopes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use log::debug;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use crate::errors::BusError;

const DEFAULT_INBOX_CAPACITY: usize = 1024;

/// A request delivered to a handler, with the channel to answer it on.
pub struct Envelope {
    pub body: Value,
    replier: oneshot::Sender<Value>,
}

impl Envelope {

    pub fn new(body: Value) -> (Envelope, oneshot::Receiver<Value>) {
        let (replier, rx) = oneshot::channel();
        (Envelope { body, replier }, rx)
    }

    /// Sends the reply. A sender that gave up waiting is not an error.
    pub fn reply(self, body: Value) {
        if self.replier.send(body).is_err() {
            debug!("reply receiver dropped");
        }
    }

}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<HashMap<String, mpsc::Sender<Envelope>>>>,
}

impl EventBus {

    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn register(&self, address: &str) -> Result<mpsc::Receiver<Envelope>, BusError> {
        let mut handlers = self.inner.lock().unwrap();
        if let Some(existing) = handlers.get(address) {
            if !existing.is_closed() {
                return Err(BusError::AddressInUse(address.to_string()));
            }
        }
        let (tx, rx) = mpsc::channel(DEFAULT_INBOX_CAPACITY);
        handlers.insert(address.to_string(), tx);
        debug!("handler registered at {}", address);
        Ok(rx)
    }

    pub fn unregister(&self, address: &str) {
        let mut handlers = self.inner.lock().unwrap();
        handlers.remove(address);
    }

    /// Sends `body` to `address` and waits for the reply.
    pub async fn request(&self, address: &str, body: Value) -> Result<Value, BusError> {
        let sender = {
            let handlers = self.inner.lock().unwrap();
            handlers.get(address).cloned()
        };
        let sender = sender.ok_or_else(|| BusError::NoHandlers(address.to_string()))?;

        let (envelope, rx) = Envelope::new(body);
        sender
            .send(envelope)
            .await
            .map_err(|_| BusError::NoHandlers(address.to_string()))?;

        rx.await.map_err(|_| BusError::ReplyDropped(address.to_string()))
    }

}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;

    #[tokio::test]
    async fn test_request_reply() {
        let bus = EventBus::new();
        let mut rx = bus.register("echo").unwrap();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let body = envelope.body.clone();
                envelope.reply(json!({ "echo": body }));
            }
        });

        let reply = bus.request("echo", json!({ "x": 1 })).await.unwrap();
        assert_eq!(reply, json!({ "echo": { "x": 1 } }));
    }

    #[tokio::test]
    async fn test_no_handlers() {
        let bus = EventBus::new();
        let err = bus.request("nobody", json!({})).await.unwrap_err();
        assert!(matches!(err, BusError::NoHandlers(_)));
    }

    #[tokio::test]
    async fn test_address_in_use() {
        let bus = EventBus::new();
        let _rx = bus.register("busy").unwrap();
        assert!(matches!(bus.register("busy"), Err(BusError::AddressInUse(_))));
    }

    #[tokio::test]
    async fn test_dropped_envelope() {
        let bus = EventBus::new();
        let mut rx = bus.register("sink").unwrap();
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                drop(envelope);
            }
        });
        let err = bus.request("sink", json!({})).await.unwrap_err();
        assert!(matches!(err, BusError::ReplyDropped(_)));
    }
}
