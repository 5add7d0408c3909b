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

//! The bus-facing module: one request in, one reply out.

use std::sync::Arc;
use std::time::Duration;
use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use crate::app_context::{AppContext, Settings};
use crate::bus::EventBus;
use crate::config::PersistorConfig;
use crate::convert::json_to_document;
use crate::errors::{BusError, Error, Result, StoreResult};
use crate::handlers;
use crate::reply::Reply;
use crate::request::Request;
use crate::store::{DocumentStore, PoloStore};

#[derive(Clone)]
pub struct Persistor {
    ctx: AppContext,
    address: String,
    reap_interval: Duration,
}

impl Persistor {

    pub fn new(config: &PersistorConfig, store: Arc<dyn DocumentStore>) -> Persistor {
        Persistor {
            ctx: AppContext::new(store, Settings::from(config)),
            address: config.address.clone(),
            reap_interval: config.cursor_reap_interval(),
        }
    }

    /// Opens the PoloDB-backed store described by `config`.
    pub fn open(config: &PersistorConfig) -> StoreResult<Persistor> {
        let store = PoloStore::open(config)?;
        Ok(Persistor::new(config, Arc::new(store)))
    }

    #[inline]
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn open_cursors(&self) -> usize {
        self.ctx.cursors().len()
    }

    pub fn reap_expired_cursors(&self) -> usize {
        self.ctx.cursors().reap_expired()
    }

    /// Serves one request body. Never fails: every error becomes a
    /// `status: "error"` reply.
    pub async fn handle(&self, body: Value) -> Value {
        let reply = match self.process(body).await {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    Error::Store(store_err) => error!("store failure: {}", store_err),
                    _ => warn!("request rejected: {}", err),
                }
                Reply::error(err.to_string())
            },
        };
        debug!("reply: {:?}", reply);
        reply.into_json()
    }

    async fn process(&self, body: Value) -> Result<Reply> {
        let doc = json_to_document(body)?;
        let request = Request::parse(&doc, self.ctx.settings())?;
        debug!("action: {}", request.action());
        handlers::dispatch(&self.ctx, request).await
    }

    /// Registers at the configured address and serves envelopes until
    /// `token` is cancelled. Every envelope is handled on its own task.
    pub fn start(self, bus: &EventBus, token: CancellationToken) -> std::result::Result<JoinHandle<()>, BusError> {
        let mut inbox = bus.register(&self.address)?;
        let bus = bus.clone();
        info!("persistor listening at {}", self.address);

        let fut = tokio::spawn(async move {
            let reaper_token = token.child_token();
            let reaper = self.spawn_reaper(reaper_token.clone());

            loop {
                select! {
                    _ = token.cancelled() => {
                        break
                    }

                    envelope = inbox.recv() => {
                        let mut envelope = match envelope {
                            Some(envelope) => envelope,
                            None => break,
                        };
                        let persistor = self.clone();
                        tokio::spawn(async move {
                            let body = std::mem::take(&mut envelope.body);
                            let reply = persistor.handle(body).await;
                            envelope.reply(reply);
                        });
                    }
                }
            }

            bus.unregister(&self.address);
            reaper_token.cancel();
            if let Err(err) = reaper.await {
                warn!("cursor reaper failed: {}", err);
            }
            info!("persistor stopped: {}", self.address);
        });

        Ok(fut)
    }

    fn spawn_reaper(&self, token: CancellationToken) -> JoinHandle<()> {
        let ctx = self.ctx.clone();
        let period = self.reap_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {
                        ctx.cursors().reap_expired();
                    }
                }
            }
        })
    }

}
