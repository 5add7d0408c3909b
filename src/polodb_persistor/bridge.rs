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

//! Line-delimited JSON over TCP in front of the in-process bus.
//!
//! Every request line is `{"address": "...", "body": {...}}` and is answered
//! by one line holding the reply body. Requests on a connection are served
//! in order.

use std::net::SocketAddr;
use anyhow::Result;
use futures::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;
use crate::bus::EventBus;
use crate::reply::STATUS_ERROR;

const MAX_LINE_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct BridgeRequest {
    address: String,
    body: Value,
}

fn error_line(message: String) -> Value {
    json!({ "status": STATUS_ERROR, "message": message })
}

pub async fn start_bridge(bus: EventBus, socket: String, token: CancellationToken) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(&socket).await?;
    let addr = listener.local_addr()?;

    let fut = tokio::spawn(async move {
        let mut conn_id: u64 = 0;
        loop {
            select! {
                _ = token.cancelled() => {
                    info!("bridge stopped");
                    return
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            conn_id += 1;
                            let id = conn_id;
                            let bus = bus.clone();
                            let token = token.clone();
                            tokio::spawn(async move {
                                info!("new connection: {} from {}", id, peer);
                                if let Err(e) = handle_stream(bus, stream, token).await {
                                    error!("handle stream error: {:?}", e);
                                }
                                info!("connection closed: {}", id);
                            });
                        }
                        Err(err) => {
                            warn!("accept error: {:?}", err);
                            return
                        }
                    }
                }
            }
        }
    });

    Ok((addr, fut))
}

async fn handle_stream<S>(bus: EventBus, stream: S, token: CancellationToken) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut lines = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_SIZE));

    loop {
        let line = select! {
            _ = token.cancelled() => return Ok(()),
            line = lines.next() => line,
        };
        let line = match line {
            Some(line) => line?,
            None => return Ok(()),
        };
        if line.trim().is_empty() {
            continue;
        }
        debug!("received: {}", line);

        let reply = match serde_json::from_str::<BridgeRequest>(&line) {
            Ok(request) => match bus.request(&request.address, request.body).await {
                Ok(reply) => reply,
                Err(err) => error_line(err.to_string()),
            },
            Err(err) => error_line(format!("invalid request line: {}", err)),
        };

        lines.send(serde_json::to_string(&reply)?).await?;
    }
}
