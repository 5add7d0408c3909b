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

use std::env;
use std::path::PathBuf;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use polodb_persistor::{EventBus, Persistor, PersistorConfig, UnknownWriteConcern};

pub const ADDRESS: &str = "test.persistor";

#[allow(dead_code)]
pub fn mk_db_path(db_name: &str) -> PathBuf {
    let mut db_path = env::temp_dir();
    let db_filename = String::from(db_name) + "-persistor-db";
    db_path.push(db_filename);
    db_path
}

#[allow(dead_code)]
pub fn clean_db_path(db_path: &PathBuf) {
    let _ = std::fs::remove_dir_all(db_path);
}

pub fn fake_config(db_name: &str) -> PersistorConfig {
    PersistorConfig {
        address: ADDRESS.to_string(),
        db_name: db_name.to_string(),
        fake: true,
        ..PersistorConfig::default()
    }
}

/// A persistor on its own bus, stopped when dropped.
pub struct TestPersistor {
    pub bus: EventBus,
    pub persistor: Persistor,
    token: CancellationToken,
    _handle: JoinHandle<()>,
}

impl TestPersistor {

    pub async fn send(&self, body: Value) -> Value {
        self.bus.request(ADDRESS, body).await.unwrap()
    }

    /// Sends and asserts an `ok` reply.
    #[allow(dead_code)]
    pub async fn send_ok(&self, body: Value) -> Value {
        let reply = self.send(body).await;
        assert_eq!(reply["status"], "ok", "unexpected reply: {}", reply);
        reply
    }

    #[allow(dead_code)]
    pub async fn save(&self, collection: &str, document: Value) -> Value {
        self.send_ok(json!({
            "action": "save",
            "collection": collection,
            "document": document,
        })).await
    }

    #[allow(dead_code)]
    pub async fn delete_all(&self, collection: &str) {
        self.send_ok(json!({
            "action": "delete",
            "collection": collection,
            "matcher": {},
        })).await;
    }

}

impl Drop for TestPersistor {

    fn drop(&mut self) {
        self.token.cancel();
    }

}

pub fn start_with_config(config: PersistorConfig) -> TestPersistor {
    let _ = env_logger::builder().is_test(true).try_init();

    let persistor = Persistor::open(&config).unwrap();
    let bus = EventBus::new();
    let token = CancellationToken::new();
    let handle = persistor.clone().start(&bus, token.clone()).unwrap();

    TestPersistor {
        bus,
        persistor,
        token,
        _handle: handle,
    }
}

#[allow(dead_code)]
pub fn start_persistor(db_name: &str) -> TestPersistor {
    start_with_config(fake_config(db_name))
}

#[allow(dead_code)]
pub fn start_lenient_persistor(db_name: &str) -> TestPersistor {
    let config = PersistorConfig {
        unknown_write_concern: UnknownWriteConcern::Default,
        ..fake_config(db_name)
    };
    start_with_config(config)
}
