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
use std::time::Duration;
use anyhow::{Context, Result};
use serde::Deserialize;
use crate::write_concern::{UnknownWriteConcern, WriteConcern};

pub const DEFAULT_ADDRESS: &str = "vertx.mongopersistor";

/// Module configuration, usually read from a JSON file.
///
/// Every field is optional in the file; missing ones take the defaults
/// below.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistorConfig {
    /// Bus address the persistor listens on.
    pub address: String,
    pub host: String,
    pub port: u16,
    pub db_name: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub pool_size: u32,
    pub socket_timeout: u64,
    /// Use a throwaway store that is deleted when the persistor stops.
    pub fake: bool,
    /// Directory of the store when `fake` is off.
    pub path: Option<PathBuf>,
    pub write_concern: Option<WriteConcern>,
    pub unknown_write_concern: UnknownWriteConcern,
    /// Batch size for `find` requests without `batch_size`.
    /// `None` returns everything in one reply.
    pub default_batch_size: Option<u32>,
    pub cursor_timeout_ms: u64,
    pub cursor_reap_interval_ms: u64,
    /// Listen address of the line-delimited JSON bridge.
    pub bridge: Option<String>,
}

impl Default for PersistorConfig {
    fn default() -> Self {
        PersistorConfig {
            address: DEFAULT_ADDRESS.to_string(),
            host: "localhost".to_string(),
            port: 27017,
            db_name: "default_db".to_string(),
            username: None,
            password: None,
            pool_size: 10,
            socket_timeout: 60000,
            fake: false,
            path: None,
            write_concern: None,
            unknown_write_concern: UnknownWriteConcern::Reject,
            default_batch_size: None,
            cursor_timeout_ms: 10000,
            cursor_reap_interval_ms: 1000,
            bridge: None,
        }
    }
}

impl PersistorConfig {

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<PersistorConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        PersistorConfig::from_json_str(&content)
            .with_context(|| format!("parse config file {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> Result<PersistorConfig> {
        let config = serde_json::from_str::<PersistorConfig>(content)?;
        Ok(config)
    }

    #[inline]
    pub fn cursor_timeout(&self) -> Duration {
        Duration::from_millis(self.cursor_timeout_ms)
    }

    #[inline]
    pub fn cursor_reap_interval(&self) -> Duration {
        Duration::from_millis(self.cursor_reap_interval_ms.max(1))
    }

    pub(crate) fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PersistorConfig::from_json_str("{}").unwrap();
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.db_name, "default_db");
        assert_eq!(config.port, 27017);
        assert!(!config.fake);
        assert_eq!(config.unknown_write_concern, UnknownWriteConcern::Reject);
        assert_eq!(config.cursor_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_test_config() {
        let config = PersistorConfig::from_json_str(r#"{
            "address": "test.persistor",
            "db_name": "test_db",
            "fake": true,
            "write_concern": "safe",
            "unknown_write_concern": "default"
        }"#).unwrap();
        assert_eq!(config.address, "test.persistor");
        assert_eq!(config.db_name, "test_db");
        assert!(config.fake);
        assert_eq!(config.write_concern, Some(WriteConcern::Safe));
        assert_eq!(config.unknown_write_concern, UnknownWriteConcern::Default);
    }

    #[test]
    fn test_bad_write_concern_in_config() {
        assert!(PersistorConfig::from_json_str(r#"{ "write_concern": "whatever" }"#).is_err());
    }
}
