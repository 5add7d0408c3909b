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

use std::sync::Arc;
use std::time::Duration;
use crate::config::PersistorConfig;
use crate::cursors::CursorRegistry;
use crate::store::DocumentStore;
use crate::write_concern::{UnknownWriteConcern, WriteConcern};

/// The part of the configuration consulted while serving requests.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub write_concern: Option<WriteConcern>,
    pub unknown_write_concern: UnknownWriteConcern,
    pub default_batch_size: Option<usize>,
    pub cursor_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&PersistorConfig::default())
    }
}

impl From<&PersistorConfig> for Settings {
    fn from(config: &PersistorConfig) -> Self {
        Settings {
            write_concern: config.write_concern,
            unknown_write_concern: config.unknown_write_concern,
            default_batch_size: config.default_batch_size.map(|n| n.max(1) as usize),
            cursor_timeout: config.cursor_timeout(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct AppContext {
    inner: Arc<AppContextInner>,
}

impl AppContext {

    pub(crate) fn new(store: Arc<dyn DocumentStore>, settings: Settings) -> Self {
        AppContext {
            inner: Arc::new(AppContextInner {
                store,
                cursors: CursorRegistry::new(),
                settings,
            }),
        }
    }

    #[inline]
    pub(crate) fn store(&self) -> &dyn DocumentStore {
        self.inner.store.as_ref()
    }

    #[inline]
    pub(crate) fn cursors(&self) -> &CursorRegistry {
        &self.inner.cursors
    }

    #[inline]
    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

}

struct AppContextInner {
    store: Arc<dyn DocumentStore>,
    cursors: CursorRegistry,
    settings: Settings,
}
