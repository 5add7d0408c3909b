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

//! Open cursors of batched finds.
//!
//! A cursor that still has documents after a batch is parked here under a
//! numeric handle until the client sends `continue`. While a batch is being
//! fetched the cursor is taken out of the registry, so the registry lock is
//! never held across a store call and two continuations can never interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use log::{debug, warn};
use tokio::task;
use crate::errors::Result;
use crate::store::{Batch, StoreCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CursorState {
    /// Created by the query, nothing fetched yet.
    Opened,
    /// A batch is being fetched.
    Streaming,
    /// Parked, waiting for a continuation.
    More,
    /// Exhausted, never used again.
    Done,
}

pub(crate) struct OpenCursor {
    cursor: Box<dyn StoreCursor>,
    batch_size: Option<usize>,
    timeout: Duration,
    last_used: Instant,
    state: CursorState,
}

impl OpenCursor {

    pub(crate) fn new(cursor: Box<dyn StoreCursor>, batch_size: Option<usize>, timeout: Duration) -> OpenCursor {
        OpenCursor {
            cursor,
            batch_size,
            timeout,
            last_used: Instant::now(),
            state: CursorState::Opened,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> CursorState {
        self.state
    }

    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_used) >= self.timeout
    }

    /// Fetches the next batch on the blocking pool and moves the state
    /// machine to `More` or `Done`.
    pub(crate) async fn next_batch(mut self) -> Result<(OpenCursor, Batch)> {
        if self.state == CursorState::Done {
            return Ok((self, Batch { documents: vec![], exhausted: true }));
        }
        self.state = CursorState::Streaming;
        let (mut this, batch) = task::spawn_blocking(move || {
            let batch = self.cursor.next_batch(self.batch_size);
            (self, batch)
        }).await.map_err(crate::errors::StoreError::from)?;
        let batch = batch?;

        this.state = if batch.exhausted { CursorState::Done } else { CursorState::More };
        this.last_used = Instant::now();
        Ok((this, batch))
    }

}

pub(crate) struct CursorRegistry {
    next_id: AtomicI64,
    cursors: Mutex<HashMap<i64, OpenCursor>>,
}

impl CursorRegistry {

    pub(crate) fn new() -> CursorRegistry {
        CursorRegistry {
            next_id: AtomicI64::new(1),
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// Parks a cursor and returns its handle. Ids start from 1.
    pub(crate) fn save(&self, cursor: OpenCursor) -> i64 {
        let cursor_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.restore(cursor_id, cursor);
        cursor_id
    }

    pub(crate) fn restore(&self, cursor_id: i64, cursor: OpenCursor) {
        debug_assert_eq!(cursor.state, CursorState::More);
        let mut cursors = self.cursors.lock().unwrap();
        cursors.insert(cursor_id, cursor);
    }

    pub(crate) fn take(&self, cursor_id: i64) -> Option<OpenCursor> {
        let mut cursors = self.cursors.lock().unwrap();
        cursors.remove(&cursor_id)
    }

    pub(crate) fn remove(&self, cursor_ids: &[i64]) -> usize {
        let mut cursors = self.cursors.lock().unwrap();
        cursor_ids
            .iter()
            .filter(|id| cursors.remove(id).is_some())
            .count()
    }

    /// Drops every parked cursor idle for longer than its timeout.
    pub(crate) fn reap_expired(&self) -> usize {
        let now = Instant::now();
        let mut cursors = self.cursors.lock().unwrap();
        let before = cursors.len();
        cursors.retain(|id, cursor| {
            let keep = !cursor.expired(now);
            if !keep {
                warn!("closing cursor {} on timeout", id);
            }
            keep
        });
        let reaped = before - cursors.len();
        if reaped > 0 {
            debug!("{} cursors reaped, {} open", reaped, cursors.len());
        }
        reaped
    }

    pub(crate) fn len(&self) -> usize {
        self.cursors.lock().unwrap().len()
    }

}

impl Drop for CursorRegistry {

    fn drop(&mut self) {
        if let Ok(mut cursors) = self.cursors.lock() {
            cursors.clear();
        }
    }

}

#[cfg(test)]
mod tests {
    use bson::{doc, Document};
    use crate::errors::StoreResult;
    use super::*;

    /// Serves `total` documents numbered from zero.
    struct CountingCursor {
        next: usize,
        total: usize,
    }

    impl StoreCursor for CountingCursor {
        fn next_batch(&mut self, max: Option<usize>) -> StoreResult<Batch> {
            let mut documents: Vec<Document> = vec![];
            while self.next < self.total && max.map_or(true, |m| documents.len() < m) {
                documents.push(doc! { "n": self.next as i64 });
                self.next += 1;
            }
            Ok(Batch { documents, exhausted: self.next >= self.total })
        }
    }

    fn open(total: usize, batch_size: Option<usize>, timeout: Duration) -> OpenCursor {
        OpenCursor::new(Box::new(CountingCursor { next: 0, total }), batch_size, timeout)
    }

    #[tokio::test]
    async fn test_batches_in_order() {
        let cursor = open(23, Some(10), Duration::from_secs(10));
        assert_eq!(cursor.state(), CursorState::Opened);

        let (cursor, batch) = cursor.next_batch().await.unwrap();
        assert_eq!(batch.documents.len(), 10);
        assert_eq!(cursor.state(), CursorState::More);
        assert_eq!(batch.documents[0].get_i64("n").unwrap(), 0);

        let (cursor, batch) = cursor.next_batch().await.unwrap();
        assert_eq!(batch.documents[0].get_i64("n").unwrap(), 10);
        assert_eq!(cursor.state(), CursorState::More);

        let (cursor, batch) = cursor.next_batch().await.unwrap();
        assert_eq!(batch.documents.len(), 3);
        assert_eq!(cursor.state(), CursorState::Done);

        let (_, batch) = cursor.next_batch().await.unwrap();
        assert!(batch.documents.is_empty());
    }

    #[tokio::test]
    async fn test_unbounded_batch() {
        let (cursor, batch) = open(250, None, Duration::from_secs(10)).next_batch().await.unwrap();
        assert_eq!(batch.documents.len(), 250);
        assert_eq!(cursor.state(), CursorState::Done);
    }

    #[tokio::test]
    async fn test_take_and_restore() {
        let registry = CursorRegistry::new();
        let (cursor, _) = open(30, Some(10), Duration::from_secs(10)).next_batch().await.unwrap();
        let id = registry.save(cursor);
        assert_eq!(id, 1);
        assert_eq!(registry.len(), 1);

        let cursor = registry.take(id).unwrap();
        assert!(registry.take(id).is_none());
        registry.restore(id, cursor);
        assert_eq!(registry.remove(&[id, 42]), 1);
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_reap_expired() {
        let registry = CursorRegistry::new();
        let (short, _) = open(30, Some(10), Duration::from_millis(0)).next_batch().await.unwrap();
        let (long, _) = open(30, Some(10), Duration::from_secs(60)).next_batch().await.unwrap();
        let short_id = registry.save(short);
        let long_id = registry.save(long);

        assert_eq!(registry.reap_expired(), 1);
        assert!(registry.take(short_id).is_none());
        assert!(registry.take(long_id).is_some());
    }
}
