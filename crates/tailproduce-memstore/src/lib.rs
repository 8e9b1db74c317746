// Copyright 2026 TailProduce Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! An in-memory [`Storage`] backed by a `BTreeMap` behind a `parking_lot::RwLock`.
//!
//! Never garbage collects, never persists. Good enough for tests and local development,
//! never for production — the same tradeoff the teacher's own `MemoryStateStore` makes.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use parking_lot::RwLock;

use tailproduce::error::{ListenerError, Result as EngineResult, StorageError};
use tailproduce::storage::{check_key, check_value, Storage, StorageIterator};

/// How many entries a [`BatchedIterator`] pulls from the lock per refill: a trade-off
/// between copying overhead and how often the read lock is acquired, same as the
/// teacher's `batched_iter`.
const BATCH_SIZE: usize = 256;

#[derive(Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        check_key(key)?;
        check_value(value)?;
        let mut guard = self.inner.write();
        if guard.contains_key(key) {
            return Err(StorageError::OverwriteNotAllowed);
        }
        guard.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn set_overwrite(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        check_key(key)?;
        check_value(value)?;
        self.inner.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError> {
        check_key(key)?;
        self.inner.read().get(key).cloned().ok_or(StorageError::NoData)
    }

    fn has(&self, key: &[u8]) -> Result<bool, StorageError> {
        check_key(key)?;
        Ok(self.inner.read().contains_key(key))
    }

    fn iterator(&self, begin: &[u8], end: Option<&[u8]>) -> Result<Box<dyn StorageIterator>, StorageError> {
        // `begin` is a range bound, not a key to read or write: empty means "from the
        // very start", so unlike `set`/`get`/`has` this does not reject it via `check_key`.
        Ok(Box::new(BatchedIterator::new(
            Arc::clone(&self.inner),
            begin.to_vec(),
            end.map(<[u8]>::to_vec),
        )))
    }
}

/// A cursor that batches reads of the locked map rather than taking the lock per key,
/// trading a snapshot-at-batch-boundary for fewer lock acquisitions; this is exactly the
/// looseness [`tailproduce::storage::StorageIterator`] documents as permitted.
struct BatchedIterator {
    inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    next_begin: Vec<u8>,
    end: Option<Vec<u8>>,
    batch: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl BatchedIterator {
    fn new(inner: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>, begin: Vec<u8>, end: Option<Vec<u8>>) -> Self {
        let mut iter = Self {
            inner,
            next_begin: begin,
            end,
            batch: Vec::new().into_iter(),
            current: None,
        };
        iter.step();
        iter
    }

    fn refill(&mut self) {
        let start = Bound::Included(self.next_begin.clone());
        let end = match &self.end {
            Some(end) => Bound::Excluded(end.clone()),
            None => Bound::Unbounded,
        };
        let batch: Vec<_> = self
            .inner
            .read()
            .range((start, end))
            .take(BATCH_SIZE)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some((last_key, _)) = batch.last() {
            let mut resume_from = last_key.clone();
            resume_from.push(0x00);
            self.next_begin = resume_from;
        }
        self.batch = batch.into_iter();
    }

    fn step(&mut self) {
        if let Some(item) = self.batch.next() {
            self.current = Some(item);
            return;
        }
        self.refill();
        self.current = self.batch.next();
    }
}

impl StorageIterator for BatchedIterator {
    fn key(&self) -> &[u8] {
        &self.current.as_ref().expect("key() called on a done iterator").0
    }

    fn value(&self) -> &[u8] {
        &self.current.as_ref().expect("value() called on a done iterator").1
    }

    fn is_done(&self) -> bool {
        self.current.is_none()
    }

    fn advance(&mut self) -> EngineResult<()> {
        if self.current.is_none() {
            return Err(ListenerError::IteratorOutOfBounds.into());
        }
        self.step();
        Ok(())
    }
}
