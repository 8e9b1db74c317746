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

//! The ordered key-value store interface the engine consumes (§4.3, §6.1). The concrete
//! backend (an LSM-tree engine in production, a `BTreeMap` for tests) is an external
//! collaborator and out of scope for this crate; `tailproduce-memstore` provides the
//! in-memory implementation used by this crate's own tests.

use crate::error::StorageError;

/// A cursor over a `[begin, end)` key range, positioned at the least key ≥ `begin`.
///
/// Implementations MAY snapshot at creation time (§6.1): newly inserted keys need not
/// appear in an iterator created before they were written. The stream engine relies on
/// this by re-creating iterators whenever they run dry (§4.9).
pub trait StorageIterator: Send {
    /// The current key. Panics if [`StorageIterator::is_done`] is `true`.
    fn key(&self) -> &[u8];

    /// The current value. Panics if [`StorageIterator::is_done`] is `true`.
    fn value(&self) -> &[u8];

    /// `true` once the iterator has been exhausted or its current key is ≥ its end bound.
    fn is_done(&self) -> bool;

    /// Steps to the next key. Fails with [`crate::error::ListenerError::IteratorOutOfBounds`]
    /// if called when already done.
    fn advance(&mut self) -> crate::error::Result<()>;
}

/// The ordered key-value store the stream engine is built on (§6.1).
///
/// All operations MUST be safe for concurrent use from multiple threads; an iterator
/// returned by [`Storage::iterator`] is owned by a single thread at a time (§5).
pub trait Storage: Send + Sync {
    /// Writes `key ↦ value`. Fails with
    /// [`StorageError::OverwriteNotAllowed`] if `key` is already present.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Writes `key ↦ value`, replacing any prior value.
    fn set_overwrite(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Reads the value at `key`. Fails with [`StorageError::NoData`] if absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StorageError>;

    /// Whether `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool, StorageError>;

    /// Creates an iterator over `[begin, end)`; `end = None` means unbounded.
    fn iterator(
        &self,
        begin: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Box<dyn StorageIterator>, StorageError>;
}

/// Validates the non-empty-key precondition common to every [`Storage`] implementation
/// (§6.1), so backends don't each re-derive the `EmptyKey` check.
pub fn check_key(key: &[u8]) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::EmptyKey);
    }
    Ok(())
}

/// Validates the non-empty-value precondition common to every [`Storage`] implementation
/// (§6.1).
pub fn check_value(value: &[u8]) -> Result<(), StorageError> {
    if value.is_empty() {
        return Err(StorageError::EmptyValue);
    }
    Ok(())
}
