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

//! The unique appender for a stream: enforces monotonic HEAD, writes the entry, updates
//! HEAD, pokes subscribers (§4.8).

use std::marker::PhantomData;
use std::sync::Arc;

use crate::codec::Codec;
use crate::error::{PublishError, Result};
use crate::key::codec::FixedWidthUnsigned;
use crate::key::order_key::OrderKey;
use crate::stream::Stream;

/// Computes the next HEAD for a candidate primary `p` against the current HEAD
/// `(p0, s0)` (§4.8's HEAD-advance rule):
///
/// - `p < p0` → rejected, `OrderKeysGoBackwards`.
/// - `p > p0` → `(p, 0)`.
/// - `p == p0` → `(p0, s0 + 1)`.
fn advance_head<P: FixedWidthUnsigned, S: FixedWidthUnsigned>(
    current: OrderKey<P, S>,
    primary: P,
) -> std::result::Result<OrderKey<P, S>, PublishError> {
    if primary < current.primary {
        return Err(PublishError::OrderKeysGoBackwards {
            attempted: format!("{primary:?}"),
            current: format!("{:?}", current.primary),
        });
    }
    if primary > current.primary {
        return Ok(OrderKey::new(primary, S::ZERO));
    }
    Ok(OrderKey::new(primary, current.secondary.increment()))
}

/// The sole appender for a [`Stream`] (I5: at most one `Publisher` per stream exists at
/// any time — enforced by [`crate::manager::StreamManager`], which hands out exactly one
/// `Arc<Publisher<_>>` per declared-with-publisher stream).
pub struct Publisher<E, P, S, C> {
    stream: Arc<Stream<P, S>>,
    codec: C,
    primary_of: Box<dyn Fn(&E) -> P + Send + Sync>,
    _entry: PhantomData<fn() -> E>,
}

impl<E, P, S, C> Publisher<E, P, S, C>
where
    P: FixedWidthUnsigned,
    S: FixedWidthUnsigned,
    C: Codec<E>,
{
    pub fn new(
        stream: Arc<Stream<P, S>>,
        codec: C,
        primary_of: impl Fn(&E) -> P + Send + Sync + 'static,
    ) -> Self {
        Self {
            stream,
            codec,
            primary_of: Box::new(primary_of),
            _entry: PhantomData,
        }
    }

    pub fn stream(&self) -> &Arc<Stream<P, S>> {
        &self.stream
    }

    /// Appends `entry` (§4.8). The new HEAD is derived from `entry`'s primary key via
    /// the caller-supplied extractor. Writes the HEAD marker before the data key (one of
    /// the two orderings §4.8 permits; see `SPEC_FULL.md`'s Open Question resolution for
    /// why this implementation picked this one): if the process crashes in between, HEAD
    /// points at a data key that doesn't exist yet, which the next append or any listener
    /// tolerates without corruption (§4.8's crash semantics).
    pub fn push(&self, entry: &E) -> Result<OrderKey<P, S>> {
        let mut head_guard = self.stream.head_lock().lock();
        let primary = (self.primary_of)(entry);
        let new_head = advance_head(*head_guard, primary)?;

        let data_key = new_head.compose_storage_key(self.stream.name(), self.stream.config());
        let bytes = self.codec.serialize(entry)?;

        self.stream.storage().set_overwrite(&self.stream.meta_key(), &data_key)?;
        self.stream.storage().set(&data_key, &bytes)?;
        *head_guard = new_head;
        drop(head_guard);

        tracing::debug!(stream = %self.stream.name(), head = ?new_head, "published entry");
        self.stream.subscriptions().poke_all();
        Ok(new_head)
    }

    /// Advances HEAD without appending an entry (§4.8).
    pub fn push_head(&self, primary: P) -> Result<OrderKey<P, S>> {
        let mut head_guard = self.stream.head_lock().lock();
        let new_head = advance_head(*head_guard, primary)?;

        let data_key = new_head.compose_storage_key(self.stream.name(), self.stream.config());
        self.stream.storage().set_overwrite(&self.stream.meta_key(), &data_key)?;
        *head_guard = new_head;
        drop(head_guard);

        tracing::debug!(stream = %self.stream.name(), head = ?new_head, "advanced head without data");
        self.stream.subscriptions().poke_all();
        Ok(new_head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::config::StorageKeyConfig;
    use serde::{Deserialize, Serialize};
    use tailproduce_memstore::MemoryStorage;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
    struct Entry {
        ikey: u32,
        data: String,
    }

    fn seeded_stream(name: &str) -> Arc<Stream<u32, u32>> {
        let storage: Arc<dyn crate::storage::Storage> = Arc::new(MemoryStorage::new());
        let config = StorageKeyConfig::default();
        let start = OrderKey::<u32, u32>::new(0, 0);
        storage
            .set(&crate::key::meta_key(name, &config), &start.compose_storage_key(name, &config))
            .unwrap();
        Stream::open(name, storage, config).unwrap()
    }

    fn publisher(name: &str) -> Publisher<Entry, u32, u32, JsonCodec<Entry>> {
        Publisher::new(seeded_stream(name), JsonCodec::new(), |e: &Entry| e.ikey)
    }

    #[test]
    fn simple_append_sequence_matches_worked_example() {
        let pub_ = publisher("test");
        pub_.push(&Entry { ikey: 1, data: "one".into() }).unwrap();
        pub_.push(&Entry { ikey: 2, data: "two".into() }).unwrap();
        let head = pub_.push(&Entry { ikey: 3, data: "three".into() }).unwrap();
        assert_eq!(head, OrderKey::new(3, 0));

        let meta = pub_.stream.storage().get(&pub_.stream.meta_key()).unwrap();
        assert_eq!(meta, b"d:test:0000000003:0000000000");

        for (p, data) in [(1u32, "one"), (2, "two"), (3, "three")] {
            let key = OrderKey::<u32, u32>::new(p, 0).compose_storage_key("test", pub_.stream.config());
            let value = pub_.stream.storage().get(&key).unwrap();
            assert_eq!(value, serde_json::to_vec(&Entry { ikey: p, data: data.into() }).unwrap());
        }
    }

    #[test]
    fn secondary_key_collision_bumps_secondary() {
        let pub_ = publisher("test");
        let h1 = pub_.push(&Entry { ikey: 1, data: "foo".into() }).unwrap();
        let h2 = pub_.push(&Entry { ikey: 1, data: "bar".into() }).unwrap();
        assert_eq!(h1, OrderKey::new(1, 0));
        assert_eq!(h2, OrderKey::new(1, 1));
    }

    #[test]
    fn regression_is_rejected_and_state_is_unchanged() {
        let pub_ = publisher("test");
        pub_.push_head(2).unwrap();
        let before_meta = pub_.stream.storage().get(&pub_.stream.meta_key()).unwrap();

        let err = pub_.push(&Entry { ikey: 1, data: "x".into() }).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Publish(PublishError::OrderKeysGoBackwards { .. })
        ));

        assert_eq!(pub_.stream.head(), OrderKey::new(2, 0));
        let after_meta = pub_.stream.storage().get(&pub_.stream.meta_key()).unwrap();
        assert_eq!(before_meta, after_meta);
    }

    #[test]
    fn concurrent_pushes_on_the_same_primary_serialize_into_distinct_secondaries() {
        let pub_ = Arc::new(publisher("test"));
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let pub_ = Arc::clone(&pub_);
                std::thread::spawn(move || {
                    pub_.push(&Entry { ikey: 1, data: i.to_string() }).unwrap()
                })
            })
            .collect();
        let mut heads: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        heads.sort();
        heads.dedup();
        assert_eq!(heads.len(), 8);
        assert_eq!(heads, (0..8u32).map(|s| OrderKey::new(1, s)).collect::<Vec<_>>());
        assert_eq!(pub_.stream.head(), OrderKey::new(1, 7));
    }
}
