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

//! Per-stream state: traits (name, key prefixes), current HEAD, subscriptions, and the
//! lock protecting HEAD mutations (§4.7).

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::StorageKeyConfig;
use crate::error::{Error, Result, StorageError, StreamError};
use crate::key::codec::FixedWidthUnsigned;
use crate::key::order_key::{self, OrderKey};
use crate::storage::Storage;
use crate::subscriptions::Subscriptions;

/// A single named, ordered stream (§3, §4.7).
///
/// Opening a `Stream` only reads its current HEAD from storage; it does not create the
/// stream. Creation happens at [`crate::manager::StreamManagerBuilder`] startup, which
/// seeds `M(name)` for streams declared with a starting key (§3's Lifecycles).
pub struct Stream<P, S> {
    name: String,
    config: StorageKeyConfig,
    storage: Arc<dyn Storage>,
    head: Mutex<OrderKey<P, S>>,
    subscriptions: Subscriptions,
}

impl<P, S> Stream<P, S>
where
    P: FixedWidthUnsigned,
    S: FixedWidthUnsigned,
{
    /// Recovers a stream by reading `M(name)` and decoding it into a HEAD (§3's
    /// Lifecycles, §4.7). Fails with [`StreamError::StreamDoesNotExist`] if the marker is
    /// absent, or a key error if its bytes don't decode to a valid `OrderKey`.
    pub fn open(name: impl Into<String>, storage: Arc<dyn Storage>, config: StorageKeyConfig) -> Result<Arc<Self>> {
        let name = name.into();
        let meta_key = order_key::meta_key(&name, &config);
        let value = storage.get(&meta_key).map_err(|err| match err {
            StorageError::NoData => Error::Stream(StreamError::StreamDoesNotExist(name.clone())),
            other => Error::Storage(other),
        })?;
        let head = OrderKey::decompose_storage_key(&value, &name, &config)?;

        tracing::debug!(stream = %name, ?head, "recovered stream head");

        Ok(Arc::new(Self {
            name,
            config,
            storage,
            head: Mutex::new(head),
            subscriptions: Subscriptions::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &StorageKeyConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// The current HEAD, read under the stream lock.
    pub fn head(&self) -> OrderKey<P, S> {
        *self.head.lock()
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    pub fn meta_key(&self) -> Vec<u8> {
        order_key::meta_key(&self.name, &self.config)
    }

    pub fn data_prefix(&self) -> Vec<u8> {
        order_key::data_prefix(&self.name, &self.config)
    }

    pub fn data_range_end(&self) -> Vec<u8> {
        order_key::data_range_end(&self.name, &self.config)
    }

    /// The lock guarding HEAD mutations. Exposed to [`crate::publisher::Publisher`]
    /// (which holds it across a full append) and
    /// [`crate::listener::raw::RawListener`] (which takes it only to make a single value
    /// read consistent with a concurrent append, §4.9).
    pub(crate) fn head_lock(&self) -> &Mutex<OrderKey<P, S>> {
        &self.head
    }
}
