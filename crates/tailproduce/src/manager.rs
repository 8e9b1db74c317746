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

//! Declares the full set of streams and publishers for a process up front, opens or
//! seeds them against storage, and refuses to start if any declared stream has no
//! publisher (§4.11).
//!
//! Streams and publishers carry different `(P, S, E, C)` type parameters per name, so a
//! single process-wide registry can't be a plain generic struct; it stores each one
//! behind `Box<dyn Any + Send + Sync>` and downcasts on lookup, the same shape the
//! builder's declare methods use to defer stream construction until `build()`.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::codec::Codec;
use crate::config::StorageKeyConfig;
use crate::error::{Error, Result, StorageError, StreamError};
use crate::key::codec::FixedWidthUnsigned;
use crate::key::order_key::{self, OrderKey};
use crate::publisher::Publisher;
use crate::storage::Storage;
use crate::stream::Stream;

type StreamOpener =
    Box<dyn FnOnce(Arc<dyn Storage>, StorageKeyConfig) -> Result<(String, Box<dyn Any + Send + Sync>)> + Send>;
type PublisherFactory = Box<dyn FnOnce(&StreamManager) -> Result<(String, Box<dyn Any + Send + Sync>)> + Send>;

/// The opened streams and constructed publishers for a process, built once at startup by
/// [`StreamManagerBuilder`].
pub struct StreamManager {
    streams: HashMap<String, Box<dyn Any + Send + Sync>>,
    publishers: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl StreamManager {
    /// Looks up a declared stream by name, typed as `(P, S)`. `None` if no stream with
    /// this name was declared, or if it was declared with different type parameters.
    pub fn stream<P, S>(&self, name: &str) -> Option<Arc<Stream<P, S>>>
    where
        P: FixedWidthUnsigned,
        S: FixedWidthUnsigned,
    {
        self.streams.get(name)?.downcast_ref::<Arc<Stream<P, S>>>().cloned()
    }

    /// Looks up a declared publisher by name, typed as `(E, P, S, C)`.
    pub fn publisher<E, P, S, C>(&self, name: &str) -> Option<Arc<Publisher<E, P, S, C>>>
    where
        E: Send + Sync + 'static,
        P: FixedWidthUnsigned,
        S: FixedWidthUnsigned,
        C: Codec<E> + 'static,
    {
        self.publishers
            .get(name)?
            .downcast_ref::<Arc<Publisher<E, P, S, C>>>()
            .cloned()
    }
}

/// Builds a [`StreamManager`]: declare every stream and publisher the process needs, then
/// call [`StreamManagerBuilder::build`] once (§4.11).
///
/// §4.11 distinguishes two declarations that this builder keeps separate:
///
/// - the **initialization descriptor** ([`StreamManagerBuilder::seed_stream`]): streams
///   being created for the first time, each with an explicit starting key. Seeding a
///   stream whose `M(name)` already exists is a [`StreamError::StreamAlreadyExists`]
///   conflict, not a silent recovery — a caller that means "start fresh" is told when
///   storage disagrees.
/// - the **static layout** ([`StreamManagerBuilder::declare_stream`]): every stream the
///   process uses, seeded or not. This is what's actually opened (HEAD read from
///   storage) and checked for publisher coverage at `build()` time. A stream may be
///   declared here without ever being seeded, provided storage already has its HEAD from
///   a prior run.
pub struct StreamManagerBuilder {
    storage: Arc<dyn Storage>,
    config: StorageKeyConfig,
    seeds: Vec<(String, Vec<u8>)>,
    seeded_names: HashSet<String>,
    declared_streams: HashSet<String>,
    declared_publishers: HashSet<String>,
    stream_openers: Vec<StreamOpener>,
    publisher_factories: Vec<PublisherFactory>,
}

impl StreamManagerBuilder {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            config: StorageKeyConfig::default(),
            seeds: Vec::new(),
            seeded_names: HashSet::new(),
            declared_streams: HashSet::new(),
            declared_publishers: HashSet::new(),
            stream_openers: Vec::new(),
            publisher_factories: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: StorageKeyConfig) -> Self {
        self.config = config;
        self
    }

    /// Lists `name` in the initialization descriptor with an explicit starting key
    /// (§4.11 step 1). At [`StreamManagerBuilder::build`] time this is written with a
    /// non-overwriting `set`: if `M(name)` already exists, the whole build fails with
    /// [`StreamError::StreamAlreadyExists`] rather than silently keeping the existing
    /// HEAD. Listing the same name twice fails immediately with
    /// [`StreamError::StreamAlreadyListedForCreation`].
    ///
    /// A stream only needs this call on the run that first creates it; later runs that
    /// recover it should call [`StreamManagerBuilder::declare_stream`] alone.
    pub fn seed_stream<P, S>(mut self, name: impl Into<String>, starting_key: OrderKey<P, S>) -> Result<Self>
    where
        P: FixedWidthUnsigned,
        S: FixedWidthUnsigned,
    {
        let name = name.into();
        if !self.seeded_names.insert(name.clone()) {
            return Err(StreamError::StreamAlreadyListedForCreation(name).into());
        }
        self.seeds
            .push((name.clone(), starting_key.compose_storage_key(&name, &self.config)));
        Ok(self)
    }

    /// Declares `name` as part of the process's static layout (§4.11 step 2): it will be
    /// opened — HEAD read from storage — and is subject to the publisher-coverage check
    /// at `build()` time. Fails with [`StreamError::StreamDoesNotExist`] at `build()` if
    /// `name` was neither seeded via [`StreamManagerBuilder::seed_stream`] this run nor
    /// already present in storage from a previous one.
    pub fn declare_stream<P, S>(mut self, name: impl Into<String>) -> Result<Self>
    where
        P: FixedWidthUnsigned,
        S: FixedWidthUnsigned,
    {
        let name = name.into();
        if !self.declared_streams.insert(name.clone()) {
            return Err(StreamError::StreamAlreadyListedForCreation(name).into());
        }

        let opener_name = name.clone();
        self.stream_openers.push(Box::new(move |storage, config| {
            let stream = Stream::<P, S>::open(opener_name.clone(), storage, config)?;
            Ok((opener_name, Box::new(stream) as Box<dyn Any + Send + Sync>))
        }));
        Ok(self)
    }

    /// Convenience for the common case of a stream that is seeded fresh at
    /// `(P::ZERO, S::ZERO)` and declared in the same breath — equivalent to calling
    /// [`StreamManagerBuilder::seed_stream`] with a zero starting key followed by
    /// [`StreamManagerBuilder::declare_stream`].
    pub fn declare_fresh_stream<P, S>(self, name: impl Into<String>) -> Result<Self>
    where
        P: FixedWidthUnsigned,
        S: FixedWidthUnsigned,
    {
        let name = name.into();
        self.seed_stream::<P, S>(name.clone(), OrderKey::new(P::ZERO, S::ZERO))?
            .declare_stream::<P, S>(name)
    }

    /// Declares the publisher for a stream declared via [`StreamManagerBuilder::declare_stream`].
    /// `primary_of` extracts the primary key an entry advances HEAD to (§4.8).
    pub fn declare_publisher<E, P, S, C>(
        mut self,
        name: impl Into<String>,
        codec: C,
        primary_of: impl Fn(&E) -> P + Send + Sync + 'static,
    ) -> Result<Self>
    where
        E: Send + Sync + 'static,
        P: FixedWidthUnsigned,
        S: FixedWidthUnsigned,
        C: Codec<E> + 'static,
    {
        let name = name.into();
        if !self.declared_publishers.insert(name.clone()) {
            return Err(StreamError::StreamAlreadyListedForCreation(name).into());
        }

        self.publisher_factories.push(Box::new(move |manager: &StreamManager| {
            let stream = manager
                .stream::<P, S>(&name)
                .ok_or_else(|| Error::Stream(StreamError::StreamDoesNotExist(name.clone())))?;
            let publisher = Arc::new(Publisher::new(stream, codec, primary_of));
            Ok((name, Box::new(publisher) as Box<dyn Any + Send + Sync>))
        }));
        Ok(self)
    }

    /// Seeds every declared stream's HEAD marker, opens every declared stream, constructs
    /// every declared publisher, and fails with [`StreamError::StreamHasNoWriterDefined`]
    /// if any declared stream ended up without a publisher (§4.11).
    pub fn build(self) -> Result<StreamManager> {
        for (name, seed_value) in &self.seeds {
            let meta_key = order_key::meta_key(name, &self.config);
            match self.storage.set(&meta_key, seed_value) {
                Ok(()) => {
                    tracing::debug!(stream = %name, "seeded fresh stream head");
                }
                Err(StorageError::OverwriteNotAllowed) => {
                    return Err(StreamError::StreamAlreadyExists(name.clone()).into());
                }
                Err(other) => return Err(other.into()),
            }
        }

        let mut manager = StreamManager {
            streams: HashMap::new(),
            publishers: HashMap::new(),
        };
        for opener in self.stream_openers {
            let (name, boxed) = opener(Arc::clone(&self.storage), self.config.clone())?;
            manager.streams.insert(name, boxed);
        }
        for factory in self.publisher_factories {
            let (name, boxed) = factory(&manager)?;
            manager.publishers.insert(name, boxed);
        }

        let missing: Vec<String> = manager
            .streams
            .keys()
            .filter(|name| !manager.publishers.contains_key(name.as_str()))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(StreamError::StreamHasNoWriterDefined(missing).into());
        }

        Ok(manager)
    }
}
