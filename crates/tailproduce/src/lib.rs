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

//! Turns an ordered key-value store into named, strongly-typed, append-only streams: a
//! monotonically advancing HEAD per stream, a single [`publisher::Publisher`] appending to
//! it, and any number of listeners tailing it (§1–§5).
//!
//! # Layout
//!
//! - [`key`] — fixed-width order keys and their storage-key encoding.
//! - [`config`] — the byte layout of storage keys.
//! - [`storage`] — the `Storage`/`StorageIterator` traits the engine is built against.
//! - [`sync`] — `WaitableCell`/`ClientRegistry`, the blocking-teardown primitives
//!   publishers, listeners, and the exporter crate coordinate through.
//! - [`subscriptions`] — per-stream poke targets.
//! - [`codec`] — entry (de)serialization, concrete and polymorphic.
//! - [`stream`] — per-stream HEAD and subscriber state.
//! - [`publisher`] — the sole appender for a stream.
//! - [`listener`] — synchronous and background-thread readers.
//! - [`manager`] — process-wide stream/publisher declaration and startup.
//!
//! This crate does not install a `tracing` subscriber; callers wire up their own (binaries
//! typically via `tracing_subscriber::fmt`).

pub mod codec;
pub mod config;
pub mod error;
pub mod key;
pub mod listener;
pub mod manager;
pub mod publisher;
pub mod storage;
pub mod stream;
pub mod subscriptions;
pub mod sync;

pub use codec::{Codec, JsonCodec};
pub use config::StorageKeyConfig;
pub use error::{Error, Result};
pub use key::{FixedWidthUnsigned, OrderKey};
pub use listener::{AsyncListener, RawListener};
pub use manager::{StreamManager, StreamManagerBuilder};
pub use publisher::Publisher;
pub use storage::{Storage, StorageIterator};
pub use stream::Stream;
