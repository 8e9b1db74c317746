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

//! Error taxonomy (§7). One `thiserror` enum per concern, composed into a single
//! crate-wide [`Error`] via `#[error(transparent)]` / `#[from]`, mirroring how the
//! teacher codebase keeps a per-module `Error`/`Result` pair and folds them into a
//! shared error type at the seams that need it.

use thiserror::Error;

/// `InvalidInput` / key-encoding failures (§4.1, §4.2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("malformed key: {0}")]
    MalformedKey(String),
}

/// `InvalidInput` / `NotFound` / `Conflict` failures raised by a [`crate::storage::Storage`]
/// implementation (§6.1).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage key must not be empty")]
    EmptyKey,
    #[error("storage value must not be empty")]
    EmptyValue,
    #[error("key already present, overwrite not allowed")]
    OverwriteNotAllowed,
    #[error("no data for key")]
    NoData,
}

/// `NotFound` / `Conflict` failures around stream lifecycle (§3, §4.7, §4.11).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream {0:?} does not exist")]
    StreamDoesNotExist(String),
    #[error("stream {0:?} already exists")]
    StreamAlreadyExists(String),
    #[error("stream {0:?} already listed for creation")]
    StreamAlreadyListedForCreation(String),
    #[error("streams declared with no writer defined: {0:?}")]
    StreamHasNoWriterDefined(Vec<String>),
}

/// `Ordering` failures raised by [`crate::publisher::Publisher`] (§4.8).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("order keys go backwards: attempted primary {attempted}, current head primary {current}")]
    OrderKeysGoBackwards { attempted: String, current: String },
}

/// `ListenerState` failures raised by [`crate::listener::raw::RawListener`] (§4.9).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("no data available")]
    NoDataAvailable,
    #[error("cannot advance: no data available")]
    CannotAdvance,
    #[error("iterator stepped past its bound")]
    IteratorOutOfBounds,
}

/// `PolymorphicDispatch` failures and general entry (de)serialization failures (§6.2, §9).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unrecognized type tag: {0:?}")]
    UnrecognizedType(String),
    #[error("malformed entry payload: {0}")]
    MalformedEntry(String),
    #[error("entry serialization failed")]
    Serde(#[from] serde_json::Error),
}

/// The crate-wide error type. Callers matching on specific failure categories should match
/// on the inner variant; this type exists so `?` composes across modules without manual
/// `From` impls at every call site.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, Error>;
