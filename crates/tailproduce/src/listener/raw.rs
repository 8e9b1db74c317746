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

//! A synchronous cursor over a stream's data range (§4.9): `has_data`,
//! `reached_end_of_range`, `process_current`, `advance`.

use std::sync::Arc;

use crate::codec::Codec;
use crate::error::{ListenerError, Result};
use crate::key::codec::FixedWidthUnsigned;
use crate::key::order_key::OrderKey;
use crate::storage::StorageIterator;
use crate::stream::Stream;

/// Reads entries from `[begin, end)` of a stream's data range, oldest first.
///
/// Storage iterators may snapshot at creation time (§6.1), so a `RawListener` doesn't
/// treat "the underlying iterator is done" as final: it remembers the key to resume from
/// and transparently re-creates the iterator whenever it runs dry, which is what lets the
/// same cursor serve both a bounded read and a tailing listener (§4.9, §4.10) without the
/// caller having to know which.
pub struct RawListener<P, S> {
    stream: Arc<Stream<P, S>>,
    next_begin: Vec<u8>,
    end: Vec<u8>,
    iter: Box<dyn StorageIterator>,
}

impl<P, S> RawListener<P, S>
where
    P: FixedWidthUnsigned,
    S: FixedWidthUnsigned,
{
    /// Opens a listener over `[begin, end)`. `end = None` means the rest of the stream's
    /// data range, i.e. a tailing read (§4.10 builds [`crate::listener::AsyncListener`] on
    /// top of exactly this case).
    pub fn new(stream: Arc<Stream<P, S>>, begin: OrderKey<P, S>, end: Option<OrderKey<P, S>>) -> Result<Self> {
        let begin_bytes = begin.compose_storage_key(stream.name(), stream.config());
        let end_bytes = match end {
            Some(end) => end.compose_storage_key(stream.name(), stream.config()),
            None => stream.data_range_end(),
        };
        let iter = stream.storage().iterator(&begin_bytes, Some(&end_bytes))?;
        Ok(Self {
            stream,
            next_begin: begin_bytes,
            end: end_bytes,
            iter,
        })
    }

    /// A listener over the whole stream, from its very first entry.
    pub fn from_start(stream: Arc<Stream<P, S>>) -> Result<Self> {
        Self::new(stream, OrderKey::new(P::ZERO, S::ZERO), None)
    }

    fn refresh(&mut self) -> Result<()> {
        if self.iter.is_done() {
            self.iter = self.stream.storage().iterator(&self.next_begin, Some(&self.end))?;
        }
        Ok(())
    }

    /// Whether an entry is currently available to process.
    pub fn has_data(&mut self) -> Result<bool> {
        self.refresh()?;
        Ok(!self.iter.is_done())
    }

    /// Whether the listener has exhausted `[begin, end)` as of this call. Since storage
    /// may have been snapshotted, this can flip back to `false` on a later call if new
    /// entries were published in the meantime (§4.9).
    pub fn reached_end_of_range(&mut self) -> Result<bool> {
        self.refresh()?;
        Ok(self.iter.is_done())
    }

    /// Decodes the entry at the cursor's current position and hands it to `handler`. If
    /// `require_data` is set, fails with [`ListenerError::NoDataAvailable`] when nothing
    /// is available; otherwise a missing entry is a silent no-op, for callers that already
    /// checked [`RawListener::has_data`] themselves.
    ///
    /// Reads the value bytes under the stream's HEAD lock, so the read is consistent with
    /// a concurrent append rather than racing it (§4.9).
    pub fn process_current<E>(
        &mut self,
        codec: &dyn Codec<E>,
        handler: &mut dyn FnMut(E),
        require_data: bool,
    ) -> Result<()> {
        self.refresh()?;
        if self.iter.is_done() {
            return if require_data {
                Err(ListenerError::NoDataAvailable.into())
            } else {
                Ok(())
            };
        }
        let _head_guard = self.stream.head_lock().lock();
        codec.deserialize_and_dispatch(self.iter.value(), handler)?;
        Ok(())
    }

    /// Steps to the next entry. Fails with [`ListenerError::CannotAdvance`] if nothing is
    /// currently available.
    pub fn advance(&mut self) -> Result<()> {
        self.refresh()?;
        if self.iter.is_done() {
            return Err(ListenerError::CannotAdvance.into());
        }
        let mut resume_from = self.iter.key().to_vec();
        resume_from.push(0x00);
        self.iter.advance()?;
        self.next_begin = resume_from;
        Ok(())
    }
}
