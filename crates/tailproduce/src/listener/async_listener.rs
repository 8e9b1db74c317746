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

//! A background worker thread that drains newly published entries to a callback as they
//! arrive (§4.10), built on [`RawListener`] plus the poke mechanism (§4.6).
//!
//! Deliberately a plain OS thread, not a future: the engine runs on parallel OS threads
//! with no cooperative scheduler (§5), so "wake up and drain" is a condvar wait, not a
//! waker registration.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::codec::Codec;
use crate::key::codec::FixedWidthUnsigned;
use crate::key::order_key::OrderKey;
use crate::listener::raw::RawListener;
use crate::stream::Stream;
use crate::subscriptions::{Subscriber, SubscriptionId};
use crate::sync::WaitableCell;

/// How often the worker re-checks for data even without a poke. A poke that lands
/// between the worker's last drain and its call to `wait_timeout` is still observed (the
/// generation counter it bumps is checked again on the next iteration regardless), so this
/// is a backstop against a lost wakeup, not the primary delivery path.
const POLL_BACKSTOP: Duration = Duration::from_millis(200);

struct PokeState {
    generation: u64,
    idle_generation: u64,
    stop: bool,
}

struct PokeRelay {
    cell: WaitableCell<PokeState>,
}

impl Subscriber for PokeRelay {
    fn poke(&self) {
        self.cell.with_write(|s| s.generation = s.generation.wrapping_add(1));
    }
}

/// Drains a stream's newly published entries to a handler on a dedicated thread, from
/// `begin` onward, until stopped or dropped (§4.10).
pub struct AsyncListener<P, S> {
    stream: Arc<Stream<P, S>>,
    relay: Arc<PokeRelay>,
    subscription: SubscriptionId,
    handle: Option<JoinHandle<()>>,
}

impl<P, S> AsyncListener<P, S>
where
    P: FixedWidthUnsigned,
    S: FixedWidthUnsigned,
{
    /// Spawns the worker. `handler` is called once per entry, in stream order, on the
    /// worker thread — never on the caller's thread and never while any stream lock is
    /// held (§4.6's "subscribers MUST re-check rather than trust the poke itself" is the
    /// worker's job, not the handler's).
    pub fn spawn<E, C>(
        stream: Arc<Stream<P, S>>,
        begin: OrderKey<P, S>,
        codec: C,
        mut handler: impl FnMut(E) + Send + 'static,
    ) -> crate::error::Result<Self>
    where
        E: Send + 'static,
        C: Codec<E> + 'static,
    {
        let relay = Arc::new(PokeRelay {
            cell: WaitableCell::new(PokeState {
                generation: 0,
                idle_generation: 0,
                stop: false,
            }),
        });
        let subscription = stream
            .subscriptions()
            .register(Arc::clone(&relay) as Arc<dyn Subscriber>);

        let mut cursor = RawListener::new(Arc::clone(&stream), begin, None)?;
        let worker_relay = Arc::clone(&relay);
        let name = stream.name().to_owned();
        let handle = std::thread::spawn(move || loop {
            loop {
                match cursor.has_data() {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => {
                        tracing::warn!(stream = %name, ?err, "async listener stopping on storage error");
                        return;
                    }
                }
                if let Err(err) = cursor.process_current(&codec, &mut handler, true) {
                    tracing::warn!(stream = %name, ?err, "async listener stopping on decode error");
                    return;
                }
                if let Err(err) = cursor.advance() {
                    tracing::warn!(stream = %name, ?err, "async listener stopping on advance error");
                    return;
                }
            }

            let drained_through = worker_relay.cell.with_read(|s| s.generation);
            worker_relay.cell.with_write(|s| s.idle_generation = drained_through);

            worker_relay
                .cell
                .wait_timeout(|s| s.generation != drained_through || s.stop, POLL_BACKSTOP);
            if worker_relay.cell.with_read(|s| s.stop) {
                return;
            }
        });

        Ok(Self {
            stream,
            relay,
            subscription,
            handle: Some(handle),
        })
    }

    /// Blocks until the worker has drained every entry published up to this call (not
    /// entries published after it returns). Useful for tests that need delivery to have
    /// happened before asserting on it, without sleeping arbitrary amounts of time.
    pub fn wait_until_current(&self) -> bool {
        let target = self.relay.cell.with_read(|s| s.generation);
        self.relay.cell.wait(|s| s.idle_generation >= target || s.stop)
    }

    /// Requests shutdown and joins the worker thread. Idempotent.
    pub fn stop(&mut self) {
        self.relay.cell.with_write(|s| s.stop = true);
        self.stream.subscriptions().unregister(self.subscription);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl<P, S> Drop for AsyncListener<P, S> {
    fn drop(&mut self) {
        self.stop();
    }
}
