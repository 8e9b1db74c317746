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

//! Per-stream set of pokeable listeners (§4.6). A publisher pokes *subscribers*, not a
//! single global condition variable, because one stream may have many listeners with
//! different ranges (§9); each [`crate::listener::async_listener::AsyncListener`] turns
//! `poke()` into a counter bump inside its own [`crate::sync::WaitableCell`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A poke target. A poke carries no data — it's a hint that data *may* be available
/// (§5); subscribers MUST re-check rather than trust the poke itself.
pub trait Subscriber: Send + Sync {
    fn poke(&self);
}

/// Opaque handle returned by [`Subscriptions::register`], needed to
/// [`Subscriptions::unregister`] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// A stream's set of subscribers (§4.6). `register`/`unregister` and `poke_all` are
/// mutually exclusive (both take the same lock), but `poke_all` never holds that lock
/// while invoking a subscriber's `poke()` — it snapshots the list first.
#[derive(Default)]
pub struct Subscriptions {
    subscribers: Mutex<Vec<(SubscriptionId, Arc<dyn Subscriber>)>>,
    next_id: AtomicU64,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn register(&self, subscriber: Arc<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, subscriber));
        id
    }

    pub fn unregister(&self, id: SubscriptionId) {
        self.subscribers.lock().retain(|(existing, _)| *existing != id);
    }

    /// Best-effort: calls `poke()` on every subscriber registered at the moment this is
    /// called, without holding the subscribers lock (or any other stream lock) during
    /// the calls themselves.
    pub fn poke_all(&self) {
        let snapshot: Vec<_> = self.subscribers.lock().iter().map(|(_, s)| Arc::clone(s)).collect();
        for subscriber in snapshot {
            subscriber.poke();
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingSubscriber(AtomicUsize);
    impl Subscriber for CountingSubscriber {
        fn poke(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn poke_all_reaches_every_registered_subscriber() {
        let subs = Subscriptions::new();
        let a = Arc::new(CountingSubscriber(AtomicUsize::new(0)));
        let b = Arc::new(CountingSubscriber(AtomicUsize::new(0)));
        subs.register(a.clone());
        subs.register(b.clone());

        subs.poke_all();
        subs.poke_all();

        assert_eq!(a.0.load(Ordering::SeqCst), 2);
        assert_eq!(b.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unregister_stops_future_pokes() {
        let subs = Subscriptions::new();
        let a = Arc::new(CountingSubscriber(AtomicUsize::new(0)));
        let id = subs.register(a.clone());
        subs.poke_all();
        subs.unregister(id);
        subs.poke_all();
        assert_eq!(a.0.load(Ordering::SeqCst), 1);
        assert_eq!(subs.len(), 0);
    }
}
