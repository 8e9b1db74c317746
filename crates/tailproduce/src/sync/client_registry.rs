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

//! A degenerate [`WaitableCell`] used only for its teardown semantics (§4.5): bounding
//! the lifetime of detached worker threads (the TCP exporter, async listeners) so that
//! shutdown joins every worker instead of leaking or racing with it.

use crate::sync::waitable_cell::{ClientToken, WaitableCell};

/// Issues [`ClientToken`]s that stay truthy while the registry is alive; dropping the
/// registry blocks until every issued token has been released and refuses to issue new
/// ones thereafter.
pub struct ClientRegistry {
    cell: WaitableCell<()>,
}

/// A scoped client handle from a [`ClientRegistry`]. Truthy (via [`ScopedClient::is_live`])
/// until the registry starts tearing down.
pub type ScopedClient = ClientToken<()>;

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            cell: WaitableCell::new(()),
        }
    }

    /// Takes a client token. `None` if the registry is already tearing down.
    pub fn scoped_client(&self) -> Option<ScopedClient> {
        self.cell.register_client()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn drop_waits_for_every_outstanding_client() {
        let registry = ClientRegistry::new();
        let completed = Arc::new(AtomicUsize::new(0));

        // Tokens are acquired from the owning thread and moved into workers, mirroring
        // how `AsyncListener`/the exporter hand a `ScopedClient` to a spawned thread.
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let client = registry.scoped_client().unwrap();
                let completed = Arc::clone(&completed);
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_millis(15));
                    completed.fetch_add(1, Ordering::SeqCst);
                    drop(client);
                })
            })
            .collect();

        drop(registry); // blocks until every worker has dropped its token
        assert_eq!(completed.load(Ordering::SeqCst), 4);

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn no_new_clients_after_teardown() {
        let registry = ClientRegistry::new();
        let client = registry.scoped_client().unwrap();
        assert!(client.is_live());
        drop(client);
    }
}
