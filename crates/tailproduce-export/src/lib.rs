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

//! Optional TCP stream-export endpoint (§6.5): a singleton server, one thread per
//! accepted connection, that streams a registered stream's entries to whichever client
//! asks for it by name.
//!
//! This crate is an external collaborator of the core engine, not part of it — §1 lists
//! the exporter among the things deliberately kept out of `tailproduce`'s scope, and §6.5
//! says implementers MAY omit it entirely. It consumes only `tailproduce::Stream` plus
//! the `RawListener`/`Subscriptions`/`sync` primitives the core already exposes.
//!
//! Wire protocol, deliberately minimal: a client connects, writes one newline-terminated
//! ASCII line naming the registered path, then reads a stream of `u32` big-endian
//! length-prefixed frames, one per entry, in stream order, forever (or until the server
//! or the connection goes away). Entries are forwarded as whatever bytes the stream's own
//! codec produced — the exporter never deserializes them, so it has no dependency on any
//! particular entry type.
//!
//! The original's exporter detached connection threads without joining them on shutdown
//! (`SPEC_FULL.md`'s Open Question resolution); this implementation instead hands every
//! accepted connection a [`tailproduce::sync::ClientRegistry`] token, so dropping an
//! [`ExportServer`] blocks until every connection thread has actually exited.

mod error;
mod route;

pub use error::{ExportError, Result};

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::RwLock;

use tailproduce::key::FixedWidthUnsigned;
use tailproduce::sync::ClientRegistry;
use tailproduce::Stream;

use route::{ExportRoute, StreamRoute};

/// How often the accept loop re-checks for shutdown when no connection is pending.
const ACCEPT_POLL_PERIOD: Duration = Duration::from_millis(50);

/// A TCP server that streams registered streams' entries to connecting clients (§6.5).
///
/// Dropping an `ExportServer` stops accepting new connections, signals every open
/// connection to wind down, and joins the accept thread — but does not return until
/// every connection thread has released its [`tailproduce::sync::ClientRegistry`] token,
/// so no entry is ever delivered to a socket after the server has been torn down.
pub struct ExportServer {
    local_addr: SocketAddr,
    routes: Arc<RwLock<HashMap<String, Arc<dyn ExportRoute>>>>,
    registry: Arc<ClientRegistry>,
    stop: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl ExportServer {
    /// Binds `addr` and starts accepting connections in the background.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(ExportError::ServerSpawn)?;
        listener.set_nonblocking(true).map_err(ExportError::ServerSpawn)?;
        let local_addr = listener.local_addr().map_err(ExportError::ServerSpawn)?;

        let routes: Arc<RwLock<HashMap<String, Arc<dyn ExportRoute>>>> = Arc::new(RwLock::new(HashMap::new()));
        let registry = Arc::new(ClientRegistry::new());
        let stop = Arc::new(AtomicBool::new(false));

        let accept_routes = Arc::clone(&routes);
        let accept_registry = Arc::clone(&registry);
        let accept_stop = Arc::clone(&stop);
        let accept_thread = std::thread::spawn(move || {
            accept_loop(listener, accept_routes, accept_registry, accept_stop, local_addr)
        });

        Ok(Self {
            local_addr,
            routes,
            registry,
            stop,
            accept_thread: Some(accept_thread),
        })
    }

    /// The bound address, useful when `addr` used an ephemeral port (`:0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Registers `stream` to be tailed by clients that request `path` (§6.5's "per
    /// registered path"). Re-registering an existing path replaces it.
    pub fn register<P, S>(&self, path: impl Into<String>, stream: Arc<Stream<P, S>>)
    where
        P: FixedWidthUnsigned,
        S: FixedWidthUnsigned,
    {
        let path = path.into();
        tracing::debug!(path = %path, stream = %stream.name(), "registered export route");
        self.routes.write().insert(path, Arc::new(StreamRoute::new(stream)));
    }
}

impl Drop for ExportServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        // The accept thread's own `ClientRegistry` clone is gone now, so `self.registry`
        // dropping next blocks only on connection threads still winding down.
    }
}

fn accept_loop(
    listener: TcpListener,
    routes: Arc<RwLock<HashMap<String, Arc<dyn ExportRoute>>>>,
    registry: Arc<ClientRegistry>,
    stop: Arc<AtomicBool>,
    local_addr: SocketAddr,
) {
    loop {
        if stop.load(Ordering::Acquire) {
            return;
        }
        match listener.accept() {
            Ok((socket, peer)) => {
                let Some(client) = registry.scoped_client() else {
                    return;
                };
                let routes = Arc::clone(&routes);
                tracing::debug!(%peer, server = %local_addr, "accepted export connection");
                std::thread::spawn(move || handle_connection(socket, peer, &routes, client));
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_PERIOD);
            }
            Err(err) => {
                tracing::warn!(?err, "export accept loop stopping on socket error");
                return;
            }
        }
    }
}

fn handle_connection(
    socket: TcpStream,
    peer: SocketAddr,
    routes: &RwLock<HashMap<String, Arc<dyn ExportRoute>>>,
    client: tailproduce::sync::ScopedClient,
) {
    let _ = socket.set_nodelay(true);
    let mut reader = BufReader::new(match socket.try_clone() {
        Ok(clone) => clone,
        Err(err) => {
            tracing::warn!(%peer, ?err, "failed to clone export connection socket");
            return;
        }
    });
    let mut path = String::new();
    if reader.read_line(&mut path).is_err() {
        return;
    }
    let path = path.trim_end_matches(['\r', '\n']).to_owned();

    let route = routes.read().get(&path).cloned();
    match route {
        Some(route) => {
            tracing::debug!(%peer, %path, "export connection routed");
            route.run(socket, &client);
        }
        None => {
            tracing::warn!(%peer, %path, "export connection requested an unregistered path");
        }
    }
}
