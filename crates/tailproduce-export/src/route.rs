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

//! Per-path export routes: a [`StreamRoute`] tails its [`tailproduce::Stream`] from the
//! beginning and forwards every entry's raw serialized bytes to a connected socket, using
//! the same poke/poll pattern as [`tailproduce::AsyncListener`] (§4.10) but writing to a
//! socket instead of calling a user handler.

use std::io::Write;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use tailproduce::codec::Codec;
use tailproduce::error::CodecError;
use tailproduce::key::FixedWidthUnsigned;
use tailproduce::subscriptions::Subscriber;
use tailproduce::sync::{ScopedClient, WaitableCell};
use tailproduce::{RawListener, Stream};

/// How often a connection re-checks for data even without a poke, mirroring
/// [`tailproduce::AsyncListener`]'s polling backstop.
const POLL_BACKSTOP: Duration = Duration::from_millis(200);

/// A codec that treats an entry as already-serialized bytes: the exporter forwards
/// whatever bytes a stream's own [`tailproduce::Codec`] produced without decoding them,
/// so it never needs to know the entry type.
struct RawBytesCodec;

impl Codec<Vec<u8>> for RawBytesCodec {
    fn serialize(&self, entry: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(entry.clone())
    }

    fn deserialize_and_dispatch(
        &self,
        bytes: &[u8],
        handler: &mut dyn FnMut(Vec<u8>),
    ) -> Result<(), CodecError> {
        handler(bytes.to_vec());
        Ok(())
    }
}

struct PokeState {
    generation: u64,
}

struct PokeRelay {
    cell: WaitableCell<PokeState>,
}

impl Subscriber for PokeRelay {
    fn poke(&self) {
        self.cell.with_write(|s| s.generation = s.generation.wrapping_add(1));
    }
}

/// A registered export path, dispatched to by name. Boxed as `Arc<dyn ExportRoute>` so
/// [`crate::ExportServer`] can hold routes over streams with different `(P, S)` type
/// parameters in one map, the same `dyn`-erasure shape
/// [`tailproduce::manager::StreamManager`] uses for streams of different types.
pub(crate) trait ExportRoute: Send + Sync {
    fn run(&self, socket: TcpStream, client: &ScopedClient);
}

pub(crate) struct StreamRoute<P, S> {
    stream: Arc<Stream<P, S>>,
}

impl<P, S> StreamRoute<P, S>
where
    P: FixedWidthUnsigned,
    S: FixedWidthUnsigned,
{
    pub(crate) fn new(stream: Arc<Stream<P, S>>) -> Self {
        Self { stream }
    }
}

/// Writes one `u32`-big-endian-length-prefixed frame. The length prefix lets a client
/// read exactly one entry at a time over a byte stream without needing the entry's own
/// encoding to be self-delimiting.
fn write_frame(socket: &mut TcpStream, bytes: &[u8]) -> std::io::Result<()> {
    socket.write_all(&(bytes.len() as u32).to_be_bytes())?;
    socket.write_all(bytes)?;
    socket.flush()
}

impl<P, S> ExportRoute for StreamRoute<P, S>
where
    P: FixedWidthUnsigned,
    S: FixedWidthUnsigned,
{
    fn run(&self, mut socket: TcpStream, client: &ScopedClient) {
        let mut cursor = match RawListener::from_start(Arc::clone(&self.stream)) {
            Ok(cursor) => cursor,
            Err(err) => {
                tracing::warn!(stream = %self.stream.name(), ?err, "export route failed to open cursor");
                return;
            }
        };

        let relay = Arc::new(PokeRelay {
            cell: WaitableCell::new(PokeState { generation: 0 }),
        });
        let subscription = self
            .stream
            .subscriptions()
            .register(Arc::clone(&relay) as Arc<dyn Subscriber>);
        let codec = RawBytesCodec;

        'outer: while client.is_live() {
            loop {
                match cursor.has_data() {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => {
                        tracing::warn!(stream = %self.stream.name(), ?err, "export route stopping on storage error");
                        break 'outer;
                    }
                }
                let mut frame = None;
                if let Err(err) = cursor.process_current(&codec, &mut |bytes: Vec<u8>| frame = Some(bytes), true) {
                    tracing::warn!(stream = %self.stream.name(), ?err, "export route stopping on decode error");
                    break 'outer;
                }
                if let Some(bytes) = frame {
                    if write_frame(&mut socket, &bytes).is_err() {
                        break 'outer;
                    }
                }
                if cursor.advance().is_err() {
                    break;
                }
            }

            let drained_through = relay.cell.with_read(|s| s.generation);
            relay
                .cell
                .wait_timeout(|s| s.generation != drained_through, POLL_BACKSTOP);
        }

        self.stream.subscriptions().unregister(subscription);
    }
}
