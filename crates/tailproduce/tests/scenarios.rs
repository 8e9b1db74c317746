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

//! End-to-end scenarios against the public API, with the worked `meta_prefix="s"`,
//! `data_prefix="d"`, `delimiter=':'`, `u32` primary/secondary encoding.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tailproduce::error::{Error, ListenerError, PublishError, StreamError};
use tailproduce::{AsyncListener, JsonCodec, OrderKey, RawListener, Storage, StreamManagerBuilder};
use tailproduce_memstore::MemoryStorage;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
struct Entry {
    ikey: u32,
    data: String,
}

fn storage() -> Arc<dyn Storage> {
    Arc::new(MemoryStorage::new())
}

#[test]
fn seed_and_recover() {
    let storage = storage();

    let manager = StreamManagerBuilder::new(Arc::clone(&storage))
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let stream = manager.stream::<u32, u32>("test").unwrap();
    assert_eq!(
        storage.get(b"s:test").unwrap(),
        b"d:test:0000000000:0000000000"
    );
    assert_eq!(stream.head(), OrderKey::new(0, 0));

    // Re-open with an empty initialization descriptor (no `seed_stream`): recovery, not
    // reseeding.
    let manager2 = StreamManagerBuilder::new(Arc::clone(&storage))
        .declare_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let stream2 = manager2.stream::<u32, u32>("test").unwrap();
    assert_eq!(stream2.head(), OrderKey::new(0, 0));
}

#[test]
fn simple_append_sequence() {
    let manager = StreamManagerBuilder::new(storage())
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let publisher = manager.publisher::<Entry, u32, u32, JsonCodec<Entry>>("test").unwrap();
    let stream = manager.stream::<u32, u32>("test").unwrap();

    for (ikey, data) in [(1u32, "one"), (2, "two"), (3, "three")] {
        publisher.push(&Entry { ikey, data: data.to_owned() }).unwrap();
    }

    assert_eq!(
        stream.storage().get(b"s:test").unwrap(),
        b"d:test:0000000003:0000000000"
    );
    for (ikey, data) in [(1u32, "one"), (2, "two"), (3, "three")] {
        let key = format!("d:test:{ikey:010}:0000000000");
        let value = stream.storage().get(key.as_bytes()).unwrap();
        assert_eq!(
            value,
            serde_json::to_vec(&Entry { ikey, data: data.to_owned() }).unwrap()
        );
    }
}

#[test]
fn secondary_key_collision() {
    let manager = StreamManagerBuilder::new(storage())
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let publisher = manager.publisher::<Entry, u32, u32, JsonCodec<Entry>>("test").unwrap();

    let h1 = publisher.push(&Entry { ikey: 1, data: "foo".into() }).unwrap();
    let h2 = publisher.push(&Entry { ikey: 1, data: "bar".into() }).unwrap();
    assert_eq!(h1, OrderKey::new(1, 0));
    assert_eq!(h2, OrderKey::new(1, 1));

    let stream = manager.stream::<u32, u32>("test").unwrap();
    assert_eq!(
        stream.storage().get(b"d:test:0000000001:0000000000").unwrap(),
        br#"{"ikey":1,"data":"foo"}"#
    );
    assert_eq!(
        stream.storage().get(b"d:test:0000000001:0000000001").unwrap(),
        br#"{"ikey":1,"data":"bar"}"#
    );
}

#[test]
fn regression_rejected() {
    let manager = StreamManagerBuilder::new(storage())
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let publisher = manager.publisher::<Entry, u32, u32, JsonCodec<Entry>>("test").unwrap();
    let stream = manager.stream::<u32, u32>("test").unwrap();

    publisher.push_head(2).unwrap();
    let before = stream.storage().get(b"s:test").unwrap();

    let err = publisher
        .push(&Entry { ikey: 1, data: "regressed".into() })
        .unwrap_err();
    assert!(matches!(err, Error::Publish(PublishError::OrderKeysGoBackwards { .. })));

    assert_eq!(stream.head(), OrderKey::new(2, 0));
    assert_eq!(stream.storage().get(b"s:test").unwrap(), before);
}

#[test]
fn bounded_listener() {
    let manager = StreamManagerBuilder::new(storage())
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let publisher = manager.publisher::<Entry, u32, u32, JsonCodec<Entry>>("test").unwrap();
    let stream = manager.stream::<u32, u32>("test").unwrap();

    for ikey in 1..=5u32 {
        publisher.push(&Entry { ikey, data: ikey.to_string() }).unwrap();
    }

    let mut listener = RawListener::new(stream, OrderKey::new(2, 0), Some(OrderKey::new(4, 0))).unwrap();
    let codec = JsonCodec::<Entry>::new();
    let mut seen = Vec::new();
    while listener.has_data().unwrap() {
        listener
            .process_current(&codec, &mut |e: Entry| seen.push(e.ikey), true)
            .unwrap();
        listener.advance().unwrap();
    }
    assert_eq!(seen, vec![2, 3]);

    assert!(matches!(
        listener.advance().unwrap_err(),
        Error::Listener(ListenerError::CannotAdvance)
    ));
    assert!(listener.reached_end_of_range().unwrap());
}

#[test]
fn tailing_listener() {
    let manager = StreamManagerBuilder::new(storage())
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let publisher = manager.publisher::<Entry, u32, u32, JsonCodec<Entry>>("test").unwrap();
    let stream = manager.stream::<u32, u32>("test").unwrap();

    let mut listener = RawListener::from_start(stream).unwrap();
    assert!(!listener.has_data().unwrap());

    publisher.push(&Entry { ikey: 10, data: "ten".into() }).unwrap();
    assert!(listener.has_data().unwrap());
    let codec = JsonCodec::<Entry>::new();
    let mut seen = Vec::new();
    listener
        .process_current(&codec, &mut |e: Entry| seen.push(e.ikey), true)
        .unwrap();
    listener.advance().unwrap();
    assert!(!listener.has_data().unwrap());

    publisher.push(&Entry { ikey: 15, data: "fifteen".into() }).unwrap();
    assert!(listener.has_data().unwrap());
    listener
        .process_current(&codec, &mut |e: Entry| seen.push(e.ikey), true)
        .unwrap();

    assert_eq!(seen, vec![10, 15]);
}

#[test]
fn publisher_uniqueness_refuses_a_stream_with_no_publisher() {
    let err = StreamManagerBuilder::new(storage())
        .declare_fresh_stream::<u32, u32>("orphan")
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stream(StreamError::StreamHasNoWriterDefined(names)) if names == vec!["orphan".to_string()]
    ));
}

#[test]
fn reseeding_a_stream_already_in_storage_fails_with_stream_already_exists() {
    let storage = storage();
    StreamManagerBuilder::new(Arc::clone(&storage))
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();

    let err = StreamManagerBuilder::new(Arc::clone(&storage))
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Stream(StreamError::StreamAlreadyExists(name)) if name == "test"
    ));
}

#[test]
fn async_listener_delivers_in_order_across_concurrent_publishes() {
    let manager = StreamManagerBuilder::new(storage())
        .declare_fresh_stream::<u32, u32>("test")
        .unwrap()
        .declare_publisher("test", JsonCodec::<Entry>::new(), |e: &Entry| e.ikey)
        .unwrap()
        .build()
        .unwrap();
    let publisher = manager.publisher::<Entry, u32, u32, JsonCodec<Entry>>("test").unwrap();
    let stream = manager.stream::<u32, u32>("test").unwrap();

    let received = Arc::new(std::sync::Mutex::new(Vec::new()));
    let received_in_handler = Arc::clone(&received);
    let mut listener = AsyncListener::spawn(
        stream,
        OrderKey::new(0, 0),
        JsonCodec::<Entry>::new(),
        move |e: Entry| received_in_handler.lock().unwrap().push(e.ikey),
    )
    .unwrap();

    for ikey in 1..=20u32 {
        publisher.push(&Entry { ikey, data: ikey.to_string() }).unwrap();
    }
    assert!(listener.wait_until_current());
    listener.stop();

    assert_eq!(*received.lock().unwrap(), (1..=20).collect::<Vec<_>>());
}
