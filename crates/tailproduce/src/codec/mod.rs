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

//! Entry (de)serialization (§6.2). Two operations per entry type `E`: `serialize` and
//! `deserialize_and_dispatch`, the latter invoking a handler with the decoded entry so a
//! polymorphic codec (§6.2's "runtime type dispatch" style, see [`polymorphic`]) can hand
//! back any member of a tagged family through the same call shape as a concrete codec.

pub mod polymorphic;

use crate::error::CodecError;

/// A concrete or polymorphic entry codec (§6.2).
pub trait Codec<E>: Send + Sync {
    fn serialize(&self, entry: &E) -> Result<Vec<u8>, CodecError>;

    /// Decodes `bytes` and calls `handler` with the result. Taking a handler rather than
    /// returning `E` directly is what lets a polymorphic codec (§6.2, §9) dispatch to a
    /// visitor without requiring the caller to already know which family member it'll get.
    fn deserialize_and_dispatch(
        &self,
        bytes: &[u8],
        handler: &mut dyn FnMut(E),
    ) -> Result<(), CodecError>;
}

/// A concrete-type JSON codec: the straightforward case from §6.2 ("concrete-type
/// codec"), backing the `{ikey, data}` entries used in §8's worked examples.
pub struct JsonCodec<E> {
    _marker: std::marker::PhantomData<fn() -> E>,
}

impl<E> JsonCodec<E> {
    pub fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E> Default for JsonCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Codec<E> for JsonCodec<E>
where
    E: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
{
    fn serialize(&self, entry: &E) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(entry)?)
    }

    fn deserialize_and_dispatch(
        &self,
        bytes: &[u8],
        handler: &mut dyn FnMut(E),
    ) -> Result<(), CodecError> {
        let entry: E = serde_json::from_slice(bytes)?;
        handler(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Entry {
        ikey: u32,
        data: String,
    }

    #[test]
    fn json_codec_round_trips() {
        let codec = JsonCodec::<Entry>::new();
        let entry = Entry {
            ikey: 1,
            data: "one".to_owned(),
        };
        let bytes = codec.serialize(&entry).unwrap();
        assert_eq!(bytes, br#"{"ikey":1,"data":"one"}"#);

        let mut seen = None;
        codec.deserialize_and_dispatch(&bytes, &mut |e| seen = Some(e)).unwrap();
        assert_eq!(seen, Some(entry));
    }
}
