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

//! Composite `(primary, secondary)` order keys and their storage-key representation
//! (§3, §4.2).

use crate::config::StorageKeyConfig;
use crate::error::KeyError;
use crate::key::codec::FixedWidthUnsigned;

/// `K = (primary: P, secondary: S)`. Total order is lexicographic on `(primary,
/// secondary)`; deriving `Ord` on a two-field tuple struct gives exactly that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey<P, S> {
    pub primary: P,
    pub secondary: S,
}

impl<P, S> OrderKey<P, S> {
    pub const fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

impl<P: FixedWidthUnsigned, S: FixedWidthUnsigned> OrderKey<P, S> {
    /// `D(name, primary, secondary) = "d" δ name δ pack(primary) δ pack(secondary)`.
    ///
    /// This is also the byte string persisted as the *value* of the HEAD marker key
    /// (§6.4: "HEAD is self-describing"), so this same method produces both the data key
    /// and the HEAD value.
    pub fn compose_storage_key(&self, name: &str, config: &StorageKeyConfig) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            config.data_prefix.len() + 1 + name.len() + 1 + P::WIDTH + 1 + S::WIDTH,
        );
        out.extend_from_slice(config.data_prefix.as_bytes());
        out.push(config.delimiter);
        out.extend_from_slice(name.as_bytes());
        out.push(config.delimiter);
        out.extend_from_slice(&self.primary.pack_fixed());
        out.push(config.delimiter);
        out.extend_from_slice(&self.secondary.pack_fixed());
        out
    }

    /// Parses a storage key (or HEAD value, which has the same shape) back into an
    /// [`OrderKey`]. Fails with [`KeyError::MalformedKey`] if the prefix, delimiters, or
    /// digit regions don't match.
    pub fn decompose_storage_key(
        bytes: &[u8],
        name: &str,
        config: &StorageKeyConfig,
    ) -> Result<Self, KeyError> {
        let mut expected_prefix =
            Vec::with_capacity(config.data_prefix.len() + 1 + name.len() + 1);
        expected_prefix.extend_from_slice(config.data_prefix.as_bytes());
        expected_prefix.push(config.delimiter);
        expected_prefix.extend_from_slice(name.as_bytes());
        expected_prefix.push(config.delimiter);

        let expected_len = expected_prefix.len() + P::WIDTH + 1 + S::WIDTH;
        if bytes.len() != expected_len {
            return Err(KeyError::MalformedKey(format!(
                "expected a {expected_len}-byte data key, got {} bytes",
                bytes.len()
            )));
        }
        if &bytes[..expected_prefix.len()] != expected_prefix.as_slice() {
            return Err(KeyError::MalformedKey(
                "data key prefix does not match stream name".to_owned(),
            ));
        }

        let rest = &bytes[expected_prefix.len()..];
        let primary = P::unpack_fixed(&rest[..P::WIDTH])?;
        if rest[P::WIDTH] != config.delimiter {
            return Err(KeyError::MalformedKey(
                "missing delimiter between primary and secondary".to_owned(),
            ));
        }
        let secondary = S::unpack_fixed(&rest[P::WIDTH + 1..])?;

        Ok(Self { primary, secondary })
    }
}

/// `M(name) = "s" δ name`, the HEAD marker key.
pub fn meta_key(name: &str, config: &StorageKeyConfig) -> Vec<u8> {
    let mut out = Vec::with_capacity(config.meta_prefix.len() + 1 + name.len());
    out.extend_from_slice(config.meta_prefix.as_bytes());
    out.push(config.delimiter);
    out.extend_from_slice(name.as_bytes());
    out
}

/// `"d" δ name δ`, the inclusive lower bound of every data key for `name`.
pub fn data_prefix(name: &str, config: &StorageKeyConfig) -> Vec<u8> {
    let mut out = Vec::with_capacity(config.data_prefix.len() + 1 + name.len() + 1);
    out.extend_from_slice(config.data_prefix.as_bytes());
    out.push(config.delimiter);
    out.extend_from_slice(name.as_bytes());
    out.push(config.delimiter);
    out
}

/// `D(name, ∞) = "d" δ name δ 0xFF`: strictly greater than every data key for `name`
/// and, so long as stream names aren't prefixes of one another across the delimiter
/// byte, strictly less than the first data key of any lexicographically later name.
pub fn data_range_end(name: &str, config: &StorageKeyConfig) -> Vec<u8> {
    let mut out = data_prefix(name, config);
    out.push(0xFF);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_matches_worked_example() {
        let config = StorageKeyConfig::default();
        let key = OrderKey::<u32, u32>::new(3, 0);
        assert_eq!(
            key.compose_storage_key("test", &config),
            b"d:test:0000000003:0000000000"
        );
    }

    #[test]
    fn compose_decompose_round_trip() {
        let config = StorageKeyConfig::default();
        for (p, s) in [(0u32, 0u32), (1, 1), (42, 7), (u32::MAX, u32::MAX)] {
            let key = OrderKey::<u32, u32>::new(p, s);
            let bytes = key.compose_storage_key("stream-a", &config);
            let decoded = OrderKey::<u32, u32>::decompose_storage_key(&bytes, "stream-a", &config)
                .unwrap();
            assert_eq!(decoded, key);
        }
    }

    #[test]
    fn decompose_rejects_wrong_stream_name() {
        let config = StorageKeyConfig::default();
        let bytes = OrderKey::<u32, u32>::new(1, 0).compose_storage_key("a", &config);
        assert!(OrderKey::<u32, u32>::decompose_storage_key(&bytes, "b", &config).is_err());
    }

    #[test]
    fn meta_and_prefix_keys_match_worked_example() {
        let config = StorageKeyConfig::default();
        assert_eq!(meta_key("test", &config), b"s:test");
        assert_eq!(data_prefix("test", &config), b"d:test:");
        assert_eq!(data_range_end("test", &config), b"d:test:\xFF");
    }

    #[test]
    fn lexicographic_order_matches_key_order() {
        let config = StorageKeyConfig::default();
        let a = OrderKey::<u32, u32>::new(1, 5);
        let b = OrderKey::<u32, u32>::new(1, 6);
        let c = OrderKey::<u32, u32>::new(2, 0);
        assert!(a < b && b < c);
        assert!(a.compose_storage_key("s", &config) < b.compose_storage_key("s", &config));
        assert!(b.compose_storage_key("s", &config) < c.compose_storage_key("s", &config));
    }
}
