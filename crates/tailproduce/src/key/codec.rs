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

//! Fixed-width lexicographic encoding of unsigned integral order keys (§4.1).
//!
//! `pack_fixed` emits `WIDTH` ASCII digits, zero-padded on the left, where `WIDTH` matches
//! `std::numeric_limits<T>::digits10 + 1` from the original C++ (the number of decimal
//! digits needed to round-trip every value of the type, which for these widths also
//! happens to equal the digit count of `T::MAX`). Byte-wise comparison of two packed
//! values therefore reproduces their numeric order (P5).

use crate::error::KeyError;

/// An unsigned integer type usable as an [`crate::key::order_key::OrderKey`] component.
///
/// Implemented for the widths the original's `fixed_size_serializer.h` supported
/// (`u16`, `u32`, `u64`, `u128` — "width ≥ 2 bytes" per §4.1).
pub trait FixedWidthUnsigned: Copy + Ord + std::fmt::Debug + Send + Sync + 'static {
    /// Number of ASCII digits `pack_fixed` always emits for this type.
    const WIDTH: usize;

    /// The zero value, used as the fresh secondary key when a publisher advances to a
    /// new primary (§4.8's HEAD-advance rule).
    const ZERO: Self;

    fn pack_fixed(self) -> Vec<u8>;
    fn unpack_fixed(bytes: &[u8]) -> Result<Self, KeyError>
    where
        Self: Sized;

    /// `self + 1`, used when a publisher reuses the current primary (§4.8). Panics on
    /// overflow: the HEAD-advance rule never calls this on `Self::MAX`'s secondary in
    /// practice, and silently wrapping would violate monotonicity (I1).
    fn increment(self) -> Self;
}

macro_rules! impl_fixed_width_unsigned {
    ($ty:ty, $width:expr) => {
        impl FixedWidthUnsigned for $ty {
            const WIDTH: usize = $width;
            const ZERO: Self = 0;

            fn increment(self) -> Self {
                self.checked_add(1)
                    .expect("secondary order key overflowed its integer width")
            }

            fn pack_fixed(self) -> Vec<u8> {
                let mut formatted = itoa::Buffer::new();
                let digits = formatted.format(self).as_bytes();
                debug_assert!(digits.len() <= Self::WIDTH);
                let mut out = vec![b'0'; Self::WIDTH];
                let start = Self::WIDTH - digits.len();
                out[start..].copy_from_slice(digits);
                out
            }

            fn unpack_fixed(bytes: &[u8]) -> Result<Self, KeyError> {
                if bytes.len() != Self::WIDTH {
                    return Err(KeyError::MalformedKey(format!(
                        "expected {} digits, got {} bytes",
                        Self::WIDTH,
                        bytes.len()
                    )));
                }
                if !bytes.iter().all(u8::is_ascii_digit) {
                    return Err(KeyError::MalformedKey(
                        "non-digit byte in fixed-width key".to_owned(),
                    ));
                }
                let s = std::str::from_utf8(bytes).expect("validated ascii digits above");
                s.parse::<$ty>().map_err(|_| {
                    KeyError::MalformedKey(format!("value out of range for {}-bit field", $width))
                })
            }
        }
    };
}

// Widths equal `digits10(T) + 1` as in the original `fixed_size_serializer.h`:
// digits10(u16) = 4, digits10(u32) = 9, digits10(u64) = 19, digits10(u128) = 38.
impl_fixed_width_unsigned!(u16, 5);
impl_fixed_width_unsigned!(u32, 10);
impl_fixed_width_unsigned!(u64, 20);
impl_fixed_width_unsigned!(u128, 39);
