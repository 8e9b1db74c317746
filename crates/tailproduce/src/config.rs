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

//! Storage key layout configuration (§6.4): prefixes and delimiter, configurable via a
//! single value rather than scattered constants, matching how the original's
//! `config_values.h` grouped these under one struct.

/// The byte layout of storage keys the engine writes and reads.
///
/// `meta_prefix δ name` is the HEAD marker key; `data_prefix δ name δ pack(primary) δ
/// pack(secondary)` is a data key (§3, §6.4). No other keys are written by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeyConfig {
    pub meta_prefix: String,
    pub data_prefix: String,
    pub delimiter: u8,
}

impl Default for StorageKeyConfig {
    /// Matches the worked examples in §8: `meta_prefix = "s"`, `data_prefix = "d"`,
    /// `delimiter = ':'`.
    fn default() -> Self {
        Self {
            meta_prefix: "s".to_owned(),
            data_prefix: "d".to_owned(),
            delimiter: b':',
        }
    }
}
