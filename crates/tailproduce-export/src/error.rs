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

//! The `Network` error kinds §7 reserves for the exporter ("only if the exporter is
//! built"): `ServerSpawn`, `ServerRuntime`, `ServerLogic`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to start export server")]
    ServerSpawn(#[source] std::io::Error),
    #[error("export server runtime error")]
    ServerRuntime(#[source] std::io::Error),
    #[error("export server logic error")]
    ServerLogic(#[from] tailproduce::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;
