// Copyright 2025 Johann Kempter
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
//
// SPDX-License-Identifier: Apache-2.0

//! # regionatlas Prelude
//!
//! Convenient re-exports of the types most callers need to share mapped database files.

/// The main error type for all regionatlas operations
pub use crate::Error;

/// The result type used throughout regionatlas
pub use crate::Result;

/// The region atlas and its configuration
pub use crate::{Atlas, AtlasConfig, MemoryUsage};

/// Per-consumer access to mapped files
pub use crate::{MappedFileHandle, MappedRegion};

/// Locking and memory accounting
pub use crate::{CoordinatingLock, ExternalAllocation, LockToken};

/// File identity and loading
pub use crate::file::{Backend, FileKind, FilePath, LoadStrategy};
