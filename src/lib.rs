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

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # regionatlas
//!
//! A bounded, reference-counted cache of memory-mapped read-only database files, shared by
//! many concurrent readers.
//!
//! Sequence database readers constantly ask for "the bytes of volume F at offset O". Opening,
//! mapping and unmapping a file for every such request is slow and exhausts file descriptors
//! under load. `regionatlas` keeps one mapping per file for as long as any reader needs it, and
//! unmaps it the moment the last reader lets go.
//!
//! ## Features
//!
//! - **Shared mappings** - Every reader of a file shares one read-only mapping
//! - **Exact lifetime** - A mapping is torn down when its last reference is released, never
//!   before
//! - **Cached metadata** - Existence and size answered from a cache, important on network
//!   filesystems
//! - **Bounded resources** - An open-file ceiling and an advisory memory bound
//! - **Optional coordination** - A re-entrant coordinating lock that can be shared, or switched off
//!   entirely for threads working on disjoint files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use regionatlas::prelude::*;
//! use std::sync::Arc;
//!
//! let atlas = Atlas::shared(AtlasConfig::default());
//!
//! let mut index = MappedFileHandle::new(Arc::clone(&atlas));
//! index.bind("/db/nt.00.nin")?;
//!
//! let mut sequence = MappedFileHandle::new(Arc::clone(&atlas));
//! sequence.bind("/db/nt.00.nsq")?;
//!
//! println!("index header: {:02x?}", index.data_slice(0, 8)?);
//! println!("{} files mapped", atlas.open_file_count());
//! # Ok::<(), regionatlas::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`Atlas`] - Owns the caches, the optional coordinating lock and the policy knobs
//! - [`MappedFileHandle`] - A consumer's binding to one file
//! - [`LockToken`] - Idempotent, scoped hold on the coordinating lock
//! - [`ExternalAllocation`] - Counts outside allocations against the memory bound
//! - [`file`] - Backends that turn a path into bytes
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Every failure is returned to the immediate caller; nothing in this crate is fatal to the
//! process, and the crate never logs, retries or swallows an error.
//!
//! ```rust,no_run
//! use regionatlas::{Atlas, Error};
//!
//! let atlas = Atlas::new(true);
//! match atlas.acquire_mapping("/db/nr.00.psq") {
//!     Ok(region) => {
//!         println!("{} bytes", region.len());
//!         atlas.release_mapping(region);
//!     }
//!     Err(Error::NotFound { .. }) => println!("no such volume"),
//!     Err(e) => println!("data unavailable: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! Mapping creation and teardown are reported as `tracing` events at `debug` level, reference
//! count changes at `trace` level. No subscriber is installed by this crate.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use regionatlas::prelude::*;
///
/// let atlas = Atlas::new(true);
/// assert!(!atlas.exists("/nonexistent/db.nin"));
/// ```
pub mod prelude;

pub mod file;

pub mod utils;

pub mod atlas;

pub use atlas::{
    config::AtlasConfig, Atlas, ExternalAllocation, FileMetadataCache, FileMetadataEntry,
    LockToken, MappedFileHandle, MappedFileRegistry, MappedRegion, MemoryUsage, OpenFileCounter,
};
pub use error::{Error, MapError};
pub use file::{FileKind, FilePath, LoadStrategy};
pub use utils::synchronization::CoordinatingLock;

/// `regionatlas` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
