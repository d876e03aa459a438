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

//! The region atlas: shared, reference-counted access to read-only database files.
//!
//! An [`Atlas`] coordinates three pieces of state:
//!
//! - a [`FileMetadataCache`] answering "does this file exist, and how big is it" without
//!   repeated stat calls,
//! - a [`MappedFileRegistry`] holding one shared mapping per file for as long as any consumer
//!   references it,
//! - an optional [`CoordinatingLock`] serializing call sequences that touch both.
//!
//! Consumers normally go through a [`MappedFileHandle`]; the raw
//! [`Atlas::acquire_mapping`]/[`Atlas::release_mapping`] pair is available for callers that
//! manage references themselves.
//!
//! # Lock Order
//!
//! The coordinating lock, when enabled, is always taken first. Under it, at most one of the
//! metadata cache and registry shard locks is held at any time, and neither is held while
//! taking the other. Stat, open and map calls happen under those locks; on a filesystem that
//! hangs, the caller hangs with it. There is no internal timeout.
//!
//! # Examples
//!
//! ```rust,no_run
//! use regionatlas::{Atlas, AtlasConfig, MappedFileHandle};
//! use std::sync::Arc;
//!
//! let atlas = Atlas::shared(AtlasConfig::from_env());
//!
//! if let Some(path) = atlas.resolve("nt.00.nsq") {
//!     let size = atlas.size_of(&path).unwrap_or(0);
//!     let mut handle = MappedFileHandle::new(Arc::clone(&atlas));
//!     handle.bind(&path)?;
//!
//!     let window = atlas.recommended_slice_size(size) as usize;
//!     let first = handle.data_slice(0, window)?;
//!     println!("{} of {} bytes addressed", first.len(), size);
//! }
//! println!("{} files open", atlas.open_file_count());
//! # Ok::<(), regionatlas::Error>(())
//! ```

pub(crate) mod alloc;
pub mod config;
pub(crate) mod handle;
pub(crate) mod lock;
pub(crate) mod metadata;
pub(crate) mod registry;

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

pub use alloc::ExternalAllocation;
pub use config::AtlasConfig;
pub use handle::MappedFileHandle;
pub use lock::LockToken;
pub use metadata::{FileMetadataCache, FileMetadataEntry};
pub use registry::{MappedFileRegistry, MappedRegion, OpenFileCounter};

use crate::{
    file::{FileKind, FilePath},
    utils::synchronization::CoordinatingLock,
    Error, Result,
};

/// Snapshot of the bytes counted against the advisory memory bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes held by open mappings
    pub mapped_bytes: u64,
    /// Bytes registered through [`ExternalAllocation`]
    pub external_bytes: u64,
    /// The configured bound
    pub bound: u64,
    /// How many registrations found the total above the bound
    pub bound_crossings: u64,
}

impl MemoryUsage {
    /// Mapped plus registered bytes.
    pub fn total(&self) -> u64 {
        self.mapped_bytes.saturating_add(self.external_bytes)
    }

    /// Returns `true` if the total exceeds the bound.
    pub fn is_over_bound(&self) -> bool {
        self.total() > self.bound
    }
}

/// Bounded, reference-counted cache of read-only file mappings.
///
/// One atlas is created per logical session and passed explicitly to everything that reads
/// database files, usually as an `Arc<Atlas>` (see [`Atlas::shared`]). Independent atlases
/// share nothing unless they are given the same [`CoordinatingLock`].
///
/// All methods take `&self` and may be called from any number of threads.
#[derive(Debug)]
pub struct Atlas {
    config: AtlasConfig,
    coordinator: Option<Arc<CoordinatingLock>>,
    metadata: FileMetadataCache,
    registry: MappedFileRegistry,
    external_bytes: AtomicU64,
    bound_crossings: AtomicU64,
    search_path: String,
}

impl Atlas {
    /// Creates an atlas with default settings, with or without a coordinating lock.
    ///
    /// Without the lock, [`LockToken::lock`] and [`LockToken::unlock`] do nothing. Only use this
    /// when every thread works on its own disjoint set of files.
    pub fn new(use_coordinating_lock: bool) -> Self {
        Self::from_config(AtlasConfig::new().coordinating_lock(use_coordinating_lock))
    }

    /// Creates an atlas from `config`, with a private coordinating lock if enabled.
    pub fn from_config(config: AtlasConfig) -> Self {
        let coordinator = config
            .use_coordinating_lock
            .then(|| Arc::new(CoordinatingLock::new()));
        Self::build(config, coordinator)
    }

    /// Creates an atlas serialized by an existing coordinating lock.
    ///
    /// The lock is used regardless of [`AtlasConfig::use_coordinating_lock`].
    pub fn with_lock(config: AtlasConfig, lock: Arc<CoordinatingLock>) -> Self {
        let config = config.coordinating_lock(true);
        Self::build(config, Some(lock))
    }

    /// Creates a reference-counted atlas; the last clone dropped destroys it.
    pub fn shared(config: AtlasConfig) -> Arc<Self> {
        Arc::new(Self::from_config(config))
    }

    fn build(config: AtlasConfig, coordinator: Option<Arc<CoordinatingLock>>) -> Self {
        let search_path = config.search_path();
        let registry = MappedFileRegistry::new(config.load_strategy, config.max_open_files);

        Atlas {
            config,
            coordinator,
            metadata: FileMetadataCache::new(),
            registry,
            external_bytes: AtomicU64::new(0),
            bound_crossings: AtomicU64::new(0),
            search_path,
        }
    }

    /// The configuration this atlas was built with.
    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    /// Whether call sequences are serialized through a coordinating lock.
    pub fn uses_coordinating_lock(&self) -> bool {
        self.coordinator.is_some()
    }

    /// The coordinating lock, if any.
    pub fn coordinator(&self) -> Option<&CoordinatingLock> {
        self.coordinator.as_deref()
    }

    /// A fresh, unlocked token for this atlas.
    pub fn lock_token(&self) -> LockToken<'_> {
        LockToken::new(self)
    }

    /// Whether `path` exists. Never maps the file.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.metadata.exists(&FilePath::new(path))
    }

    /// Length of `path`, or `None` if it does not exist.
    pub fn size_of(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.metadata.size_of(&FilePath::new(path))
    }

    /// Forget the cached metadata of `path`. Returns `true` if an entry was present.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        self.metadata.invalidate(&FilePath::new(path))
    }

    /// Whether `path` is already cached as missing. Never touches the filesystem.
    pub fn is_known_missing(&self, path: impl AsRef<Path>) -> bool {
        self.metadata.known_missing(&FilePath::new(path))
    }

    /// Forget all cached metadata, e.g. after a database update on disk.
    pub fn invalidate_all(&self) {
        self.metadata.clear();
    }

    /// Take a reference to the mapping of `path`, mapping the file if needed.
    ///
    /// Every successful call must be paired with one [`Atlas::release_mapping`] of the returned
    /// region.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if the file does not exist, or
    /// [`crate::Error::CannotMap`] if it cannot be mapped.
    pub fn acquire_mapping(&self, path: impl AsRef<Path>) -> Result<Arc<MappedRegion>> {
        self.acquire(&FilePath::new(path))
    }

    /// Return a reference taken by [`Atlas::acquire_mapping`].
    ///
    /// The region is consumed; once the last reference is released the file is unmapped.
    pub fn release_mapping(&self, region: Arc<MappedRegion>) {
        let path = region.path().clone();
        drop(region);
        self.registry.release(&path);
    }

    /// Check existence, then map, as one step under the coordinating lock.
    pub(crate) fn acquire(&self, path: &FilePath) -> Result<Arc<MappedRegion>> {
        let mut token = self.lock_token();
        token.lock();

        let metadata = self.metadata.lookup(path);
        if !metadata.exists {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }

        self.registry.acquire_bounded(path, Some(metadata.length))
    }

    /// Advised number of bytes to address at once from a file of `file_size` bytes.
    pub fn recommended_slice_size(&self, file_size: u64) -> u64 {
        self.config.slice_size.min(file_size)
    }

    /// Number of files mapped right now.
    pub fn open_file_count(&self) -> i64 {
        self.registry.open_files().current()
    }

    /// Most files ever mapped at once.
    pub fn max_open_file_count(&self) -> i64 {
        self.registry.open_files().high_water_mark()
    }

    /// Number of paths in the registry.
    pub fn mapped_file_count(&self) -> usize {
        self.registry.len()
    }

    /// Reference count of `path`'s mapping, `None` if it is not mapped.
    pub fn mapping_refcount(&self, path: impl AsRef<Path>) -> Option<u32> {
        self.registry.refcount(&FilePath::new(path))
    }

    /// Classification of `path`'s mapping, `None` if it is not mapped.
    pub fn mapping_kind(&self, path: impl AsRef<Path>) -> Option<FileKind> {
        self.registry.kind(&FilePath::new(path))
    }

    /// The database search path, composed once at construction.
    pub fn search_path(&self) -> &str {
        &self.search_path
    }

    /// Locate `name` through the search path.
    ///
    /// Absolute names and names with a directory component are checked as given. Bare names
    /// are tried against each search path entry in order; the first that exists wins.
    pub fn resolve(&self, name: impl AsRef<Path>) -> Option<PathBuf> {
        let name = name.as_ref();

        if name.is_absolute() || name.components().count() > 1 {
            return self.exists(name).then(|| name.to_path_buf());
        }

        std::env::split_paths(&self.search_path)
            .map(|dir| dir.join(name))
            .find(|candidate| self.exists(candidate))
    }

    /// Bytes registered through [`ExternalAllocation`].
    pub fn registered_bytes(&self) -> u64 {
        self.external_bytes.load(Ordering::Acquire)
    }

    /// Current mapped and registered bytes against the advisory bound.
    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            mapped_bytes: self.registry.mapped_bytes(),
            external_bytes: self.registered_bytes(),
            bound: self.config.memory_bound,
            bound_crossings: self.bound_crossings.load(Ordering::Acquire),
        }
    }

    pub(crate) fn add_external_bytes(&self, bytes: u64) {
        self.external_bytes.fetch_add(bytes, Ordering::AcqRel);
    }

    pub(crate) fn sub_external_bytes(&self, bytes: u64) {
        self.external_bytes.fetch_sub(bytes, Ordering::AcqRel);
    }

    /// Record a crossing of the advisory bound. Returns `true` if over it.
    pub(crate) fn check_memory_bound(&self) -> bool {
        let usage = self.memory_usage();
        if !usage.is_over_bound() {
            return false;
        }

        let crossings = self.bound_crossings.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(
            mapped = usage.mapped_bytes,
            external = usage.external_bytes,
            bound = usage.bound,
            crossings,
            "memory bound exceeded"
        );
        true
    }
}

impl Default for Atlas {
    fn default() -> Self {
        Self::from_config(AtlasConfig::default())
    }
}

impl Drop for Atlas {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            debug_assert!(
                self.registry.is_empty(),
                "atlas dropped with {} files still mapped",
                self.registry.len()
            );
        }
    }
}
