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

//! Reference-counted registry of open file mappings.
//!
//! [`MappedFileRegistry`] owns one [`MappedRegion`] per path. The first acquisition of a path
//! loads the file and inserts an entry with a reference count of one; later acquisitions bump
//! the count and share the same region. The entry leaves the registry in the same critical
//! section that takes its count from one to zero, so a path is never mapped twice and a
//! mapping is never torn down while counted.
//!
//! Regions are handed out as [`Arc`]s. The registry keeps the owning reference and consumers
//! drop theirs before releasing, so the mapping is unmapped the moment the last consumer
//! releases it.
//!
//! # Thread Safety
//!
//! Entries live in a [`DashMap`]; every acquire and release of one path is serialized by the
//! shard lock holding that path. Files on different shards never contend with each other.

use std::sync::{
    atomic::{AtomicI64, AtomicU64, Ordering},
    Arc,
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    file::{checked_slice, Backend, FileKind, FilePath, LoadStrategy},
    Error, Result,
};

/// A loaded file shared by every consumer bound to it.
///
/// Byte access is bounded by the file's known length: the length the metadata cache reported
/// when the region was created, or the loaded length if that is smaller. Growth of the file
/// after its size was first cached is not visible through the region.
#[derive(Debug)]
pub struct MappedRegion {
    path: FilePath,
    kind: FileKind,
    /// Visible length, never more than `backend.len()`
    len: usize,
    backend: Box<dyn Backend>,
}

impl MappedRegion {
    /// The key this region is registered under.
    pub fn path(&self) -> &FilePath {
        &self.path
    }

    /// Index/data classification of the file.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// All bytes of the file up to its known length.
    pub fn data(&self) -> &[u8] {
        &self.backend.data()[..self.len]
    }

    /// Bytes from `offset` to the known end of the file.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset` is past the end of the file.
    pub fn data_at(&self, offset: usize) -> Result<&[u8]> {
        if offset > self.len {
            return Err(Error::OutOfBounds);
        }
        checked_slice(self.data(), offset, self.len - offset)
    }

    /// `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range is not inside the known length.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        checked_slice(self.data(), offset, len)
    }

    /// Known length of the file in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for an empty file.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes actually held by the backend, counted against the memory bound.
    pub fn loaded_len(&self) -> usize {
        self.backend.len()
    }
}

/// Registry bookkeeping for one mapped path.
#[derive(Debug)]
struct MappedFileEntry {
    /// Number of live consumers, never zero while registered
    refcount: u32,
    region: Arc<MappedRegion>,
}

/// Current and peak number of open mappings.
#[derive(Debug, Default)]
pub struct OpenFileCounter {
    current: AtomicI64,
    high_water_mark: AtomicI64,
}

impl OpenFileCounter {
    fn increment(&self) -> i64 {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.high_water_mark.fetch_max(now, Ordering::AcqRel);
        now
    }

    fn decrement(&self) -> i64 {
        self.current.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Mappings open right now.
    pub fn current(&self) -> i64 {
        self.current.load(Ordering::Acquire)
    }

    /// Most mappings ever open at once.
    pub fn high_water_mark(&self) -> i64 {
        self.high_water_mark.load(Ordering::Acquire)
    }
}

/// Path to shared mapping registry with per-path reference counts.
#[derive(Debug)]
pub struct MappedFileRegistry {
    entries: DashMap<FilePath, MappedFileEntry>,
    open_files: OpenFileCounter,
    mapped_bytes: AtomicU64,
    strategy: LoadStrategy,
    max_open_files: usize,
}

impl MappedFileRegistry {
    /// Creates an empty registry.
    ///
    /// # Arguments
    /// * `strategy` - How new files are loaded
    /// * `max_open_files` - Number of open mappings past which new paths are refused
    pub fn new(strategy: LoadStrategy, max_open_files: usize) -> Self {
        MappedFileRegistry {
            entries: DashMap::new(),
            open_files: OpenFileCounter::default(),
            mapped_bytes: AtomicU64::new(0),
            strategy,
            max_open_files,
        }
    }

    /// Take a reference to the mapping of `path`, loading the file if nobody holds it yet.
    ///
    /// # Errors
    /// Returns [`crate::Error::CannotMap`] if the file cannot be opened or mapped, or if the
    /// open-file ceiling has been reached. The ceiling is checked without a global lock, so
    /// concurrent first acquisitions of different paths may overshoot it slightly.
    pub fn acquire(&self, path: &FilePath) -> Result<Arc<MappedRegion>> {
        self.acquire_bounded(path, None)
    }

    /// Like [`MappedFileRegistry::acquire`], bounding a newly created region to `known_len`.
    ///
    /// `known_len` only applies when this call loads the file; an already registered region
    /// keeps the bound it was created with.
    ///
    /// # Errors
    /// Same as [`MappedFileRegistry::acquire`].
    pub fn acquire_bounded(
        &self,
        path: &FilePath,
        known_len: Option<u64>,
    ) -> Result<Arc<MappedRegion>> {
        match self.entries.entry(path.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.refcount += 1;
                tracing::trace!(path = %path, refcount = entry.refcount, "mapping shared");
                Ok(Arc::clone(&entry.region))
            }
            Entry::Vacant(vacant) => {
                let open_files = self.open_files.current();
                if usize::try_from(open_files).unwrap_or(0) >= self.max_open_files {
                    return Err(cannot_map_error!(
                        path,
                        open_files,
                        "open file limit of {} reached",
                        self.max_open_files
                    ));
                }

                let backend = self
                    .strategy
                    .load(path)
                    .map_err(|error| match error {
                        Error::CannotMap { message, .. } => {
                            cannot_map_error!(path, open_files, message)
                        }
                        other => cannot_map_error!(path, open_files, other),
                    })?;

                let len = known_len
                    .and_then(|known| usize::try_from(known).ok())
                    .map_or(backend.len(), |known| known.min(backend.len()));
                let region = Arc::new(MappedRegion {
                    path: path.clone(),
                    kind: FileKind::classify(path),
                    len,
                    backend,
                });

                let open_files = self.open_files.increment();
                self.mapped_bytes
                    .fetch_add(region.loaded_len() as u64, Ordering::AcqRel);
                tracing::debug!(
                    path = %path,
                    kind = %region.kind,
                    bytes = region.loaded_len(),
                    visible = region.len,
                    open_files,
                    strategy = %self.strategy,
                    "mapping created"
                );

                vacant.insert(MappedFileEntry {
                    refcount: 1,
                    region: Arc::clone(&region),
                });
                Ok(region)
            }
        }
    }

    /// Return one reference to the mapping of `path`, unmapping it when it was the last.
    ///
    /// Returns `true` if this call removed the entry. Releasing a path that is not registered
    /// is a caller bug: it fails a debug assertion and is ignored in release builds.
    pub fn release(&self, path: &FilePath) -> bool {
        let mut occupied = match self.entries.entry(path.clone()) {
            Entry::Occupied(occupied) => occupied,
            Entry::Vacant(_) => {
                if cfg!(debug_assertions) {
                    panic!("release of {path} without a matching acquire");
                }
                return false;
            }
        };

        let entry = occupied.get_mut();
        entry.refcount -= 1;
        tracing::trace!(path = %path, refcount = entry.refcount, "mapping released");
        if entry.refcount > 0 {
            return false;
        }

        let entry = occupied.remove();
        let bytes = entry.region.loaded_len() as u64;
        let strong = Arc::strong_count(&entry.region);
        drop(entry);

        let open_files = self.open_files.decrement();
        self.mapped_bytes.fetch_sub(bytes, Ordering::AcqRel);
        tracing::debug!(path = %path, bytes, open_files, outliving = strong - 1, "mapping closed");
        true
    }

    /// Current reference count of `path`, `None` if it is not mapped.
    pub fn refcount(&self, path: &FilePath) -> Option<u32> {
        self.entries.get(path).map(|entry| entry.refcount)
    }

    /// Classification of a mapped `path`, `None` if it is not mapped.
    pub fn kind(&self, path: &FilePath) -> Option<FileKind> {
        self.entries.get(path).map(|entry| entry.region.kind)
    }

    /// Open file counters.
    pub fn open_files(&self) -> &OpenFileCounter {
        &self.open_files
    }

    /// Bytes currently held by registered mappings.
    pub fn mapped_bytes(&self) -> u64 {
        self.mapped_bytes.load(Ordering::Acquire)
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
