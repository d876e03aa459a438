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

//! Cached existence and size of database files.
//!
//! Stat calls are expensive on network filesystems and database readers ask about the same
//! volumes over and over. [`FileMetadataCache`] stats each path once and remembers the answer,
//! including negative answers, until it is explicitly invalidated.
//!
//! Entries are never refreshed behind the caller's back: a file that is resized or deleted
//! after its first lookup keeps reporting the original answer.

use std::fs;

use dashmap::DashMap;

use crate::file::FilePath;

/// Cached result of one stat call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileMetadataEntry {
    /// Whether a regular file existed at the path
    pub exists: bool,
    /// Length in bytes, zero when the file does not exist
    pub length: u64,
}

impl FileMetadataEntry {
    /// Stat `path`. Any failure, not only "not found", reports a missing file.
    fn stat(path: &FilePath) -> Self {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => FileMetadataEntry {
                exists: true,
                length: metadata.len(),
            },
            _ => FileMetadataEntry::default(),
        }
    }
}

/// Path to `{exists, length}` cache, guarded by its own sharded locks.
#[derive(Debug, Default)]
pub struct FileMetadataCache {
    entries: DashMap<FilePath, FileMetadataEntry>,
}

impl FileMetadataCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metadata for `path`, stat'ing the filesystem on first use.
    pub fn lookup(&self, path: &FilePath) -> FileMetadataEntry {
        if let Some(entry) = self.entries.get(path) {
            return *entry;
        }

        *self
            .entries
            .entry(path.clone())
            .or_insert_with(|| FileMetadataEntry::stat(path))
    }

    /// Whether `path` exists. Does not map the file.
    pub fn exists(&self, path: &FilePath) -> bool {
        self.lookup(path).exists
    }

    /// Length of `path`, or `None` if it does not exist.
    pub fn size_of(&self, path: &FilePath) -> Option<u64> {
        let entry = self.lookup(path);
        entry.exists.then_some(entry.length)
    }

    /// Whether `path` is already cached as missing, without touching the filesystem.
    pub fn known_missing(&self, path: &FilePath) -> bool {
        self.entries.get(path).is_some_and(|entry| !entry.exists)
    }

    /// Forget the cached answer for `path`. Returns `true` if one was present.
    pub fn invalidate(&self, path: &FilePath) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Forget every cached answer.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::fixture;

    #[test]
    fn caches_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = FilePath::new(fixture(&dir, "nt.00.nin", &[0; 128]));

        let cache = FileMetadataCache::new();
        assert!(cache.exists(&path));
        assert_eq!(cache.size_of(&path), Some(128));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn caches_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = FilePath::new(dir.path().join("missing.bin"));

        let cache = FileMetadataCache::new();
        assert!(!cache.known_missing(&path));
        assert!(!cache.exists(&path));
        assert!(cache.known_missing(&path));
        assert_eq!(cache.size_of(&path), None);

        // Creating the file later is not observed until invalidated
        fixture(&dir, "missing.bin", b"now here");
        assert!(!cache.exists(&path));
        assert!(cache.invalidate(&path));
        assert_eq!(cache.size_of(&path), Some(8));
    }

    #[test]
    fn cached_length_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = FilePath::new(fixture(&dir, "nr.psq", &[7; 10]));

        let cache = FileMetadataCache::new();
        assert_eq!(cache.size_of(&path), Some(10));

        fixture(&dir, "nr.psq", &[7; 4000]);
        assert_eq!(cache.size_of(&path), Some(10));
        assert_eq!(cache.size_of(&path), Some(10));
    }

    #[test]
    fn directories_are_not_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileMetadataCache::new();
        assert!(!cache.exists(&FilePath::new(dir.path())));
    }

    #[test]
    fn clear_forgets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileMetadataCache::new();
        cache.exists(&FilePath::new(dir.path().join("a")));
        cache.exists(&FilePath::new(dir.path().join("b")));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.invalidate(&FilePath::new(dir.path().join("a"))));
    }
}
