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

//! Read-only byte backends and file identity.
//!
//! This module provides the pieces the atlas needs to turn a file name into addressable bytes:
//!
//! - [`crate::file::FilePath`] - The normalized string key under which files are cached
//! - [`crate::file::FileKind`] - Index/data classification derived from the file extension
//! - [`crate::file::Backend`] - Trait for bounds-checked access to loaded bytes
//! - [`crate::file::LoadStrategy`] - Selects how a file is brought into memory
//!
//! # Backend Implementations
//! - [`crate::file::Physical`] - Whole-file read-only memory mapping
//! - [`crate::file::Memory`] - Whole file read into an owned buffer
//!
//! Backends never mutate their bytes. Any number of threads may read the same backend
//! concurrently.
//!
//! # Examples
//!
//! ```rust,no_run
//! use regionatlas::file::{Backend, LoadStrategy};
//!
//! let backend = LoadStrategy::Mmap.load("nt.00.nsq")?;
//! println!("{} bytes, first byte 0x{:02x}", backend.len(), backend.data()[0]);
//! # Ok::<(), regionatlas::Error>(())
//! ```

mod memory;
mod physical;

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

pub use memory::Memory;
pub use physical::Physical;

use crate::Result;

/// Backend trait for file data sources.
///
/// This trait abstracts over how a file's bytes were loaded, allowing both memory-mapped and
/// fully-read representations behind one interface. All implementations must be thread-safe.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the backend holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounds-checked sub-slice shared by every backend.
pub(crate) fn checked_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let Some(offset_end) = offset.checked_add(len) else {
        return Err(crate::Error::OutOfBounds);
    };

    if offset_end > data.len() {
        return Err(crate::Error::OutOfBounds);
    }

    Ok(&data[offset..offset_end])
}

/// How a file's bytes are brought into the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LoadStrategy {
    /// Map the whole file read-only into the address space.
    #[default]
    Mmap,
    /// Read the whole file into an owned buffer.
    Read,
}

impl LoadStrategy {
    /// Load `path` with this strategy.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or read, or
    /// [`crate::Error::CannotMap`] if the mapping itself fails.
    pub fn load(self, path: impl AsRef<Path>) -> Result<Box<dyn Backend>> {
        Ok(match self {
            LoadStrategy::Mmap => Box::new(Physical::new(path)?),
            LoadStrategy::Read => Box::new(Memory::from_path(path)?),
        })
    }
}

/// Normalized string key for a file.
///
/// Equality is exact string equality on the normalized form. Two spellings of the same file
/// (`./a.nin` and `a.nin`) are different keys; the only normalization applied is the
/// conversion to a UTF-8 string with the platform's path separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(String);

impl FilePath {
    /// Build the key for `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy();
        if cfg!(windows) {
            FilePath(raw.replace('/', "\\"))
        } else {
            FilePath(raw.into_owned())
        }
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key viewed as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Owned filesystem path, as carried by errors.
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl AsRef<Path> for FilePath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trailing two letters of the extensions that mark index-type auxiliary files.
///
/// Volume index files (`.pin`, `.nin`) end in `in`; the ISAM lookup files end in the
/// key letter followed by `i` (index) or `d` (data): `.nni`/`.nnd`, `.psi`/`.psd`,
/// `.phi`/`.phd`, `.pti`/`.ptd`, `.npi`/`.npd`.
const INDEX_SUFFIXES: &[&str] = &["in", "ni", "nd", "si", "sd", "hi", "hd", "ti", "td", "pi", "pd"];

/// Classification of a cached file, derived once from its extension.
///
/// The atlas treats both kinds identically for lifetime purposes; consumers may use the kind to
/// apply their own caching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    /// Index-type auxiliary file
    Index,
    /// Primary data file
    Data,
}

impl FileKind {
    /// Classify `path` by the last two characters of its extension.
    pub fn classify(path: &FilePath) -> FileKind {
        let extension = path
            .as_path()
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let suffix = extension
            .char_indices()
            .rev()
            .nth(1)
            .map_or("", |(start, _)| &extension[start..]);

        if INDEX_SUFFIXES.contains(&suffix) {
            FileKind::Index
        } else {
            FileKind::Data
        }
    }
}

impl FromStr for FilePath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(FilePath::new(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_index_files() {
        for name in [
            "nt.00.nin", "pdb.pin", "nt.nni", "nt.nnd", "nr.psi", "nr.psd", "nr.phi", "nr.phd",
            "nr.pti", "nr.ptd", "nr.npi", "nr.npd",
        ] {
            assert_eq!(FileKind::classify(&FilePath::new(name)), FileKind::Index, "{name}");
        }
    }

    #[test]
    fn classify_data_files() {
        for name in ["nt.00.nsq", "nr.psq", "nr.phr", "data.idx", "README", "x.n", ".nin"] {
            assert_eq!(FileKind::classify(&FilePath::new(name)), FileKind::Data, "{name}");
        }
    }

    #[test]
    fn kind_display_roundtrip() {
        assert_eq!(FileKind::Index.to_string(), "index");
        assert_eq!("data".parse::<FileKind>().unwrap(), FileKind::Data);
        assert_eq!("read".parse::<LoadStrategy>().unwrap(), LoadStrategy::Read);
    }

    #[test]
    fn file_path_keys_are_exact() {
        assert_ne!(FilePath::new("./a.nin"), FilePath::new("a.nin"));
        assert_eq!(FilePath::new("a.nin"), FilePath::new(Path::new("a.nin")));
        assert_eq!(FilePath::new("a.nin").to_string(), "a.nin");
    }

    #[test]
    fn checked_slice_bounds() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(checked_slice(&data, 1, 2).unwrap(), &[2, 3]);
        assert_eq!(checked_slice(&data, 4, 0).unwrap(), &[] as &[u8]);
        assert!(checked_slice(&data, 3, 2).is_err());
        assert!(checked_slice(&data, usize::MAX, 1).is_err());
    }
}
