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

//! Whole-file read-only memory mappings.
//!
//! [`crate::file::Physical`] maps an entire file into the process's address space with a single
//! read-only mapping. Pages are faulted in by the operating system on first touch, so mapping a
//! large database volume costs address space, not resident memory, until it is read.
//!
//! The mapping lives exactly as long as the `Physical` value. Dropping it unmaps the region and
//! closes the underlying descriptor.

use std::{fs, path::Path};

use memmap2::Mmap;

use super::{checked_slice, Backend};
use crate::Result;

/// A file backend that maps a whole file read-only.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical backend by memory-mapping the specified file.
    ///
    /// # Arguments
    /// * `path` - Path to the file on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::CannotMap`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;

        // The mapping is read-only and the atlas never hands out mutable access. Truncation of
        // the file by another process while mapped is outside of what this crate can prevent.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|error| cannot_map_error!(path, 0, error))?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        checked_slice(&self.data, offset, len)
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
