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

//! Per-consumer view of one mapped file.

use std::{path::Path, sync::Arc};

use crate::{
    atlas::registry::MappedRegion,
    file::{FileKind, FilePath},
    Atlas, Error, Result,
};

/// A consumer's binding to at most one mapped file.
///
/// A handle starts unbound. [`MappedFileHandle::bind`] takes a reference to the named file's
/// mapping through the atlas, releasing the previously bound file first. Dropping the handle
/// releases its reference.
///
/// Byte accessors borrow the handle, and rebinding needs `&mut self`, so a slice obtained
/// before a rebind can never be used after it.
///
/// Handles are not shared. Several consumers of the same file each create their own handle and
/// share the underlying mapping.
///
/// # Examples
///
/// ```rust,no_run
/// use regionatlas::{Atlas, MappedFileHandle};
/// use std::sync::Arc;
///
/// let atlas = Arc::new(Atlas::new(true));
/// let mut handle = MappedFileHandle::new(Arc::clone(&atlas));
///
/// handle.bind("nt.00.nin")?;
/// let header = handle.data_slice(0, 4)?;
/// println!("version bytes {:02x?}", header);
///
/// handle.bind("nt.00.nsq")?; // releases nt.00.nin
/// let residues = handle.data_at(1)?;
/// println!("{} residue bytes", residues.len());
/// # Ok::<(), regionatlas::Error>(())
/// ```
#[derive(Debug)]
pub struct MappedFileHandle {
    atlas: Arc<Atlas>,
    region: Option<Arc<MappedRegion>>,
}

impl MappedFileHandle {
    /// Creates an unbound handle.
    pub fn new(atlas: Arc<Atlas>) -> Self {
        MappedFileHandle {
            atlas,
            region: None,
        }
    }

    /// Bind to `path`, a no-op if already bound to it.
    ///
    /// May map the file on first use of the path anywhere in the atlas; binding a path another
    /// handle already holds does no I/O.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotFound`] if the file does not exist, or
    /// [`crate::Error::CannotMap`] if it cannot be mapped. The handle is unbound afterwards.
    pub fn bind(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = FilePath::new(path);
        if self.region.as_ref().is_some_and(|region| *region.path() == path) {
            return Ok(());
        }

        self.unbind();
        self.region = Some(self.atlas.acquire(&path)?);
        Ok(())
    }

    /// Release the bound file, if any.
    pub fn unbind(&mut self) {
        if let Some(region) = self.region.take() {
            self.atlas.release_mapping(region);
        }
    }

    /// Returns `true` while bound to a file.
    pub fn is_bound(&self) -> bool {
        self.region.is_some()
    }

    /// The bound file's key.
    pub fn path(&self) -> Option<&FilePath> {
        self.region.as_deref().map(MappedRegion::path)
    }

    /// Classification of the bound file.
    pub fn kind(&self) -> Option<FileKind> {
        self.region.as_deref().map(MappedRegion::kind)
    }

    /// Length of the bound file.
    pub fn len(&self) -> Option<usize> {
        self.region.as_deref().map(MappedRegion::len)
    }

    /// The bound file's shared region.
    pub fn region(&self) -> Option<&MappedRegion> {
        self.region.as_deref()
    }

    /// Bytes from `offset` to the end of the bound file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unbound`] if no file is bound, or
    /// [`crate::Error::OutOfBounds`] if `offset` is past the end of the file.
    pub fn data_at(&self, offset: usize) -> Result<&[u8]> {
        self.bound()?.data_at(offset)
    }

    /// `len` bytes at `offset` of the bound file.
    ///
    /// # Errors
    /// Returns [`crate::Error::Unbound`] if no file is bound, or
    /// [`crate::Error::OutOfBounds`] if the range is not inside the file.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.bound()?.data_slice(offset, len)
    }

    fn bound(&self) -> Result<&MappedRegion> {
        self.region.as_deref().ok_or(Error::Unbound)
    }
}

impl Drop for MappedFileHandle {
    fn drop(&mut self) {
        self.unbind();
    }
}
