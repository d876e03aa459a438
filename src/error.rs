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

use std::path::PathBuf;

use thiserror::Error;

macro_rules! cannot_map_error {
    // Single string version
    ($path:expr, $open:expr, $msg:expr) => {
        crate::Error::CannotMap {
            path: $path.to_path_buf(),
            message: $msg.to_string(),
            open_files: $open,
        }
    };

    // Format string with arguments version
    ($path:expr, $open:expr, $fmt:expr, $($arg:tt)*) => {
        crate::Error::CannotMap {
            path: $path.to_path_buf(),
            message: format!($fmt, $($arg)*),
            open_files: $open,
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// No operation of the atlas is fatal to the process. The worst case is a failed bind for one
/// file while every other file keeps working, so every variant here is meant to be surfaced to
/// the immediate caller as "data unavailable" and handled there. The atlas itself never logs,
/// retries or swallows an error.
///
/// # Error Categories
///
/// ## Mapping Errors
/// - [`Error::CannotMap`] - The OS refused to open or map a file, or the open-file ceiling was hit
/// - [`Error::NotFound`] - The metadata cache already knows the file does not exist
///
/// ## Access Errors
/// - [`Error::Unbound`] - Byte access through a handle that is not bound to any file
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a mapping
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors outside of the mapping path
///
/// # Examples
///
/// ```rust,no_run
/// use regionatlas::{Atlas, Error, MappedFileHandle};
/// use std::sync::Arc;
///
/// let atlas = Arc::new(Atlas::new(true));
/// let mut handle = MappedFileHandle::new(Arc::clone(&atlas));
///
/// match handle.bind("nt.00.nsq") {
///     Ok(()) => println!("bound"),
///     Err(Error::NotFound { path }) => eprintln!("no such volume: {}", path.display()),
///     Err(Error::CannotMap { path, message, open_files }) => {
///         eprintln!("{}: {} ({} files open)", path.display(), message, open_files);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The operating system could not open or map the file.
    ///
    /// Commonly caused by descriptor exhaustion, missing permissions, or the file vanishing
    /// between an existence check and the bind. The number of files the atlas had open at
    /// the time is carried along to help diagnose descriptor exhaustion.
    ///
    /// # Fields
    ///
    /// * `path` - The file that could not be mapped
    /// * `message` - The OS error text
    /// * `open_files` - Number of files the atlas held open when the failure occurred
    #[error("Cannot map {}: {message} ({open_files} files open)", .path.display())]
    CannotMap {
        /// The file that could not be mapped
        path: PathBuf,
        /// The error text reported by the operating system
        message: String,
        /// Number of currently open mapped files
        open_files: i64,
    },

    /// The file is known not to exist.
    ///
    /// Returned without attempting any OS call when the metadata cache has already recorded
    /// the path as missing.
    #[error("File not found: {}", .path.display())]
    NotFound {
        /// The missing file
        path: PathBuf,
    },

    /// A handle was asked for data while not bound to any file.
    #[error("The handle is not bound to a file")]
    Unbound,

    /// An out of bound access was attempted on a mapping.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur outside of the mapping path, such as reading
    /// a file into memory.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

/// Alias used by callers that think of every atlas failure as a mapping failure.
pub type MapError = Error;
