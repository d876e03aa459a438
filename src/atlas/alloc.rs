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

//! Accounting for memory the atlas did not allocate itself.

use crate::{Atlas, LockToken};

/// Counts `bytes` allocated elsewhere against the atlas's advisory memory bound.
///
/// Registration happens under the coordinating lock, taken through the caller's token. The
/// bytes are subtracted again by [`ExternalAllocation::unregister`], or automatically when
/// the registrar is dropped.
///
/// The bound is bookkeeping only. Crossing it emits a `tracing` event and is counted in
/// [`crate::MemoryUsage::bound_crossings`]; nothing is evicted.
///
/// # Examples
///
/// ```rust
/// use regionatlas::{Atlas, ExternalAllocation};
///
/// let atlas = Atlas::new(true);
/// let mut token = atlas.lock_token();
/// let buffer = vec![0u8; 4096];
/// let registration = ExternalAllocation::register(&atlas, buffer.len() as u64, &mut token);
/// assert_eq!(atlas.registered_bytes(), 4096);
///
/// drop(registration);
/// assert_eq!(atlas.registered_bytes(), 0);
/// ```
#[derive(Debug)]
pub struct ExternalAllocation<'a> {
    atlas: &'a Atlas,
    bytes: u64,
    registered: bool,
}

impl<'a> ExternalAllocation<'a> {
    /// Register `bytes` with `atlas`, acquiring the coordinating lock through `token`.
    ///
    /// The token stays locked on return; the caller decides when to release it. The token
    /// must come from `atlas`, or from an atlas sharing its coordinating lock.
    pub fn register(atlas: &'a Atlas, bytes: u64, token: &mut LockToken<'_>) -> Self {
        debug_assert!(
            token.belongs_to(atlas),
            "registration token belongs to a different coordinating lock"
        );
        token.lock();
        atlas.add_external_bytes(bytes);
        atlas.check_memory_bound();

        ExternalAllocation {
            atlas,
            bytes,
            registered: true,
        }
    }

    /// Number of bytes this registration accounts for.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Whether the bytes are still counted.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Stop counting the bytes. Calling this more than once has no further effect.
    pub fn unregister(&mut self) {
        if !self.registered {
            return;
        }

        let mut token = self.atlas.lock_token();
        token.lock();
        self.atlas.sub_external_bytes(self.bytes);
        self.registered = false;
    }
}

impl Drop for ExternalAllocation<'_> {
    fn drop(&mut self) {
        self.unregister();
    }
}
