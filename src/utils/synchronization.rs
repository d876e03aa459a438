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

//! Synchronization utilities for multi-threaded operations.
//!
//! # Key Components
//!
//! - [`CoordinatingLock`] - The re-entrant, thread-owned lock that serializes call sequences
//!   spanning more than one of the atlas caches
//!
//! The lock is a capability handed to an [`crate::Atlas`] at construction. Several atlases may
//! share one lock, and an atlas built without one performs no cross-thread serialization at all.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Condvar, Mutex,
    },
    thread::{self, ThreadId},
};

#[derive(Debug, Default)]
struct LockState {
    /// Thread currently holding the lock
    owner: Option<ThreadId>,
    /// Number of outstanding acquisitions by `owner`
    depth: usize,
}

/// A re-entrant lock owned by at most one thread at a time.
///
/// The owning thread may acquire it again without blocking; it is handed to another thread
/// only once every acquisition has been released. Re-entrancy is what allows a held
/// [`crate::LockToken`] to be cloned, and a nested call to take its own token, without
/// deadlocking the calling thread.
///
/// # Examples
///
/// ```rust
/// use regionatlas::{Atlas, AtlasConfig, CoordinatingLock};
/// use std::sync::Arc;
///
/// // Two atlases serialized by the same lock
/// let lock = Arc::new(CoordinatingLock::new());
/// let proteins = Atlas::with_lock(AtlasConfig::default(), Arc::clone(&lock));
/// let nucleotides = Atlas::with_lock(AtlasConfig::default(), Arc::clone(&lock));
///
/// let mut token = proteins.lock_token();
/// token.lock();
/// assert!(lock.is_held_by_current_thread());
/// let mut nested = nucleotides.lock_token();
/// nested.lock(); // same thread, does not block
/// ```
#[derive(Debug, Default)]
pub struct CoordinatingLock {
    state: Mutex<LockState>,
    released: Condvar,
    /// Number of acquisitions that had to wait for another thread
    contended: AtomicU64,
}

impl CoordinatingLock {
    /// Creates a new, unheld lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for the current thread, blocking while another thread owns it.
    pub(crate) fn acquire(&self) {
        let me = thread::current().id();
        let mut state = lock!(self.state);

        if state.owner == Some(me) {
            state.depth += 1;
            return;
        }

        if state.owner.is_some() {
            self.contended.fetch_add(1, Ordering::Relaxed);
        }

        let mut state = wait_while!(self.released, state, |state: &mut LockState| {
            state.owner.is_some()
        });
        state.owner = Some(me);
        state.depth = 1;
    }

    /// Release one acquisition made by the current thread.
    ///
    /// Releasing a lock the current thread does not own is a caller bug: it fails a debug
    /// assertion and is ignored in release builds.
    pub(crate) fn release(&self) {
        let me = thread::current().id();
        let mut state = lock!(self.state);

        debug_assert_eq!(
            state.owner,
            Some(me),
            "coordinating lock released by a thread that does not own it"
        );
        if state.owner != Some(me) {
            return;
        }

        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
    }

    /// Returns `true` if the calling thread currently owns the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        lock!(self.state).owner == Some(thread::current().id())
    }

    /// Number of outstanding acquisitions, zero when unheld.
    pub fn depth(&self) -> usize {
        lock!(self.state).depth
    }

    /// Number of acquisitions so far that found the lock owned by another thread.
    pub fn contention_count(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }
}
