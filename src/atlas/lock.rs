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

//! Scoped, idempotent holds on an atlas's coordinating lock.

use std::marker::PhantomData;

use crate::{utils::synchronization::CoordinatingLock, Atlas};

/// Records whether the current logical operation holds the coordinating lock.
///
/// A token starts unlocked. [`LockToken::lock`] and [`LockToken::unlock`] are idempotent, so a
/// token can be passed down a call chain and every level may call `lock()` without double
/// locking. Dropping the token releases the lock on every exit path, including unwinding.
///
/// On an atlas built without a coordinating lock the token only tracks its flag.
///
/// Tokens are tied to the thread that created them and cannot be sent to another thread.
///
/// # Examples
///
/// ```rust
/// use regionatlas::Atlas;
///
/// let atlas = Atlas::new(true);
/// let mut token = atlas.lock_token();
/// token.lock();
/// token.lock(); // no-op
/// assert!(token.is_held());
/// token.unlock();
/// assert!(!token.is_held());
/// ```
#[derive(Debug)]
pub struct LockToken<'a> {
    lock: Option<&'a CoordinatingLock>,
    held: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl<'a> LockToken<'a> {
    /// Creates an unlocked token for `atlas`.
    pub fn new(atlas: &'a Atlas) -> Self {
        LockToken {
            lock: atlas.coordinator(),
            held: false,
            _thread_bound: PhantomData,
        }
    }

    /// Acquire the coordinating lock unless this token already holds it.
    pub fn lock(&mut self) {
        if self.held {
            return;
        }
        if let Some(lock) = self.lock {
            lock.acquire();
        }
        self.held = true;
    }

    /// Release the coordinating lock if this token holds it.
    pub fn unlock(&mut self) {
        if !self.held {
            return;
        }
        if let Some(lock) = self.lock {
            lock.release();
        }
        self.held = false;
    }

    /// Whether this token currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Whether this token locks the coordinator of `atlas`.
    ///
    /// Atlases sharing one [`CoordinatingLock`] accept each other's tokens.
    pub fn belongs_to(&self, atlas: &Atlas) -> bool {
        match (self.lock, atlas.coordinator()) {
            (Some(ours), Some(theirs)) => std::ptr::eq(ours, theirs),
            (None, None) => true,
            _ => false,
        }
    }
}

/// A clone of a held token takes its own acquisition rather than sharing the original's.
impl Clone for LockToken<'_> {
    fn clone(&self) -> Self {
        let mut token = LockToken {
            lock: self.lock,
            held: false,
            _thread_bound: PhantomData,
        };
        if self.held {
            token.lock();
        }
        token
    }
}

impl Drop for LockToken<'_> {
    fn drop(&mut self) {
        self.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtlasConfig, CoordinatingLock};
    use std::sync::Arc;

    #[test]
    fn lock_is_idempotent() {
        let atlas = Atlas::new(true);
        let lock = atlas.coordinator().unwrap();

        let mut token = atlas.lock_token();
        assert!(!token.is_held());
        for _ in 0..5 {
            token.lock();
        }
        assert_eq!(lock.depth(), 1);

        token.unlock();
        assert_eq!(lock.depth(), 0);
        token.unlock();
        assert_eq!(lock.depth(), 0);
        assert!(!token.is_held());
    }

    #[test]
    fn drop_releases() {
        let atlas = Atlas::new(true);
        {
            let mut token = LockToken::new(&atlas);
            token.lock();
            assert!(atlas.coordinator().unwrap().is_held_by_current_thread());
        }
        assert!(!atlas.coordinator().unwrap().is_held_by_current_thread());
    }

    #[test]
    fn drop_releases_on_unwind() {
        let atlas = Arc::new(Atlas::new(true));
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut token = atlas.lock_token();
            token.lock();
            panic!("operation failed while holding the lock");
        }));
        assert!(result.is_err());
        assert_eq!(atlas.coordinator().unwrap().depth(), 0);
    }

    #[test]
    fn clone_takes_own_acquisition() {
        let atlas = Atlas::new(true);
        let lock = atlas.coordinator().unwrap();

        let mut original = atlas.lock_token();
        original.lock();
        let copy = original.clone();
        assert!(copy.is_held());
        assert_eq!(lock.depth(), 2);

        original.unlock();
        assert!(lock.is_held_by_current_thread());
        drop(copy);
        assert!(!lock.is_held_by_current_thread());

        let unheld = atlas.lock_token();
        assert!(!unheld.clone().is_held());
    }

    #[test]
    fn token_ownership() {
        let lock = Arc::new(CoordinatingLock::new());
        let first = Atlas::with_lock(AtlasConfig::default(), Arc::clone(&lock));
        let second = Atlas::with_lock(AtlasConfig::default(), Arc::clone(&lock));
        let private = Atlas::new(true);
        let unlocked = Atlas::new(false);

        let token = first.lock_token();
        assert!(token.belongs_to(&first));
        assert!(token.belongs_to(&second));
        assert!(!token.belongs_to(&private));
        assert!(!token.belongs_to(&unlocked));

        let unlocked_token = unlocked.lock_token();
        assert!(unlocked_token.belongs_to(&Atlas::new(false)));
        assert!(!unlocked_token.belongs_to(&first));
    }

    #[test]
    fn disabled_lock_only_tracks_flag() {
        let atlas = Atlas::from_config(AtlasConfig::new().coordinating_lock(false));
        assert!(atlas.coordinator().is_none());

        let mut token = atlas.lock_token();
        token.lock();
        assert!(token.is_held());
        token.unlock();
        assert!(!token.is_held());
    }
}
