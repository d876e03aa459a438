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

#![allow(unused_macros)]

/// Helper macro for locking items
///
/// A poisoned mutex is recovered instead of propagated. Everything the atlas guards with a
/// mutex is bookkeeping that is never left half-updated across a panic.
///
/// ```rust, ignore
///  let mut state = lock!(self.state);
///  state.depth += 1;
/// ```
macro_rules! lock {
    ($lock:expr) => {
        $lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}

/// Helper macro for waiting on a condition variable with a locked guard
///
/// ```rust, ignore
///  let state = wait_while!(self.released, lock!(self.state), |s| s.owner.is_some());
/// ```
macro_rules! wait_while {
    ($condvar:expr, $guard:expr, $condition:expr) => {
        $condvar
            .wait_while($guard, $condition)
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    };
}
