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

//! Construction-time configuration of an [`crate::Atlas`].
//!
//! [`AtlasConfig`] carries the policy knobs of one atlas: whether the coordinating lock is used,
//! the advisory slice size and memory bound, the open-file ceiling, how files are loaded, and the
//! inputs from which the database search path is composed.

use std::path::Path;

use crate::file::LoadStrategy;

/// Largest span a caller is advised to address at once from one file (1 GiB).
pub const DEFAULT_SLICE_SIZE: u64 = 1 << 30;

/// Number of concurrently open mapped files past which mapping is refused.
pub const DEFAULT_MAX_OPEN_FILES: usize = 950;

/// Advisory bound on mapped plus externally registered bytes (4 GiB).
pub const DEFAULT_MEMORY_BOUND: u64 = 4 << 30;

/// Environment variable consulted for the second search path component.
pub const DEFAULT_SEARCH_PATH_ENV: &str = "BLASTDB";

/// Disables the coordinating lock when set to anything but `0` or the empty string.
pub const ENV_NO_LOCK: &str = "REGIONATLAS_NO_LOCK";

/// Overrides [`AtlasConfig::max_open_files`].
pub const ENV_MAX_OPEN_FILES: &str = "REGIONATLAS_MAX_OPEN_FILES";

#[cfg(windows)]
const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: &str = ":";

/// Configuration for an [`crate::Atlas`].
///
/// # Examples
///
/// ```rust
/// use regionatlas::{Atlas, AtlasConfig, LoadStrategy};
///
/// let config = AtlasConfig::new()
///     .coordinating_lock(false)
///     .max_open_files(64)
///     .load_strategy(LoadStrategy::Read)
///     .config_search_path("/srv/blast/db");
///
/// let atlas = Atlas::from_config(config);
/// assert!(!atlas.uses_coordinating_lock());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Serialize cross-cache call sequences through the coordinating lock
    pub use_coordinating_lock: bool,
    /// Cap returned by [`crate::Atlas::recommended_slice_size`]
    pub slice_size: u64,
    /// Ceiling on concurrently open mapped files
    pub max_open_files: usize,
    /// Advisory bound on mapped plus registered bytes
    pub memory_bound: u64,
    /// How files are brought into memory
    pub load_strategy: LoadStrategy,
    /// Environment variable holding the second search path component
    pub search_path_env: String,
    /// Application configuration entry, the last search path component
    pub config_search_path: Option<String>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        AtlasConfig {
            use_coordinating_lock: true,
            slice_size: DEFAULT_SLICE_SIZE,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            memory_bound: DEFAULT_MEMORY_BOUND,
            load_strategy: LoadStrategy::default(),
            search_path_env: DEFAULT_SEARCH_PATH_ENV.to_string(),
            config_search_path: None,
        }
    }
}

impl AtlasConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with overrides read from the process environment.
    ///
    /// Honors [`ENV_NO_LOCK`] and [`ENV_MAX_OPEN_FILES`]; unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_NO_LOCK) {
            let value = value.trim();
            if !value.is_empty() && value != "0" {
                config.use_coordinating_lock = false;
            }
        }

        if let Some(max) = lookup(ENV_MAX_OPEN_FILES).and_then(|v| v.trim().parse().ok()) {
            config.max_open_files = max;
        }

        config
    }

    /// Enable or disable the coordinating lock.
    #[must_use]
    pub fn coordinating_lock(mut self, enabled: bool) -> Self {
        self.use_coordinating_lock = enabled;
        self
    }

    /// Set the advisory slice size.
    #[must_use]
    pub fn slice_size(mut self, bytes: u64) -> Self {
        self.slice_size = bytes;
        self
    }

    /// Set the open-file ceiling.
    #[must_use]
    pub fn max_open_files(mut self, count: usize) -> Self {
        self.max_open_files = count;
        self
    }

    /// Set the advisory memory bound.
    #[must_use]
    pub fn memory_bound(mut self, bytes: u64) -> Self {
        self.memory_bound = bytes;
        self
    }

    /// Set how files are loaded.
    #[must_use]
    pub fn load_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.load_strategy = strategy;
        self
    }

    /// Set the environment variable consulted for the search path.
    #[must_use]
    pub fn search_path_env(mut self, name: impl Into<String>) -> Self {
        self.search_path_env = name.into();
        self
    }

    /// Set the configuration-file search path entry.
    #[must_use]
    pub fn config_search_path(mut self, entry: impl Into<String>) -> Self {
        self.config_search_path = Some(entry.into());
        self
    }

    /// Assemble the search path from the current directory, the configured environment
    /// variable and the configuration entry, in that order.
    pub fn search_path(&self) -> String {
        let cwd = std::env::current_dir().ok();
        let env = std::env::var(&self.search_path_env).ok();

        compose_search_path(
            cwd.as_deref(),
            env.as_deref(),
            self.config_search_path.as_deref(),
        )
    }
}

/// Join the non-empty search path components with the platform's path list separator.
pub(crate) fn compose_search_path(
    cwd: Option<&Path>,
    env: Option<&str>,
    config: Option<&str>,
) -> String {
    let cwd = cwd.map(|dir| dir.to_string_lossy());

    [cwd.as_deref(), env, config]
        .into_iter()
        .flatten()
        .map(|part| part.trim_matches(|c: char| PATH_LIST_SEPARATOR.contains(c)))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(PATH_LIST_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = AtlasConfig::default();
        assert!(config.use_coordinating_lock);
        assert_eq!(config.slice_size, 1 << 30);
        assert_eq!(config.max_open_files, 950);
        assert_eq!(config.load_strategy, LoadStrategy::Mmap);
        assert_eq!(config.search_path_env, "BLASTDB");
        assert_eq!(config.config_search_path, None);
    }

    #[test]
    fn builder() {
        let config = AtlasConfig::new()
            .coordinating_lock(false)
            .slice_size(4096)
            .max_open_files(3)
            .memory_bound(1)
            .load_strategy(LoadStrategy::Read)
            .search_path_env("MYDB")
            .config_search_path("/etc/db");

        assert!(!config.use_coordinating_lock);
        assert_eq!(config.slice_size, 4096);
        assert_eq!(config.max_open_files, 3);
        assert_eq!(config.memory_bound, 1);
        assert_eq!(config.load_strategy, LoadStrategy::Read);
        assert_eq!(config.search_path_env, "MYDB");
        assert_eq!(config.config_search_path.as_deref(), Some("/etc/db"));
    }

    #[test]
    fn environment_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_NO_LOCK, "1"), (ENV_MAX_OPEN_FILES, " 12 ")]);
        let config = AtlasConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert!(!config.use_coordinating_lock);
        assert_eq!(config.max_open_files, 12);

        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_NO_LOCK, "0"), (ENV_MAX_OPEN_FILES, "many")]);
        let config = AtlasConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert!(config.use_coordinating_lock);
        assert_eq!(config.max_open_files, DEFAULT_MAX_OPEN_FILES);
    }

    #[cfg(not(windows))]
    #[test]
    fn search_path_priority_order() {
        let path = compose_search_path(
            Some(Path::new("/work")),
            Some("/env/db:"),
            Some("/etc/db"),
        );
        assert_eq!(path, "/work:/env/db:/etc/db");

        assert_eq!(compose_search_path(None, Some(""), Some("/etc/db")), "/etc/db");
        assert_eq!(compose_search_path(None, None, None), "");
    }
}
