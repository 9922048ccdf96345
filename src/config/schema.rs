//! Configuration schema for gr
//!
//! Configuration is stored at `~/.config/gr/config.toml`

use crate::cache::DEFAULT_KEEP_ENTRIES;
use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Executable cache settings
    pub cache: CacheConfig,

    /// Compiler settings
    pub build: BuildConfig,
}

/// Executable cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root; the user cache directory when unset
    pub dir: Option<PathBuf>,

    /// Entries kept per package
    pub keep_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            keep_entries: DEFAULT_KEEP_ENTRIES,
        }
    }
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Go binary, used when `$GO` is not set
    pub go: String,

    /// Additional environment variables that affect builds
    pub extra_env: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            go: "go".to_string(),
            extra_env: Vec::new(),
        }
    }
}
