//! Error types for gr
//!
//! All modules use `GrResult<T>` as their return type. Every error is fatal
//! for the invocation and maps to a fixed process exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Exit status used for every fatal condition raised by gr itself
pub const EXIT_FATAL: u8 = 255;

/// Result type alias for gr operations
pub type GrResult<T> = Result<T, GrError>;

/// All errors that can occur in gr
#[derive(Error, Debug)]
pub enum GrError {
    // Module resolution errors
    #[error("failed to find go.mod anywhere upwards of {}", .0.display())]
    NoEnclosingModule(PathBuf),

    #[error("failed to parse {}:{line}: {reason}", path.display())]
    ManifestInvalid {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("package {0:?} is outside of every module")]
    OutsideModule(String),

    #[error("replacement cycle detected while resolving package {import_path:?} at {}", dir.display())]
    ReplacementCycle { import_path: String, dir: PathBuf },

    // Source discovery errors
    #[error("failed to parse {}: {reason}", path.display())]
    SourceInvalid { path: PathBuf, reason: String },

    #[error("failed to parse //go:embed comment in {}: {reason}", path.display())]
    EmbedDirective { path: PathBuf, reason: String },

    #[error("failed to resolve //go:embed patterns in {}: pattern {pattern}: {reason}", dir.display())]
    EmbedPattern {
        dir: PathBuf,
        pattern: String,
        reason: String,
    },

    // Cache errors
    #[error("user cache directory is not available")]
    NoCacheDir,

    #[error("failed to lock cache directory {}: {source}", path.display())]
    CacheLock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Build and execution errors
    #[error("failed to build program")]
    BuildFailed,

    #[error("failed to run program {}: {source}", path.display())]
    Exec {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start compiler {command}: {source}")]
    CompilerStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("invalid configuration at {}: {reason}", path.display())]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl GrError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a source parse error
    pub fn source_invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceInvalid {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        EXIT_FATAL
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoEnclosingModule(_) => Some("Run: go mod init <module path>"),
            Self::NoCacheDir => Some("Set HOME or XDG_CACHE_HOME, or [cache] dir in the config file"),
            Self::ReplacementCycle { .. } => Some("Check the replace directives of the go.mod files involved"),
            _ => None,
        }
    }
}
