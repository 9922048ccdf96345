//! Compiler collaborator
//!
//! The cache store never runs a compiler directly; it goes through the
//! [`Compiler`] trait so that builds can be faked in tests.

pub mod go;

pub use go::GoCompiler;

use crate::error::GrResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// Environment variables that change what the Go toolchain produces
pub const TRACKED_ENV: &[&str] = &[
    "AR",
    "CC",
    "CGO_CFLAGS",
    "CGO_CPPFLAGS",
    "CGO_CXXFLAGS",
    "CGO_ENABLED",
    "CGO_FFLAGS",
    "CGO_LDFLAGS",
    "CXX",
    "GCCGO",
    "GO111MODULE",
    "GOARCH",
    "GOARM64",
    "GODEBUG",
    "GOEXE",
    "GOEXPERIMENT",
    "GOFLAGS",
    "GOHOSTARCH",
    "GOHOSTOS",
    "GOMOD",
    "GOOS",
    "GOPATH",
    "GOROOT",
    "GOTOOLCHAIN",
    "GOTOOLDIR",
    "GOVERSION",
];

/// Tracked environment by variable name. Values are kept as the OS gave
/// them, so a variable that is set but not valid UTF-8 still counts.
pub type BuildEnv = BTreeMap<String, OsString>;

/// One build of a package into a cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Absolute package directory; the compiler runs here
    pub package_dir: PathBuf,

    /// Where the executable must be written
    pub output: PathBuf,

    /// Forwarded build flags, in order
    pub flags: Vec<String>,

    /// Tracked environment, re-applied to the compiler process
    pub env: BuildEnv,
}

/// Something that turns a package into an executable
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Build the package. A compiler that ran and failed yields
    /// [`GrError::BuildFailed`](crate::error::GrError::BuildFailed); its
    /// diagnostics have already been shown to the user.
    async fn build(&self, request: &BuildRequest) -> GrResult<()>;
}

/// Tracked environment of the current process
pub fn tracked_env(extra: &[String]) -> BuildEnv {
    tracked_env_from(|name| std::env::var_os(name), extra)
}

/// Tracked environment as seen through `lookup`. Unset variables are absent.
pub fn tracked_env_from<F>(lookup: F, extra: &[String]) -> BuildEnv
where
    F: Fn(&str) -> Option<OsString>,
{
    TRACKED_ENV
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .filter_map(|name| lookup(name).map(|value| (name.to_string(), value)))
        .collect()
}
