//! Run orchestration
//!
//! ```text
//! fingerprint ─► try exec ─┬─ exited ──────────────────────► done
//!                          └─ missing ─► rebuild ─► try exec ─┬─ exited ─► done
//!                                                             └─ missing ─► internal error
//! ```

use crate::build::{BuildEnv, BuildRequest, Compiler};
use crate::cache::{CacheStore, Probe};
use crate::checksum;
use crate::error::{GrError, GrResult};
use crate::exec::Launcher;
use std::path::PathBuf;
use tracing::debug;

/// One `gr` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Absolute, clean package directory
    pub package_dir: PathBuf,

    /// Forwarded build flags
    pub flags: Vec<String>,

    /// Arguments for the program
    pub args: Vec<String>,
}

impl Invocation {
    /// Zeroth argument of the program: the package directory's base name
    pub fn arg0(&self) -> String {
        self.package_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.package_dir.display().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    TryExec,
    Rebuild,
    TryExecAfterBuild,
}

/// Drives one invocation through the cache
pub struct Runner<'a> {
    store: &'a CacheStore,
    compiler: &'a dyn Compiler,
    launcher: &'a dyn Launcher,
    env: BuildEnv,
}

impl<'a> Runner<'a> {
    /// `env` is the tracked build environment, both hashed and passed to
    /// the compiler
    pub fn new(
        store: &'a CacheStore,
        compiler: &'a dyn Compiler,
        launcher: &'a dyn Launcher,
        env: BuildEnv,
    ) -> Self {
        Self {
            store,
            compiler,
            launcher,
            env,
        }
    }

    /// Run the package, building it first if needed, and return the
    /// program's exit status
    pub async fn run(&self, invocation: &Invocation) -> GrResult<i32> {
        let fingerprint = checksum::fingerprint(&invocation.package_dir, &invocation.flags, &self.env)?;
        let entry = self.store.entry_path(&invocation.package_dir, &fingerprint);
        debug!("fingerprint {fingerprint}, entry {}", entry.display());

        let arg0 = invocation.arg0();
        let mut step = Step::TryExec;

        loop {
            step = match step {
                Step::TryExec => match self.store.probe(self.launcher, &entry, &arg0, &invocation.args)? {
                    Probe::Exited(code) => return Ok(code),
                    Probe::Missing => Step::Rebuild,
                },
                Step::Rebuild => {
                    let request = BuildRequest {
                        package_dir: invocation.package_dir.clone(),
                        output: entry.clone(),
                        flags: invocation.flags.clone(),
                        env: self.env.clone(),
                    };
                    self.store.update(self.compiler, &request).await?;
                    Step::TryExecAfterBuild
                }
                Step::TryExecAfterBuild => match self.store.probe(self.launcher, &entry, &arg0, &invocation.args)? {
                    Probe::Exited(code) => return Ok(code),
                    Probe::Missing => {
                        return Err(GrError::Internal(format!(
                            "{} is missing right after a successful build",
                            entry.display()
                        )))
                    }
                },
            };
        }
    }
}
