//! `go build` as the compiler

use super::{BuildRequest, Compiler};
use crate::error::{GrError, GrResult};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Environment variable naming the Go binary to use
pub const GO_ENV: &str = "GO";

/// Runs the Go toolchain in the package directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoCompiler {
    program: String,
}

impl GoCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `$GO` if set and non-empty, else `fallback`
    pub fn from_env(fallback: &str) -> Self {
        match std::env::var(GO_ENV) {
            Ok(program) if !program.is_empty() => Self::new(program),
            _ => Self::new(fallback),
        }
    }

    /// Arguments passed to the compiler for a request
    pub fn args(request: &BuildRequest) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-trimpath".to_string(),
            "-buildvcs=false".to_string(),
            "-o".to_string(),
            request.output.display().to_string(),
        ];
        args.extend(request.flags.iter().cloned());
        args
    }
}

#[async_trait]
impl Compiler for GoCompiler {
    async fn build(&self, request: &BuildRequest) -> GrResult<()> {
        let args = Self::args(request);
        debug!("Executing: {} {:?} in {}", self.program, args, request.package_dir.display());

        let status = Command::new(&self.program)
            .args(&args)
            .current_dir(&request.package_dir)
            .envs(&request.env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| GrError::CompilerStart {
                command: self.program.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            debug!("compiler exited with {status}");
            Err(GrError::BuildFailed)
        }
    }
}
