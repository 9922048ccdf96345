//! gr - cached `go run`
//!
//! Computes a fingerprint of everything that goes into building a Go
//! package, runs the executable cached under that fingerprint, and builds it
//! first when there is none.

pub mod build;
pub mod cache;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod embed;
pub mod error;
pub mod exec;
pub mod literal;
pub mod module;
pub mod paths;
pub mod run;
pub mod source;

pub use error::{GrError, GrResult};
