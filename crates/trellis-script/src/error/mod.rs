//! Domain errors raised by sandbox construction and invocation.
//!
//! All errors are `thiserror`-derived enums with structured context. I/O
//! errors are wrapped in `Arc` so the enums stay cheap to clone and small
//! enough for the `result_large_err` Clippy lint.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors raised while building a sandbox from a plugin directory.
///
/// Any of these aborts the whole build: remaining scripts are not
/// attempted and no partially initialised sandbox is produced.
#[derive(Debug, Clone, Error)]
pub enum SandboxBuildError {
    /// A directory under the plugin root could not be scanned.
    #[error("failed to scan {path} for scripts: {source}")]
    Discovery {
        /// Directory that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A discovered script file could not be read.
    #[error("failed to read script {path}: {source}")]
    ReadScript {
        /// Script that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A script failed to parse.
    #[error("failed to parse script {path}: {message}")]
    Parse {
        /// The offending script.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// A script raised an uncaught error during top-level execution.
    #[error("script {path} raised during top-level execution: {message}")]
    Execution {
        /// The offending script.
        path: PathBuf,
        /// Guest error rendering.
        message: String,
    },
}

/// Errors raised while invoking a guest entry point.
///
/// A missing entry point is deliberately the same error family as a
/// runtime failure inside the entry point: callers treat both as "this
/// plugin's invocation failed" and neither aborts sibling invocations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationError {
    /// The sandbox defines no function with the entry point's name.
    #[error("entry point '{name}' is not defined by the plugin's scripts")]
    EntryPointMissing {
        /// Name of the function that was looked up.
        name: String,
    },

    /// Evaluation was terminated through the sandbox's cancel handle.
    #[error("invocation was cancelled")]
    Cancelled,

    /// The entry point raised an uncaught error.
    #[error("entry point raised: {message}")]
    Runtime {
        /// Guest error rendering.
        message: String,
    },
}
