//! Domain errors raised by plugin loading and invocation.
//!
//! The taxonomy separates failures by how far they propagate: manifest
//! and sandbox problems are contained to one plugin during loading,
//! invocation failures are contained to one worker, and only a failure
//! to enumerate the plugin root itself aborts a whole load.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use trellis_script::{InvocationError, SandboxBuildError};

/// Errors raised while reading or decoding a plugin manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file exists but could not be read.
    #[error("failed to read manifest {path}: {source}")]
    Read {
        /// Path of the manifest file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The manifest content is not a well-formed declarative mapping or
    /// is missing a required key.
    #[error("manifest is not well-formed: {source}")]
    Malformed {
        /// Underlying decode error.
        #[source]
        source: serde_yaml::Error,
    },

    /// A required field is present but empty.
    #[error("manifest field '{field}' must not be empty")]
    EmptyField {
        /// Name of the offending manifest key.
        field: &'static str,
    },
}

/// Fatal failure to enumerate the plugin root directory.
///
/// Per-plugin problems never surface as this error; they are recorded as
/// [`LoadFailure`]s instead.
#[derive(Debug, Error)]
#[error("failed to enumerate plugin directory {path}: {source}")]
pub struct RegistryError {
    /// The root directory that could not be read.
    pub path: PathBuf,
    /// Underlying I/O error.
    #[source]
    pub source: Arc<std::io::Error>,
}

/// Lookup of a plugin name that is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no plugin named '{name}' is registered")]
pub struct NotFoundError {
    /// The name that was looked up.
    pub name: String,
}

/// Why one plugin candidate failed to load.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The manifest could not be read or decoded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// The plugin's scripts could not be assembled into a sandbox.
    #[error(transparent)]
    Sandbox(#[from] SandboxBuildError),

    /// Another plugin already registered the same declared name.
    ///
    /// The earlier registration wins; nothing is silently overwritten.
    #[error("plugin name '{name}' is already registered from {existing}")]
    DuplicateName {
        /// The contested plugin name.
        name: String,
        /// Directory of the plugin that registered the name first.
        existing: PathBuf,
    },
}

/// A contained per-candidate loading failure, reported but non-fatal.
#[derive(Debug, Error)]
#[error("failed to load plugin from {directory}: {error}")]
pub struct LoadFailure {
    /// The candidate plugin directory.
    pub directory: PathBuf,
    /// What went wrong.
    #[source]
    pub error: LoadError,
}

/// Why one plugin's invocation produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeFailure {
    /// The selected name is not in the registry.
    #[error("no plugin named '{name}' is registered")]
    NotRegistered {
        /// The name that was selected.
        name: String,
    },

    /// The entry point was missing, was cancelled, or raised.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// The worker thread panicked; sibling invocations are unaffected.
    #[error("invocation worker panicked")]
    WorkerPanicked,
}
