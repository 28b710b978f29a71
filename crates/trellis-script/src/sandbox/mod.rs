//! Sandbox construction and guest entry-point invocation.
//!
//! A [`SandboxSpec`] describes where a plugin's scripts live and where
//! its log output goes; [`ScriptSandbox::build`] turns the description
//! into a ready-to-invoke sandbox. The sandbox owns a private
//! [`rhai::Engine`], a private global [`rhai::Scope`], and the function
//! library accumulated from the plugin's scripts. Nothing is shared
//! between sandboxes, which is what makes cross-plugin parallelism safe:
//! each sandbox is exclusively owned and must only ever be invoked by one
//! thread at a time.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rhai::{AST, Dynamic, Engine, EvalAltResult, Scope};
use tracing::debug;

use crate::console::{self, LogSink, stdout_sink};
use crate::error::{InvocationError, SandboxBuildError};
use crate::value::ScriptValue;

/// Tracing target for sandbox operations.
const SANDBOX_TARGET: &str = "trellis_script::sandbox";

/// File extension marking a file as guest-executable.
pub const SCRIPT_EXTENSION: &str = "rhai";

/// Declarative description of a sandbox to build.
///
/// # Example
///
/// ```rust,no_run
/// use trellis_script::{SandboxSpec, ScriptSandbox, stdout_sink};
///
/// let spec = SandboxSpec::new("/srv/plugins/greeter")
///     .with_sink(stdout_sink())
///     .exclude_file("plugin.yaml");
/// let sandbox = ScriptSandbox::build(&spec);
/// ```
#[derive(Clone)]
pub struct SandboxSpec {
    root: PathBuf,
    sink: LogSink,
    excluded_files: Vec<OsString>,
}

impl SandboxSpec {
    /// Creates a spec rooted at the given plugin directory, logging to
    /// the host's stdout.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sink: stdout_sink(),
            excluded_files: Vec::new(),
        }
    }

    /// Redirects the sandbox's `console.log` output to the given sink.
    #[must_use]
    pub fn with_sink(mut self, sink: LogSink) -> Self {
        self.sink = sink;
        self
    }

    /// Excludes a file name from script discovery.
    ///
    /// Used by callers to keep manifest files out of execution even if
    /// their name were to match the script extension.
    #[must_use]
    pub fn exclude_file(mut self, name: impl Into<OsString>) -> Self {
        self.excluded_files.push(name.into());
        self
    }

    /// Returns the plugin root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl std::fmt::Debug for SandboxSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SandboxSpec")
            .field("root", &self.root)
            .field("excluded_files", &self.excluded_files)
            .finish_non_exhaustive()
    }
}

/// Cloneable handle that terminates a sandbox's current evaluation.
///
/// The handle is wired into the engine's progress hook, so triggering it
/// stops only the owning sandbox; sibling sandboxes are unaffected. Once
/// triggered, the sandbox refuses further evaluation.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Requests termination of the sandbox's current evaluation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns `true` when cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// An isolated, ready-to-invoke script execution context.
///
/// Holds the cumulative effect of having executed every one of the
/// plugin's scripts in deterministic order: global variables live in the
/// sandbox scope and function definitions in the accumulated function
/// library. The interpreter is released when the sandbox is dropped.
pub struct ScriptSandbox {
    engine: Engine,
    scope: Scope<'static>,
    fn_lib: AST,
    cancel: CancelHandle,
}

impl ScriptSandbox {
    /// Builds a sandbox from a spec.
    ///
    /// Binds host capabilities, discovers every script under the spec's
    /// root in path-lexicographic order, and executes each script's
    /// top-level statements into the sandbox scope. Function definitions
    /// accumulate across files, so later scripts may call functions
    /// defined by earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`SandboxBuildError`] if discovery fails or if any script
    /// cannot be read, fails to parse, or raises during top-level
    /// execution. The first failing script aborts the build; remaining
    /// scripts are not attempted.
    pub fn build(spec: &SandboxSpec) -> Result<Self, SandboxBuildError> {
        let scripts = discover_scripts(spec)?;
        debug!(
            target: SANDBOX_TARGET,
            root = %spec.root.display(),
            script_count = scripts.len(),
            "building sandbox"
        );

        let mut engine = Engine::new();
        console::bind(&mut engine, Arc::clone(&spec.sink));

        let cancel = CancelHandle::default();
        let probe = cancel.clone();
        engine.on_progress(move |_| probe.is_cancelled().then_some(Dynamic::UNIT));

        let mut scope = Scope::new();
        let mut fn_lib = AST::empty();
        for path in scripts {
            let source =
                fs::read_to_string(&path).map_err(|err| SandboxBuildError::ReadScript {
                    path: path.clone(),
                    source: Arc::new(err),
                })?;
            let mut ast = engine
                .compile(&source)
                .map_err(|err| SandboxBuildError::Parse {
                    path: path.clone(),
                    message: err.to_string(),
                })?;
            ast.set_source(path.to_string_lossy().as_ref());

            // Earlier files' functions must be callable from this file's
            // top-level code, so run against the accumulated library.
            let unit = fn_lib.merge(&ast);
            engine
                .run_ast_with_scope(&mut scope, &unit)
                .map_err(|err| SandboxBuildError::Execution {
                    path: path.clone(),
                    message: err.to_string(),
                })?;
            fn_lib = fn_lib.merge(&ast.clone_functions_only());
        }

        Ok(Self {
            engine,
            scope,
            fn_lib,
            cancel,
        })
    }

    /// Invokes a zero-argument guest function by name.
    ///
    /// Guest functions are pure: they see host capabilities and other
    /// guest functions, not the sandbox's top-level variables.
    ///
    /// # Errors
    ///
    /// Returns [`InvocationError::EntryPointMissing`] when the plugin's
    /// scripts define no such function, [`InvocationError::Cancelled`]
    /// when the cancel handle was triggered, and
    /// [`InvocationError::Runtime`] for any uncaught guest error.
    pub fn invoke(&mut self, fn_name: &str) -> Result<ScriptValue, InvocationError> {
        match self
            .engine
            .call_fn::<Dynamic>(&mut self.scope, &self.fn_lib, fn_name, ())
        {
            Ok(value) => Ok(ScriptValue::from_dynamic(&value)),
            Err(err) => Err(classify_eval_error(&err, fn_name)),
        }
    }

    /// Returns a handle that cancels this sandbox's evaluation.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl std::fmt::Debug for ScriptSandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptSandbox")
            .field("globals", &self.scope.len())
            .finish_non_exhaustive()
    }
}

/// Maps a Rhai evaluation error onto the invocation error taxonomy.
///
/// Termination raised inside nested guest calls arrives wrapped in
/// `ErrorInFunctionCall` frames, so the chain is unwound before checking
/// for cancellation.
fn classify_eval_error(err: &EvalAltResult, entry: &str) -> InvocationError {
    if let EvalAltResult::ErrorFunctionNotFound(signature, _) = err
        && signature.starts_with(entry)
    {
        return InvocationError::EntryPointMissing {
            name: entry.to_owned(),
        };
    }

    let mut current = err;
    while let EvalAltResult::ErrorInFunctionCall(_, _, inner, _) = current {
        current = inner.as_ref();
    }
    if matches!(current, EvalAltResult::ErrorTerminated(..)) {
        return InvocationError::Cancelled;
    }

    InvocationError::Runtime {
        message: err.to_string(),
    }
}

/// Finds every guest-executable script under the spec's root.
///
/// Recurses into subdirectories and returns paths sorted
/// lexicographically so execution order is reproducible across loads.
fn discover_scripts(spec: &SandboxSpec) -> Result<Vec<PathBuf>, SandboxBuildError> {
    let mut scripts = Vec::new();
    collect_scripts(spec, &spec.root, &mut scripts)?;
    scripts.sort();
    Ok(scripts)
}

fn collect_scripts(
    spec: &SandboxSpec,
    dir: &Path,
    out: &mut Vec<PathBuf>,
) -> Result<(), SandboxBuildError> {
    let entries = fs::read_dir(dir).map_err(|err| SandboxBuildError::Discovery {
        path: dir.to_path_buf(),
        source: Arc::new(err),
    })?;
    for result in entries {
        let entry = result.map_err(|err| SandboxBuildError::Discovery {
            path: dir.to_path_buf(),
            source: Arc::new(err),
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_scripts(spec, &path, out)?;
        } else if is_script(spec, &path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_script(spec: &SandboxSpec, path: &Path) -> bool {
    let matches_extension = path
        .extension()
        .is_some_and(|ext| ext == SCRIPT_EXTENSION);
    let excluded = path
        .file_name()
        .is_some_and(|name| spec.excluded_files.iter().any(|ex| ex == name));
    matches_extension && !excluded
}

#[cfg(test)]
mod tests;
