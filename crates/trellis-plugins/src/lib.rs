//! Plugin discovery, loading, and concurrent invocation for Trellis.
//!
//! The `trellis-plugins` crate owns the plugin lifecycle above the
//! sandbox layer. A plugin is a subdirectory of the plugin root holding a
//! `plugin.yaml` manifest and any number of Rhai scripts;
//! [`PluginRegistry::load`] walks the root, decodes each manifest, builds
//! one isolated [`trellis_script::ScriptSandbox`] per plugin, and records
//! skips and contained per-plugin failures without letting one bad plugin
//! abort the others. The [`PluginInvoker`] then drives the conventional
//! `main` entry point of any selection of loaded plugins, one worker
//! thread per plugin, and reports one outcome per selection once every
//! worker has finished.
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_plugins::{PluginInvoker, PluginRegistry};
//! use trellis_script::stdout_sink;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = stdout_sink();
//! let report = PluginRegistry::load("./plugins".as_ref(), &sink)?;
//! for failure in &report.failures {
//!     eprintln!("{failure}");
//! }
//!
//! let mut invoker = PluginInvoker::new(report.registry);
//! for outcome in invoker.invoke_all() {
//!     match outcome.result {
//!         Ok(value) => println!("{}: {value}", outcome.plugin),
//!         Err(error) => eprintln!("{}: {error}", outcome.plugin),
//!     }
//! }
//! # Ok(()) }
//! ```

pub mod error;
pub mod invoker;
pub mod manifest;
pub mod registry;

#[cfg(test)]
mod tests;

pub use self::error::{
    InvokeFailure, LoadError, LoadFailure, ManifestError, NotFoundError, RegistryError,
};
pub use self::invoker::{ENTRY_POINT, InvocationOutcome, PluginInvoker};
pub use self::manifest::{MANIFEST_FILE_NAME, PluginManifest};
pub use self::registry::{LoadReport, LoadedPlugin, PluginRegistry};
