//! Concurrent invocation of loaded plugin entry points.
//!
//! The [`PluginInvoker`] consumes a populated registry and drives the
//! conventional `main` entry point of a selection of plugins. One scoped
//! worker thread is started per selected plugin; each worker exclusively
//! borrows its plugin's sandbox, so sandbox interpreter state is never
//! touched from two threads. The scope joins every worker before the
//! call returns, which makes the wait accounting equal the number of
//! workers actually started by construction — it cannot drift from the
//! selection size.
//!
//! There are no ordering guarantees between plugins: invocation and
//! completion interleave arbitrarily, and log lines from concurrent
//! plugins mix (whole lines stay atomic, see the console capability).

use std::collections::BTreeSet;
use std::thread;

use tracing::debug;

use trellis_script::ScriptValue;

use crate::error::InvokeFailure;
use crate::registry::{LoadedPlugin, PluginRegistry};

/// Tracing target for invocation operations.
const INVOKER_TARGET: &str = "trellis_plugins::invoker";

/// Conventional name of the guest entry point every plugin must define.
pub const ENTRY_POINT: &str = "main";

/// The observed result of one plugin's invocation.
#[derive(Debug)]
pub struct InvocationOutcome {
    /// Name of the selected plugin.
    pub plugin: String,
    /// The returned guest value, or why there is none.
    pub result: Result<ScriptValue, InvokeFailure>,
}

impl InvocationOutcome {
    /// Returns `true` when the invocation produced a value.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Coordinates entry-point invocations across a registry.
///
/// Owns the registry for the duration of the run; callers pass it in
/// explicitly rather than relying on ambient global state.
///
/// # Example
///
/// ```rust,no_run
/// use trellis_plugins::{PluginInvoker, PluginRegistry};
/// use trellis_script::stdout_sink;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = PluginRegistry::load("./plugins".as_ref(), &stdout_sink())?;
/// let mut invoker = PluginInvoker::new(report.registry);
/// let outcomes = invoker.invoke_all();
/// assert_eq!(outcomes.len(), invoker.registry().len());
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct PluginInvoker {
    registry: PluginRegistry,
}

impl PluginInvoker {
    /// Creates an invoker owning the given registry.
    #[must_use]
    pub const fn new(registry: PluginRegistry) -> Self {
        Self { registry }
    }

    /// Returns the owned registry.
    #[must_use]
    pub const fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Returns the owned registry mutably.
    #[must_use]
    pub const fn registry_mut(&mut self) -> &mut PluginRegistry {
        &mut self.registry
    }

    /// Releases the registry back to the caller.
    #[must_use]
    pub fn into_registry(self) -> PluginRegistry {
        self.registry
    }

    /// Invokes the entry point of every loaded plugin.
    ///
    /// Returns one outcome per plugin once all invocations have
    /// completed.
    pub fn invoke_all(&mut self) -> Vec<InvocationOutcome> {
        let names: Vec<String> = self.registry.names().map(ToOwned::to_owned).collect();
        self.invoke_selected(&names)
    }

    /// Invokes the entry point of each named plugin.
    ///
    /// Duplicate names are collapsed: exactly one invocation is started
    /// per distinct selected plugin. Names not present in the registry
    /// yield a [`InvokeFailure::NotRegistered`] outcome instead of
    /// aborting the others. The call returns only once every started
    /// invocation has completed, successfully or not.
    pub fn invoke_selected(&mut self, names: &[String]) -> Vec<InvocationOutcome> {
        let wanted: BTreeSet<&str> = names.iter().map(String::as_str).collect();
        let missing: Vec<String> = wanted
            .iter()
            .filter(|name| !self.registry.contains(name))
            .map(|name| (*name).to_owned())
            .collect();

        let targets: Vec<(String, &mut LoadedPlugin)> = self
            .registry
            .entries_mut()
            .filter(|(name, _)| wanted.contains(name.as_str()))
            .map(|(name, plugin)| (name.clone(), plugin))
            .collect();

        debug!(
            target: INVOKER_TARGET,
            selected = targets.len(),
            unknown = missing.len(),
            "starting invocations"
        );

        let mut outcomes = run_invocations(targets);
        outcomes.extend(missing.into_iter().map(|name| InvocationOutcome {
            result: Err(InvokeFailure::NotRegistered { name: name.clone() }),
            plugin: name,
        }));
        outcomes
    }
}

/// Runs one worker per target and joins them all.
fn run_invocations(targets: Vec<(String, &mut LoadedPlugin)>) -> Vec<InvocationOutcome> {
    thread::scope(|scope| {
        let workers: Vec<_> = targets
            .into_iter()
            .map(|(name, plugin)| {
                let worker_name = name.clone();
                let handle = scope.spawn(move || {
                    debug!(
                        target: INVOKER_TARGET,
                        plugin = %worker_name,
                        "invoking entry point"
                    );
                    plugin
                        .sandbox_mut()
                        .invoke(ENTRY_POINT)
                        .map_err(InvokeFailure::from)
                });
                (name, handle)
            })
            .collect();

        workers
            .into_iter()
            .map(|(name, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(InvokeFailure::WorkerPanicked));
                InvocationOutcome {
                    plugin: name,
                    result,
                }
            })
            .collect()
    })
}
