//! Plugin discovery and registry population.
//!
//! [`PluginRegistry::load`] walks the immediate subdirectories of a
//! plugin root. A subdirectory without a manifest is a recorded skip —
//! the normal way to co-locate non-plugin directories — while a
//! subdirectory whose manifest or scripts fail is a recorded
//! [`LoadFailure`]. Either way loading continues with the next
//! candidate; only failure to enumerate the root itself aborts the load.
//! A plugin appears in the registry only when its manifest decoded and
//! every one of its scripts executed cleanly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use trellis_script::{LogSink, SandboxSpec, ScriptSandbox};

use crate::error::{LoadError, LoadFailure, ManifestError, NotFoundError, RegistryError};
use crate::manifest::{MANIFEST_FILE_NAME, PluginManifest};

/// Tracing target for registry operations.
const REGISTRY_TARGET: &str = "trellis_plugins::registry";

/// A successfully loaded plugin.
///
/// Owns the decoded manifest, the plugin's root directory (kept for
/// diagnostics), and the plugin's exclusively owned sandbox. Never
/// mutated after creation apart from sandbox invocation; dropping the
/// value releases the interpreter.
#[derive(Debug)]
pub struct LoadedPlugin {
    manifest: PluginManifest,
    root: PathBuf,
    sandbox: ScriptSandbox,
}

impl LoadedPlugin {
    /// Assembles a loaded plugin from its parts.
    #[must_use]
    pub fn new(manifest: PluginManifest, root: impl Into<PathBuf>, sandbox: ScriptSandbox) -> Self {
        Self {
            manifest,
            root: root.into(),
            sandbox,
        }
    }

    /// Returns the plugin's manifest.
    #[must_use]
    pub const fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Returns the plugin's root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the plugin's sandbox.
    #[must_use]
    pub const fn sandbox(&self) -> &ScriptSandbox {
        &self.sandbox
    }

    /// Returns the plugin's sandbox for invocation.
    #[must_use]
    pub const fn sandbox_mut(&mut self) -> &mut ScriptSandbox {
        &mut self.sandbox
    }
}

/// Everything a load produced: the registry plus the skip/failure record.
#[derive(Debug)]
pub struct LoadReport {
    /// Plugins that loaded completely.
    pub registry: PluginRegistry,
    /// Candidate directories without a manifest file.
    pub skipped: Vec<PathBuf>,
    /// Candidates that failed to load, each contained to itself.
    pub failures: Vec<LoadFailure>,
}

/// Registry of loaded plugins keyed by declared name.
///
/// Iteration order is the lexicographic order of plugin names so that
/// logs and invocation reports are reproducible across runs.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, LoadedPlugin>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every plugin under `root`.
    ///
    /// Subdirectories are visited in sorted order; non-directory entries
    /// are ignored silently. One bad plugin never aborts loading of the
    /// others.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] only when `root` itself cannot be
    /// enumerated.
    pub fn load(root: &Path, sink: &LogSink) -> Result<LoadReport, RegistryError> {
        let candidates = list_subdirectories(root)?;
        let mut registry = Self::new();
        let mut skipped = Vec::new();
        let mut failures = Vec::new();

        for dir in candidates {
            let manifest_path = dir.join(MANIFEST_FILE_NAME);
            if !manifest_path.is_file() {
                debug!(
                    target: REGISTRY_TARGET,
                    directory = %dir.display(),
                    "skipping: no {MANIFEST_FILE_NAME}"
                );
                skipped.push(dir);
                continue;
            }

            match load_plugin(&dir, &manifest_path, sink) {
                Ok(plugin) => {
                    let name = plugin.manifest().name().to_owned();
                    match registry.register(plugin) {
                        Ok(()) => {
                            info!(
                                target: REGISTRY_TARGET,
                                plugin = %name,
                                directory = %dir.display(),
                                "loaded plugin"
                            );
                        }
                        Err(error) => {
                            warn!(
                                target: REGISTRY_TARGET,
                                directory = %dir.display(),
                                %error,
                                "failed to register plugin"
                            );
                            failures.push(LoadFailure {
                                directory: dir,
                                error,
                            });
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        target: REGISTRY_TARGET,
                        directory = %dir.display(),
                        %error,
                        "failed to load plugin"
                    );
                    failures.push(LoadFailure {
                        directory: dir,
                        error,
                    });
                }
            }
        }

        Ok(LoadReport {
            registry,
            skipped,
            failures,
        })
    }

    /// Registers an already-built plugin.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Manifest`] when the manifest fails
    /// validation and [`LoadError::DuplicateName`] when another plugin
    /// already claimed the declared name; the earlier registration is
    /// kept.
    pub fn register(&mut self, plugin: LoadedPlugin) -> Result<(), LoadError> {
        plugin.manifest().validate()?;
        let name = plugin.manifest().name().to_owned();
        if let Some(existing) = self.plugins.get(&name) {
            return Err(LoadError::DuplicateName {
                name,
                existing: existing.root().to_path_buf(),
            });
        }
        self.plugins.insert(name, plugin);
        Ok(())
    }

    /// Looks up a plugin by declared name.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when the name is absent.
    pub fn get(&self, name: &str) -> Result<&LoadedPlugin, NotFoundError> {
        self.plugins.get(name).ok_or_else(|| NotFoundError {
            name: name.to_owned(),
        })
    }

    /// Returns `true` when a plugin with the given name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Iterates plugins in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoadedPlugin)> {
        self.plugins
            .iter()
            .map(|(name, plugin)| (name.as_str(), plugin))
    }

    /// Iterates plugin names in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Iterates plugins mutably, for the invocation coordinator.
    pub(crate) fn entries_mut(&mut self) -> impl Iterator<Item = (&String, &mut LoadedPlugin)> {
        self.plugins.iter_mut()
    }

    /// Returns the number of loaded plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when no plugins are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

/// Returns the sorted immediate subdirectories of `root`.
fn list_subdirectories(root: &Path) -> Result<Vec<PathBuf>, RegistryError> {
    let entries = fs::read_dir(root).map_err(|err| RegistryError {
        path: root.to_path_buf(),
        source: Arc::new(err),
    })?;
    let mut dirs = Vec::new();
    for result in entries {
        let entry = result.map_err(|err| RegistryError {
            path: root.to_path_buf(),
            source: Arc::new(err),
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Decodes the manifest and builds the sandbox for one candidate.
fn load_plugin(
    dir: &Path,
    manifest_path: &Path,
    sink: &LogSink,
) -> Result<LoadedPlugin, LoadError> {
    let content = fs::read_to_string(manifest_path).map_err(|err| ManifestError::Read {
        path: manifest_path.to_path_buf(),
        source: Arc::new(err),
    })?;
    let manifest = PluginManifest::from_yaml(&content)?;

    let spec = SandboxSpec::new(dir)
        .with_sink(Arc::clone(sink))
        .exclude_file(MANIFEST_FILE_NAME);
    let sandbox = ScriptSandbox::build(&spec)?;

    Ok(LoadedPlugin::new(manifest, dir, sandbox))
}
