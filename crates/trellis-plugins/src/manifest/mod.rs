//! Plugin manifest decoding and validation.
//!
//! Every plugin directory carries a `plugin.yaml` at its top level
//! declaring the plugin's identity. Decoding is a pure function of the
//! file content; locating the file (and treating its absence as "not a
//! plugin" rather than an error) is the registry's responsibility.

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// File name of the manifest inside a plugin directory.
pub const MANIFEST_FILE_NAME: &str = "plugin.yaml";

/// Declarative description of one plugin.
///
/// # Example
///
/// ```
/// use trellis_plugins::PluginManifest;
///
/// let manifest = PluginManifest::from_yaml(
///     "PluginName: Greeter\nPluginAuthor: ada\nPluginDescription: says hello\n",
/// ).expect("decodes");
/// assert_eq!(manifest.name(), "Greeter");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    #[serde(rename = "PluginName")]
    name: String,
    #[serde(rename = "PluginAuthor")]
    author: String,
    #[serde(rename = "PluginDescription")]
    description: String,
}

impl PluginManifest {
    /// Creates a manifest from its parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            description: description.into(),
        }
    }

    /// Decodes and validates a manifest from YAML content.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Malformed`] when the content is not a
    /// well-formed mapping or a required key is missing, and
    /// [`ManifestError::EmptyField`] when the declared name is blank.
    pub fn from_yaml(content: &str) -> Result<Self, ManifestError> {
        let manifest: Self = serde_yaml::from_str(content)
            .map_err(|err| ManifestError::Malformed { source: err })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validates the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EmptyField`] when the declared name is
    /// empty or whitespace.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyField {
                field: "PluginName",
            });
        }
        Ok(())
    }

    /// Returns the declared plugin name.
    #[must_use]
    pub const fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the declared author.
    #[must_use]
    pub const fn author(&self) -> &str {
        self.author.as_str()
    }

    /// Returns the declared description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }
}

#[cfg(test)]
mod tests;
