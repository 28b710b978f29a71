//! Unit tests for plugin manifest decoding.

use rstest::rstest;

use super::PluginManifest;
use crate::error::ManifestError;

const VALID_MANIFEST: &str = "\
PluginName: Greeter
PluginAuthor: ada
PluginDescription: says hello
";

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[test]
fn decodes_all_required_fields() {
    let manifest = PluginManifest::from_yaml(VALID_MANIFEST).expect("decodes");
    assert_eq!(manifest.name(), "Greeter");
    assert_eq!(manifest.author(), "ada");
    assert_eq!(manifest.description(), "says hello");
}

#[test]
fn unknown_keys_are_tolerated() {
    let content = format!("{VALID_MANIFEST}PluginHomepage: https://example.invalid\n");
    let manifest = PluginManifest::from_yaml(&content).expect("decodes");
    assert_eq!(manifest.name(), "Greeter");
}

#[rstest]
#[case::not_yaml("{ this is not yaml")]
#[case::missing_name("PluginAuthor: ada\nPluginDescription: d\n")]
#[case::missing_author("PluginName: Greeter\nPluginDescription: d\n")]
#[case::scalar_document("just a string\n")]
fn malformed_content_is_rejected(#[case] content: &str) {
    let err = PluginManifest::from_yaml(content).expect_err("should reject");
    assert!(
        matches!(err, ManifestError::Malformed { .. }),
        "got: {err:?}"
    );
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[rstest]
#[case::empty("\"\"")]
#[case::whitespace("\"   \"")]
fn blank_name_is_rejected(#[case] name: &str) {
    let content = format!("PluginName: {name}\nPluginAuthor: a\nPluginDescription: d\n");
    let err = PluginManifest::from_yaml(&content).expect_err("should reject");
    assert!(
        matches!(
            err,
            ManifestError::EmptyField {
                field: "PluginName"
            }
        ),
        "got: {err:?}"
    );
}

#[test]
fn validate_accepts_constructed_manifest() {
    let manifest = PluginManifest::new("Greeter", "ada", "says hello");
    assert!(manifest.validate().is_ok());
}
