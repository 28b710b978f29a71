//! End-to-end tests covering the full load-then-invoke lifecycle.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::error::{InvokeFailure, LoadError};
use crate::invoker::PluginInvoker;
use crate::registry::PluginRegistry;
use trellis_script::testing::CaptureSink;
use trellis_script::{InvocationError, ScriptValue};

fn write_plugin(root: &Path, dir_name: &str, plugin_name: &str, scripts: &[(&str, &str)]) {
    let dir = root.join(dir_name);
    fs::create_dir(&dir).expect("create plugin dir");
    let manifest = format!(
        "PluginName: {plugin_name}\nPluginAuthor: ada\nPluginDescription: test plugin\n"
    );
    fs::write(dir.join("plugin.yaml"), manifest).expect("write manifest");
    for (file, body) in scripts {
        fs::write(dir.join(file), body).expect("write script");
    }
}

#[test]
fn full_lifecycle_loads_reports_and_invokes() {
    let root = TempDir::new().expect("tempdir");

    // A well-behaved plugin split across two files: top-level state in
    // the first, entry point in the second.
    write_plugin(
        root.path(),
        "greeter",
        "Greeter",
        &[
            ("a_state.rhai", "let greeting = \"hello\";"),
            (
                "b_entry.rhai",
                r#"fn main() { console.log("greeting ready"); 7 }"#,
            ),
        ],
    );
    // A plugin whose entry point raises at invocation time.
    write_plugin(
        root.path(),
        "crasher",
        "Crasher",
        &[("main.rhai", r#"fn main() { throw "boom"; }"#)],
    );
    // A plugin that never defines the entry point.
    write_plugin(
        root.path(),
        "mute",
        "Mute",
        &[("main.rhai", "let x = 1;")],
    );
    // A directory without a manifest, to be skipped.
    fs::create_dir(root.path().join("docs")).expect("create dir");
    // A directory whose manifest is malformed, contained as a failure.
    let broken = root.path().join("broken");
    fs::create_dir(&broken).expect("create dir");
    fs::write(broken.join("plugin.yaml"), "{ nope").expect("write manifest");

    let capture = CaptureSink::new();
    let report = PluginRegistry::load(root.path(), &capture.sink()).expect("load succeeds");

    assert_eq!(report.registry.len(), 3);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        report.failures.first().expect("one failure").error,
        LoadError::Manifest(_)
    ));

    let mut invoker = PluginInvoker::new(report.registry);
    let outcomes = invoker.invoke_all();
    assert_eq!(outcomes.len(), 3);

    let result_of = |name: &str| {
        &outcomes
            .iter()
            .find(|outcome| outcome.plugin == name)
            .expect("outcome present")
            .result
    };
    assert_eq!(*result_of("Greeter"), Ok(ScriptValue::Int(7)));
    assert!(matches!(
        result_of("Crasher"),
        Err(InvokeFailure::Invocation(InvocationError::Runtime { .. }))
    ));
    assert!(matches!(
        result_of("Mute"),
        Err(InvokeFailure::Invocation(
            InvocationError::EntryPointMissing { .. }
        ))
    ));

    assert_eq!(capture.lines(), vec!["greeting ready"]);
}

#[test]
fn selection_round_trip_releases_the_registry() {
    let root = TempDir::new().expect("tempdir");
    write_plugin(
        root.path(),
        "a",
        "Alpha",
        &[("main.rhai", "fn main() { 1 }")],
    );
    write_plugin(
        root.path(),
        "b",
        "Beta",
        &[("main.rhai", "fn main() { 2 }")],
    );

    let capture = CaptureSink::new();
    let report = PluginRegistry::load(root.path(), &capture.sink()).expect("load succeeds");
    let mut invoker = PluginInvoker::new(report.registry);

    let outcomes = invoker.invoke_selected(&["Beta".into()]);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes.first().expect("one outcome").is_success());

    // The registry survives invocation and can be reused.
    let registry = invoker.into_registry();
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("Alpha"));
}
