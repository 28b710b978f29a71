//! Unit tests for sandbox construction and invocation.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use super::{SandboxSpec, ScriptSandbox};
use crate::error::{InvocationError, SandboxBuildError};
use crate::testing::CaptureSink;
use crate::value::ScriptValue;

fn write_script(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write script");
}

fn build_with_capture(root: &Path) -> (ScriptSandbox, CaptureSink) {
    let capture = CaptureSink::new();
    let spec = SandboxSpec::new(root).with_sink(capture.sink());
    let sandbox = ScriptSandbox::build(&spec).expect("sandbox builds");
    (sandbox, capture)
}

// ---------------------------------------------------------------------------
// Successful builds
// ---------------------------------------------------------------------------

#[test]
fn entry_point_result_is_surfaced() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "greeter.rhai", r#"fn main() { "hello" }"#);
    let (mut sandbox, _capture) = build_with_capture(root.path());
    let value = sandbox.invoke("main").expect("invocation succeeds");
    assert_eq!(value, ScriptValue::Str("hello".into()));
}

#[test]
fn scripts_run_in_lexicographic_order() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "a.rhai", "let base = 2;");
    write_script(root.path(), "b.rhai", "console.log(base * 2);");
    let (_sandbox, capture) = build_with_capture(root.path());
    assert_eq!(capture.lines(), vec!["4"]);
}

#[test]
fn later_scripts_call_functions_from_earlier_scripts() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "a.rhai", "fn double(x) { x * 2 }");
    write_script(root.path(), "b.rhai", "console.log(double(21));");
    let (_sandbox, capture) = build_with_capture(root.path());
    assert_eq!(capture.lines(), vec!["42"]);
}

#[test]
fn scripts_in_subdirectories_are_discovered() {
    let root = TempDir::new().expect("tempdir");
    fs::create_dir(root.path().join("lib")).expect("mkdir");
    write_script(&root.path().join("lib"), "entry.rhai", "fn main() { 7 }");
    let (mut sandbox, _capture) = build_with_capture(root.path());
    assert_eq!(sandbox.invoke("main").expect("invoke"), ScriptValue::Int(7));
}

#[test]
fn top_level_output_is_reproducible_across_builds() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "a.rhai", r#"console.log("one");"#);
    write_script(root.path(), "b.rhai", r#"console.log("two");"#);
    write_script(root.path(), "c.rhai", r#"console.log("three");"#);
    let (_first, first_capture) = build_with_capture(root.path());
    let (_second, second_capture) = build_with_capture(root.path());
    assert_eq!(first_capture.lines(), vec!["one", "two", "three"]);
    assert_eq!(first_capture.lines(), second_capture.lines());
}

#[test]
fn excluded_files_are_not_executed() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "setup.rhai", r#"throw "should not run";"#);
    write_script(root.path(), "main.rhai", "fn main() { 1 }");
    let spec = SandboxSpec::new(root.path()).exclude_file("setup.rhai");
    assert!(ScriptSandbox::build(&spec).is_ok());
}

#[test]
fn empty_plugin_directory_builds_an_empty_sandbox() {
    let root = TempDir::new().expect("tempdir");
    let (mut sandbox, _capture) = build_with_capture(root.path());
    let err = sandbox.invoke("main").expect_err("no entry point");
    assert_eq!(
        err,
        InvocationError::EntryPointMissing {
            name: "main".into()
        }
    );
}

// ---------------------------------------------------------------------------
// Failing builds
// ---------------------------------------------------------------------------

#[test]
fn parse_error_aborts_the_build_and_names_the_file() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "a.rhai", "fn main( {");
    write_script(root.path(), "b.rhai", r#"console.log("unreachable");"#);
    let capture = CaptureSink::new();
    let spec = SandboxSpec::new(root.path()).with_sink(capture.sink());
    let err = ScriptSandbox::build(&spec).expect_err("parse error");
    match err {
        SandboxBuildError::Parse { path, .. } => {
            assert!(path.ends_with("a.rhai"), "got: {}", path.display());
        }
        other => panic!("expected parse error, got: {other}"),
    }
    assert!(capture.contents().is_empty(), "no script should have run");
}

#[test]
fn top_level_error_stops_remaining_scripts() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "a.rhai", r#"console.log("one");"#);
    write_script(root.path(), "b.rhai", r#"throw "boom";"#);
    write_script(root.path(), "c.rhai", r#"console.log("three");"#);
    let capture = CaptureSink::new();
    let spec = SandboxSpec::new(root.path()).with_sink(capture.sink());
    let err = ScriptSandbox::build(&spec).expect_err("execution error");
    match err {
        SandboxBuildError::Execution { path, message } => {
            assert!(path.ends_with("b.rhai"), "got: {}", path.display());
            assert!(message.contains("boom"), "got: {message}");
        }
        other => panic!("expected execution error, got: {other}"),
    }
    assert_eq!(capture.lines(), vec!["one"]);
}

#[test]
fn missing_root_directory_is_a_discovery_error() {
    let spec = SandboxSpec::new("/nonexistent/trellis-test-plugin");
    let err = ScriptSandbox::build(&spec).expect_err("missing root");
    assert!(matches!(err, SandboxBuildError::Discovery { .. }));
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

#[test]
fn runtime_error_in_entry_point_is_contained() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "main.rhai", r#"fn main() { throw "kaboom"; }"#);
    let (mut sandbox, _capture) = build_with_capture(root.path());
    let err = sandbox.invoke("main").expect_err("guest raises");
    match err {
        InvocationError::Runtime { message } => {
            assert!(message.contains("kaboom"), "got: {message}");
        }
        other => panic!("expected runtime error, got: {other}"),
    }
}

#[test]
fn entry_point_can_log_through_console() {
    let root = TempDir::new().expect("tempdir");
    write_script(
        root.path(),
        "main.rhai",
        r#"fn main() { console.log("from main"); 0 }"#,
    );
    let (mut sandbox, capture) = build_with_capture(root.path());
    assert_eq!(sandbox.invoke("main").expect("invoke"), ScriptValue::Int(0));
    assert_eq!(capture.lines(), vec!["from main"]);
}

#[test]
fn sandboxes_do_not_share_definitions() {
    let first_root = TempDir::new().expect("tempdir");
    write_script(
        first_root.path(),
        "main.rhai",
        "fn helper() { 41 } fn main() { helper() + 1 }",
    );
    let second_root = TempDir::new().expect("tempdir");
    write_script(second_root.path(), "main.rhai", "fn main() { helper() }");

    let (mut first, _first_capture) = build_with_capture(first_root.path());
    let (mut second, _second_capture) = build_with_capture(second_root.path());

    assert_eq!(first.invoke("main").expect("invoke"), ScriptValue::Int(42));
    let err = second.invoke("main").expect_err("helper must not leak");
    assert!(
        matches!(err, InvocationError::Runtime { .. }),
        "got: {err:?}"
    );
}

#[test]
fn cancelled_sandbox_reports_cancellation() {
    let root = TempDir::new().expect("tempdir");
    write_script(root.path(), "main.rhai", "fn main() { let x = 1; x + 1 }");
    let (mut sandbox, _capture) = build_with_capture(root.path());
    sandbox.cancel_handle().cancel();
    let err = sandbox.invoke("main").expect_err("cancelled");
    assert_eq!(err, InvocationError::Cancelled);
}
