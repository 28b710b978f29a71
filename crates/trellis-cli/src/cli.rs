//! Argument parsing and the top-level run loop.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use trellis_plugins::{InvocationOutcome, PluginInvoker, PluginRegistry};
use trellis_script::stdout_sink;

/// Tracing target for host-side lifecycle events.
const CLI_TARGET: &str = "trellis_cli";

/// Loads plugins from a directory and invokes their entry points.
#[derive(Debug, Parser)]
#[command(name = "trellis", version, about = "Runs Rhai plugins from a plugin directory")]
pub struct Args {
    /// Directory whose subdirectories are plugin candidates.
    #[arg(long, value_name = "DIR", default_value = "plugins")]
    pub plugin_dir: PathBuf,

    /// Plugin names to invoke; every loaded plugin when omitted.
    #[arg(value_name = "PLUGIN")]
    pub plugins: Vec<String>,

    /// Emit one JSON object per outcome instead of plain text.
    #[arg(long)]
    pub json: bool,

    /// Tracing filter expression for diagnostics on stderr.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    pub log_filter: String,
}

/// One invocation outcome in `--json` output.
#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    plugin: &'a str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a trellis_script::ScriptValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a InvocationOutcome> for OutcomeRecord<'a> {
    fn from(outcome: &'a InvocationOutcome) -> Self {
        match &outcome.result {
            Ok(value) => Self {
                plugin: &outcome.plugin,
                ok: true,
                value: Some(value),
                error: None,
            },
            Err(failure) => Self {
                plugin: &outcome.plugin,
                ok: false,
                value: None,
                error: Some(failure.to_string()),
            },
        }
    }
}

/// Loads the plugin directory, invokes the selection, and reports.
///
/// Plugin `console.log` output and outcome reporting go to stdout;
/// lifecycle diagnostics go to stderr through tracing.
///
/// # Errors
///
/// Returns an error when the plugin root cannot be enumerated at all or
/// when writing the report to stdout fails. Per-plugin problems are
/// contained and reflected in the exit code instead.
pub fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let report = PluginRegistry::load(&args.plugin_dir, &stdout_sink())
        .with_context(|| format!("cannot load plugins from {}", args.plugin_dir.display()))?;

    for skipped in &report.skipped {
        info!(
            target: CLI_TARGET,
            directory = %skipped.display(),
            "skipped directory without a manifest"
        );
    }
    for failure in &report.failures {
        warn!(target: CLI_TARGET, %failure, "plugin failed to load");
    }
    for (name, plugin) in report.registry.iter() {
        info!(
            target: CLI_TARGET,
            plugin = %name,
            author = plugin.manifest().author(),
            description = plugin.manifest().description(),
            "loaded plugin"
        );
    }

    let load_failures = report.failures.len();
    let mut invoker = PluginInvoker::new(report.registry);
    let outcomes = if args.plugins.is_empty() {
        invoker.invoke_all()
    } else {
        invoker.invoke_selected(&args.plugins)
    };

    let mut stdout = io::stdout().lock();
    if args.json {
        print_json(&mut stdout, &outcomes)?;
    } else {
        print_plain(&mut stdout, &outcomes)?;
    }

    let all_succeeded = outcomes.iter().all(InvocationOutcome::is_success);
    if all_succeeded && load_failures == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn print_plain(out: &mut impl Write, outcomes: &[InvocationOutcome]) -> anyhow::Result<()> {
    for outcome in outcomes {
        match &outcome.result {
            Ok(value) => writeln!(out, "{}: {value}", outcome.plugin)?,
            Err(failure) => writeln!(out, "{}: error: {failure}", outcome.plugin)?,
        }
    }
    Ok(())
}

fn print_json(out: &mut impl Write, outcomes: &[InvocationOutcome]) -> anyhow::Result<()> {
    for outcome in outcomes {
        let record = OutcomeRecord::from(outcome);
        serde_json::to_writer(&mut *out, &record).context("cannot serialise outcome")?;
        writeln!(out)?;
    }
    Ok(())
}
