//! The `console` host capability bound into every sandbox.
//!
//! Guest scripts see a global value named [`CONSOLE_BINDING`] with a
//! variadic `log(...)` method. Each argument is rendered with Rhai's
//! default display conversion, the renderings are joined with single
//! spaces, and the resulting line is written to the sandbox's [`LogSink`]
//! as one atomic write so that lines from concurrently running plugins
//! never interleave mid-line.
//!
//! `log` must never raise inside the guest: sink write failures and lock
//! poisoning are swallowed rather than propagated into script execution.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use rhai::{Dynamic, Engine};

/// Name under which the console capability is visible to guest code.
pub const CONSOLE_BINDING: &str = "console";

/// Destination for guest log lines, shared between sandboxes.
///
/// The mutex guarantees that each logged line is written without
/// interleaving even when plugins run concurrently.
pub type LogSink = Arc<Mutex<dyn Write + Send>>;

/// Returns a sink that writes guest log lines to the host's stdout.
#[must_use]
pub fn stdout_sink() -> LogSink {
    Arc::new(Mutex::new(io::stdout()))
}

/// Host-side logging capability exposed to guest scripts.
///
/// A `Console` is resolved for the [`CONSOLE_BINDING`] identifier in
/// every position of a sandboxed script, including inside function
/// bodies, via the engine's variable resolver.
#[derive(Clone)]
pub struct Console {
    sink: LogSink,
}

impl Console {
    /// Creates a console writing to the given sink.
    #[must_use]
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }

    /// Formats the arguments space-separated and writes one line.
    ///
    /// Infallible by contract: write errors and poisoned locks are
    /// ignored so that guest execution can never be aborted by the
    /// logging capability.
    fn log_line(&self, args: &[Dynamic]) {
        let mut line = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        line.push('\n');
        if let Ok(mut sink) = self.sink.lock() {
            drop(sink.write_all(line.as_bytes()));
        }
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

/// Registers `log` for one fixed arity.
///
/// Rhai native functions have fixed arity, so the variadic surface is
/// emulated by registering `log` once per supported argument count.
macro_rules! register_log_arity {
    ($engine:expr $(, $arg:ident)*) => {
        $engine.register_fn("log", |console: &mut Console $(, $arg: Dynamic)*| {
            console.log_line(&[$($arg),*]);
        });
    };
}

/// Binds the console capability into an engine.
///
/// Installs the `log` method for zero through eight arguments and a
/// variable resolver that makes [`CONSOLE_BINDING`] visible everywhere
/// in guest code. More than eight arguments surfaces to the guest as an
/// ordinary function-not-found error.
pub fn bind(engine: &mut Engine, sink: LogSink) {
    engine.register_type_with_name::<Console>("Console");
    register_log_arity!(engine);
    register_log_arity!(engine, a1);
    register_log_arity!(engine, a1, a2);
    register_log_arity!(engine, a1, a2, a3);
    register_log_arity!(engine, a1, a2, a3, a4);
    register_log_arity!(engine, a1, a2, a3, a4, a5);
    register_log_arity!(engine, a1, a2, a3, a4, a5, a6);
    register_log_arity!(engine, a1, a2, a3, a4, a5, a6, a7);
    register_log_arity!(engine, a1, a2, a3, a4, a5, a6, a7, a8);

    let console = Console::new(sink);
    engine.on_var(move |name, _, _| {
        if name == CONSOLE_BINDING {
            Ok(Some(Dynamic::from(console.clone())))
        } else {
            Ok(None)
        }
    });
}
