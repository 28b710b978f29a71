//! Isolated script sandboxes for Trellis plugins.
//!
//! The `trellis-script` crate owns the guest-execution layer: each plugin
//! gets a [`ScriptSandbox`] wrapping a private Rhai interpreter with its
//! own global scope, so no two plugins can observe each other's state.
//! Host capabilities are bound into the sandbox before any guest code
//! runs; the only capability currently exposed is a `console` value whose
//! variadic `log(...)` method writes space-joined lines to a shared
//! [`LogSink`].
//!
//! Sandboxes are described declaratively with a [`SandboxSpec`] and built
//! in one step. Building discovers every `.rhai` file under the plugin
//! root in path-lexicographic order, compiles each one, and runs its
//! top-level statements into the sandbox scope while accumulating
//! function definitions, so later files may call functions defined by
//! earlier ones. A failure in any script aborts the whole build; a
//! partially initialised sandbox is never returned.
//!
//! # Example
//!
//! ```rust,no_run
//! use trellis_script::{SandboxSpec, ScriptSandbox};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let spec = SandboxSpec::new("/srv/plugins/greeter");
//! let mut sandbox = ScriptSandbox::build(&spec)?;
//! let value = sandbox.invoke("main")?;
//! println!("plugin returned {value}");
//! # Ok(()) }
//! ```

pub mod console;
mod error;
pub mod sandbox;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use self::console::{CONSOLE_BINDING, Console, LogSink, stdout_sink};
pub use self::error::{InvocationError, SandboxBuildError};
pub use self::sandbox::{CancelHandle, SCRIPT_EXTENSION, SandboxSpec, ScriptSandbox};
pub use self::value::ScriptValue;
