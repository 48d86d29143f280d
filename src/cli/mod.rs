//! Line-oriented shell for driving wizards from a terminal or a script.

mod backend;
mod commands;
mod context;
mod feedback;
mod help;
mod io;
pub mod output;
mod registry;
mod shell;

pub use backend::LocalBackend;
pub use commands::CommandError;
pub use context::{CliMode, ShellContext};
pub use feedback::{ConsoleNavigator, ConsoleNotifier};
pub use shell::{run_cli, SCRIPT_ENV_VAR};
