//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, and the main
//! application runners.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod presenter;

// Re-export commonly used types
pub use app::{run_record, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, RecordArgs, RecordOptions};
pub use config_cmd::handle_config_command;
pub use presenter::Presenter;
