//! Command-line interface components
//!
//! This module contains CLI-specific code for the jAccount Calendar application,
//! including argument parsing, terminal prompts and signal handling.

pub mod args;
pub mod commands;
pub mod prompt;
pub mod signals;

pub use args::{Cli, ExportArgs, GlobalArgs};
pub use commands::{CycleOutcome, handle_export, load_config};
pub use prompt::TerminalPrompter;
pub use signals::SignalHandler;
