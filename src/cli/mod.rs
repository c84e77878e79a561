//! CLI module for the stackshift deployment tool.
//!
//! This module provides the command-line interface and the console
//! rendering of deploy runs.

mod commands;
mod output;

pub use commands::{Cli, Commands, TargetArgs};
pub use output::ConsoleSink;
