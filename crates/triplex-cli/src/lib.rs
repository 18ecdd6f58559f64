//! Triplex CLI library.
//!
//! Configuration loading, logging setup, command execution and terminal
//! output for the `triplex` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::Formatter;
