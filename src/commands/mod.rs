//! `litq` subcommand implementations.

use thiserror::Error;

use crate::completion::QueryError;
use crate::config::ConfigError;

/// `litq config` subcommands.
pub mod config;
/// Shared query options, settings resolution and output.
pub mod query;
/// Task subcommands (tag, classify, extrapolate, reverse).
pub mod tasks;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Usage(String),

    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] std::io::Error),

    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}
