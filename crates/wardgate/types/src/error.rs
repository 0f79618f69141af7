//! Errors for the wardgate data model.

use thiserror::Error;

/// Errors raised while loading a gate configuration snapshot.
///
/// Only structurally broken input fails; unrecognized enum values, negative
/// amounts, and similar defects are normalized to safe defaults with a warning.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse gate configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read gate configuration from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
