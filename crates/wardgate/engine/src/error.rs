//! Errors for the wardgate engine crates.

use thiserror::Error;

/// Errors from the bypass registry's durable store.
///
/// These never surface through evaluation; persistence failures are logged and
/// the in-memory state stays authoritative.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read bypass store {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write bypass store {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
