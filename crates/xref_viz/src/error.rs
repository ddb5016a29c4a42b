//! Error types for the cross-reference visualization server.

use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for visualization server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur within the `xref_viz` crate.
#[derive(Error, Debug)]
pub enum Error {
    /// An error related to the web server (e.g., binding to a port).
    #[error("Server error: {0}")]
    Server(String),

    /// Reading a dataset file did not finish within the configured limit.
    #[error("Fetch timed out after {0:?}")]
    FetchTimeout(Duration),

    /// No dataset is resident yet, or the requested optional file is absent.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// A request parameter is missing or malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An error that occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An error originating from the `xref_graph` crate.
    #[error("Graph error: {0}")]
    Graph(#[from] xref_graph::Error),

    /// A requested resource was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An error related to the server's configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
