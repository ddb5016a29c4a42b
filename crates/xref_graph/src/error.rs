//! Error types for the cross-reference graph core.
//!
//! Store, filter and geometry functions are pure and fail fast: they return
//! one of these errors instead of retrying or producing degenerate output.

use thiserror::Error;

/// A specialized `Result` type for graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur within the `xref_graph` crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The ingested dataset is malformed or structurally invalid.
    ///
    /// Fatal to [`ConnectionStore::load`](crate::ConnectionStore::load); no
    /// partial store is ever produced.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// The geometry generator was asked for an arc it cannot draw
    /// (same start and end ordinal, or a non-positive radius).
    #[error("invalid arc: {0}")]
    InvalidArc(String),

    /// A chapter id that is not present in the store.
    #[error("unknown chapter id: {0}")]
    UnknownChapter(u32),

    /// A book name that is not present in the store.
    #[error("unknown book: {0}")]
    UnknownBook(String),

    /// A filter value that cannot be parsed (e.g. testament `"apocrypha"`).
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// An error that occurred while (de)serializing JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error from the underlying I/O system.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
