#![doc = include_str!("../README.md")]
//! # Cross-Reference Visualization Server
//!
//! Loads the Bible cross-reference dataset from disk and serves filtered
//! subsets, statistics and rendered chart geometry as JSON.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 xref-viz - Standalone Server                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  DatasetLoader (tokio::fs, spawn_blocking, timeout)          │
//! │    ├── preview_data.json ──► installed first                 │
//! │    └── graph_data.json   ──► single-flight full load         │
//! │                  │                                           │
//! │                  ▼                                           │
//! │  Session                                                     │
//! │    ├── FilterState   (testament, book, minConnections)       │
//! │    ├── RenderCache   (cleared on every change)               │
//! │    └── views: arc | radial | chord | stats                   │
//! │                  │                                           │
//! │                  ▼                                           │
//! │  HTTP Server (port 8888)                                     │
//! │    ├── GET /api/graph      → filtered graph subset           │
//! │    ├── GET /api/stats      → statistics report               │
//! │    ├── GET /api/book       → connections of a book           │
//! │    ├── GET /api/chapter    → connections of a chapter        │
//! │    ├── GET /api/preview    → strongest connections           │
//! │    └── GET /api/view/{n}   → rendered view (cached)          │
//! │                                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use xref_viz::{XrefConfig, XrefServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = XrefServer::new(XrefConfig::default());
//!     server.load().await?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

/// JSON API endpoints and the shared [`ApiState`].
pub mod api;

/// Error types and result aliases for the visualization crate.
pub mod error;

/// File-backed, single-flight dataset loading.
pub mod loader;

/// HTTP server configuration and startup.
pub mod server;

/// Filter state, render cache and registered views.
pub mod session;

/// The [`Visualization`] trait and the concrete charts.
pub mod views;

pub use api::ApiState;
pub use error::{Error, Result};
pub use loader::{Dataset, DatasetLoader};
pub use server::{XrefConfig, XrefServer};
pub use session::{RenderOutcome, Session};
pub use views::{
    ArcDiagram, ChordDiagram, RadialArc, RenderResult, StatsView, Visualization,
};

/// Version information from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
