//! Cross-reference graph core.
//!
//! Holds the canonical chapter/connection graph of the Bible cross-reference
//! dataset and everything computed from it: filtered edge lists, arc and
//! radial path geometry, the render cache and descriptive statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        xref_graph                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   GraphData (JSON) ──► ConnectionStore::load                 │
//! │                          │  id → position map                │
//! │                          │  chapter → book index             │
//! │                          │  BookMatrix (rebuilt)             │
//! │                          ▼                                   │
//! │               combined_filter(FilterState)                   │
//! │                          │                                   │
//! │          ┌───────────────┼────────────────┐                  │
//! │          ▼               ▼                ▼                  │
//! │    ArcGenerator   generate_radial_path  StatsAggregator      │
//! │     (Point[])        (RadialPath)       (StatsReport)        │
//! │                                                              │
//! │   RenderCache: NotRendered ⇄ Rendered per visualization      │
//! │                                                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use xref_graph::{ArcLayout, ConnectionStore, FilterState, TestamentFilter, generate_arc_path};
//!
//! # fn main() -> xref_graph::Result<()> {
//! let store = ConnectionStore::from_json(r#"{
//!     "chapters": [
//!         {"id": 0, "book": "Genesis", "chapter": 1, "testament": "OT"},
//!         {"id": 1, "book": "Genesis", "chapter": 2, "testament": "OT"},
//!         {"id": 2, "book": "Matthew", "chapter": 1, "testament": "NT"}
//!     ],
//!     "connections": [
//!         {"source": 0, "target": 2, "weight": 5},
//!         {"source": 0, "target": 1, "weight": 3}
//!     ]
//! }"#)?;
//!
//! let filter = FilterState::new().with_testament(TestamentFilter::Cross);
//! let edges = store.combined_filter(&filter);
//! assert_eq!(edges.len(), 1);
//!
//! let layout = ArcLayout::new(store.chapter_count(), 800.0, 400.0);
//! let start = store.position_of(edges[0].source)? as f64;
//! let end = store.position_of(edges[0].target)? as f64;
//! let points = generate_arc_path(start, end, (end - start) / 2.0, &layout)?;
//! assert_eq!(points.len(), 51);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod matrix;
pub mod model;
pub mod stats;
pub mod store;

// Re-exports
pub use cache::{RenderCache, RenderState};
pub use error::{Error, Result};
pub use filter::{FilterState, TestamentFilter};
pub use geometry::{
    angle_scale, generate_arc_path, generate_radial_path, path_string, radial_point,
    radial_stroke_width, ArcGenerator, ArcLayout, ArcPath, LinearScale, Point, RadialPath,
};
pub use matrix::BookMatrix;
pub use model::{Book, Chapter, Connection, ConnectionType, GraphData, Metadata, Testament};
pub use stats::{
    BookCount, CanonSummary, ChapterDegree, ConnectionSummary, StatsAggregator, StatsReport,
    StatsSidecar, TestamentBreakdown, TestamentDistribution,
};
pub use store::ConnectionStore;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
