//! The serialized dataset contract and the value types built from it.
//!
//! A dataset is one JSON document shaped like [`GraphData`]. It is produced by
//! an external preprocessing step and is read-only once loaded.
//!
//! ```
//! use xref_graph::{Connection, GraphData};
//!
//! let json = r#"{
//!     "chapters": [
//!         {"id": 0, "book": "Genesis", "chapter": 1, "testament": "OT"},
//!         {"id": 1, "book": "Matthew", "chapter": 1, "testament": "NT"}
//!     ],
//!     "connections": [{"source": 0, "target": 1, "weight": 5}]
//! }"#;
//!
//! let data: GraphData = serde_json::from_str(json).unwrap();
//! assert_eq!(data.connections[0], Connection::new(0, 1, 5));
//! assert!(data.book_matrix.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two partitions of the canon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Testament {
    /// Old Testament.
    OT,
    /// New Testament.
    NT,
}

impl Testament {
    /// Returns the short code used in the dataset (`"OT"` / `"NT"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Testament::OT => "OT",
            Testament::NT => "NT",
        }
    }
}

impl fmt::Display for Testament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One canonical book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Display name, e.g. `"1 Corinthians"`.
    pub name: String,
    /// Testament the book belongs to.
    pub testament: Testament,
    /// Number of chapters in the book.
    pub chapters: u32,
}

/// One Bible chapter.
///
/// `id` is a stable ordinal across the whole canon. Consumers must resolve it
/// through [`ConnectionStore::position`](crate::ConnectionStore::position)
/// rather than using it as an array offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Stable chapter id.
    pub id: u32,
    /// Book name.
    pub book: String,
    /// Chapter number within the book (1-based).
    pub chapter: u32,
    /// Testament of the owning book.
    pub testament: Testament,
    /// Display label, e.g. `"Genesis 1"`. Derived at load time when absent.
    #[serde(default)]
    pub label: String,
}

impl Chapter {
    /// Creates a chapter with its derived label.
    ///
    /// ```
    /// use xref_graph::{Chapter, Testament};
    ///
    /// let ch = Chapter::new(0, "Genesis", 1, Testament::OT);
    /// assert_eq!(ch.label, "Genesis 1");
    /// ```
    pub fn new(id: u32, book: impl Into<String>, chapter: u32, testament: Testament) -> Self {
        let book = book.into();
        let label = format!("{} {}", book, chapter);
        Self {
            id,
            book,
            chapter,
            testament,
            label,
        }
    }
}

/// One aggregated cross-reference edge between two chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source chapter id.
    pub source: u32,
    /// Target chapter id.
    pub target: u32,
    /// Number of verse-level references folded into this edge (always >= 1).
    pub weight: u32,
}

impl Connection {
    /// Creates a new connection.
    pub fn new(source: u32, target: u32, weight: u32) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }

    /// Returns `true` if `id` is either endpoint.
    pub fn touches(&self, id: u32) -> bool {
        self.source == id || self.target == id
    }
}

/// Styling class of an edge, derived from its endpoints' testaments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    /// Both endpoints in the Old Testament.
    OtOt,
    /// Both endpoints in the New Testament.
    NtNt,
    /// Endpoints in different testaments.
    CrossTestament,
}

impl ConnectionType {
    /// Classifies an edge by its endpoint testaments.
    ///
    /// ```
    /// use xref_graph::{ConnectionType, Testament};
    ///
    /// assert_eq!(ConnectionType::classify(Testament::OT, Testament::NT), ConnectionType::CrossTestament);
    /// assert_eq!(ConnectionType::classify(Testament::NT, Testament::NT).as_str(), "nt-nt");
    /// ```
    pub fn classify(source: Testament, target: Testament) -> Self {
        match (source, target) {
            (Testament::OT, Testament::OT) => ConnectionType::OtOt,
            (Testament::NT, Testament::NT) => ConnectionType::NtNt,
            _ => ConnectionType::CrossTestament,
        }
    }

    /// Returns the CSS-style class name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::OtOt => "ot-ot",
            ConnectionType::NtNt => "nt-nt",
            ConnectionType::CrossTestament => "cross-testament",
        }
    }

    /// Returns the legend colour used for this class.
    pub fn color(&self) -> &'static str {
        match self {
            ConnectionType::OtOt => "#2ecc71",
            ConnectionType::NtNt => "#00CED1",
            ConnectionType::CrossTestament => "#9370DB",
        }
    }
}

/// Dataset-level metadata.
///
/// Keys this crate does not model (e.g. `total_verse_refs`) are preserved in
/// `extra` so they can be echoed back to clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Number of books in the dataset.
    #[serde(default)]
    pub total_books: usize,
    /// Number of chapters in the dataset.
    #[serde(default)]
    pub total_chapters: usize,
    /// Number of connections in the dataset.
    #[serde(default)]
    pub total_connections: usize,
    /// Set when the dataset is a reduced preview of the full graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_preview: Option<bool>,
    /// Any other metadata keys.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The serialized dataset as fetched from disk or the network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// Dataset metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Books in canonical order. May be empty, in which case the store
    /// derives them from the chapter list.
    #[serde(default)]
    pub books: Vec<Book>,
    /// Chapters in canonical reading order.
    pub chapters: Vec<Chapter>,
    /// Chapter-level edges.
    pub connections: Vec<Connection>,
    /// Book-by-book weight matrix, if the producer supplied one.
    #[serde(default)]
    pub book_matrix: Vec<Vec<u64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testament_serde() {
        let t: Testament = serde_json::from_str("\"NT\"").unwrap();
        assert_eq!(t, Testament::NT);
        assert_eq!(serde_json::to_string(&Testament::OT).unwrap(), "\"OT\"");
    }

    #[test]
    fn test_connection_type_serializes_kebab_case() {
        let json = serde_json::to_string(&ConnectionType::CrossTestament).unwrap();
        assert_eq!(json, "\"cross-testament\"");
    }

    #[test]
    fn test_metadata_preserves_unknown_keys() {
        let json = r#"{"total_books": 66, "total_chapters": 1189, "total_connections": 10, "total_verse_refs": 344799}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.total_books, 66);
        assert_eq!(meta.is_preview, None);
        assert_eq!(meta.extra.get("total_verse_refs").unwrap(), 344799);

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["total_verse_refs"], 344799);
        assert!(back.get("is_preview").is_none());
    }

    #[test]
    fn test_chapter_label_defaults_to_empty() {
        let ch: Chapter =
            serde_json::from_str(r#"{"id": 3, "book": "Ruth", "chapter": 4, "testament": "OT"}"#)
                .unwrap();
        assert!(ch.label.is_empty());
    }

    #[test]
    fn test_connection_touches() {
        let c = Connection::new(4, 9, 1);
        assert!(c.touches(4));
        assert!(c.touches(9));
        assert!(!c.touches(5));
    }
}
