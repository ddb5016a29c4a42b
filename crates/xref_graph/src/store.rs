//! The Graph/Connection Store.
//!
//! A [`ConnectionStore`] owns the chapter list, the connection list and the
//! derived book matrix. It is built once by [`ConnectionStore::load`] and is
//! immutable afterwards, so it can be shared behind an `Arc` by any number of
//! readers.
//!
//! Chapter ids are resolved through an explicit id → position map. Nothing in
//! this crate treats an id as an array offset.

use crate::filter::{narrow_by_weight, top_by_weight};
use crate::{
    Book, BookMatrix, Chapter, Connection, ConnectionType, Error, FilterState, GraphData,
    Metadata, Result, Testament, TestamentFilter,
};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;
use std::io::Read;

/// The read-only chapter/connection graph.
///
/// # Examples
///
/// ```
/// use xref_graph::{Chapter, Connection, ConnectionStore, GraphData, Testament, TestamentFilter};
///
/// # fn main() -> xref_graph::Result<()> {
/// let data = GraphData {
///     chapters: vec![
///         Chapter::new(0, "Genesis", 1, Testament::OT),
///         Chapter::new(1, "Genesis", 2, Testament::OT),
///         Chapter::new(2, "Matthew", 1, Testament::NT),
///     ],
///     connections: vec![Connection::new(0, 2, 5), Connection::new(0, 1, 3)],
///     ..Default::default()
/// };
///
/// let store = ConnectionStore::load(data)?;
/// assert_eq!(store.filter_by_testament(TestamentFilter::Cross), vec![Connection::new(0, 2, 5)]);
/// assert_eq!(store.filter_by_weight(4).len(), 1);
/// assert_eq!(store.filter_by_book("Genesis").len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionStore {
    metadata: Metadata,
    books: Vec<Book>,
    book_positions: HashMap<String, usize>,
    chapters: Vec<Chapter>,
    /// Book index of each chapter, parallel to `chapters`.
    chapter_books: Vec<usize>,
    positions: HashMap<u32, usize>,
    connections: Vec<Connection>,
    book_matrix: BookMatrix,
}

impl ConnectionStore {
    /// Builds a store from a deserialized dataset.
    ///
    /// Fails with [`Error::DataFormat`] when a connection references an
    /// unknown chapter id, a weight is zero, a chapter id is duplicated, or a
    /// chapter names a book missing from a non-empty `books` list. No partial
    /// store is produced. Self-loops are dropped with a warning.
    pub fn load(data: GraphData) -> Result<Self> {
        let GraphData {
            mut metadata,
            books,
            mut chapters,
            connections,
            book_matrix,
        } = data;

        let mut positions = HashMap::with_capacity(chapters.len());
        for (pos, chapter) in chapters.iter_mut().enumerate() {
            if positions.insert(chapter.id, pos).is_some() {
                return Err(Error::DataFormat(format!(
                    "duplicate chapter id {}",
                    chapter.id
                )));
            }
            if chapter.label.is_empty() {
                chapter.label = format!("{} {}", chapter.book, chapter.chapter);
            }
        }

        let books = if books.is_empty() {
            derive_books(&chapters)
        } else {
            books
        };

        let mut book_positions = HashMap::with_capacity(books.len());
        for (i, book) in books.iter().enumerate() {
            if book_positions.insert(book.name.clone(), i).is_some() {
                return Err(Error::DataFormat(format!("duplicate book '{}'", book.name)));
            }
        }

        let chapter_books = chapters
            .iter()
            .map(|ch| {
                book_positions.get(&ch.book).copied().ok_or_else(|| {
                    Error::DataFormat(format!(
                        "chapter {} belongs to unknown book '{}'",
                        ch.id, ch.book
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut kept = Vec::with_capacity(connections.len());
        let mut self_loops = 0usize;
        for (i, conn) in connections.into_iter().enumerate() {
            for id in [conn.source, conn.target] {
                if !positions.contains_key(&id) {
                    return Err(Error::DataFormat(format!(
                        "connection {} references unknown chapter id {}",
                        i, id
                    )));
                }
            }
            if conn.weight == 0 {
                return Err(Error::DataFormat(format!(
                    "connection {} ({} -> {}) has zero weight",
                    i, conn.source, conn.target
                )));
            }
            if conn.source == conn.target {
                self_loops += 1;
                continue;
            }
            kept.push(conn);
        }
        if self_loops > 0 {
            warn!("Dropped {} self-referencing connections", self_loops);
        }

        let mut store = Self {
            metadata: Metadata::default(),
            books,
            book_positions,
            chapters,
            chapter_books,
            positions,
            connections: kept,
            book_matrix: BookMatrix::default(),
        };
        store.book_matrix = store.build_book_matrix(&store.connections);

        if !book_matrix.is_empty() && book_matrix != store.book_matrix.cells {
            warn!(
                "Serialized book matrix disagrees with connections (total {} vs {}); using recomputed matrix",
                book_matrix.iter().flatten().sum::<u64>(),
                store.book_matrix.total()
            );
        }

        if metadata.total_connections != 0 && metadata.total_connections != store.connections.len()
        {
            debug!(
                "Metadata reports {} connections, {} resident",
                metadata.total_connections,
                store.connections.len()
            );
        }
        metadata.total_books = store.books.len();
        metadata.total_chapters = store.chapters.len();
        if metadata.total_connections == 0 {
            metadata.total_connections = store.connections.len();
        }
        store.metadata = metadata;

        debug!(
            "Loaded graph: {} books, {} chapters, {} connections",
            store.books.len(),
            store.chapters.len(),
            store.connections.len()
        );
        Ok(store)
    }

    /// Parses and loads a dataset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::load(serde_json::from_str(json)?)
    }

    /// Parses and loads a dataset from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::load(serde_json::from_slice(bytes)?)
    }

    /// Parses and loads a dataset from a reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::load(serde_json::from_reader(reader)?)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Dataset metadata, with chapter and book totals set to the resident counts.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Returns `true` if this store was loaded from a preview dataset.
    pub fn is_preview(&self) -> bool {
        self.metadata.is_preview.unwrap_or(false)
    }

    /// Books in canonical order.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Chapters in canonical order.
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// The full connection list, in input order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of chapters.
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// The book matrix, rebuilt from the connection list at load time.
    pub fn book_matrix(&self) -> &BookMatrix {
        &self.book_matrix
    }

    /// Looks up a chapter by id in O(1).
    pub fn chapter(&self, id: u32) -> Option<&Chapter> {
        self.positions.get(&id).map(|&pos| &self.chapters[pos])
    }

    /// Ordinal position of a chapter in canonical order.
    pub fn position(&self, id: u32) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Like [`position`](Self::position) but fails with [`Error::UnknownChapter`].
    pub fn position_of(&self, id: u32) -> Result<usize> {
        self.position(id).ok_or(Error::UnknownChapter(id))
    }

    /// Index of a book in canonical order.
    pub fn book_index(&self, name: &str) -> Option<usize> {
        self.book_positions.get(name).copied()
    }

    /// Looks up a book by name.
    pub fn book(&self, name: &str) -> Option<&Book> {
        self.book_index(name).map(|i| &self.books[i])
    }

    /// Book index of the chapter with the given id.
    pub fn book_of(&self, id: u32) -> Option<usize> {
        self.position(id).map(|pos| self.chapter_books[pos])
    }

    /// Testament of the chapter with the given id.
    pub fn testament_of(&self, id: u32) -> Option<Testament> {
        self.chapter(id).map(|ch| ch.testament)
    }

    /// Chapters belonging to a book, in canonical order.
    pub fn chapters_of_book(&self, name: &str) -> Result<Vec<&Chapter>> {
        let book = self
            .book_index(name)
            .ok_or_else(|| Error::UnknownBook(name.to_string()))?;
        Ok(self
            .chapters
            .iter()
            .zip(&self.chapter_books)
            .filter(|(_, b)| **b == book)
            .map(|(ch, _)| ch)
            .collect())
    }

    // ------------------------------------------------------------------
    // Filters
    // ------------------------------------------------------------------

    /// Connections passing the testament mode. O(n).
    pub fn filter_by_testament(&self, testament: TestamentFilter) -> Vec<Connection> {
        self.narrow_by_testament(&self.connections, testament)
    }

    /// Connections with either endpoint in the named book. O(n).
    ///
    /// A blank name restricts nothing; an unknown book yields an empty list.
    pub fn filter_by_book(&self, book: &str) -> Vec<Connection> {
        self.narrow_by_book(&self.connections, book)
    }

    /// Connections with `weight >= min_weight`. O(n).
    pub fn filter_by_weight(&self, min_weight: u32) -> Vec<Connection> {
        narrow_by_weight(&self.connections, min_weight)
    }

    /// Applies testament, book and weight constraints with AND semantics in a
    /// single pass. The result preserves input order and is a pure function of
    /// the store contents and `filter`.
    pub fn combined_filter(&self, filter: &FilterState) -> Vec<Connection> {
        let book = match filter.book_filter() {
            Some(name) => match self.book_index(name) {
                Some(idx) => Some(idx),
                None => return Vec::new(),
            },
            None => None,
        };
        let min = filter.min_connections.max(1);

        let result: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.weight >= min)
            .filter(|c| book.map_or(true, |b| self.touches_book(c, b)))
            .filter(|c| self.passes_testament(c, filter.testament))
            .copied()
            .collect();

        debug!(
            "Filter {}/{:?}/{} kept {} of {} connections",
            filter.testament,
            filter.book_filter(),
            min,
            result.len(),
            self.connections.len()
        );
        result
    }

    /// Testament filter over an arbitrary connection list.
    ///
    /// Connections with an endpoint outside this store never pass.
    pub fn narrow_by_testament(
        &self,
        connections: &[Connection],
        testament: TestamentFilter,
    ) -> Vec<Connection> {
        connections
            .iter()
            .filter(|c| self.passes_testament(c, testament))
            .copied()
            .collect()
    }

    /// Book filter over an arbitrary connection list.
    pub fn narrow_by_book(&self, connections: &[Connection], book: &str) -> Vec<Connection> {
        let book = book.trim();
        if book.is_empty() {
            return connections.to_vec();
        }
        let Some(idx) = self.book_index(book) else {
            return Vec::new();
        };
        connections
            .iter()
            .filter(|c| self.touches_book(c, idx))
            .copied()
            .collect()
    }

    /// Connections touching a book; fails with [`Error::UnknownBook`].
    pub fn book_connections(&self, book: &str) -> Result<Vec<Connection>> {
        if self.book_index(book).is_none() {
            return Err(Error::UnknownBook(book.to_string()));
        }
        Ok(self.filter_by_book(book))
    }

    /// Connections touching a chapter; fails with [`Error::UnknownChapter`].
    pub fn connections_for_chapter(&self, id: u32) -> Result<Vec<Connection>> {
        self.position_of(id)?;
        Ok(self
            .connections
            .iter()
            .filter(|c| c.touches(id))
            .copied()
            .collect())
    }

    fn passes_testament(&self, conn: &Connection, testament: TestamentFilter) -> bool {
        if testament == TestamentFilter::All {
            return true;
        }
        match (self.testament_of(conn.source), self.testament_of(conn.target)) {
            (Some(s), Some(t)) => testament.accepts(s, t),
            _ => false,
        }
    }

    fn touches_book(&self, conn: &Connection, book: usize) -> bool {
        self.book_of(conn.source) == Some(book) || self.book_of(conn.target) == Some(book)
    }

    // ------------------------------------------------------------------
    // Derived quantities
    // ------------------------------------------------------------------

    /// `|pos(target) - pos(source)|` over canonical positions.
    pub fn linear_distance(&self, conn: &Connection) -> Result<usize> {
        let s = self.position_of(conn.source)?;
        let t = self.position_of(conn.target)?;
        Ok(s.abs_diff(t))
    }

    /// Linear distance with wrap-around: `min(d, total_chapters - d)`.
    pub fn circular_distance(&self, conn: &Connection) -> Result<usize> {
        let d = self.linear_distance(conn)?;
        Ok(d.min(self.chapters.len() - d))
    }

    /// Styling class of a connection.
    pub fn connection_type(&self, conn: &Connection) -> Result<ConnectionType> {
        let s = self
            .testament_of(conn.source)
            .ok_or(Error::UnknownChapter(conn.source))?;
        let t = self
            .testament_of(conn.target)
            .ok_or(Error::UnknownChapter(conn.target))?;
        Ok(ConnectionType::classify(s, t))
    }

    /// Builds a book matrix over an arbitrary connection list.
    ///
    /// Identical inputs always produce identical matrices.
    pub fn build_book_matrix(&self, connections: &[Connection]) -> BookMatrix {
        let names = self.books.iter().map(|b| b.name.clone()).collect();
        BookMatrix::build(
            names,
            connections.iter().filter_map(|c| {
                Some((self.book_of(c.source)?, self.book_of(c.target)?, c.weight))
            }),
        )
    }

    /// The book matrix restricted to one testament's books for `OT`/`NT`,
    /// or the full matrix for `all`/`cross`.
    pub fn book_matrix_for(&self, testament: TestamentFilter) -> BookMatrix {
        match testament.testament() {
            Some(t) => {
                let indices: Vec<usize> = self
                    .books
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| b.testament == t)
                    .map(|(i, _)| i)
                    .collect();
                self.book_matrix.subset(&indices)
            }
            None => self.book_matrix.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Derived datasets
    // ------------------------------------------------------------------

    /// A dataset holding all chapters and books with the given connections.
    ///
    /// The book matrix is the full one; metadata is copied unchanged.
    pub fn subset(&self, connections: Vec<Connection>) -> GraphData {
        GraphData {
            metadata: self.metadata.clone(),
            books: self.books.clone(),
            chapters: self.chapters.clone(),
            connections,
            book_matrix: self.book_matrix.cells.clone(),
        }
    }

    /// A preview dataset holding the `n` heaviest connections.
    ///
    /// Metadata keeps the full `total_connections`, sets `is_preview` and
    /// records `preview_connections`. The book matrix covers only the kept
    /// connections so the preview reloads without warnings.
    pub fn preview(&self, n: usize) -> GraphData {
        let connections = top_by_weight(&self.connections, n);
        let mut metadata = self.metadata.clone();
        metadata.is_preview = Some(true);
        metadata
            .extra
            .insert("preview_connections".into(), connections.len().into());
        let book_matrix = self.build_book_matrix(&connections).cells;
        GraphData {
            metadata,
            books: self.books.clone(),
            chapters: self.chapters.clone(),
            connections,
            book_matrix,
        }
    }
}

/// Derives books from the chapter list in first-appearance order.
fn derive_books(chapters: &[Chapter]) -> Vec<Book> {
    let mut books: IndexMap<&str, Book> = IndexMap::new();
    for ch in chapters {
        books
            .entry(ch.book.as_str())
            .or_insert_with(|| Book {
                name: ch.book.clone(),
                testament: ch.testament,
                chapters: 0,
            })
            .chapters += 1;
    }
    books.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphData {
        GraphData {
            chapters: vec![
                Chapter::new(0, "Genesis", 1, Testament::OT),
                Chapter::new(1, "Genesis", 2, Testament::OT),
                Chapter::new(2, "Matthew", 1, Testament::NT),
            ],
            connections: vec![Connection::new(0, 2, 5), Connection::new(0, 1, 3)],
            ..Default::default()
        }
    }

    #[test]
    fn test_load_derives_books() {
        let store = ConnectionStore::load(sample()).unwrap();
        assert_eq!(store.books().len(), 2);
        assert_eq!(store.books()[0].name, "Genesis");
        assert_eq!(store.books()[0].chapters, 2);
        assert_eq!(store.books()[1].testament, Testament::NT);
        assert_eq!(store.metadata().total_chapters, 3);
        assert_eq!(store.metadata().total_connections, 2);
    }

    #[test]
    fn test_load_rejects_unknown_chapter() {
        let mut data = sample();
        data.connections.push(Connection::new(1, 99, 1));
        let err = ConnectionStore::load(data).unwrap_err();
        assert!(matches!(err, Error::DataFormat(ref m) if m.contains("99")));
    }

    #[test]
    fn test_load_rejects_zero_weight() {
        let mut data = sample();
        data.connections.push(Connection::new(1, 2, 0));
        assert!(matches!(
            ConnectionStore::load(data),
            Err(Error::DataFormat(_))
        ));
    }

    #[test]
    fn test_load_rejects_duplicate_chapter_id() {
        let mut data = sample();
        data.chapters.push(Chapter::new(2, "Matthew", 2, Testament::NT));
        assert!(matches!(
            ConnectionStore::load(data),
            Err(Error::DataFormat(_))
        ));
    }

    #[test]
    fn test_load_rejects_chapter_of_unlisted_book() {
        let mut data = sample();
        data.books = vec![Book {
            name: "Genesis".into(),
            testament: Testament::OT,
            chapters: 2,
        }];
        assert!(matches!(
            ConnectionStore::load(data),
            Err(Error::DataFormat(ref m)) if m.contains("Matthew")
        ));
    }

    #[test]
    fn test_load_drops_self_loops() {
        let mut data = sample();
        data.connections.push(Connection::new(1, 1, 4));
        let store = ConnectionStore::load(data).unwrap();
        assert_eq!(store.connections().len(), 2);
    }

    #[test]
    fn test_lookup_does_not_assume_id_is_offset() {
        let data = GraphData {
            chapters: vec![
                Chapter::new(100, "Ruth", 1, Testament::OT),
                Chapter::new(7, "Ruth", 2, Testament::OT),
                Chapter::new(42, "Jude", 1, Testament::NT),
            ],
            connections: vec![Connection::new(100, 42, 2)],
            ..Default::default()
        };
        let store = ConnectionStore::load(data).unwrap();
        assert_eq!(store.position(7), Some(1));
        assert_eq!(store.chapter(42).unwrap().label, "Jude 1");
        assert_eq!(store.linear_distance(&Connection::new(100, 42, 2)).unwrap(), 2);
        assert_eq!(store.circular_distance(&Connection::new(100, 42, 2)).unwrap(), 1);
        assert!(matches!(store.position_of(0), Err(Error::UnknownChapter(0))));
    }

    #[test]
    fn test_combined_filter_and_semantics() {
        let store = ConnectionStore::load(sample()).unwrap();

        let f = FilterState::new()
            .with_testament(TestamentFilter::OT)
            .with_book("Genesis");
        assert_eq!(store.combined_filter(&f), vec![Connection::new(0, 1, 3)]);

        let f = FilterState::new()
            .with_book("Matthew")
            .with_min_connections(4);
        assert_eq!(store.combined_filter(&f), vec![Connection::new(0, 2, 5)]);

        let f = FilterState::new().with_book("Leviticus");
        assert!(store.combined_filter(&f).is_empty());
    }

    #[test]
    fn test_connections_for_chapter() {
        let store = ConnectionStore::load(sample()).unwrap();
        assert_eq!(store.connections_for_chapter(2).unwrap().len(), 1);
        assert_eq!(store.connections_for_chapter(0).unwrap().len(), 2);
        assert!(matches!(
            store.connections_for_chapter(3),
            Err(Error::UnknownChapter(3))
        ));
    }

    #[test]
    fn test_book_connections_unknown_book() {
        let store = ConnectionStore::load(sample()).unwrap();
        assert!(matches!(
            store.book_connections("Tobit"),
            Err(Error::UnknownBook(_))
        ));
        assert!(store.filter_by_book("Tobit").is_empty());
    }

    #[test]
    fn test_blank_book_keeps_everything() {
        let store = ConnectionStore::load(sample()).unwrap();
        assert_eq!(store.filter_by_book(""), store.connections());
        assert_eq!(store.filter_by_book("  "), store.connections());
        assert_eq!(
            store.filter_by_book(""),
            store.combined_filter(&FilterState::new().with_book(""))
        );
        let heavy = store.filter_by_weight(3);
        assert_eq!(store.narrow_by_book(&heavy, ""), heavy);
    }

    #[test]
    fn test_book_matrix_rebuilt_from_connections() {
        let mut data = sample();
        data.book_matrix = vec![vec![100, 100], vec![100, 100]];
        let store = ConnectionStore::load(data).unwrap();
        assert_eq!(store.book_matrix().cells, vec![vec![3, 5], vec![0, 0]]);

        let ot = store.book_matrix_for(TestamentFilter::OT);
        assert_eq!(ot.books, vec!["Genesis".to_string()]);
        assert_eq!(ot.cells, vec![vec![3]]);
    }

    #[test]
    fn test_connection_type() {
        let store = ConnectionStore::load(sample()).unwrap();
        assert_eq!(
            store.connection_type(&Connection::new(0, 2, 1)).unwrap(),
            ConnectionType::CrossTestament
        );
        assert_eq!(
            store.connection_type(&Connection::new(0, 1, 1)).unwrap(),
            ConnectionType::OtOt
        );
    }

    #[test]
    fn test_preview_keeps_heaviest() {
        let store = ConnectionStore::load(sample()).unwrap();
        let preview = store.preview(1);
        assert_eq!(preview.connections, vec![Connection::new(0, 2, 5)]);
        assert_eq!(preview.metadata.is_preview, Some(true));
        assert_eq!(preview.metadata.extra["preview_connections"], 1);
        assert_eq!(preview.metadata.total_connections, 2);

        let reloaded = ConnectionStore::load(preview).unwrap();
        assert!(reloaded.is_preview());
        assert_eq!(reloaded.chapters().len(), 3);
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "metadata": {"total_books": 2},
            "chapters": [
                {"id": 0, "book": "Genesis", "chapter": 1, "testament": "OT", "label": "Gen 1"},
                {"id": 1, "book": "Matthew", "chapter": 1, "testament": "NT"}
            ],
            "connections": [{"source": 1, "target": 0, "weight": 2, "distance": 1}]
        }"#;
        let store = ConnectionStore::from_json(json).unwrap();
        assert_eq!(store.chapter(0).unwrap().label, "Gen 1");
        assert_eq!(store.chapter(1).unwrap().label, "Matthew 1");
        assert_eq!(store.connections().len(), 1);
    }
}
