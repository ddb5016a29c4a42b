//! Book-level aggregation of connection weights.

use serde::{Deserialize, Serialize};

/// Square book-by-book weight matrix.
///
/// `cells[i][j]` is the summed weight of every connection whose source
/// chapter belongs to `books[i]` and whose target chapter belongs to
/// `books[j]`. Each connection lands in exactly one cell, so the matrix total
/// equals the total connection weight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMatrix {
    /// Row/column labels, in canonical book order.
    pub books: Vec<String>,
    /// Row-major cell values.
    pub cells: Vec<Vec<u64>>,
}

impl BookMatrix {
    /// Creates a zero matrix with one row and column per book.
    pub fn zeros(books: Vec<String>) -> Self {
        let n = books.len();
        Self {
            books,
            cells: vec![vec![0; n]; n],
        }
    }

    /// Builds a matrix from `(source_book, target_book, weight)` triples.
    ///
    /// Out-of-range book indices are skipped.
    ///
    /// ```
    /// use xref_graph::BookMatrix;
    ///
    /// let names = vec!["Genesis".to_string(), "Matthew".to_string()];
    /// let m = BookMatrix::build(names, [(0, 1, 5), (0, 0, 3), (0, 1, 2)]);
    /// assert_eq!(m.get(0, 1), 7);
    /// assert_eq!(m.total(), 10);
    /// ```
    pub fn build<I>(books: Vec<String>, edges: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, u32)>,
    {
        let mut matrix = Self::zeros(books);
        let n = matrix.size();
        for (i, j, weight) in edges {
            if i < n && j < n {
                matrix.cells[i][j] += u64::from(weight);
            }
        }
        matrix
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.books.len()
    }

    /// Returns the cell value, or 0 when out of range.
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all cells.
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    /// Sum of one row (outgoing weight of a book).
    pub fn row_total(&self, row: usize) -> u64 {
        self.cells.get(row).map(|r| r.iter().sum()).unwrap_or(0)
    }

    /// Restricts rows and columns to the given book indices, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        let books = indices
            .iter()
            .filter_map(|&i| self.books.get(i).cloned())
            .collect();
        let cells = indices
            .iter()
            .filter(|&&i| i < self.size())
            .map(|&i| {
                indices
                    .iter()
                    .filter(|&&j| j < self.size())
                    .map(|&j| self.cells[i][j])
                    .collect()
            })
            .collect();
        Self { books, cells }
    }

    /// Returns a copy with every cell below `min` set to zero.
    pub fn thresholded(&self, min: u64) -> Self {
        let cells = self
            .cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&v| if v >= min { v } else { 0 })
                    .collect()
            })
            .collect();
        Self {
            books: self.books.clone(),
            cells,
        }
    }

    /// Returns `true` if every cell is zero.
    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|&v| v == 0)
    }
}
