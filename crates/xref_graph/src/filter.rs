//! The active view filter and list-level filter helpers.
//!
//! A [`FilterState`] is a plain value. Applying it to a graph is the job of
//! [`ConnectionStore::combined_filter`](crate::ConnectionStore::combined_filter);
//! this module only holds the state and the helpers that need no chapter
//! lookups.

use crate::{Connection, Error, Result, Testament};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Testament mode of a [`FilterState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TestamentFilter {
    /// No testament restriction.
    #[default]
    #[serde(rename = "all")]
    All,
    /// Both endpoints in the Old Testament.
    #[serde(rename = "OT")]
    OT,
    /// Both endpoints in the New Testament.
    #[serde(rename = "NT")]
    NT,
    /// Endpoints in different testaments.
    #[serde(rename = "cross")]
    Cross,
}

impl TestamentFilter {
    /// Returns `true` if an edge between chapters of the given testaments
    /// passes this filter.
    ///
    /// ```
    /// use xref_graph::{Testament, TestamentFilter};
    ///
    /// assert!(TestamentFilter::Cross.accepts(Testament::OT, Testament::NT));
    /// assert!(!TestamentFilter::OT.accepts(Testament::OT, Testament::NT));
    /// assert!(TestamentFilter::All.accepts(Testament::NT, Testament::NT));
    /// ```
    pub fn accepts(&self, source: Testament, target: Testament) -> bool {
        match self {
            TestamentFilter::All => true,
            TestamentFilter::OT => source == Testament::OT && target == Testament::OT,
            TestamentFilter::NT => source == Testament::NT && target == Testament::NT,
            TestamentFilter::Cross => source != target,
        }
    }

    /// Returns the single testament this mode restricts to, if any.
    pub fn testament(&self) -> Option<Testament> {
        match self {
            TestamentFilter::OT => Some(Testament::OT),
            TestamentFilter::NT => Some(Testament::NT),
            _ => None,
        }
    }

    /// Returns the wire name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TestamentFilter::All => "all",
            TestamentFilter::OT => "OT",
            TestamentFilter::NT => "NT",
            TestamentFilter::Cross => "cross",
        }
    }
}

impl fmt::Display for TestamentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestamentFilter {
    type Err = Error;

    /// Parses a testament mode. Matching is case-insensitive and an empty
    /// string means `all`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(TestamentFilter::All),
            "ot" => Ok(TestamentFilter::OT),
            "nt" => Ok(TestamentFilter::NT),
            "cross" => Ok(TestamentFilter::Cross),
            _ => Err(Error::InvalidFilter(format!("testament '{}'", s))),
        }
    }
}

fn default_min_connections() -> u32 {
    1
}

/// The active view filter: testament mode, optional book and minimum weight.
///
/// All three constraints are combined with AND semantics. An empty `book`
/// means "any book". `min_connections` is never below 1.
///
/// # Examples
///
/// ```
/// use xref_graph::{FilterState, TestamentFilter};
///
/// let filter = FilterState::new()
///     .with_testament(TestamentFilter::Cross)
///     .with_min_connections(0);
///
/// assert_eq!(filter.min_connections, 1);
/// assert!(filter.book_filter().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    /// Testament mode.
    #[serde(default)]
    pub testament: TestamentFilter,
    /// Book name, or empty for no book restriction.
    #[serde(default)]
    pub book: String,
    /// Minimum connection weight (inclusive).
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            testament: TestamentFilter::All,
            book: String::new(),
            min_connections: 1,
        }
    }
}

impl FilterState {
    /// Creates an unrestricted filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the testament mode.
    pub fn with_testament(mut self, testament: TestamentFilter) -> Self {
        self.testament = testament;
        self
    }

    /// Sets the book restriction. Pass an empty string to clear it.
    pub fn with_book(mut self, book: impl Into<String>) -> Self {
        self.book = book.into();
        self
    }

    /// Sets the minimum weight, clamped to at least 1.
    pub fn with_min_connections(mut self, min: u32) -> Self {
        self.min_connections = min.max(1);
        self
    }

    /// Returns the book restriction, or `None` when any book passes.
    pub fn book_filter(&self) -> Option<&str> {
        let book = self.book.trim();
        if book.is_empty() {
            None
        } else {
            Some(book)
        }
    }

    /// Returns `true` if this filter lets every connection through.
    pub fn is_unfiltered(&self) -> bool {
        self.testament == TestamentFilter::All
            && self.book_filter().is_none()
            && self.min_connections <= 1
    }
}

/// Keeps the connections with `weight >= min_weight`, preserving order.
///
/// ```
/// use xref_graph::{filter::narrow_by_weight, Connection};
///
/// let conns = [Connection::new(0, 1, 3), Connection::new(0, 2, 5)];
/// assert_eq!(narrow_by_weight(&conns, 4), vec![Connection::new(0, 2, 5)]);
/// ```
pub fn narrow_by_weight(connections: &[Connection], min_weight: u32) -> Vec<Connection> {
    connections
        .iter()
        .filter(|c| c.weight >= min_weight)
        .copied()
        .collect()
}

/// Returns the `n` heaviest connections, ordered by descending weight.
///
/// The sort is stable, so equal weights keep their input order.
pub fn top_by_weight(connections: &[Connection], n: usize) -> Vec<Connection> {
    let mut sorted = connections.to_vec();
    sorted.sort_by(|a, b| b.weight.cmp(&a.weight));
    sorted.truncate(n);
    sorted
}
