//! Statistics over a (possibly filtered) connection list.
//!
//! [`StatsAggregator::compute`] indexes the edge set first, then walks the
//! list once more; every aggregate is updated in that second pass, and the
//! per-book rankings are sorted afterwards. Ties always go to the entry
//! encountered first.

use crate::{Book, Connection, ConnectionStore, ConnectionType, Testament};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How many books each ranking keeps.
pub const TOP_BOOKS: usize = 5;

const GOSPELS: [&str; 4] = ["Matthew", "Mark", "Luke", "John"];

const PAULINE: [&str; 13] = [
    "Romans",
    "1 Corinthians",
    "2 Corinthians",
    "Galatians",
    "Ephesians",
    "Philippians",
    "Colossians",
    "1 Thessalonians",
    "2 Thessalonians",
    "1 Timothy",
    "2 Timothy",
    "Titus",
    "Philemon",
];

const TORAH: [&str; 5] = ["Genesis", "Exodus", "Leviticus", "Numbers", "Deuteronomy"];

/// Verse-level testament counts from the stats sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestamentDistribution {
    #[serde(rename = "OT_to_OT", default)]
    pub ot_to_ot: u64,
    #[serde(rename = "OT_to_NT", default)]
    pub ot_to_nt: u64,
    #[serde(rename = "NT_to_OT", default)]
    pub nt_to_ot: u64,
    #[serde(rename = "NT_to_NT", default)]
    pub nt_to_nt: u64,
}

/// The precomputed `stats.json` sidecar. Read-only; unknown keys are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSidecar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_verse_references: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testament_distribution: Option<TestamentDistribution>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One connection with its endpoints resolved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub source: u32,
    pub target: u32,
    pub source_label: String,
    pub target_label: String,
    pub weight: u32,
    /// Linear ordinal distance.
    pub distance: usize,
}

/// A chapter and its weighted degree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDegree {
    pub id: u32,
    pub label: String,
    /// Sum of the weights of every incident connection.
    pub degree: u64,
}

/// A book and a count attached to it by one of the rankings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCount {
    pub book: String,
    pub count: u64,
}

/// Connection counts per testament pairing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestamentBreakdown {
    pub ot_ot: usize,
    pub nt_nt: usize,
    pub cross: usize,
    pub ot_ot_pct: f64,
    pub nt_nt_pct: f64,
    pub cross_pct: f64,
}

/// Book and chapter totals for the whole canon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonSummary {
    pub ot_books: usize,
    pub nt_books: usize,
    pub ot_chapters: u64,
    pub nt_chapters: u64,
    pub total_chapters: usize,
    pub longest_book: Option<Book>,
    pub shortest_book: Option<Book>,
    /// Connections in the analysed list divided by chapter count.
    pub average_connections_per_chapter: f64,
    /// `OT_to_OT / ot_chapters²` as a percentage; needs the sidecar.
    pub ot_density: Option<f64>,
    /// `NT_to_NT / nt_chapters²` as a percentage; needs the sidecar.
    pub nt_density: Option<f64>,
}

/// Everything the statistics view shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsReport {
    pub total_connections: usize,
    pub total_weight: u64,
    pub chapters_with_connections: usize,
    pub most_connected_chapter: Option<ChapterDegree>,
    pub longest_connection: Option<ConnectionSummary>,
    pub shortest_connection: Option<ConnectionSummary>,
    pub strongest_connection: Option<ConnectionSummary>,
    pub average_distance: f64,
    pub reciprocal_connections: usize,
    /// Percentage of connections whose reverse is also in the list; in `[0, 100]`.
    /// Self-references never count.
    pub reciprocity_rate: f64,
    pub testament_breakdown: TestamentBreakdown,
    /// Books ranked by the summed weight of incident connections.
    pub top_books: Vec<BookCount>,
    /// Books ranked by connections with both endpoints inside the book.
    pub most_self_referencing_books: Vec<BookCount>,
    /// Books ranked by cross-testament connection endpoints.
    pub top_bridge_books: Vec<BookCount>,
    pub canon: CanonSummary,
    /// Connections between two gospels, keyed `"A-B"` with names sorted.
    pub gospel_connections: IndexMap<String, u64>,
    pub pauline_connections: u64,
    pub torah_connections: u64,
    /// Sidecar keys, merged into the top level when serialized.
    #[serde(flatten)]
    pub sidecar: Option<StatsSidecar>,
}

/// Computes a [`StatsReport`] for connections of one store.
///
/// # Examples
///
/// ```
/// use xref_graph::{Chapter, Connection, ConnectionStore, GraphData, StatsAggregator, Testament};
///
/// # fn main() -> xref_graph::Result<()> {
/// let store = ConnectionStore::load(GraphData {
///     chapters: vec![
///         Chapter::new(0, "Genesis", 1, Testament::OT),
///         Chapter::new(1, "Genesis", 2, Testament::OT),
///         Chapter::new(2, "Matthew", 1, Testament::NT),
///     ],
///     connections: vec![Connection::new(0, 2, 5), Connection::new(2, 0, 1)],
///     ..Default::default()
/// })?;
///
/// let report = StatsAggregator::new(&store).compute(store.connections());
/// assert_eq!(report.reciprocal_connections, 2);
/// assert_eq!(report.reciprocity_rate, 100.0);
/// assert_eq!(report.most_connected_chapter.unwrap().degree, 6);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StatsAggregator<'a> {
    store: &'a ConnectionStore,
    sidecar: Option<&'a StatsSidecar>,
}

impl<'a> StatsAggregator<'a> {
    /// Creates an aggregator without a sidecar.
    pub fn new(store: &'a ConnectionStore) -> Self {
        Self {
            store,
            sidecar: None,
        }
    }

    /// Attaches the precomputed sidecar.
    pub fn with_sidecar(mut self, sidecar: Option<&'a StatsSidecar>) -> Self {
        self.sidecar = sidecar;
        self
    }

    /// Computes the report. Connections whose endpoints are not in the store
    /// are ignored. An empty list gives a zeroed report.
    pub fn compute(&self, connections: &[Connection]) -> StatsReport {
        let store = self.store;
        let mut report = StatsReport::default();

        let mut degree: IndexMap<u32, u64> = IndexMap::new();
        let mut incident: IndexMap<usize, u64> = IndexMap::new();
        let mut self_refs: IndexMap<usize, u64> = IndexMap::new();
        let mut bridges: IndexMap<usize, u64> = IndexMap::new();
        let edges: HashSet<(u32, u32)> =
            connections.iter().map(|c| (c.source, c.target)).collect();

        let mut longest: Option<(usize, Connection)> = None;
        let mut shortest: Option<(usize, Connection)> = None;
        let mut strongest: Option<Connection> = None;
        let mut distance_sum = 0u64;

        for conn in connections {
            let (Some(sp), Some(tp)) = (store.position(conn.source), store.position(conn.target))
            else {
                continue;
            };
            let chapters = store.chapters();
            let (src, tgt) = (&chapters[sp], &chapters[tp]);
            let (Some(sb), Some(tb)) = (store.book_of(conn.source), store.book_of(conn.target))
            else {
                continue;
            };
            let weight = u64::from(conn.weight);
            let distance = sp.abs_diff(tp);

            report.total_connections += 1;
            report.total_weight += weight;
            distance_sum += distance as u64;

            *degree.entry(conn.source).or_default() += weight;
            *degree.entry(conn.target).or_default() += weight;

            *incident.entry(sb).or_default() += weight;
            if tb != sb {
                *incident.entry(tb).or_default() += weight;
            }

            if longest.map_or(true, |(d, _)| distance > d) {
                longest = Some((distance, *conn));
            }
            if distance > 0 && shortest.map_or(true, |(d, _)| distance < d) {
                shortest = Some((distance, *conn));
            }
            if strongest.map_or(true, |s| conn.weight > s.weight) {
                strongest = Some(*conn);
            }

            match ConnectionType::classify(src.testament, tgt.testament) {
                ConnectionType::OtOt => report.testament_breakdown.ot_ot += 1,
                ConnectionType::NtNt => report.testament_breakdown.nt_nt += 1,
                ConnectionType::CrossTestament => {
                    report.testament_breakdown.cross += 1;
                    *bridges.entry(sb).or_default() += 1;
                    *bridges.entry(tb).or_default() += 1;
                }
            }

            if sb == tb {
                *self_refs.entry(sb).or_default() += 1;
            }

            if conn.source != conn.target && edges.contains(&(conn.target, conn.source)) {
                report.reciprocal_connections += 1;
            }

            let (a, b) = (src.book.as_str(), tgt.book.as_str());
            if GOSPELS.contains(&a) && GOSPELS.contains(&b) {
                let key = if a <= b {
                    format!("{}-{}", a, b)
                } else {
                    format!("{}-{}", b, a)
                };
                *report.gospel_connections.entry(key).or_default() += 1;
            }
            if PAULINE.contains(&a) && PAULINE.contains(&b) {
                report.pauline_connections += 1;
            }
            if TORAH.contains(&a) && TORAH.contains(&b) {
                report.torah_connections += 1;
            }
        }

        let n = report.total_connections;
        report.chapters_with_connections = degree.len();
        report.most_connected_chapter = first_max(&degree).and_then(|(id, degree)| {
            store.chapter(id).map(|ch| ChapterDegree {
                id,
                label: ch.label.clone(),
                degree,
            })
        });
        report.longest_connection = longest.and_then(|(_, c)| self.summarize(&c));
        report.shortest_connection = shortest.and_then(|(_, c)| self.summarize(&c));
        report.strongest_connection = strongest.and_then(|c| self.summarize(&c));
        if n > 0 {
            report.average_distance = distance_sum as f64 / n as f64;
            report.reciprocity_rate = report.reciprocal_connections as f64 / n as f64 * 100.0;
            let b = &mut report.testament_breakdown;
            b.ot_ot_pct = percent(b.ot_ot, n);
            b.nt_nt_pct = percent(b.nt_nt, n);
            b.cross_pct = percent(b.cross, n);
        }

        report.top_books = self.ranked(incident);
        report.most_self_referencing_books = self.ranked(self_refs);
        report.top_bridge_books = self.ranked(bridges);
        report.canon = self.canon_summary(n);
        report.sidecar = self.sidecar.cloned();
        report
    }

    fn summarize(&self, conn: &Connection) -> Option<ConnectionSummary> {
        let source = self.store.chapter(conn.source)?;
        let target = self.store.chapter(conn.target)?;
        Some(ConnectionSummary {
            source: conn.source,
            target: conn.target,
            source_label: source.label.clone(),
            target_label: target.label.clone(),
            weight: conn.weight,
            distance: self.store.linear_distance(conn).ok()?,
        })
    }

    fn ranked(&self, counts: IndexMap<usize, u64>) -> Vec<BookCount> {
        let mut entries: Vec<(usize, u64)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries
            .into_iter()
            .take(TOP_BOOKS)
            .filter_map(|(idx, count)| {
                self.store.books().get(idx).map(|b| BookCount {
                    book: b.name.clone(),
                    count,
                })
            })
            .collect()
    }

    fn canon_summary(&self, connections: usize) -> CanonSummary {
        let books = self.store.books();
        let mut canon = CanonSummary {
            total_chapters: self.store.chapter_count(),
            ..Default::default()
        };
        for book in books {
            match book.testament {
                Testament::OT => {
                    canon.ot_books += 1;
                    canon.ot_chapters += u64::from(book.chapters);
                }
                Testament::NT => {
                    canon.nt_books += 1;
                    canon.nt_chapters += u64::from(book.chapters);
                }
            }
            if canon
                .longest_book
                .as_ref()
                .map_or(true, |b| book.chapters > b.chapters)
            {
                canon.longest_book = Some(book.clone());
            }
            if canon
                .shortest_book
                .as_ref()
                .map_or(true, |b| book.chapters < b.chapters)
            {
                canon.shortest_book = Some(book.clone());
            }
        }
        if canon.total_chapters > 0 {
            canon.average_connections_per_chapter =
                connections as f64 / canon.total_chapters as f64;
        }
        if let Some(dist) = self.sidecar.and_then(|s| s.testament_distribution.as_ref()) {
            canon.ot_density = density(dist.ot_to_ot, canon.ot_chapters);
            canon.nt_density = density(dist.nt_to_nt, canon.nt_chapters);
        }
        canon
    }
}

/// First entry holding the maximum value.
fn first_max(map: &IndexMap<u32, u64>) -> Option<(u32, u64)> {
    let mut best: Option<(u32, u64)> = None;
    for (&k, &v) in map {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((k, v));
        }
    }
    best
}

fn percent(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64 * 100.0
}

fn density(count: u64, chapters: u64) -> Option<f64> {
    if chapters == 0 {
        return None;
    }
    Some(count as f64 / (chapters * chapters) as f64 * 100.0)
}
