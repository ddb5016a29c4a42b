//! Visualizations over a loaded dataset.
//!
//! Every chart implements [`Visualization`]: given the resident [`Dataset`]
//! and the active [`FilterState`] it produces a serializable [`RenderResult`].
//! Views never touch the filter or cache state themselves; the
//! [`Session`](crate::Session) decides when to call them.
//!
//! | View           | Input                       | Cap                  |
//! |----------------|-----------------------------|----------------------|
//! | [`ArcDiagram`] | combined filter             | first 50 000 arcs    |
//! | [`RadialArc`]  | combined filter             | 3 000 heaviest edges |
//! | [`ChordDiagram`] | book matrix               | none                 |
//! | [`StatsView`]  | combined filter             | none                 |

use crate::error::Result;
use crate::loader::Dataset;

use log::debug;
use serde::Serialize;
use xref_graph::filter::top_by_weight;
use xref_graph::{
    angle_scale, generate_radial_path, radial_point, radial_stroke_width, ArcGenerator, ArcLayout,
    ArcPath, BookMatrix, ConnectionType, FilterState, StatsAggregator, StatsReport, Testament,
    TestamentFilter,
};

/// Maximum number of arcs the arc diagram draws.
pub const MAX_ARCS: usize = 50_000;
/// Maximum number of edges the radial view draws.
pub const MAX_RADIAL_CONNECTIONS: usize = 3_000;

/// A chart that can be rendered from a dataset and a filter.
pub trait Visualization: Send + Sync {
    /// Stable name used as the render-cache key and in `/api/view/{name}`.
    fn name(&self) -> &'static str;

    /// Renders the view for the given filter.
    fn render(&self, dataset: &Dataset, filter: &FilterState) -> Result<RenderResult>;
}

/// Output of one render.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderResult {
    Arcs(ArcRender),
    Radial(RadialRender),
    Chord(ChordRender),
    Stats(Box<StatsReport>),
    /// The filter left nothing to draw.
    Empty { message: String },
}

impl RenderResult {
    /// The explicit empty state for a filter that matched nothing.
    pub fn empty(filter: &FilterState) -> Self {
        RenderResult::Empty {
            message: format!(
                "No connections found with current filters (min ≥ {}). Try lowering the threshold.",
                filter.min_connections
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RenderResult::Empty { .. })
    }
}

/// The default chart set, in tab order.
pub fn default_views() -> Vec<Box<dyn Visualization>> {
    vec![
        Box::new(ArcDiagram::default()),
        Box::new(RadialArc::default()),
        Box::new(ChordDiagram::default()),
        Box::new(StatsView),
    ]
}

// ============================================================================
// Arc diagram
// ============================================================================

/// One drawn arc.
#[derive(Debug, Clone, Serialize)]
pub struct ArcEntry {
    pub source: u32,
    pub target: u32,
    pub weight: u32,
    /// Linear ordinal distance.
    pub distance: usize,
    pub connection_type: ConnectionType,
    pub color: &'static str,
    /// `distance / max_distance`, for sequential colour schemes.
    pub intensity: f64,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArcRender {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    /// Connections that passed the filter.
    pub total_connections: usize,
    /// Connections drawn.
    pub drawn: usize,
    /// `true` when the cap cut the list.
    pub limited: bool,
    pub max_distance: usize,
    pub arcs: Vec<ArcEntry>,
}

/// Semicircular arcs above a baseline of chapters in canonical order.
#[derive(Debug, Clone)]
pub struct ArcDiagram {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub max_arcs: usize,
    pub generator: ArcGenerator,
}

impl Default for ArcDiagram {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 900.0,
            margin: 100.0,
            max_arcs: MAX_ARCS,
            generator: ArcGenerator::default(),
        }
    }
}

impl Visualization for ArcDiagram {
    fn name(&self) -> &'static str {
        "arc"
    }

    fn render(&self, dataset: &Dataset, filter: &FilterState) -> Result<RenderResult> {
        let store = &dataset.store;
        let connections = store.combined_filter(filter);
        if connections.is_empty() {
            return Ok(RenderResult::empty(filter));
        }

        let n = store.chapter_count();
        let layout = ArcLayout::new(
            n,
            self.width - 2.0 * self.margin,
            self.height - 2.0 * self.margin,
        );
        let max_distance = n.saturating_sub(1).max(1);

        let mut arcs = Vec::with_capacity(connections.len().min(self.max_arcs));
        for conn in connections.iter().take(self.max_arcs) {
            let s = store.position_of(conn.source)?;
            let t = store.position_of(conn.target)?;
            let (start, end) = if s < t { (s, t) } else { (t, s) };
            let distance = end - start;
            if distance == 0 {
                continue;
            }
            let points = self.generator.generate(
                start as f64,
                end as f64,
                distance as f64 / 2.0,
                &layout,
            )?;
            let connection_type = store.connection_type(conn)?;
            let arc = ArcPath {
                source: conn.source,
                target: conn.target,
                weight: conn.weight,
                distance,
                connection_type,
                points,
            };
            arcs.push(ArcEntry {
                source: arc.source,
                target: arc.target,
                weight: arc.weight,
                distance: arc.distance,
                connection_type: arc.connection_type,
                color: arc.connection_type.color(),
                intensity: distance as f64 / max_distance as f64,
                path: arc.path(),
            });
        }

        debug!(
            "Arc diagram: {} of {} connections drawn",
            arcs.len(),
            connections.len()
        );
        Ok(RenderResult::Arcs(ArcRender {
            width: self.width,
            height: self.height,
            margin: self.margin,
            total_connections: connections.len(),
            drawn: arcs.len(),
            limited: connections.len() > self.max_arcs,
            max_distance,
            arcs,
        }))
    }
}

// ============================================================================
// Radial arc
// ============================================================================

/// One drawn radial edge.
#[derive(Debug, Clone, Serialize)]
pub struct RadialEntry {
    pub source: u32,
    pub target: u32,
    pub weight: u32,
    /// Circular ordinal distance.
    pub distance: usize,
    pub connection_type: ConnectionType,
    pub color: &'static str,
    pub intensity: f64,
    pub stroke_width: f64,
    pub path: String,
}

/// Label anchor for the first chapter of a book.
#[derive(Debug, Clone, Serialize)]
pub struct BookMarker {
    pub book: String,
    pub testament: Testament,
    pub position: usize,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RadialRender {
    pub size: f64,
    pub radius: f64,
    pub total_connections: usize,
    pub drawn: usize,
    pub limited: bool,
    pub max_distance: usize,
    pub books: Vec<BookMarker>,
    pub connections: Vec<RadialEntry>,
}

/// Chapters around a circle, edges as quadratic curves through the centre.
#[derive(Debug, Clone)]
pub struct RadialArc {
    pub size: f64,
    pub padding: f64,
    pub max_connections: usize,
}

impl Default for RadialArc {
    fn default() -> Self {
        Self {
            size: 800.0,
            padding: 120.0,
            max_connections: MAX_RADIAL_CONNECTIONS,
        }
    }
}

impl Visualization for RadialArc {
    fn name(&self) -> &'static str {
        "radial"
    }

    fn render(&self, dataset: &Dataset, filter: &FilterState) -> Result<RenderResult> {
        let store = &dataset.store;
        let filtered = store.combined_filter(filter);
        if filtered.is_empty() {
            return Ok(RenderResult::empty(filter));
        }

        let radius = self.size / 2.0 - self.padding;
        let scale = angle_scale(store.chapter_count());
        let drawn = top_by_weight(&filtered, self.max_connections);

        let mut resolved = Vec::with_capacity(drawn.len());
        for conn in &drawn {
            let s = store.position_of(conn.source)?;
            let t = store.position_of(conn.target)?;
            resolved.push((conn, s, t, store.circular_distance(conn)?));
        }
        let max_distance = resolved
            .iter()
            .map(|(_, _, _, d)| *d)
            .max()
            .unwrap_or(0)
            .max(1);

        let mut connections = Vec::with_capacity(resolved.len());
        for (conn, s, t, distance) in resolved {
            let curve = generate_radial_path(s as f64, t as f64, &scale, radius)?;
            let connection_type = store.connection_type(conn)?;
            connections.push(RadialEntry {
                source: conn.source,
                target: conn.target,
                weight: conn.weight,
                distance,
                connection_type,
                color: connection_type.color(),
                intensity: distance as f64 / max_distance as f64,
                stroke_width: radial_stroke_width(conn.weight),
                path: curve.path,
            });
        }

        let mut books = Vec::with_capacity(store.books().len());
        for book in store.books() {
            let Some(first) = store.chapters_of_book(&book.name)?.first().map(|c| c.id) else {
                continue;
            };
            let position = store.position_of(first)?;
            let label = radial_point(position as f64, &scale, radius + 10.0);
            books.push(BookMarker {
                book: book.name.clone(),
                testament: book.testament,
                position,
                x: label.x,
                y: label.y,
            });
        }

        Ok(RenderResult::Radial(RadialRender {
            size: self.size,
            radius,
            total_connections: filtered.len(),
            drawn: connections.len(),
            limited: filtered.len() > self.max_connections,
            max_distance,
            books,
            connections,
        }))
    }
}

// ============================================================================
// Chord diagram
// ============================================================================

/// One arc segment of the chord ring.
#[derive(Debug, Clone, Serialize)]
pub struct ChordGroup {
    pub book: String,
    pub testament: Testament,
    pub color: &'static str,
    /// Outgoing plus incoming weight after masking, diagonal counted once.
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChordRender {
    pub outer_radius: f64,
    pub inner_radius: f64,
    pub total_weight: u64,
    pub groups: Vec<ChordGroup>,
    pub matrix: BookMatrix,
}

/// Book-to-book ribbons from the book matrix.
///
/// `OT`/`NT` restrict the matrix to that testament's books; `cross` keeps
/// every book but zeroes same-testament cells. A book filter zeroes cells
/// where neither the row nor the column is that book. Cells below
/// `min_connections` are zeroed last.
#[derive(Debug, Clone)]
pub struct ChordDiagram {
    pub size: f64,
}

impl Default for ChordDiagram {
    fn default() -> Self {
        Self { size: 1000.0 }
    }
}

impl ChordDiagram {
    /// The masked matrix for a filter.
    pub fn matrix(&self, dataset: &Dataset, filter: &FilterState) -> BookMatrix {
        let store = &dataset.store;
        let mut matrix = store.book_matrix_for(filter.testament);
        let testaments: Vec<Option<Testament>> = matrix
            .books
            .iter()
            .map(|name| store.book(name).map(|b| b.testament))
            .collect();
        let focus = filter
            .book_filter()
            .map(|name| matrix.books.iter().position(|b| b == name));

        for (i, row) in matrix.cells.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                let same_testament = testaments[i].is_some() && testaments[i] == testaments[j];
                let masked = match filter.testament {
                    TestamentFilter::Cross => same_testament,
                    _ => false,
                } || match focus {
                    Some(Some(b)) => i != b && j != b,
                    Some(None) => true,
                    None => false,
                };
                if masked {
                    *cell = 0;
                }
            }
        }
        matrix.thresholded(u64::from(filter.min_connections.max(1)))
    }
}

impl Visualization for ChordDiagram {
    fn name(&self) -> &'static str {
        "chord"
    }

    fn render(&self, dataset: &Dataset, filter: &FilterState) -> Result<RenderResult> {
        let matrix = self.matrix(dataset, filter);
        if matrix.is_empty() {
            return Ok(RenderResult::empty(filter));
        }

        let groups = matrix
            .books
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let testament = dataset
                    .store
                    .book(name)
                    .map(|b| b.testament)
                    .unwrap_or(Testament::OT);
                let column: u64 = matrix.cells.iter().map(|row| row[i]).sum();
                ChordGroup {
                    book: name.clone(),
                    testament,
                    color: match testament {
                        Testament::OT => ConnectionType::OtOt.color(),
                        Testament::NT => ConnectionType::NtNt.color(),
                    },
                    total: matrix.row_total(i) + column - matrix.get(i, i),
                }
            })
            .collect();

        let outer_radius = self.size * 0.4 - 100.0;
        Ok(RenderResult::Chord(ChordRender {
            outer_radius,
            inner_radius: outer_radius - 70.0,
            total_weight: matrix.total(),
            groups,
            matrix,
        }))
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// The statistics report for the filtered connection set.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsView;

impl Visualization for StatsView {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn render(&self, dataset: &Dataset, filter: &FilterState) -> Result<RenderResult> {
        let connections = dataset.store.combined_filter(filter);
        if connections.is_empty() {
            return Ok(RenderResult::empty(filter));
        }
        let report = StatsAggregator::new(&dataset.store)
            .with_sidecar(dataset.sidecar.as_ref())
            .compute(&connections);
        Ok(RenderResult::Stats(Box::new(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xref_graph::ConnectionStore;

    fn dataset() -> Dataset {
        Dataset::new(
            ConnectionStore::from_json(
                r#"{
                    "chapters": [
                        {"id": 0, "book": "Genesis", "chapter": 1, "testament": "OT"},
                        {"id": 1, "book": "Genesis", "chapter": 2, "testament": "OT"},
                        {"id": 2, "book": "Matthew", "chapter": 1, "testament": "NT"}
                    ],
                    "connections": [
                        {"source": 0, "target": 2, "weight": 5},
                        {"source": 0, "target": 1, "weight": 3}
                    ]
                }"#,
            )
            .unwrap(),
        )
    }

    fn arcs(result: RenderResult) -> ArcRender {
        match result {
            RenderResult::Arcs(render) => render,
            other => panic!("expected arcs, got {:?}", other),
        }
    }

    fn chord(result: RenderResult) -> ChordRender {
        match result {
            RenderResult::Chord(render) => render,
            other => panic!("expected chord, got {:?}", other),
        }
    }

    #[test]
    fn test_default_view_names() {
        let names: Vec<&str> = default_views().iter().map(|v| v.name()).collect();
        assert_eq!(names, vec!["arc", "radial", "chord", "stats"]);
    }

    #[test]
    fn test_empty_message() {
        let filter = FilterState::new().with_min_connections(7);
        match RenderResult::empty(&filter) {
            RenderResult::Empty { message } => {
                assert_eq!(
                    message,
                    "No connections found with current filters (min ≥ 7). Try lowering the threshold."
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_every_view_reports_empty_state() {
        let data = dataset();
        let filter = FilterState::new().with_min_connections(100);
        for view in default_views() {
            let result = view.render(&data, &filter).unwrap();
            assert!(result.is_empty(), "{} did not report empty", view.name());
        }
    }

    #[test]
    fn test_arc_diagram_render() {
        let render = arcs(ArcDiagram::default().render(&dataset(), &FilterState::new()).unwrap());
        assert_eq!(render.total_connections, 2);
        assert_eq!(render.drawn, 2);
        assert!(!render.limited);
        assert_eq!(render.max_distance, 2);

        let first = &render.arcs[0];
        assert_eq!(first.distance, 2);
        assert_eq!(first.connection_type, ConnectionType::CrossTestament);
        assert_eq!(first.color, "#9370DB");
        assert_eq!(first.intensity, 1.0);
        assert!(first.path.starts_with("M 50.00 700.00"));
        assert_eq!(first.path.matches(" L ").count(), 50);
    }

    #[test]
    fn test_arc_diagram_cap_keeps_first_connections() {
        let view = ArcDiagram {
            max_arcs: 1,
            ..Default::default()
        };
        let render = arcs(view.render(&dataset(), &FilterState::new()).unwrap());
        assert_eq!(render.total_connections, 2);
        assert_eq!(render.drawn, 1);
        assert!(render.limited);
        assert_eq!((render.arcs[0].source, render.arcs[0].target), (0, 2));
    }

    #[test]
    fn test_radial_render() {
        let result = RadialArc::default()
            .render(&dataset(), &FilterState::new())
            .unwrap();
        let RenderResult::Radial(render) = result else {
            panic!("expected radial");
        };
        assert_eq!(render.radius, 280.0);
        assert_eq!(render.drawn, 2);
        assert_eq!(render.connections[0].weight, 5);
        // 0 -> 2 wraps around three chapters
        assert_eq!(render.connections[0].distance, 1);
        assert_eq!(render.max_distance, 1);
        assert_eq!(render.connections[1].stroke_width, 0.5);
        assert_eq!(render.books.len(), 2);
        assert_eq!(render.books[1].position, 2);
    }

    #[test]
    fn test_radial_keeps_heaviest() {
        let view = RadialArc {
            max_connections: 1,
            ..Default::default()
        };
        let RenderResult::Radial(render) = view.render(&dataset(), &FilterState::new()).unwrap()
        else {
            panic!("expected radial");
        };
        assert!(render.limited);
        assert_eq!(render.connections.len(), 1);
        assert_eq!(render.connections[0].weight, 5);
    }

    #[test]
    fn test_chord_testament_modes() {
        let data = dataset();
        let view = ChordDiagram::default();

        let all = chord(view.render(&data, &FilterState::new()).unwrap());
        assert_eq!(all.total_weight, 8);
        assert_eq!(all.outer_radius, 300.0);
        assert_eq!(all.inner_radius, 230.0);
        assert_eq!(all.groups[0].total, 8);
        assert_eq!(all.groups[1].total, 5);

        let cross = FilterState::new().with_testament(TestamentFilter::Cross);
        assert_eq!(chord(view.render(&data, &cross).unwrap()).total_weight, 5);

        let ot = FilterState::new().with_testament(TestamentFilter::OT);
        let ot = chord(view.render(&data, &ot).unwrap());
        assert_eq!(ot.matrix.books, vec!["Genesis"]);
        assert_eq!(ot.total_weight, 3);

        let nt = FilterState::new().with_testament(TestamentFilter::NT);
        assert!(view.render(&data, &nt).unwrap().is_empty());
    }

    #[test]
    fn test_chord_book_and_threshold() {
        let data = dataset();
        let view = ChordDiagram::default();

        let matthew = FilterState::new().with_book("Matthew");
        let m = view.matrix(&data, &matthew);
        assert_eq!(m.get(0, 1), 5);
        assert_eq!(m.get(0, 0), 0);

        let unknown = FilterState::new().with_book("Tobit");
        assert!(view.render(&data, &unknown).unwrap().is_empty());

        let heavy = FilterState::new().with_min_connections(4);
        assert_eq!(view.matrix(&data, &heavy).total(), 5);
    }

    #[test]
    fn test_stats_view() {
        let filter = FilterState::new().with_testament(TestamentFilter::OT);
        match StatsView.render(&dataset(), &filter).unwrap() {
            RenderResult::Stats(report) => {
                assert_eq!(report.total_connections, 1);
                assert_eq!(report.total_weight, 3);
            }
            other => panic!("expected stats, got {:?}", other),
        }
    }

    #[test]
    fn test_render_result_serialization() {
        let json = serde_json::to_value(RenderResult::empty(&FilterState::new())).unwrap();
        assert_eq!(json["kind"], "empty");
        assert!(json["message"].as_str().unwrap().contains("min ≥ 1"));
    }
}
