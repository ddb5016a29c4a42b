//! Integration tests for the cross-reference graph core
//!
//! Exercises loading, filtering, geometry, the render cache and statistics
//! together over small hand-built graphs and a larger synthetic one.

use xref_graph::{
    generate_arc_path, ArcLayout, Chapter, Connection, ConnectionStore, Error, FilterState,
    GraphData, RenderCache, RenderState, StatsAggregator, Testament, TestamentFilter,
};

fn scenario() -> ConnectionStore {
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
    .unwrap()
}

/// Six books, three per testament, with a deterministic edge pattern.
fn synthetic(edges: usize) -> ConnectionStore {
    let books = [
        ("Genesis", 50, Testament::OT),
        ("Exodus", 40, Testament::OT),
        ("Psalms", 150, Testament::OT),
        ("Matthew", 28, Testament::NT),
        ("John", 21, Testament::NT),
        ("Romans", 16, Testament::NT),
    ];
    let mut chapters = Vec::new();
    for (book, count, testament) in books {
        for ch in 1..=count {
            chapters.push(Chapter::new(chapters.len() as u32, book, ch, testament));
        }
    }
    let n = chapters.len() as u64;
    let connections = (0..edges as u64)
        .map(|i| {
            let source = (i * 7919) % n;
            let mut target = (i * 104_729 + 13) % n;
            if target == source {
                target = (target + 1) % n;
            }
            Connection::new(source as u32, target as u32, (i % 11 + 1) as u32)
        })
        .collect();
    ConnectionStore::load(GraphData {
        chapters,
        connections,
        ..Default::default()
    })
    .unwrap()
}

// ============================================================================
// Example Scenario
// ============================================================================

#[test]
fn test_scenario_filter_by_testament_cross() {
    let store = scenario();
    assert_eq!(
        store.filter_by_testament(TestamentFilter::Cross),
        vec![Connection::new(0, 2, 5)]
    );
}

#[test]
fn test_scenario_filter_by_weight() {
    let store = scenario();
    assert_eq!(store.filter_by_weight(4), vec![Connection::new(0, 2, 5)]);
}

#[test]
fn test_scenario_filter_by_book() {
    let store = scenario();
    assert_eq!(
        store.filter_by_book("Genesis"),
        vec![Connection::new(0, 2, 5), Connection::new(0, 1, 3)]
    );
}

#[test]
fn test_scenario_testament_modes() {
    let store = scenario();
    assert_eq!(store.filter_by_testament(TestamentFilter::All).len(), 2);
    assert_eq!(
        store.filter_by_testament(TestamentFilter::OT),
        vec![Connection::new(0, 1, 3)]
    );
    assert!(store.filter_by_testament(TestamentFilter::NT).is_empty());
}

// ============================================================================
// Load Validation
// ============================================================================

#[test]
fn test_load_rejects_out_of_range_chapter() {
    let result = ConnectionStore::from_json(
        r#"{
            "chapters": [{"id": 0, "book": "Genesis", "chapter": 1, "testament": "OT"}],
            "connections": [{"source": 0, "target": 1, "weight": 1}]
        }"#,
    );
    assert!(matches!(result, Err(Error::DataFormat(_))));
}

#[test]
fn test_load_rejects_malformed_json() {
    let result = ConnectionStore::from_json(r#"{"chapters": [], "connections": [{"source": 0}]}"#);
    assert!(matches!(result, Err(Error::Serialization(_))));
}

#[test]
fn test_load_from_reader() {
    let json = serde_json::to_vec(&scenario().subset(vec![Connection::new(1, 2, 8)])).unwrap();
    let store = ConnectionStore::from_reader(json.as_slice()).unwrap();
    assert_eq!(store.connections(), &[Connection::new(1, 2, 8)]);
    assert_eq!(store.books().len(), 2);
}

// ============================================================================
// Filter Properties
// ============================================================================

#[test]
fn test_combined_filter_is_idempotent() {
    let store = synthetic(5_000);
    let filters = [
        FilterState::new(),
        FilterState::new().with_testament(TestamentFilter::Cross),
        FilterState::new()
            .with_testament(TestamentFilter::OT)
            .with_min_connections(6),
        FilterState::new().with_book("John").with_min_connections(3),
        FilterState::new()
            .with_testament(TestamentFilter::NT)
            .with_book("Romans"),
    ];
    for filter in &filters {
        let first = store.combined_filter(filter);
        let second = store.combined_filter(filter);
        assert_eq!(first, second, "filter {:?}", filter);
    }
}

#[test]
fn test_weight_filter_commutes_with_testament() {
    let store = synthetic(5_000);
    for testament in [
        TestamentFilter::All,
        TestamentFilter::OT,
        TestamentFilter::NT,
        TestamentFilter::Cross,
    ] {
        for w in [1, 4, 9, 12] {
            let a = xref_graph::filter::narrow_by_weight(&store.filter_by_testament(testament), w);
            let b = store.narrow_by_testament(&store.filter_by_weight(w), testament);
            assert_eq!(a, b, "testament {} weight {}", testament, w);
        }
    }
}

#[test]
fn test_combined_filter_matches_sequential_filters() {
    let store = synthetic(3_000);
    let filter = FilterState::new()
        .with_testament(TestamentFilter::Cross)
        .with_book("Psalms")
        .with_min_connections(5);

    let sequential = xref_graph::filter::narrow_by_weight(
        &store.narrow_by_book(&store.filter_by_testament(TestamentFilter::Cross), "Psalms"),
        5,
    );
    assert_eq!(store.combined_filter(&filter), sequential);
}

#[test]
fn test_testament_partition_covers_everything() {
    let store = synthetic(2_000);
    let total = store.connections().len();
    let ot = store.filter_by_testament(TestamentFilter::OT).len();
    let nt = store.filter_by_testament(TestamentFilter::NT).len();
    let cross = store.filter_by_testament(TestamentFilter::Cross).len();
    assert_eq!(ot + nt + cross, total);
}

#[test]
fn test_filter_removing_everything_is_empty_not_error() {
    let store = scenario();
    let filter = FilterState::new().with_min_connections(1_000);
    assert!(store.combined_filter(&filter).is_empty());
}

// ============================================================================
// Book Matrix
// ============================================================================

#[test]
fn test_book_matrix_conservation() {
    let store = synthetic(4_000);
    let weight: u64 = store.connections().iter().map(|c| u64::from(c.weight)).sum();
    assert_eq!(store.book_matrix().total(), weight);
}

#[test]
fn test_book_matrix_rebuild_is_idempotent() {
    let store = synthetic(1_000);
    let rebuilt = store.build_book_matrix(store.connections());
    assert_eq!(&rebuilt, store.book_matrix());

    let reloaded = ConnectionStore::load(store.subset(store.connections().to_vec())).unwrap();
    assert_eq!(reloaded.book_matrix(), store.book_matrix());
}

#[test]
fn test_book_matrix_testament_subset() {
    let store = synthetic(1_000);
    let nt = store.book_matrix_for(TestamentFilter::NT);
    assert_eq!(nt.books, vec!["Matthew", "John", "Romans"]);
    let nt_weight: u64 = store
        .filter_by_testament(TestamentFilter::NT)
        .iter()
        .map(|c| u64::from(c.weight))
        .sum();
    assert_eq!(nt.total(), nt_weight);
}

// ============================================================================
// Arc Geometry
// ============================================================================

#[test]
fn test_arc_geometry_determinism() {
    let layout = ArcLayout::new(20, 1000.0, 100.0);
    let a = generate_arc_path(2.0, 10.0, 4.0, &layout).unwrap();
    let b = generate_arc_path(2.0, 10.0, 4.0, &layout).unwrap();
    assert_eq!(a.len(), b.len());
    for (p, q) in a.iter().zip(&b) {
        assert!((p.x - q.x).abs() < 1e-12);
        assert!((p.y - q.y).abs() < 1e-12);
    }
}

#[test]
fn test_arc_endpoints_on_baseline_for_every_edge() {
    let store = synthetic(500);
    let layout = ArcLayout::new(store.chapter_count(), 2000.0, 600.0);
    for conn in store.connections() {
        let s = store.position_of(conn.source).unwrap() as f64;
        let t = store.position_of(conn.target).unwrap() as f64;
        let (start, end) = if s < t { (s, t) } else { (t, s) };
        let points = generate_arc_path(start, end, (end - start) / 2.0, &layout).unwrap();
        assert_eq!(points.first().unwrap().y, 600.0);
        assert_eq!(points.last().unwrap().y, 600.0);
        assert!(points.iter().all(|p| p.y >= 600.0 * 0.05 - 1e-9 && p.y <= 600.0));
    }
}

#[test]
fn test_arc_rejects_zero_distance() {
    let layout = ArcLayout::new(20, 1000.0, 100.0);
    assert!(matches!(
        generate_arc_path(4.0, 4.0, 1.0, &layout),
        Err(Error::InvalidArc(_))
    ));
}

// ============================================================================
// Render Cache
// ============================================================================

#[test]
fn test_render_cache_invalidation_on_filter_change() {
    let mut cache = RenderCache::new();
    let mut filter = FilterState::new();
    for name in ["arc", "radial", "chord", "stats"] {
        cache.mark_rendered(name);
    }

    let changed = filter.clone().with_min_connections(5);
    if changed != filter {
        filter = changed;
        cache.invalidate_all();
    }

    assert_eq!(filter.min_connections, 5);
    for name in ["arc", "radial", "chord", "stats"] {
        assert_eq!(cache.state(name), RenderState::NotRendered);
    }
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_reciprocity_rate_bounded() {
    for size in [0, 1, 10, 500, 3_000] {
        let store = synthetic(size.max(1));
        let conns = &store.connections()[..size.min(store.connections().len())];
        let report = StatsAggregator::new(&store).compute(conns);
        assert!((0.0..=100.0).contains(&report.reciprocity_rate));
    }
}

#[test]
fn test_fully_reciprocal_graph() {
    let store = scenario();
    let mut conns = store.connections().to_vec();
    conns.extend(
        store
            .connections()
            .iter()
            .map(|c| Connection::new(c.target, c.source, c.weight)),
    );
    let report = StatsAggregator::new(&store).compute(&conns);
    assert_eq!(report.reciprocal_connections, 4);
    assert_eq!(report.reciprocity_rate, 100.0);
}

#[test]
fn test_reciprocity_counts_both_directions() {
    let store = scenario();
    let pair = [Connection::new(0, 2, 5), Connection::new(2, 0, 1)];
    let report = StatsAggregator::new(&store).compute(&pair);
    assert_eq!(report.reciprocal_connections, 2);
    assert_eq!(report.reciprocity_rate, 100.0);

    // Order does not matter, and a self-reference is not its own reverse.
    let mixed = [
        Connection::new(1, 1, 2),
        Connection::new(2, 0, 1),
        Connection::new(0, 1, 3),
        Connection::new(0, 2, 5),
    ];
    let report = StatsAggregator::new(&store).compute(&mixed);
    assert_eq!(report.reciprocal_connections, 2);
    assert_eq!(report.reciprocity_rate, 50.0);
}

#[test]
fn test_stats_over_filtered_set() {
    let store = synthetic(2_000);
    let cross = store.filter_by_testament(TestamentFilter::Cross);
    let report = StatsAggregator::new(&store).compute(&cross);
    assert_eq!(report.total_connections, cross.len());
    assert_eq!(report.testament_breakdown.cross, cross.len());
    assert_eq!(report.testament_breakdown.ot_ot, 0);
    assert!(report.top_bridge_books.len() <= 5);
    assert!(report.most_self_referencing_books.is_empty());
}
