//! JSON API endpoints for the visualization server.
//!
//! All endpoints are read-only. Filtering goes through the same
//! [`ConnectionStore`](xref_graph::ConnectionStore) operations the views use,
//! so the HTTP results and the rendered charts always agree.
//!
//! # API Endpoints
//!
//! - `GET /` - API description
//! - `GET /api/status` - Dataset, upgrade and render-cache state
//! - `GET /api/graph?testament=&limit=&minWeight=` - Filtered graph subset
//! - `GET /api/stats?testament=&book=&minConnections=` - Statistics report
//! - `GET /api/book?name=` - Connections touching a book
//! - `GET /api/chapter?id=` - Connections touching a chapter
//! - `GET /api/theographic?type=` - Theographic metadata files
//! - `GET /api/preview` - The heaviest connections only
//! - `GET /api/view/{name}?testament=&book=&minConnections=&force=` - Render a view
//!
//! Unknown paths answer `404 {"error": "Endpoint not found"}`.
//!
//! # Single viewer
//!
//! The server holds one [`Session`], so one filter and one render cache, for
//! every client. `/api/view` requests carry the complete filter in the URL,
//! and a request whose filter differs from the previous one replaces it and
//! clears the cache for everyone. Concurrent viewers with different filters
//! always get correct results, but they re-render on each request.
//!
//! # Dataset lifecycle
//!
//! [`ApiState::initialize`] installs the preview dataset first when one is
//! on disk and schedules the full load in the background. Until the full
//! dataset is resident, a filter change through `/api/view` triggers the
//! upgrade immediately. A failed upgrade is logged and the preview stays in
//! place; the next filter change tries again.

use crate::error::{Error, Result};
use crate::loader::{Dataset, DatasetLoader, THEOGRAPHIC_TYPES};
use crate::session::Session;

use axum::http::StatusCode;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use log::{info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use xref_graph::{FilterState, StatsAggregator, TestamentFilter};

/// A specialized `Result` type for API handlers.
type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

/// Default `limit` for `/api/graph`.
pub const DEFAULT_GRAPH_LIMIT: usize = 1000;
/// Default number of connections in `/api/preview`.
pub const DEFAULT_PREVIEW_SIZE: usize = 200;

/// Reads an optional query value, treating `key=` like an absent key.
fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Maps a crate error to an HTTP status and message.
fn api_error(e: Error) -> (StatusCode, String) {
    let status = match &e {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::Graph(xref_graph::Error::UnknownBook(_))
        | Error::Graph(xref_graph::Error::UnknownChapter(_)) => StatusCode::NOT_FOUND,
        Error::Graph(xref_graph::Error::InvalidFilter(_)) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// The shared state for the Axum web application.
///
/// Holds the single [`Session`] behind `Arc<RwLock<...>>` and the
/// [`DatasetLoader`]. Cloning is cheap and clones share everything.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use xref_viz::{ApiState, DatasetLoader};
///
/// #[tokio::main]
/// async fn main() {
///     let state = ApiState::new(DatasetLoader::new("./data", Duration::from_secs(30)));
///     let session = state.session.read().await;
///     assert!(session.dataset().is_none());
/// }
/// ```
#[derive(Clone)]
pub struct ApiState {
    /// Filter state, render cache and views.
    pub session: Arc<RwLock<Session>>,
    /// Dataset source.
    pub loader: DatasetLoader,
    /// Connections served by `/api/preview`.
    pub preview_size: usize,
    upgrading: Arc<AtomicBool>,
}

impl ApiState {
    /// Creates state with the default views and no dataset.
    pub fn new(loader: DatasetLoader) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::with_default_views())),
            loader,
            preview_size: DEFAULT_PREVIEW_SIZE,
            upgrading: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates state with a dataset already installed.
    pub fn with_dataset(loader: DatasetLoader, dataset: Arc<Dataset>) -> Self {
        let mut session = Session::with_default_views();
        session.replace_dataset(dataset);
        Self {
            session: Arc::new(RwLock::new(session)),
            ..Self::new(loader)
        }
    }

    pub fn with_preview_size(mut self, preview_size: usize) -> Self {
        self.preview_size = preview_size;
        self
    }

    /// Returns `true` while a background upgrade is scheduled or running.
    pub fn is_upgrading(&self) -> bool {
        self.upgrading.load(Ordering::SeqCst)
    }

    /// Installs a dataset into the session, clearing the render cache.
    pub async fn install(&self, dataset: Arc<Dataset>) {
        self.session.write().await.replace_dataset(dataset);
    }

    /// Loads the first dataset.
    ///
    /// With a preview on disk the preview is installed and the full load is
    /// scheduled after `upgrade_delay`. Otherwise the full dataset is loaded
    /// directly and any failure is returned.
    pub async fn initialize(&self, upgrade_delay: Duration) -> Result<()> {
        if self.loader.has_preview().await {
            match self.loader.load_preview().await {
                Ok(preview) => {
                    self.install(preview).await;
                    self.spawn_upgrade(upgrade_delay);
                    return Ok(());
                }
                Err(e) => warn!("Preview dataset unusable, loading full dataset: {}", e),
            }
        }
        let full = self.loader.load_full().await?;
        self.install(full).await;
        Ok(())
    }

    /// Loads the full dataset and installs it if the session still holds a
    /// preview. Returns `true` if it replaced the resident dataset.
    pub async fn upgrade(&self) -> Result<bool> {
        let full = match self.loader.load_full().await {
            Ok(full) => full,
            Err(e) => {
                warn!("Full dataset load failed, continuing with preview: {}", e);
                return Err(e);
            }
        };
        let mut session = self.session.write().await;
        let stale = session
            .dataset()
            .map_or(true, |current| !Arc::ptr_eq(current, &full) && current.is_preview());
        if stale {
            session.replace_dataset(full);
            info!("Upgraded from preview to full dataset");
        }
        Ok(stale)
    }

    /// Schedules [`upgrade`](Self::upgrade) after `delay`.
    ///
    /// At most one upgrade task runs at a time; returns `None` if one is
    /// already scheduled.
    pub fn spawn_upgrade(&self, delay: Duration) -> Option<JoinHandle<()>> {
        if self.upgrading.swap(true, Ordering::SeqCst) {
            return None;
        }
        let state = self.clone();
        Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let _ = state.upgrade().await;
            state.upgrading.store(false, Ordering::SeqCst);
        }))
    }

    /// The resident dataset, or 503.
    async fn dataset(&self) -> ApiResult<Arc<Dataset>> {
        self.session
            .read()
            .await
            .dataset()
            .cloned()
            .ok_or_else(|| api_error(Error::Unavailable("no dataset loaded".into())))
    }
}

/// Query parameters for `GET /api/graph`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQuery {
    /// `all`, `OT`, `NT` or `cross`. Defaults to `all`.
    pub testament: Option<String>,
    /// Maximum number of connections returned. Defaults to 1000.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<usize>,
    /// Minimum weight. Defaults to 1.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_weight: Option<u32>,
}

/// Filter parameters shared by `/api/stats` and `/api/view/{name}`.
///
/// Absent parameters take their defaults, so a URL always names one
/// complete filter.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewQuery {
    pub testament: Option<String>,
    pub book: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub min_connections: Option<u32>,
    /// Re-render even when the cached output is current.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub force: Option<bool>,
}

impl ViewQuery {
    pub fn to_filter(&self) -> Result<FilterState> {
        let testament = match &self.testament {
            Some(t) => TestamentFilter::from_str(t)?,
            None => TestamentFilter::All,
        };
        Ok(FilterState::new()
            .with_testament(testament)
            .with_book(self.book.clone().unwrap_or_default())
            .with_min_connections(self.min_connections.unwrap_or(1)))
    }
}

#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChapterQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TheographicQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Body of `GET /api/view/{name}`.
#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub view: String,
    pub cached: bool,
    pub preview: bool,
    pub filter: FilterState,
    pub result: Arc<crate::views::RenderResult>,
}

/// Constructs the main Axum [`Router`] for the visualization server.
///
/// # Examples
///
/// ```rust,ignore
/// use xref_viz::{api::create_router, ApiState, DatasetLoader};
///
/// let state = ApiState::new(DatasetLoader::new("./data", Duration::from_secs(30)));
/// let router = create_router(state);
///
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8787").await?;
/// axum::serve(listener, router).await?;
/// ```
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(api_docs))
        .route("/api/status", get(get_status))
        .route("/api/graph", get(get_graph))
        .route("/api/stats", get(get_stats))
        .route("/api/book", get(get_book))
        .route("/api/chapter", get(get_chapter))
        .route("/api/theographic", get(get_theographic))
        .route("/api/preview", get(get_preview))
        .route("/api/view/{name}", get(get_view))
        .fallback(not_found)
        .with_state(state)
}

/// API handler for `GET /`.
async fn api_docs() -> Json<Value> {
    Json(json!({
        "name": "Bible Cross-Reference API",
        "version": crate::VERSION,
        "endpoints": {
            "/api/graph": "Get cross-reference connections. Params: ?testament=OT|NT|cross|all&limit=1000&minWeight=1",
            "/api/stats": "Get comprehensive statistics. Params: ?testament=&book=&minConnections=",
            "/api/book": "Get all connections for a book. Params: ?name=Genesis",
            "/api/chapter": "Get all connections for a chapter. Params: ?id=123",
            "/api/theographic": format!("Get theographic data. Params: ?type={}", THEOGRAPHIC_TYPES.join("|")),
            "/api/preview": "Get preview data (strongest connections only)",
            "/api/view/{name}": "Render a visualization (arc|radial|chord|stats). Params: ?testament=&book=&minConnections=&force=",
            "/api/status": "Dataset and render-cache state",
        },
        "examples": [
            "/api/graph?testament=NT&limit=500",
            "/api/book?name=John",
            "/api/chapter?id=1",
            "/api/theographic?type=people",
            "/api/preview",
            "/api/stats",
            "/api/view/chord?testament=cross&minConnections=10",
        ],
        "dataSource": "Treasury of Scripture Knowledge + Theographic Bible Metadata",
    }))
}

/// API handler for `GET /api/status`.
async fn get_status(State(state): State<ApiState>) -> Json<Value> {
    let session = state.session.read().await;
    let cache: serde_json::Map<String, Value> = session
        .cache()
        .iter()
        .map(|(name, s)| (name.to_string(), json!(s)))
        .collect();
    Json(json!({
        "loaded": session.dataset().is_some(),
        "preview": session.is_preview(),
        "upgrading": state.is_upgrading(),
        "connections": session.dataset().map(|d| d.store.connections().len()),
        "filter": session.filter(),
        "views": session.view_names().collect::<Vec<_>>(),
        "render_cache": cache,
    }))
}

/// API handler for `GET /api/graph`.
async fn get_graph(
    State(state): State<ApiState>,
    Query(query): Query<GraphQuery>,
) -> ApiResult<Json<Value>> {
    let dataset = state.dataset().await?;
    let store = &dataset.store;

    let view = ViewQuery {
        testament: query.testament.clone(),
        min_connections: query.min_weight,
        ..Default::default()
    };
    let filter = view.to_filter().map_err(api_error)?;
    let limit = query.limit.unwrap_or(DEFAULT_GRAPH_LIMIT);

    let mut connections = store.combined_filter(&filter);
    connections.truncate(limit);

    let mut metadata = serde_json::to_value(store.metadata())
        .map_err(|e| api_error(e.into()))?;
    if let Value::Object(map) = &mut metadata {
        map.insert("filtered".into(), json!(true));
        map.insert("testament".into(), json!(filter.testament));
        map.insert("limit".into(), json!(limit));
        map.insert("minWeight".into(), json!(filter.min_connections));
        map.insert("results".into(), json!(connections.len()));
    }

    Ok(Json(json!({
        "metadata": metadata,
        "books": store.books(),
        "chapters": store.chapters(),
        "connections": connections,
        "book_matrix": store.book_matrix().cells,
    })))
}

/// API handler for `GET /api/stats`.
/// The sidecar is merged into the report computed for the filter.
async fn get_stats(
    State(state): State<ApiState>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<xref_graph::StatsReport>> {
    let dataset = state.dataset().await?;
    let filter = query.to_filter().map_err(api_error)?;
    let connections = dataset.store.combined_filter(&filter);
    let report = StatsAggregator::new(&dataset.store)
        .with_sidecar(dataset.sidecar.as_ref())
        .compute(&connections);
    Ok(Json(report))
}

/// API handler for `GET /api/book`.
async fn get_book(
    State(state): State<ApiState>,
    Query(query): Query<BookQuery>,
) -> ApiResult<Json<Value>> {
    let name = query
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "Missing parameter: name".to_string()))?;
    let dataset = state.dataset().await?;
    let store = &dataset.store;
    let results = store
        .book_connections(name.trim())
        .map_err(|e| api_error(e.into()))?;

    Ok(Json(json!({
        "book": name.trim(),
        "connections": results.len(),
        "results": results,
        "chapters": store.chapters(),
        "books": store.books(),
    })))
}

/// API handler for `GET /api/chapter`.
async fn get_chapter(
    State(state): State<ApiState>,
    Query(query): Query<ChapterQuery>,
) -> ApiResult<Json<Value>> {
    let id: u32 = query
        .id
        .as_deref()
        .and_then(|s| s.trim().parse().ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Missing or invalid parameter: id".to_string(),
        ))?;
    let dataset = state.dataset().await?;
    let store = &dataset.store;
    let results = store
        .connections_for_chapter(id)
        .map_err(|e| api_error(e.into()))?;

    Ok(Json(json!({
        "chapter": store.chapter(id),
        "connections": results.len(),
        "results": results,
        "chapters": store.chapters(),
        "books": store.books(),
    })))
}

/// API handler for `GET /api/theographic`.
async fn get_theographic(
    State(state): State<ApiState>,
    Query(query): Query<TheographicQuery>,
) -> ApiResult<Json<Value>> {
    let kind = query.kind.unwrap_or_default();
    let data = state.loader.theographic(&kind).await.map_err(|e| match e {
        Error::InvalidParameter(_) => (
            StatusCode::BAD_REQUEST,
            format!(
                "Missing or invalid parameter: type (one of {})",
                THEOGRAPHIC_TYPES.join(", ")
            ),
        ),
        other => api_error(other),
    })?;
    let count = match data.as_ref() {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    };

    Ok(Json(json!({
        "type": kind,
        "count": count,
        "data": data,
    })))
}

/// API handler for `GET /api/preview`.
async fn get_preview(State(state): State<ApiState>) -> ApiResult<Json<xref_graph::GraphData>> {
    let dataset = state.dataset().await?;
    Ok(Json(dataset.store.preview(state.preview_size)))
}

/// API handler for `GET /api/view/{name}`.
///
/// Applies the filter to the session, which clears the render cache when it
/// changed, then renders through the cache.
async fn get_view(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<ViewResponse>> {
    let filter = query.to_filter().map_err(api_error)?;
    let mut session = state.session.write().await;

    let changed = session.set_filter(filter);
    if changed && session.is_preview() && state.loader.full().is_none() {
        state.spawn_upgrade(Duration::ZERO);
    }

    let outcome = session.render(&name, query.force.unwrap_or(false)).map_err(api_error)?;
    Ok(Json(ViewResponse {
        view: name,
        cached: outcome.cached,
        preview: session.is_preview(),
        filter: session.filter().clone(),
        result: outcome.result,
    }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Endpoint not found" })),
    )
}
