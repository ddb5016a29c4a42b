//! File-backed dataset loading.
//!
//! [`DatasetLoader`] reads the cross-reference dataset from a data directory:
//!
//! ```text
//! data_dir/
//! ├── graph_data.json        full dataset (required)
//! ├── preview_data.json      small preview dataset (optional)
//! ├── stats.json             precomputed statistics sidecar (optional)
//! └── theographic/<type>.json
//! ```
//!
//! Every read runs under a hard timeout and JSON parsing is moved off the
//! async executor with `spawn_blocking`. The full and preview datasets are
//! each loaded at most once: concurrent callers of [`DatasetLoader::load_full`]
//! await the same initialisation. A failed load leaves the slot empty, so the
//! next call retries.

use crate::error::{Error, Result};

use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OnceCell, RwLock};
use xref_graph::{ConnectionStore, StatsSidecar};

/// Full dataset file name.
pub const GRAPH_FILE: &str = "graph_data.json";
/// Statistics sidecar file name.
pub const STATS_FILE: &str = "stats.json";
/// Preview dataset file name.
pub const PREVIEW_FILE: &str = "preview_data.json";
/// Directory holding the theographic metadata files.
pub const THEOGRAPHIC_DIR: &str = "theographic";
/// Accepted theographic data kinds, one file each.
pub const THEOGRAPHIC_TYPES: [&str; 9] = [
    "people",
    "places",
    "events",
    "periods",
    "peopleGroups",
    "verses",
    "chapters",
    "books",
    "easton",
];

/// A loaded store together with its optional statistics sidecar.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub store: ConnectionStore,
    pub sidecar: Option<StatsSidecar>,
}

impl Dataset {
    /// Wraps a store without a sidecar.
    pub fn new(store: ConnectionStore) -> Self {
        Self {
            store,
            sidecar: None,
        }
    }

    /// Attaches a statistics sidecar.
    pub fn with_sidecar(mut self, sidecar: Option<StatsSidecar>) -> Self {
        self.sidecar = sidecar;
        self
    }

    /// Returns `true` for a preview dataset.
    pub fn is_preview(&self) -> bool {
        self.store.is_preview()
    }
}

struct LoaderInner {
    data_dir: PathBuf,
    timeout: Duration,
    full: OnceCell<Arc<Dataset>>,
    preview: OnceCell<Arc<Dataset>>,
    theographic: RwLock<HashMap<String, Arc<Value>>>,
}

/// Loads datasets from a directory. Cheap to clone; clones share state.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use xref_viz::DatasetLoader;
///
/// let loader = DatasetLoader::new("./data", Duration::from_secs(30));
/// let dataset = loader.load_full().await?;
/// println!("{} connections", dataset.store.connections().len());
/// ```
#[derive(Clone)]
pub struct DatasetLoader {
    inner: Arc<LoaderInner>,
}

impl std::fmt::Debug for DatasetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetLoader")
            .field("data_dir", &self.inner.data_dir)
            .field("timeout", &self.inner.timeout)
            .field("full_loaded", &self.inner.full.initialized())
            .finish()
    }
}

impl DatasetLoader {
    pub fn new(data_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                data_dir: data_dir.into(),
                timeout,
                full: OnceCell::new(),
                preview: OnceCell::new(),
                theographic: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.inner.data_dir
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// The full dataset if it has been loaded.
    pub fn full(&self) -> Option<Arc<Dataset>> {
        self.inner.full.get().cloned()
    }

    /// Returns `true` if a preview file exists in the data directory.
    pub async fn has_preview(&self) -> bool {
        tokio::fs::try_exists(self.inner.data_dir.join(PREVIEW_FILE))
            .await
            .unwrap_or(false)
    }

    /// Loads `graph_data.json` and the sidecar, once.
    ///
    /// Concurrent callers share one read. On failure nothing is cached.
    pub async fn load_full(&self) -> Result<Arc<Dataset>> {
        self.inner
            .full
            .get_or_try_init(|| self.fetch_dataset(GRAPH_FILE))
            .await
            .map(Arc::clone)
    }

    /// Loads `preview_data.json` and the sidecar, once.
    ///
    /// Fails with [`Error::Unavailable`] when there is no preview file.
    pub async fn load_preview(&self) -> Result<Arc<Dataset>> {
        self.inner
            .preview
            .get_or_try_init(|| self.fetch_dataset(PREVIEW_FILE))
            .await
            .map(Arc::clone)
    }

    /// Reads `theographic/<kind>.json`. Results are cached per kind.
    pub async fn theographic(&self, kind: &str) -> Result<Arc<Value>> {
        if !THEOGRAPHIC_TYPES.contains(&kind) {
            return Err(Error::InvalidParameter(format!(
                "type must be one of {}",
                THEOGRAPHIC_TYPES.join(", ")
            )));
        }
        if let Some(value) = self.inner.theographic.read().await.get(kind) {
            return Ok(Arc::clone(value));
        }

        let path = self
            .inner
            .data_dir
            .join(THEOGRAPHIC_DIR)
            .join(format!("{}.json", kind));
        let value = bounded(self.inner.timeout, async move {
            let bytes = read_file(&path).await?;
            let value =
                tokio::task::spawn_blocking(move || serde_json::from_slice::<Value>(&bytes))
                    .await
                    .map_err(|e| Error::Server(format!("Parse task failed: {}", e)))??;
            Ok::<_, Error>(value)
        })
        .await
        .map_err(|e| match e {
            Error::Unavailable(what) => Error::NotFound(what),
            other => other,
        })?;

        let value = Arc::new(value);
        self.inner
            .theographic
            .write()
            .await
            .insert(kind.to_string(), Arc::clone(&value));
        Ok(value)
    }

    async fn fetch_dataset(&self, file: &str) -> Result<Arc<Dataset>> {
        let path = self.inner.data_dir.join(file);
        let started = Instant::now();
        info!("Loading dataset from {}", path.display());

        let store = bounded(self.inner.timeout, async move {
            let bytes = read_file(&path).await?;
            debug!("Read {} bytes, parsing", bytes.len());
            let store = tokio::task::spawn_blocking(move || ConnectionStore::from_slice(&bytes))
                .await
                .map_err(|e| Error::Server(format!("Parse task failed: {}", e)))??;
            Ok::<_, Error>(store)
        })
        .await?;

        let sidecar = self.read_sidecar().await;
        info!(
            "Loaded {}: {} chapters, {} connections in {:?}",
            file,
            store.chapter_count(),
            store.connections().len(),
            started.elapsed()
        );
        Ok(Arc::new(Dataset::new(store).with_sidecar(sidecar)))
    }

    /// A missing sidecar is normal; an unreadable one is logged and skipped.
    async fn read_sidecar(&self) -> Option<StatsSidecar> {
        let path = self.inner.data_dir.join(STATS_FILE);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// Reads a file, reporting a missing one as [`Error::Unavailable`].
async fn read_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::Unavailable(format!("{} not found", path.display()))
        } else {
            Error::Io(e)
        }
    })
}

/// Runs `fut` under a hard deadline.
async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| Error::FetchTimeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GRAPH: &str = r#"{
        "metadata": {"total_books": 2, "total_chapters": 3, "total_connections": 2},
        "chapters": [
            {"id": 0, "book": "Genesis", "chapter": 1, "testament": "OT"},
            {"id": 1, "book": "Genesis", "chapter": 2, "testament": "OT"},
            {"id": 2, "book": "Matthew", "chapter": 1, "testament": "NT"}
        ],
        "connections": [
            {"source": 0, "target": 2, "weight": 5},
            {"source": 0, "target": 1, "weight": 3}
        ]
    }"#;

    fn data_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(GRAPH_FILE), GRAPH).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_load_full() {
        let dir = data_dir();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));
        assert!(loader.full().is_none());

        let dataset = loader.load_full().await.unwrap();
        assert_eq!(dataset.store.connections().len(), 2);
        assert!(dataset.sidecar.is_none());
        assert!(!dataset.is_preview());
        assert!(loader.full().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_dataset() {
        let dir = data_dir();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));

        let (a, b, c) = tokio::join!(loader.load_full(), loader.load_full(), loader.load_full());
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &c));
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));
        assert!(matches!(loader.load_full().await, Err(Error::Unavailable(_))));
        assert!(matches!(loader.load_preview().await, Err(Error::Unavailable(_))));
        assert!(!loader.has_preview().await);
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(GRAPH_FILE), r#"{"chapters": []"#).unwrap();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));
        assert!(matches!(loader.load_full().await, Err(Error::Graph(_))));
        assert!(loader.full().is_none());

        fs::write(dir.path().join(GRAPH_FILE), GRAPH).unwrap();
        assert!(loader.load_full().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_dataset_is_graph_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(GRAPH_FILE),
            r#"{"chapters": [], "connections": [{"source": 0, "target": 1, "weight": 1}]}"#,
        )
        .unwrap();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));
        let err = loader.load_full().await.unwrap_err();
        assert!(matches!(err, Error::Graph(xref_graph::Error::DataFormat(_))));
    }

    #[tokio::test]
    async fn test_sidecar_attached() {
        let dir = data_dir();
        fs::write(
            dir.path().join(STATS_FILE),
            r#"{"total_verse_references": 344799, "testament_distribution": {"OT_to_OT": 10}}"#,
        )
        .unwrap();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));
        let dataset = loader.load_full().await.unwrap();
        let sidecar = dataset.sidecar.as_ref().unwrap();
        assert_eq!(sidecar.total_verse_references, Some(344_799));
        assert_eq!(sidecar.testament_distribution.as_ref().unwrap().ot_to_ot, 10);
    }

    #[tokio::test]
    async fn test_malformed_sidecar_is_skipped() {
        let dir = data_dir();
        fs::write(dir.path().join(STATS_FILE), "not json").unwrap();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));
        let dataset = loader.load_full().await.unwrap();
        assert!(dataset.sidecar.is_none());
    }

    #[tokio::test]
    async fn test_load_preview() {
        let dir = data_dir();
        let full = ConnectionStore::from_json(GRAPH).unwrap();
        fs::write(
            dir.path().join(PREVIEW_FILE),
            serde_json::to_vec(&full.preview(1)).unwrap(),
        )
        .unwrap();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));
        assert!(loader.has_preview().await);

        let preview = loader.load_preview().await.unwrap();
        assert!(preview.is_preview());
        assert_eq!(preview.store.connections().len(), 1);
        assert!(loader.full().is_none());
    }

    #[test]
    fn test_bounded_times_out() {
        let result: Result<()> = tokio_test::block_on(bounded(
            Duration::from_millis(10),
            std::future::pending::<Result<()>>(),
        ));
        assert!(matches!(result, Err(Error::FetchTimeout(d)) if d == Duration::from_millis(10)));
    }

    #[test]
    fn test_bounded_passes_through() {
        let value =
            tokio_test::block_on(bounded(Duration::from_secs(1), async { Ok::<_, Error>(7) }));
        assert_eq!(tokio_test::assert_ok!(value), 7);
    }

    #[tokio::test]
    async fn test_theographic() {
        let dir = data_dir();
        fs::create_dir(dir.path().join(THEOGRAPHIC_DIR)).unwrap();
        fs::write(
            dir.path().join(THEOGRAPHIC_DIR).join("people.json"),
            r#"[{"name": "Abraham"}, {"name": "Sarah"}]"#,
        )
        .unwrap();
        let loader = DatasetLoader::new(dir.path(), Duration::from_secs(5));

        let people = loader.theographic("people").await.unwrap();
        assert_eq!(people.as_array().unwrap().len(), 2);
        let again = loader.theographic("people").await.unwrap();
        assert!(Arc::ptr_eq(&people, &again));

        assert!(matches!(
            loader.theographic("places").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            loader.theographic("angels").await,
            Err(Error::InvalidParameter(_))
        ));
    }
}
