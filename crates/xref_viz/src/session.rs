//! The per-session visualization controller.
//!
//! A [`Session`] owns the resident dataset handle, the active
//! [`FilterState`], the [`RenderCache`] and the registered views with their
//! last outputs. Every filter change and every dataset swap invalidates the
//! whole cache before the next render can run, so a view is only served from
//! cache while both the filter and the dataset it was rendered for are current.

use crate::error::{Error, Result};
use crate::loader::Dataset;
use crate::views::{default_views, RenderResult, Visualization};

use indexmap::IndexMap;
use log::{debug, info};
use std::sync::Arc;
use xref_graph::{FilterState, RenderCache, TestamentFilter};

/// A render served by [`Session::render`].
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub result: Arc<RenderResult>,
    /// `true` when the output came from the render cache.
    pub cached: bool,
}

/// Filter state, render cache and views for one viewer.
///
/// # Examples
///
/// ```
/// use xref_graph::{ConnectionStore, TestamentFilter};
/// use xref_viz::{Dataset, Session};
///
/// # fn main() -> xref_viz::Result<()> {
/// let store = ConnectionStore::from_json(r#"{
///     "chapters": [
///         {"id": 0, "book": "Genesis", "chapter": 1, "testament": "OT"},
///         {"id": 1, "book": "Matthew", "chapter": 1, "testament": "NT"}
///     ],
///     "connections": [{"source": 0, "target": 1, "weight": 2}]
/// }"#)?;
///
/// let mut session = Session::with_default_views();
/// session.replace_dataset(Dataset::new(store).into());
///
/// assert!(!session.render("arc", false)?.cached);
/// assert!(session.render("arc", false)?.cached);
///
/// session.set_testament(TestamentFilter::Cross);
/// assert!(!session.render("arc", false)?.cached);
/// # Ok(())
/// # }
/// ```
pub struct Session {
    dataset: Option<Arc<Dataset>>,
    filter: FilterState,
    cache: RenderCache,
    views: IndexMap<&'static str, Box<dyn Visualization>>,
    outputs: IndexMap<&'static str, Arc<RenderResult>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("has_dataset", &self.dataset.is_some())
            .field("filter", &self.filter)
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .field("cache", &self.cache)
            .finish()
    }
}

impl Session {
    /// A session with no views and no dataset.
    pub fn new() -> Self {
        Self {
            dataset: None,
            filter: FilterState::default(),
            cache: RenderCache::new(),
            views: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// A session with the arc, radial, chord and stats views registered.
    pub fn with_default_views() -> Self {
        let mut session = Self::new();
        for view in default_views() {
            session.register(view);
        }
        session
    }

    /// Adds a view, replacing any view with the same name.
    pub fn register(&mut self, view: Box<dyn Visualization>) {
        let name = view.name();
        self.cache.register(name);
        self.outputs.shift_remove(name);
        self.views.insert(name, view);
    }

    pub fn view_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.views.keys().copied()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// Returns `true` while the resident dataset is a preview.
    pub fn is_preview(&self) -> bool {
        self.dataset.as_ref().is_some_and(|d| d.is_preview())
    }

    pub fn set_testament(&mut self, testament: TestamentFilter) {
        self.filter.testament = testament;
        self.invalidate();
    }

    pub fn set_book(&mut self, book: impl Into<String>) {
        self.filter.book = book.into();
        self.invalidate();
    }

    pub fn set_min_connections(&mut self, min: u32) {
        self.filter.min_connections = min.max(1);
        self.invalidate();
    }

    /// Replaces the whole filter. Returns `true` if it differed.
    ///
    /// The cache is cleared only on an actual change.
    pub fn set_filter(&mut self, filter: FilterState) -> bool {
        let filter = FilterState {
            min_connections: filter.min_connections.max(1),
            ..filter
        };
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.invalidate();
        true
    }

    pub fn reset_filters(&mut self) {
        self.filter = FilterState::default();
        self.invalidate();
    }

    /// Swaps in a new dataset (initial load or preview upgrade).
    pub fn replace_dataset(&mut self, dataset: Arc<Dataset>) {
        info!(
            "Installing {} dataset with {} connections",
            if dataset.is_preview() { "preview" } else { "full" },
            dataset.store.connections().len()
        );
        self.dataset = Some(dataset);
        self.invalidate();
    }

    /// Marks every view stale and drops their outputs.
    pub fn invalidate(&mut self) {
        self.cache.invalidate_all();
        self.outputs.clear();
    }

    /// Renders a view, or returns its cached output when it is current and
    /// `force` is false.
    pub fn render(&mut self, name: &str, force: bool) -> Result<RenderOutcome> {
        let (&key, view) = self
            .views
            .get_key_value(name)
            .ok_or_else(|| Error::NotFound(format!("view '{}'", name)))?;

        if !force && self.cache.is_rendered(key) {
            if let Some(result) = self.outputs.get(key) {
                debug!("Serving cached {} render", key);
                return Ok(RenderOutcome {
                    result: Arc::clone(result),
                    cached: true,
                });
            }
        }

        let dataset = self
            .dataset
            .as_ref()
            .ok_or_else(|| Error::Unavailable("no dataset loaded".into()))?;
        let result = Arc::new(view.render(dataset, &self.filter)?);
        debug!("Rendered {} for {:?}", key, self.filter);

        self.outputs.insert(key, Arc::clone(&result));
        self.cache.mark_rendered(key);
        Ok(RenderOutcome {
            result,
            cached: false,
        })
    }
}
