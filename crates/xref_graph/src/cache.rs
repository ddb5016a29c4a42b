//! Render cache: which visualizations are current for the active filter.

use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};

/// Per-visualization render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    /// Needs a render before it can be shown.
    #[default]
    NotRendered,
    /// Shows output for the current filter and dataset.
    Rendered,
}

/// Tracks [`RenderState`] per visualization name.
///
/// Invalidation is all-or-nothing: any filter change or dataset upgrade
/// flips every entry back to [`RenderState::NotRendered`] in one step.
/// Unknown names report `NotRendered`.
///
/// # Examples
///
/// ```
/// use xref_graph::{RenderCache, RenderState};
///
/// let mut cache = RenderCache::new();
/// cache.mark_rendered("arc");
/// assert!(cache.is_rendered("arc"));
///
/// cache.invalidate_all();
/// assert_eq!(cache.state("arc"), RenderState::NotRendered);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    entries: IndexMap<String, RenderState>,
}

impl RenderCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a visualization in the `NotRendered` state. Existing entries are
    /// left as they are.
    pub fn register(&mut self, name: impl Into<String>) {
        self.entries.entry(name.into()).or_default();
    }

    /// Records a successful render.
    pub fn mark_rendered(&mut self, name: impl Into<String>) {
        self.entries.insert(name.into(), RenderState::Rendered);
    }

    /// Current state of a visualization.
    pub fn state(&self, name: &str) -> RenderState {
        self.entries.get(name).copied().unwrap_or_default()
    }

    /// Returns `true` if the visualization is current.
    pub fn is_rendered(&self, name: &str) -> bool {
        self.state(name) == RenderState::Rendered
    }

    /// Marks every entry `NotRendered`.
    pub fn invalidate_all(&mut self) {
        trace!("Invalidating {} render cache entries", self.entries.len());
        for state in self.entries.values_mut() {
            *state = RenderState::NotRendered;
        }
    }

    /// Number of entries currently `Rendered`.
    pub fn rendered_count(&self) -> usize {
        self.entries
            .values()
            .filter(|s| **s == RenderState::Rendered)
            .count()
    }

    /// Iterates over entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, RenderState)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of tracked visualizations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_name_is_not_rendered() {
        let cache = RenderCache::new();
        assert_eq!(cache.state("chord"), RenderState::NotRendered);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_register_keeps_existing_state() {
        let mut cache = RenderCache::new();
        cache.mark_rendered("arc");
        cache.register("arc");
        cache.register("radial");
        assert!(cache.is_rendered("arc"));
        assert!(!cache.is_rendered("radial"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_all_resets_every_entry() {
        let mut cache = RenderCache::new();
        for name in ["arc", "radial", "chord", "stats"] {
            cache.mark_rendered(name);
        }
        assert_eq!(cache.rendered_count(), 4);

        cache.invalidate_all();
        assert_eq!(cache.rendered_count(), 0);
        assert!(cache
            .iter()
            .all(|(_, state)| state == RenderState::NotRendered));
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_iter_in_registration_order() {
        let mut cache = RenderCache::new();
        cache.register("stats");
        cache.register("arc");
        let names: Vec<&str> = cache.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["stats", "arc"]);
    }
}
