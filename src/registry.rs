//! Name-keyed plugin registry
//!
//! One registry instance exists per plugin family (executors, observers). It is
//! populated once while the process warms up and then shared read-only behind an
//! `Arc`, so request handlers can look plugins up concurrently without locking.

use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Maps plugin names to their implementations
pub struct Registry<T: ?Sized> {
    /// Family label used in log messages ("executor", "observer")
    family: &'static str,
    plugins: HashMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry for the given plugin family
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            plugins: HashMap::new(),
        }
    }

    /// Register an implementation under `name`
    ///
    /// Re-registering an existing name logs a warning and overwrites the previous
    /// entry. Returns `true` when an earlier entry was replaced.
    pub fn register(&mut self, name: impl Into<String>, plugin: Arc<T>) -> bool {
        let name = name.into();
        let replaced = self.plugins.insert(name.clone(), plugin).is_some();
        if replaced {
            warn!("{} {} already exists, overwriting", self.family, name);
        } else {
            debug!("{} {} registered", self.family, name);
        }
        replaced
    }

    /// Look up a plugin by name
    pub fn lookup(&self, name: &str) -> Option<Arc<T>> {
        self.plugins.get(name).cloned()
    }

    /// Names of every registered plugin, sorted
    pub fn names(&self) -> BTreeSet<String> {
        self.plugins.keys().cloned().collect()
    }

    /// Iterate over `(name, plugin)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<T>)> {
        let mut entries: Vec<_> = self.plugins.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(name, plugin)| (name.as_str(), plugin))
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn family(&self) -> &'static str {
        self.family
    }
}
