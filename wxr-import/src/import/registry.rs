//! Per-run bookkeeping for foreign → local identifiers
//!
//! Everything here lives for a single run and is never persisted.

use crate::models::{ForeignId, LocalId};
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Append-only foreign → local mapping
///
/// The first mapping recorded for a foreign id wins for the rest of the run.
#[derive(Debug, Clone)]
pub struct RemapTable<K: Ord> {
    map: BTreeMap<K, LocalId>,
}

impl<K: Ord> Default for RemapTable<K> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord> RemapTable<K> {
    /// Record a mapping; returns `false` (keeping the old one) if already mapped
    pub fn put(&mut self, foreign: K, local: LocalId) -> bool {
        if self.map.contains_key(&foreign) {
            return false;
        }
        self.map.insert(foreign, local);
        true
    }

    pub fn get<Q>(&self, foreign: &Q) -> Option<LocalId>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(foreign).copied()
    }

    pub fn contains<Q>(&self, foreign: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(foreign)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The four independent identifier mappings of a run
#[derive(Debug, Clone, Default)]
pub struct RemapRegistry {
    pub posts: RemapTable<ForeignId>,
    pub terms: RemapTable<ForeignId>,
    pub menu_items: RemapTable<ForeignId>,
    /// Keyed by sanitized login
    pub authors: RemapTable<String>,
}

/// Child → parent links (both foreign) waiting for the parent to be mapped
#[derive(Debug, Clone, Default)]
pub struct OrphanSet {
    links: BTreeMap<ForeignId, ForeignId>,
}

impl OrphanSet {
    pub fn insert(&mut self, child: ForeignId, parent: ForeignId) {
        self.links.insert(child, parent);
    }

    pub fn parent_of(&self, child: ForeignId) -> Option<ForeignId> {
        self.links.get(&child).copied()
    }

    /// Remove and return every link, ordered by child id
    pub fn take(&mut self) -> Vec<(ForeignId, ForeignId)> {
        std::mem::take(&mut self.links).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Work postponed until the rest of the graph is known
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    items: Vec<T>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> DeferredQueue<T> {
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Drain the queue in arrival order
    pub fn take(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Original remote URL → new local URL
#[derive(Debug, Clone, Default)]
pub struct UrlRemapTable {
    urls: BTreeMap<String, String>,
}

impl UrlRemapTable {
    /// Record a relocation; empty and identity pairs are ignored, a later
    /// pair for the same original replaces the earlier one
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        let from = from.into();
        let to = to.into();
        if from.is_empty() || from == to {
            return;
        }
        self.urls.insert(from, to);
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.urls.get(from).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Consume the table, longest original first (ties by value)
    ///
    /// Longest-first keeps a URL that contains another original as a prefix
    /// from being rewritten by the shorter pair.
    pub fn into_ordered(self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self.urls.into_iter().collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        pairs
    }
}
