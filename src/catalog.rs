//! Paired source/target catalog.
//!
//! A catalog holds the Polish (source) and English (target) stores that share
//! one key vocabulary. The stores are allowed to drift apart: a source leaf
//! without a target leaf is an untranslated entry, and a target leaf without a
//! source leaf is an orphaned translation.

use std::collections::{
    BTreeMap,
    BTreeSet,
};

use crate::store::{
    KeyStore,
    Node,
};
use crate::types::{
    EntryValues,
    KeyPath,
};

/// One leaf entry as seen by a search predicate.
#[derive(Debug, Clone, Copy)]
pub struct EntryView<'a> {
    pub path: &'a KeyPath,
    pub source: &'a str,
    pub target: &'a str,
}

/// One row of the ordered tree snapshot handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    /// Zero for top-level keys.
    pub depth: usize,
    pub path: KeyPath,
    pub kind: RowKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Branch,
    Leaf { source: String, target: Option<String> },
}

/// Translation progress over the source store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub total: usize,
    pub translated: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    source: KeyStore,
    target: KeyStore,
}

impl Catalog {
    #[must_use]
    pub const fn new(source: KeyStore, target: KeyStore) -> Self {
        Self { source, target }
    }

    #[must_use]
    pub const fn source(&self) -> &KeyStore {
        &self.source
    }

    #[must_use]
    pub const fn target(&self) -> &KeyStore {
        &self.target
    }

    /// Whether either store holds non-empty text at `path`.
    #[must_use]
    pub fn key_exists(&self, path: &KeyPath) -> bool {
        !self.source.get(path).is_empty() || !self.target.get(path).is_empty()
    }

    /// Whether `path` is a branch in either store.
    #[must_use]
    pub fn is_branch(&self, path: &KeyPath) -> bool {
        self.source.is_branch(path) || self.target.is_branch(path)
    }

    /// The nearest ancestor of `path` holding a leaf in either store.
    #[must_use]
    pub fn leaf_prefix(&self, path: &KeyPath) -> Option<KeyPath> {
        match (self.source.leaf_prefix(path), self.target.leaf_prefix(path)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Current values of both stores at `path`.
    #[must_use]
    pub fn entry(&self, path: &KeyPath) -> EntryValues {
        EntryValues {
            source: self.source.leaf(path).map(str::to_string),
            target: self.target.leaf(path).map(str::to_string),
        }
    }

    /// Writes the source text and, when given, the target text at `path`.
    pub fn set_entry(&mut self, path: &KeyPath, source_text: &str, target_text: Option<&str>) {
        self.source.set(path, source_text);
        if let Some(target_text) = target_text {
            self.target.set(path, target_text);
        }
    }

    pub fn set_target(&mut self, path: &KeyPath, target_text: &str) {
        self.target.set(path, target_text);
    }

    /// Makes both stores hold exactly `values` at `path`.
    ///
    /// A `None` side is removed from its store.
    pub fn restore(&mut self, path: &KeyPath, values: &EntryValues) {
        match &values.source {
            Some(text) => self.source.set(path, text.as_str()),
            None => {
                self.source.remove(path);
            }
        }
        match &values.target {
            Some(text) => self.target.set(path, text.as_str()),
            None => {
                self.target.remove(path);
            }
        }
    }

    /// Removes `path` from both stores and returns what was there.
    pub fn delete_entry(&mut self, path: &KeyPath) -> EntryValues {
        EntryValues { source: self.source.remove(path), target: self.target.remove(path) }
    }

    /// Relocates both values from `old_path` to `new_path`.
    pub fn move_entry(&mut self, old_path: &KeyPath, new_path: &KeyPath) {
        let values = self.delete_entry(old_path);
        self.restore(new_path, &values);
    }

    /// Paths of entries matching `predicate`, plus every branch above them.
    ///
    /// Entries are enumerated from the source store.
    pub fn search<F>(&self, mut predicate: F) -> BTreeSet<KeyPath>
    where
        F: FnMut(EntryView<'_>) -> bool,
    {
        let mut matches = BTreeSet::new();
        for (path, source) in self.source.leaves() {
            let target = self.target.get(&path);
            if predicate(EntryView { path: &path, source, target }) {
                matches.extend(path.ancestors());
                matches.insert(path);
            }
        }
        matches
    }

    /// Case-insensitive substring search over key, source text and target text.
    #[must_use]
    pub fn search_text(&self, query: &str) -> BTreeSet<KeyPath> {
        let query = query.to_lowercase();
        self.search(|entry| {
            entry.path.to_string().to_lowercase().contains(&query)
                || entry.source.to_lowercase().contains(&query)
                || entry.target.to_lowercase().contains(&query)
        })
    }

    /// Turns pre-joined dotted keys into real nesting in both stores.
    pub fn flatten_dotted(&mut self) {
        self.source.flatten_dotted();
        self.target.flatten_dotted();
    }

    /// Number of leaves in the source store.
    #[must_use]
    pub fn count_leaves(&self) -> usize {
        self.source.leaf_count()
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        let leaves = self.source.leaves();
        let translated =
            leaves.iter().filter(|(path, _)| !self.target.get(path).is_empty()).count();
        Progress { total: leaves.len(), translated }
    }

    /// Source entries whose target text is absent or empty.
    #[must_use]
    pub fn missing_translations(&self) -> Vec<KeyPath> {
        self.source
            .leaves()
            .into_iter()
            .filter(|(path, _)| self.target.get(path).is_empty())
            .map(|(path, _)| path)
            .collect()
    }

    /// Target entries with no source leaf at the same path.
    #[must_use]
    pub fn orphaned_translations(&self) -> Vec<KeyPath> {
        self.target
            .leaves()
            .into_iter()
            .filter(|(path, _)| self.source.leaf(path).is_none())
            .map(|(path, _)| path)
            .collect()
    }

    /// Ordered depth-first snapshot of the source tree.
    ///
    /// With `visible`, only rows whose path is in the set are emitted; pass the
    /// result of [`Self::search`] so branches above matches stay visible.
    #[must_use]
    pub fn tree(&self, visible: Option<&BTreeSet<KeyPath>>) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        self.push_rows(self.source.root(), None, visible, &mut rows);
        rows
    }

    fn push_rows(
        &self,
        children: &BTreeMap<String, Node>,
        prefix: Option<&KeyPath>,
        visible: Option<&BTreeSet<KeyPath>>,
        rows: &mut Vec<TreeRow>,
    ) {
        for (key, node) in children {
            let path = prefix.map_or_else(|| KeyPath::from_stored(vec![key.clone()]), |p| p.child(key));
            if visible.is_some_and(|set| !set.contains(&path)) {
                continue;
            }
            let depth = path.depth() - 1;
            match node {
                Node::Branch(grandchildren) => {
                    rows.push(TreeRow { depth, path: path.clone(), kind: RowKind::Branch });
                    self.push_rows(grandchildren, Some(&path), visible, rows);
                }
                Node::Leaf(source) => {
                    let target = self.target.leaf(&path).map(str::to_string);
                    rows.push(TreeRow {
                        depth,
                        path,
                        kind: RowKind::Leaf { source: source.clone(), target },
                    });
                }
            }
        }
    }
}
