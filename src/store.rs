//! Nested-key store: one language's half of a translation catalog.
//!
//! The store is a tree of [`Node`]s keyed by path segments. A path resolves to
//! either a [`Node::Leaf`] holding translation text or a [`Node::Branch`]
//! holding children, never both. Branches without children are pruned, so a
//! branch always has at least one leaf somewhere below it.

use std::collections::BTreeMap;

use serde_json::{
    Map,
    Value,
};

use crate::types::{
    KEY_SEPARATOR,
    KeyPath,
};

/// A node of the key tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(String),
    Branch(BTreeMap<String, Node>),
}

impl Node {
    const fn as_branch(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Branch(children) => Some(children),
            Self::Leaf(_) => None,
        }
    }
}

/// Tree of translation strings addressed by [`KeyPath`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyStore {
    root: BTreeMap<String, Node>,
}

impl KeyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a parsed JSON document.
    ///
    /// Objects become branches and strings become leaves. Other values are kept
    /// as leaves holding their JSON text. Empty objects are dropped. A document
    /// whose root is not an object yields an empty store.
    #[must_use]
    pub fn from_json(json: &Value) -> Self {
        let Value::Object(map) = json else {
            tracing::warn!("Catalog root is not a JSON object; starting empty");
            return Self::new();
        };
        Self { root: branch_from_json(map, "") }
    }

    /// Converts the store back into a JSON object with sorted keys.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(branch_to_json(&self.root))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Top-level nodes in key order.
    #[must_use]
    pub const fn root(&self) -> &BTreeMap<String, Node> {
        &self.root
    }

    /// Sets the leaf at `path`.
    ///
    /// Missing branches are created. A leaf standing where a branch is needed is
    /// replaced by a new branch, and a branch at `path` itself is replaced by the
    /// leaf; in both cases the previous content is discarded.
    pub fn set(&mut self, path: &KeyPath, value: impl Into<String>) {
        let Some((last, init)) = path.segments().split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in init {
            let node = current
                .entry(segment.clone())
                .and_modify(|node| {
                    if matches!(node, Node::Leaf(_)) {
                        *node = Node::Branch(BTreeMap::new());
                    }
                })
                .or_insert_with(|| Node::Branch(BTreeMap::new()));
            let Node::Branch(children) = node else {
                return;
            };
            current = children;
        }

        current.insert(last.clone(), Node::Leaf(value.into()));
    }

    /// The leaf text at `path`, or `""` when the path is absent or a branch.
    #[must_use]
    pub fn get(&self, path: &KeyPath) -> &str {
        self.leaf(path).unwrap_or("")
    }

    /// The leaf text at `path`, distinguishing an absent leaf from an empty one.
    #[must_use]
    pub fn leaf(&self, path: &KeyPath) -> Option<&str> {
        match self.node(path)? {
            Node::Leaf(text) => Some(text),
            Node::Branch(_) => None,
        }
    }

    /// Removes the leaf at `path` and prunes ancestors left without children.
    ///
    /// Returns the removed text. Absent paths and branches are left untouched.
    pub fn remove(&mut self, path: &KeyPath) -> Option<String> {
        remove_leaf(&mut self.root, path.segments())
    }

    /// Whether `path` holds a non-empty leaf or a branch.
    #[must_use]
    pub fn exists(&self, path: &KeyPath) -> bool {
        match self.node(path) {
            Some(Node::Leaf(text)) => !text.is_empty(),
            Some(Node::Branch(children)) => !children.is_empty(),
            None => false,
        }
    }

    #[must_use]
    pub fn is_branch(&self, path: &KeyPath) -> bool {
        matches!(self.node(path), Some(Node::Branch(_)))
    }

    /// The nearest proper ancestor of `path` that is a leaf, if any.
    ///
    /// Setting `path` would silently replace that leaf with a branch.
    #[must_use]
    pub fn leaf_prefix(&self, path: &KeyPath) -> Option<KeyPath> {
        path.ancestors().find(|ancestor| self.leaf(ancestor).is_some())
    }

    /// All leaves in key order.
    #[must_use]
    pub fn leaves(&self) -> Vec<(KeyPath, &str)> {
        let mut result = Vec::new();
        collect_leaves(&self.root, None, &mut result);
        result
    }

    #[must_use]
    pub fn leaf_count(&self) -> usize {
        count_leaves(&self.root)
    }

    /// Splits keys written as `"a.b": ...` into real nesting at every level.
    ///
    /// Dotted keys whose split would produce an empty segment are kept as they
    /// are. Running it again on the result changes nothing.
    pub fn flatten_dotted(&mut self) {
        let root = std::mem::take(&mut self.root);
        self.root = flatten_branch(root);
    }

    fn node(&self, path: &KeyPath) -> Option<&Node> {
        let (last, init) = path.segments().split_last()?;
        let mut current = &self.root;
        for segment in init {
            current = current.get(segment)?.as_branch()?;
        }
        current.get(last)
    }
}

fn branch_from_json(map: &Map<String, Value>, prefix: &str) -> BTreeMap<String, Node> {
    let mut children = BTreeMap::new();
    for (key, value) in map {
        let full_key =
            if prefix.is_empty() { key.clone() } else { format!("{prefix}{KEY_SEPARATOR}{key}") };
        match value {
            Value::Object(child) => {
                let branch = branch_from_json(child, &full_key);
                if branch.is_empty() {
                    tracing::debug!(key = %full_key, "Dropping empty object");
                } else {
                    children.insert(key.clone(), Node::Branch(branch));
                }
            }
            Value::String(text) => {
                children.insert(key.clone(), Node::Leaf(text.clone()));
            }
            other => {
                tracing::warn!(key = %full_key, "Non-string value stored as text");
                children.insert(key.clone(), Node::Leaf(other.to_string()));
            }
        }
    }
    children
}

fn branch_to_json(children: &BTreeMap<String, Node>) -> Map<String, Value> {
    children
        .iter()
        .map(|(key, node)| {
            let value = match node {
                Node::Leaf(text) => Value::String(text.clone()),
                Node::Branch(grandchildren) => Value::Object(branch_to_json(grandchildren)),
            };
            (key.clone(), value)
        })
        .collect()
}

fn remove_leaf(children: &mut BTreeMap<String, Node>, segments: &[String]) -> Option<String> {
    let (first, rest) = segments.split_first()?;

    if rest.is_empty() {
        if !matches!(children.get(first), Some(Node::Leaf(_))) {
            return None;
        }
        return match children.remove(first) {
            Some(Node::Leaf(text)) => Some(text),
            _ => None,
        };
    }

    let Some(Node::Branch(grandchildren)) = children.get_mut(first) else {
        return None;
    };
    let removed = remove_leaf(grandchildren, rest);
    if grandchildren.is_empty() {
        children.remove(first);
    }
    removed
}

fn collect_leaves<'a>(
    children: &'a BTreeMap<String, Node>,
    prefix: Option<&KeyPath>,
    result: &mut Vec<(KeyPath, &'a str)>,
) {
    for (key, node) in children {
        let path = match prefix {
            Some(prefix) => prefix.child(key),
            None => KeyPath::from_stored(vec![key.clone()]),
        };
        match node {
            Node::Leaf(text) => result.push((path, text)),
            Node::Branch(grandchildren) => collect_leaves(grandchildren, Some(&path), result),
        }
    }
}

fn count_leaves(children: &BTreeMap<String, Node>) -> usize {
    children
        .values()
        .map(|node| match node {
            Node::Leaf(_) => 1,
            Node::Branch(grandchildren) => count_leaves(grandchildren),
        })
        .sum()
}

fn flatten_branch(children: BTreeMap<String, Node>) -> BTreeMap<String, Node> {
    let mut result = BTreeMap::new();
    for (key, node) in children {
        let node = match node {
            Node::Branch(grandchildren) => Node::Branch(flatten_branch(grandchildren)),
            leaf @ Node::Leaf(_) => leaf,
        };

        let split: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if split.len() > 1 && split.iter().all(|s| !s.is_empty()) {
            merge_at(&mut result, &split, node);
        } else {
            if split.len() > 1 {
                tracing::warn!(key = %key, "Dotted key has an empty segment; left as is");
            }
            merge_at(&mut result, &[key.as_str()], node);
        }
    }
    result
}

/// Places `node` under `segments`, merging branches that meet at the same path.
fn merge_at(children: &mut BTreeMap<String, Node>, segments: &[&str], node: Node) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };

    if rest.is_empty() {
        match (children.get_mut(*first), node) {
            (Some(Node::Branch(existing)), Node::Branch(incoming)) => {
                for (key, child) in incoming {
                    merge_at(existing, &[key.as_str()], child);
                }
            }
            (_, node) => {
                children.insert((*first).to_string(), node);
            }
        }
        return;
    }

    let entry = children
        .entry((*first).to_string())
        .and_modify(|existing| {
            if matches!(existing, Node::Leaf(_)) {
                *existing = Node::Branch(BTreeMap::new());
            }
        })
        .or_insert_with(|| Node::Branch(BTreeMap::new()));
    if let Node::Branch(grandchildren) = entry {
        merge_at(grandchildren, rest, node);
    }
}
