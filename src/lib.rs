//! # wildtrie
//!
//! A map from paths (sequences of key segments) to values, stored as a trie
//! with one node per segment, supporting exact lookups and pattern queries
//! with single-segment and multi-segment wildcards.
//!
//! ## Example
//!
//! ```rust
//! use wildtrie::{TrieMap, Wildcards};
//!
//! let mut map = TrieMap::new(Wildcards::symbols("*", "**"));
//! map.insert(["u", "x"], 10).unwrap();
//! map.insert(["u", "y"], 30).unwrap();
//!
//! let h = map.find(["u", "x"]);
//! assert_eq!(map.get(h), Some(&10));
//!
//! let mut hits = Vec::new();
//! map.finds(["u", "*"], |h| hits.push(*map.get(h).unwrap()));
//! assert_eq!(hits, [10, 30]);
//! ```
//!
//! ## Layout
//!
//! Nodes and values live in two separate slot arenas addressed by 32-bit
//! indices. A node may exist only as a branch point (no value), and a node
//! may hold a value while also having children. The children of every node
//! are kept ordered by their own child count, largest first; the order is
//! repaired on every insertion and removal, so busy subtrees drift to the
//! front of their sibling chain and are scanned first.
//!
//! Handles returned by lookups are plain indices. The sentinel root doubles
//! as the end position, and erasing a node invalidates handles to it.

#![deny(unsafe_code)]

mod arena;
mod iter;
mod matcher;
mod node;
mod tracing_helpers;

pub use arena::{AllocError, SlotPolicy};
pub use iter::{Handle, Iter, Segments};
pub use matcher::{Token, Wildcards};

use std::borrow::Borrow;
use std::fmt;

use arena::{Slab, SlotId};
use node::{Nodes, ROOT};
use tracing_helpers::{debug_log, trace_log};

/// Allocation policies for the node and value arenas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Policy for trie nodes (the sentinel is not counted).
    pub nodes: SlotPolicy,
    /// Policy for stored values.
    pub values: SlotPolicy,
}

/// Why an insertion did not store its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertError {
    /// The path had no segments. The root never holds a value.
    EmptyPath,
    /// A node along the path could not be allocated.
    Node(AllocError),
    /// The value could not be allocated. Nodes created for the path are kept.
    Value(AllocError),
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "cannot insert at the empty path"),
            Self::Node(e) => write!(f, "node allocation failed: {e}"),
            Self::Value(e) => write!(f, "value allocation failed: {e}"),
        }
    }
}

impl std::error::Error for InsertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::EmptyPath => None,
            Self::Node(e) | Self::Value(e) => Some(e),
        }
    }
}

/// A trie keyed by path segments of type `K`.
#[derive(Clone)]
pub struct TrieMap<K, V> {
    nodes: Nodes<K>,
    values: Slab<V>,
    wildcards: Wildcards<K>,
}

impl<K, V> TrieMap<K, V> {
    /// Create an empty map that classifies query segments with `wildcards`.
    pub fn new(wildcards: Wildcards<K>) -> Self {
        Self::with_config(wildcards, Config::default())
    }

    /// Create an empty map with explicit arena policies.
    pub fn with_config(wildcards: Wildcards<K>, config: Config) -> Self {
        Self {
            nodes: Nodes::new(config.nodes),
            values: Slab::new(config.values),
            wildcards,
        }
    }

    /// Number of stored values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.len() == 0
    }

    /// Number of trie nodes, including pure branch points.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn wildcards(&self) -> &Wildcards<K> {
        &self.wildcards
    }

    /// The end position.
    #[inline]
    pub fn end(&self) -> Handle {
        Handle(ROOT)
    }

    /// First value in traversal order, or [`end`](Self::end).
    pub fn begin(&self) -> Handle {
        self.next(self.end())
    }

    /// The value after `handle` in traversal order, or [`end`](Self::end).
    ///
    /// Advancing the end position starts over at the first value. A stale
    /// handle advances to the end.
    pub fn next(&self, handle: Handle) -> Handle {
        if self.nodes.get(handle.0).is_none() {
            return self.end();
        }
        Handle(self.nodes.next_valued(handle.0, true))
    }

    pub fn get(&self, handle: Handle) -> Option<&V> {
        let node = self.nodes.get(handle.0)?;
        self.values.get(node.value)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut V> {
        let slot = self.nodes.get(handle.0)?.value;
        self.values.get_mut(slot)
    }

    /// The last segment of the path leading to `handle`.
    pub fn key(&self, handle: Handle) -> Option<&K> {
        self.nodes.get(handle.0)?.key.as_ref()
    }

    /// Segments of the path to `handle`, leaf first.
    pub fn segments(&self, handle: Handle) -> Segments<'_, K> {
        Segments {
            nodes: &self.nodes,
            cur: handle.0,
        }
    }

    /// Segments of the path to `handle`, root first.
    pub fn path(&self, handle: Handle) -> Vec<&K> {
        let mut path: Vec<&K> = self.segments(handle).collect();
        path.reverse();
        path
    }

    /// Iterate over all values in pre-order, following current sibling order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            map: self,
            cur: ROOT,
            done: false,
        }
    }

    /// Remove the value at `handle`.
    ///
    /// If the node still has children it stays in place as a branch point.
    /// Otherwise it is unlinked together with every ancestor left without
    /// children and without a value. Returns the next value in traversal
    /// order as a continuation point; handles to removed nodes are stale.
    /// Erasing the end position or a stale handle does nothing.
    pub fn erase(&mut self, handle: Handle) -> Handle {
        self.erase_node(handle.0).0
    }

    /// Drop every node and value. The sentinel stays.
    pub fn clear(&mut self) {
        debug_log!(nodes = self.nodes.len(), values = self.values.len(), "clear");
        self.nodes.reset();
        self.values.clear();
    }

    fn erase_node(&mut self, id: SlotId) -> (Handle, Option<V>) {
        if id == ROOT {
            return (self.end(), None);
        }
        let Some(node) = self.nodes.get(id) else {
            return (self.end(), None);
        };
        let slot = node.value;
        let Some(value) = self.values.release(slot) else {
            return (self.end(), None);
        };
        self.nodes[id].value = SlotId::NULL;

        if self.nodes[id].has_children() {
            trace_log!(node = id.index(), "cleared value on branch node");
            return (Handle(self.nodes.next_valued(id, true)), Some(value));
        }

        // Successor taken before unlinking; it is never among the removed nodes.
        let next = self.nodes.next_valued(id, false);

        let mut cur = id;
        loop {
            let parent = self.nodes[cur].parent;
            self.nodes.remove_child(cur);
            self.nodes.free(cur);
            trace_log!(node = cur.index(), "removed node");

            let survivor = &self.nodes[parent];
            if parent == ROOT || survivor.has_children() || survivor.has_value() {
                debug_log!(node = id.index(), stop = parent.index(), "erased");
                return (Handle(next), Some(value));
            }
            cur = parent;
        }
    }
}

impl<K: Eq, V> TrieMap<K, V> {
    /// Store `value` at `path`, creating missing nodes along the way.
    ///
    /// Returns the handle and `true` if the value is new, `false` if an
    /// existing value was overwritten in place. When the value arena refuses
    /// the value, nodes already created for the path remain.
    pub fn insert<I>(&mut self, path: I, value: V) -> Result<(Handle, bool), InsertError>
    where
        I: IntoIterator<Item = K>,
    {
        let mut cur = ROOT;
        for key in path {
            cur = match self.nodes.child_by_key(cur, &key) {
                Some(child) => child,
                None => {
                    let child = self.nodes.alloc(key).map_err(InsertError::Node)?;
                    self.nodes.insert_child(cur, child);
                    trace_log!(node = child.index(), parent = cur.index(), "created node");
                    child
                }
            };
        }
        if cur == ROOT {
            return Err(InsertError::EmptyPath);
        }

        let slot = self.nodes[cur].value;
        if let Some(existing) = self.values.get_mut(slot) {
            *existing = value;
            return Ok((Handle(cur), false));
        }
        let slot = self.values.try_alloc(value).map_err(InsertError::Value)?;
        self.nodes[cur].value = slot;
        Ok((Handle(cur), true))
    }

    /// Handle to the value stored at exactly `path`, or [`end`](Self::end).
    pub fn find<'q, Q, I>(&self, path: I) -> Handle
    where
        I: IntoIterator<Item = &'q Q>,
        K: Borrow<Q>,
        Q: ?Sized + Eq + 'q,
    {
        match self.locate(path) {
            Some(id) if self.nodes[id].has_value() => Handle(id),
            _ => self.end(),
        }
    }

    pub fn get_path<'q, Q, I>(&self, path: I) -> Option<&V>
    where
        I: IntoIterator<Item = &'q Q>,
        K: Borrow<Q>,
        Q: ?Sized + Eq + 'q,
    {
        self.get(self.find(path))
    }

    pub fn contains_path<'q, Q, I>(&self, path: I) -> bool
    where
        I: IntoIterator<Item = &'q Q>,
        K: Borrow<Q>,
        Q: ?Sized + Eq + 'q,
    {
        !self.find(path).is_end()
    }

    /// [`erase`](Self::erase) the value at `path`. A missing path is a no-op
    /// returning [`end`](Self::end).
    pub fn erase_path<'q, Q, I>(&mut self, path: I) -> Handle
    where
        I: IntoIterator<Item = &'q Q>,
        K: Borrow<Q>,
        Q: ?Sized + Eq + 'q,
    {
        let handle = self.find(path);
        self.erase_node(handle.0).0
    }

    /// Erase the value at `path` and hand it back.
    pub fn remove<'q, Q, I>(&mut self, path: I) -> Option<V>
    where
        I: IntoIterator<Item = &'q Q>,
        K: Borrow<Q>,
        Q: ?Sized + Eq + 'q,
    {
        let handle = self.find(path);
        self.erase_node(handle.0).1
    }

    /// Stream every value whose path matches `query` into `sink`.
    ///
    /// Segments are tagged by the map's [`Wildcards`] before the search.
    pub fn finds<I, F>(&self, query: I, sink: F)
    where
        I: IntoIterator<Item = K>,
        F: FnMut(Handle),
    {
        let tokens: Vec<Token<K>> = query
            .into_iter()
            .map(|segment| self.wildcards.classify(segment))
            .collect();
        self.search(&tokens, sink);
    }

    /// Like [`finds`](Self::finds), with each segment already tagged.
    pub fn finds_tokens<I, F>(&self, query: I, sink: F)
    where
        I: IntoIterator<Item = Token<K>>,
        F: FnMut(Handle),
    {
        let tokens: Vec<Token<K>> = query.into_iter().collect();
        self.search(&tokens, sink);
    }

    /// Collect the matches of [`finds`](Self::finds) in emission order.
    pub fn find_all<I>(&self, query: I) -> Vec<Handle>
    where
        I: IntoIterator<Item = K>,
    {
        let mut hits = Vec::new();
        self.finds(query, |h| hits.push(h));
        hits
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all, fields(len = tokens.len())))]
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn search<F>(&self, tokens: &[Token<K>], mut sink: F)
    where
        F: FnMut(Handle),
    {
        let frames = self.nodes.search(tokens, |id| sink(Handle(id)));
        trace_log!(frames, "query finished");
    }

    fn locate<'q, Q, I>(&self, path: I) -> Option<SlotId>
    where
        I: IntoIterator<Item = &'q Q>,
        K: Borrow<Q>,
        Q: ?Sized + Eq + 'q,
    {
        let mut cur = ROOT;
        for key in path {
            cur = self.nodes.child_by_key(cur, key)?;
        }
        Some(cur)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for TrieMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(h, v)| (self.path(h), v)))
            .finish()
    }
}

impl<'a, K, V> IntoIterator for &'a TrieMap<K, V> {
    type Item = (Handle, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}


#[cfg(test)]
mod proptests;
