//! Cursors and traversal.
//!
//! A [`Handle`] is a plain node index. Advancing it follows the links stored
//! in the nodes themselves (child, then next sibling, then the next sibling
//! of the nearest ancestor that has one), so no traversal state lives outside
//! the trie. Only value-bearing nodes are stopped at.

use std::iter::FusedIterator;

use crate::arena::SlotId;
use crate::node::{Nodes, ROOT};
use crate::TrieMap;

/// Non-owning cursor to a node of a [`TrieMap`].
///
/// The sentinel doubles as the end position, see [`TrieMap::end`]. A handle
/// goes stale when the node it refers to is erased; reading through a stale
/// handle yields `None` or the contents of whatever node reused the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(pub(crate) SlotId);

impl Handle {
    /// Whether this is the end position.
    #[inline]
    pub fn is_end(self) -> bool {
        self.0 == ROOT
    }
}

impl<K> Nodes<K> {
    /// Next value-bearing node after `from` in pre-order, or `ROOT`.
    ///
    /// With `descend == false` the subtree below `from` is skipped.
    pub(crate) fn next_valued(&self, from: SlotId, descend: bool) -> SlotId {
        let mut cur = from;
        let mut descend = descend;
        loop {
            let node = &self[cur];
            if descend && node.has_children() {
                cur = node.child;
            } else if cur == ROOT {
                return ROOT;
            } else if !node.next.is_null() {
                cur = node.next;
            } else {
                loop {
                    cur = self[cur].parent;
                    if cur == ROOT {
                        return ROOT;
                    }
                    let next = self[cur].next;
                    if !next.is_null() {
                        cur = next;
                        break;
                    }
                }
            }

            if self[cur].has_value() {
                return cur;
            }
            descend = true;
        }
    }
}

/// Iterator over `(handle, value)` pairs in traversal order.
///
/// Created by [`TrieMap::iter`].
pub struct Iter<'a, K, V> {
    pub(crate) map: &'a TrieMap<K, V>,
    pub(crate) cur: SlotId,
    pub(crate) done: bool,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.cur = self.map.nodes.next_valued(self.cur, true);
        if self.cur == ROOT {
            self.done = true;
            return None;
        }
        let handle = Handle(self.cur);
        self.map.get(handle).map(|v| (handle, v))
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Keys on the path from a node up to the sentinel, leaf first.
///
/// Created by [`TrieMap::segments`].
pub struct Segments<'a, K> {
    pub(crate) nodes: &'a Nodes<K>,
    pub(crate) cur: SlotId,
}

impl<'a, K> Iterator for Segments<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let node = self.nodes.get(self.cur)?;
        let key = node.key.as_ref()?;
        self.cur = node.parent;
        Some(key)
    }
}

impl<K> FusedIterator for Segments<'_, K> {}
