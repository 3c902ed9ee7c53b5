//! Trie nodes and sibling ordering.
//!
//! Children of a node form a doubly linked chain (`child` points at the head,
//! `next`/`prev` link siblings). The chain is kept sorted by each child's own
//! `child_count`, largest first. Ordering is repaired locally whenever a
//! node's child count changes: the node whose count changed is swapped with
//! its neighbours until it sits in the right place among *its* siblings. The
//! child being added or removed is not moved.

use std::borrow::Borrow;
use std::ops::{Index, IndexMut};

use crate::arena::{AllocError, Slab, SlotId, SlotPolicy};

/// The sentinel: permanent, keyless, valueless root.
pub(crate) const ROOT: SlotId = SlotId::FIRST;

#[derive(Clone, Debug)]
pub(crate) struct Node<K> {
    /// `None` only on the sentinel.
    pub(crate) key: Option<K>,
    pub(crate) parent: SlotId,
    /// Head of the child chain.
    pub(crate) child: SlotId,
    pub(crate) next: SlotId,
    pub(crate) prev: SlotId,
    /// Slot in the value arena, or `NULL`.
    pub(crate) value: SlotId,
    pub(crate) child_count: usize,
}

impl<K> Node<K> {
    fn new(key: Option<K>) -> Self {
        Self {
            key,
            parent: SlotId::NULL,
            child: SlotId::NULL,
            next: SlotId::NULL,
            prev: SlotId::NULL,
            value: SlotId::NULL,
            child_count: 0,
        }
    }

    #[inline]
    pub(crate) fn has_value(&self) -> bool {
        !self.value.is_null()
    }

    #[inline]
    pub(crate) fn has_children(&self) -> bool {
        !self.child.is_null()
    }
}

/// Node storage rooted at the sentinel.
#[derive(Clone)]
pub(crate) struct Nodes<K> {
    slab: Slab<Node<K>>,
}

impl<K> Nodes<K> {
    pub(crate) fn new(policy: SlotPolicy) -> Self {
        let mut slab = Slab::new(policy);
        let root = slab.pin(Node::new(None));
        debug_assert_eq!(root, ROOT);
        Self { slab }
    }

    /// Number of nodes, not counting the sentinel.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slab.len()
    }

    #[inline]
    pub(crate) fn get(&self, id: SlotId) -> Option<&Node<K>> {
        self.slab.get(id)
    }

    /// Allocate a detached node.
    pub(crate) fn alloc(&mut self, key: K) -> Result<SlotId, AllocError> {
        self.slab.try_alloc(Node::new(Some(key)))
    }

    /// Release a node that has already been detached.
    pub(crate) fn free(&mut self, id: SlotId) -> Option<Node<K>> {
        debug_assert!(self.slab.get(id).is_some_and(|n| {
            n.parent.is_null() && !n.has_children() && !n.has_value()
        }));
        self.slab.release(id)
    }

    /// Drop every node below the sentinel.
    pub(crate) fn reset(&mut self) {
        self.slab.clear();
        let root = &mut self.slab[ROOT];
        root.child = SlotId::NULL;
        root.child_count = 0;
    }

    /// Linear scan of `parent`'s children for `key`.
    pub(crate) fn child_by_key<Q>(&self, parent: SlotId, key: &Q) -> Option<SlotId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cur = self[parent].child;
        while !cur.is_null() {
            let node = &self[cur];
            if node.key.as_ref().is_some_and(|k| k.borrow() == key) {
                return Some(cur);
            }
            cur = node.next;
        }
        None
    }

    pub(crate) fn last_child(&self, parent: SlotId) -> SlotId {
        let mut cur = self[parent].child;
        if cur.is_null() {
            return cur;
        }
        while !self[cur].next.is_null() {
            cur = self[cur].next;
        }
        cur
    }

    /// Link the detached node `child` under `parent`.
    ///
    /// The new child goes right after the first childless sibling (or last,
    /// if every sibling has children), which keeps branch nodes ahead of
    /// leaves. `parent` then moves forward among its own siblings while its
    /// predecessor has fewer children.
    pub(crate) fn insert_child(&mut self, parent: SlotId, child: SlotId) {
        debug_assert!(self[child].parent.is_null());

        let head = self[parent].child;
        if head.is_null() {
            self[parent].child = child;
        } else {
            let mut cur = head;
            loop {
                let node = &self[cur];
                if node.next.is_null() || node.child_count == 0 {
                    break;
                }
                cur = node.next;
            }

            let after = self[cur].next;
            let new = &mut self[child];
            new.prev = cur;
            new.next = after;
            self[cur].next = child;
            if !after.is_null() {
                self[after].prev = child;
            }
        }
        self[child].parent = parent;
        self[parent].child_count += 1;

        loop {
            let prev = self[parent].prev;
            if prev.is_null() || self[prev].child_count >= self[parent].child_count {
                break;
            }
            self.swap_with_next(prev);
        }
    }

    /// Unlink `child` from its parent's chain.
    ///
    /// The parent moves backward among its own siblings while its successor
    /// has more children.
    pub(crate) fn remove_child(&mut self, child: SlotId) {
        let (parent, prev, next) = {
            let node = &self[child];
            (node.parent, node.prev, node.next)
        };
        debug_assert!(!parent.is_null());

        if prev.is_null() {
            self[parent].child = next;
        } else {
            self[prev].next = next;
        }
        if !next.is_null() {
            self[next].prev = prev;
        }
        let node = &mut self[child];
        node.parent = SlotId::NULL;
        node.prev = SlotId::NULL;
        node.next = SlotId::NULL;

        self[parent].child_count -= 1;

        loop {
            let after = self[parent].next;
            if after.is_null() || self[after].child_count <= self[parent].child_count {
                break;
            }
            self.swap_with_next(parent);
        }
    }

    /// Exchange `a` with its next sibling.
    fn swap_with_next(&mut self, a: SlotId) {
        let b = self[a].next;
        debug_assert!(!b.is_null());
        let parent = self[a].parent;
        let before = self[a].prev;
        let after = self[b].next;

        if before.is_null() {
            self[parent].child = b;
        } else {
            self[before].next = b;
        }
        let nb = &mut self[b];
        nb.prev = before;
        nb.next = a;
        let na = &mut self[a];
        na.prev = b;
        na.next = after;
        if !after.is_null() {
            self[after].prev = a;
        }
    }
}

impl<K> Index<SlotId> for Nodes<K> {
    type Output = Node<K>;

    #[inline]
    fn index(&self, id: SlotId) -> &Node<K> {
        &self.slab[id]
    }
}

impl<K> IndexMut<SlotId> for Nodes<K> {
    #[inline]
    fn index_mut(&mut self, id: SlotId) -> &mut Node<K> {
        &mut self.slab[id]
    }
}
