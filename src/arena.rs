//! Slot arena for nodes and values.
//!
//! Every node and every value lives in a [`Slab`]: a vector of slots addressed
//! by 32-bit indices, with a free list so that slots vacated by an erase are
//! handed out again before the vector grows. Indices stay stable for the
//! lifetime of the slot, which is what lets the trie link parents, children
//! and siblings without raw pointers.

use std::collections::TryReserveError;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Largest number of slots a single slab can address.
const MAX_SLOTS: usize = u32::MAX as usize - 1;

/// A 32-bit index into a [`Slab`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub(crate) struct SlotId(u32);

impl SlotId {
    /// Represents "no slot" in link fields.
    pub(crate) const NULL: SlotId = SlotId(u32::MAX);

    /// The first slot of a slab, taken by [`Slab::pin`].
    pub(crate) const FIRST: SlotId = SlotId(0);

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        debug_assert!(index < MAX_SLOTS);
        Self(index as u32)
    }
}

/// Allocation policy for one arena.
///
/// `capacity` is reserved up front; `limit` caps the number of live slots.
/// Once the cap is reached further allocations fail with
/// [`AllocError::Exhausted`] until something is released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotPolicy {
    /// Slots reserved when the arena is created.
    pub capacity: usize,
    /// Maximum number of live slots, `None` for no cap.
    pub limit: Option<usize>,
}

impl SlotPolicy {
    /// Grow on demand, no cap.
    pub const fn unbounded() -> Self {
        Self {
            capacity: 0,
            limit: None,
        }
    }

    /// Reserve `capacity` slots up front, no cap.
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            limit: None,
        }
    }

    /// Cap the number of live slots at `limit`.
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Why an arena refused to hand out a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The policy's live-slot cap (or the index space) is used up.
    Exhausted {
        /// The cap that was hit.
        limit: usize,
    },
    /// The backing vector could not grow.
    Reserve(TryReserveError),
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted { limit } => write!(f, "arena exhausted ({limit} live slots)"),
            Self::Reserve(e) => write!(f, "arena growth failed: {e}"),
        }
    }
}

impl std::error::Error for AllocError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Exhausted { .. } => None,
            Self::Reserve(e) => Some(e),
        }
    }
}

/// Slot storage with a free list.
#[derive(Clone)]
pub(crate) struct Slab<T> {
    slots: Vec<Option<T>>,
    /// Vacated slots, reused LIFO.
    free: Vec<SlotId>,
    /// Occupied slots, excluding pinned ones.
    live: usize,
    /// Leading slots that are never released and not subject to the policy.
    pinned: usize,
    policy: SlotPolicy,
}

impl<T> Slab<T> {
    pub(crate) fn new(policy: SlotPolicy) -> Self {
        Self {
            slots: Vec::with_capacity(policy.capacity),
            free: Vec::new(),
            live: 0,
            pinned: 0,
            policy,
        }
    }

    /// Place `value` in a permanent slot that ignores the policy cap.
    ///
    /// Only valid before any regular allocation.
    pub(crate) fn pin(&mut self, value: T) -> SlotId {
        debug_assert_eq!(self.slots.len(), self.pinned);
        let id = SlotId::from_index(self.slots.len());
        self.slots.push(Some(value));
        self.pinned += 1;
        id
    }

    /// Number of occupied slots, excluding pinned ones.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn try_alloc(&mut self, value: T) -> Result<SlotId, AllocError> {
        if let Some(limit) = self.policy.limit {
            if self.live >= limit {
                return Err(AllocError::Exhausted { limit });
            }
        }

        let id = if let Some(id) = self.free.pop() {
            debug_assert!(self.slots[id.index()].is_none());
            self.slots[id.index()] = Some(value);
            id
        } else {
            if self.slots.len() >= MAX_SLOTS {
                return Err(AllocError::Exhausted { limit: MAX_SLOTS });
            }
            self.slots.try_reserve(1).map_err(AllocError::Reserve)?;
            let id = SlotId::from_index(self.slots.len());
            self.slots.push(Some(value));
            id
        };

        self.live += 1;
        Ok(id)
    }

    /// Vacate a slot, returning what it held.
    pub(crate) fn release(&mut self, id: SlotId) -> Option<T> {
        if id.index() < self.pinned {
            return None;
        }
        let taken = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id);
        self.live -= 1;
        Some(taken)
    }

    #[inline]
    pub(crate) fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Drop every unpinned slot. Capacity is kept.
    pub(crate) fn clear(&mut self) {
        self.slots.truncate(self.pinned);
        self.free.clear();
        self.live = 0;
    }
}

impl<T> Index<SlotId> for Slab<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: SlotId) -> &T {
        match self.get(id) {
            Some(v) => v,
            None => panic!("vacant slot {}", id.index()),
        }
    }
}

impl<T> IndexMut<SlotId> for Slab<T> {
    #[inline]
    fn index_mut(&mut self, id: SlotId) -> &mut T {
        match self.get_mut(id) {
            Some(v) => v,
            None => panic!("vacant slot {}", id.index()),
        }
    }
}
