//! Mapping from issued effect handles to pool slots.

use std::collections::HashMap;

use pyre_common::{EffectCategory, EffectHandle};

/// Location of a slot inside the manager's pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    /// Pool category
    pub category: EffectCategory,
    /// Slot index inside the pool
    pub index: usize,
}

/// Issues monotonically increasing handles and tracks the live ones.
///
/// Released handles are removed, never recycled, so a stale handle can
/// not alias a slot that was reused for a later activation.
#[derive(Debug)]
pub struct HandleTable {
    next: EffectHandle,
    entries: HashMap<EffectHandle, SlotRef>,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    /// Creates an empty table whose first handle is [`EffectHandle::FIRST`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            next: EffectHandle::FIRST,
            entries: HashMap::new(),
        }
    }

    /// Issues a new handle bound to `slot`.
    pub fn issue(&mut self, slot: SlotRef) -> EffectHandle {
        let handle = self.next;
        self.next = self.next.next();
        self.entries.insert(handle, slot);
        handle
    }

    /// Slot bound to `handle`.
    #[must_use]
    pub fn get(&self, handle: EffectHandle) -> Option<SlotRef> {
        self.entries.get(&handle).copied()
    }

    /// Unbinds `handle`, returning the slot it pointed at.
    pub fn remove(&mut self, handle: EffectHandle) -> Option<SlotRef> {
        self.entries.remove(&handle)
    }

    /// Whether `handle` is live.
    #[must_use]
    pub fn contains(&self, handle: EffectHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Drops every handle bound into `category`.
    pub fn remove_category(&mut self, category: EffectCategory) {
        self.entries.retain(|_, slot| slot.category != category);
    }

    /// Drops every live handle. The issue counter keeps counting.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handle is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Handle the next call to [`issue`](Self::issue) will return.
    #[must_use]
    pub const fn peek_next(&self) -> EffectHandle {
        self.next
    }
}
