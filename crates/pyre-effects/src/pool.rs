//! Fixed-capacity pool of effect slots for one category.
//!
//! Free slots are kept on a LIFO free list so the most recently released
//! slot is reused first. When the free list is empty the oldest active
//! slot is evicted instead of rejecting the request.

use pyre_common::{AttachTarget, EffectCategory, EffectHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::host::{EffectBackend, EffectHost};
use crate::slot::EffectSlot;

/// Smallest pool a category can be configured with.
pub const MIN_POOL_SIZE: i32 = 1;

/// Result of acquiring a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiredSlot {
    /// Index of the acquired slot
    pub index: usize,
    /// Handle of the activation that was evicted to make room
    pub evicted: Option<EffectHandle>,
}

/// Snapshot of a pool's occupancy and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of slots
    pub capacity: usize,
    /// Slots currently active
    pub active: usize,
    /// Slots on the free list
    pub free: usize,
    /// Forced reclaims of the oldest active slot
    pub evictions: u64,
    /// Successful activations
    pub activations: u64,
}

/// Pool of slots sharing one template.
#[derive(Debug)]
pub struct EffectPool<H, T> {
    category: EffectCategory,
    name: String,
    template: T,
    slots: Vec<EffectSlot<H>>,
    free_list: Vec<usize>,
    evictions: u64,
    activations: u64,
}

impl<H: EffectHost, T> EffectPool<H, T> {
    /// Builds a pool of `size` dormant slots (clamped to [`MIN_POOL_SIZE`]).
    ///
    /// Hosts that fail to be created are skipped, leaving a smaller pool.
    pub fn build<B>(
        backend: &mut B,
        category: EffectCategory,
        name: impl Into<String>,
        template: T,
        size: i32,
    ) -> Self
    where
        B: EffectBackend<Host = H, Template = T>,
    {
        let name = name.into();
        let size = size.max(MIN_POOL_SIZE) as usize;
        let mut slots = Vec::with_capacity(size);
        let mut free_list = Vec::with_capacity(size);

        for _ in 0..size {
            match backend.create_host(&template) {
                Ok(host) => {
                    free_list.push(slots.len());
                    slots.push(EffectSlot::new(host));
                },
                Err(e) => {
                    error!("Pool '{}': failed to create host object: {}", name, e);
                },
            }
        }

        if slots.len() < size {
            error!(
                "Pool '{}' built with {} of {} requested slots",
                name,
                slots.len(),
                size
            );
        } else {
            debug!("Built pool '{}' ({}) with {} slots", name, category, size);
        }

        Self {
            category,
            name,
            template,
            slots,
            free_list,
            evictions: 0,
            activations: 0,
        }
    }

    /// Category served by this pool.
    #[must_use]
    pub const fn category(&self) -> EffectCategory {
        self.category
    }

    /// Configured name of the category.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template the hosts were created from.
    #[must_use]
    pub const fn template(&self) -> &T {
        &self.template
    }

    /// Number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active slots.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_active()).count()
    }

    /// Dormant slot indices, in reuse order (last is reused first).
    #[must_use]
    pub fn free_indices(&self) -> &[usize] {
        &self.free_list
    }

    /// Indices of the active slots, ascending.
    pub fn active_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(index, _)| index)
    }

    /// Slot at `index`.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&EffectSlot<H>> {
        self.slots.get(index)
    }

    /// Mutable slot at `index`.
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut EffectSlot<H>> {
        self.slots.get_mut(index)
    }

    /// Takes a dormant slot, evicting the oldest active one if none is free.
    ///
    /// Free slots whose host died are passed over and stay on the free
    /// list. Returns `None` when there is neither a usable free slot nor an
    /// active one to evict.
    pub fn acquire(&mut self) -> Option<AcquiredSlot> {
        let slots = &self.slots;
        let usable = self
            .free_list
            .iter()
            .rposition(|&index| slots[index].host().is_alive());
        if let Some(position) = usable {
            let index = self.free_list.remove(position);
            return Some(AcquiredSlot {
                index,
                evicted: None,
            });
        }

        let index = self.find_oldest_active()?;
        warn!("Pool '{}': pool exhausted, evicting oldest effect", self.name);
        self.evictions += 1;
        let evicted = self.slots[index].make_dormant();
        Some(AcquiredSlot { index, evicted })
    }

    /// Puts back a slot taken by [`acquire`](Self::acquire) that was never activated.
    pub fn return_unused(&mut self, index: usize) {
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };
        if slot.is_active() || self.free_list.contains(&index) {
            return;
        }
        slot.make_dormant();
        self.free_list.push(index);
    }

    /// Releases an active slot back to the free list.
    ///
    /// Returns the handle that was bound to it. Releasing a dormant slot
    /// does nothing.
    pub fn release(&mut self, index: usize) -> Option<EffectHandle> {
        let slot = self.slots.get_mut(index)?;
        if !slot.is_active() {
            return None;
        }
        let handle = slot.make_dormant();
        self.free_list.push(index);
        handle
    }

    /// Active slots whose activation is over at `now`.
    pub fn collect_expired(
        &self,
        now: f64,
        is_target_valid: impl Fn(AttachTarget) -> bool,
    ) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.should_expire(now, &is_target_valid))
            .map(|(index, _)| index)
            .collect()
    }

    /// Counts a successful activation.
    pub fn record_activation(&mut self) {
        self.activations += 1;
    }

    /// Occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity(),
            active: self.active_count(),
            free: self.free_list.len(),
            evictions: self.evictions,
            activations: self.activations,
        }
    }

    /// Oldest active slot; ties go to the lowest index.
    fn find_oldest_active(&self) -> Option<usize> {
        let mut oldest: Option<(usize, f64)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.is_active() {
                continue;
            }
            match oldest {
                Some((_, time)) if slot.activated_at() >= time => {},
                _ => oldest = Some((index, slot.activated_at())),
            }
        }
        oldest.map(|(index, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessBackend, HeadlessHost};
    use pyre_common::Vec3;

    const FIRE: EffectCategory = EffectCategory::new(0);

    fn pool(backend: &mut HeadlessBackend, size: i32) -> EffectPool<HeadlessHost, String> {
        let template = backend.load_template("fx/fire").expect("template registered");
        EffectPool::build(backend, FIRE, "fire", template, size)
    }

    fn backend() -> HeadlessBackend {
        let mut backend = HeadlessBackend::new();
        backend.register_template("fx/fire");
        backend
    }

    fn activate(pool: &mut EffectPool<HeadlessHost, String>, now: f64) -> AcquiredSlot {
        let acquired = pool.acquire().expect("slot available");
        pool.slot_mut(acquired.index)
            .expect("valid index")
            .activate_at(Vec3::ZERO, Vec3::ONE, 0.0, now)
            .expect("activation succeeds");
        acquired
    }

    #[test]
    fn test_build_clamps_size() {
        let mut backend = backend();
        let pool = pool(&mut backend, -4);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.free_indices(), &[0]);
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut backend = backend();
        let mut pool = pool(&mut backend, 3);

        let first = activate(&mut pool, 0.0);
        assert_eq!(first.index, 2);

        pool.release(first.index);
        let again = activate(&mut pool, 1.0);
        assert_eq!(again.index, first.index);
    }

    #[test]
    fn test_evicts_oldest_when_exhausted() {
        let mut backend = backend();
        let mut pool = pool(&mut backend, 2);

        let a = activate(&mut pool, 0.0);
        pool.slot_mut(a.index).expect("valid").bind(EffectHandle::from_raw(1));
        let b = activate(&mut pool, 1.0);
        pool.slot_mut(b.index).expect("valid").bind(EffectHandle::from_raw(2));

        let c = pool.acquire().expect("eviction succeeds");
        assert_eq!(c.index, a.index);
        assert_eq!(c.evicted, Some(EffectHandle::from_raw(1)));
        assert_eq!(pool.stats().evictions, 1);
    }

    #[test]
    fn test_eviction_ties_go_to_lowest_index() {
        let mut backend = backend();
        let mut pool = pool(&mut backend, 3);
        for _ in 0..3 {
            activate(&mut pool, 5.0);
        }

        let evicted = pool.acquire().expect("eviction succeeds");
        assert_eq!(evicted.index, 0);
    }

    #[test]
    fn test_release_dormant_slot_is_noop() {
        let mut backend = backend();
        let mut pool = pool(&mut backend, 2);
        assert_eq!(pool.release(0), None);
        assert_eq!(pool.free_indices().len(), 2);
    }

    #[test]
    fn test_return_unused_restores_free_list() {
        let mut backend = backend();
        let mut pool = pool(&mut backend, 2);

        let acquired = pool.acquire().expect("slot available");
        assert_eq!(pool.free_indices().len(), 1);
        pool.return_unused(acquired.index);
        assert_eq!(pool.free_indices().len(), 2);

        // A second return must not duplicate the index.
        pool.return_unused(acquired.index);
        assert_eq!(pool.free_indices().len(), 2);
    }

    #[test]
    fn test_failed_host_creation_shrinks_pool() {
        let mut backend = backend();
        backend.fail_host_creation_after(2);
        let mut pool = pool(&mut backend, 4);

        assert_eq!(pool.capacity(), 2);
        assert_eq!(backend.hosts_created(), 2);
        assert_eq!(pool.template(), "fx/fire");
        activate(&mut pool, 0.0);
        activate(&mut pool, 0.0);
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let mut backend = backend();
        backend.fail_host_creation_after(0);
        let mut pool = pool(&mut backend, 3);

        assert_eq!(pool.capacity(), 0);
        assert!(pool.acquire().is_none());
    }

    #[test]
    fn test_dead_free_slot_is_passed_over() {
        let mut backend = backend();
        let mut pool = pool(&mut backend, 3);
        pool.slot_mut(2).expect("valid index").host_mut().destroy();

        for _ in 0..2 {
            let acquired = activate(&mut pool, 0.0);
            assert_ne!(acquired.index, 2);
        }
        assert_eq!(pool.free_indices(), &[2]);

        // Only the dead slot is free, so the oldest live one is evicted.
        let evicted = pool.acquire().expect("eviction succeeds");
        assert_ne!(evicted.index, 2);
        assert_eq!(pool.stats().evictions, 1);
    }

    #[test]
    fn test_all_dead_free_slots_yield_nothing() {
        let mut backend = backend();
        let mut pool = pool(&mut backend, 2);
        for index in 0..2 {
            pool.slot_mut(index).expect("valid index").host_mut().destroy();
        }

        assert!(pool.acquire().is_none());
        assert_eq!(pool.free_indices().len(), 2);
    }
}
