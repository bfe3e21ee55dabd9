//! Pooled timed-effect manager.
//!
//! Owns one [`EffectPool`] per configured category and hands out
//! [`EffectHandle`]s for activations. Expired activations are reclaimed
//! by a periodic scan driven from [`EffectPoolManager::step`].
//!
//! # Example
//!
//! ```
//! use pyre_common::Vec3;
//! use pyre_effects::{EffectPoolConfig, EffectPoolManager, HeadlessBackend};
//!
//! let config = EffectPoolConfig::default();
//! let mut backend = HeadlessBackend::new();
//! for category in &config.categories {
//!     backend.register_template(category.template.clone());
//! }
//!
//! let mut manager = EffectPoolManager::new(backend);
//! manager.initialize(&config);
//!
//! let small = manager.category_by_name("fire_small").expect("configured");
//! let handle = manager
//!     .activate_at_location(small, 10.0, Vec3::ZERO, Vec3::ONE)
//!     .expect("slot available");
//!
//! manager.step(1.0 / 60.0);
//! manager.release(handle);
//! assert!(!manager.is_active(handle));
//! ```

use pyre_common::{AttachTarget, EffectCategory, EffectError, EffectHandle, EffectResult, Vec3};
use tracing::{debug, error, info, warn};

use crate::config::EffectPoolConfig;
use crate::handles::{HandleTable, SlotRef};
use crate::host::{EffectBackend, EffectHost};
use crate::pool::{EffectPool, PoolStats};
use crate::reclaim::ReclaimScheduler;
use crate::slot::EffectSlot;

type PoolOf<B> = EffectPool<<B as EffectBackend>::Host, <B as EffectBackend>::Template>;

/// Owns the effect pools, the handle table and the reclaim timer.
///
/// All calls are expected from the single simulation thread; nothing
/// here blocks or locks.
pub struct EffectPoolManager<B: EffectBackend> {
    backend: B,
    // Dense arena indexed by category id.
    pools: Vec<Option<PoolOf<B>>>,
    handles: HandleTable,
    scheduler: ReclaimScheduler,
}

impl<B: EffectBackend> std::fmt::Debug for EffectPoolManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectPoolManager")
            .field("pools", &self.pools.iter().flatten().count())
            .field("live_handles", &self.handles.len())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<B: EffectBackend> EffectPoolManager<B> {
    /// Creates a manager with no pools.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            pools: Vec::new(),
            handles: HandleTable::new(),
            scheduler: ReclaimScheduler::default(),
        }
    }

    /// Creates a manager and builds every configured pool.
    pub fn with_config(backend: B, config: &EffectPoolConfig) -> Self {
        let mut manager = Self::new(backend);
        manager.initialize(config);
        manager
    }

    // ============================================
    // Lifecycle
    // ============================================

    /// Builds all pools from `config`, replacing any existing ones.
    ///
    /// Categories whose template fails to load are skipped; their errors
    /// are returned so the caller can report the partial success.
    pub fn initialize(&mut self, config: &EffectPoolConfig) -> Vec<EffectError> {
        self.shutdown();
        self.scheduler = ReclaimScheduler::new(config.reclaim_interval_seconds);

        let mut skipped = Vec::new();
        for category in &config.categories {
            if let Err(e) = self.build_pool(
                category.category(),
                &category.name,
                &category.template,
                category.pool_size,
            ) {
                skipped.push(e);
            }
        }

        info!(
            "Effect pools initialized: {} built, {} skipped, reclaim every {:.2}s",
            self.pools.iter().flatten().count(),
            skipped.len(),
            self.scheduler.interval()
        );
        skipped
    }

    /// Builds the pool for one category, replacing the existing one.
    ///
    /// On template failure the existing pool (if any) is left untouched.
    pub fn build_pool(
        &mut self,
        category: EffectCategory,
        name: &str,
        template: &str,
        size: i32,
    ) -> EffectResult<()> {
        let resolved = match self.backend.load_template(template) {
            Ok(resolved) => resolved,
            Err(reason) => {
                return Err(reported(EffectError::TemplateLoadFailure {
                    category,
                    template: template.to_string(),
                    reason,
                }));
            },
        };

        if self.pool(category).is_some() {
            debug!("Replacing pool for {}", category);
            self.release_category(category);
            self.handles.remove_category(category);
        }

        let pool = EffectPool::build(&mut self.backend, category, name, resolved, size);
        let index = category.index();
        if self.pools.len() <= index {
            self.pools.resize_with(index + 1, || None);
        }
        self.pools[index] = Some(pool);
        Ok(())
    }

    /// Advances the reclaim timer; runs a scan when an interval elapsed.
    ///
    /// Returns the number of slots reclaimed this step.
    pub fn step(&mut self, dt: f32) -> usize {
        if self.scheduler.tick(dt) {
            self.reclaim()
        } else {
            0
        }
    }

    /// Releases every active slot and tears down all pools.
    pub fn shutdown(&mut self) {
        if self.pools.is_empty() {
            return;
        }
        let released = self.release_all();
        self.pools.clear();
        self.scheduler.reset();
        info!("Effect pools shut down ({} effects released)", released);
    }

    // ============================================
    // Activation
    // ============================================

    /// Activates an effect at a world location.
    ///
    /// `duration_seconds <= 0` keeps it active until released.
    pub fn activate_at_location(
        &mut self,
        category: EffectCategory,
        duration_seconds: f32,
        location: Vec3,
        scale: Vec3,
    ) -> EffectResult<EffectHandle> {
        let now = self.backend.now();
        let Self { pools, handles, .. } = self;

        let pool = pool_mut(pools, category)?;
        let index = acquire(pool, handles)?;
        let activated = pool
            .slot_mut(index)
            .map_or(Err(EffectError::PoolExhausted(category)), |slot| {
                slot.activate_at(location, scale, duration_seconds, now)
            });

        finish_activation(pool, handles, index, activated)
    }

    /// Activates an effect parented to `target` at `offset`.
    ///
    /// The effect follows the target while it lives and is reclaimed by
    /// the first scan after the target is destroyed.
    pub fn activate_attached(
        &mut self,
        category: EffectCategory,
        target: AttachTarget,
        duration_seconds: f32,
        offset: Vec3,
        scale: Vec3,
    ) -> EffectResult<EffectHandle> {
        if !self.is_live_target(target) {
            return Err(reported(EffectError::InvalidAttachTarget(target)));
        }

        // A frameless target must fail before anything is evicted.
        let Some(frame) = self.backend.target_frame(target) else {
            return Err(reported(EffectError::InvalidAttachTarget(target)));
        };
        let now = self.backend.now();
        let Self { pools, handles, .. } = self;

        let pool = pool_mut(pools, category)?;
        let index = acquire(pool, handles)?;
        let activated = pool
            .slot_mut(index)
            .map_or(Err(EffectError::PoolExhausted(category)), |slot| {
                slot.activate_attached(target, frame, offset, scale, duration_seconds, now)
            });

        finish_activation(pool, handles, index, activated)
    }

    /// Attaches an active effect to `target` at `offset`.
    pub fn attach(
        &mut self,
        handle: EffectHandle,
        target: AttachTarget,
        offset: Vec3,
    ) -> EffectResult<()> {
        if !self.is_live_target(target) {
            return Err(reported(EffectError::InvalidAttachTarget(target)));
        }
        let slot_ref = self
            .handles
            .get(handle)
            .ok_or_else(|| reported(EffectError::UnknownHandle(handle)))?;
        let frame = self
            .backend
            .target_frame(target)
            .ok_or_else(|| reported(EffectError::InvalidAttachTarget(target)))?;

        let slot = pool_mut(&mut self.pools, slot_ref.category)?
            .slot_mut(slot_ref.index)
            .ok_or_else(|| reported(EffectError::UnknownHandle(handle)))?;
        slot.attach(target, frame, offset);
        debug!("Attached effect {} to {}", handle, target);
        Ok(())
    }

    /// [`activate_at_location`](Self::activate_at_location), returning
    /// [`EffectHandle::NULL`] on failure.
    pub fn activate_at_location_or_null(
        &mut self,
        category: EffectCategory,
        duration_seconds: f32,
        location: Vec3,
        scale: Vec3,
    ) -> EffectHandle {
        self.activate_at_location(category, duration_seconds, location, scale)
            .unwrap_or(EffectHandle::NULL)
    }

    /// [`activate_attached`](Self::activate_attached), returning
    /// [`EffectHandle::NULL`] on failure.
    pub fn activate_attached_or_null(
        &mut self,
        category: EffectCategory,
        target: AttachTarget,
        duration_seconds: f32,
        offset: Vec3,
        scale: Vec3,
    ) -> EffectHandle {
        self.activate_attached(category, target, duration_seconds, offset, scale)
            .unwrap_or(EffectHandle::NULL)
    }

    // ============================================
    // Release
    // ============================================

    /// Releases an activation. Unknown or already released handles are ignored.
    pub fn release(&mut self, handle: EffectHandle) {
        let Some(slot_ref) = self.handles.remove(handle) else {
            debug!("Release of unknown effect handle {} ignored", handle);
            return;
        };
        let pool = self
            .pools
            .get_mut(slot_ref.category.index())
            .and_then(Option::as_mut);
        if let Some(pool) = pool {
            let released = pool.release(slot_ref.index);
            debug_assert_eq!(released, Some(handle), "slot bound to a different handle");
        }
    }

    /// Releases every active effect in every pool.
    ///
    /// Returns the number of slots released.
    pub fn release_all(&mut self) -> usize {
        let categories: Vec<_> = self.categories().collect();
        let released: usize = categories
            .into_iter()
            .map(|category| self.release_category(category))
            .sum();
        self.handles.clear();
        released
    }

    /// Runs one reclaim scan now.
    ///
    /// Returns the number of slots released.
    pub fn reclaim(&mut self) -> usize {
        let now = self.backend.now();
        let Self {
            backend,
            pools,
            handles,
            ..
        } = self;

        let mut reclaimed = 0;
        for pool in pools.iter_mut().flatten() {
            let expired = pool.collect_expired(now, |target| backend.is_valid(target));
            for index in expired {
                if let Some(handle) = pool.release(index) {
                    handles.remove(handle);
                }
                reclaimed += 1;
            }
        }

        if reclaimed > 0 {
            debug!("Reclaimed {} expired effects at t={:.2}", reclaimed, now);
        }
        reclaimed
    }

    // ============================================
    // Queries
    // ============================================

    /// Whether `handle` refers to a live activation.
    #[must_use]
    pub fn is_active(&self, handle: EffectHandle) -> bool {
        self.handles.contains(handle)
    }

    /// Slot currently bound to `handle`.
    #[must_use]
    pub fn slot_of(&self, handle: EffectHandle) -> Option<SlotRef> {
        self.handles.get(handle)
    }

    /// Host object rendering `handle`.
    #[must_use]
    pub fn host(&self, handle: EffectHandle) -> Option<&B::Host> {
        let slot_ref = self.handles.get(handle)?;
        self.pool(slot_ref.category)?
            .slot(slot_ref.index)
            .map(EffectSlot::host)
    }

    /// Number of live handles across all pools.
    #[must_use]
    pub fn live_handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Active slots in `category` (0 if not configured).
    #[must_use]
    pub fn active_count(&self, category: EffectCategory) -> usize {
        self.pool(category).map_or(0, EffectPool::active_count)
    }

    /// Occupancy snapshot of `category`.
    #[must_use]
    pub fn stats(&self, category: EffectCategory) -> Option<PoolStats> {
        self.pool(category).map(EffectPool::stats)
    }

    /// Pool serving `category`.
    #[must_use]
    pub fn pool(&self, category: EffectCategory) -> Option<&PoolOf<B>> {
        self.pools.get(category.index()).and_then(Option::as_ref)
    }

    /// Configured categories in id order.
    pub fn categories(&self) -> impl Iterator<Item = EffectCategory> + '_ {
        self.pools.iter().flatten().map(EffectPool::category)
    }

    /// Category configured under `name`.
    #[must_use]
    pub fn category_by_name(&self, name: &str) -> Option<EffectCategory> {
        self.pools
            .iter()
            .flatten()
            .find(|pool| pool.name() == name)
            .map(EffectPool::category)
    }

    /// Seconds between reclaim scans.
    #[must_use]
    pub const fn reclaim_interval(&self) -> f32 {
        self.scheduler.interval()
    }

    /// Changes the time between reclaim scans (clamped to the accepted range).
    pub fn set_reclaim_interval(&mut self, seconds: f32) {
        self.scheduler.set_interval(seconds);
        debug!("Reclaim interval set to {:.2}s", self.scheduler.interval());
    }

    /// The engine backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The engine backend, mutably (tests and headless drivers move time and actors).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn is_live_target(&self, target: AttachTarget) -> bool {
        !target.is_null() && self.backend.is_valid(target)
    }

    fn release_category(&mut self, category: EffectCategory) -> usize {
        let Some(pool) = self.pools.get_mut(category.index()).and_then(Option::as_mut) else {
            return 0;
        };
        let active: Vec<_> = pool.active_indices().collect();
        for &index in &active {
            if let Some(handle) = pool.release(index) {
                self.handles.remove(handle);
            }
        }
        active.len()
    }
}

fn pool_mut<H, T>(
    pools: &mut [Option<EffectPool<H, T>>],
    category: EffectCategory,
) -> EffectResult<&mut EffectPool<H, T>> {
    pools
        .get_mut(category.index())
        .and_then(Option::as_mut)
        .ok_or_else(|| reported(EffectError::CategoryNotConfigured(category)))
}

fn acquire<H: EffectHost, T>(
    pool: &mut EffectPool<H, T>,
    handles: &mut HandleTable,
) -> EffectResult<usize> {
    let acquired = pool
        .acquire()
        .ok_or_else(|| reported(EffectError::PoolExhausted(pool.category())))?;
    if let Some(evicted) = acquired.evicted {
        handles.remove(evicted);
        debug!("Evicted effect {} from {}", evicted, pool.category());
    }
    Ok(acquired.index)
}

fn finish_activation<H: EffectHost, T>(
    pool: &mut EffectPool<H, T>,
    handles: &mut HandleTable,
    index: usize,
    activated: EffectResult<()>,
) -> EffectResult<EffectHandle> {
    if let Err(e) = activated {
        pool.return_unused(index);
        return Err(reported(e));
    }

    let handle = handles.issue(SlotRef {
        category: pool.category(),
        index,
    });
    if let Some(slot) = pool.slot_mut(index) {
        slot.bind(handle);
    }
    pool.record_activation();
    Ok(handle)
}

/// Logs `error` at a level matching its severity and passes it on.
fn reported(error: EffectError) -> EffectError {
    match &error {
        EffectError::UnknownHandle(_) => debug!("{error}"),
        EffectError::PoolExhausted(_) | EffectError::InvalidAttachTarget(_) => warn!("{error}"),
        _ => error!("{error}"),
    }
    error
}
