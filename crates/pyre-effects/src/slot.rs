//! A single reusable unit of pool capacity.

use pyre_common::{AttachTarget, EffectError, EffectHandle, EffectResult, Transform, Vec3};

use crate::host::EffectHost;

/// Activation timestamp of a dormant slot.
pub const INACTIVE_TIME_SECONDS: f64 = -1.0;

/// Where an attached slot is parented.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    /// Actor the effect follows (weak)
    pub target: AttachTarget,
    /// Offset relative to the actor's reference frame
    pub offset: Vec3,
}

/// One pre-allocated effect and its activation state.
///
/// A slot is either fully dormant (hidden, detached, not ticking, no
/// handle bound) or fully active. Both transitions go through this type
/// so no partial state survives a manager call.
#[derive(Debug)]
pub struct EffectSlot<H> {
    host: H,
    active: bool,
    activated_at: f64,
    duration_seconds: f32,
    attachment: Option<Attachment>,
    requested_scale: Vec3,
    bound_handle: Option<EffectHandle>,
}

impl<H: EffectHost> EffectSlot<H> {
    /// Wraps a freshly created host and puts it to sleep.
    pub fn new(host: H) -> Self {
        let mut slot = Self {
            host,
            active: false,
            activated_at: INACTIVE_TIME_SECONDS,
            duration_seconds: 0.0,
            attachment: None,
            requested_scale: Vec3::ONE,
            bound_handle: None,
        };
        slot.make_dormant();
        slot
    }

    /// Returns the slot to its dormant configuration.
    ///
    /// Returns the handle that was bound to the slot, if any.
    pub fn make_dormant(&mut self) -> Option<EffectHandle> {
        self.host.set_tick_enabled(false);
        self.host.set_visible(false);
        self.host.detach();

        self.active = false;
        self.activated_at = INACTIVE_TIME_SECONDS;
        self.duration_seconds = 0.0;
        self.attachment = None;
        self.bound_handle.take()
    }

    /// Activates the slot at a fixed world location.
    pub fn activate_at(
        &mut self,
        location: Vec3,
        scale: Vec3,
        duration_seconds: f32,
        now: f64,
    ) -> EffectResult<()> {
        self.ensure_host_alive()?;

        self.host.detach();
        self.host
            .set_transform(Transform::from_location(location).with_scale(scale));
        self.wake();

        self.mark_active(duration_seconds, scale, now);
        self.attachment = None;
        Ok(())
    }

    /// Activates the slot parented to `target`, whose current frame is `frame`.
    ///
    /// Scale is applied in world space and never inherits the target's scale.
    pub fn activate_attached(
        &mut self,
        target: AttachTarget,
        frame: Transform,
        offset: Vec3,
        scale: Vec3,
        duration_seconds: f32,
        now: f64,
    ) -> EffectResult<()> {
        self.ensure_host_alive()?;

        self.place_attached(target, frame, offset, scale);
        self.wake();

        self.mark_active(duration_seconds, scale, now);
        self.attachment = Some(Attachment { target, offset });
        Ok(())
    }

    /// Re-parents an already active slot to a new target.
    pub fn attach(&mut self, target: AttachTarget, frame: Transform, offset: Vec3) {
        let scale = self.requested_scale;
        self.place_attached(target, frame, offset, scale);
        self.attachment = Some(Attachment { target, offset });
    }

    /// Binds the handle issued for the current activation.
    pub fn bind(&mut self, handle: EffectHandle) {
        self.bound_handle = Some(handle);
    }

    /// Whether the current activation is over at `now`.
    ///
    /// A dead attach target expires the slot regardless of its duration.
    pub fn should_expire(&self, now: f64, is_target_valid: impl Fn(AttachTarget) -> bool) -> bool {
        if !self.active {
            return false;
        }
        if let Some(attachment) = self.attachment {
            if !is_target_valid(attachment.target) {
                return true;
            }
        }
        if self.duration_seconds <= 0.0 {
            return false;
        }
        now - self.activated_at >= f64::from(self.duration_seconds)
    }

    /// Whether the slot is currently active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Activation timestamp, [`INACTIVE_TIME_SECONDS`] when dormant.
    #[must_use]
    pub const fn activated_at(&self) -> f64 {
        self.activated_at
    }

    /// Requested lifetime; `<= 0` means until released.
    #[must_use]
    pub const fn duration_seconds(&self) -> f32 {
        self.duration_seconds
    }

    /// Current attachment, if any.
    #[must_use]
    pub const fn attachment(&self) -> Option<Attachment> {
        self.attachment
    }

    /// Last applied scale.
    #[must_use]
    pub const fn requested_scale(&self) -> Vec3 {
        self.requested_scale
    }

    /// Handle bound to the current activation.
    #[must_use]
    pub const fn bound_handle(&self) -> Option<EffectHandle> {
        self.bound_handle
    }

    /// The owned host object.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    #[cfg(test)]
    pub(crate) fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn ensure_host_alive(&self) -> EffectResult<()> {
        if self.host.is_alive() {
            Ok(())
        } else {
            Err(EffectError::HostUnavailable(
                "pooled host object was destroyed".to_string(),
            ))
        }
    }

    fn place_attached(&mut self, target: AttachTarget, frame: Transform, offset: Vec3, scale: Vec3) {
        let world = frame.offset_by(offset);
        self.host.detach();
        self.host
            .set_transform(Transform::from_location(world.location).with_scale(scale));
        self.host.attach_to(target, offset);
    }

    fn wake(&mut self) {
        self.host.set_tick_enabled(true);
        self.host.set_visible(true);
        self.host.reset_simulation();
    }

    fn mark_active(&mut self, duration_seconds: f32, scale: Vec3, now: f64) {
        self.active = true;
        self.activated_at = now;
        self.duration_seconds = duration_seconds;
        self.requested_scale = scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessHost;

    fn slot() -> EffectSlot<HeadlessHost> {
        EffectSlot::new(HeadlessHost::new("fx/fire_small"))
    }

    #[test]
    fn test_new_slot_is_dormant() {
        let slot = slot();
        assert!(!slot.is_active());
        assert!(!slot.host().is_visible());
        assert!(!slot.host().is_ticking());
        assert!((slot.activated_at() - INACTIVE_TIME_SECONDS).abs() < f64::EPSILON);
    }

    #[test]
    fn test_activate_at_applies_placement() {
        let mut slot = slot();
        slot.activate_at(Vec3::new(1.0, 2.0, 3.0), Vec3::splat(2.0), 5.0, 10.0)
            .expect("activation should succeed");

        assert!(slot.is_active());
        assert!(slot.host().is_visible());
        assert!(slot.host().is_ticking());
        assert_eq!(slot.host().reset_count(), 1);
        assert_eq!(slot.host().transform().location, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(slot.host().transform().scale, Vec3::splat(2.0));
        assert_eq!(slot.requested_scale(), Vec3::splat(2.0));
        assert!((slot.duration_seconds() - 5.0).abs() < f32::EPSILON);
        assert!((slot.activated_at() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duration_expiry() {
        let mut slot = slot();
        slot.activate_at(Vec3::ZERO, Vec3::ONE, 10.0, 1.0)
            .expect("activation should succeed");

        assert!(!slot.should_expire(10.9, |_| true));
        assert!(slot.should_expire(11.0, |_| true));
    }

    #[test]
    fn test_non_positive_duration_never_expires() {
        let mut slot = slot();
        slot.activate_at(Vec3::ZERO, Vec3::ONE, 0.0, 0.0)
            .expect("activation should succeed");
        assert!(!slot.should_expire(1.0e6, |_| true));
    }

    #[test]
    fn test_dead_target_expires_before_duration() {
        let mut slot = slot();
        let target = AttachTarget::from_raw(7);
        slot.activate_attached(target, Transform::IDENTITY, Vec3::Z, Vec3::ONE, 100.0, 0.0)
            .expect("activation should succeed");

        assert!(!slot.should_expire(1.0, |_| true));
        assert!(slot.should_expire(1.0, |_| false));
    }

    #[test]
    fn test_reattach_keeps_requested_scale() {
        let mut slot = slot();
        slot.activate_at(Vec3::ZERO, Vec3::splat(3.0), 0.0, 0.0)
            .expect("activation should succeed");

        let target = AttachTarget::from_raw(4);
        let frame = Transform::from_location(Vec3::new(5.0, 0.0, 0.0));
        slot.attach(target, frame, Vec3::Z);

        assert_eq!(slot.host().transform().location, Vec3::new(5.0, 0.0, 1.0));
        assert_eq!(slot.host().transform().scale, slot.requested_scale());
        assert_eq!(slot.attachment().map(|a| a.target), Some(target));
    }

    #[test]
    fn test_make_dormant_clears_attachment_and_handle() {
        let mut slot = slot();
        let target = AttachTarget::from_raw(3);
        slot.activate_attached(target, Transform::IDENTITY, Vec3::X, Vec3::ONE, 0.0, 0.0)
            .expect("activation should succeed");
        slot.bind(EffectHandle::from_raw(9));

        assert_eq!(slot.make_dormant(), Some(EffectHandle::from_raw(9)));
        assert!(slot.attachment().is_none());
        assert!(slot.host().parent().is_none());
        assert!(!slot.host().is_visible());
        assert_eq!(slot.bound_handle(), None);
    }

    #[test]
    fn test_dead_host_refuses_activation() {
        let mut host = HeadlessHost::new("fx/fire_small");
        host.destroy();
        let mut slot = EffectSlot::new(host);

        let result = slot.activate_at(Vec3::ZERO, Vec3::ONE, 1.0, 0.0);
        assert!(matches!(result, Err(EffectError::HostUnavailable(_))));
        assert!(!slot.is_active());
    }
}
