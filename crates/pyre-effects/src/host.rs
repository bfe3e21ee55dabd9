//! Capabilities the effect pools consume from the hosting engine.
//!
//! The pools never render or simulate anything themselves. They toggle
//! host objects created by an [`EffectBackend`] between a dormant and an
//! active configuration, and ask the backend about time and about the
//! liveness of attach targets.

use pyre_common::{AttachTarget, Transform, Vec3};

/// A renderable/simulated object owned by exactly one pool slot.
pub trait EffectHost {
    /// Shows or hides the object (and its children).
    fn set_visible(&mut self, visible: bool);

    /// Places the object in world space.
    fn set_transform(&mut self, transform: Transform);

    /// Parents the object to `target` at a relative `offset`.
    fn attach_to(&mut self, target: AttachTarget, offset: Vec3);

    /// Removes any parenting, keeping the current world placement.
    fn detach(&mut self);

    /// Restarts the object's internal simulation from scratch.
    fn reset_simulation(&mut self);

    /// Enables or disables per-frame updates.
    fn set_tick_enabled(&mut self, enabled: bool);

    /// Returns false once the object was torn down behind the pool's back.
    fn is_alive(&self) -> bool {
        true
    }
}

/// Engine services used by the pool manager.
pub trait EffectBackend {
    /// Resolved template a pool creates its hosts from.
    type Template;
    /// Host object type owned by the slots.
    type Host: EffectHost;

    /// Resolves a template reference from configuration.
    fn load_template(&mut self, reference: &str) -> Result<Self::Template, String>;

    /// Instantiates one dormant-ready host object from a template.
    fn create_host(&mut self, template: &Self::Template) -> Result<Self::Host, String>;

    /// Liveness check for an attach target.
    fn is_valid(&self, target: AttachTarget) -> bool;

    /// Current reference frame of a live target, `None` if it has none.
    fn target_frame(&self, target: AttachTarget) -> Option<Transform>;

    /// Monotonic session time in seconds.
    fn now(&self) -> f64;
}
