//! In-memory backend with no renderer.
//!
//! Hosts only record the state the pool pushes into them, actors are
//! plain transforms in a registry, and time moves when told to. Used by
//! the simulation binary and throughout the tests.

use std::collections::{HashMap, HashSet};

use pyre_common::{AttachTarget, Transform, Vec3};
use tracing::debug;

use crate::host::{EffectBackend, EffectHost};

/// Recorded state of one pooled host object.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    template: String,
    visible: bool,
    ticking: bool,
    transform: Transform,
    parent: Option<(AttachTarget, Vec3)>,
    reset_count: u32,
    alive: bool,
}

impl HeadlessHost {
    /// Creates a hidden host for `template`.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            visible: false,
            ticking: false,
            transform: Transform::IDENTITY,
            parent: None,
            reset_count: 0,
            alive: true,
        }
    }

    /// Template this host was created from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether the host is shown.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the host is ticking.
    #[must_use]
    pub const fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Last world transform applied.
    #[must_use]
    pub const fn transform(&self) -> Transform {
        self.transform
    }

    /// Parent actor and relative offset while attached.
    #[must_use]
    pub const fn parent(&self) -> Option<(AttachTarget, Vec3)> {
        self.parent
    }

    /// How many times the simulation was restarted.
    #[must_use]
    pub const fn reset_count(&self) -> u32 {
        self.reset_count
    }

    /// Simulates the host being torn down externally.
    pub fn destroy(&mut self) {
        self.alive = false;
        self.visible = false;
        self.ticking = false;
    }
}

impl EffectHost for HeadlessHost {
    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn attach_to(&mut self, target: AttachTarget, offset: Vec3) {
        self.parent = Some((target, offset));
    }

    fn detach(&mut self) {
        self.parent = None;
    }

    fn reset_simulation(&mut self) {
        self.reset_count += 1;
    }

    fn set_tick_enabled(&mut self, enabled: bool) {
        self.ticking = enabled;
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Headless engine services: templates, actors and a manual clock.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    templates: HashSet<String>,
    // `None` frame: the actor exists but has nothing to attach to.
    actors: HashMap<AttachTarget, Option<Transform>>,
    next_actor: u64,
    time: f64,
    hosts_created: usize,
    host_budget: Option<usize>,
}

impl HeadlessBackend {
    /// Creates a backend with no templates, no actors and time at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_actor: 1,
            ..Self::default()
        }
    }

    /// Makes `reference` resolvable by [`EffectBackend::load_template`].
    pub fn register_template(&mut self, reference: impl Into<String>) {
        self.templates.insert(reference.into());
    }

    /// Only the next `count` host creations succeed.
    pub fn fail_host_creation_after(&mut self, count: usize) {
        self.host_budget = Some(count);
    }

    /// Number of hosts created so far.
    #[must_use]
    pub const fn hosts_created(&self) -> usize {
        self.hosts_created
    }

    /// Spawns an actor with a reference frame.
    pub fn spawn_actor(&mut self, transform: Transform) -> AttachTarget {
        self.insert_actor(Some(transform))
    }

    /// Spawns an actor that exists but exposes no reference frame.
    pub fn spawn_frameless_actor(&mut self) -> AttachTarget {
        self.insert_actor(None)
    }

    /// Moves a live actor. Returns false for unknown actors.
    pub fn move_actor(&mut self, target: AttachTarget, location: Vec3) -> bool {
        match self.actors.get_mut(&target) {
            Some(Some(frame)) => {
                frame.location = location;
                true
            },
            _ => false,
        }
    }

    /// Destroys an actor. Effects attached to it expire on the next scan.
    pub fn despawn_actor(&mut self, target: AttachTarget) -> bool {
        let removed = self.actors.remove(&target).is_some();
        if removed {
            debug!("Despawned {}", target);
        }
        removed
    }

    /// Advances the clock by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.time += dt;
        }
    }

    /// Moves the clock to `time`; the clock never runs backwards.
    pub fn set_time(&mut self, time: f64) {
        self.time = self.time.max(time);
    }

    /// Where `host` currently is, following its parent if attached.
    #[must_use]
    pub fn world_location(&self, host: &HeadlessHost) -> Vec3 {
        match host.parent {
            Some((target, offset)) => self
                .target_frame(target)
                .map_or(host.transform.location, |frame| frame.location + offset),
            None => host.transform.location,
        }
    }

    fn insert_actor(&mut self, frame: Option<Transform>) -> AttachTarget {
        let target = AttachTarget::from_raw(self.next_actor);
        self.next_actor += 1;
        self.actors.insert(target, frame);
        target
    }
}

impl EffectBackend for HeadlessBackend {
    type Template = String;
    type Host = HeadlessHost;

    fn load_template(&mut self, reference: &str) -> Result<String, String> {
        if reference.is_empty() {
            return Err("empty template reference".to_string());
        }
        if self.templates.contains(reference) {
            Ok(reference.to_string())
        } else {
            Err(format!("template '{reference}' is not registered"))
        }
    }

    fn create_host(&mut self, template: &String) -> Result<HeadlessHost, String> {
        if let Some(budget) = self.host_budget {
            if self.hosts_created >= budget {
                return Err("host budget exhausted".to_string());
            }
        }
        self.hosts_created += 1;
        Ok(HeadlessHost::new(template.clone()))
    }

    fn is_valid(&self, target: AttachTarget) -> bool {
        !target.is_null() && self.actors.contains_key(&target)
    }

    fn target_frame(&self, target: AttachTarget) -> Option<Transform> {
        self.actors.get(&target).copied().flatten()
    }

    fn now(&self) -> f64 {
        self.time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_template_fails() {
        let mut backend = HeadlessBackend::new();
        backend.register_template("fx/fire");

        assert!(backend.load_template("fx/fire").is_ok());
        assert!(backend.load_template("fx/smoke").is_err());
        assert!(backend.load_template("").is_err());
    }

    #[test]
    fn test_actor_lifecycle() {
        let mut backend = HeadlessBackend::new();
        let actor = backend.spawn_actor(Transform::IDENTITY);

        assert!(backend.is_valid(actor));
        assert!(backend.move_actor(actor, Vec3::X));
        assert_eq!(backend.target_frame(actor).map(|f| f.location), Some(Vec3::X));

        assert!(backend.despawn_actor(actor));
        assert!(!backend.is_valid(actor));
        assert!(!backend.despawn_actor(actor));
        assert!(!backend.is_valid(AttachTarget::NULL));
    }

    #[test]
    fn test_frameless_actor_is_valid_without_frame() {
        let mut backend = HeadlessBackend::new();
        let actor = backend.spawn_frameless_actor();
        assert!(backend.is_valid(actor));
        assert!(backend.target_frame(actor).is_none());
    }

    #[test]
    fn test_attached_host_follows_parent() {
        let mut backend = HeadlessBackend::new();
        let actor = backend.spawn_actor(Transform::from_location(Vec3::new(5.0, 0.0, 0.0)));
        let mut host = HeadlessHost::new("fx/fire");
        host.attach_to(actor, Vec3::Z);

        assert_eq!(backend.world_location(&host), Vec3::new(5.0, 0.0, 1.0));
        backend.move_actor(actor, Vec3::new(8.0, 0.0, 0.0));
        assert_eq!(backend.world_location(&host), Vec3::new(8.0, 0.0, 1.0));
    }

    #[test]
    fn test_clock_is_monotonic() {
        let mut backend = HeadlessBackend::new();
        backend.advance(2.0);
        backend.set_time(1.0);
        assert!((backend.now() - 2.0).abs() < f64::EPSILON);
        backend.advance(-1.0);
        assert!((backend.now() - 2.0).abs() < f64::EPSILON);
    }
}
