//! Scripted battlefield driving the effect pools.
//!
//! Vehicles drive across the map trailing fires and radius rings, and
//! ground fires spawn at random positions. Vehicles are destroyed after
//! a while, so their attached effects must be reclaimed by the scan.

use pyre_common::{AttachTarget, EffectCategory, EffectHandle, Transform, Vec3};
use pyre_effects::{EffectPoolConfig, EffectPoolManager, HeadlessBackend, PoolStats};
use tracing::{debug, warn};

/// Fixed simulation step (60 Hz).
const FRAME_DT: f32 = 1.0 / 60.0;

/// Seconds between vehicle spawns.
const VEHICLE_SPAWN_INTERVAL: f32 = 2.0;

/// Chance per frame of a ground fire.
const GROUND_FIRE_CHANCE: f32 = 0.15;

/// Vehicle speed in world units per second.
const VEHICLE_SPEED: f32 = 250.0;

#[derive(Debug)]
struct Vehicle {
    actor: AttachTarget,
    location: Vec3,
    remaining: f32,
    ring: Option<EffectHandle>,
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct Report {
    /// Simulated seconds
    pub seconds: f32,
    /// Successful activations
    pub activations: u64,
    /// Failed activations
    pub failures: u64,
    /// Vehicles destroyed during the run
    pub vehicles_destroyed: u32,
    /// Pool stats per category, taken before shutdown
    pub pools: Vec<(String, PoolStats)>,
    /// Live handles left after shutdown
    pub leaked_handles: usize,
}

impl Report {
    /// Human readable summary, one line per entry.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{:.1}s simulated: {} activations, {} failures, {} vehicles destroyed",
            self.seconds, self.activations, self.failures, self.vehicles_destroyed
        )];
        for (name, stats) in &self.pools {
            lines.push(format!(
                "  {name:<14} capacity {:>3}  active {:>3}  free {:>3}  evictions {:>5}  activations {:>6}",
                stats.capacity, stats.active, stats.free, stats.evictions, stats.activations
            ));
        }
        lines.push(format!("Live handles after shutdown: {}", self.leaked_handles));
        lines
    }
}

/// Runs the scenario for `seconds` of simulated time.
pub fn run(config: &EffectPoolConfig, seconds: f32, seed: u64) -> Report {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut backend = HeadlessBackend::new();
    for category in &config.categories {
        backend.register_template(category.template.clone());
    }

    let mut manager = EffectPoolManager::new(backend);
    for skipped in manager.initialize(config) {
        warn!("Skipped category: {skipped}");
    }

    let fire_categories: Vec<EffectCategory> = config
        .categories
        .iter()
        .filter(|c| c.name.starts_with("fire"))
        .map(pyre_effects::CategoryConfig::category)
        .collect();
    let ring = manager.category_by_name("radius_ring");

    let mut report = Report {
        seconds,
        ..Report::default()
    };
    let mut vehicles: Vec<Vehicle> = Vec::new();
    let mut spawn_timer = 0.0_f32;
    let frames = (seconds / FRAME_DT).ceil() as u32;

    for _ in 0..frames {
        manager.backend_mut().advance(f64::from(FRAME_DT));

        spawn_timer += FRAME_DT;
        if spawn_timer >= VEHICLE_SPAWN_INTERVAL {
            spawn_timer -= VEHICLE_SPAWN_INTERVAL;
            let vehicle = spawn_vehicle(&mut manager, &mut rng, &fire_categories, ring, &mut report);
            vehicles.push(vehicle);
        }

        if !fire_categories.is_empty() && rng.f32() < GROUND_FIRE_CHANCE {
            let category = fire_categories[rng.usize(..fire_categories.len())];
            let location = Vec3::new(rng.f32() * 4000.0, rng.f32() * 4000.0, 0.0);
            let duration = 2.0 + rng.f32() * 6.0;
            let scale = Vec3::splat(0.5 + rng.f32());
            record(
                &mut report,
                manager.activate_at_location(category, duration, location, scale),
            );
        }

        drive_vehicles(&mut manager, &mut vehicles, &mut report);
        manager.step(FRAME_DT);
    }

    report.pools = manager
        .categories()
        .filter_map(|category| {
            let pool = manager.pool(category)?;
            Some((pool.name().to_string(), pool.stats()))
        })
        .collect();

    manager.shutdown();
    report.leaked_handles = manager.live_handle_count();
    report
}

fn spawn_vehicle(
    manager: &mut EffectPoolManager<HeadlessBackend>,
    rng: &mut fastrand::Rng,
    fire_categories: &[EffectCategory],
    ring: Option<EffectCategory>,
    report: &mut Report,
) -> Vehicle {
    let location = Vec3::new(0.0, rng.f32() * 4000.0, 0.0);
    let actor = manager
        .backend_mut()
        .spawn_actor(Transform::from_location(location));
    debug!("Spawned vehicle {}", actor);

    if let Some(&category) = fire_categories.last() {
        record(
            report,
            manager.activate_attached(category, actor, 0.0, Vec3::new(0.0, 0.0, 120.0), Vec3::ONE),
        );
    }

    let ring = ring.and_then(|category| {
        let result = manager.activate_attached(category, actor, 0.0, Vec3::ZERO, Vec3::splat(4.0));
        let handle = result.as_ref().ok().copied();
        record(report, result);
        handle
    });

    Vehicle {
        actor,
        location,
        remaining: 3.0 + rng.f32() * 7.0,
        ring,
    }
}

fn drive_vehicles(
    manager: &mut EffectPoolManager<HeadlessBackend>,
    vehicles: &mut Vec<Vehicle>,
    report: &mut Report,
) {
    vehicles.retain_mut(|vehicle| {
        vehicle.remaining -= FRAME_DT;
        if vehicle.remaining <= 0.0 {
            // The ring is hidden right away; the fire lingers until the next scan.
            if let Some(ring) = vehicle.ring.take() {
                manager.release(ring);
            }
            manager.backend_mut().despawn_actor(vehicle.actor);
            report.vehicles_destroyed += 1;
            return false;
        }

        vehicle.location.x += VEHICLE_SPEED * FRAME_DT;
        manager
            .backend_mut()
            .move_actor(vehicle.actor, vehicle.location);
        true
    });
}

fn record<E>(report: &mut Report, result: Result<EffectHandle, E>) {
    match result {
        Ok(_) => report.activations += 1,
        Err(_) => report.failures += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_leaves_no_live_handles() {
        let config = EffectPoolConfig::default();
        let report = run(&config, 20.0, 7);

        assert_eq!(report.leaked_handles, 0);
        assert_eq!(report.failures, 0);
        assert!(report.activations > 0);
        assert!(report.vehicles_destroyed > 0);
        for (_, stats) in &report.pools {
            assert!(stats.active <= stats.capacity);
            assert_eq!(stats.active + stats.free, stats.capacity);
        }
    }

    #[test]
    fn test_missing_template_only_drops_category() {
        let mut config = EffectPoolConfig::default();
        config.categories[1].template.clear();
        let report = run(&config, 5.0, 3);

        assert_eq!(report.pools.len(), config.categories.len() - 1);
        assert!(report.failures > 0 || report.activations > 0);
    }

    #[test]
    fn test_report_lines() {
        let report = run(&EffectPoolConfig::default(), 1.0, 1);
        let lines = report.lines();
        assert_eq!(lines.len(), report.pools.len() + 2);
        assert!(lines[0].contains("activations"));
    }
}
