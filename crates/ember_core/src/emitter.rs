//! Emission control.
//!
//! An emitter decides how many particles a group spawns each frame (the
//! tank/flow model) and where and how fast they start (through its zone).
//!
//! The tank is the emitter's remaining budget: a negative value is the
//! "infinite" sentinel. Flow is particles per second, accumulated
//! fractionally across frames; a negative flow means "burst": the whole
//! tank is requested on the first update. Invalid combinations (an
//! infinite tank with a burst flow can never emit sensibly) are rejected
//! with a warning and the call is skipped, per the recoverable-error
//! policy.

use crate::io::{Descriptor, ImportContext};
use crate::math::Vec3;
use crate::object::{copy_child, new_ref, EmberObject, ObjectBase, Ref};
use crate::particle::Particles;
use crate::zone::{Zone, ZoneRef};
use rand::rngs::StdRng;
use rand::Rng;
use std::rc::Rc;

pub type EmitterRef = Ref<Emitter>;

/// Governs how many particles to request per frame and how to spawn them.
#[derive(Debug)]
pub struct Emitter {
    base: ObjectBase,
    active: bool,
    min_tank: i32,
    max_tank: i32,
    current_tank: i32,
    /// A finite tank with distinct bounds is drawn lazily at the first
    /// spawn, when an RNG is available.
    tank_pending: bool,
    flow: f32,
    fraction: f32,
    force_min: f32,
    force_max: f32,
    zone: ZoneRef,
    /// Spawn across the zone's volume rather than only its surface.
    full: bool,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            base: ObjectBase::default(),
            active: true,
            min_tank: -1,
            max_tank: -1,
            current_tank: -1,
            tank_pending: false,
            flow: 1.0,
            fraction: 0.0,
            force_min: 1.0,
            force_max: 1.0,
            zone: new_ref(Zone::point()),
            full: true,
        }
    }
}

impl Emitter {
    /// Emitter over a default point zone at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, zone: ZoneRef, full: bool) -> Self {
        self.set_zone(zone, full);
        self
    }

    pub fn with_flow(mut self, flow: f32) -> Self {
        self.set_flow(flow);
        self
    }

    pub fn with_tank(mut self, min: i32, max: i32) -> Self {
        self.set_tank(min, max);
        self
    }

    pub fn with_force(mut self, min: f32, max: f32) -> Self {
        self.set_force(min, max);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.base.set_name(name);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Sets the tank bounds. Any negative bound means an infinite tank;
    /// mixed signs are corrected to infinite with a warning, inverted
    /// bounds are swapped with a warning. A call that would leave an
    /// infinite tank alongside a burst flow is rejected.
    pub fn set_tank(&mut self, min: i32, max: i32) {
        let (mut min, mut max) = (min, max);
        if (min < 0) != (max < 0) {
            tracing::warn!(
                "Emitter::set_tank: bounds {min} and {max} have mixed signs, tank set to infinite"
            );
            min = -1;
            max = -1;
        }
        if min < 0 {
            min = -1;
            max = -1;
        } else if min > max {
            tracing::warn!("Emitter::set_tank: min {min} greater than max {max}, swapping");
            std::mem::swap(&mut min, &mut max);
        }
        if min < 0 && self.flow < 0.0 {
            tracing::warn!(
                "Emitter::set_tank: flow and tank cannot both be negative, call skipped"
            );
            return;
        }
        self.min_tank = min;
        self.max_tank = max;
        self.reset_tank();
    }

    /// Sets both tank bounds to the same value.
    pub fn set_tank_fixed(&mut self, tank: i32) {
        self.set_tank(tank, tank);
    }

    /// Refills the tank from its bounds. A tank with distinct bounds is
    /// re-drawn at the next spawn.
    pub fn reset_tank(&mut self) {
        if self.min_tank < 0 {
            self.current_tank = -1;
            self.tank_pending = false;
        } else {
            self.current_tank = self.max_tank;
            self.tank_pending = self.min_tank != self.max_tank;
        }
    }

    pub fn tank_bounds(&self) -> (i32, i32) {
        (self.min_tank, self.max_tank)
    }

    pub fn current_tank(&self) -> i32 {
        self.current_tank
    }

    /// Sets the flow in particles per second. Negative flow is the burst
    /// sentinel and is rejected while the tank is infinite.
    pub fn set_flow(&mut self, flow: f32) {
        if flow < 0.0 && self.min_tank < 0 {
            tracing::warn!(
                "Emitter::set_flow: flow and tank cannot both be negative, call skipped"
            );
            return;
        }
        self.flow = flow;
    }

    pub fn flow(&self) -> f32 {
        self.flow
    }

    /// Sets the speed range sampled at emission. Inverted bounds are
    /// swapped with a warning.
    pub fn set_force(&mut self, min: f32, max: f32) {
        if min <= max {
            self.force_min = min;
            self.force_max = max;
        } else {
            tracing::warn!("Emitter::set_force: min {min} greater than max {max}, swapping");
            self.force_min = max;
            self.force_max = min;
        }
    }

    pub fn force_bounds(&self) -> (f32, f32) {
        (self.force_min, self.force_max)
    }

    pub fn set_zone(&mut self, zone: ZoneRef, full: bool) {
        self.zone = zone;
        self.full = full;
    }

    pub fn zone(&self) -> &ZoneRef {
        &self.zone
    }

    pub fn is_full_zone(&self) -> bool {
        self.full
    }

    /// Whether a finite tank has run dry. An infinite tank never does.
    pub fn is_exhausted(&self) -> bool {
        !self.tank_pending && self.current_tank == 0
    }

    /// Randomizes the fractional accumulator so emitters created on the
    /// same frame do not pulse in lockstep.
    pub fn randomize_fraction(&mut self, rng: &mut StdRng) {
        self.fraction = rng.gen::<f32>();
    }

    /// Zeroes the fractional accumulator.
    pub fn reset_fraction(&mut self) {
        self.fraction = 0.0;
    }

    /// Number of particles to request this frame. Decrements a finite
    /// tank; fractions carry over to the next call and round down, so no
    /// particle is ever double-counted.
    pub fn particles_to_spawn(&mut self, dt: f32, rng: &mut StdRng) -> usize {
        if !self.active {
            return 0;
        }
        if self.tank_pending {
            self.current_tank = rng.gen_range(self.min_tank..=self.max_tank);
            self.tank_pending = false;
        }
        if self.flow < 0.0 {
            // Burst: the whole tank at once, then nothing more.
            let nb = self.current_tank.max(0);
            self.current_tank = 0;
            return nb as usize;
        }
        self.fraction += self.flow * dt;
        let mut nb = self.fraction.floor();
        self.fraction -= nb;
        if self.current_tank >= 0 {
            nb = nb.min(self.current_tank as f32);
            self.current_tank -= nb as i32;
        }
        nb as usize
    }

    /// Spawns one particle: position from the zone, velocity along the
    /// zone's outward normal with a speed drawn from the force range and
    /// divided by the particle's mass.
    pub fn emit(&self, index: usize, particles: &mut Particles, rng: &mut StdRng) {
        let zone = self.zone.borrow();
        let position = zone.sample_position(rng, self.full);
        particles.set_position(index, position);

        let force = if self.force_min < self.force_max {
            rng.gen_range(self.force_min..=self.force_max)
        } else {
            self.force_min
        };
        let speed = force / particles.mass(index);
        let direction = zone.normal_at(position, rng);
        particles.set_velocity(index, direction * speed);
    }

    /// Looks up an owned sub-object by name. Shared zones are conceptually
    /// external and are not searched.
    pub fn find_zone(&self, name: &str) -> Option<ZoneRef> {
        let zone = self.zone.borrow();
        if !zone.is_shared() && zone.name().as_deref() == Some(name) {
            drop(zone);
            Some(Rc::clone(&self.zone))
        } else {
            None
        }
    }

    pub fn import(&mut self, descriptor: &Descriptor, ctx: &mut ImportContext) {
        self.base.import_from(descriptor);

        match descriptor.get_bool("active") {
            Ok(Some(active)) => self.active = active,
            Ok(None) => {}
            Err(err) => tracing::warn!("Emitter: skipping attribute: {err}"),
        }
        match descriptor.get_i32s("tank") {
            Ok(Some(tank)) => match tank[..] {
                [both] => self.set_tank_fixed(both),
                [min, max] => self.set_tank(min, max),
                _ => tracing::warn!("Emitter: wrong number of tank bounds: {}", tank.len()),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("Emitter: skipping attribute: {err}"),
        }
        match descriptor.get_f32("flow") {
            Ok(Some(flow)) => self.set_flow(flow),
            Ok(None) => {}
            Err(err) => tracing::warn!("Emitter: skipping attribute: {err}"),
        }
        match descriptor.get_f32s("force") {
            Ok(Some(force)) => match force[..] {
                [both] => self.set_force(both, both),
                [min, max] => self.set_force(min, max),
                _ => tracing::warn!("Emitter: wrong number of force bounds: {}", force.len()),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("Emitter: skipping attribute: {err}"),
        }
        match descriptor.get_object("zone") {
            Ok(Some(zone_desc)) => {
                let mut zone = Zone::point();
                zone.import(zone_desc);
                let zone = new_ref(zone);
                if zone.borrow().is_shared() {
                    ctx.record_shared_zone(&zone);
                }
                self.zone = zone;
            }
            Ok(None) => match descriptor.get_reference("zone") {
                Ok(Some(name)) => match ctx.resolve_zone(name) {
                    Ok(zone) => self.zone = zone,
                    Err(err) => tracing::warn!("Emitter: {err}, zone kept"),
                },
                Ok(None) => {}
                Err(err) => tracing::warn!("Emitter: skipping attribute: {err}"),
            },
            Err(_) => match descriptor.get_reference("zone") {
                Ok(Some(name)) => match ctx.resolve_zone(name) {
                    Ok(zone) => self.zone = zone,
                    Err(err) => tracing::warn!("Emitter: {err}, zone kept"),
                },
                _ => tracing::warn!("Emitter: zone attribute is neither object nor reference"),
            },
        }
        match descriptor.get_bool("full") {
            Ok(Some(full)) => self.full = full,
            Ok(None) => {}
            Err(err) => tracing::warn!("Emitter: skipping attribute: {err}"),
        }
    }

    pub fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type("ember.emitter");
        self.base.export_into(&mut descriptor);
        descriptor.set_non_default("active", self.active, self.active);
        if self.min_tank >= 0 {
            descriptor.set_i32_bounds("tank", self.min_tank, self.max_tank);
        }
        descriptor.set_non_default("flow", self.flow, self.flow == 1.0);
        if self.force_min != 1.0 || self.force_max != 1.0 {
            descriptor.set_f32_bounds("force", self.force_min, self.force_max);
        }

        let zone = self.zone.borrow();
        let default_zone = zone.shape() == crate::zone::ZoneShape::Point
            && zone.position() == Vec3::ZERO
            && !zone.is_shared()
            && zone.name().is_none();
        if !default_zone {
            if zone.is_shared() {
                if let Some(name) = zone.name() {
                    descriptor.set("zone", crate::io::AttributeValue::Reference(name));
                } else {
                    tracing::warn!("Emitter: shared zone has no name, exported by value");
                    descriptor.set("zone", zone.export());
                }
            } else {
                descriptor.set("zone", zone.export());
            }
        }
        descriptor.set_non_default("full", self.full, self.full);
        descriptor
    }
}

/// Cloning deep-copies an exclusively-owned zone (a shared zone keeps its
/// identity) and resets the tank and fraction state.
impl Clone for Emitter {
    fn clone(&self) -> Self {
        let mut emitter = Self {
            base: self.base.clone(),
            active: self.active,
            min_tank: self.min_tank,
            max_tank: self.max_tank,
            current_tank: 0,
            tank_pending: false,
            flow: self.flow,
            fraction: 0.0,
            force_min: self.force_min,
            force_max: self.force_max,
            zone: copy_child(&self.zone),
            full: self.full,
        };
        emitter.reset_tank();
        emitter
    }
}

impl EmberObject for Emitter {
    fn object(&self) -> &ObjectBase {
        &self.base
    }
    fn object_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_flow_accumulates_without_double_counting() {
        let mut emitter = Emitter::new().with_flow(10.0);
        emitter.reset_fraction();
        let mut rng = rng();
        let total: usize = (0..10)
            .map(|_| emitter.particles_to_spawn(0.1, &mut rng))
            .sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn test_fractional_flow_rounds_down_per_call() {
        let mut emitter = Emitter::new().with_flow(2.5);
        emitter.reset_fraction();
        let mut rng = rng();
        assert_eq!(emitter.particles_to_spawn(0.2, &mut rng), 0);
        assert_eq!(emitter.particles_to_spawn(0.2, &mut rng), 1);
    }

    #[test]
    fn test_finite_tank_decrements_and_exhausts() {
        let mut emitter = Emitter::new().with_tank(3, 3).with_flow(100.0);
        emitter.reset_fraction();
        let mut rng = rng();
        let first = emitter.particles_to_spawn(1.0, &mut rng);
        assert_eq!(first, 3);
        assert!(emitter.is_exhausted());
        assert_eq!(emitter.particles_to_spawn(1.0, &mut rng), 0);
    }

    #[test]
    fn test_burst_emits_whole_tank_once() {
        let mut emitter = Emitter::new().with_tank(5, 5).with_flow(-1.0);
        let mut rng = rng();
        assert_eq!(emitter.particles_to_spawn(0.016, &mut rng), 5);
        assert_eq!(emitter.particles_to_spawn(0.016, &mut rng), 0);
        assert!(emitter.is_active());
    }

    #[test]
    fn test_mixed_sign_tank_corrected_to_infinite() {
        let mut emitter = Emitter::new();
        emitter.set_tank(-3, 10);
        assert_eq!(emitter.tank_bounds(), (-1, -1));
    }

    #[test]
    fn test_inverted_tank_swapped() {
        let mut emitter = Emitter::new();
        emitter.set_tank(10, 2);
        assert_eq!(emitter.tank_bounds(), (2, 10));
    }

    #[test]
    fn test_negative_flow_with_infinite_tank_rejected() {
        let mut emitter = Emitter::new();
        emitter.set_flow(-1.0);
        assert_eq!(emitter.flow(), 1.0);

        let mut emitter = Emitter::new().with_tank(5, 5).with_flow(-1.0);
        emitter.set_tank(-1, -1);
        assert_eq!(emitter.tank_bounds(), (5, 5));
    }

    #[test]
    fn test_corrected_preconditions_warn_and_continue() {
        // Capture the warnings instead of spilling them into test output.
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut emitter = Emitter::new();
        emitter.set_tank(10, 2);
        emitter.set_force(4.0, 2.0);
        emitter.set_flow(-1.0);

        assert_eq!(emitter.tank_bounds(), (2, 10));
        assert_eq!(emitter.force_bounds(), (2.0, 4.0));
        assert_eq!(emitter.flow(), 1.0);
    }

    #[test]
    fn test_inverted_force_swapped() {
        let mut emitter = Emitter::new();
        emitter.set_force(4.0, 2.0);
        assert_eq!(emitter.force_bounds(), (2.0, 4.0));
    }

    #[test]
    fn test_random_tank_drawn_within_bounds() {
        let mut emitter = Emitter::new().with_tank(2, 6).with_flow(1000.0);
        emitter.reset_fraction();
        let mut rng = rng();
        let spawned = emitter.particles_to_spawn(1.0, &mut rng);
        assert!((2..=6).contains(&spawned));
        assert!(emitter.is_exhausted());
    }

    #[test]
    fn test_emit_speed_scaled_by_mass() {
        let emitter = Emitter::new().with_force(6.0, 6.0);
        let mut particles = Particles::new(1);
        let index = particles.spawn_default().unwrap();
        particles.set_mass(index, 2.0);

        let mut rng = rng();
        emitter.emit(index, &mut particles, &mut rng);
        assert!((particles.velocity(index).length() - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_clone_resets_state_and_copies_zone() {
        let mut emitter = Emitter::new().with_tank(4, 4).with_flow(100.0);
        emitter.reset_fraction();
        let mut rng = rng();
        emitter.particles_to_spawn(1.0, &mut rng);
        assert!(emitter.is_exhausted());

        let clone = emitter.clone();
        assert_eq!(clone.current_tank(), 4);
        assert!(!Rc::ptr_eq(clone.zone(), emitter.zone()));
    }

    #[test]
    fn test_clone_shares_shared_zone() {
        let zone = new_ref(Zone::sphere(1.0).shared(true));
        let emitter = Emitter::new().with_zone(Rc::clone(&zone), true);
        let clone = emitter.clone();
        assert!(Rc::ptr_eq(clone.zone(), &zone));
    }

    #[test]
    fn test_export_round_trip() {
        let emitter = Emitter::new()
            .with_name("fountain")
            .with_zone(new_ref(Zone::sphere(0.5)), false)
            .with_tank(10, 20)
            .with_flow(50.0)
            .with_force(2.0, 3.0);

        let registry = crate::io::TypeRegistry::new();
        let mut ctx = ImportContext::new(&registry);
        let mut restored = Emitter::new();
        restored.import(&emitter.export(), &mut ctx);

        assert_eq!(restored.name().as_deref(), Some("fountain"));
        assert_eq!(restored.tank_bounds(), (10, 20));
        assert_eq!(restored.flow(), 50.0);
        assert_eq!(restored.force_bounds(), (2.0, 3.0));
        assert!(!restored.is_full_zone());
        assert_eq!(
            restored.zone().borrow().shape(),
            crate::zone::ZoneShape::Sphere { radius: 0.5 }
        );
    }

    #[test]
    fn test_default_export_is_minimal() {
        let desc = Emitter::new().export();
        assert!(desc.is_empty());
    }
}
