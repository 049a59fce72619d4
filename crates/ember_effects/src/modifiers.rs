//! Stock modifiers.

use ember_core::dataset::DataSet;
use ember_core::io::{Descriptor, ImportContext};
use ember_core::math::Vec3;
use ember_core::modifier::{
    Modifier, ModifierBase, PRIORITY_FORCE, PRIORITY_FRICTION,
};
use ember_core::particle::Particles;
use rand::rngs::StdRng;
use rand::Rng;

/// Constant acceleration applied to every particle, independent of mass.
#[derive(Clone, Debug, Default)]
pub struct Gravity {
    base: ModifierBase,
    acceleration: Vec3,
}

impl Gravity {
    pub const TYPE_ID: &'static str = "ember.gravity";

    pub fn new(acceleration: Vec3) -> Self {
        Self {
            base: ModifierBase::default(),
            acceleration,
        }
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    pub fn set_acceleration(&mut self, acceleration: Vec3) {
        self.acceleration = acceleration;
    }
}

impl Modifier for Gravity {
    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn base(&self) -> &ModifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModifierBase {
        &mut self.base
    }

    fn priority(&self) -> u32 {
        PRIORITY_FORCE
    }

    fn modify(&self, particles: &mut Particles, _dataset: Option<&mut DataSet>, dt: f32) {
        let delta = self.acceleration * dt;
        let rows = particles.rows_mut();
        for velocity in rows.velocities.iter_mut() {
            *velocity += delta;
        }
    }

    fn import(&mut self, descriptor: &Descriptor, _ctx: &mut ImportContext) {
        self.base.import_from(descriptor);
        match descriptor.get_vec3("acceleration") {
            Ok(Some(acceleration)) => self.acceleration = acceleration,
            Ok(None) => {}
            Err(err) => tracing::warn!("Gravity: skipping attribute: {err}"),
        }
    }

    fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type(Self::TYPE_ID);
        self.base.export_into(&mut descriptor);
        descriptor.set_non_default(
            "acceleration",
            self.acceleration,
            self.acceleration == Vec3::ZERO,
        );
        descriptor
    }
}

/// Velocity damping scaled by each particle's mass: heavy particles resist
/// friction more than light ones.
#[derive(Clone, Debug, Default)]
pub struct Friction {
    base: ModifierBase,
    coefficient: f32,
}

impl Friction {
    pub const TYPE_ID: &'static str = "ember.friction";

    pub fn new(coefficient: f32) -> Self {
        Self {
            base: ModifierBase::default(),
            coefficient,
        }
    }

    pub fn coefficient(&self) -> f32 {
        self.coefficient
    }

    pub fn set_coefficient(&mut self, coefficient: f32) {
        self.coefficient = coefficient;
    }
}

impl Modifier for Friction {
    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn base(&self) -> &ModifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModifierBase {
        &mut self.base
    }

    fn priority(&self) -> u32 {
        PRIORITY_FRICTION
    }

    fn modify(&self, particles: &mut Particles, _dataset: Option<&mut DataSet>, dt: f32) {
        let rows = particles.rows_mut();
        for i in 0..rows.len() {
            // The factor never goes negative, so strong friction stops a
            // particle instead of reversing it.
            let factor = (1.0 - self.coefficient * dt / rows.masses[i]).max(0.0);
            rows.velocities[i] *= factor;
        }
    }

    fn import(&mut self, descriptor: &Descriptor, _ctx: &mut ImportContext) {
        self.base.import_from(descriptor);
        match descriptor.get_f32("coefficient") {
            Ok(Some(coefficient)) => self.coefficient = coefficient,
            Ok(None) => {}
            Err(err) => tracing::warn!("Friction: skipping attribute: {err}"),
        }
    }

    fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type(Self::TYPE_ID);
        self.base.export_into(&mut descriptor);
        descriptor.set_non_default("coefficient", self.coefficient, self.coefficient == 0.0);
        descriptor
    }
}

/// Swirling force from a cheap periodic vector field. Each particle gets a
/// random phase at birth so a burst does not drift as one block.
#[derive(Clone, Debug)]
pub struct Turbulence {
    base: ModifierBase,
    strength: f32,
    frequency: f32,
}

impl Default for Turbulence {
    fn default() -> Self {
        Self {
            base: ModifierBase::default(),
            strength: 1.0,
            frequency: 1.0,
        }
    }
}

impl Turbulence {
    pub const TYPE_ID: &'static str = "ember.turbulence";
    const PHASE: &'static str = "phase";

    pub fn new(strength: f32, frequency: f32) -> Self {
        Self {
            base: ModifierBase::default(),
            strength,
            frequency,
        }
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl Modifier for Turbulence {
    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn base(&self) -> &ModifierBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModifierBase {
        &mut self.base
    }

    fn priority(&self) -> u32 {
        PRIORITY_FORCE
    }

    fn needs_dataset(&self) -> bool {
        true
    }

    fn create_dataset(&self, capacity: usize) -> DataSet {
        let mut dataset = DataSet::new(capacity);
        dataset.add_vec3(Self::PHASE);
        dataset
    }

    fn wants_init(&self) -> bool {
        true
    }

    fn init(
        &self,
        index: usize,
        _particles: &mut Particles,
        dataset: Option<&mut DataSet>,
        rng: &mut StdRng,
    ) {
        if let Some(phases) = dataset.and_then(|d| d.vec3s_mut(Self::PHASE)) {
            phases[index] = Vec3::new(
                rng.gen::<f32>() * std::f32::consts::TAU,
                rng.gen::<f32>() * std::f32::consts::TAU,
                rng.gen::<f32>() * std::f32::consts::TAU,
            );
        }
    }

    fn modify(&self, particles: &mut Particles, dataset: Option<&mut DataSet>, dt: f32) {
        let Some(phases) = dataset.and_then(|d| d.vec3s_mut(Self::PHASE)) else {
            return;
        };
        let scale = self.strength * dt;
        let rows = particles.rows_mut();
        for i in 0..rows.len() {
            let p = rows.positions[i] * self.frequency + phases[i];
            let swirl = Vec3::new(
                p.y.sin() * p.z.cos(),
                p.z.sin() * p.x.cos(),
                p.x.sin() * p.y.cos(),
            );
            rows.velocities[i] += swirl * scale;
        }
    }

    fn import(&mut self, descriptor: &Descriptor, _ctx: &mut ImportContext) {
        self.base.import_from(descriptor);
        match descriptor.get_f32("strength") {
            Ok(Some(strength)) => self.strength = strength,
            Ok(None) => {}
            Err(err) => tracing::warn!("Turbulence: skipping attribute: {err}"),
        }
        match descriptor.get_f32("frequency") {
            Ok(Some(frequency)) => self.frequency = frequency,
            Ok(None) => {}
            Err(err) => tracing::warn!("Turbulence: skipping attribute: {err}"),
        }
    }

    fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type(Self::TYPE_ID);
        self.base.export_into(&mut descriptor);
        descriptor.set_non_default("strength", self.strength, self.strength == 1.0);
        descriptor.set_non_default("frequency", self.frequency, self.frequency == 1.0);
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::group::Group;
    use ember_core::object::new_ref;
    use ember_core::modifier::ModifierRef;

    fn group(capacity: usize) -> Group {
        let mut group = Group::new(capacity);
        group.set_seed(42);
        group.set_lifetime(100.0, 100.0);
        group
    }

    #[test]
    fn test_gravity_accelerates_velocity() {
        let mut group = group(4);
        group.add_modifier(new_ref(Gravity::new(Vec3::new(0.0, -10.0, 0.0))));
        group.spawn(1);

        group.update(0.5);
        assert_eq!(group.particles().velocity(0).y, -5.0);
        group.update(0.5);
        assert_eq!(group.particles().velocity(0).y, -10.0);
    }

    #[test]
    fn test_friction_damps_heavy_particles_less() {
        let mut group = group(4);
        group.add_modifier(new_ref(Friction::new(1.0)));
        group.spawn(2);
        group.particles_mut().set_velocity(0, Vec3::new(1.0, 0.0, 0.0));
        group.particles_mut().set_velocity(1, Vec3::new(1.0, 0.0, 0.0));
        group.particles_mut().set_mass(1, 4.0);

        group.update(0.1);
        let light = group.particles().velocity(0).x;
        let heavy = group.particles().velocity(1).x;
        assert!(light < heavy);
        assert!(heavy < 1.0);
    }

    #[test]
    fn test_strong_friction_stops_instead_of_reversing() {
        let mut group = group(4);
        group.add_modifier(new_ref(Friction::new(100.0)));
        group.spawn(1);
        group.particles_mut().set_velocity(0, Vec3::new(3.0, 0.0, 0.0));

        group.update(1.0);
        assert_eq!(group.particles().velocity(0), Vec3::ZERO);
    }

    #[test]
    fn test_gravity_runs_before_friction() {
        let mut group = group(4);
        group.add_modifier(new_ref(Friction::new(1.0)));
        group.add_modifier(new_ref(Gravity::new(Vec3::new(0.0, -10.0, 0.0))));
        group.spawn(1);

        group.update(0.1);
        // Friction sees the post-gravity velocity: (-1.0) * (1 - 0.1).
        assert!((group.particles().velocity(0).y + 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_inactive_modifier_is_skipped() {
        let gravity: ModifierRef = new_ref(Gravity::new(Vec3::new(0.0, -10.0, 0.0)));
        gravity.borrow_mut().set_active(false);
        let mut group = group(4);
        group.add_modifier(gravity);
        group.spawn(1);

        group.update(1.0);
        assert_eq!(group.particles().velocity(0), Vec3::ZERO);
    }

    #[test]
    fn test_turbulence_perturbs_velocity() {
        let mut group = group(8);
        group.add_modifier(new_ref(Turbulence::new(5.0, 2.0)));
        group.spawn(4);

        group.update(0.1);
        let moved = group.iter().filter(|p| p.velocity() != Vec3::ZERO).count();
        assert_eq!(moved, 4);
    }

    #[test]
    fn test_turbulence_phase_follows_swap_removal() {
        let turbulence: ModifierRef = new_ref(Turbulence::new(5.0, 2.0));
        let mut group = group(8);
        group.add_modifier(turbulence.clone());
        group.spawn(3);

        let before = group.dataset(&turbulence).unwrap().vec3s("phase").unwrap()[2];
        group.particles_mut().kill(0);
        group.update(0.0);

        let after = group.dataset(&turbulence).unwrap().vec3s("phase").unwrap()[0];
        assert_eq!(before, after);
    }

    #[test]
    fn test_gravity_round_trip() {
        let mut gravity = Gravity::new(Vec3::new(0.0, -9.81, 0.0));
        gravity.set_local_to_system(true);

        let registry = ember_core::io::TypeRegistry::new();
        let mut ctx = ImportContext::new(&registry);
        let mut restored = Gravity::default();
        restored.import(&gravity.export(), &mut ctx);

        assert_eq!(restored.acceleration(), gravity.acceleration());
        assert!(restored.is_local_to_system());
    }
}
