//! The per-frame modifier pipeline.
//!
//! A modifier is a stateless-per-call operator applied to a whole group once
//! per frame. Modifiers run in ascending priority order; ties keep
//! registration order. The five fixed bands give the catalog a
//! deterministic layout: position < force < collision < friction < check.
//!
//! A modifier may request a [`DataSet`] for per-particle state it needs
//! beyond the base record, and an init hook run once per particle at
//! creation. Side effects are limited to the group's arrays and the
//! modifier's own data set; cross-group mutation goes through actions.

use crate::dataset::DataSet;
use crate::io::{Descriptor, ImportContext};
use crate::math::Vec3;
use crate::object::ObjectBase;
use crate::particle::Particles;
use rand::rngs::StdRng;
use std::cell::RefCell;
use std::rc::Rc;

/// Runs before everything else; repositioning passes.
pub const PRIORITY_POSITION: u32 = 10;
/// Velocity-changing forces (gravity, wind, turbulence).
pub const PRIORITY_FORCE: u32 = 20;
/// Collision response, after forces have settled the frame's velocity.
pub const PRIORITY_COLLISION: u32 = 30;
/// Damping applied to the post-collision velocity.
pub const PRIORITY_FRICTION: u32 = 40;
/// Last-chance checks (kill conditions, clamps).
pub const PRIORITY_CHECK: u32 = 50;

pub type ModifierRef = Rc<RefCell<dyn Modifier>>;

/// State shared by every modifier: identity, activity and transform policy.
#[derive(Clone, Debug)]
pub struct ModifierBase {
    pub object: ObjectBase,
    /// Inactive modifiers are skipped by the per-frame pass but keep their
    /// state, so they can be resumed.
    pub active: bool,
    /// A local modifier follows the owning system's transform; a non-local
    /// one is positioned independently.
    pub local_to_system: bool,
}

impl Default for ModifierBase {
    fn default() -> Self {
        Self {
            object: ObjectBase::default(),
            active: true,
            local_to_system: false,
        }
    }
}

impl ModifierBase {
    /// Parent-level import; concrete modifiers call this first.
    pub fn import_from(&mut self, descriptor: &Descriptor) {
        self.object.import_from(descriptor);
        match descriptor.get_bool("active") {
            Ok(Some(active)) => self.active = active,
            Ok(None) => {}
            Err(err) => tracing::warn!("Modifier: skipping attribute: {err}"),
        }
        match descriptor.get_bool("local to system") {
            Ok(Some(local)) => self.local_to_system = local,
            Ok(None) => {}
            Err(err) => tracing::warn!("Modifier: skipping attribute: {err}"),
        }
    }

    /// Parent-level export; omits defaults.
    pub fn export_into(&self, descriptor: &mut Descriptor) {
        self.object.export_into(descriptor);
        descriptor.set_non_default("active", self.active, self.active);
        descriptor.set_non_default("local to system", self.local_to_system, !self.local_to_system);
    }
}

/// A whole-group operator run once per frame.
pub trait Modifier {
    /// Registry identifier of the concrete type.
    fn type_id(&self) -> &'static str;

    fn base(&self) -> &ModifierBase;
    fn base_mut(&mut self) -> &mut ModifierBase;

    /// Priority band; smaller runs earlier. Fixed per concrete type.
    fn priority(&self) -> u32;

    /// Whether the group must allocate a data set for this modifier.
    fn needs_dataset(&self) -> bool {
        false
    }

    /// Builds this modifier's data set, sized to the group capacity. Only
    /// called when [`Modifier::needs_dataset`] returns true.
    fn create_dataset(&self, capacity: usize) -> DataSet {
        DataSet::new(capacity)
    }

    /// Whether [`Modifier::init`] must run for each created particle.
    fn wants_init(&self) -> bool {
        false
    }

    /// Per-particle creation hook.
    fn init(
        &self,
        index: usize,
        particles: &mut Particles,
        dataset: Option<&mut DataSet>,
        rng: &mut StdRng,
    ) {
        let _ = (index, particles, dataset, rng);
    }

    /// The per-frame pass over the whole group.
    fn modify(&self, particles: &mut Particles, dataset: Option<&mut DataSet>, dt: f32);

    /// Invoked when the owning system moves, for local-to-system modifiers.
    fn update_transform(&mut self, system_position: Vec3) {
        let _ = system_position;
    }

    fn import(&mut self, descriptor: &Descriptor, ctx: &mut ImportContext);

    fn export(&self) -> Descriptor;

    fn is_active(&self) -> bool {
        self.base().active
    }

    /// Removes the modifier from the per-frame pass without removing it
    /// from the group; its data set and state are kept.
    fn set_active(&mut self, active: bool) {
        self.base_mut().active = active;
    }

    fn is_local_to_system(&self) -> bool {
        self.base().local_to_system
    }

    fn set_local_to_system(&mut self, local: bool) {
        self.base_mut().local_to_system = local;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_round_trip_omits_defaults() {
        let mut base = ModifierBase::default();
        let mut desc = Descriptor::new();
        base.export_into(&mut desc);
        assert!(desc.is_empty());

        base.active = false;
        base.local_to_system = true;
        let mut desc = Descriptor::new();
        base.export_into(&mut desc);

        let mut restored = ModifierBase::default();
        restored.import_from(&desc);
        assert!(!restored.active);
        assert!(restored.local_to_system);
    }

    #[test]
    fn test_priority_bands_are_ordered() {
        assert!(PRIORITY_POSITION < PRIORITY_FORCE);
        assert!(PRIORITY_FORCE < PRIORITY_COLLISION);
        assert!(PRIORITY_COLLISION < PRIORITY_FRICTION);
        assert!(PRIORITY_FRICTION < PRIORITY_CHECK);
    }
}
