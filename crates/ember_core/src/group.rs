//! Particle groups.
//!
//! A group owns one particle pool plus the catalog objects that drive it:
//! emitters, initializers, a priority-ordered modifier pipeline and an
//! optional death action. `update` runs the whole per-frame cycle for the
//! group; cross-group effects are queued as action invocations and drained
//! by the owning system.

use crate::action::{ActionInvocation, ActionRef};
use crate::dataset::DataSet;
use crate::emitter::{Emitter, EmitterRef};
use crate::initializer::InitializerRef;
use crate::io::{AttributeValue, Descriptor, ImportContext};
use crate::iter::ParticleIter;
use crate::modifier::ModifierRef;
use crate::object::{new_ref, EmberObject, ObjectBase};
use crate::particle::Particles;
use crate::zone::ZoneRef;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::rc::Rc;

/// Key for the per-modifier data set table. The `Rc` pointer identifies the
/// modifier instance; the vtable half of the fat pointer is irrelevant.
fn dataset_key(modifier: &ModifierRef) -> usize {
    Rc::as_ptr(modifier) as *const () as usize
}

/// A homogeneous population of particles and the objects that drive it.
pub struct Group {
    base: ObjectBase,
    particles: Particles,
    emitters: Vec<EmitterRef>,
    /// Kept sorted by ascending priority; ties keep insertion order.
    modifiers: Vec<ModifierRef>,
    initializers: Vec<InitializerRef>,
    death_action: Option<ActionRef>,
    datasets: FxHashMap<usize, DataSet>,
    /// Action firings queued by the last sweep; most frames queue none.
    pending: SmallVec<[ActionInvocation; 4]>,
    lifetime_min: f32,
    lifetime_max: f32,
    immortal: bool,
    rng: StdRng,
    /// Set by the first update; gates iteration in debug builds.
    initialized: bool,
}

impl Group {
    pub fn new(capacity: usize) -> Self {
        Self {
            base: ObjectBase::default(),
            particles: Particles::new(capacity),
            emitters: Vec::new(),
            modifiers: Vec::new(),
            initializers: Vec::new(),
            death_action: None,
            datasets: FxHashMap::default(),
            pending: SmallVec::new(),
            lifetime_min: 1.0,
            lifetime_max: 1.0,
            immortal: false,
            rng: StdRng::from_entropy(),
            initialized: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.base.set_name(name);
        self
    }

    pub fn with_lifetime(mut self, min: f32, max: f32) -> Self {
        self.set_lifetime(min, max);
        self
    }

    /// Reseeds the group's random stream, making updates reproducible.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The group's random stream. Catalog objects that sample outside the
    /// update pass (actions drawing spawn counts, for instance) use this
    /// rather than a thread RNG, so a seeded run stays reproducible.
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn particles(&self) -> &Particles {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut Particles {
        &mut self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.particles.capacity()
    }

    /// Changes the pool capacity without disturbing living particles; data
    /// sets follow.
    pub fn reallocate(&mut self, capacity: usize) {
        self.particles.reallocate(capacity);
        let capacity = self.particles.capacity();
        for dataset in self.datasets.values_mut() {
            dataset.resize(capacity);
        }
    }

    /// Sets the lifetime range assigned to created particles. Inverted
    /// bounds are swapped with a warning.
    pub fn set_lifetime(&mut self, min: f32, max: f32) {
        if min <= max {
            self.lifetime_min = min;
            self.lifetime_max = max;
        } else {
            tracing::warn!("Group::set_lifetime: min {min} greater than max {max}, swapping");
            self.lifetime_min = max;
            self.lifetime_max = min;
        }
    }

    pub fn lifetime_bounds(&self) -> (f32, f32) {
        (self.lifetime_min, self.lifetime_max)
    }

    /// Immortal particles never age out; they die only through
    /// [`Particles::kill`].
    pub fn set_immortal(&mut self, immortal: bool) {
        self.immortal = immortal;
    }

    pub fn is_immortal(&self) -> bool {
        self.immortal
    }

    /// Adds an emitter. Its fractional accumulator is randomized so
    /// emitters added on the same frame do not pulse in lockstep.
    pub fn add_emitter(&mut self, emitter: EmitterRef) {
        if self.emitters.iter().any(|e| Rc::ptr_eq(e, &emitter)) {
            tracing::warn!("Group: emitter already added, ignored");
            return;
        }
        emitter.borrow_mut().randomize_fraction(&mut self.rng);
        self.emitters.push(emitter);
    }

    pub fn remove_emitter(&mut self, emitter: &EmitterRef) {
        self.emitters.retain(|e| !Rc::ptr_eq(e, emitter));
    }

    pub fn emitters(&self) -> &[EmitterRef] {
        &self.emitters
    }

    /// Adds a modifier at its priority slot and allocates its data set if
    /// it needs one.
    pub fn add_modifier(&mut self, modifier: ModifierRef) {
        if self.modifiers.iter().any(|m| Rc::ptr_eq(m, &modifier)) {
            tracing::warn!("Group: modifier already added, ignored");
            return;
        }
        let (priority, needs_dataset) = {
            let m = modifier.borrow();
            (m.priority(), m.needs_dataset())
        };
        if needs_dataset {
            let dataset = modifier.borrow().create_dataset(self.capacity());
            self.datasets.insert(dataset_key(&modifier), dataset);
        }
        let slot = self
            .modifiers
            .iter()
            .position(|m| m.borrow().priority() > priority)
            .unwrap_or(self.modifiers.len());
        self.modifiers.insert(slot, modifier);
    }

    pub fn remove_modifier(&mut self, modifier: &ModifierRef) {
        self.datasets.remove(&dataset_key(modifier));
        self.modifiers.retain(|m| !Rc::ptr_eq(m, modifier));
    }

    pub fn modifiers(&self) -> &[ModifierRef] {
        &self.modifiers
    }

    pub fn add_initializer(&mut self, initializer: InitializerRef) {
        self.initializers.push(initializer);
    }

    pub fn initializers(&self) -> &[InitializerRef] {
        &self.initializers
    }

    /// Action fired, at system scope, for each particle removed by the
    /// death sweep.
    pub fn set_death_action(&mut self, action: Option<ActionRef>) {
        self.death_action = action;
    }

    pub fn death_action(&self) -> Option<&ActionRef> {
        self.death_action.as_ref()
    }

    /// Data set owned on behalf of the given modifier, if it requested one.
    pub fn dataset(&self, modifier: &ModifierRef) -> Option<&DataSet> {
        self.datasets.get(&dataset_key(modifier))
    }

    /// Spawns up to `count` particles through the full creation pipeline,
    /// clamped by free capacity. Returns how many were actually created.
    pub fn spawn_particles(&mut self, count: usize, emitter: Option<&EmitterRef>) -> usize {
        let mut spawned = 0;
        for _ in 0..count {
            if self.spawn_one(emitter).is_none() {
                break;
            }
            spawned += 1;
        }
        spawned
    }

    /// Spawns bare particles with no emitter, at the pool's default state.
    pub fn spawn(&mut self, count: usize) -> usize {
        self.spawn_particles(count, None)
    }

    fn spawn_one(&mut self, emitter: Option<&EmitterRef>) -> Option<usize> {
        let index = self.particles.spawn_default()?;

        let lifetime = if self.immortal {
            f32::INFINITY
        } else if self.lifetime_min < self.lifetime_max {
            self.rng.gen_range(self.lifetime_min..=self.lifetime_max)
        } else {
            self.lifetime_min
        };
        self.particles.set_lifetime(index, lifetime);

        let init_modifiers: Vec<ModifierRef> = self
            .modifiers
            .iter()
            .filter(|m| {
                let m = m.borrow();
                m.is_active() && m.wants_init()
            })
            .map(Rc::clone)
            .collect();
        for modifier in &init_modifiers {
            let key = dataset_key(modifier);
            let mut dataset = self.datasets.remove(&key);
            modifier
                .borrow()
                .init(index, &mut self.particles, dataset.as_mut(), &mut self.rng);
            if let Some(dataset) = dataset {
                self.datasets.insert(key, dataset);
            }
        }

        let initializers: Vec<InitializerRef> = self.initializers.iter().map(Rc::clone).collect();
        for initializer in &initializers {
            initializer.init(index, &mut self.particles, &mut self.rng);
        }

        if let Some(emitter) = emitter {
            emitter.borrow().emit(index, &mut self.particles, &mut self.rng);
            self.particles.set_spawner(index, Some(Rc::clone(emitter)));
        }
        Some(index)
    }

    /// Runs one frame for the group: emission, aging and integration, the
    /// modifier pipeline, then the death sweep. Returns whether the group
    /// is still active afterwards.
    pub fn update(&mut self, dt: f32) -> bool {
        self.initialized = true;

        // Emission, clamped by free capacity. Particles spawned here take
        // part in the rest of the frame.
        let emitters: Vec<EmitterRef> = self.emitters.iter().map(Rc::clone).collect();
        for emitter in &emitters {
            let requested = emitter
                .borrow_mut()
                .particles_to_spawn(dt, &mut self.rng);
            self.spawn_particles(requested, Some(emitter));
        }

        // Age and integrate positions by the frame's starting velocity.
        {
            let rows = self.particles.rows_mut();
            for i in 0..rows.len() {
                rows.ages[i] += dt;
                let velocity = rows.velocities[i];
                rows.positions[i] += velocity * dt;
            }
        }

        // Modifier pipeline, ascending priority. Each modifier's data set is
        // taken out of the table for the duration of its pass.
        let modifiers: Vec<ModifierRef> = self.modifiers.iter().map(Rc::clone).collect();
        for modifier in &modifiers {
            let m = modifier.borrow();
            if !m.is_active() {
                continue;
            }
            let key = dataset_key(modifier);
            let mut dataset = self.datasets.remove(&key);
            m.modify(&mut self.particles, dataset.as_mut(), dt);
            if let Some(dataset) = dataset {
                self.datasets.insert(key, dataset);
            }
        }

        // Death sweep: swap-removal, data set rows in lockstep, death
        // actions queued on snapshots.
        let mut i = 0;
        while i < self.particles.len() {
            if self.particles.is_dead(i) {
                if let Some(action) = &self.death_action {
                    self.pending.push(ActionInvocation {
                        action: Rc::clone(action),
                        particle: self.particles.snapshot(i),
                    });
                }
                let last = self.particles.len() - 1;
                self.particles.swap(i, last);
                for dataset in self.datasets.values_mut() {
                    dataset.swap(i, last);
                }
                self.particles.pop_living();
            } else {
                i += 1;
            }
        }

        self.is_active()
    }

    /// Whether the group can still produce visible work: living particles,
    /// or at least one active emitter with emission left in it.
    pub fn is_active(&self) -> bool {
        !self.particles.is_empty()
            || self.emitters.iter().any(|e| {
                let e = e.borrow();
                e.is_active() && !e.is_exhausted()
            })
    }

    /// Drains the action invocations queued by the last update.
    pub fn take_pending_actions(&mut self) -> SmallVec<[ActionInvocation; 4]> {
        std::mem::take(&mut self.pending)
    }

    /// Iterates the living particles. Only meaningful once the group has
    /// been updated at least once.
    pub fn iter(&self) -> ParticleIter<'_> {
        debug_assert!(
            self.initialized,
            "iterating a group that has never been updated"
        );
        ParticleIter::new(&self.particles)
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    pub fn find_emitter(&self, name: &str) -> Option<EmitterRef> {
        self.emitters
            .iter()
            .find(|e| e.borrow().name().as_deref() == Some(name))
            .map(Rc::clone)
    }

    pub fn find_modifier(&self, name: &str) -> Option<ModifierRef> {
        self.modifiers
            .iter()
            .find(|m| m.borrow().base().object.name() == Some(name))
            .map(Rc::clone)
    }

    /// Searches the group's emitters for an exclusively-owned zone with the
    /// given name.
    pub fn find_zone(&self, name: &str) -> Option<ZoneRef> {
        self.emitters.iter().find_map(|e| e.borrow().find_zone(name))
    }

    pub fn import(&mut self, descriptor: &Descriptor, ctx: &mut ImportContext) {
        self.base.import_from(descriptor);

        match descriptor.get_i32("capacity") {
            Ok(Some(capacity)) if capacity > 0 => self.reallocate(capacity as usize),
            Ok(Some(capacity)) => tracing::warn!("Group: invalid capacity {capacity}, kept"),
            Ok(None) => {}
            Err(err) => tracing::warn!("Group: skipping attribute: {err}"),
        }
        match descriptor.get_f32s("lifetime") {
            Ok(Some(lifetime)) => match lifetime[..] {
                [both] => self.set_lifetime(both, both),
                [min, max] => self.set_lifetime(min, max),
                _ => tracing::warn!("Group: wrong number of lifetime bounds: {}", lifetime.len()),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("Group: skipping attribute: {err}"),
        }
        match descriptor.get_bool("immortal") {
            Ok(Some(immortal)) => self.immortal = immortal,
            Ok(None) => {}
            Err(err) => tracing::warn!("Group: skipping attribute: {err}"),
        }
        match descriptor.get_objects("emitters") {
            Ok(Some(descriptors)) => {
                for desc in descriptors {
                    let mut emitter = Emitter::new();
                    emitter.import(desc, ctx);
                    self.add_emitter(new_ref(emitter));
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("Group: skipping attribute: {err}"),
        }
        match descriptor.get_objects("modifiers") {
            Ok(Some(descriptors)) => {
                for desc in descriptors {
                    match ctx.modifier(desc) {
                        Ok(modifier) => self.add_modifier(modifier),
                        Err(err) => tracing::warn!("Group: skipping modifier: {err}"),
                    }
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("Group: skipping attribute: {err}"),
        }
        match descriptor.get_objects("initializers") {
            Ok(Some(descriptors)) => {
                for desc in descriptors {
                    match ctx.initializer(desc) {
                        Ok(initializer) => self.add_initializer(initializer),
                        Err(err) => tracing::warn!("Group: skipping initializer: {err}"),
                    }
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("Group: skipping attribute: {err}"),
        }
        match descriptor.get_object("death action") {
            Ok(Some(desc)) => match ctx.action(desc) {
                Ok(action) => self.death_action = Some(action),
                Err(err) => tracing::warn!("Group: skipping death action: {err}"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("Group: skipping attribute: {err}"),
        }
    }

    pub fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type("ember.group");
        self.base.export_into(&mut descriptor);
        descriptor.set_i32("capacity", self.capacity() as i32);
        if self.lifetime_min != 1.0 || self.lifetime_max != 1.0 {
            descriptor.set_f32_bounds("lifetime", self.lifetime_min, self.lifetime_max);
        }
        descriptor.set_non_default("immortal", self.immortal, !self.immortal);

        if !self.emitters.is_empty() {
            let emitters: Vec<AttributeValue> = self
                .emitters
                .iter()
                .map(|e| AttributeValue::Object(e.borrow().export()))
                .collect();
            descriptor.set("emitters", AttributeValue::List(emitters));
        }
        if !self.modifiers.is_empty() {
            let modifiers: Vec<AttributeValue> = self
                .modifiers
                .iter()
                .map(|m| AttributeValue::Object(m.borrow().export()))
                .collect();
            descriptor.set("modifiers", AttributeValue::List(modifiers));
        }
        if !self.initializers.is_empty() {
            let initializers: Vec<AttributeValue> = self
                .initializers
                .iter()
                .map(|i| AttributeValue::Object(i.export()))
                .collect();
            descriptor.set("initializers", AttributeValue::List(initializers));
        }
        if let Some(action) = &self.death_action {
            descriptor.set("death action", action.export());
        }
        descriptor
    }
}

impl EmberObject for Group {
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
    use crate::math::Vec3;

    fn group(capacity: usize) -> Group {
        let mut group = Group::new(capacity);
        group.set_seed(42);
        group
    }

    #[test]
    fn test_steady_flow_emits_expected_total() {
        let mut group = group(64);
        let emitter = new_ref(Emitter::new().with_flow(10.0));
        group.add_emitter(Rc::clone(&emitter));
        emitter.borrow_mut().reset_fraction();
        group.set_lifetime(100.0, 100.0);

        for _ in 0..10 {
            group.update(0.1);
        }
        assert_eq!(group.len(), 10);
    }

    #[test]
    fn test_burst_group_stays_active_after_tank_empties() {
        let mut group = group(16);
        let emitter = new_ref(Emitter::new().with_tank(5, 5).with_flow(-1.0));
        group.add_emitter(emitter);
        group.set_lifetime(100.0, 100.0);

        group.update(0.016);
        assert_eq!(group.len(), 5);
        group.update(0.016);
        assert_eq!(group.len(), 5);
        assert!(group.is_active());
    }

    #[test]
    fn test_living_count_clamped_to_capacity() {
        let mut group = group(3);
        let emitter = new_ref(Emitter::new().with_flow(1000.0));
        group.add_emitter(emitter);
        group.set_lifetime(100.0, 100.0);

        group.update(1.0);
        assert_eq!(group.len(), 3);
    }

    #[test]
    fn test_spawn_request_clamped_to_free_capacity() {
        let mut group = group(5);
        group.spawn(3);
        assert_eq!(group.spawn(10), 2);
        assert_eq!(group.len(), 5);
        assert_eq!(group.spawn(1), 0);
    }

    #[test]
    fn test_zero_capacity_spawn_is_a_no_op() {
        let mut group = group(0);
        assert_eq!(group.spawn(4), 0);
        assert!(group.is_empty());
    }

    #[test]
    fn test_dead_particles_swept_and_ages_survive_swap() {
        let mut group = group(8);
        group.set_lifetime(100.0, 100.0);
        group.spawn(4);
        group.particles_mut().kill(0);
        group.particles_mut().kill(2);

        group.update(0.5);
        assert_eq!(group.len(), 2);
        for particle in group.iter() {
            assert!((particle.age() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_particles_age_out() {
        let mut group = group(8);
        group.set_lifetime(1.0, 1.0);
        group.spawn(3);
        group.update(0.5);
        assert_eq!(group.len(), 3);
        group.update(0.6);
        assert_eq!(group.len(), 0);
    }

    #[test]
    fn test_immortal_particles_never_age_out() {
        let mut group = group(4);
        group.set_immortal(true);
        group.spawn(2);
        group.update(1.0e6);
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn test_positions_integrate_velocity() {
        let mut group = group(4);
        group.set_lifetime(100.0, 100.0);
        group.spawn(1);
        group.particles_mut().set_velocity(0, Vec3::new(2.0, 0.0, 0.0));
        group.update(0.5);
        assert_eq!(group.particles().position(0), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_duplicate_emitter_ignored() {
        let mut group = group(4);
        let emitter = new_ref(Emitter::new());
        group.add_emitter(Rc::clone(&emitter));
        group.add_emitter(emitter);
        assert_eq!(group.emitters().len(), 1);
    }

    #[test]
    fn test_group_without_emitters_or_particles_is_inactive() {
        let mut group = group(4);
        assert!(!group.is_active());
        group.spawn(1);
        assert!(group.is_active());
    }

    #[test]
    fn test_exhausted_emitter_leaves_group_inactive() {
        let mut group = group(8);
        let emitter = new_ref(Emitter::new().with_tank(2, 2).with_flow(100.0));
        group.add_emitter(emitter);
        group.set_lifetime(0.01, 0.01);

        group.update(1.0);
        // Tank is now empty; let the spawned particles age out.
        group.update(1.0);
        group.update(1.0);
        assert!(!group.is_active());
    }

    #[test]
    fn test_find_emitter_and_zone_by_name() {
        let mut group = group(4);
        let zone = new_ref(crate::zone::Zone::sphere(1.0).with_name("shell"));
        let emitter = new_ref(Emitter::new().with_name("spray").with_zone(zone, true));
        group.add_emitter(emitter);

        assert!(group.find_emitter("spray").is_some());
        assert!(group.find_zone("shell").is_some());
        assert!(group.find_emitter("missing").is_none());
    }
}
