//! Stock actions.

use ember_core::action::Action;
use ember_core::emitter::{Emitter, EmitterRef};
use ember_core::group::Group;
use ember_core::io::{Descriptor, ImportContext};
use ember_core::object::{new_ref, EmberObject};
use ember_core::particle::ParticleSnapshot;
use rand::Rng;
use std::cell::RefCell;
use std::rc::Rc;

/// Spawns a burst of particles in a target group where the triggering
/// particle died.
///
/// Emitters are cloned from a template and pooled: a clone stays "in use"
/// as long as any particle it spawned is alive (the pool's own handle aside,
/// every reference to it lives in a particle row), so a clone with a
/// reference count of one is free for reuse. The pool only grows when every
/// clone is busy.
pub struct SpawnAction {
    template: EmitterRef,
    target_group: usize,
    count_min: i32,
    count_max: i32,
    pool: RefCell<Vec<EmitterRef>>,
}

impl Default for SpawnAction {
    fn default() -> Self {
        Self {
            template: new_ref(Emitter::new()),
            target_group: 0,
            count_min: 1,
            count_max: 1,
            pool: RefCell::new(Vec::new()),
        }
    }
}

impl SpawnAction {
    pub const TYPE_ID: &'static str = "ember.spawn";

    /// Inverted count bounds are swapped with a warning.
    pub fn new(template: EmitterRef, target_group: usize, min: i32, max: i32) -> Self {
        let mut action = Self {
            template,
            target_group,
            ..Default::default()
        };
        action.set_count(min, max);
        action
    }

    pub fn set_count(&mut self, min: i32, max: i32) {
        let (min, max) = if min <= max {
            (min, max)
        } else {
            tracing::warn!("SpawnAction: min {min} greater than max {max}, swapping");
            (max, min)
        };
        self.count_min = min.max(0);
        self.count_max = max.max(0);
    }

    pub fn count_bounds(&self) -> (i32, i32) {
        (self.count_min, self.count_max)
    }

    pub fn target_group(&self) -> usize {
        self.target_group
    }

    /// Number of emitter clones created so far.
    pub fn pool_len(&self) -> usize {
        self.pool.borrow().len()
    }

    /// A pooled clone no particle references any more, or a fresh clone of
    /// the template when every pooled one is busy.
    fn checkout(&self) -> EmitterRef {
        let mut pool = self.pool.borrow_mut();
        if let Some(free) = pool.iter().find(|e| Rc::strong_count(e) == 1) {
            let free = Rc::clone(free);
            free.borrow_mut().reset_tank();
            return free;
        }
        let clone = new_ref(self.template.borrow().clone());
        pool.push(Rc::clone(&clone));
        clone
    }
}

impl Action for SpawnAction {
    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn apply(&self, trigger: &ParticleSnapshot, groups: &mut [Group]) {
        // A shared zone cannot be repositioned per trigger without moving it
        // under every other owner, so the firing is skipped outright.
        if self.template.borrow().zone().borrow().is_shared() {
            tracing::error!("SpawnAction: template emitter uses a shared zone, firing skipped");
            return;
        }
        let Some(group) = groups.get_mut(self.target_group) else {
            tracing::warn!("SpawnAction: target group {} out of range", self.target_group);
            return;
        };

        let emitter = self.checkout();
        {
            let emitter = emitter.borrow();
            emitter.zone().borrow_mut().set_position(trigger.position);
        }

        let count = if self.count_min < self.count_max {
            group.rng_mut().gen_range(self.count_min..=self.count_max)
        } else {
            self.count_min
        };
        group.spawn_particles(count as usize, Some(&emitter));
    }

    fn import(&mut self, descriptor: &Descriptor, ctx: &mut ImportContext) {
        match descriptor.get_object("emitter") {
            Ok(Some(desc)) => {
                let mut emitter = Emitter::new();
                emitter.import(desc, ctx);
                self.template = new_ref(emitter);
                self.pool.borrow_mut().clear();
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("SpawnAction: skipping attribute: {err}"),
        }
        match descriptor.get_i32("group") {
            Ok(Some(group)) if group >= 0 => self.target_group = group as usize,
            Ok(Some(group)) => tracing::warn!("SpawnAction: invalid group index {group}, kept"),
            Ok(None) => {}
            Err(err) => tracing::warn!("SpawnAction: skipping attribute: {err}"),
        }
        match descriptor.get_i32s("count") {
            Ok(Some(count)) => match count[..] {
                [both] => self.set_count(both, both),
                [min, max] => self.set_count(min, max),
                _ => tracing::warn!("SpawnAction: wrong number of count bounds: {}", count.len()),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("SpawnAction: skipping attribute: {err}"),
        }
    }

    fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type(Self::TYPE_ID);
        descriptor.set("emitter", self.template.borrow().export());
        descriptor.set_i32("group", self.target_group as i32);
        descriptor.set_i32_bounds("count", self.count_min, self.count_max);
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::math::Vec3;
    use ember_core::system::System;

    fn snapshot_at(position: Vec3) -> ParticleSnapshot {
        ParticleSnapshot {
            position,
            velocity: Vec3::ZERO,
            age: 1.0,
            lifetime: 1.0,
            color: ember_core::math::Color::WHITE,
            mass: 1.0,
            size: 1.0,
            angle: 0.0,
        }
    }

    fn debris_group(capacity: usize) -> Group {
        let mut group = Group::new(capacity);
        group.set_seed(7);
        group.set_immortal(true);
        group
    }

    #[test]
    fn test_spawns_at_trigger_position() {
        let action = SpawnAction::new(new_ref(Emitter::new()), 0, 3, 3);
        let mut groups = vec![debris_group(16)];

        action.apply(&snapshot_at(Vec3::new(2.0, 1.0, 0.0)), &mut groups);
        assert_eq!(groups[0].len(), 3);
        for i in 0..3 {
            assert_eq!(groups[0].particles().position(i), Vec3::new(2.0, 1.0, 0.0));
        }
    }

    #[test]
    fn test_pool_grows_while_particles_live_and_reuses_after() {
        let action = SpawnAction::new(new_ref(Emitter::new()), 0, 2, 2);
        let mut groups = vec![debris_group(16)];

        action.apply(&snapshot_at(Vec3::ZERO), &mut groups);
        assert_eq!(action.pool_len(), 1);

        // Earlier clones are still referenced by living particles, so each
        // further firing needs a fresh clone.
        action.apply(&snapshot_at(Vec3::ZERO), &mut groups);
        assert_eq!(action.pool_len(), 2);
        action.apply(&snapshot_at(Vec3::ZERO), &mut groups);
        assert_eq!(action.pool_len(), 3);

        for i in 0..groups[0].len() {
            groups[0].particles_mut().kill(i);
        }
        groups[0].update(0.0);
        assert_eq!(groups[0].len(), 0);

        action.apply(&snapshot_at(Vec3::ZERO), &mut groups);
        assert_eq!(action.pool_len(), 3);
    }

    #[test]
    fn test_shared_zone_template_never_fires() {
        let zone = new_ref(ember_core::zone::Zone::sphere(1.0).shared(true));
        let action = SpawnAction::new(new_ref(Emitter::new().with_zone(zone, true)), 0, 3, 3);
        let mut groups = vec![debris_group(16)];

        action.apply(&snapshot_at(Vec3::ZERO), &mut groups);
        assert_eq!(groups[0].len(), 0);
        assert_eq!(action.pool_len(), 0);
    }

    #[test]
    fn test_out_of_range_group_is_skipped() {
        let action = SpawnAction::new(new_ref(Emitter::new()), 5, 1, 1);
        let mut groups = vec![debris_group(4)];
        action.apply(&snapshot_at(Vec3::ZERO), &mut groups);
        assert_eq!(groups[0].len(), 0);
    }

    #[test]
    fn test_as_death_action_in_system() {
        let mut system = System::new();

        let mut sparks = Group::new(8);
        sparks.set_seed(1);
        sparks.set_lifetime(0.1, 0.1);
        sparks.spawn(2);
        sparks.set_death_action(Some(Rc::new(SpawnAction::new(
            new_ref(Emitter::new()),
            1,
            4,
            4,
        ))));
        system.add_group(sparks);
        system.add_group(debris_group(32));

        system.update(0.2);
        assert_eq!(system.group(1).map(Group::len), Some(8));
    }

    #[test]
    fn test_seeded_spawn_counts_are_reproducible() {
        fn run(seed: u64) -> usize {
            let mut system = System::new();

            let mut sparks = Group::new(8);
            sparks.set_lifetime(0.1, 0.1);
            sparks.spawn(2);
            sparks.set_death_action(Some(Rc::new(SpawnAction::new(
                new_ref(Emitter::new()),
                1,
                1,
                5,
            ))));
            system.add_group(sparks);
            system.add_group(debris_group(32));

            system.set_seed(seed);
            system.update(0.2);
            system.group(1).map(Group::len).unwrap_or(0)
        }

        let first = run(99);
        assert_eq!(first, run(99));
        assert!((2..=10).contains(&first));
    }

    #[test]
    fn test_round_trip() {
        let action = SpawnAction::new(new_ref(Emitter::new().with_flow(5.0)), 2, 1, 6);
        let registry = ember_core::io::TypeRegistry::new();
        let mut ctx = ImportContext::new(&registry);

        let mut restored = SpawnAction::default();
        restored.import(&action.export(), &mut ctx);
        assert_eq!(restored.target_group(), 2);
        assert_eq!(restored.count_bounds(), (1, 6));
        assert_eq!(restored.template.borrow().flow(), 5.0);
    }
}
