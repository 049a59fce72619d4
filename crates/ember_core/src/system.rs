//! The top-level simulation container.
//!
//! A system owns an ordered list of groups and steps them as one unit. It
//! is also the scope at which actions run: after each group's update, the
//! invocations that group queued are applied against the whole group list,
//! so an action can reach into any group of the same system.

use crate::emitter::EmitterRef;
use crate::group::Group;
use crate::io::{AttributeValue, Descriptor, ImportContext};
use crate::math::Vec3;
use crate::modifier::ModifierRef;
use crate::object::{EmberObject, ObjectBase};
use crate::zone::ZoneRef;

/// A complete simulation: groups plus a world transform.
#[derive(Default)]
pub struct System {
    base: ObjectBase,
    groups: Vec<Group>,
    position: Vec3,
    initialized: bool,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.base.set_name(name);
        self
    }

    /// Adds a group and returns its index. Group order is update order and
    /// is how actions address their target group.
    pub fn add_group(&mut self, group: Group) -> usize {
        self.groups.push(group);
        self.groups.len() - 1
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn groups_mut(&mut self) -> &mut [Group] {
        &mut self.groups
    }

    pub fn group(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn group_mut(&mut self, index: usize) -> Option<&mut Group> {
        self.groups.get_mut(index)
    }

    /// Living particles across every group.
    pub fn particle_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }

    /// Reseeds every group's random stream from one base seed, making a
    /// whole run reproducible.
    pub fn set_seed(&mut self, seed: u64) {
        for (i, group) in self.groups.iter_mut().enumerate() {
            group.set_seed(seed.wrapping_add(i as u64));
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Moves the system. Exclusively-owned emitter zones follow by the same
    /// delta, and modifiers flagged local-to-system are notified. Shared
    /// zones stay put; they are positioned by whoever owns them.
    pub fn set_position(&mut self, position: Vec3) {
        let delta = position - self.position;
        self.position = position;
        for group in &self.groups {
            for emitter in group.emitters() {
                let zone = std::rc::Rc::clone(emitter.borrow().zone());
                let mut zone = zone.borrow_mut();
                if !zone.is_shared() {
                    zone.translate(delta);
                }
            }
            for modifier in group.modifiers() {
                let local = modifier.borrow().is_local_to_system();
                if local {
                    modifier.borrow_mut().update_transform(position);
                }
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Prepares the system for iteration without stepping it. The first
    /// update does this implicitly.
    pub fn initialize(&mut self) {
        self.initialized = true;
        for group in &mut self.groups {
            group.mark_initialized();
        }
    }

    /// Steps every group by `dt` seconds, applying queued actions after
    /// each group's own update. Returns whether any group is still active.
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.initialized {
            self.initialize();
        }
        let mut active = false;
        for i in 0..self.groups.len() {
            if self.groups[i].update(dt) {
                active = true;
            }
            let pending = self.groups[i].take_pending_actions();
            for invocation in pending {
                invocation.action.apply(&invocation.particle, &mut self.groups);
            }
        }
        active
    }

    pub fn find_group(&self, name: &str) -> Option<&Group> {
        self.groups
            .iter()
            .find(|g| g.object().name() == Some(name))
    }

    pub fn find_group_mut(&mut self, name: &str) -> Option<&mut Group> {
        self.groups
            .iter_mut()
            .find(|g| g.object().name() == Some(name))
    }

    /// Searches every group for an emitter with the given name.
    pub fn find_emitter(&self, name: &str) -> Option<EmitterRef> {
        self.groups.iter().find_map(|g| g.find_emitter(name))
    }

    /// Searches every group for a modifier with the given name.
    pub fn find_modifier(&self, name: &str) -> Option<ModifierRef> {
        self.groups.iter().find_map(|g| g.find_modifier(name))
    }

    /// Searches every group's emitters for a zone with the given name.
    pub fn find_zone(&self, name: &str) -> Option<ZoneRef> {
        self.groups.iter().find_map(|g| g.find_zone(name))
    }

    pub fn import(&mut self, descriptor: &Descriptor, ctx: &mut ImportContext) {
        self.base.import_from(descriptor);

        match descriptor.get_vec3("position") {
            Ok(Some(position)) => self.position = position,
            Ok(None) => {}
            Err(err) => tracing::warn!("System: skipping attribute: {err}"),
        }
        match descriptor.get_objects("groups") {
            Ok(Some(descriptors)) => {
                for desc in descriptors {
                    let mut group = Group::new(0);
                    group.import(desc, ctx);
                    self.groups.push(group);
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("System: skipping attribute: {err}"),
        }
    }

    pub fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type("ember.system");
        self.base.export_into(&mut descriptor);
        descriptor.set_non_default("position", self.position, self.position == Vec3::ZERO);
        if !self.groups.is_empty() {
            let groups: Vec<AttributeValue> = self
                .groups
                .iter()
                .map(|g| AttributeValue::Object(g.export()))
                .collect();
            descriptor.set("groups", AttributeValue::List(groups));
        }
        descriptor
    }
}

impl EmberObject for System {
    fn object(&self) -> &ObjectBase {
        &self.base
    }
    fn object_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }
}
