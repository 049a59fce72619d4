//! Cross-group reactions to particle events.
//!
//! Modifiers may only touch their own group; anything that has to reach
//! into another group (spawning debris when a particle dies, for example)
//! goes through an action. Actions fire on a dead particle's snapshot
//! after the sweep that removed it, so they never observe a stale index.

use crate::group::Group;
use crate::io::{Descriptor, ImportContext};
use crate::particle::ParticleSnapshot;
use std::rc::Rc;

pub type ActionRef = Rc<dyn Action>;

/// A reaction to one particle's death, applied at system scope.
pub trait Action {
    /// Registry identifier of the concrete type.
    fn type_id(&self) -> &'static str;

    /// Applies the reaction. `trigger` is an owned snapshot of the dead
    /// particle; `groups` is every group of the owning system, the
    /// triggering one included.
    fn apply(&self, trigger: &ParticleSnapshot, groups: &mut [Group]);

    fn import(&mut self, descriptor: &Descriptor, ctx: &mut ImportContext);

    fn export(&self) -> Descriptor;
}

/// A queued action firing, recorded during a group's sweep and drained by
/// the owning system once the group's update has finished.
pub struct ActionInvocation {
    pub action: ActionRef,
    pub particle: ParticleSnapshot,
}
