//! Birth-time particle initialization.

use crate::io::{Descriptor, ImportContext};
use crate::particle::Particles;
use rand::rngs::StdRng;
use std::rc::Rc;

pub type InitializerRef = Rc<dyn Initializer>;

/// Sets up one particle's state at creation.
///
/// Initializers registered on a group run once per accepted particle, in
/// registration order, after modifier init hooks and before the emitter
/// assigns position and velocity.
pub trait Initializer {
    /// Registry identifier of the concrete type.
    fn type_id(&self) -> &'static str;

    fn init(&self, index: usize, particles: &mut Particles, rng: &mut StdRng);

    fn import(&mut self, descriptor: &Descriptor, ctx: &mut ImportContext);

    fn export(&self) -> Descriptor;
}
