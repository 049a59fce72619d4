//! Convenience re-exports for typical kernel usage.

pub use crate::action::{Action, ActionRef};
pub use crate::dataset::DataSet;
pub use crate::emitter::{Emitter, EmitterRef};
pub use crate::error::EmberError;
pub use crate::group::Group;
pub use crate::initializer::{Initializer, InitializerRef};
pub use crate::io::{AttributeValue, Descriptor, ImportContext, TypeRegistry};
pub use crate::iter::ParticleIter;
pub use crate::math::{Color, Vec3};
pub use crate::modifier::{Modifier, ModifierBase, ModifierRef};
pub use crate::object::{copy_child, new_ref, EmberObject, ObjectBase, Ref};
pub use crate::particle::{Particle, ParticleSnapshot, Particles, MIN_MASS};
pub use crate::system::System;
pub use crate::zone::{Zone, ZoneRef, ZoneShape};
