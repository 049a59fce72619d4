//! Attribute-based import/export.
//!
//! Every configurable object describes itself as a [`Descriptor`]: an
//! ordered set of uniquely-named, typed [`AttributeValue`]s. The attribute
//! schema is the interchange contract; the byte encoding is whatever serde
//! backend the caller picks and is not the kernel's concern.
//!
//! Import is tolerant: a missing attribute leaves the current value
//! untouched, and a present-but-malformed attribute is logged and skipped.
//! Typed reads that hit a value of the wrong type fail loudly instead of
//! coercing.

mod descriptor;
mod registry;
mod value;

pub use descriptor::Descriptor;
pub use registry::{
    ActionFactory, ImportContext, InitializerFactory, ModifierFactory, TypeRegistry,
};
pub use value::AttributeValue;
