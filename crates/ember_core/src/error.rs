//! Kernel error types

use thiserror::Error;

/// Errors surfaced by the kernel's configuration and serialization paths.
///
/// Simulation itself never fails: per-frame precondition violations are
/// corrected and logged instead (see the module docs on [`crate::emitter`]).
#[derive(Error, Debug)]
pub enum EmberError {
    /// An attribute was read with the wrong type. Reads never coerce.
    #[error("attribute `{name}`: expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A type identifier is not present in the registry.
    #[error("unknown object type `{0}`")]
    UnknownType(String),

    /// A named reference could not be resolved in the importing scope.
    #[error("unresolved reference `{0}`")]
    UnresolvedReference(String),
}
