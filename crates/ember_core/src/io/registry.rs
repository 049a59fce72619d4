//! Type registry for polymorphic catalog objects.
//!
//! Modifiers, initializers and actions are open sets: plugins register a
//! type identifier with a constructor, and import resolves a descriptor's
//! type tag through the registry. The registry is explicitly passed into
//! import (via [`ImportContext`]) rather than being hidden global state.

use super::Descriptor;
use crate::action::{Action, ActionRef};
use crate::error::EmberError;
use crate::initializer::{Initializer, InitializerRef};
use crate::modifier::ModifierRef;
use crate::object::EmberObject;
use crate::zone::ZoneRef;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Constructor for a registered modifier type.
pub type ModifierFactory = fn() -> ModifierRef;
/// Constructor for a registered initializer type.
pub type InitializerFactory = fn() -> Box<dyn Initializer>;
/// Constructor for a registered action type.
pub type ActionFactory = fn() -> Box<dyn Action>;

/// Maps type identifiers to constructors for the open catalog types.
#[derive(Default)]
pub struct TypeRegistry {
    modifiers: FxHashMap<&'static str, ModifierFactory>,
    initializers: FxHashMap<&'static str, InitializerFactory>,
    actions: FxHashMap<&'static str, ActionFactory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_modifier(&mut self, type_id: &'static str, factory: ModifierFactory) {
        self.modifiers.insert(type_id, factory);
    }

    pub fn register_initializer(&mut self, type_id: &'static str, factory: InitializerFactory) {
        self.initializers.insert(type_id, factory);
    }

    pub fn register_action(&mut self, type_id: &'static str, factory: ActionFactory) {
        self.actions.insert(type_id, factory);
    }

    fn type_id_of(descriptor: &Descriptor) -> Result<&str, EmberError> {
        descriptor
            .type_id()
            .ok_or_else(|| EmberError::UnknownType("<untagged descriptor>".to_owned()))
    }

    pub(crate) fn modifier_factory(&self, type_id: &str) -> Result<ModifierFactory, EmberError> {
        self.modifiers
            .get(type_id)
            .copied()
            .ok_or_else(|| EmberError::UnknownType(type_id.to_owned()))
    }

    pub(crate) fn initializer_factory(
        &self,
        type_id: &str,
    ) -> Result<InitializerFactory, EmberError> {
        self.initializers
            .get(type_id)
            .copied()
            .ok_or_else(|| EmberError::UnknownType(type_id.to_owned()))
    }

    pub(crate) fn action_factory(&self, type_id: &str) -> Result<ActionFactory, EmberError> {
        self.actions
            .get(type_id)
            .copied()
            .ok_or_else(|| EmberError::UnknownType(type_id.to_owned()))
    }
}

/// Scope threaded through a recursive import.
///
/// Carries the registry plus the shared objects named so far, so that
/// `Reference` attributes resolve to the same instance everywhere they
/// appear in the imported graph.
pub struct ImportContext<'r> {
    registry: &'r TypeRegistry,
    shared_zones: FxHashMap<String, ZoneRef>,
}

impl<'r> ImportContext<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            shared_zones: FxHashMap::default(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.registry
    }

    /// Records a shared zone under its name so later references resolve to
    /// the same instance. Unnamed zones cannot be referenced and are skipped.
    pub fn record_shared_zone(&mut self, zone: &ZoneRef) {
        if let Some(name) = zone.borrow().name() {
            self.shared_zones.insert(name, Rc::clone(zone));
        }
    }

    pub fn resolve_zone(&self, name: &str) -> Result<ZoneRef, EmberError> {
        self.shared_zones
            .get(name)
            .cloned()
            .ok_or_else(|| EmberError::UnresolvedReference(name.to_owned()))
    }

    /// Constructs and imports a modifier from a tagged descriptor.
    pub fn modifier(&mut self, descriptor: &Descriptor) -> Result<ModifierRef, EmberError> {
        let factory = self
            .registry
            .modifier_factory(TypeRegistry::type_id_of(descriptor)?)?;
        let modifier = factory();
        modifier.borrow_mut().import(descriptor, self);
        Ok(modifier)
    }

    /// Constructs and imports an initializer from a tagged descriptor.
    pub fn initializer(&mut self, descriptor: &Descriptor) -> Result<InitializerRef, EmberError> {
        let factory = self
            .registry
            .initializer_factory(TypeRegistry::type_id_of(descriptor)?)?;
        let mut initializer = factory();
        initializer.import(descriptor, self);
        Ok(Rc::from(initializer))
    }

    /// Constructs and imports an action from a tagged descriptor.
    pub fn action(&mut self, descriptor: &Descriptor) -> Result<ActionRef, EmberError> {
        let factory = self
            .registry
            .action_factory(TypeRegistry::type_id_of(descriptor)?)?;
        let mut action = factory();
        action.import(descriptor, self);
        Ok(Rc::from(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::Zone;

    #[test]
    fn test_unknown_type_is_loud() {
        let registry = TypeRegistry::new();
        let mut ctx = ImportContext::new(&registry);
        let desc = Descriptor::with_type("ember.unknown");
        assert!(matches!(
            ctx.modifier(&desc),
            Err(EmberError::UnknownType(_))
        ));
    }

    #[test]
    fn test_shared_zone_resolution() {
        let registry = TypeRegistry::new();
        let mut ctx = ImportContext::new(&registry);

        let zone = crate::object::new_ref(Zone::sphere(1.0).with_name("blast").shared(true));
        ctx.record_shared_zone(&zone);

        let resolved = ctx.resolve_zone("blast").unwrap();
        assert!(Rc::ptr_eq(&resolved, &zone));
        assert!(ctx.resolve_zone("other").is_err());
    }
}
