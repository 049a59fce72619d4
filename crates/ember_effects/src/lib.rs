//! Stock catalog of effects for the ember particle kernel.
//!
//! Everything here builds on the `ember_core` traits: modifiers for the
//! per-frame pipeline, initializers for birth-time state and actions for
//! cross-group reactions. [`register_effects`] wires the whole catalog into
//! a [`TypeRegistry`] so descriptors naming these types import cleanly.

pub mod actions;
pub mod initializers;
pub mod modifiers;

use ember_core::initializer::Initializer;
use ember_core::io::TypeRegistry;
use ember_core::modifier::{Modifier, ModifierRef};
use ember_core::object::new_ref;

pub use actions::SpawnAction;
pub use initializers::{ColorInitializer, ParticleField, RandomInitializer, ValueInitializer};
pub use modifiers::{Friction, Gravity, Turbulence};

/// Registers every stock effect type under its type identifier.
pub fn register_effects(registry: &mut TypeRegistry) {
    registry.register_modifier(Gravity::TYPE_ID, || {
        let m: ModifierRef = new_ref(Gravity::default());
        m
    });
    registry.register_modifier(Friction::TYPE_ID, || {
        let m: ModifierRef = new_ref(Friction::default());
        m
    });
    registry.register_modifier(Turbulence::TYPE_ID, || {
        let m: ModifierRef = new_ref(Turbulence::default());
        m
    });
    registry.register_initializer(ValueInitializer::TYPE_ID, || {
        Box::<ValueInitializer>::default() as Box<dyn Initializer>
    });
    registry.register_initializer(RandomInitializer::TYPE_ID, || {
        Box::<RandomInitializer>::default() as Box<dyn Initializer>
    });
    registry.register_initializer(ColorInitializer::TYPE_ID, || {
        Box::<ColorInitializer>::default() as Box<dyn Initializer>
    });
    registry.register_action(SpawnAction::TYPE_ID, || {
        Box::<SpawnAction>::default() as Box<dyn ember_core::action::Action>
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::io::{Descriptor, ImportContext};
    use ember_core::math::Vec3;
    use ember_core::system::System;

    #[test]
    fn test_registered_modifier_imports_by_type_tag() {
        let mut registry = TypeRegistry::new();
        register_effects(&mut registry);
        let mut ctx = ImportContext::new(&registry);

        let mut desc = Descriptor::with_type(Gravity::TYPE_ID);
        desc.set("acceleration", Vec3::new(0.0, -9.81, 0.0));

        let modifier = ctx.modifier(&desc).unwrap();
        assert_eq!(modifier.borrow().type_id(), Gravity::TYPE_ID);
    }

    #[test]
    fn test_full_system_descriptor_round_trip() {
        let mut registry = TypeRegistry::new();
        register_effects(&mut registry);

        let mut system = System::new().with_name("fountain");
        let mut drops = ember_core::group::Group::new(100).with_name("drops");
        drops.set_lifetime(1.0, 3.0);
        drops.add_emitter(new_ref(
            ember_core::emitter::Emitter::new()
                .with_zone(new_ref(ember_core::zone::Zone::sphere(0.2)), true)
                .with_flow(40.0)
                .with_force(4.0, 6.0),
        ));
        drops.add_modifier(new_ref(Gravity::new(Vec3::new(0.0, -9.81, 0.0))));
        drops.add_modifier(new_ref(Friction::new(0.2)));
        drops.add_initializer(std::rc::Rc::new(RandomInitializer::new(
            ParticleField::Size,
            0.5,
            1.5,
        )));
        system.add_group(drops);

        let json = serde_json::to_string(&system.export()).unwrap();
        let descriptor: Descriptor = serde_json::from_str(&json).unwrap();

        let mut ctx = ImportContext::new(&registry);
        let mut restored = System::new();
        restored.import(&descriptor, &mut ctx);
        restored.set_seed(42);

        let group = restored.find_group("drops").unwrap();
        assert_eq!(group.capacity(), 100);
        assert_eq!(group.modifiers().len(), 2);
        assert_eq!(group.initializers().len(), 1);

        restored.update(0.1);
        assert!(restored.particle_count() > 0);
    }
}
