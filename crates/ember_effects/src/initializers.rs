//! Stock initializers.

use ember_core::initializer::Initializer;
use ember_core::io::{Descriptor, ImportContext};
use ember_core::math::Color;
use ember_core::particle::Particles;
use rand::rngs::StdRng;
use rand::Rng;

/// A scalar particle field an initializer can target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParticleField {
    #[default]
    Mass,
    Size,
    Angle,
}

impl ParticleField {
    fn as_str(self) -> &'static str {
        match self {
            ParticleField::Mass => "mass",
            ParticleField::Size => "size",
            ParticleField::Angle => "angle",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "mass" => Some(ParticleField::Mass),
            "size" => Some(ParticleField::Size),
            "angle" => Some(ParticleField::Angle),
            _ => None,
        }
    }

    fn write(self, index: usize, particles: &mut Particles, value: f32) {
        match self {
            ParticleField::Mass => particles.set_mass(index, value),
            ParticleField::Size => particles.set_size(index, value),
            ParticleField::Angle => particles.set_angle(index, value),
        }
    }
}

/// Sets one scalar field to a fixed value at birth.
#[derive(Clone, Debug)]
pub struct ValueInitializer {
    field: ParticleField,
    value: f32,
}

impl Default for ValueInitializer {
    fn default() -> Self {
        Self {
            field: ParticleField::default(),
            value: 1.0,
        }
    }
}

impl ValueInitializer {
    pub const TYPE_ID: &'static str = "ember.value";

    pub fn new(field: ParticleField, value: f32) -> Self {
        Self { field, value }
    }
}

impl Initializer for ValueInitializer {
    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn init(&self, index: usize, particles: &mut Particles, _rng: &mut StdRng) {
        self.field.write(index, particles, self.value);
    }

    fn import(&mut self, descriptor: &Descriptor, _ctx: &mut ImportContext) {
        match descriptor.get_str("field") {
            Ok(Some(name)) => match ParticleField::parse(name) {
                Some(field) => self.field = field,
                None => tracing::warn!("ValueInitializer: unknown field `{name}`, skipped"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("ValueInitializer: skipping attribute: {err}"),
        }
        match descriptor.get_f32("value") {
            Ok(Some(value)) => self.value = value,
            Ok(None) => {}
            Err(err) => tracing::warn!("ValueInitializer: skipping attribute: {err}"),
        }
    }

    fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type(Self::TYPE_ID);
        descriptor.set_str("field", self.field.as_str());
        descriptor.set_f32("value", self.value);
        descriptor
    }
}

/// Draws one scalar field uniformly from a range at birth.
#[derive(Clone, Debug)]
pub struct RandomInitializer {
    field: ParticleField,
    min: f32,
    max: f32,
}

impl Default for RandomInitializer {
    fn default() -> Self {
        Self {
            field: ParticleField::default(),
            min: 1.0,
            max: 1.0,
        }
    }
}

impl RandomInitializer {
    pub const TYPE_ID: &'static str = "ember.random";

    /// Inverted bounds are swapped with a warning.
    pub fn new(field: ParticleField, min: f32, max: f32) -> Self {
        let (min, max) = if min <= max {
            (min, max)
        } else {
            tracing::warn!("RandomInitializer: min {min} greater than max {max}, swapping");
            (max, min)
        };
        Self { field, min, max }
    }
}

impl Initializer for RandomInitializer {
    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn init(&self, index: usize, particles: &mut Particles, rng: &mut StdRng) {
        let value = if self.min < self.max {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        };
        self.field.write(index, particles, value);
    }

    fn import(&mut self, descriptor: &Descriptor, _ctx: &mut ImportContext) {
        match descriptor.get_str("field") {
            Ok(Some(name)) => match ParticleField::parse(name) {
                Some(field) => self.field = field,
                None => tracing::warn!("RandomInitializer: unknown field `{name}`, skipped"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("RandomInitializer: skipping attribute: {err}"),
        }
        match descriptor.get_f32s("value") {
            Ok(Some(value)) => match value[..] {
                [both] => {
                    self.min = both;
                    self.max = both;
                }
                [min, max] => {
                    let swapped = Self::new(self.field, min, max);
                    self.min = swapped.min;
                    self.max = swapped.max;
                }
                _ => tracing::warn!(
                    "RandomInitializer: wrong number of value bounds: {}",
                    value.len()
                ),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!("RandomInitializer: skipping attribute: {err}"),
        }
    }

    fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type(Self::TYPE_ID);
        descriptor.set_str("field", self.field.as_str());
        descriptor.set_f32_bounds("value", self.min, self.max);
        descriptor
    }
}

/// Blends a birth color uniformly between two endpoints.
#[derive(Clone, Debug)]
pub struct ColorInitializer {
    min: Color,
    max: Color,
}

impl Default for ColorInitializer {
    fn default() -> Self {
        Self {
            min: Color::WHITE,
            max: Color::WHITE,
        }
    }
}

impl ColorInitializer {
    pub const TYPE_ID: &'static str = "ember.color";

    pub fn new(min: Color, max: Color) -> Self {
        Self { min, max }
    }

    pub fn fixed(color: Color) -> Self {
        Self {
            min: color,
            max: color,
        }
    }
}

impl Initializer for ColorInitializer {
    fn type_id(&self) -> &'static str {
        Self::TYPE_ID
    }

    fn init(&self, index: usize, particles: &mut Particles, rng: &mut StdRng) {
        let color = if self.min == self.max {
            self.min
        } else {
            Color::lerp(&self.min, &self.max, rng.gen::<f32>())
        };
        particles.set_color(index, color);
    }

    fn import(&mut self, descriptor: &Descriptor, _ctx: &mut ImportContext) {
        match descriptor.get_color("min") {
            Ok(Some(min)) => self.min = min,
            Ok(None) => {}
            Err(err) => tracing::warn!("ColorInitializer: skipping attribute: {err}"),
        }
        match descriptor.get_color("max") {
            Ok(Some(max)) => self.max = max,
            Ok(None) => {}
            Err(err) => tracing::warn!("ColorInitializer: skipping attribute: {err}"),
        }
    }

    fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type(Self::TYPE_ID);
        descriptor.set("min", self.min);
        descriptor.set("max", self.max);
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::group::Group;
    use std::rc::Rc;

    fn group(capacity: usize) -> Group {
        let mut group = Group::new(capacity);
        group.set_seed(42);
        group.set_lifetime(100.0, 100.0);
        group
    }

    #[test]
    fn test_value_initializer_sets_field() {
        let mut group = group(4);
        group.add_initializer(Rc::new(ValueInitializer::new(ParticleField::Size, 2.5)));
        group.spawn(2);
        assert_eq!(group.particles().size(0), 2.5);
        assert_eq!(group.particles().size(1), 2.5);
        assert_eq!(group.particles().mass(0), 1.0);
    }

    #[test]
    fn test_random_initializer_stays_in_range() {
        let mut group = group(32);
        group.add_initializer(Rc::new(RandomInitializer::new(
            ParticleField::Mass,
            2.0,
            4.0,
        )));
        group.spawn(32);
        for i in 0..32 {
            let mass = group.particles().mass(i);
            assert!((2.0..=4.0).contains(&mass));
        }
    }

    #[test]
    fn test_random_initializer_swaps_inverted_bounds() {
        let init = RandomInitializer::new(ParticleField::Size, 5.0, 1.0);
        assert_eq!((init.min, init.max), (1.0, 5.0));
    }

    #[test]
    fn test_color_initializer_blends_endpoints() {
        let red = Color::rgb(1.0, 0.0, 0.0);
        let blue = Color::rgb(0.0, 0.0, 1.0);
        let mut group = group(16);
        group.add_initializer(Rc::new(ColorInitializer::new(red, blue)));
        group.spawn(16);
        for i in 0..16 {
            let color = group.particles().color(i);
            assert!((color.r + color.b - 1.0).abs() < 1e-5);
            assert_eq!(color.g, 0.0);
        }
    }

    #[test]
    fn test_initializers_run_in_registration_order() {
        let mut group = group(4);
        group.add_initializer(Rc::new(ValueInitializer::new(ParticleField::Size, 2.0)));
        group.add_initializer(Rc::new(ValueInitializer::new(ParticleField::Size, 3.0)));
        group.spawn(1);
        assert_eq!(group.particles().size(0), 3.0);
    }

    #[test]
    fn test_random_initializer_round_trip() {
        let init = RandomInitializer::new(ParticleField::Angle, 0.0, 1.5);
        let registry = ember_core::io::TypeRegistry::new();
        let mut ctx = ImportContext::new(&registry);

        let mut restored = RandomInitializer::default();
        restored.import(&init.export(), &mut ctx);
        assert_eq!(restored.field, ParticleField::Angle);
        assert_eq!((restored.min, restored.max), (0.0, 1.5));
    }
}
