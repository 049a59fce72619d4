//! Geometric spawn regions.
//!
//! A [`Zone`] produces positions (across its volume or only its surface) and
//! outward normals on demand. Zones flagged shared may be referenced by
//! several emitters and are never locally repositioned by any one owner.

use crate::io::Descriptor;
use crate::math::Vec3;
use crate::object::{EmberObject, ObjectBase, Ref};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub type ZoneRef = Ref<Zone>;

/// The geometric shape of a zone, relative to the zone's position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ZoneShape {
    /// A single point
    Point,
    /// A sphere of the given radius
    Sphere { radius: f32 },
    /// An axis-aligned box with the given half extents
    Box { half_extents: Vec3 },
}

impl Default for ZoneShape {
    fn default() -> Self {
        ZoneShape::Point
    }
}

/// A geometric region used for position and direction sampling.
#[derive(Clone, Debug, Default)]
pub struct Zone {
    base: ObjectBase,
    shape: ZoneShape,
    position: Vec3,
}

impl Zone {
    pub fn point() -> Self {
        Self::default()
    }

    pub fn sphere(radius: f32) -> Self {
        Self {
            shape: ZoneShape::Sphere { radius },
            ..Default::default()
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self {
            shape: ZoneShape::Box { half_extents },
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.base.set_name(name);
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Marks the zone as shareable between several emitters.
    pub fn shared(mut self, shared: bool) -> Self {
        self.base.set_shared(shared);
        self
    }

    pub fn shape(&self) -> ZoneShape {
        self.shape
    }

    pub fn set_shape(&mut self, shape: ZoneShape) {
        self.shape = shape;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Samples a position in world space. `full` samples across the volume,
    /// otherwise only the surface is used.
    pub fn sample_position(&self, rng: &mut StdRng, full: bool) -> Vec3 {
        let local = match self.shape {
            ZoneShape::Point => Vec3::ZERO,
            ZoneShape::Sphere { radius } => {
                let r = if full {
                    // cbrt keeps the distribution uniform over the volume
                    radius * rng.gen::<f32>().cbrt()
                } else {
                    radius
                };
                random_unit(rng) * r
            }
            ZoneShape::Box { half_extents } => {
                if full {
                    Vec3::new(
                        (rng.gen::<f32>() * 2.0 - 1.0) * half_extents.x,
                        (rng.gen::<f32>() * 2.0 - 1.0) * half_extents.y,
                        (rng.gen::<f32>() * 2.0 - 1.0) * half_extents.z,
                    )
                } else {
                    sample_box_surface(half_extents, rng)
                }
            }
        };
        self.position + local
    }

    /// Outward normal at a sampled point, used as the default emission
    /// direction. A point zone has no meaningful normal and yields a random
    /// unit vector.
    pub fn normal_at(&self, point: Vec3, rng: &mut StdRng) -> Vec3 {
        let delta = point - self.position;
        match self.shape {
            ZoneShape::Point => random_unit(rng),
            ZoneShape::Sphere { .. } => {
                let normal = delta.normalize();
                if normal == Vec3::ZERO {
                    random_unit(rng)
                } else {
                    normal
                }
            }
            ZoneShape::Box { half_extents } => {
                // Closest face wins; the comparison is in face-relative space
                // so flat boxes still pick a sensible axis.
                let rel = Vec3::new(
                    delta.x / half_extents.x.max(f32::EPSILON),
                    delta.y / half_extents.y.max(f32::EPSILON),
                    delta.z / half_extents.z.max(f32::EPSILON),
                );
                let (ax, ay, az) = (rel.x.abs(), rel.y.abs(), rel.z.abs());
                if ax == 0.0 && ay == 0.0 && az == 0.0 {
                    random_unit(rng)
                } else if ax >= ay && ax >= az {
                    Vec3::new(rel.x.signum(), 0.0, 0.0)
                } else if ay >= az {
                    Vec3::new(0.0, rel.y.signum(), 0.0)
                } else {
                    Vec3::new(0.0, 0.0, rel.z.signum())
                }
            }
        }
    }

    pub fn import(&mut self, descriptor: &Descriptor) {
        self.base.import_from(descriptor);

        match descriptor.get_vec3("position") {
            Ok(Some(position)) => self.position = position,
            Ok(None) => {}
            Err(err) => tracing::warn!("Zone: skipping attribute: {err}"),
        }
        match descriptor.get_str("shape") {
            Ok(Some("point")) => self.shape = ZoneShape::Point,
            Ok(Some("sphere")) => {
                let radius = match descriptor.get_f32("radius") {
                    Ok(radius) => radius.unwrap_or(0.0),
                    Err(err) => {
                        tracing::warn!("Zone: skipping attribute: {err}");
                        return;
                    }
                };
                self.shape = ZoneShape::Sphere { radius };
            }
            Ok(Some("box")) => {
                let half_extents = match descriptor.get_vec3("half extents") {
                    Ok(half) => half.unwrap_or(Vec3::ZERO),
                    Err(err) => {
                        tracing::warn!("Zone: skipping attribute: {err}");
                        return;
                    }
                };
                self.shape = ZoneShape::Box { half_extents };
            }
            Ok(Some(other)) => tracing::warn!("Zone: unknown shape `{other}`, skipped"),
            Ok(None) => {}
            Err(err) => tracing::warn!("Zone: skipping attribute: {err}"),
        }
    }

    pub fn export(&self) -> Descriptor {
        let mut descriptor = Descriptor::with_type("ember.zone");
        self.base.export_into(&mut descriptor);
        descriptor.set_non_default("position", self.position, self.position == Vec3::ZERO);
        match self.shape {
            ZoneShape::Point => {}
            ZoneShape::Sphere { radius } => {
                descriptor.set_str("shape", "sphere");
                descriptor.set_f32("radius", radius);
            }
            ZoneShape::Box { half_extents } => {
                descriptor.set_str("shape", "box");
                descriptor.set("half extents", half_extents);
            }
        }
        descriptor
    }
}

impl EmberObject for Zone {
    fn object(&self) -> &ObjectBase {
        &self.base
    }
    fn object_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }
}

/// Uniformly distributed unit vector.
fn random_unit(rng: &mut StdRng) -> Vec3 {
    let theta = rng.gen::<f32>() * std::f32::consts::TAU;
    let z = rng.gen::<f32>() * 2.0 - 1.0;
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// Area-weighted point on the surface of an axis-aligned box.
fn sample_box_surface(half: Vec3, rng: &mut StdRng) -> Vec3 {
    let area_x = half.y * half.z;
    let area_y = half.x * half.z;
    let area_z = half.x * half.y;
    let total = area_x + area_y + area_z;
    if total <= 0.0 {
        return Vec3::ZERO;
    }

    let sign = if rng.gen::<bool>() { 1.0 } else { -1.0 };
    let u = rng.gen::<f32>() * 2.0 - 1.0;
    let v = rng.gen::<f32>() * 2.0 - 1.0;
    let pick = rng.gen::<f32>() * total;
    if pick < area_x {
        Vec3::new(sign * half.x, u * half.y, v * half.z)
    } else if pick < area_x + area_y {
        Vec3::new(u * half.x, sign * half.y, v * half.z)
    } else {
        Vec3::new(u * half.x, v * half.y, sign * half.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_point_zone_samples_its_position() {
        let zone = Zone::point().with_position(Vec3::new(1.0, 2.0, 3.0));
        let mut rng = rng();
        assert_eq!(
            zone.sample_position(&mut rng, true),
            Vec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn test_sphere_volume_and_surface() {
        let zone = Zone::sphere(2.0);
        let mut rng = rng();
        for _ in 0..100 {
            let p = zone.sample_position(&mut rng, true);
            assert!(p.length() <= 2.0 + 1e-4);
        }
        for _ in 0..100 {
            let p = zone.sample_position(&mut rng, false);
            assert!((p.length() - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_box_surface_on_boundary() {
        let half = Vec3::new(1.0, 2.0, 3.0);
        let zone = Zone::cuboid(half);
        let mut rng = rng();
        for _ in 0..100 {
            let p = zone.sample_position(&mut rng, false);
            let on_face = (p.x.abs() - half.x).abs() < 1e-5
                || (p.y.abs() - half.y).abs() < 1e-5
                || (p.z.abs() - half.z).abs() < 1e-5;
            assert!(on_face, "{p:?} not on a face");
        }
    }

    #[test]
    fn test_sphere_normal_is_radial() {
        let zone = Zone::sphere(1.0).with_position(Vec3::new(5.0, 0.0, 0.0));
        let mut rng = rng();
        let n = zone.normal_at(Vec3::new(6.0, 0.0, 0.0), &mut rng);
        assert!((n.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_zone_round_trip() {
        let zone = Zone::sphere(1.5)
            .with_name("blast")
            .with_position(Vec3::new(0.0, 1.0, 0.0))
            .shared(true);
        let mut restored = Zone::point();
        restored.import(&zone.export());
        assert_eq!(restored.shape(), zone.shape());
        assert_eq!(restored.position(), zone.position());
        assert!(restored.is_shared());
        assert_eq!(restored.name().as_deref(), Some("blast"));
    }
}
