//! The particle pool and its views.
//!
//! Particles are never allocated individually: a group owns a [`Particles`]
//! pool of fixed-capacity parallel arrays, and a [`Particle`] is just an
//! index into that pool. Indices are only valid below the living count and
//! are invalidated by any call that changes it (the death sweep reorders by
//! swapping with the last living row).

use crate::emitter::EmitterRef;
use crate::math::{Color, Vec3};

/// Smallest mass a particle may carry; emission divides force by mass.
pub const MIN_MASS: f32 = 1e-6;

/// Fixed-capacity pool of particle state stored as parallel arrays.
#[derive(Debug, Default)]
pub struct Particles {
    capacity: usize,
    living: usize,
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
    ages: Vec<f32>,
    lifetimes: Vec<f32>,
    colors: Vec<Color>,
    masses: Vec<f32>,
    sizes: Vec<f32>,
    angles: Vec<f32>,
    /// Emitter that spawned each living particle. Keeping the reference
    /// alive until the particle dies is what lets pooled emitter clones
    /// report "in use" through their reference count.
    spawners: Vec<Option<EmitterRef>>,
}

impl Particles {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            living: 0,
            positions: vec![Vec3::ZERO; capacity],
            velocities: vec![Vec3::ZERO; capacity],
            ages: vec![0.0; capacity],
            lifetimes: vec![1.0; capacity],
            colors: vec![Color::WHITE; capacity],
            masses: vec![1.0; capacity],
            sizes: vec![1.0; capacity],
            angles: vec![0.0; capacity],
            spawners: vec![None; capacity],
        }
    }

    /// Number of living particles.
    pub fn len(&self) -> usize {
        self.living
    }

    pub fn is_empty(&self) -> bool {
        self.living == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claims the next free slot, resetting its row to defaults. Returns
    /// `None` when the pool is full.
    pub(crate) fn spawn_default(&mut self) -> Option<usize> {
        if self.living >= self.capacity {
            return None;
        }
        let index = self.living;
        self.positions[index] = Vec3::ZERO;
        self.velocities[index] = Vec3::ZERO;
        self.ages[index] = 0.0;
        self.lifetimes[index] = 1.0;
        self.colors[index] = Color::WHITE;
        self.masses[index] = 1.0;
        self.sizes[index] = 1.0;
        self.angles[index] = 0.0;
        self.spawners[index] = None;
        self.living += 1;
        Some(index)
    }

    pub(crate) fn set_spawner(&mut self, index: usize, emitter: Option<EmitterRef>) {
        self.spawners[index] = emitter;
    }

    /// Swaps two rows across every array, spawner reference included.
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        self.positions.swap(a, b);
        self.velocities.swap(a, b);
        self.ages.swap(a, b);
        self.lifetimes.swap(a, b);
        self.colors.swap(a, b);
        self.masses.swap(a, b);
        self.sizes.swap(a, b);
        self.angles.swap(a, b);
        self.spawners.swap(a, b);
    }

    /// Drops the last living row, releasing its spawner reference.
    pub(crate) fn pop_living(&mut self) {
        debug_assert!(self.living > 0);
        self.living -= 1;
        self.spawners[self.living] = None;
    }

    /// Changes the pool capacity. The living range never shrinks below the
    /// current living count; callers wanting that must kill particles first.
    pub(crate) fn reallocate(&mut self, capacity: usize) {
        let capacity = capacity.max(self.living);
        self.capacity = capacity;
        self.positions.resize(capacity, Vec3::ZERO);
        self.velocities.resize(capacity, Vec3::ZERO);
        self.ages.resize(capacity, 0.0);
        self.lifetimes.resize(capacity, 1.0);
        self.colors.resize(capacity, Color::WHITE);
        self.masses.resize(capacity, 1.0);
        self.sizes.resize(capacity, 1.0);
        self.angles.resize(capacity, 0.0);
        self.spawners.resize(capacity, None);
    }

    pub fn is_dead(&self, index: usize) -> bool {
        debug_assert!(index < self.living);
        self.ages[index] >= self.lifetimes[index]
    }

    /// Marks a particle dead; it is removed by the next death sweep. Works
    /// for immortal (infinite-lifetime) particles too.
    pub fn kill(&mut self, index: usize) {
        debug_assert!(index < self.living);
        self.ages[index] = f32::INFINITY;
    }

    pub fn position(&self, index: usize) -> Vec3 {
        debug_assert!(index < self.living);
        self.positions[index]
    }

    pub fn set_position(&mut self, index: usize, position: Vec3) {
        debug_assert!(index < self.living);
        self.positions[index] = position;
    }

    pub fn velocity(&self, index: usize) -> Vec3 {
        debug_assert!(index < self.living);
        self.velocities[index]
    }

    pub fn set_velocity(&mut self, index: usize, velocity: Vec3) {
        debug_assert!(index < self.living);
        self.velocities[index] = velocity;
    }

    pub fn age(&self, index: usize) -> f32 {
        debug_assert!(index < self.living);
        self.ages[index]
    }

    pub fn lifetime(&self, index: usize) -> f32 {
        debug_assert!(index < self.living);
        self.lifetimes[index]
    }

    pub fn set_lifetime(&mut self, index: usize, lifetime: f32) {
        debug_assert!(index < self.living);
        self.lifetimes[index] = lifetime;
    }

    pub fn color(&self, index: usize) -> Color {
        debug_assert!(index < self.living);
        self.colors[index]
    }

    pub fn set_color(&mut self, index: usize, color: Color) {
        debug_assert!(index < self.living);
        self.colors[index] = color;
    }

    pub fn mass(&self, index: usize) -> f32 {
        debug_assert!(index < self.living);
        self.masses[index]
    }

    pub fn set_mass(&mut self, index: usize, mass: f32) {
        debug_assert!(index < self.living);
        self.masses[index] = mass.max(MIN_MASS);
    }

    pub fn size(&self, index: usize) -> f32 {
        debug_assert!(index < self.living);
        self.sizes[index]
    }

    pub fn set_size(&mut self, index: usize, size: f32) {
        debug_assert!(index < self.living);
        self.sizes[index] = size;
    }

    pub fn angle(&self, index: usize) -> f32 {
        debug_assert!(index < self.living);
        self.angles[index]
    }

    pub fn set_angle(&mut self, index: usize, angle: f32) {
        debug_assert!(index < self.living);
        self.angles[index] = angle;
    }

    /// Mutable slices over the living range, for whole-pool passes.
    pub fn rows_mut(&mut self) -> ParticleRows<'_> {
        let n = self.living;
        ParticleRows {
            positions: &mut self.positions[..n],
            velocities: &mut self.velocities[..n],
            ages: &mut self.ages[..n],
            lifetimes: &mut self.lifetimes[..n],
            colors: &mut self.colors[..n],
            masses: &mut self.masses[..n],
            sizes: &mut self.sizes[..n],
            angles: &mut self.angles[..n],
        }
    }

    /// Read-only view of one particle.
    pub fn get(&self, index: usize) -> Particle<'_> {
        debug_assert!(index < self.living);
        Particle {
            particles: self,
            index,
        }
    }

    /// Owned copy of one particle's state, safe to keep across a sweep.
    pub fn snapshot(&self, index: usize) -> ParticleSnapshot {
        debug_assert!(index < self.living);
        ParticleSnapshot {
            position: self.positions[index],
            velocity: self.velocities[index],
            age: self.ages[index],
            lifetime: self.lifetimes[index],
            color: self.colors[index],
            mass: self.masses[index],
            size: self.sizes[index],
            angle: self.angles[index],
        }
    }
}

/// Mutable parallel slices over the living range of a pool.
///
/// Handed to modifiers; the split borrows let a pass read one field while
/// writing another without fighting the borrow checker.
pub struct ParticleRows<'a> {
    pub positions: &'a mut [Vec3],
    pub velocities: &'a mut [Vec3],
    pub ages: &'a mut [f32],
    pub lifetimes: &'a mut [f32],
    pub colors: &'a mut [Color],
    pub masses: &'a mut [f32],
    pub sizes: &'a mut [f32],
    pub angles: &'a mut [f32],
}

impl ParticleRows<'_> {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A lightweight read-only view over one particle: an index plus the pool
/// it lives in. Never outlives the pool borrow and never survives a sweep.
#[derive(Clone, Copy)]
pub struct Particle<'a> {
    particles: &'a Particles,
    index: usize,
}

impl Particle<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn position(&self) -> Vec3 {
        self.particles.position(self.index)
    }

    pub fn velocity(&self) -> Vec3 {
        self.particles.velocity(self.index)
    }

    pub fn age(&self) -> f32 {
        self.particles.age(self.index)
    }

    pub fn lifetime(&self) -> f32 {
        self.particles.lifetime(self.index)
    }

    /// Age over lifetime, clamped to `[0, 1]`. Immortal particles report 0.
    pub fn normalized_age(&self) -> f32 {
        let lifetime = self.lifetime();
        if lifetime.is_finite() && lifetime > 0.0 {
            (self.age() / lifetime).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn color(&self) -> Color {
        self.particles.color(self.index)
    }

    pub fn mass(&self) -> f32 {
        self.particles.mass(self.index)
    }

    pub fn size(&self) -> f32 {
        self.particles.size(self.index)
    }

    pub fn angle(&self) -> f32 {
        self.particles.angle(self.index)
    }
}

/// Owned copy of one particle's state at a point in time, used to hand a
/// triggering particle to an action after indices may have been invalidated.
#[derive(Clone, Copy, Debug)]
pub struct ParticleSnapshot {
    pub position: Vec3,
    pub velocity: Vec3,
    pub age: f32,
    pub lifetime: f32,
    pub color: Color,
    pub mass: f32,
    pub size: f32,
    pub angle: f32,
}
