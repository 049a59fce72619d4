//! Iteration over living particles.

use crate::particle::{Particle, Particles};

/// Iterator over the living particles of a pool, front to back.
///
/// Yields read-only [`Particle`] views. The pool must not be mutated while
/// the iterator is alive; the borrow checker enforces this.
pub struct ParticleIter<'a> {
    particles: &'a Particles,
    index: usize,
}

impl<'a> ParticleIter<'a> {
    pub(crate) fn new(particles: &'a Particles) -> Self {
        Self {
            particles,
            index: 0,
        }
    }
}

impl<'a> Iterator for ParticleIter<'a> {
    type Item = Particle<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.particles.len() {
            let particle = self.particles.get(self.index);
            self.index += 1;
            Some(particle)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.particles.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ParticleIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iterates_living_range_in_order() {
        let mut pool = Particles::new(4);
        for _ in 0..3 {
            pool.spawn_default();
        }
        pool.set_size(1, 2.0);

        let iter = ParticleIter::new(&pool);
        assert_eq!(iter.len(), 3);
        let sizes: Vec<f32> = iter.map(|p| p.size()).collect();
        assert_eq!(sizes, [1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let pool = Particles::new(4);
        assert_eq!(ParticleIter::new(&pool).count(), 0);
    }
}
