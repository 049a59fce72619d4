//! Auxiliary per-particle storage.
//!
//! A [`DataSet`] is a bundle of typed arrays, one row per particle slot,
//! owned by the group on behalf of a single modifier or initializer. Rows
//! are swapped in lockstep with the particle pool's swap-removal, so a row
//! always describes the particle at the same index.

use crate::math::{Color, Vec3};
use rustc_hash::FxHashMap;

/// One typed per-particle array inside a data set.
#[derive(Clone, Debug)]
pub enum DataArray {
    F32(Vec<f32>),
    Vec3(Vec<Vec3>),
    Color(Vec<Color>),
}

impl DataArray {
    fn len(&self) -> usize {
        match self {
            DataArray::F32(v) => v.len(),
            DataArray::Vec3(v) => v.len(),
            DataArray::Color(v) => v.len(),
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        match self {
            DataArray::F32(v) => v.swap(a, b),
            DataArray::Vec3(v) => v.swap(a, b),
            DataArray::Color(v) => v.swap(a, b),
        }
    }

    fn resize(&mut self, len: usize) {
        match self {
            DataArray::F32(v) => v.resize(len, 0.0),
            DataArray::Vec3(v) => v.resize(len, Vec3::ZERO),
            DataArray::Color(v) => v.resize(len, Color::WHITE),
        }
    }
}

/// A bundle of named typed per-particle arrays, sized to a group's capacity.
#[derive(Clone, Debug, Default)]
pub struct DataSet {
    capacity: usize,
    arrays: FxHashMap<&'static str, DataArray>,
}

impl DataSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            arrays: FxHashMap::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn add_f32(&mut self, name: &'static str) -> &mut Self {
        self.arrays
            .insert(name, DataArray::F32(vec![0.0; self.capacity]));
        self
    }

    pub fn add_vec3(&mut self, name: &'static str) -> &mut Self {
        self.arrays
            .insert(name, DataArray::Vec3(vec![Vec3::ZERO; self.capacity]));
        self
    }

    pub fn add_color(&mut self, name: &'static str) -> &mut Self {
        self.arrays
            .insert(name, DataArray::Color(vec![Color::WHITE; self.capacity]));
        self
    }

    pub fn f32s(&self, name: &str) -> Option<&[f32]> {
        match self.arrays.get(name) {
            Some(DataArray::F32(v)) => Some(v),
            _ => None,
        }
    }

    pub fn f32s_mut(&mut self, name: &str) -> Option<&mut [f32]> {
        match self.arrays.get_mut(name) {
            Some(DataArray::F32(v)) => Some(v),
            _ => None,
        }
    }

    pub fn vec3s(&self, name: &str) -> Option<&[Vec3]> {
        match self.arrays.get(name) {
            Some(DataArray::Vec3(v)) => Some(v),
            _ => None,
        }
    }

    pub fn vec3s_mut(&mut self, name: &str) -> Option<&mut [Vec3]> {
        match self.arrays.get_mut(name) {
            Some(DataArray::Vec3(v)) => Some(v),
            _ => None,
        }
    }

    pub fn colors(&self, name: &str) -> Option<&[Color]> {
        match self.arrays.get(name) {
            Some(DataArray::Color(v)) => Some(v),
            _ => None,
        }
    }

    pub fn colors_mut(&mut self, name: &str) -> Option<&mut [Color]> {
        match self.arrays.get_mut(name) {
            Some(DataArray::Color(v)) => Some(v),
            _ => None,
        }
    }

    /// Swaps two rows across every array. Used by the death sweep so
    /// auxiliary data follows its particle.
    pub fn swap(&mut self, a: usize, b: usize) {
        for array in self.arrays.values_mut() {
            array.swap(a, b);
        }
    }

    /// Resizes every array to a new capacity. Rows past the old capacity
    /// are default-filled.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        for array in self.arrays.values_mut() {
            array.resize(capacity);
        }
    }

    #[cfg(test)]
    fn consistent(&self) -> bool {
        self.arrays.values().all(|a| a.len() == self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrays_sized_to_capacity() {
        let mut set = DataSet::new(8);
        set.add_f32("phase").add_vec3("drift");
        assert_eq!(set.f32s("phase").unwrap().len(), 8);
        assert_eq!(set.vec3s("drift").unwrap().len(), 8);
        assert!(set.consistent());
    }

    #[test]
    fn test_wrong_type_lookup_is_none() {
        let mut set = DataSet::new(4);
        set.add_f32("phase");
        assert!(set.vec3s("phase").is_none());
        assert!(set.f32s("missing").is_none());
    }

    #[test]
    fn test_swap_moves_all_rows() {
        let mut set = DataSet::new(4);
        set.add_f32("phase").add_vec3("drift");
        set.f32s_mut("phase").unwrap()[0] = 1.0;
        set.vec3s_mut("drift").unwrap()[0] = Vec3::ONE;

        set.swap(0, 3);
        assert_eq!(set.f32s("phase").unwrap()[3], 1.0);
        assert_eq!(set.vec3s("drift").unwrap()[3], Vec3::ONE);
        assert_eq!(set.f32s("phase").unwrap()[0], 0.0);
    }

    #[test]
    fn test_resize_keeps_existing_rows() {
        let mut set = DataSet::new(2);
        set.add_f32("phase");
        set.f32s_mut("phase").unwrap()[1] = 2.0;
        set.resize(5);
        assert_eq!(set.f32s("phase").unwrap().len(), 5);
        assert_eq!(set.f32s("phase").unwrap()[1], 2.0);
        assert!(set.consistent());
    }
}
