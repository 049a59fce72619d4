//! Ordered attribute records.

use super::AttributeValue;
use crate::error::EmberError;
use crate::math::{Color, Vec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An ordered set of uniquely-named typed attributes describing one object.
///
/// Typed getters return `Ok(None)` when the attribute is absent (import
/// leaves the current value untouched) and `Err` when it is present with the
/// wrong type. Setting an attribute that already exists replaces it, so
/// names stay unique.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Registry tag identifying the concrete type (e.g. `"ember.gravity"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    type_id: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    attributes: IndexMap<String, AttributeValue>,
}

impl Descriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor tagged with a concrete type identifier.
    pub fn with_type(type_id: impl Into<String>) -> Self {
        Self {
            type_id: Some(type_id.into()),
            attributes: IndexMap::new(),
        }
    }

    pub fn type_id(&self) -> Option<&str> {
        self.type_id.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the attribute was set. Presence in the map is the "was set"
    /// flag; exporters omit attributes left at their defaults.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Attributes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Sets an attribute unless it equals its declared default, keeping
    /// serialized output minimal.
    pub fn set_non_default(
        &mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
        is_default: bool,
    ) {
        if !is_default {
            self.set(name, value);
        }
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) {
        self.set(name, AttributeValue::Bool(value));
    }

    pub fn set_i32(&mut self, name: impl Into<String>, value: i32) {
        self.set(name, AttributeValue::Int(value));
    }

    pub fn set_f32(&mut self, name: impl Into<String>, value: f32) {
        self.set(name, AttributeValue::Float(value));
    }

    pub fn set_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, AttributeValue::String(value.into()));
    }

    /// Sets a two-bound attribute, collapsing to a single value when both
    /// bounds agree.
    pub fn set_i32_bounds(&mut self, name: impl Into<String>, min: i32, max: i32) {
        if min == max {
            self.set(name, AttributeValue::Int(min));
        } else {
            self.set(
                name,
                AttributeValue::List(vec![AttributeValue::Int(min), AttributeValue::Int(max)]),
            );
        }
    }

    /// See [`Descriptor::set_i32_bounds`].
    pub fn set_f32_bounds(&mut self, name: impl Into<String>, min: f32, max: f32) {
        if min == max {
            self.set(name, AttributeValue::Float(min));
        } else {
            self.set(
                name,
                AttributeValue::List(vec![
                    AttributeValue::Float(min),
                    AttributeValue::Float(max),
                ]),
            );
        }
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &'static str,
        get: impl Fn(&'a AttributeValue) -> Option<T>,
    ) -> Result<Option<T>, EmberError> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(value) => get(value).map(Some).ok_or_else(|| EmberError::TypeMismatch {
                name: name.to_owned(),
                expected,
                found: value.type_name(),
            }),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, EmberError> {
        self.typed(name, "Bool", AttributeValue::as_bool)
    }

    pub fn get_i32(&self, name: &str) -> Result<Option<i32>, EmberError> {
        self.typed(name, "Int", AttributeValue::as_i32)
    }

    pub fn get_f32(&self, name: &str) -> Result<Option<f32>, EmberError> {
        self.typed(name, "Float", AttributeValue::as_f32)
    }

    pub fn get_vec3(&self, name: &str) -> Result<Option<Vec3>, EmberError> {
        self.typed(name, "Vec3", AttributeValue::as_vec3)
    }

    pub fn get_color(&self, name: &str) -> Result<Option<Color>, EmberError> {
        self.typed(name, "Color", AttributeValue::as_color)
    }

    pub fn get_str(&self, name: &str) -> Result<Option<&str>, EmberError> {
        self.typed(name, "String", AttributeValue::as_str)
    }

    pub fn get_object(&self, name: &str) -> Result<Option<&Descriptor>, EmberError> {
        self.typed(name, "Object", AttributeValue::as_object)
    }

    pub fn get_reference(&self, name: &str) -> Result<Option<&str>, EmberError> {
        self.typed(name, "Reference", AttributeValue::as_reference)
    }

    /// Reads a scalar-or-list attribute as integers: a single `Int` yields a
    /// one-element vec. Used by two-bound attributes such as an emitter's
    /// tank, where arity selects between "both bounds" and "min/max".
    pub fn get_i32s(&self, name: &str) -> Result<Option<Vec<i32>>, EmberError> {
        self.typed(name, "Int or List of Int", |value| match value {
            AttributeValue::Int(v) => Some(vec![*v]),
            AttributeValue::List(values) => {
                values.iter().map(AttributeValue::as_i32).collect()
            }
            _ => None,
        })
    }

    /// See [`Descriptor::get_i32s`].
    pub fn get_f32s(&self, name: &str) -> Result<Option<Vec<f32>>, EmberError> {
        self.typed(name, "Float or List of Float", |value| match value {
            AttributeValue::Float(v) => Some(vec![*v]),
            AttributeValue::List(values) => {
                values.iter().map(AttributeValue::as_f32).collect()
            }
            _ => None,
        })
    }

    /// Reads a list of nested object descriptors.
    pub fn get_objects(&self, name: &str) -> Result<Option<Vec<&Descriptor>>, EmberError> {
        self.typed(name, "List of Object", |value| match value {
            AttributeValue::List(values) => {
                values.iter().map(AttributeValue::as_object).collect()
            }
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut desc = Descriptor::new();
        desc.set_i32("flow", 1);
        desc.set_i32("flow", 2);
        assert_eq!(desc.len(), 1);
        assert_eq!(desc.get_i32("flow").unwrap(), Some(2));
    }

    #[test]
    fn test_missing_is_none_mismatch_is_error() {
        let mut desc = Descriptor::new();
        desc.set_bool("active", true);

        assert_eq!(desc.get_bool("missing").unwrap(), None);
        assert!(desc.get_f32("active").is_err());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut desc = Descriptor::new();
        desc.set_i32("b", 1);
        desc.set_i32("a", 2);
        let names: Vec<_> = desc.iter().map(|(n, _)| n.to_owned()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn test_bounds_collapse_when_equal() {
        let mut desc = Descriptor::new();
        desc.set_i32_bounds("tank", 5, 5);
        desc.set_i32_bounds("count", 1, 4);
        assert_eq!(desc.get_i32s("tank").unwrap(), Some(vec![5]));
        assert_eq!(desc.get_i32s("count").unwrap(), Some(vec![1, 4]));
    }

    #[test]
    fn test_descriptor_json_round_trip() {
        let mut desc = Descriptor::with_type("ember.test");
        desc.set_bool("active", false);
        desc.set_f32_bounds("force", 1.0, 2.0);
        desc.set("zone", Descriptor::with_type("ember.zone"));

        let json = serde_json::to_string(&desc).unwrap();
        let restored: Descriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, desc);
    }
}
