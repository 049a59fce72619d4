//! Typed attribute values.

use super::Descriptor;
use crate::math::{Color, Vec3};
use serde::{Deserialize, Serialize};

/// A typed value held by a descriptor attribute.
///
/// `Object` carries an exclusively-owned child as a nested descriptor;
/// `Reference` points at a shared object by name, to be resolved against the
/// importing scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Color(Color),
    String(String),
    /// Nested descriptor for an owned child object
    Object(Descriptor),
    /// Name of a shared object in the importing scope
    Reference(String),
    /// Homogeneous list of values
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Type name used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "Bool",
            AttributeValue::Int(_) => "Int",
            AttributeValue::Float(_) => "Float",
            AttributeValue::Vec3(_) => "Vec3",
            AttributeValue::Color(_) => "Color",
            AttributeValue::String(_) => "String",
            AttributeValue::Object(_) => "Object",
            AttributeValue::Reference(_) => "Reference",
            AttributeValue::List(_) => "List",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            AttributeValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            AttributeValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Descriptor> {
        match self {
            AttributeValue::Object(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            AttributeValue::Reference(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(values) => Some(values),
            _ => None,
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<Vec3> for AttributeValue {
    fn from(v: Vec3) -> Self {
        AttributeValue::Vec3(v)
    }
}

impl From<Color> for AttributeValue {
    fn from(v: Color) -> Self {
        AttributeValue::Color(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

impl From<Descriptor> for AttributeValue {
    fn from(v: Descriptor) -> Self {
        AttributeValue::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_accessors_do_not_coerce() {
        let v = AttributeValue::Int(3);
        assert_eq!(v.as_i32(), Some(3));
        assert_eq!(v.as_f32(), None);
        assert_eq!(v.as_bool(), None);
    }

    #[test]
    fn test_serialization_round_trip() {
        let v = AttributeValue::List(vec![
            AttributeValue::Float(1.5),
            AttributeValue::Vec3(Vec3::new(1.0, 2.0, 3.0)),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        let restored: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, v);
    }
}
