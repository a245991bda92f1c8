use glam::Quat;
use serde::Serialize;

/// Absolute tolerance used when comparing recorded values.
pub const VALUE_EPSILON: f32 = 1e-6;

/// The value type of a track, as understood by the viewer's keyframe tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Number,
    Vector,
    Quaternion,
    Boolean,
}

impl ValueKind {
    #[must_use]
    pub fn js_type(self) -> &'static str {
        match self {
            ValueKind::Number => "number",
            ValueKind::Vector => "vector",
            ValueKind::Quaternion => "quaternion",
            ValueKind::Boolean => "boolean",
        }
    }
}

/// A typed property value, either sent to the viewer or recorded into a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f32),
    Vector(Vec<f32>),
    /// `[x, y, z, w]`
    Quaternion([f32; 4]),
    Boolean(bool),
}

impl PropertyValue {
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Number(_) => ValueKind::Number,
            PropertyValue::Vector(_) => ValueKind::Vector,
            PropertyValue::Quaternion(_) => ValueKind::Quaternion,
            PropertyValue::Boolean(_) => ValueKind::Boolean,
        }
    }

    /// Structural equality with a float tolerance of [`VALUE_EPSILON`].
    ///
    /// Vectors of different lengths and values of different kinds are never
    /// equal. Quaternions `q` and `-q` describe the same rotation and compare
    /// equal.
    #[must_use]
    pub fn approx_eq(&self, other: &PropertyValue) -> bool {
        let close = |a: f32, b: f32| (a - b).abs() <= VALUE_EPSILON;
        match (self, other) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => close(*a, *b),
            (PropertyValue::Vector(a), PropertyValue::Vector(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| close(*x, *y))
            }
            (PropertyValue::Quaternion(a), PropertyValue::Quaternion(b)) => {
                a.iter().zip(b).all(|(x, y)| close(*x, *y))
                    || a.iter().zip(b).all(|(x, y)| close(*x, -*y))
            }
            (PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => a == b,
            _ => false,
        }
    }

    /// Interpolates towards `end` as the viewer would between two keys.
    ///
    /// Booleans and mismatched vectors hold `self` (step).
    #[must_use]
    pub fn interpolate(&self, end: &PropertyValue, t: f32) -> PropertyValue {
        match (self, end) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => PropertyValue::Number(a + (b - a) * t),
            (PropertyValue::Vector(a), PropertyValue::Vector(b)) if a.len() == b.len() => {
                PropertyValue::Vector(a.iter().zip(b).map(|(x, y)| x + (y - x) * t).collect())
            }
            (PropertyValue::Quaternion(a), PropertyValue::Quaternion(b)) => {
                let q = Quat::from_array(*a).slerp(Quat::from_array(*b), t);
                PropertyValue::Quaternion(q.to_array())
            }
            _ => self.clone(),
        }
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<Vec<f32>> for PropertyValue {
    fn from(value: Vec<f32>) -> Self {
        PropertyValue::Vector(value)
    }
}

impl From<glam::Vec3> for PropertyValue {
    fn from(value: glam::Vec3) -> Self {
        PropertyValue::Vector(value.to_array().to_vec())
    }
}

impl From<Quat> for PropertyValue {
    fn from(value: Quat) -> Self {
        PropertyValue::Quaternion(value.to_array())
    }
}
