//! Values that fluents can hold.
//!
//! Fluents range over booleans, integers and reals. Arithmetic promotes
//! booleans to 0/1 and integers to reals, mirroring the modeling language.

use serde::{Deserialize, Serialize};

/// Declared range of a pvariable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// `true` / `false`.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Real,
}

impl ValueType {
    /// Returns the zero value for this range, used when no default is declared.
    #[must_use]
    pub const fn zero(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Real => Value::Real(0.0),
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Real => "real",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete fluent value.
///
/// # Examples
///
/// ```
/// use fluentsim::{Value, ValueType};
///
/// let v = Value::Bool(true);
/// assert_eq!(v.as_real(), Some(1.0));
/// assert_eq!(v.coerce(ValueType::Real), Some(Value::Real(1.0)));
/// assert_eq!(Value::Real(0.5).coerce(ValueType::Bool), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Real value.
    Real(f64),
}

impl Value {
    /// Returns true for boolean values.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Boolean view; numbers are not truthy.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view; booleans read as 0/1, reals never narrow.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(v) => Some(*v as i64),
            Self::Real(_) => None,
        }
    }

    /// Numeric view of the value; booleans read as 0/1.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Bool(true) => Some(1.0),
            Self::Bool(false) => Some(0.0),
        }
    }

    /// Returns the runtime type of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Real(_) => ValueType::Real,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.value_type().name()
    }

    /// Converts this value into the given range, if the conversion is lossless
    /// in the modeling language's sense (widening only; integral reals narrow to int).
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn coerce(self, target: ValueType) -> Option<Self> {
        match (self, target) {
            (Self::Bool(v), ValueType::Bool) => Some(Self::Bool(v)),
            (Self::Bool(v), ValueType::Int) => Some(Self::Int(i64::from(v))),
            (Self::Int(v), ValueType::Int) => Some(Self::Int(v)),
            (Self::Real(v), ValueType::Int) if v.fract() == 0.0 && v.is_finite() => {
                Some(Self::Int(v as i64))
            }
            (_, ValueType::Real) => self.as_real().map(Self::Real),
            _ => None,
        }
    }

    /// Bitwise-stable encoding used for hashing trajectories.
    #[must_use]
    pub fn to_le_bytes(&self) -> [u8; 9] {
        let mut out = [0u8; 9];
        match self {
            Self::Bool(v) => {
                out[0] = 0;
                out[1] = u8::from(*v);
            }
            Self::Int(v) => {
                out[0] = 1;
                out[1..].copy_from_slice(&v.to_le_bytes());
            }
            Self::Real(v) => {
                out[0] = 2;
                out[1..].copy_from_slice(&v.to_bits().to_le_bytes());
            }
        }
        out
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}
