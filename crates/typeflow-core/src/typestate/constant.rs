//! Exact constant values
//!
//! A [`Constant`] pairs an opaque immutable payload with the exact type it
//! was observed to have. Constants compare by value; for heap objects the
//! identity handle *is* the value.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::universe::TypeId;

/// The payload of a tracked constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstantValue {
    /// Heap object identity handle assigned by the host.
    Object(u64),
    /// Boxed integral value (narrower kinds extended by the caller).
    Int(i64),
    /// Boxed floating-point value as raw bits, so NaN payloads compare
    /// deterministically.
    FloatBits(u64),
    /// Interned string constant.
    Str(Arc<str>),
    /// Boxed boolean.
    Bool(bool),
}

impl From<&str> for ConstantValue {
    fn from(value: &str) -> Self {
        ConstantValue::Str(Arc::from(value))
    }
}

impl From<i64> for ConstantValue {
    fn from(value: i64) -> Self {
        ConstantValue::Int(value)
    }
}

impl From<f64> for ConstantValue {
    fn from(value: f64) -> Self {
        ConstantValue::FloatBits(value.to_bits())
    }
}

impl From<bool> for ConstantValue {
    fn from(value: bool) -> Self {
        ConstantValue::Bool(value)
    }
}

/// A known exact value together with its exact runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constant {
    type_id: TypeId,
    value: ConstantValue,
}

impl Constant {
    pub fn new(type_id: TypeId, value: impl Into<ConstantValue>) -> Self {
        Constant {
            type_id,
            value: value.into(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn value(&self) -> &ConstantValue {
        &self.value
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            ConstantValue::Object(handle) => write!(f, "{}@{:#x}", self.type_id, handle),
            ConstantValue::Int(v) => write!(f, "{}={}", self.type_id, v),
            ConstantValue::FloatBits(bits) => write!(f, "{}={}", self.type_id, f64::from_bits(*bits)),
            ConstantValue::Str(s) => write!(f, "{}={:?}", self.type_id, s),
            ConstantValue::Bool(b) => write!(f, "{}={}", self.type_id, b),
        }
    }
}
