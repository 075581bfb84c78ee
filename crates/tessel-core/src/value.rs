//! Runtime values and their dynamic types
//!
//! A [`Value`] is what flows into a call site; its [`RuntimeType`] is what
//! the call-site guards compare. Objects are shared through `Arc` and
//! compare by identity.

use crate::registry::ClassId;
use std::fmt;
use std::sync::Arc;

/// Dynamically typed value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(Arc<str>),
    Object(Arc<Object>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn runtime_type(&self) -> RuntimeType {
        match self {
            Value::Null => RuntimeType::Null,
            Value::Bool(_) => RuntimeType::Bool,
            Value::Int(_) => RuntimeType::Int,
            Value::Long(_) => RuntimeType::Long,
            Value::Float(_) => RuntimeType::Float,
            Value::Double(_) => RuntimeType::Double,
            Value::Str(_) => RuntimeType::Str,
            Value::Object(object) => RuntimeType::Object(object.class()),
        }
    }

    /// Name of the value's type as shown in diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Object(object) => object.class_name().to_string(),
            other => other.runtime_type().to_string(),
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer value widened to 64 bits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Any numeric value widened to `f32`
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Int(i) => Some(*i as f32),
            Value::Long(l) => Some(*l as f32),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Any numeric value widened to `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Reference identity: same object, or same primitive of the same type
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => self == other,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Double(d) => write!(f, "{:?}", d),
            Value::Str(s) => f.write_str(s),
            Value::Object(object) => write!(f, "{}", object),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

/// Instance of a registered class
#[derive(Debug)]
pub struct Object {
    class: ClassId,
    class_name: Arc<str>,
    fields: Vec<Value>,
}

impl Object {
    pub(crate) fn new(class: ClassId, class_name: Arc<str>, fields: Vec<Value>) -> Self {
        Self {
            class,
            class_name,
            fields,
        }
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.class_name)?;
        if !self.fields.is_empty() {
            f.write_str("(")?;
            for (i, field) in self.fields.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", field)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Dynamic type tag of a value; the unit call-site guards compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeType {
    Null,
    Bool,
    Int,
    Long,
    Float,
    Double,
    Str,
    Object(ClassId),
}

impl RuntimeType {
    /// Position in the numeric promotion order int < long < float < double
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            RuntimeType::Int => Some(0),
            RuntimeType::Long => Some(1),
            RuntimeType::Float => Some(2),
            RuntimeType::Double => Some(3),
            _ => None,
        }
    }

    /// Wider of two numeric types
    pub fn promote(self, other: RuntimeType) -> Option<RuntimeType> {
        let (a, b) = (self.numeric_rank()?, other.numeric_rank()?);
        Some(if a >= b { self } else { other })
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeType::Null => write!(f, "null"),
            RuntimeType::Bool => write!(f, "bool"),
            RuntimeType::Int => write!(f, "int"),
            RuntimeType::Long => write!(f, "long"),
            RuntimeType::Float => write!(f, "float"),
            RuntimeType::Double => write!(f, "double"),
            RuntimeType::Str => write!(f, "string"),
            RuntimeType::Object(class) => write!(f, "object {}", class),
        }
    }
}
