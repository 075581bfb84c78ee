//! Operator resolution and implementations
//!
//! [`resolve`] maps an operator and the operand runtime types to an
//! [`OperatorImpl`]; the call site caches that choice and [`OperatorImpl::apply`]
//! runs it. Resolution rules, in order:
//!
//! 1. numeric operands of the same type use that type's arithmetic;
//! 2. mixed numeric operands promote to the wider type (int < long < float < double);
//! 3. `+` with a text operand converts the other operand to text and concatenates;
//! 4. `==`/`!=`, `is`/`isnt` and `orIfNull` accept every operand pair.

use crate::error::{DispatchError, DispatchResult};
use crate::value::{RuntimeType, Value};
use std::cmp::Ordering;
use tessel_compiler::Operator;

/// Largest text, in bytes, that `text * count` may produce
pub const MAX_REPEAT_BYTES: usize = 1 << 24;

/// Common numeric width of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
    Int,
    Long,
    Float,
    Double,
}

impl NumericKind {
    pub fn of(ty: RuntimeType) -> Option<Self> {
        match ty {
            RuntimeType::Int => Some(NumericKind::Int),
            RuntimeType::Long => Some(NumericKind::Long),
            RuntimeType::Float => Some(NumericKind::Float),
            RuntimeType::Double => Some(NumericKind::Double),
            _ => None,
        }
    }

    fn common(left: RuntimeType, right: RuntimeType) -> Option<Self> {
        left.promote(right).and_then(Self::of)
    }
}

/// Resolved implementation of an operator for one operand signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorImpl {
    Arithmetic(Operator, NumericKind),
    /// Text concatenation, converting a non-text operand to its textual form
    Concat,
    /// Text repeated an integer number of times
    Repeat,
    NumericCompare(Operator, NumericKind),
    TextCompare(Operator),
    Equality { negated: bool },
    Identity { negated: bool },
    OrIfNull,
    Not,
    Negate(NumericKind),
}

/// Choose the implementation of `op` for the operand types, if there is one
pub fn resolve(op: Operator, operands: &[RuntimeType]) -> Option<OperatorImpl> {
    use RuntimeType as T;

    match (op, operands) {
        (Operator::Not, [T::Bool]) => Some(OperatorImpl::Not),
        (Operator::Negate, [operand]) => NumericKind::of(*operand).map(OperatorImpl::Negate),
        (Operator::Equals | Operator::NotEquals, [_, _]) => Some(OperatorImpl::Equality {
            negated: op == Operator::NotEquals,
        }),
        (Operator::Is | Operator::Isnt, [_, _]) => Some(OperatorImpl::Identity {
            negated: op == Operator::Isnt,
        }),
        (Operator::OrIfNull, [_, _]) => Some(OperatorImpl::OrIfNull),
        (op, [left, right]) if op.is_arithmetic() => {
            if let Some(kind) = NumericKind::common(*left, *right) {
                Some(OperatorImpl::Arithmetic(op, kind))
            } else if op.is_additive() && (*left == T::Str || *right == T::Str) {
                Some(OperatorImpl::Concat)
            } else if op == Operator::Times && *left == T::Str && *right == T::Int {
                Some(OperatorImpl::Repeat)
            } else {
                None
            }
        }
        (op, [left, right]) if op.is_ordering() => match (left, right) {
            (T::Str, T::Str) => Some(OperatorImpl::TextCompare(op)),
            _ => NumericKind::common(*left, *right).map(|kind| OperatorImpl::NumericCompare(op, kind)),
        },
        _ => None,
    }
}

/// Error for operands an operator is not defined on
pub(crate) fn unsupported(op: Operator, args: &[Value]) -> DispatchError {
    match args {
        [operand] => DispatchError::UnsupportedUnaryOperator {
            operator: op,
            operand: operand.type_name(),
        },
        [left, right] => DispatchError::UnsupportedOperator {
            operator: op,
            left: left.type_name(),
            right: right.type_name(),
        },
        _ => DispatchError::ArityMismatch {
            name: op.symbol().to_string(),
            expected: op.arity(),
            actual: args.len(),
        },
    }
}

macro_rules! integer_arithmetic {
    ($name:ident, $ty:ty) => {
        fn $name(op: Operator, a: $ty, b: $ty) -> Option<DispatchResult<$ty>> {
            Some(match op {
                Operator::Plus => Ok(a.wrapping_add(b)),
                Operator::Minus => Ok(a.wrapping_sub(b)),
                Operator::Times => Ok(a.wrapping_mul(b)),
                Operator::Divide | Operator::Modulo if b == 0 => {
                    Err(DispatchError::DivisionByZero { operator: op })
                }
                Operator::Divide => Ok(a.wrapping_div(b)),
                Operator::Modulo => Ok(a.wrapping_rem(b)),
                _ => return None,
            })
        }
    };
}

macro_rules! float_arithmetic {
    ($name:ident, $ty:ty) => {
        fn $name(op: Operator, a: $ty, b: $ty) -> Option<$ty> {
            Some(match op {
                Operator::Plus => a + b,
                Operator::Minus => a - b,
                Operator::Times => a * b,
                Operator::Divide => a / b,
                Operator::Modulo => a % b,
                _ => return None,
            })
        }
    };
}

integer_arithmetic!(int_arithmetic, i32);
integer_arithmetic!(long_arithmetic, i64);
float_arithmetic!(float_arithmetic, f32);
float_arithmetic!(double_arithmetic, f64);

fn numeric_ordering(kind: NumericKind, left: &Value, right: &Value) -> Option<Option<Ordering>> {
    Some(match kind {
        NumericKind::Int | NumericKind::Long => Some(left.as_i64()?.cmp(&right.as_i64()?)),
        NumericKind::Float => left.as_f32()?.partial_cmp(&right.as_f32()?),
        NumericKind::Double => left.as_f64()?.partial_cmp(&right.as_f64()?),
    })
}

/// Outcome of an ordering operator; unordered operands (NaN) compare false
fn ordering_holds(op: Operator, ordering: Option<Ordering>) -> bool {
    let Some(ordering) = ordering else {
        return false;
    };
    match op {
        Operator::Less => ordering == Ordering::Less,
        Operator::LessOrEquals => ordering != Ordering::Greater,
        Operator::More => ordering == Ordering::Greater,
        Operator::MoreOrEquals => ordering != Ordering::Less,
        _ => false,
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    let kind = NumericKind::common(left.runtime_type(), right.runtime_type());
    match kind.and_then(|kind| numeric_ordering(kind, left, right)) {
        Some(ordering) => ordering == Some(Ordering::Equal),
        None => left == right,
    }
}

/// `text * count`; a negative count yields the empty text
fn repeat(text: &str, count: i32) -> DispatchResult<Value> {
    let times = usize::try_from(count).unwrap_or(0);
    match text.len().checked_mul(times) {
        Some(length) if length <= MAX_REPEAT_BYTES => Ok(Value::from(text.repeat(times))),
        _ => Err(DispatchError::RepeatTooLarge {
            length: text.len(),
            count,
            limit: MAX_REPEAT_BYTES,
        }),
    }
}

impl OperatorImpl {
    /// Operator this implementation was resolved for
    pub fn operator(&self) -> Operator {
        match self {
            OperatorImpl::Arithmetic(op, _)
            | OperatorImpl::NumericCompare(op, _)
            | OperatorImpl::TextCompare(op) => *op,
            OperatorImpl::Concat => Operator::Plus,
            OperatorImpl::Repeat => Operator::Times,
            OperatorImpl::Equality { negated: false } => Operator::Equals,
            OperatorImpl::Equality { negated: true } => Operator::NotEquals,
            OperatorImpl::Identity { negated: false } => Operator::Is,
            OperatorImpl::Identity { negated: true } => Operator::Isnt,
            OperatorImpl::OrIfNull => Operator::OrIfNull,
            OperatorImpl::Not => Operator::Not,
            OperatorImpl::Negate(_) => Operator::Negate,
        }
    }

    pub fn apply(&self, args: &[Value]) -> DispatchResult<Value> {
        let op = self.operator();
        let result = match (self, args) {
            (OperatorImpl::Arithmetic(op, kind), [left, right]) => match kind {
                NumericKind::Int => left
                    .as_i32()
                    .zip(right.as_i32())
                    .and_then(|(a, b)| int_arithmetic(*op, a, b))
                    .map(|r| r.map(Value::Int)),
                NumericKind::Long => left
                    .as_i64()
                    .zip(right.as_i64())
                    .and_then(|(a, b)| long_arithmetic(*op, a, b))
                    .map(|r| r.map(Value::Long)),
                NumericKind::Float => left
                    .as_f32()
                    .zip(right.as_f32())
                    .and_then(|(a, b)| float_arithmetic(*op, a, b))
                    .map(|r| Ok(Value::Float(r))),
                NumericKind::Double => left
                    .as_f64()
                    .zip(right.as_f64())
                    .and_then(|(a, b)| double_arithmetic(*op, a, b))
                    .map(|r| Ok(Value::Double(r))),
            },
            (OperatorImpl::Concat, [left, right]) => {
                Some(Ok(Value::from(format!("{}{}", left, right))))
            }
            (OperatorImpl::Repeat, [Value::Str(text), Value::Int(count)]) => {
                Some(repeat(text, *count))
            }
            (OperatorImpl::NumericCompare(op, kind), [left, right]) => {
                numeric_ordering(*kind, left, right)
                    .map(|ordering| Ok(Value::Bool(ordering_holds(*op, ordering))))
            }
            (OperatorImpl::TextCompare(op), [Value::Str(left), Value::Str(right)]) => {
                Some(Ok(Value::Bool(ordering_holds(*op, Some(left.cmp(right))))))
            }
            (OperatorImpl::Equality { negated }, [left, right]) => {
                Some(Ok(Value::Bool(equals(left, right) != *negated)))
            }
            (OperatorImpl::Identity { negated }, [left, right]) => {
                Some(Ok(Value::Bool(left.is_identical(right) != *negated)))
            }
            (OperatorImpl::OrIfNull, [left, right]) => {
                Some(Ok(if left.is_null() { right.clone() } else { left.clone() }))
            }
            (OperatorImpl::Not, [Value::Bool(b)]) => Some(Ok(Value::Bool(!b))),
            (OperatorImpl::Negate(_), [operand]) => match operand {
                Value::Int(i) => Some(Ok(Value::Int(i.wrapping_neg()))),
                Value::Long(l) => Some(Ok(Value::Long(l.wrapping_neg()))),
                Value::Float(x) => Some(Ok(Value::Float(-x))),
                Value::Double(d) => Some(Ok(Value::Double(-d))),
                _ => None,
            },
            _ => None,
        };
        result.unwrap_or_else(|| Err(unsupported(op, args)))
    }
}
