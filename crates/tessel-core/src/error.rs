//! Dispatch errors

use crate::registry::ClassId;
use tessel_compiler::Operator;
use thiserror::Error;

/// Errors raised while resolving or running a dynamically dispatched call
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispatchError {
    /// No implementation of a binary operator for the operand types
    #[error("Operator '{operator}' is not defined for {left} and {right}")]
    UnsupportedOperator {
        operator: Operator,
        left: String,
        right: String,
    },

    #[error("Operator '{operator}' is not defined for {operand}")]
    UnsupportedUnaryOperator { operator: Operator, operand: String },

    /// No method of that name and arity on the receiver
    #[error("No method '{name}' taking {arity} argument(s) on {receiver}")]
    NoSuchMethod {
        name: String,
        receiver: String,
        arity: usize,
    },

    /// Several overloads apply and none is more specific than the others
    #[error("Call to '{name}' on {receiver} is ambiguous between {}", .candidates.join(", "))]
    AmbiguousMethod {
        name: String,
        receiver: String,
        candidates: Vec<String>,
    },

    #[error("Division by zero in '{operator}'")]
    DivisionByZero { operator: Operator },

    /// Operand count does not match the call site or method
    #[error("'{name}' expects {expected} operand(s), got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A native method body failed
    #[error("Method '{name}' failed: {message}")]
    Method { name: String, message: String },

    #[error("Repeating a {length}-byte text {count} times exceeds {limit} bytes")]
    RepeatTooLarge { length: usize, count: i32, limit: usize },

    #[error("Unknown class {0}")]
    UnknownClass(ClassId),
}

impl DispatchError {
    /// Failure raised from inside a native method body
    pub fn method(name: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::Method {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Dispatch result
pub type DispatchResult<T> = Result<T, DispatchError>;
