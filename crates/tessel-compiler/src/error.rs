//! Compilation errors

use crate::scope::ScopeError;
use crate::span::Span;
use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("Unresolved reference '{name}' at {span}")]
    UnresolvedReference { name: String, span: Span },

    #[error("Cannot assign to constant '{name}' at {span}")]
    AssignmentToConstant { name: String, span: Span },

    /// Closure environments are copies; a write would never reach the enclosing frame
    #[error("Cannot assign to captured variable '{name}' at {span}")]
    AssignmentToCaptured { name: String, span: Span },

    #[error("Scope error: {0}")]
    Scope(#[from] ScopeError),

    #[error("Internal compiler error: {message}")]
    Invariant { message: String },
}

impl CompileError {
    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        CompileError::Invariant {
            message: message.into(),
        }
    }

    /// Source position of the failure, when the error has one
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::UnresolvedReference { span, .. }
            | CompileError::AssignmentToConstant { span, .. }
            | CompileError::AssignmentToCaptured { span, .. } => Some(*span),
            CompileError::Scope(_) | CompileError::Invariant { .. } => None,
        }
    }
}
