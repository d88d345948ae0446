use thiserror::Error;

/// Typed errors produced while executing a program. All of them are fatal
/// to the current `execute` call; the host decides how to render them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("{operation} cannot be applied to {found}")]
    TypeMismatch { operation: String, found: String },
    #[error("undeclared variable '{name}'")]
    UndeclaredAccess { name: String },
    #[error("variable '{name}' is already declared in this scope")]
    DoubleDeclaration { name: String },
    #[error("function expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("left-hand side of assignment is not a variable or indexed access")]
    NotAssignable,
    #[error("stray '{keyword}' outside of its enclosing construct")]
    StrayBreakContinue { keyword: &'static str },
    #[error("internal evaluator error: {message}")]
    Internal { message: String },
}

impl RuntimeError {
    pub(crate) fn type_mismatch(operation: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            operation: operation.into(),
            found: found.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
