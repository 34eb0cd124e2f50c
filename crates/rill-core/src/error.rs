//! Error types for semantic analysis and code generation.
//!
//! Compilation is fail-fast: every error here aborts the current unit at the
//! point of detection. There is no recovery and no partial module survives a
//! failed compile — the driver only ever sees a `Result`.
//!
//! `Internal` is reserved for defects in the compiler itself (an empty scope
//! stack, a missing insertion block) as opposed to errors in user source;
//! both share the same fatal propagation path.

use thiserror::Error;

use crate::Span;

/// Errors raised during compilation of a single unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A name was read before any binding for it was in scope.
    #[error("at {span}: the symbol '{name}' is not defined")]
    UndefinedSymbol { name: String, span: Span },

    /// A name was bound twice within the same scope.
    #[error("at {span}: the symbol '{name}' is already defined in this scope")]
    DuplicateSymbol { name: String, span: Span },

    /// Two types with no common coercion target met in one operation.
    #[error("at {span}: type mismatch between '{lhs}' and '{rhs}'")]
    TypeMismatch { lhs: String, rhs: String, span: Span },

    /// A representation-level conversion between two types does not exist.
    #[error("at {span}: cannot cast from '{from}' to '{to}'")]
    CastError { from: String, to: String, span: Span },

    /// More than one overload candidate tied for the fewest casts.
    #[error("at {span}: ambiguous call to '{name}': candidates {candidates}")]
    AmbiguousCall {
        name: String,
        candidates: String,
        span: Span,
    },

    /// No registered overload accepts the given argument types.
    #[error("at {span}: no matching overload for '{name}({args})'")]
    NoMatchingOverload {
        name: String,
        args: String,
        span: Span,
    },

    /// A function was re-registered with a different signature.
    #[error("at {span}: redefinition of '{name}' with a different signature")]
    ConflictingRedefinition { name: String, span: Span },

    /// Member access on something that is not a class instance.
    #[error("at {span}: member access '{member}' on a non-class type '{ty}'")]
    InvalidMemberAccess {
        ty: String,
        member: String,
        span: Span,
    },

    /// Branches of a value-producing construct disagree on type after casting.
    #[error("at {span}: branch type '{found}' does not unify with '{expected}'")]
    BranchTypeMismatch {
        expected: String,
        found: String,
        span: Span,
    },

    /// Assignment (or address-taking) applied to something that is not
    /// an addressable location.
    #[error("at {span}: expression is not an assignable location")]
    NotAssignable { span: Span },

    /// `break` or `continue` written outside of any loop.
    #[error("at {span}: '{keyword}' outside of a loop")]
    MisplacedControl { keyword: String, span: Span },

    /// A defect in the compiler itself, not in the user's source.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// Shorthand for internal invariant violations.
    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the compiler.
pub type Result<T> = std::result::Result<T, CompilationError>;
