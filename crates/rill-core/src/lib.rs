//! Shared data model for the rill compiler core.
//!
//! This crate holds everything both the front-of-house (AST producers) and
//! the compiler need to agree on: source spans, the error taxonomy, the
//! semantic type model, and the AST node types.

pub mod ast;
pub mod error;
pub mod span;
pub mod types;

pub use error::{CompilationError, Result};
pub use span::Span;
pub use types::{ClassField, FuncType, Type};
