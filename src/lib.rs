//! rill — a compilation core for a small statically typed language.
//!
//! `rill-core` holds the AST, type system, and error taxonomy;
//! `rill-compiler` does semantic analysis and lowers units to an SSA IR
//! with a reference interpreter. This facade re-exports both.

pub use rill_core as core;

pub use rill_compiler as compiler;

pub mod prelude {
    pub use rill_compiler::compile_unit;
    pub use rill_compiler::ir;
    pub use rill_compiler::{CompilationContext, Scope, Symbol, SymbolTable, Value, Variable};
    pub use rill_core::ast;
    pub use rill_core::{CompilationError, FuncType, Result, Span, Type};
}
