//! Semantic analysis and code generation for rill compilation units.
//!
//! The crate turns a resolved AST (from `rill-core`) into an SSA IR
//! module. The pipeline is two passes over one unit: registration wires
//! up every class, function, and global so order of declaration never
//! matters; compilation then emits bodies and the deferred global
//! initializers. All state lives in a per-unit [`CompilationContext`] —
//! compiling different units from different threads needs no
//! coordination.
//!
//! ```
//! use rill_core::ast;
//! use rill_core::Span;
//! use rill_compiler::compile_unit;
//!
//! let unit = ast::Unit { decls: &[], span: Span::default() };
//! let module = compile_unit("empty", &unit).unwrap();
//! assert_eq!(module.name, "empty");
//! ```

pub mod context;
pub mod expr;
pub mod function_compiler;
pub mod ir;
pub mod lifecycle;
pub mod overload;
pub mod passes;
pub mod registry;
pub mod scope;
pub mod stmt;
pub mod typing;
pub mod value;

pub use context::{ClassInfo, CompilationContext, Symbol};
pub use passes::compile_unit;
pub use registry::{FunctionInfo, FunctionRegistry};
pub use scope::{Scope, SymbolTable};
pub use value::{Value, Variable};
