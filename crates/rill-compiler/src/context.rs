//! Per-unit compilation state.
//!
//! Everything mutable during a compile lives here: the IR builder with
//! its insertion cursor, the symbol table, the function and class
//! registries, the loop target stacks, the label counter, the
//! expression-type cache, and the deferred-global queue. A context is
//! built, driven over one unit, and dropped; two units never share one,
//! which is the whole concurrency story.

use rill_core::ast::{Expr, FunctionDecl, GlobalDecl, TypeExpr};
use rill_core::{ClassField, CompilationError, Result, Span, Type};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::{BlockId, Builder, FuncId, GlobalId};
use crate::registry::FunctionRegistry;
use crate::value::Variable;

/// A registered class: fields in declaration order plus the positional
/// constructor arguments attached to individual field declarations.
#[derive(Debug, Clone)]
pub struct ClassInfo<'ast> {
    pub fields: Vec<ClassField<&'ast Expr<'ast>>>,
    pub ctor_args: FxHashMap<String, &'ast [&'ast Expr<'ast>]>,
}

/// What a name in the symbol table resolves to.
///
/// Locals carry their stack address directly; globals carry the module
/// handle, and each use materializes the address inside the current
/// function.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Local(Variable),
    Global(GlobalId, Type),
}

pub struct CompilationContext<'ast> {
    pub builder: Builder,
    pub symbols: crate::scope::SymbolTable<Symbol>,
    pub functions: FunctionRegistry,
    pub classes: FxHashMap<String, ClassInfo<'ast>>,

    /// Uninstantiated function templates by name.
    pub templates: FxHashMap<String, &'ast FunctionDecl<'ast>>,
    /// Active template substitution (parameter name -> concrete type).
    pub substitution: FxHashMap<String, Type>,
    /// Mangled instance keys already materialized.
    pub instantiated: FxHashSet<String>,

    /// Memoized expression types, keyed by node address. Cleared around
    /// template instantiation, where the same node can type differently.
    type_cache: FxHashMap<usize, Type>,

    /// Innermost-last jump targets for `break` / `continue`.
    pub break_targets: Vec<BlockId>,
    pub continue_targets: Vec<BlockId>,
    /// Scope depth at each enclosing loop's entry, innermost last. Loop
    /// jumps destroy the locals of every scope above this depth.
    pub loop_scope_depths: Vec<usize>,

    /// Return type of the function currently being compiled.
    pub current_ret: Option<Type>,

    /// Declarations registered in pass one whose bodies pass two still
    /// has to compile, with their registry keys.
    pub pending_bodies: Vec<(&'ast FunctionDecl<'ast>, String)>,

    /// Global definitions whose initializers wait for the init function.
    pub deferred_globals: Vec<&'ast GlobalDecl<'ast>>,
    /// Globals already defined; re-evaluating a definition is a no-op.
    pub materialized_globals: FxHashMap<String, GlobalId>,

    /// The synthetic function that hosts non-constant global initializers.
    pub init_func: Option<FuncId>,

    label_counter: u32,
}

impl<'ast> CompilationContext<'ast> {
    pub fn new(module_name: &str) -> Self {
        Self {
            builder: Builder::new(module_name),
            symbols: crate::scope::SymbolTable::new(),
            functions: FunctionRegistry::new(),
            classes: FxHashMap::default(),
            templates: FxHashMap::default(),
            substitution: FxHashMap::default(),
            instantiated: FxHashSet::default(),
            type_cache: FxHashMap::default(),
            break_targets: Vec::new(),
            continue_targets: Vec::new(),
            loop_scope_depths: Vec::new(),
            current_ret: None,
            pending_bodies: Vec::new(),
            deferred_globals: Vec::new(),
            materialized_globals: FxHashMap::default(),
            init_func: None,
            label_counter: 0,
        }
    }

    /// Run `f` with only the global scope visible, then reattach the
    /// caller's local scopes. Global initializers and template instance
    /// bodies compile through here so they cannot capture locals of
    /// whatever function happens to be mid-compile.
    pub fn with_global_only<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let locals = self.symbols.detach_locals();
        let result = f(self);
        self.symbols.reattach_locals(locals);
        result
    }

    /// A fresh label with the given prefix, unique within the unit.
    pub fn unique_label(&mut self, prefix: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("{prefix}.{n}")
    }

    // ------------------------------------------------------------------
    // Type resolution
    // ------------------------------------------------------------------

    /// Resolve a type annotation against the active substitution and the
    /// class registry.
    pub fn resolve_type(&self, expr: &TypeExpr<'ast>, span: Span) -> Result<Type> {
        match expr {
            TypeExpr::Void => Ok(Type::Void),
            TypeExpr::Int(w) => Ok(Type::Int(*w)),
            TypeExpr::Float(w) => Ok(Type::Float(*w)),
            TypeExpr::Ptr(inner) => {
                Ok(Type::Ptr(Box::new(self.resolve_type(inner, span)?)))
            }
            TypeExpr::Array(elem, len) => Ok(Type::Array(
                Box::new(self.resolve_type(elem, span)?),
                *len,
            )),
            TypeExpr::Named(name) => {
                if let Some(substituted) = self.substitution.get(*name) {
                    return Ok(substituted.clone());
                }
                if self.classes.contains_key(*name) {
                    return Ok(Type::Class((*name).to_string()));
                }
                Err(CompilationError::UndefinedSymbol {
                    name: (*name).to_string(),
                    span,
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Expression-type cache
    // ------------------------------------------------------------------

    pub fn cached_type(&self, expr: &'ast Expr<'ast>) -> Option<Type> {
        self.type_cache.get(&node_key(expr)).cloned()
    }

    pub fn memoize_type(&mut self, expr: &'ast Expr<'ast>, ty: Type) -> Type {
        self.type_cache.insert(node_key(expr), ty.clone());
        ty
    }

    /// Drop every memoized type. Template instantiation re-types the same
    /// nodes under a different substitution, so stale entries would leak
    /// one instance's types into the next.
    pub fn clear_type_cache(&mut self) {
        self.type_cache.clear();
    }
}

/// Cache key for an arena-allocated node: its address is stable for the
/// life of the arena.
fn node_key<'ast>(expr: &'ast Expr<'ast>) -> usize {
    expr as *const Expr<'ast> as usize
}
