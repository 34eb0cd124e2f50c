//! Scoped symbol tables.
//!
//! A `Scope` maps names to bindings and remembers declaration order — the
//! destructor pass iterates a popped scope and teardown must be
//! deterministic, so iteration order is the order names were inserted.
//!
//! A `SymbolTable` is a stack of scopes. Scope 0 is the permanent global
//! scope; it is pushed at construction and can never be popped. Lookups
//! walk from an offset below the top toward the global scope, so the
//! nearest enclosing binding shadows outer ones.

use rill_core::{CompilationError, Result, Span};
use rustc_hash::FxHashMap;

/// One lexical scope: name -> binding, iterable in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Scope<T> {
    names: FxHashMap<String, usize>,
    entries: Vec<(String, T)>,
}

impl<T> Scope<T> {
    pub fn new() -> Self {
        Self {
            names: FxHashMap::default(),
            entries: Vec::new(),
        }
    }

    /// Bind a name. Rebinding within one scope is an error.
    pub fn insert(&mut self, name: &str, binding: T, span: Span) -> Result<()> {
        if self.names.contains_key(name) {
            return Err(CompilationError::DuplicateSymbol {
                name: name.into(),
                span,
            });
        }
        self.names.insert(name.into(), self.entries.len());
        self.entries.push((name.into(), binding));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.names.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Bindings in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(name, t)| (name.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A stack of scopes with a permanent global scope at the bottom.
#[derive(Debug, Clone)]
pub struct SymbolTable<T> {
    scopes: Vec<Scope<T>>,
}

impl<T> SymbolTable<T> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the top scope and hand it back (the lifecycle pass walks it).
    /// Popping the global scope is a compiler defect.
    pub fn pop_scope(&mut self) -> Result<Scope<T>> {
        if self.scopes.len() <= 1 {
            return Err(CompilationError::internal(
                "attempted to pop the global scope",
            ));
        }
        self.scopes
            .pop()
            .ok_or_else(|| CompilationError::internal("scope stack underflow"))
    }

    /// Bind a name in the scope `scopes_from_top` below the top (1 = the
    /// innermost scope).
    pub fn insert(&mut self, name: &str, binding: T, scopes_from_top: usize, span: Span) -> Result<()> {
        let len = self.scopes.len();
        if scopes_from_top == 0 || scopes_from_top > len {
            return Err(CompilationError::internal(format!(
                "scope offset {scopes_from_top} out of range (depth {len})"
            )));
        }
        self.scopes[len - scopes_from_top].insert(name, binding, span)
    }

    /// Bind a name in the global scope regardless of current depth.
    pub fn insert_global(&mut self, name: &str, binding: T, span: Span) -> Result<()> {
        let depth = self.scopes.len();
        self.insert(name, binding, depth, span)
    }

    /// Resolve a name, searching from `scopes_from_top` below the top
    /// down to (optionally) the global scope. The nearest enclosing
    /// binding wins.
    pub fn lookup(
        &self,
        name: &str,
        include_global: bool,
        scopes_from_top: usize,
        span: Span,
    ) -> Result<&T> {
        let len = self.scopes.len();
        if scopes_from_top == 0 || scopes_from_top > len {
            return Err(CompilationError::internal(format!(
                "scope offset {scopes_from_top} out of range (depth {len})"
            )));
        }
        let floor = if include_global { 0 } else { 1 };
        for scope in self.scopes[floor..=len - scopes_from_top].iter().rev() {
            if let Some(binding) = scope.get(name) {
                return Ok(binding);
            }
        }
        Err(CompilationError::UndefinedSymbol {
            name: name.into(),
            span,
        })
    }

    /// Resolve against the global scope only.
    pub fn lookup_global(&self, name: &str, span: Span) -> Result<&T> {
        self.scopes[0].get(name).ok_or_else(|| {
            CompilationError::UndefinedSymbol {
                name: name.into(),
                span,
            }
        })
    }

    /// Scopes above the global scope, innermost first. Return paths walk
    /// this to tear down every live local before leaving the function.
    pub fn locals_innermost_first(&self) -> impl Iterator<Item = &Scope<T>> {
        self.scopes[1..].iter().rev()
    }

    /// Scopes strictly above `depth`, innermost first. Loop jumps walk
    /// this to tear down the locals of the scopes they exit.
    pub fn scopes_above(&self, depth: usize) -> impl Iterator<Item = &Scope<T>> {
        self.scopes[depth..].iter().rev()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.contains(name))
    }

    pub fn contains_global(&self, name: &str) -> bool {
        self.scopes[0].contains(name)
    }

    /// Detach every scope above the global one, leaving a table that sees
    /// only globals. Pair with [`SymbolTable::reattach_locals`].
    pub fn detach_locals(&mut self) -> Vec<Scope<T>> {
        self.scopes.split_off(1)
    }

    /// Reattach scopes detached by [`SymbolTable::detach_locals`],
    /// discarding any scope left pushed in between.
    pub fn reattach_locals(&mut self, mut locals: Vec<Scope<T>>) {
        self.scopes.truncate(1);
        self.scopes.append(&mut locals);
    }

    /// Evaluate `f` against this table with only the global scope
    /// visible. Used for code that must not observe the local bindings of
    /// whatever is currently being compiled (global initializers).
    ///
    /// The closure gets a real table — it may push and pop scopes of its
    /// own and bind new globals — but any scope it leaves pushed is
    /// discarded, and the caller's local scopes are reattached afterwards.
    /// Structuring the escape hatch as a closure makes unbalanced
    /// discard/restore pairs unrepresentable.
    pub fn with_global_only<R>(&mut self, f: impl FnOnce(&mut SymbolTable<T>) -> R) -> R {
        let locals = self.detach_locals();
        let result = f(self);
        self.reattach_locals(locals);
        result
    }
}

impl<T> Default for SymbolTable<T> {
    fn default() -> Self {
        Self::new()
    }
}
