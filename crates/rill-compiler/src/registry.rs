//! The function registry.
//!
//! Every function the unit declares — free functions, methods, externs,
//! template instantiations — lands here under a mangled key so that
//! overloads can coexist. The mangling scheme is `base(key,key,...)`,
//! using [`Type::key`] for each parameter. Methods register under
//! `Class.method`; identifiers cannot contain `.`, so a method can never
//! collide with a free function.

use rill_core::{CompilationError, FuncType, Result, Span, Type};
use rustc_hash::FxHashMap;

use crate::ir::FuncId;

/// What the registry knows about one concrete function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    /// The IR declaration or definition.
    pub func: FuncId,
    /// Language-level signature (parameter and return types).
    pub sig: FuncType,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    entries: FxHashMap<String, FunctionInfo>,
    /// Unqualified base name -> mangled keys, in registration order.
    by_base: FxHashMap<String, Vec<String>>,
}

/// The mangled registry key for a signature.
pub fn mangle(base: &str, params: &[Type], variadic: bool) -> String {
    let mut keys: Vec<String> = params.iter().map(Type::key).collect();
    if variadic {
        keys.push("...".into());
    }
    format!("{base}({})", keys.join(","))
}

/// The unqualified base of a mangled key (everything before the `(`).
pub fn base_of(key: &str) -> &str {
    key.split_once('(').map_or(key, |(base, _)| base)
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its mangled key (or its bare name when
    /// `no_mangle` — externs keep their linkage name).
    ///
    /// Registering the exact same signature again is a no-op; the same
    /// key with a different signature is a redefinition error.
    pub fn register(
        &mut self,
        base: &str,
        info: FunctionInfo,
        no_mangle: bool,
        span: Span,
    ) -> Result<String> {
        let key = if no_mangle {
            base.to_string()
        } else {
            mangle(base, &info.sig.params, info.sig.variadic)
        };
        if let Some(existing) = self.entries.get(&key) {
            if existing.sig == info.sig {
                return Ok(key);
            }
            return Err(CompilationError::ConflictingRedefinition {
                name: key,
                span,
            });
        }
        self.entries.insert(key.clone(), info);
        self.by_base
            .entry(base.to_string())
            .or_default()
            .push(key.clone());
        Ok(key)
    }

    pub fn get(&self, key: &str) -> Option<&FunctionInfo> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// All registered overloads of a base name, in registration order.
    pub fn candidates(&self, base: &str) -> impl Iterator<Item = (&str, &FunctionInfo)> {
        self.by_base
            .get(base)
            .into_iter()
            .flatten()
            .map(|key| (key.as_str(), &self.entries[key]))
    }

    pub fn has_base(&self, base: &str) -> bool {
        self.by_base.contains_key(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FuncId;

    fn sig(params: Vec<Type>) -> FuncType {
        FuncType {
            ret: Type::Void,
            params,
            variadic: false,
        }
    }

    fn info(id: u32, params: Vec<Type>) -> FunctionInfo {
        FunctionInfo {
            func: FuncId(id),
            sig: sig(params),
        }
    }

    #[test]
    fn mangling_scheme() {
        assert_eq!(mangle("f", &[Type::Int(64), Type::Float(64)], false), "f(i64,f64)");
        assert_eq!(mangle("f", &[], false), "f()");
        assert_eq!(mangle("print", &[Type::Int(64)], true), "print(i64,...)");
        assert_eq!(base_of("Point.scale(f64)"), "Point.scale");
        assert_eq!(base_of("no_parens"), "no_parens");
    }

    #[test]
    fn overloads_share_a_base() {
        let mut reg = FunctionRegistry::new();
        reg.register("f", info(0, vec![Type::Int(64)]), false, Span::default())
            .unwrap();
        reg.register("f", info(1, vec![Type::Float(64)]), false, Span::default())
            .unwrap();

        let keys: Vec<&str> = reg.candidates("f").map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["f(i64)", "f(f64)"]);
    }

    #[test]
    fn identical_reregistration_is_noop() {
        let mut reg = FunctionRegistry::new();
        let k1 = reg
            .register("f", info(0, vec![Type::Int(64)]), false, Span::default())
            .unwrap();
        let k2 = reg
            .register("f", info(0, vec![Type::Int(64)]), false, Span::default())
            .unwrap();
        assert_eq!(k1, k2);
        assert_eq!(reg.candidates("f").count(), 1);
    }

    #[test]
    fn conflicting_signature_under_same_key_errors() {
        let mut reg = FunctionRegistry::new();
        reg.register("f", info(0, vec![Type::Int(64)]), false, Span::default())
            .unwrap();
        // Same parameter list mangles to the same key; the return type
        // differs, so this is a redefinition rather than an overload.
        let mut other = info(1, vec![Type::Int(64)]);
        other.sig.ret = Type::Int(64);
        let err = reg
            .register("f", other, false, Span::default())
            .unwrap_err();
        assert!(matches!(err, CompilationError::ConflictingRedefinition { .. }));
    }

    #[test]
    fn no_mangle_keeps_linkage_name() {
        let mut reg = FunctionRegistry::new();
        let key = reg
            .register("print_i64", info(0, vec![Type::Int(64)]), true, Span::default())
            .unwrap();
        assert_eq!(key, "print_i64");
        assert!(reg.get("print_i64").is_some());
    }
}
