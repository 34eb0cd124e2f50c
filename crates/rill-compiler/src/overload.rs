//! Overload resolution.
//!
//! A call site names a base (`f`, or `Point.scale` for a method) and a
//! list of argument types. Resolution ranks the registered overloads of
//! that base by the number of implicit conversions the call would need
//! and picks the cheapest. Exactly one winner is required: a tie is an
//! ambiguity error, zero applicable candidates is a no-match error.

use rill_core::{CompilationError, Result, Span, Type};

use crate::registry::{FunctionInfo, FunctionRegistry};
use crate::typing::cast_cost;

/// The conversion count a candidate would need for these arguments, or
/// `None` when it cannot accept them at all.
///
/// Variadic candidates accept any number of extra arguments past the
/// fixed parameters, at no ranking cost; the promotion of variadic
/// `f32` arguments happens at emission, not here.
fn applicability(info: &FunctionInfo, args: &[Type]) -> Option<u32> {
    let fixed = &info.sig.params;
    if args.len() < fixed.len() {
        return None;
    }
    if !info.sig.variadic && args.len() != fixed.len() {
        return None;
    }
    let mut cost = 0;
    for (arg, param) in args.iter().zip(fixed) {
        cost += cast_cost(arg, param)?;
    }
    Some(cost)
}

/// Resolve a call to the single cheapest overload of `base`.
pub fn get_winning_function(
    registry: &FunctionRegistry,
    base: &str,
    args: &[Type],
    span: Span,
) -> Result<(String, FunctionInfo)> {
    if !registry.has_base(base) {
        return Err(CompilationError::UndefinedSymbol {
            name: base.to_string(),
            span,
        });
    }

    let mut best: Option<(u32, &str, &FunctionInfo)> = None;
    let mut tied: Vec<&str> = Vec::new();
    for (key, info) in registry.candidates(base) {
        let Some(cost) = applicability(info, args) else {
            continue;
        };
        match &best {
            Some((best_cost, ..)) if cost > *best_cost => {}
            Some((best_cost, best_key, _)) if cost == *best_cost => {
                if tied.is_empty() {
                    tied.push(*best_key);
                }
                tied.push(key);
            }
            _ => {
                tied.clear();
                best = Some((cost, key, info));
            }
        }
    }

    if !tied.is_empty() {
        return Err(CompilationError::AmbiguousCall {
            name: base.to_string(),
            candidates: tied.join(", "),
            span,
        });
    }
    match best {
        Some((_, key, info)) => Ok((key.to_string(), info.clone())),
        None => Err(CompilationError::NoMatchingOverload {
            name: base.to_string(),
            args: args.iter().map(Type::key).collect::<Vec<_>>().join(","),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FuncId;
    use rill_core::FuncType;

    fn registry_with(sigs: &[(&str, Vec<Type>, bool)]) -> FunctionRegistry {
        let mut reg = FunctionRegistry::new();
        for (i, (base, params, variadic)) in sigs.iter().enumerate() {
            let info = FunctionInfo {
                func: FuncId(i as u32),
                sig: FuncType {
                    ret: Type::Void,
                    params: params.clone(),
                    variadic: *variadic,
                },
            };
            reg.register(base, info, false, Span::default()).unwrap();
        }
        reg
    }

    #[test]
    fn exact_match_beats_cast() {
        let reg = registry_with(&[
            ("f", vec![Type::Int(64)], false),
            ("f", vec![Type::Float(64)], false),
        ]);

        let (key, _) =
            get_winning_function(&reg, "f", &[Type::Int(64)], Span::default()).unwrap();
        assert_eq!(key, "f(i64)");
        let (key, _) =
            get_winning_function(&reg, "f", &[Type::Float(64)], Span::default()).unwrap();
        assert_eq!(key, "f(f64)");
    }

    #[test]
    fn single_cast_candidate_wins_when_unique() {
        let reg = registry_with(&[("f", vec![Type::Float(64)], false)]);
        let (key, _) =
            get_winning_function(&reg, "f", &[Type::Int(64)], Span::default()).unwrap();
        assert_eq!(key, "f(f64)");
    }

    #[test]
    fn equal_cost_candidates_are_ambiguous() {
        // i32 needs one cast for either overload.
        let reg = registry_with(&[
            ("f", vec![Type::Int(64)], false),
            ("f", vec![Type::Int(16)], false),
        ]);
        let err =
            get_winning_function(&reg, "f", &[Type::Int(32)], Span::default()).unwrap_err();
        assert!(matches!(err, CompilationError::AmbiguousCall { .. }));
    }

    #[test]
    fn wrong_arity_is_no_match() {
        let reg = registry_with(&[("f", vec![Type::Int(64)], false)]);
        let err = get_winning_function(
            &reg,
            "f",
            &[Type::Int(64), Type::Int(64)],
            Span::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::NoMatchingOverload { .. }));
    }

    #[test]
    fn unknown_base_is_undefined() {
        let reg = registry_with(&[]);
        let err = get_winning_function(&reg, "g", &[], Span::default()).unwrap_err();
        assert!(matches!(err, CompilationError::UndefinedSymbol { .. }));
    }

    #[test]
    fn variadic_accepts_extra_arguments() {
        let reg = registry_with(&[("log", vec![Type::Int(64)], true)]);
        let (key, info) = get_winning_function(
            &reg,
            "log",
            &[Type::Int(64), Type::Float(32), Type::Float(64)],
            Span::default(),
        )
        .unwrap();
        assert_eq!(key, "log(i64,...)");
        assert!(info.sig.variadic);
    }

    #[test]
    fn unconvertible_argument_is_no_match() {
        let reg = registry_with(&[("f", vec![Type::Int(64)], false)]);
        let err = get_winning_function(
            &reg,
            "f",
            &[Type::Class("Point".into())],
            Span::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::NoMatchingOverload { .. }));
    }
}
