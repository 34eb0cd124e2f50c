//! Call compilation: overload resolution, method dispatch, template
//! instantiation, and argument coercion.
//!
//! Resolution order for `obj.m(...)`: the method `Class.m` wins if the
//! class declares one; otherwise the call falls back to a free function
//! `m` taking the object as its first argument. Explicit template
//! arguments materialize the named template's instance on first use;
//! subsequent calls reuse it.
//!
//! A call through a function-typed binding is indirect: the name
//! resolves to the variable (variables shadow functions at call sites),
//! its stored function value is loaded, and the call goes through the
//! pointer instead of a resolved overload.

use rill_core::ast::{CallExpr, Callee, Expr, FunctionDecl};
use rill_core::{CompilationError, FuncType, Result, Span, Type};

use crate::context::{CompilationContext, Symbol};
use crate::function_compiler::compile_function_body;
use crate::ir::{FuncSig, IrType};
use crate::overload::get_winning_function;
use crate::registry::{mangle, FunctionInfo};
use crate::typing::{cast_value, lower_type};
use crate::value::Value;

use super::{compile_expr, type_of};

/// Resolve a call site to a registered overload.
///
/// Returns the registry key, the winning signature, and the object
/// expression to prepend as the first argument (method dispatch and the
/// free-function fallback both pass one).
pub fn resolve_call<'ast>(
    cx: &mut CompilationContext<'ast>,
    call: &'ast CallExpr<'ast>,
) -> Result<(String, FunctionInfo, Option<&'ast Expr<'ast>>)> {
    let mut arg_tys = Vec::with_capacity(call.args.len() + 1);
    let (base, self_arg) = match &call.callee {
        Callee::Name(name) => ((*name).to_string(), None),
        Callee::Method { object, name } => {
            let object_ty = type_of(cx, object)?;
            let Some(class) = object_ty.class_name().map(str::to_string) else {
                return Err(CompilationError::InvalidMemberAccess {
                    ty: object_ty.to_string(),
                    member: (*name).to_string(),
                    span: call.span,
                });
            };
            let qualified = format!("{class}.{name}");
            if cx.functions.has_base(&qualified) {
                arg_tys.push(object_ty);
                (qualified, Some(*object))
            } else {
                // Free-function fallback with the object as first argument.
                arg_tys.push(object_ty);
                ((*name).to_string(), Some(*object))
            }
        }
    };
    for arg in call.args {
        arg_tys.push(type_of(cx, arg)?);
    }

    let base = if call.type_args.is_empty() {
        base
    } else {
        instantiate_template(cx, &base, call, call.span)?
    };

    let (key, info) = get_winning_function(&cx.functions, &base, &arg_tys, call.span)?;
    Ok((key, info, self_arg))
}

/// Resolve a bare function name to a value-usable reference. Overloaded
/// names are rejected: without a call site there is no way to pick.
pub fn function_reference(
    cx: &CompilationContext<'_>,
    name: &str,
    span: Span,
) -> Result<FunctionInfo> {
    let mut found: Option<(String, FunctionInfo)> = None;
    for (key, info) in cx.functions.candidates(name) {
        if let Some((first, _)) = &found {
            return Err(CompilationError::AmbiguousCall {
                name: name.to_string(),
                candidates: format!("{first}, {key}"),
                span,
            });
        }
        found = Some((key.to_string(), info.clone()));
    }
    found
        .map(|(_, info)| info)
        .ok_or_else(|| CompilationError::UndefinedSymbol {
            name: name.to_string(),
            span,
        })
}

/// The binding and signature of a function-typed variable the callee
/// name resolves to, if any.
fn indirect_callee(
    cx: &CompilationContext<'_>,
    name: &str,
    span: Span,
) -> Option<(Symbol, FuncType)> {
    let symbol = cx.symbols.lookup(name, true, 1, span).ok()?.clone();
    let ty = match &symbol {
        Symbol::Local(var) => var.ty.clone(),
        Symbol::Global(_, ty) => ty.clone(),
    };
    match ty.contained() {
        Type::Function(sig) => Some((symbol, (**sig).clone())),
        _ => None,
    }
}

/// The signature a call site would invoke through a function-typed
/// binding, if its callee names one.
pub(crate) fn indirect_signature(
    cx: &CompilationContext<'_>,
    call: &CallExpr<'_>,
) -> Option<FuncType> {
    let Callee::Name(name) = &call.callee else {
        return None;
    };
    if !call.type_args.is_empty() {
        return None;
    }
    indirect_callee(cx, name, call.span).map(|(_, sig)| sig)
}

/// Compile a call expression: resolve, evaluate arguments, coerce, emit.
pub fn compile_call<'ast>(
    cx: &mut CompilationContext<'ast>,
    call: &'ast CallExpr<'ast>,
) -> Result<Value> {
    if let Callee::Name(name) = &call.callee {
        if call.type_args.is_empty() {
            if let Some((symbol, sig)) = indirect_callee(cx, name, call.span) {
                return compile_indirect_call(cx, name, &symbol, &sig, call);
            }
        }
    }
    let (_, info, self_arg) = resolve_call(cx, call)?;
    let mut values = Vec::with_capacity(call.args.len() + 1);
    if let Some(object) = self_arg {
        values.push(compile_expr(cx, object)?);
    }
    for arg in call.args {
        values.push(compile_expr(cx, arg)?);
    }
    compile_call_to(cx, &info, &values, call.span)
}

/// Emit a call to a resolved function: fixed arguments are cast to the
/// parameter types, variadic tail `f32` arguments are promoted to `f64`.
pub fn compile_call_to(
    cx: &mut CompilationContext<'_>,
    info: &FunctionInfo,
    args: &[Value],
    span: Span,
) -> Result<Value> {
    let fixed = info.sig.params.len();
    let mut reprs = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let coerced = if index < fixed {
            cast_value(&mut cx.builder, arg, &info.sig.params[index], true, span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?
        } else if *arg.ty.contained() == Type::Float(32) {
            cast_value(&mut cx.builder, arg, &Type::Float(64), true, span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?
        } else {
            arg.clone()
        };
        reprs.push(coerced.repr);
    }
    let repr = cx.builder.emit_call(info.func, reprs)?;
    Ok(Value::new(repr, info.sig.ret.clone()))
}

fn compile_indirect_call<'ast>(
    cx: &mut CompilationContext<'ast>,
    name: &str,
    symbol: &Symbol,
    sig: &FuncType,
    call: &'ast CallExpr<'ast>,
) -> Result<Value> {
    let fixed = sig.params.len();
    if call.args.len() < fixed || (call.args.len() > fixed && !sig.variadic) {
        return Err(CompilationError::NoMatchingOverload {
            name: name.to_string(),
            args: format!("{} arguments", call.args.len()),
            span: call.span,
        });
    }

    let mut reprs = Vec::with_capacity(call.args.len());
    for (index, arg) in call.args.iter().enumerate() {
        let value = compile_expr(cx, arg)?;
        let coerced = if index < fixed {
            cast_value(&mut cx.builder, &value, &sig.params[index], true, call.span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?
        } else if *value.ty.contained() == Type::Float(32) {
            cast_value(&mut cx.builder, &value, &Type::Float(64), true, call.span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?
        } else {
            value
        };
        reprs.push(coerced.repr);
    }

    let callee = match symbol {
        Symbol::Local(var) => cx.builder.emit_load(var.addr, IrType::Ptr)?,
        Symbol::Global(id, _) => {
            let addr = cx.builder.emit_global_addr(*id)?;
            cx.builder.emit_load(addr, IrType::Ptr)?
        }
    };
    let repr = cx.builder.emit_call_ptr(callee, reprs)?;
    Ok(Value::new(repr, sig.ret.clone()))
}

/// Materialize the instance of a template for the given explicit type
/// arguments, compiling its body on first use. Returns the instance's
/// base name for overload resolution.
fn instantiate_template<'ast>(
    cx: &mut CompilationContext<'ast>,
    base: &str,
    call: &'ast CallExpr<'ast>,
    span: Span,
) -> Result<String> {
    let decl: &'ast FunctionDecl<'ast> = cx
        .templates
        .get(base)
        .copied()
        .ok_or_else(|| CompilationError::UndefinedSymbol {
            name: base.to_string(),
            span,
        })?;
    if decl.template_params.len() != call.type_args.len() {
        return Err(CompilationError::NoMatchingOverload {
            name: base.to_string(),
            args: format!("{} type arguments", call.type_args.len()),
            span,
        });
    }

    let mut type_args = Vec::with_capacity(call.type_args.len());
    for ty in call.type_args {
        type_args.push(cx.resolve_type(ty, span)?);
    }
    let keys: Vec<String> = type_args.iter().map(Type::key).collect();
    let instance_base = format!("{base}<{}>", keys.join(","));
    if cx.instantiated.contains(&instance_base) {
        return Ok(instance_base);
    }
    cx.instantiated.insert(instance_base.clone());

    // The instance types and compiles under its own substitution; the
    // caller's memoized types would be wrong inside it, and its own
    // would be wrong outside, so flush the cache on both edges.
    let outer_subst = std::mem::take(&mut cx.substitution);
    cx.substitution = decl
        .template_params
        .iter()
        .map(|p| (*p).to_string())
        .zip(type_args)
        .collect();
    cx.clear_type_cache();

    let result = (|| -> Result<()> {
        let mut params = Vec::with_capacity(decl.params.len());
        for p in decl.params {
            params.push(cx.resolve_type(&p.ty, decl.span)?);
        }
        let ret = cx.resolve_type(&decl.ret, decl.span)?;
        let sig = FuncType {
            ret,
            params,
            variadic: decl.variadic,
        };

        let key = mangle(&instance_base, &sig.params, sig.variadic);
        let mut ir_params = Vec::with_capacity(sig.params.len());
        for p in &sig.params {
            ir_params.push(lower_type(p)?);
        }
        let ir_sig = FuncSig {
            ret: lower_type(&sig.ret)?,
            params: ir_params,
            variadic: sig.variadic,
        };
        let func = cx.builder.create_function(key, ir_sig);
        cx.functions.register(
            &instance_base,
            FunctionInfo {
                func,
                sig: sig.clone(),
            },
            false,
            decl.span,
        )?;

        // Compile the instance body away from the caller's cursor and
        // local scopes.
        let cursor = cx.builder.cursor();
        cx.with_global_only(|cx| compile_function_body(cx, decl, func, &sig, false))?;
        cx.builder.restore_cursor(cursor);
        Ok(())
    })();

    cx.substitution = outer_subst;
    cx.clear_type_cache();
    result?;
    Ok(instance_base)
}
