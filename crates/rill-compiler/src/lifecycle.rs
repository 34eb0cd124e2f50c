//! Class instance lifecycle.
//!
//! Construction runs when a class-typed variable is declared: a matching
//! user `Class.constructor` overload if one exists, otherwise fieldwise
//! initialization in declaration order (explicit field defaults, then
//! positional field constructor arguments, then zero values). Destruction
//! runs when the binding's scope is popped and on every return path:
//! `Class.destructor` if the user wrote one, then class-typed fields
//! recursively, again in declaration order.

use rill_core::{CompilationError, Result, Span, Type};

use crate::context::{CompilationContext, Symbol};
use crate::expr::{self, compile_call_to};
use crate::overload::get_winning_function;
use crate::scope::Scope;
use crate::typing::{cast_value, zero_const};
use crate::value::{Value, Variable};

fn self_value(var: &Variable, class: &str) -> Value {
    Value::new(
        var.addr,
        Type::Reference(Box::new(Type::Class(class.to_string()))),
    )
}

/// Initialize a freshly allocated class instance.
pub fn call_constructor(
    cx: &mut CompilationContext<'_>,
    var: &Variable,
    args: &[Value],
    span: Span,
) -> Result<()> {
    let class = var
        .ty
        .class_name()
        .ok_or_else(|| CompilationError::internal("constructing a non-class value"))?
        .to_string();

    let base = format!("{class}.constructor");
    if cx.functions.has_base(&base) {
        let mut full_args = vec![self_value(var, &class)];
        full_args.extend_from_slice(args);
        let arg_tys: Vec<Type> = full_args.iter().map(|a| a.ty.clone()).collect();
        let (_, info) = get_winning_function(&cx.functions, &base, &arg_tys, span)?;
        compile_call_to(cx, &info, &full_args, span)?;
        return Ok(());
    }
    if !args.is_empty() {
        // Arguments were passed but the class declares no constructor.
        return Err(CompilationError::NoMatchingOverload {
            name: base,
            args: args.iter().map(|a| a.ty.key()).collect::<Vec<_>>().join(","),
            span,
        });
    }
    construct_fieldwise(cx, var, &class, span)
}

fn construct_fieldwise(
    cx: &mut CompilationContext<'_>,
    var: &Variable,
    class: &str,
    span: Span,
) -> Result<()> {
    let info = cx
        .classes
        .get(class)
        .ok_or_else(|| CompilationError::internal(format!("unregistered class '{class}'")))?
        .clone();

    for (index, field) in info.fields.iter().enumerate() {
        let addr = cx
            .builder
            .emit_field_addr(var.addr, class, index as u32)?;
        if field.ty.class_name().is_some() {
            let field_var = Variable::new(addr, field.ty.clone());
            let mut arg_values = Vec::new();
            if let Some(exprs) = info.ctor_args.get(&field.name) {
                for arg in *exprs {
                    arg_values.push(expr::compile_expr(cx, arg)?);
                }
            }
            call_constructor(cx, &field_var, &arg_values, span)?;
            continue;
        }

        let value = match field.default {
            Some(init) => {
                let v = expr::compile_expr(cx, init)?;
                cast_value(&mut cx.builder, &v, &field.ty, true, init.span())?
                    .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?
            }
            None => {
                let zero = cx.builder.emit_const(zero_const(&field.ty)?)?;
                Value::new(zero, field.ty.clone())
            }
        };
        cx.builder.emit_store(value.repr, addr)?;
    }
    Ok(())
}

/// Tear down one class instance: the user destructor if registered, then
/// class-typed fields recursively in declaration order.
pub fn call_destructor(
    cx: &mut CompilationContext<'_>,
    var: &Variable,
    span: Span,
) -> Result<()> {
    let class = var
        .ty
        .class_name()
        .ok_or_else(|| CompilationError::internal("destructing a non-class value"))?
        .to_string();

    let base = format!("{class}.destructor");
    if cx.functions.has_base(&base) {
        let args = [self_value(var, &class)];
        let arg_tys: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
        let (_, info) = get_winning_function(&cx.functions, &base, &arg_tys, span)?;
        compile_call_to(cx, &info, &args, span)?;
    }

    let info = match cx.classes.get(&class) {
        Some(info) => info.clone(),
        None => return Err(CompilationError::internal(format!("unregistered class '{class}'"))),
    };
    for (index, field) in info.fields.iter().enumerate() {
        if field.ty.class_name().is_some() {
            let addr = cx
                .builder
                .emit_field_addr(var.addr, &class, index as u32)?;
            call_destructor(cx, &Variable::new(addr, field.ty.clone()), span)?;
        }
    }
    Ok(())
}

/// Destroy every class-typed binding of a popped scope, in declaration
/// order.
pub fn destruct_scope(
    cx: &mut CompilationContext<'_>,
    scope: &Scope<Symbol>,
    span: Span,
) -> Result<()> {
    let doomed: Vec<Variable> = scope
        .iter()
        .filter_map(|(_, sym)| match sym {
            // Only owned instances die with a scope; reference bindings
            // (the method receiver) borrow storage that outlives them.
            Symbol::Local(var) if matches!(var.ty, Type::Class(_)) => Some(var.clone()),
            _ => None,
        })
        .collect();
    for var in &doomed {
        call_destructor(cx, var, span)?;
    }
    Ok(())
}

/// Destroy the class-typed locals of every scope above `depth`,
/// innermost scope first. `break` and `continue` run this for the
/// scopes they jump out of.
pub fn destruct_scopes_above(
    cx: &mut CompilationContext<'_>,
    depth: usize,
    span: Span,
) -> Result<()> {
    let doomed: Vec<Variable> = cx
        .symbols
        .scopes_above(depth)
        .flat_map(|scope| {
            scope.iter().filter_map(|(_, sym)| match sym {
                Symbol::Local(var) if matches!(var.ty, Type::Class(_)) => Some(var.clone()),
                _ => None,
            })
        })
        .collect();
    for var in &doomed {
        call_destructor(cx, var, span)?;
    }
    Ok(())
}

/// Destroy every live local in every active scope, innermost scope
/// first. Runs before each `return` so early exits behave like falling
/// off the end of every enclosing block.
pub fn destruct_live_locals(cx: &mut CompilationContext<'_>, span: Span) -> Result<()> {
    let doomed: Vec<Variable> = cx
        .symbols
        .locals_innermost_first()
        .flat_map(|scope| {
            scope.iter().filter_map(|(_, sym)| match sym {
                Symbol::Local(var) if matches!(var.ty, Type::Class(_)) => Some(var.clone()),
                _ => None,
            })
        })
        .collect();
    for var in &doomed {
        call_destructor(cx, var, span)?;
    }
    Ok(())
}
