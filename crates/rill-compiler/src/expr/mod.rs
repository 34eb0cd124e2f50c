//! Expression compilation.
//!
//! Every expression node supports two operations: `type_of`, which
//! computes the result type without emitting IR (memoized on the
//! context), and `compile_expr`, which emits IR and yields a [`Value`].
//! Lvalue expressions additionally support `compile_addr`, which yields
//! the address being named instead of the value stored there.
//!
//! Class-typed lvalues evaluate to their address wrapped in a
//! `Reference` type; member access and method dispatch consume that
//! address, and the transparent equality of references keeps overload
//! resolution unaware of the distinction.

pub mod binary;
pub mod calls;
pub mod member;

pub use calls::{compile_call, compile_call_to, resolve_call};

use rill_core::ast::{Expr, LiteralKind, UnaryOp};
use rill_core::{CompilationError, Result, Type};

use crate::context::{CompilationContext, Symbol};
use crate::ir::Const;
use crate::typing::{cast_value, lower_type, winning_type};
use crate::value::{Value, Variable};

/// The type an expression evaluates to, without emitting IR for it.
///
/// Calls are the one exception to "without emitting": resolving a
/// templated call may materialize the instance's declaration, which is
/// idempotent.
pub fn type_of<'ast>(cx: &mut CompilationContext<'ast>, expr: &'ast Expr<'ast>) -> Result<Type> {
    if let Some(ty) = cx.cached_type(expr) {
        return Ok(ty);
    }
    let ty = match expr {
        Expr::Literal(lit) => match lit.kind {
            LiteralKind::Int(_, width) => Type::Int(width),
            LiteralKind::Float(_, width) => Type::Float(width),
            LiteralKind::Bool(_) => Type::bool_repr(),
        },
        Expr::Ident(ident) => {
            match cx.symbols.lookup(ident.name, true, 1, ident.span).ok().cloned() {
                Some(Symbol::Local(var)) => var.ty,
                Some(Symbol::Global(_, ty)) => ty,
                // A bare function name evaluates to a function value.
                None => {
                    let info = calls::function_reference(cx, ident.name, ident.span)?;
                    Type::Function(Box::new(info.sig))
                }
            }
        }
        Expr::Unary(unary) => match unary.op {
            UnaryOp::Neg => type_of(cx, unary.operand)?,
            UnaryOp::Not => Type::bool_repr(),
        },
        Expr::Binary(bin) => {
            let lhs = type_of(cx, bin.lhs)?;
            let rhs = type_of(cx, bin.rhs)?;
            let symbol = binary::binary_symbol(bin.op);
            match binary::infix_overload(cx, symbol, &lhs, &rhs, bin.span) {
                Some(info) => info.sig.ret,
                None => winning_type(&lhs, &rhs, bin.span)?,
            }
        }
        Expr::Compare(cmp) => {
            let lhs = type_of(cx, cmp.lhs)?;
            let rhs = type_of(cx, cmp.rhs)?;
            let symbol = binary::compare_symbol(cmp.op);
            match binary::infix_overload(cx, symbol, &lhs, &rhs, cmp.span) {
                Some(info) => info.sig.ret,
                None => Type::bool_repr(),
            }
        }
        Expr::Assign(assign) => type_of(cx, assign.target)?,
        Expr::Cast(cast) => cx.resolve_type(&cast.ty, cast.span)?,
        Expr::Call(call) => match calls::indirect_signature(cx, call) {
            Some(sig) => sig.ret,
            None => resolve_call(cx, call)?.1.sig.ret,
        },
        Expr::Member(member) => member::member_type(cx, member)?,
        Expr::If(ifx) => {
            let mut unified = type_of(cx, ifx.branches[0])?;
            for branch in ifx.branches[1..].iter().chain([&ifx.else_branch]) {
                let ty = type_of(cx, *branch)?;
                unified = winning_type(&unified, &ty, ifx.span).map_err(|_| {
                    CompilationError::BranchTypeMismatch {
                        expected: unified.to_string(),
                        found: ty.to_string(),
                        span: branch.span(),
                    }
                })?;
            }
            unified
        }
    };
    Ok(cx.memoize_type(expr, ty))
}

/// Emit IR for an expression and return its value.
pub fn compile_expr<'ast>(
    cx: &mut CompilationContext<'ast>,
    expr: &'ast Expr<'ast>,
) -> Result<Value> {
    match expr {
        Expr::Literal(lit) => {
            let (c, ty) = match lit.kind {
                LiteralKind::Int(value, width) => {
                    (Const::Int { width, value }, Type::Int(width))
                }
                LiteralKind::Float(value, width) => {
                    (Const::Float { width, value }, Type::Float(width))
                }
                LiteralKind::Bool(b) => (
                    Const::Int {
                        width: 8,
                        value: b as i64,
                    },
                    Type::bool_repr(),
                ),
            };
            Ok(Value::new(cx.builder.emit_const(c)?, ty))
        }
        Expr::Ident(ident) => {
            match cx.symbols.lookup(ident.name, true, 1, ident.span).ok().cloned() {
                Some(Symbol::Local(var)) => load_or_reference(cx, &var),
                Some(Symbol::Global(id, ty)) => {
                    let addr = cx.builder.emit_global_addr(id)?;
                    load_or_reference(cx, &Variable::new(addr, ty))
                }
                None => {
                    let info = calls::function_reference(cx, ident.name, ident.span)?;
                    let repr = cx.builder.emit_func_addr(info.func)?;
                    Ok(Value::new(repr, Type::Function(Box::new(info.sig))))
                }
            }
        }
        Expr::Member(_) => {
            let var = compile_addr(cx, expr)?;
            load_or_reference(cx, &var)
        }
        Expr::Unary(unary) => binary::compile_unary(cx, unary),
        Expr::Binary(bin) => binary::compile_binary(cx, bin),
        Expr::Compare(cmp) => binary::compile_compare(cx, cmp),
        Expr::Assign(assign) => {
            let target = compile_addr(cx, assign.target)?;
            let value = compile_expr(cx, assign.value)?;
            let stored = cast_value(&mut cx.builder, &value, &target.ty, true, assign.span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?;
            cx.builder.emit_store(stored.repr, target.addr)?;
            Ok(stored)
        }
        Expr::Cast(cast) => {
            let target = cx.resolve_type(&cast.ty, cast.span)?;
            let value = compile_expr(cx, cast.expr)?;
            cast_value(&mut cx.builder, &value, &target, true, cast.span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))
        }
        Expr::Call(call) => compile_call(cx, call),
        Expr::If(ifx) => crate::stmt::if_stmt::compile_if_expr(cx, ifx),
    }
}

/// The address an lvalue expression names.
pub fn compile_addr<'ast>(
    cx: &mut CompilationContext<'ast>,
    expr: &'ast Expr<'ast>,
) -> Result<Variable> {
    match expr {
        Expr::Ident(ident) => {
            let symbol = cx.symbols.lookup(ident.name, true, 1, ident.span)?.clone();
            match symbol {
                Symbol::Local(var) => Ok(var),
                Symbol::Global(id, ty) => {
                    let addr = cx.builder.emit_global_addr(id)?;
                    Ok(Variable::new(addr, ty))
                }
            }
        }
        Expr::Member(member) => member::member_addr(cx, member),
        other => Err(CompilationError::NotAssignable { span: other.span() }),
    }
}

/// Read a variable: scalars load, class instances evaluate to their
/// address as a `Reference`.
fn load_or_reference(cx: &mut CompilationContext<'_>, var: &Variable) -> Result<Value> {
    if let Some(class) = var.ty.class_name() {
        return Ok(Value::new(
            var.addr,
            Type::Reference(Box::new(Type::Class(class.to_string()))),
        ));
    }
    let loaded = cx.builder.emit_load(var.addr, lower_type(&var.ty)?)?;
    Ok(Value::new(loaded, var.ty.clone()))
}
