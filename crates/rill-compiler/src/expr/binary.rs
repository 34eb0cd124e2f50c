//! The generic operator evaluator.
//!
//! One routine handles every arithmetic operator and one every
//! comparison: evaluate both operands, dispatch to a user-defined infix
//! overload if one is registered for the operand types, and otherwise
//! unify the types through the winning-type rule, cast both sides to
//! the winner, and emit the integer or float instruction the operator
//! kind maps to. Built-in comparison results carry the boolean
//! representation type; an infix overload keeps its declared return
//! type.
//!
//! Infix overloads are ordinary free functions registered under the
//! base `infix.<symbol>` (for example `infix.+`) with two parameters.

use rill_core::ast::{BinaryExpr, BinaryOp, CompareExpr, CompareOp, UnaryExpr, UnaryOp};
use rill_core::{CompilationError, Result, Span, Type};

use crate::context::CompilationContext;
use crate::ir::{BinOp, CmpOp};
use crate::overload::get_winning_function;
use crate::registry::FunctionInfo;
use crate::typing::{cast_value, winning_type};
use crate::value::Value;

use super::{compile_call_to, compile_expr};

pub(crate) fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
    }
}

pub(crate) fn compare_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Lt => "<",
        CompareOp::Gt => ">",
        CompareOp::Le => "<=",
        CompareOp::Ge => ">=",
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
    }
}

/// A user-registered infix overload applicable to the operand types, if
/// any. Resolution failures fall back to the built-in operator.
pub(crate) fn infix_overload(
    cx: &CompilationContext<'_>,
    symbol: &str,
    lhs: &Type,
    rhs: &Type,
    span: Span,
) -> Option<FunctionInfo> {
    let base = format!("infix.{symbol}");
    if !cx.functions.has_base(&base) {
        return None;
    }
    get_winning_function(&cx.functions, &base, &[lhs.clone(), rhs.clone()], span)
        .ok()
        .map(|(_, info)| info)
}

fn unify_operands(
    cx: &mut CompilationContext<'_>,
    lhs: Value,
    rhs: Value,
    span: Span,
) -> Result<(Value, Value, Type)> {
    let ty = winning_type(&lhs.ty, &rhs.ty, span)?;
    let lhs = cast_value(&mut cx.builder, &lhs, &ty, true, span)?
        .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?;
    let rhs = cast_value(&mut cx.builder, &rhs, &ty, true, span)?
        .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?;
    Ok((lhs, rhs, ty))
}

fn arith_op(op: BinaryOp, float: bool) -> BinOp {
    match (op, float) {
        (BinaryOp::Add, false) => BinOp::Add,
        (BinaryOp::Sub, false) => BinOp::Sub,
        (BinaryOp::Mul, false) => BinOp::Mul,
        (BinaryOp::Div, false) => BinOp::SDiv,
        (BinaryOp::Rem, false) => BinOp::SRem,
        (BinaryOp::Add, true) => BinOp::FAdd,
        (BinaryOp::Sub, true) => BinOp::FSub,
        (BinaryOp::Mul, true) => BinOp::FMul,
        (BinaryOp::Div, true) => BinOp::FDiv,
        (BinaryOp::Rem, true) => BinOp::FRem,
    }
}

fn cmp_op(op: CompareOp) -> CmpOp {
    match op {
        CompareOp::Lt => CmpOp::Lt,
        CompareOp::Gt => CmpOp::Gt,
        CompareOp::Le => CmpOp::Le,
        CompareOp::Ge => CmpOp::Ge,
        CompareOp::Eq => CmpOp::Eq,
        CompareOp::Ne => CmpOp::Ne,
    }
}

pub fn compile_binary<'ast>(
    cx: &mut CompilationContext<'ast>,
    bin: &'ast BinaryExpr<'ast>,
) -> Result<Value> {
    let lhs = compile_expr(cx, bin.lhs)?;
    let rhs = compile_expr(cx, bin.rhs)?;
    if let Some(info) = infix_overload(cx, binary_symbol(bin.op), &lhs.ty, &rhs.ty, bin.span) {
        return compile_call_to(cx, &info, &[lhs, rhs], bin.span);
    }
    let (lhs, rhs, ty) = unify_operands(cx, lhs, rhs, bin.span)?;
    if !ty.is_int() && !ty.is_float() {
        return Err(CompilationError::TypeMismatch {
            lhs: lhs.ty.to_string(),
            rhs: rhs.ty.to_string(),
            span: bin.span,
        });
    }
    let repr = cx
        .builder
        .emit_binary(arith_op(bin.op, ty.is_float()), lhs.repr, rhs.repr)?;
    Ok(Value::new(repr, ty))
}

pub fn compile_compare<'ast>(
    cx: &mut CompilationContext<'ast>,
    cmp: &'ast CompareExpr<'ast>,
) -> Result<Value> {
    let lhs = compile_expr(cx, cmp.lhs)?;
    let rhs = compile_expr(cx, cmp.rhs)?;
    if let Some(info) = infix_overload(cx, compare_symbol(cmp.op), &lhs.ty, &rhs.ty, cmp.span) {
        return compile_call_to(cx, &info, &[lhs, rhs], cmp.span);
    }
    let (lhs, rhs, ty) = unify_operands(cx, lhs, rhs, cmp.span)?;
    if !ty.is_int() && !ty.is_float() {
        return Err(CompilationError::TypeMismatch {
            lhs: lhs.ty.to_string(),
            rhs: rhs.ty.to_string(),
            span: cmp.span,
        });
    }
    let repr = cx
        .builder
        .emit_cmp(cmp_op(cmp.op), ty.is_float(), lhs.repr, rhs.repr)?;
    Ok(Value::new(repr, Type::bool_repr()))
}

pub fn compile_unary<'ast>(
    cx: &mut CompilationContext<'ast>,
    unary: &'ast UnaryExpr<'ast>,
) -> Result<Value> {
    let operand = compile_expr(cx, unary.operand)?;
    match unary.op {
        UnaryOp::Neg => {
            let repr = if operand.ty.is_float() {
                let width = operand
                    .ty
                    .bit_width()
                    .ok_or_else(|| CompilationError::internal("float without width"))?;
                let zero = cx.builder.emit_float(width, 0.0)?;
                cx.builder.emit_binary(BinOp::FSub, zero, operand.repr)?
            } else if operand.ty.is_int() {
                let width = operand
                    .ty
                    .bit_width()
                    .ok_or_else(|| CompilationError::internal("int without width"))?;
                let zero = cx.builder.emit_int(width, 0)?;
                cx.builder.emit_binary(BinOp::Sub, zero, operand.repr)?
            } else {
                return Err(CompilationError::TypeMismatch {
                    lhs: operand.ty.to_string(),
                    rhs: operand.ty.to_string(),
                    span: unary.span,
                });
            };
            Ok(Value::new(repr, operand.ty))
        }
        UnaryOp::Not => {
            // `!x` is zero-equality on the widened operand.
            let wide = cast_value(&mut cx.builder, &operand, &Type::Int(64), true, unary.span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?;
            let zero = cx.builder.emit_int(64, 0)?;
            let repr = cx.builder.emit_cmp(CmpOp::Eq, false, wide.repr, zero)?;
            Ok(Value::new(repr, Type::bool_repr()))
        }
    }
}
