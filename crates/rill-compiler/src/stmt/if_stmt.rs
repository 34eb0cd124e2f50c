//! `if` in statement and expression position.
//!
//! Both forms share the block plan: one condition block per else-if
//! link, one block per branch body, and a merge block. The predecessor
//! recorded for each branch is the block the branch body *ended* in, not
//! the one it started in — nested control flow moves the insertion
//! point, and the merge (and any phi) must name the block that actually
//! jumps to it.

use rill_core::ast::{IfExpr, IfStmt};
use rill_core::{CompilationError, Result, Type};

use crate::context::CompilationContext;
use crate::expr::{compile_expr, type_of};
use crate::ir::ValueId;
use crate::typing::{cast_to_bool, cast_value, lower_type, winning_type};
use crate::value::Value;

use super::compile_stmt;

pub fn compile_if_stmt<'ast>(
    cx: &mut CompilationContext<'ast>,
    stmt: &'ast IfStmt<'ast>,
) -> Result<()> {
    let func = cx.builder.current_function()?;
    let end_label = cx.unique_label("if.end");
    let end = cx.builder.create_block(func, end_label);
    let count = stmt.conditions.len();

    for i in 0..count {
        let cond_value = compile_expr(cx, stmt.conditions[i])?;
        let cond = cast_to_bool(&mut cx.builder, &cond_value, stmt.span)?;

        let then_label = cx.unique_label("if.then");
        let then_bb = cx.builder.create_block(func, then_label);
        let next_bb = if i + 1 < count {
            let label = cx.unique_label("if.cond");
            cx.builder.create_block(func, label)
        } else if stmt.else_branch.is_some() {
            let label = cx.unique_label("if.else");
            cx.builder.create_block(func, label)
        } else {
            end
        };
        cx.builder.emit_cond_br(cond, then_bb, next_bb)?;

        cx.builder.set_insertion_point(func, then_bb);
        compile_stmt(cx, stmt.branches[i])?;
        if !cx.builder.terminated()? {
            cx.builder.emit_br(end)?;
        }
        cx.builder.set_insertion_point(func, next_bb);
    }

    if let Some(else_branch) = stmt.else_branch {
        compile_stmt(cx, else_branch)?;
        if !cx.builder.terminated()? {
            cx.builder.emit_br(end)?;
        }
        cx.builder.set_insertion_point(func, end);
    }
    Ok(())
}

/// `if` in expression position: every branch yields a value, cast to the
/// winning type across all branches, merged with a phi in the end block.
pub fn compile_if_expr<'ast>(
    cx: &mut CompilationContext<'ast>,
    expr: &'ast IfExpr<'ast>,
) -> Result<Value> {
    // Unify branch types up front; each branch value is cast to this.
    let mut unified = type_of(cx, expr.branches[0])?;
    for branch in expr.branches[1..].iter().chain([&expr.else_branch]) {
        let ty = type_of(cx, *branch)?;
        unified = winning_type(&unified, &ty, expr.span).map_err(|_| {
            CompilationError::BranchTypeMismatch {
                expected: unified.to_string(),
                found: ty.to_string(),
                span: branch.span(),
            }
        })?;
    }

    let func = cx.builder.current_function()?;
    let end_label = cx.unique_label("ifx.end");
    let end = cx.builder.create_block(func, end_label);
    let count = expr.conditions.len();
    let mut incoming: Vec<(ValueId, crate::ir::BlockId)> = Vec::with_capacity(count + 1);

    for i in 0..count {
        let cond_value = compile_expr(cx, expr.conditions[i])?;
        let cond = cast_to_bool(&mut cx.builder, &cond_value, expr.span)?;

        let then_label = cx.unique_label("ifx.then");
        let then_bb = cx.builder.create_block(func, then_label);
        let next_label = if i + 1 < count {
            cx.unique_label("ifx.cond")
        } else {
            cx.unique_label("ifx.else")
        };
        let next_bb = cx.builder.create_block(func, next_label);
        cx.builder.emit_cond_br(cond, then_bb, next_bb)?;

        cx.builder.set_insertion_point(func, then_bb);
        let merged = compile_branch_value(cx, expr.branches[i], &unified)?;
        // Whatever block the branch ended in is the phi predecessor.
        let pred = cx.builder.insertion_block()?;
        cx.builder.emit_br(end)?;
        incoming.push((merged, pred));

        cx.builder.set_insertion_point(func, next_bb);
    }

    let merged = compile_branch_value(cx, expr.else_branch, &unified)?;
    let pred = cx.builder.insertion_block()?;
    cx.builder.emit_br(end)?;
    incoming.push((merged, pred));

    cx.builder.set_insertion_point(func, end);
    let repr = cx.builder.emit_phi(lower_type(&unified)?, incoming)?;
    Ok(Value::new(repr, unified))
}

fn compile_branch_value<'ast>(
    cx: &mut CompilationContext<'ast>,
    branch: &'ast rill_core::ast::Expr<'ast>,
    unified: &Type,
) -> Result<ValueId> {
    let value = compile_expr(cx, branch)?;
    let found = value.ty.clone();
    let cast = cast_value(&mut cx.builder, &value, unified, false, branch.span())?.ok_or_else(
        || CompilationError::BranchTypeMismatch {
            expected: unified.to_string(),
            found: found.to_string(),
            span: branch.span(),
        },
    )?;
    Ok(cast.repr)
}
