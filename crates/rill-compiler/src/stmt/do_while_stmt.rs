//! `do`-`while` loops. The body block comes first and the entry branch
//! jumps straight into it; the condition only runs after each pass.

use rill_core::ast::DoWhileStmt;
use rill_core::Result;

use crate::context::CompilationContext;
use crate::expr::compile_expr;
use crate::typing::cast_to_bool;

use super::compile_stmt;

pub fn compile_do_while<'ast>(
    cx: &mut CompilationContext<'ast>,
    stmt: &'ast DoWhileStmt<'ast>,
) -> Result<()> {
    let func = cx.builder.current_function()?;
    let body_label = cx.unique_label("do.body");
    let body_bb = cx.builder.create_block(func, body_label);
    let cond_label = cx.unique_label("do.cond");
    let cond_bb = cx.builder.create_block(func, cond_label);
    let end_label = cx.unique_label("do.end");
    let end = cx.builder.create_block(func, end_label);

    cx.builder.emit_br(body_bb)?;

    cx.break_targets.push(end);
    cx.continue_targets.push(cond_bb);
    cx.loop_scope_depths.push(cx.symbols.depth());
    cx.builder.set_insertion_point(func, body_bb);
    let result = compile_stmt(cx, stmt.body);
    cx.break_targets.pop();
    cx.continue_targets.pop();
    cx.loop_scope_depths.pop();
    result?;

    if !cx.builder.terminated()? {
        cx.builder.emit_br(cond_bb)?;
    }
    cx.builder.set_insertion_point(func, cond_bb);
    let cond_value = compile_expr(cx, stmt.condition)?;
    let cond = cast_to_bool(&mut cx.builder, &cond_value, stmt.span)?;
    cx.builder.emit_cond_br(cond, body_bb, end)?;

    cx.builder.set_insertion_point(func, end);
    Ok(())
}
