//! Statement compilation.
//!
//! The dispatcher is an exhaustive match; each control-flow construct
//! lives in its own file. Blocks bracket a scope and run destructors for
//! their class-typed locals on the way out; `return` tears down every
//! live local first so early exits match normal scope exit.

pub mod do_while_stmt;
pub mod if_stmt;
pub mod var_decl;
pub mod while_stmt;

use rill_core::ast::{Block, ReturnStmt, Stmt};
use rill_core::{CompilationError, Result, Span, Type};

use crate::context::CompilationContext;
use crate::expr::compile_expr;
use crate::lifecycle;
use crate::typing::cast_value;

pub fn compile_stmt<'ast>(cx: &mut CompilationContext<'ast>, stmt: &'ast Stmt<'ast>) -> Result<()> {
    match stmt {
        Stmt::Expr(expr) => {
            compile_expr(cx, expr)?;
            Ok(())
        }
        Stmt::Block(block) => compile_block(cx, block),
        Stmt::VarDecl(decl) => var_decl::compile_var_decl(cx, decl),
        Stmt::Return(ret) => compile_return(cx, ret),
        Stmt::Break(span) => compile_loop_jump(cx, "break", *span),
        Stmt::Continue(span) => compile_loop_jump(cx, "continue", *span),
        Stmt::If(stmt) => if_stmt::compile_if_stmt(cx, stmt),
        Stmt::While(stmt) => while_stmt::compile_while(cx, stmt),
        Stmt::DoWhile(stmt) => do_while_stmt::compile_do_while(cx, stmt),
    }
}

/// Compile a braced block in its own scope. Statements after a
/// terminator are unreachable and skipped.
pub fn compile_block<'ast>(
    cx: &mut CompilationContext<'ast>,
    block: &'ast Block<'ast>,
) -> Result<()> {
    cx.symbols.push_scope();
    for stmt in block.stmts {
        if cx.builder.terminated()? {
            break;
        }
        compile_stmt(cx, stmt)?;
    }
    let scope = cx.symbols.pop_scope()?;
    if !cx.builder.terminated()? {
        lifecycle::destruct_scope(cx, &scope, block.span)?;
    }
    Ok(())
}

fn compile_return<'ast>(
    cx: &mut CompilationContext<'ast>,
    ret: &'ast ReturnStmt<'ast>,
) -> Result<()> {
    let expected = cx
        .current_ret
        .clone()
        .ok_or_else(|| CompilationError::internal("return outside of a function"))?;

    let value = match ret.value {
        Some(expr) => {
            let v = compile_expr(cx, expr)?;
            let v = cast_value(&mut cx.builder, &v, &expected, true, ret.span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?;
            Some(v)
        }
        None => {
            if expected != Type::Void {
                return Err(CompilationError::TypeMismatch {
                    lhs: expected.to_string(),
                    rhs: Type::Void.to_string(),
                    span: ret.span,
                });
            }
            None
        }
    };

    // Tear down locals after the return value is computed, before the
    // function is left.
    lifecycle::destruct_live_locals(cx, ret.span)?;
    cx.builder.emit_ret(value.map(|v| v.repr))?;
    Ok(())
}

fn compile_loop_jump(cx: &mut CompilationContext<'_>, keyword: &str, span: Span) -> Result<()> {
    let stack = if keyword == "break" {
        &cx.break_targets
    } else {
        &cx.continue_targets
    };
    let Some(target) = stack.last().copied() else {
        return Err(CompilationError::MisplacedControl {
            keyword: keyword.to_string(),
            span,
        });
    };
    // The jump leaves every scope opened inside the loop body; their
    // class-typed locals die here, just as on normal scope exit.
    let depth = cx.loop_scope_depths.last().copied().ok_or_else(|| {
        CompilationError::internal("loop jump without a recorded loop scope depth")
    })?;
    lifecycle::destruct_scopes_above(cx, depth, span)?;
    cx.builder.emit_br(target)?;
    Ok(())
}
