//! Function body compilation.
//!
//! Parameters spill into named stack slots so they behave like ordinary
//! locals; the injected method receiver does not — it is already an
//! address and binds directly. A body that falls off its end gets the
//! default terminator: `ret void`, or a zero value of the return type.

use rill_core::ast::FunctionDecl;
use rill_core::{CompilationError, FuncType, Result, Type};

use crate::context::{CompilationContext, Symbol};
use crate::ir::FuncId;
use crate::lifecycle;
use crate::stmt::compile_stmt;
use crate::typing::{lower_type, zero_const};
use crate::value::Variable;

/// Compile one function body into its (already created) IR function.
///
/// `has_self` marks a method: `sig.params[0]` is the injected receiver
/// and binds as `self`, ahead of the declared parameters.
pub fn compile_function_body<'ast>(
    cx: &mut CompilationContext<'ast>,
    decl: &'ast FunctionDecl<'ast>,
    func: FuncId,
    sig: &FuncType,
    has_self: bool,
) -> Result<()> {
    let Some(body) = decl.body else {
        // External declaration; nothing to emit.
        return Ok(());
    };

    let entry = cx.builder.create_block(func, "entry");
    cx.builder.set_insertion_point(func, entry);

    let saved_ret = cx.current_ret.replace(sig.ret.clone());
    let saved_break = std::mem::take(&mut cx.break_targets);
    let saved_continue = std::mem::take(&mut cx.continue_targets);
    let saved_depths = std::mem::take(&mut cx.loop_scope_depths);
    cx.symbols.push_scope();

    let result = (|| -> Result<()> {
        bind_params(cx, decl, func, sig, has_self)?;
        compile_stmt(cx, body)?;
        if !cx.builder.terminated()? {
            lifecycle::destruct_live_locals(cx, decl.span)?;
            emit_default_return(cx, &sig.ret)?;
        }
        Ok(())
    })();

    cx.symbols.pop_scope()?;
    cx.current_ret = saved_ret;
    cx.break_targets = saved_break;
    cx.continue_targets = saved_continue;
    cx.loop_scope_depths = saved_depths;
    result
}

fn bind_params<'ast>(
    cx: &mut CompilationContext<'ast>,
    decl: &'ast FunctionDecl<'ast>,
    func: FuncId,
    sig: &FuncType,
    has_self: bool,
) -> Result<()> {
    let values = cx.builder.function_params(func);
    if values.len() != sig.params.len() {
        return Err(CompilationError::internal(format!(
            "'{}' has {} declared parameters but {} materialized",
            decl.name,
            sig.params.len(),
            values.len()
        )));
    }

    let mut names = Vec::with_capacity(sig.params.len());
    if has_self {
        names.push("self");
    }
    names.extend(decl.params.iter().map(|p| p.name));

    for (index, ((name, ty), value)) in names.iter().zip(&sig.params).zip(values).enumerate() {
        let var = if has_self && index == 0 {
            // The receiver arrives as the instance address and keeps its
            // reference type: the method borrows the instance, it does
            // not own it.
            Variable::new(value, ty.clone())
        } else {
            let addr = cx.builder.emit_alloca(lower_type(ty)?, *name)?;
            cx.builder.emit_store(value, addr)?;
            Variable::new(addr, ty.clone())
        };
        cx.symbols
            .insert(name, Symbol::Local(var), 1, decl.span)?;
    }
    Ok(())
}

fn emit_default_return(cx: &mut CompilationContext<'_>, ret: &Type) -> Result<()> {
    if ret.is_void() {
        cx.builder.emit_ret(None)?;
    } else {
        let zero = cx.builder.emit_const(zero_const(ret)?)?;
        cx.builder.emit_ret(Some(zero))?;
    }
    Ok(())
}
