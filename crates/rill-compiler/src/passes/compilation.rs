//! Pass two: compile every queued body, then drain the deferred global
//! initializers into the init function.

use rill_core::ast::Unit;
use rill_core::{CompilationError, Result};

use crate::context::{CompilationContext, Symbol};
use crate::expr::compile_expr;
use crate::function_compiler::compile_function_body;
use crate::ir;
use crate::typing::cast_value;

use super::registration;

/// Compile one unit to an IR module. Fail-fast: the first error aborts
/// and no partial module is returned.
pub fn compile_unit<'ast>(module_name: &str, unit: &'ast Unit<'ast>) -> Result<ir::Module> {
    let mut cx = CompilationContext::new(module_name);
    registration::register_unit(&mut cx, unit)?;

    let pending = std::mem::take(&mut cx.pending_bodies);
    for (decl, key) in pending {
        let info = cx
            .functions
            .get(&key)
            .cloned()
            .ok_or_else(|| CompilationError::internal(format!("unregistered body '{key}'")))?;
        compile_function_body(&mut cx, decl, info.func, &info.sig, decl.class.is_some())?;
    }

    compile_global_initializers(&mut cx)?;
    Ok(cx.builder.finish())
}

/// Emit the init function: each deferred initializer evaluates under the
/// global-only scope view and stores into its global.
fn compile_global_initializers(cx: &mut CompilationContext<'_>) -> Result<()> {
    let init = cx
        .init_func
        .ok_or_else(|| CompilationError::internal("init function was never created"))?;
    let entry = cx.builder.create_block(init, "entry");
    cx.builder.set_insertion_point(init, entry);

    let deferred = std::mem::take(&mut cx.deferred_globals);
    for global in deferred {
        let Some(init_expr) = global.init else {
            continue;
        };
        cx.with_global_only(|cx| {
            let Symbol::Global(id, ty) = cx.symbols.lookup_global(global.name, global.span)?
            else {
                return Err(CompilationError::internal(format!(
                    "'{}' is not bound as a global",
                    global.name
                )));
            };
            let (id, ty) = (*id, ty.clone());
            let value = compile_expr(cx, init_expr)?;
            let stored = cast_value(&mut cx.builder, &value, &ty, true, global.span)?
                .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?;
            let addr = cx.builder.emit_global_addr(id)?;
            cx.builder.emit_store(stored.repr, addr)?;
            Ok(())
        })?;
    }
    cx.builder.emit_ret(None)?;
    Ok(())
}
