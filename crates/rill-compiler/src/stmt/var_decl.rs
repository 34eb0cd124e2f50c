//! Local variable declarations.
//!
//! Storage is a named stack slot. Scalars initialize from the (cast)
//! initializer expression or the type's zero value; class instances go
//! through the constructor protocol with the declaration's positional
//! arguments. The binding becomes visible only after initialization, so
//! an initializer that names the declared identifier still resolves to
//! any shadowed outer binding.

use rill_core::ast::VarDeclStmt;
use rill_core::{CompilationError, Result};

use crate::context::{CompilationContext, Symbol};
use crate::expr::{compile_expr, type_of};
use crate::lifecycle::call_constructor;
use crate::typing::{cast_value, lower_type, zero_const};
use crate::value::{Value, Variable};

pub fn compile_var_decl<'ast>(
    cx: &mut CompilationContext<'ast>,
    decl: &'ast VarDeclStmt<'ast>,
) -> Result<()> {
    let ty = match (&decl.ty, decl.init) {
        (Some(annotation), _) => cx.resolve_type(annotation, decl.span)?,
        (None, Some(init)) => type_of(cx, init)?.contained().clone(),
        (None, None) => {
            return Err(CompilationError::internal(format!(
                "declaration of '{}' has neither a type nor an initializer",
                decl.name
            )));
        }
    };

    let addr = cx.builder.emit_alloca(lower_type(&ty)?, decl.name)?;
    let var = Variable::new(addr, ty.clone());

    if ty.class_name().is_some() {
        if let Some(init) = decl.init {
            let found = type_of(cx, init)?;
            return Err(CompilationError::CastError {
                from: found.to_string(),
                to: ty.to_string(),
                span: decl.span,
            });
        }
        let mut args = Vec::with_capacity(decl.ctor_args.len());
        for arg in decl.ctor_args {
            args.push(compile_expr(cx, arg)?);
        }
        call_constructor(cx, &var, &args, decl.span)?;
    } else {
        let value = match decl.init {
            Some(init) => {
                let v = compile_expr(cx, init)?;
                cast_value(&mut cx.builder, &v, &ty, true, decl.span)?
                    .ok_or_else(|| CompilationError::internal("required cast yielded no value"))?
            }
            None => {
                let zero = cx.builder.emit_const(zero_const(&ty)?)?;
                Value::new(zero, ty.clone())
            }
        };
        cx.builder.emit_store(value.repr, addr)?;
    }

    cx.symbols
        .insert(decl.name, Symbol::Local(var), 1, decl.span)?;
    Ok(())
}
