//! Pass one: register every declaration before any body compiles.
//!
//! Order within the pass: class names, then class layouts (fields may
//! name classes declared later in the unit), then function and method
//! signatures, then globals. After this pass every call target, type
//! name, and global is resolvable regardless of textual order.

use rill_core::ast::{ClassDecl, Decl, FunctionDecl, GlobalDecl, Unit};
use rill_core::{ClassField, CompilationError, FuncType, Result, Type};
use rustc_hash::FxHashMap;

use crate::context::{ClassInfo, CompilationContext, Symbol};
use crate::ir::{FuncSig, GlobalId};
use crate::registry::{mangle, FunctionInfo};
use crate::typing::{lower_type, zero_const};

pub fn register_unit<'ast>(cx: &mut CompilationContext<'ast>, unit: &'ast Unit<'ast>) -> Result<()> {
    for decl in unit.decls {
        if let Decl::Class(class) = decl {
            if cx.classes.contains_key(class.name) {
                return Err(CompilationError::DuplicateSymbol {
                    name: class.name.to_string(),
                    span: class.span,
                });
            }
            cx.classes.insert(
                class.name.to_string(),
                ClassInfo {
                    fields: Vec::new(),
                    ctor_args: FxHashMap::default(),
                },
            );
        }
    }
    for decl in unit.decls {
        if let Decl::Class(class) = decl {
            register_class_layout(cx, class)?;
        }
    }

    // The synthetic init function; deferred global initializers land in
    // its body during pass two.
    let init = cx.builder.create_function(
        "module.init",
        FuncSig {
            ret: crate::ir::IrType::Void,
            params: Vec::new(),
            variadic: false,
        },
    );
    cx.init_func = Some(init);

    for decl in unit.decls {
        match decl {
            Decl::Function(function) => {
                if !function.template_params.is_empty() {
                    register_template(cx, function)?;
                } else {
                    register_function(cx, function)?;
                }
            }
            Decl::Global(global) => {
                define_global(cx, global)?;
            }
            Decl::Class(_) => {}
        }
    }
    Ok(())
}

fn register_class_layout<'ast>(
    cx: &mut CompilationContext<'ast>,
    class: &'ast ClassDecl<'ast>,
) -> Result<()> {
    let mut fields = Vec::with_capacity(class.fields.len());
    let mut ctor_args = FxHashMap::default();
    let mut layout = Vec::with_capacity(class.fields.len());

    for field in class.fields {
        if fields.iter().any(|f: &ClassField<_>| f.name == field.name) {
            return Err(CompilationError::DuplicateSymbol {
                name: format!("{}.{}", class.name, field.name),
                span: field.span,
            });
        }
        let ty = cx.resolve_type(&field.ty, field.span)?;
        layout.push(lower_type(&ty)?);
        if !field.ctor_args.is_empty() {
            ctor_args.insert(field.name.to_string(), field.ctor_args);
        }
        fields.push(ClassField {
            name: field.name.to_string(),
            ty,
            default: field.default,
        });
    }

    cx.builder.register_struct(class.name, layout);
    let info = cx
        .classes
        .get_mut(class.name)
        .ok_or_else(|| CompilationError::internal("class vanished between sweeps"))?;
    info.fields = fields;
    info.ctor_args = ctor_args;
    Ok(())
}

fn register_template<'ast>(
    cx: &mut CompilationContext<'ast>,
    function: &'ast FunctionDecl<'ast>,
) -> Result<()> {
    if cx.templates.contains_key(function.name) {
        return Err(CompilationError::ConflictingRedefinition {
            name: function.name.to_string(),
            span: function.span,
        });
    }
    cx.templates.insert(function.name.to_string(), function);
    Ok(())
}

/// Register one concrete function or method: resolve its signature,
/// create the IR declaration, enter it in the registry, and queue the
/// body for pass two. Re-registering an identical signature is a no-op.
pub fn register_function<'ast>(
    cx: &mut CompilationContext<'ast>,
    function: &'ast FunctionDecl<'ast>,
) -> Result<String> {
    let (base, mut params) = match function.class {
        Some(class) => {
            if !cx.classes.contains_key(class) {
                return Err(CompilationError::UndefinedSymbol {
                    name: class.to_string(),
                    span: function.span,
                });
            }
            (
                format!("{class}.{}", function.name),
                vec![Type::Reference(Box::new(Type::Class(class.to_string())))],
            )
        }
        None => (function.name.to_string(), Vec::new()),
    };
    for param in function.params {
        params.push(cx.resolve_type(&param.ty, function.span)?);
    }
    let ret = cx.resolve_type(&function.ret, function.span)?;
    let sig = FuncType {
        ret,
        params,
        variadic: function.variadic,
    };

    let key = if function.no_mangle {
        base.clone()
    } else {
        mangle(&base, &sig.params, sig.variadic)
    };
    if let Some(existing) = cx.functions.get(&key) {
        if existing.sig == sig {
            return Ok(key);
        }
        return Err(CompilationError::ConflictingRedefinition {
            name: key,
            span: function.span,
        });
    }

    let mut ir_params = Vec::with_capacity(sig.params.len());
    for param in &sig.params {
        ir_params.push(lower_type(param)?);
    }
    let ir_sig = FuncSig {
        ret: lower_type(&sig.ret)?,
        params: ir_params,
        variadic: sig.variadic,
    };
    let func = if function.body.is_none() {
        cx.builder.declare_external(key.clone(), ir_sig)
    } else {
        cx.builder.create_function(key.clone(), ir_sig)
    };

    let registered = cx.functions.register(
        &base,
        FunctionInfo { func, sig },
        function.no_mangle,
        function.span,
    )?;
    if function.body.is_some() {
        cx.pending_bodies.push((function, registered.clone()));
    }
    Ok(registered)
}

/// Create a global's storage and binding. Defining the same global twice
/// is a no-op yielding the first handle; the initializer, if any, is
/// queued for the init function exactly once.
pub fn define_global<'ast>(
    cx: &mut CompilationContext<'ast>,
    global: &'ast GlobalDecl<'ast>,
) -> Result<GlobalId> {
    if let Some(&existing) = cx.materialized_globals.get(global.name) {
        return Ok(existing);
    }
    let ty = cx.resolve_type(&global.ty, global.span)?;
    let id = cx
        .builder
        .add_global(global.name, lower_type(&ty)?, zero_const(&ty)?);
    cx.symbols
        .insert_global(global.name, Symbol::Global(id, ty), global.span)?;
    cx.materialized_globals
        .insert(global.name.to_string(), id);
    if global.init.is_some() {
        cx.deferred_globals.push(global);
    }
    Ok(id)
}
