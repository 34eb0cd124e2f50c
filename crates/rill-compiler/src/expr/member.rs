//! Field access on class instances.
//!
//! A member expression names a field of a class-typed lvalue. The field
//! address is computed against the class's registered layout; reading
//! goes through `compile_expr`'s load path, writing through
//! `compile_addr`.

use rill_core::ast::MemberExpr;
use rill_core::{CompilationError, Result, Type};

use crate::context::CompilationContext;
use crate::value::Variable;

use super::{compile_addr, type_of};

fn field_lookup<'ast>(
    cx: &CompilationContext<'ast>,
    class: &str,
    member: &MemberExpr<'ast>,
) -> Result<(u32, Type)> {
    let info = cx
        .classes
        .get(class)
        .ok_or_else(|| CompilationError::internal(format!("unregistered class '{class}'")))?;
    info.fields
        .iter()
        .position(|f| f.name == member.field)
        .map(|i| (i as u32, info.fields[i].ty.clone()))
        .ok_or_else(|| CompilationError::InvalidMemberAccess {
            ty: class.to_string(),
            member: member.field.to_string(),
            span: member.span,
        })
}

pub fn member_type<'ast>(
    cx: &mut CompilationContext<'ast>,
    member: &'ast MemberExpr<'ast>,
) -> Result<Type> {
    let object = type_of(cx, member.object)?;
    let Some(class) = object.class_name().map(str::to_string) else {
        return Err(CompilationError::InvalidMemberAccess {
            ty: object.to_string(),
            member: member.field.to_string(),
            span: member.span,
        });
    };
    Ok(field_lookup(cx, &class, member)?.1)
}

pub fn member_addr<'ast>(
    cx: &mut CompilationContext<'ast>,
    member: &'ast MemberExpr<'ast>,
) -> Result<Variable> {
    let base = compile_addr(cx, member.object)?;
    let Some(class) = base.ty.class_name().map(str::to_string) else {
        return Err(CompilationError::InvalidMemberAccess {
            ty: base.ty.to_string(),
            member: member.field.to_string(),
            span: member.span,
        });
    };
    let (index, ty) = field_lookup(cx, &class, member)?;
    let addr = cx.builder.emit_field_addr(base.addr, &class, index)?;
    Ok(Variable::new(addr, ty))
}
