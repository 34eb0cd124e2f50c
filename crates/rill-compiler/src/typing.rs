//! Numeric conversions and type unification.
//!
//! All implicit conversions the language performs go through this module:
//! binary operands are unified via [`winning_type`], call arguments and
//! assignments are coerced via [`cast_value`], and branch conditions go
//! through [`cast_to_bool`]. Overload ranking consults the same table
//! through [`is_castable`] and [`cast_cost`] so that "would this call
//! compile" and "does this call compile" can never disagree.

use rill_core::{CompilationError, Result, Span, Type};

use crate::ir::{self, Builder, CastKind, CmpOp, Const, IrType};
use crate::value::Value;

// ============================================================================
// Lowering
// ============================================================================

/// Lower a language type to its IR representation.
///
/// References and function types are addresses; classes lower to the
/// named aggregate registered on the module.
pub fn lower_type(ty: &Type) -> Result<IrType> {
    match ty {
        Type::Void => Ok(IrType::Void),
        Type::Int(w) => Ok(IrType::Int(*w)),
        Type::Float(w) => Ok(IrType::Float(*w)),
        Type::Ptr(_) | Type::Function(_) | Type::Reference(_) => Ok(IrType::Ptr),
        Type::Array(elem, len) => Ok(IrType::Array(Box::new(lower_type(elem)?), *len)),
        Type::Class(name) => Ok(IrType::Struct(name.clone())),
    }
}

/// The zero value used for uninitialized storage and defaulted fields.
pub fn zero_const(ty: &Type) -> Result<Const> {
    match ty.contained() {
        Type::Int(w) => Ok(Const::Int { width: *w, value: 0 }),
        Type::Float(w) => Ok(Const::Float { width: *w, value: 0.0 }),
        Type::Ptr(_) | Type::Function(_) => Ok(Const::NullPtr),
        Type::Class(_) | Type::Array(..) => Ok(Const::Zero(lower_type(ty)?)),
        other => Err(CompilationError::internal(format!(
            "no zero value for type {other}"
        ))),
    }
}

// ============================================================================
// Unification
// ============================================================================

/// The type both operands of a binary operation are converted to.
///
/// Wider integer beats narrower, float beats integer, wider float beats
/// narrower, pointer beats integer. Equal types yield the left operand's
/// type, which also breaks the equal-width integer tie.
pub fn winning_type(lhs: &Type, rhs: &Type, span: Span) -> Result<Type> {
    let (a, b) = (lhs.contained(), rhs.contained());
    if a == b {
        return Ok(a.clone());
    }
    match (a, b) {
        (Type::Int(x), Type::Int(y)) => Ok(Type::Int(if y > x { *y } else { *x })),
        (Type::Float(x), Type::Float(y)) => Ok(Type::Float(if y > x { *y } else { *x })),
        (Type::Float(w), Type::Int(_)) | (Type::Int(_), Type::Float(w)) => Ok(Type::Float(*w)),
        (Type::Ptr(_), Type::Int(_)) => Ok(a.clone()),
        (Type::Int(_), Type::Ptr(_)) => Ok(b.clone()),
        _ => Err(CompilationError::TypeMismatch {
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
            span,
        }),
    }
}

// ============================================================================
// Casting
// ============================================================================

/// Whether `from` converts implicitly to `to`.
pub fn is_castable(from: &Type, to: &Type) -> bool {
    let (from, to) = (from.contained(), to.contained());
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (Type::Int(_), Type::Int(_))
            | (Type::Int(_), Type::Float(_))
            | (Type::Int(_), Type::Ptr(_))
            | (Type::Float(_), Type::Float(_))
            | (Type::Float(_), Type::Int(_))
    )
}

/// Conversion cost for overload ranking: 0 for identity, 1 otherwise.
/// `None` when no conversion exists.
pub fn cast_cost(from: &Type, to: &Type) -> Option<u32> {
    if from.contained() == to.contained() {
        Some(0)
    } else if is_castable(from, to) {
        Some(1)
    } else {
        None
    }
}

/// Convert `value` to `target`, emitting whatever IR the pair needs.
///
/// With `required` false an unsupported pair yields `Ok(None)`, the
/// trial-cast mode overload resolution uses. With `required` true it is
/// a `CastError`.
pub fn cast_value(
    builder: &mut Builder,
    value: &Value,
    target: &Type,
    required: bool,
    span: Span,
) -> Result<Option<Value>> {
    let from = value.ty.contained().clone();
    let to = target.contained().clone();
    if from == to {
        return Ok(Some(Value::new(value.repr, to)));
    }

    let repr = match (&from, &to) {
        (Type::Int(src), Type::Int(dst)) => {
            // Same-or-narrower destinations truncate; wider sign-extend.
            let kind = if src >= dst { CastKind::Trunc } else { CastKind::Sext };
            builder.emit_cast(kind, value.repr, IrType::Int(*dst))?
        }
        (Type::Int(_), Type::Ptr(_)) => {
            builder.emit_cast(CastKind::IntToPtr, value.repr, IrType::Ptr)?
        }
        (Type::Float(src), Type::Float(dst)) => {
            if src > dst {
                builder.emit_cast(CastKind::FpTrunc, value.repr, IrType::Float(*dst))?
            } else {
                builder.emit_cast(CastKind::FpExt, value.repr, IrType::Float(*dst))?
            }
        }
        (Type::Int(_), Type::Float(dst)) => {
            builder.emit_cast(CastKind::SiToFp, value.repr, IrType::Float(*dst))?
        }
        (Type::Float(_), Type::Int(dst)) => {
            builder.emit_cast(CastKind::FpToSi, value.repr, IrType::Int(*dst))?
        }
        _ if !required => return Ok(None),
        _ => {
            return Err(CompilationError::CastError {
                from: from.to_string(),
                to: to.to_string(),
                span,
            });
        }
    };
    Ok(Some(Value::new(repr, to)))
}

/// Produce the `i1` truth value of a scalar: cast to `Int(64)` and
/// compare against zero. Branch conditions funnel through here.
pub fn cast_to_bool(builder: &mut Builder, value: &Value, span: Span) -> Result<ir::ValueId> {
    let wide = cast_value(builder, value, &Type::Int(64), true, span)?
        .ok_or_else(|| CompilationError::internal("condition cast returned no value"))?;
    let zero = builder.emit_int(64, 0)?;
    builder.emit_cmp(CmpOp::Ne, false, wide.repr, zero)
}
