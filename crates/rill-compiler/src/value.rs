//! Compile-time values.
//!
//! Expression compilation produces a [`Value`]: the IR value holding the
//! result plus the language-level type it carries. Named storage is a
//! [`Variable`]: the address of a stack or global slot plus the type of
//! what lives there. Loading a variable yields a value; taking the
//! address of an lvalue expression yields a variable.

use rill_core::Type;

use crate::ir::ValueId;

/// An rvalue: an IR value tagged with its language type.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub repr: ValueId,
    pub ty: Type,
}

impl Value {
    pub fn new(repr: ValueId, ty: Type) -> Self {
        Self { repr, ty }
    }
}

/// An lvalue: the address of a typed memory slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub addr: ValueId,
    pub ty: Type,
}

impl Variable {
    pub fn new(addr: ValueId, ty: Type) -> Self {
        Self { addr, ty }
    }
}
