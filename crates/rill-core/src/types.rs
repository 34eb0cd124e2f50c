//! The semantic type model.
//!
//! `Type` is a closed set of variants with exhaustive-match dispatch — there
//! is no downcasting anywhere in the compiler. Every type exposes a stable
//! string key (`key`) used both for identity comparison and for name
//! mangling, and a human-readable `Display` form used in diagnostics.
//!
//! `Reference` is transparent: equality and coercion queries forward to the
//! contained type, so a `&i64` binding participates in arithmetic and
//! overload resolution exactly as an `i64` would.

use std::fmt;

/// A function signature type.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    pub ret: Type,
    pub params: Vec<Type>,
    pub variadic: bool,
}

/// A field of a registered class.
///
/// Fields are stored once per class name in the compilation context's
/// registry, never per instance, so every holder of a `Type::Class` shares
/// one authoritative layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassField<T> {
    pub name: String,
    pub ty: Type,
    /// Explicit default initializer, if the declaration carried one.
    pub default: Option<T>,
}

/// The closed set of semantic types.
#[derive(Debug, Clone)]
pub enum Type {
    Void,
    /// Signed integer of the given bit width.
    Int(u32),
    /// IEEE float of the given bit width (32 or 64).
    Float(u32),
    Ptr(Box<Type>),
    Array(Box<Type>, u64),
    Function(Box<FuncType>),
    /// Classes are referenced by name; the field list lives in the
    /// context's class registry.
    Class(String),
    /// Transparent reference; forwards equality and coercion queries.
    Reference(Box<Type>),
}

impl Type {
    /// The language's boolean representation type.
    pub fn bool_repr() -> Type {
        Type::Int(8)
    }

    /// Strip `Reference` wrappers down to the contained type.
    pub fn contained(&self) -> &Type {
        match self {
            Type::Reference(inner) => inner.contained(),
            other => other,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self.contained(), Type::Int(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.contained(), Type::Float(_))
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self.contained(), Type::Ptr(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self.contained(), Type::Void)
    }

    /// Bit width for scalar numeric types.
    pub fn bit_width(&self) -> Option<u32> {
        match self.contained() {
            Type::Int(w) | Type::Float(w) => Some(*w),
            _ => None,
        }
    }

    /// Class name, if this is (a reference to) a class type.
    pub fn class_name(&self) -> Option<&str> {
        match self.contained() {
            Type::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Stable string key used for identity and name mangling.
    ///
    /// References use the key of their contained type, matching their
    /// transparent equality.
    pub fn key(&self) -> String {
        match self {
            Type::Void => "void".into(),
            Type::Int(w) => format!("i{w}"),
            Type::Float(w) => format!("f{w}"),
            Type::Ptr(inner) => format!("*{}", inner.key()),
            Type::Array(elem, len) => format!("[{};{len}]", elem.key()),
            Type::Function(f) => {
                let params: Vec<String> = f.params.iter().map(Type::key).collect();
                let tail = if f.variadic { ",..." } else { "" };
                format!("fn({}{tail})->{}", params.join(","), f.ret.key())
            }
            Type::Class(name) => name.clone(),
            Type::Reference(inner) => inner.key(),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        // References compare through to the contained type.
        match (self.contained(), other.contained()) {
            (Type::Void, Type::Void) => true,
            (Type::Int(a), Type::Int(b)) => a == b,
            (Type::Float(a), Type::Float(b)) => a == b,
            (Type::Ptr(a), Type::Ptr(b)) => a == b,
            (Type::Array(a, n), Type::Array(b, m)) => n == m && a == b,
            (Type::Function(a), Type::Function(b)) => a == b,
            (Type::Class(a), Type::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Reference(inner) => write!(f, "&{inner}"),
            other => write!(f, "{}", other.key()),
        }
    }
}
