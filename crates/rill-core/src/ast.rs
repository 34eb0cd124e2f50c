//! AST node types.
//!
//! The core receives a finished tree from an external parser; nothing here
//! parses text. Nodes are allocated in a `bumpalo` arena by the producer and
//! referenced as `&'ast T`, so the tree is a plain value graph with no
//! interior mutability and no owning pointers to chase.
//!
//! Expressions and statements are closed enums dispatched by exhaustive
//! match. Type annotations arrive as `TypeExpr` and are resolved against
//! the class registry (and any active template substitution) during
//! compilation.

use crate::Span;

// ============================================================================
// Type expressions
// ============================================================================

/// An unresolved type annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr<'ast> {
    Void,
    /// Signed integer of the given bit width.
    Int(u32),
    /// Float of the given bit width.
    Float(u32),
    /// A class name or template parameter.
    Named(&'ast str),
    Ptr(&'ast TypeExpr<'ast>),
    Array(&'ast TypeExpr<'ast>, u64),
}

// ============================================================================
// Expressions
// ============================================================================

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'ast> {
    Literal(LiteralExpr),
    Ident(IdentExpr<'ast>),
    Unary(&'ast UnaryExpr<'ast>),
    Binary(&'ast BinaryExpr<'ast>),
    Compare(&'ast CompareExpr<'ast>),
    Assign(&'ast AssignExpr<'ast>),
    Cast(&'ast CastExpr<'ast>),
    Call(&'ast CallExpr<'ast>),
    Member(&'ast MemberExpr<'ast>),
    /// `if` in expression position; every branch yields a value and an
    /// else branch is mandatory.
    If(&'ast IfExpr<'ast>),
}

impl<'ast> Expr<'ast> {
    /// Source location of this expression.
    pub fn span(&self) -> Span {
        match self {
            Self::Literal(e) => e.span,
            Self::Ident(e) => e.span,
            Self::Unary(e) => e.span,
            Self::Binary(e) => e.span,
            Self::Compare(e) => e.span,
            Self::Assign(e) => e.span,
            Self::Cast(e) => e.span,
            Self::Call(e) => e.span,
            Self::Member(e) => e.span,
            Self::If(e) => e.span,
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiteralExpr {
    pub kind: LiteralKind,
    pub span: Span,
}

/// The kind of literal, carrying its representation width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralKind {
    Int(i64, u32),
    Float(f64, u32),
    Bool(bool),
}

/// An identifier reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdentExpr<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr<'ast> {
    pub op: UnaryOp,
    pub operand: &'ast Expr<'ast>,
    pub span: Span,
}

/// Arithmetic operator kinds.
///
/// One generic evaluator handles all of these; each kind maps to the
/// corresponding backend instruction plus the winning-type rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr<'ast> {
    pub op: BinaryOp,
    pub lhs: &'ast Expr<'ast>,
    pub rhs: &'ast Expr<'ast>,
    pub span: Span,
}

/// Comparison operator kinds. Results are forced to the boolean
/// representation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompareExpr<'ast> {
    pub op: CompareOp,
    pub lhs: &'ast Expr<'ast>,
    pub rhs: &'ast Expr<'ast>,
    pub span: Span,
}

/// Assignment through an lvalue (identifier or member access).
#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpr<'ast> {
    pub target: &'ast Expr<'ast>,
    pub value: &'ast Expr<'ast>,
    pub span: Span,
}

/// An explicit cast.
#[derive(Debug, Clone, PartialEq)]
pub struct CastExpr<'ast> {
    pub expr: &'ast Expr<'ast>,
    pub ty: TypeExpr<'ast>,
    pub span: Span,
}

/// What a call resolves against.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee<'ast> {
    /// A free function (or any `Class.method` spelled in full).
    Name(&'ast str),
    /// A method invoked on an instance; resolved as `Class.name` first.
    Method {
        object: &'ast Expr<'ast>,
        name: &'ast str,
    },
}

/// A function or method call, possibly with explicit template arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr<'ast> {
    pub callee: Callee<'ast>,
    pub args: &'ast [&'ast Expr<'ast>],
    /// Explicit template arguments; empty for ordinary calls.
    pub type_args: &'ast [TypeExpr<'ast>],
    pub span: Span,
}

/// Field access on a class instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub field: &'ast str,
    pub span: Span,
}

/// `if` as an expression: chained conditions with one branch each, plus a
/// mandatory else branch. `conditions.len() == branches.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr<'ast> {
    pub conditions: &'ast [&'ast Expr<'ast>],
    pub branches: &'ast [&'ast Expr<'ast>],
    pub else_branch: &'ast Expr<'ast>,
    pub span: Span,
}

// ============================================================================
// Statements
// ============================================================================

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'ast> {
    Expr(&'ast Expr<'ast>),
    Block(Block<'ast>),
    VarDecl(VarDeclStmt<'ast>),
    Return(ReturnStmt<'ast>),
    Break(Span),
    Continue(Span),
    If(&'ast IfStmt<'ast>),
    While(&'ast WhileStmt<'ast>),
    DoWhile(&'ast DoWhileStmt<'ast>),
}

/// A braced block; brackets its own scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

/// A local variable declaration.
///
/// `ty` may be omitted when an initializer is present (inferred).
/// `ctor_args` are positional constructor arguments for class-typed
/// variables; mutually exclusive with `init`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt<'ast> {
    pub name: &'ast str,
    pub ty: Option<TypeExpr<'ast>>,
    pub init: Option<&'ast Expr<'ast>>,
    pub ctor_args: &'ast [&'ast Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt<'ast> {
    pub value: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// `if` as a statement: chained conditions, optional else.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt<'ast> {
    pub conditions: &'ast [&'ast Expr<'ast>],
    pub branches: &'ast [&'ast Stmt<'ast>],
    pub else_branch: Option<&'ast Stmt<'ast>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub body: &'ast Stmt<'ast>,
    pub span: Span,
}

/// Do-while: the body runs before the first condition check.
#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStmt<'ast> {
    pub body: &'ast Stmt<'ast>,
    pub condition: &'ast Expr<'ast>,
    pub span: Span,
}

// ============================================================================
// Declarations
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Param<'ast> {
    pub name: &'ast str,
    pub ty: TypeExpr<'ast>,
}

/// A function, method, or external declaration.
///
/// Methods carry the owning class in `class` and are registered under the
/// mangled `Class.name`; constructors and destructors are ordinary methods
/// named `constructor` / `destructor`. A `body` of `None` declares an
/// external function. `no_mangle` suppresses parameter-type mangling
/// (externals, `main`).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl<'ast> {
    pub name: &'ast str,
    pub class: Option<&'ast str>,
    pub params: &'ast [Param<'ast>],
    pub ret: TypeExpr<'ast>,
    pub variadic: bool,
    /// Template parameter names; non-empty makes this a template that is
    /// only materialized at explicitly-instantiated call sites.
    pub template_params: &'ast [&'ast str],
    pub body: Option<&'ast Stmt<'ast>>,
    pub no_mangle: bool,
    pub span: Span,
}

/// A class field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl<'ast> {
    pub name: &'ast str,
    pub ty: TypeExpr<'ast>,
    pub default: Option<&'ast Expr<'ast>>,
    /// Positional constructor arguments used when the field itself is
    /// class-typed and has no explicit default.
    pub ctor_args: &'ast [&'ast Expr<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl<'ast> {
    pub name: &'ast str,
    pub fields: &'ast [FieldDecl<'ast>],
    pub span: Span,
}

/// A global variable definition. Non-constant initializers run inside the
/// synthetic module-init function.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl<'ast> {
    pub name: &'ast str,
    pub ty: TypeExpr<'ast>,
    pub init: Option<&'ast Expr<'ast>>,
    pub span: Span,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl<'ast> {
    Function(&'ast FunctionDecl<'ast>),
    Class(&'ast ClassDecl<'ast>),
    Global(&'ast GlobalDecl<'ast>),
}

/// A whole compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit<'ast> {
    pub decls: &'ast [Decl<'ast>],
    pub span: Span,
}
