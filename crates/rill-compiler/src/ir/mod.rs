//! The SSA intermediate representation.
//!
//! This is the capability surface the semantic core emits into: functions
//! made of basic blocks made of typed instructions in single-assignment
//! form, with a phi-equivalent merge instruction for values produced in
//! divergent blocks.
//!
//! Everything is referenced by index handles (`FuncId`, `BlockId`,
//! `ValueId`, `GlobalId`) — there are no interior pointers, so the whole
//! module is a plain value that can be printed ([`Module::print`]) or
//! executed by the reference interpreter ([`crate::ir::interp`]).

mod builder;
pub mod interp;
mod printer;

pub use builder::Builder;

use rustc_hash::FxHashMap;

// ============================================================================
// Handles
// ============================================================================

/// Handle to a function within a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

/// Handle to a basic block within a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// Handle to an SSA value (an instruction result or a parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

/// Handle to a module-level global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalId(pub u32);

// ============================================================================
// Types and constants
// ============================================================================

/// Lowered representation types.
#[derive(Debug, Clone, PartialEq)]
pub enum IrType {
    Void,
    Int(u32),
    Float(u32),
    /// Untyped address; pointee types live in the semantic layer.
    Ptr,
    /// A named aggregate; its layout is registered on the module.
    Struct(String),
    Array(Box<IrType>, u64),
}

/// A constant operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Int { width: u32, value: i64 },
    Float { width: u32, value: f64 },
    NullPtr,
    /// The zero value of an aggregate type.
    Zero(IrType),
}

// ============================================================================
// Instructions
// ============================================================================

/// Binary arithmetic operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    SDiv,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

/// Comparison predicates (signed for integers, ordered for floats).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// Representation-level conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Trunc,
    Sext,
    FpTrunc,
    FpExt,
    SiToFp,
    FpToSi,
    IntToPtr,
}

/// How a call names its target.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Direct(FuncId),
    /// Call through a function-pointer value.
    Indirect(ValueId),
}

/// A single instruction. Every instruction defines the `ValueId` it is
/// stored under (terminators and stores define a void value).
#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// Materialized constant.
    Const(Const),
    /// Incoming function argument.
    Param { index: u32, ty: IrType },
    /// Stack slot in the containing function.
    Alloca { ty: IrType, name: String },
    /// Address of a module global.
    GlobalAddr(GlobalId),
    /// Address of a function (for indirect calls).
    FuncAddr(FuncId),
    Load { addr: ValueId, ty: IrType },
    Store { value: ValueId, addr: ValueId },
    Binary { op: BinOp, lhs: ValueId, rhs: ValueId },
    Cmp { op: CmpOp, float: bool, lhs: ValueId, rhs: ValueId },
    Cast { kind: CastKind, value: ValueId, to: IrType },
    /// Address of field `index` of the struct at `base`.
    FieldAddr { base: ValueId, struct_name: String, index: u32 },
    /// Value merge: picks the incoming value matching the predecessor
    /// block control arrived from.
    Phi { ty: IrType, incoming: Vec<(ValueId, BlockId)> },
    Call { callee: Callee, args: Vec<ValueId> },
    Br(BlockId),
    CondBr { cond: ValueId, then_bb: BlockId, else_bb: BlockId },
    Ret(Option<ValueId>),
}

impl Inst {
    /// Whether this instruction ends its block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Inst::Br(_) | Inst::CondBr { .. } | Inst::Ret(_))
    }
}

// ============================================================================
// Module structure
// ============================================================================

/// A basic block: a labeled straight-line instruction sequence ending in
/// exactly one terminator.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub label: String,
    pub insts: Vec<ValueId>,
}

/// A function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub ret: IrType,
    pub params: Vec<IrType>,
    pub variadic: bool,
}

/// A function: external declaration or definition with blocks.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub sig: FuncSig,
    pub external: bool,
    pub blocks: Vec<Block>,
    /// Flat value table; `ValueId` indexes into it.
    pub insts: Vec<Inst>,
    /// Parameter values, one per signature parameter.
    pub params: Vec<ValueId>,
}

impl Function {
    pub fn inst(&self, v: ValueId) -> &Inst {
        &self.insts[v.0 as usize]
    }

    pub fn block(&self, b: BlockId) -> &Block {
        &self.blocks[b.0 as usize]
    }

    /// Whether the block's last instruction is a terminator.
    pub fn block_terminated(&self, b: BlockId) -> bool {
        self.block(b)
            .insts
            .last()
            .is_some_and(|v| self.inst(*v).is_terminator())
    }
}

/// A module global.
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: IrType,
    pub init: Const,
}

/// A compiled module: globals, struct layouts, and functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub name: String,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
    /// Field representation types per registered class, in declaration
    /// order. Shared layout authority for `FieldAddr` and the interpreter.
    pub struct_layouts: FxHashMap<String, Vec<IrType>>,
}

impl Module {
    pub fn function(&self, f: FuncId) -> &Function {
        &self.functions[f.0 as usize]
    }

    pub fn global(&self, g: GlobalId) -> &Global {
        &self.globals[g.0 as usize]
    }

    /// Find a function by name.
    pub fn function_named(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .map(|i| FuncId(i as u32))
    }

    /// Number of scalar slots the type occupies in the interpreter's
    /// flattened memory model.
    pub fn slot_count(&self, ty: &IrType) -> u64 {
        match ty {
            IrType::Void => 0,
            IrType::Int(_) | IrType::Float(_) | IrType::Ptr => 1,
            IrType::Struct(name) => self
                .struct_layouts
                .get(name)
                .map(|fields| fields.iter().map(|f| self.slot_count(f)).sum())
                .unwrap_or(0),
            IrType::Array(elem, len) => self.slot_count(elem) * len,
        }
    }

    /// Slot offset of a struct field.
    pub fn field_offset(&self, struct_name: &str, index: u32) -> u64 {
        self.struct_layouts
            .get(struct_name)
            .map(|fields| {
                fields
                    .iter()
                    .take(index as usize)
                    .map(|f| self.slot_count(f))
                    .sum()
            })
            .unwrap_or(0)
    }
}
