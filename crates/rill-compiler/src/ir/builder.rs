//! Instruction emission.
//!
//! `Builder` owns the module under construction and an insertion cursor
//! (current function + block). Every `emit_*` call appends to the cursor's
//! block and returns the handle of the produced value. The cursor is plain
//! per-unit state — saving and restoring it is how the compiler temporarily
//! emits elsewhere (the module-init function, a template instance body).

use rill_core::{CompilationError, Result};

use super::{
    BinOp, Block, BlockId, Callee, CastKind, CmpOp, Const, FuncId, FuncSig, Function, Global,
    GlobalId, Inst, IrType, Module, ValueId,
};

/// Builds one [`Module`], keeping an insertion cursor.
#[derive(Debug)]
pub struct Builder {
    module: Module,
    cursor: Option<(FuncId, BlockId)>,
}

impl Builder {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: Module {
                name: module_name.into(),
                ..Module::default()
            },
            cursor: None,
        }
    }

    /// Consume the builder, yielding the finished module.
    pub fn finish(self) -> Module {
        self.module
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    // ==========================================================================
    // Module-level construction
    // ==========================================================================

    /// Define a function. The entry block is not created here; callers
    /// bracket body emission with `create_block` + `set_insertion_point`.
    pub fn create_function(&mut self, name: impl Into<String>, sig: FuncSig) -> FuncId {
        let id = FuncId(self.module.functions.len() as u32);
        let mut function = Function {
            name: name.into(),
            sig,
            external: false,
            blocks: Vec::new(),
            insts: Vec::new(),
            params: Vec::new(),
        };
        for (index, ty) in function.sig.params.clone().into_iter().enumerate() {
            let v = ValueId(function.insts.len() as u32);
            function.insts.push(Inst::Param {
                index: index as u32,
                ty,
            });
            function.params.push(v);
        }
        self.module.functions.push(function);
        id
    }

    /// Declare an external function (no body; resolved by the runtime).
    pub fn declare_external(&mut self, name: impl Into<String>, sig: FuncSig) -> FuncId {
        let id = self.create_function(name, sig);
        self.module.functions[id.0 as usize].external = true;
        id
    }

    /// Register a class layout once; later registrations are ignored.
    pub fn register_struct(&mut self, name: impl Into<String>, fields: Vec<IrType>) {
        self.module.struct_layouts.entry(name.into()).or_insert(fields);
    }

    /// Add a module global with a constant initializer.
    pub fn add_global(&mut self, name: impl Into<String>, ty: IrType, init: Const) -> GlobalId {
        let id = GlobalId(self.module.globals.len() as u32);
        self.module.globals.push(Global {
            name: name.into(),
            ty,
            init,
        });
        id
    }

    /// Parameter values of a function, in order.
    pub fn function_params(&self, func: FuncId) -> Vec<ValueId> {
        self.module.function(func).params.clone()
    }

    // ==========================================================================
    // Blocks and the insertion cursor
    // ==========================================================================

    /// Append a labeled basic block to a function.
    pub fn create_block(&mut self, func: FuncId, label: impl Into<String>) -> BlockId {
        let function = &mut self.module.functions[func.0 as usize];
        let id = BlockId(function.blocks.len() as u32);
        function.blocks.push(Block {
            label: label.into(),
            insts: Vec::new(),
        });
        id
    }

    pub fn set_insertion_point(&mut self, func: FuncId, block: BlockId) {
        self.cursor = Some((func, block));
    }

    /// The raw cursor, for save/restore around compiling one function
    /// from inside another.
    pub fn cursor(&self) -> Option<(FuncId, BlockId)> {
        self.cursor
    }

    pub fn restore_cursor(&mut self, cursor: Option<(FuncId, BlockId)>) {
        self.cursor = cursor;
    }

    /// The block instructions are currently appended to.
    pub fn insertion_point(&self) -> Result<(FuncId, BlockId)> {
        self.cursor
            .ok_or_else(|| CompilationError::internal("no insertion block is set"))
    }

    pub fn insertion_block(&self) -> Result<BlockId> {
        Ok(self.insertion_point()?.1)
    }

    pub fn current_function(&self) -> Result<FuncId> {
        Ok(self.insertion_point()?.0)
    }

    /// Whether the given block already ends in a terminator.
    pub fn block_terminated(&self, func: FuncId, block: BlockId) -> bool {
        self.module.function(func).block_terminated(block)
    }

    /// Whether the insertion block already ends in a terminator.
    pub fn terminated(&self) -> Result<bool> {
        let (func, block) = self.insertion_point()?;
        Ok(self.block_terminated(func, block))
    }

    fn push(&mut self, inst: Inst) -> Result<ValueId> {
        let (func, block) = self.insertion_point()?;
        let function = &mut self.module.functions[func.0 as usize];
        let v = ValueId(function.insts.len() as u32);
        function.insts.push(inst);
        function.blocks[block.0 as usize].insts.push(v);
        Ok(v)
    }

    // ==========================================================================
    // Instruction emission
    // ==========================================================================

    pub fn emit_const(&mut self, c: Const) -> Result<ValueId> {
        self.push(Inst::Const(c))
    }

    pub fn emit_int(&mut self, width: u32, value: i64) -> Result<ValueId> {
        self.emit_const(Const::Int { width, value })
    }

    pub fn emit_float(&mut self, width: u32, value: f64) -> Result<ValueId> {
        self.emit_const(Const::Float { width, value })
    }

    pub fn emit_alloca(&mut self, ty: IrType, name: impl Into<String>) -> Result<ValueId> {
        self.push(Inst::Alloca {
            ty,
            name: name.into(),
        })
    }

    pub fn emit_global_addr(&mut self, global: GlobalId) -> Result<ValueId> {
        self.push(Inst::GlobalAddr(global))
    }

    pub fn emit_func_addr(&mut self, func: FuncId) -> Result<ValueId> {
        self.push(Inst::FuncAddr(func))
    }

    pub fn emit_load(&mut self, addr: ValueId, ty: IrType) -> Result<ValueId> {
        self.push(Inst::Load { addr, ty })
    }

    pub fn emit_store(&mut self, value: ValueId, addr: ValueId) -> Result<ValueId> {
        self.push(Inst::Store { value, addr })
    }

    pub fn emit_binary(&mut self, op: BinOp, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.push(Inst::Binary { op, lhs, rhs })
    }

    pub fn emit_cmp(
        &mut self,
        op: CmpOp,
        float: bool,
        lhs: ValueId,
        rhs: ValueId,
    ) -> Result<ValueId> {
        self.push(Inst::Cmp {
            op,
            float,
            lhs,
            rhs,
        })
    }

    pub fn emit_cast(&mut self, kind: CastKind, value: ValueId, to: IrType) -> Result<ValueId> {
        self.push(Inst::Cast { kind, value, to })
    }

    pub fn emit_field_addr(
        &mut self,
        base: ValueId,
        struct_name: impl Into<String>,
        index: u32,
    ) -> Result<ValueId> {
        self.push(Inst::FieldAddr {
            base,
            struct_name: struct_name.into(),
            index,
        })
    }

    /// Emit the phi-equivalent merge. One incoming value per predecessor
    /// branch block; callers are responsible for passing the block each
    /// branch actually ended in.
    pub fn emit_phi(&mut self, ty: IrType, incoming: Vec<(ValueId, BlockId)>) -> Result<ValueId> {
        self.push(Inst::Phi { ty, incoming })
    }

    pub fn emit_call(&mut self, func: FuncId, args: Vec<ValueId>) -> Result<ValueId> {
        self.push(Inst::Call {
            callee: Callee::Direct(func),
            args,
        })
    }

    pub fn emit_call_ptr(&mut self, callee: ValueId, args: Vec<ValueId>) -> Result<ValueId> {
        self.push(Inst::Call {
            callee: Callee::Indirect(callee),
            args,
        })
    }

    pub fn emit_br(&mut self, target: BlockId) -> Result<ValueId> {
        self.push(Inst::Br(target))
    }

    pub fn emit_cond_br(
        &mut self,
        cond: ValueId,
        then_bb: BlockId,
        else_bb: BlockId,
    ) -> Result<ValueId> {
        self.push(Inst::CondBr {
            cond,
            then_bb,
            else_bb,
        })
    }

    pub fn emit_ret(&mut self, value: Option<ValueId>) -> Result<ValueId> {
        self.push(Inst::Ret(value))
    }
}
