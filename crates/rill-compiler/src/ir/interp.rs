//! Reference interpreter for the IR.
//!
//! Executes a compiled module directly, with a flattened scalar memory
//! model (one slot per scalar, structs and arrays laid out contiguously).
//! This is the executor behind the end-to-end tests; a production driver
//! would hand [`Module::print`] output to a native toolchain instead.
//!
//! External functions are resolved by name: `print_i64` and `print_f64`
//! format each argument onto its own line of the captured output.

use thiserror::Error;

use super::{BinOp, Callee, CastKind, CmpOp, Const, FuncId, Inst, IrType, Module};

/// Errors raised while executing a module.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("call to unknown external function '{name}'")]
    UnknownExternal { name: String },

    #[error("trap: {message}")]
    Trap { message: String },
}

impl ExecError {
    fn trap(message: impl Into<String>) -> Self {
        ExecError::Trap {
            message: message.into(),
        }
    }
}

/// A runtime scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Addr(usize),
    Func(FuncId),
    Undef,
}

impl Scalar {
    fn as_int(self) -> Result<i64, ExecError> {
        match self {
            Scalar::Int(v) => Ok(v),
            other => Err(ExecError::trap(format!("expected integer, got {other:?}"))),
        }
    }

    fn as_float(self) -> Result<f64, ExecError> {
        match self {
            Scalar::Float(v) => Ok(v),
            other => Err(ExecError::trap(format!("expected float, got {other:?}"))),
        }
    }

    fn as_addr(self) -> Result<usize, ExecError> {
        match self {
            Scalar::Addr(a) => Ok(a),
            other => Err(ExecError::trap(format!("expected address, got {other:?}"))),
        }
    }
}

/// The result of running a module to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    /// Value returned from `main`, if any.
    pub ret: Option<Scalar>,
    /// Everything the print externals produced.
    pub output: String,
}

/// Run a module: the module-init function first (if present), then `main`.
pub fn run_module(module: &Module) -> Result<Execution, ExecError> {
    let mut machine = Machine::new(module);
    if let Some(init) = module.function_named("module.init") {
        machine.call(init, Vec::new())?;
    }
    let main = module
        .function_named("main")
        .ok_or_else(|| ExecError::trap("module has no main function"))?;
    let ret = machine.call(main, Vec::new())?;
    Ok(Execution {
        ret,
        output: machine.output,
    })
}

fn get(values: &[Option<Scalar>], id: super::ValueId) -> Result<Scalar, ExecError> {
    values[id.0 as usize].ok_or_else(|| ExecError::trap("use of undefined value"))
}

struct Machine<'m> {
    module: &'m Module,
    mem: Vec<Scalar>,
    global_addrs: Vec<usize>,
    output: String,
    fuel: u64,
}

impl<'m> Machine<'m> {
    fn new(module: &'m Module) -> Self {
        let mut machine = Machine {
            module,
            mem: Vec::new(),
            global_addrs: Vec::new(),
            output: String::new(),
            fuel: 50_000_000,
        };
        for global in &module.globals {
            let addr = machine.alloc(module.slot_count(&global.ty));
            machine.global_addrs.push(addr);
            machine.store_const(addr, &global.init);
        }
        machine
    }

    fn alloc(&mut self, slots: u64) -> usize {
        let addr = self.mem.len();
        self.mem
            .extend(std::iter::repeat_n(Scalar::Int(0), slots as usize));
        addr
    }

    fn store_const(&mut self, addr: usize, c: &Const) {
        match c {
            Const::Int { value, .. } => self.mem[addr] = Scalar::Int(*value),
            Const::Float { value, .. } => self.mem[addr] = Scalar::Float(*value),
            Const::NullPtr => self.mem[addr] = Scalar::Addr(0),
            // Aggregate zeros: slots are already integer zero.
            Const::Zero(_) => {}
        }
    }

    fn call(&mut self, func_id: FuncId, args: Vec<Scalar>) -> Result<Option<Scalar>, ExecError> {
        let function = self.module.function(func_id);
        if function.external {
            return self.call_external(&function.name, &args);
        }
        if function.blocks.is_empty() {
            return Err(ExecError::trap(format!(
                "function '{}' has no body",
                function.name
            )));
        }

        let mut values: Vec<Option<Scalar>> = vec![None; function.insts.len()];
        for (param, arg) in function.params.iter().zip(args) {
            values[param.0 as usize] = Some(arg);
        }

        let mut block = 0usize;
        let mut prev_block: Option<u32> = None;
        'blocks: loop {
            let insts = &function.blocks[block].insts;
            for &v in insts {
                self.fuel = self
                    .fuel
                    .checked_sub(1)
                    .ok_or_else(|| ExecError::trap("execution fuel exhausted"))?;

                match function.inst(v) {
                    Inst::Const(c) => {
                        values[v.0 as usize] = Some(match c {
                            Const::Int { value, .. } => Scalar::Int(*value),
                            Const::Float { value, .. } => Scalar::Float(*value),
                            Const::NullPtr => Scalar::Addr(0),
                            Const::Zero(_) => Scalar::Undef,
                        });
                    }
                    Inst::Param { .. } => {
                        // Filled in at call entry; reaching one unfilled
                        // means the caller passed too few arguments.
                        if values[v.0 as usize].is_none() {
                            return Err(ExecError::trap("missing argument"));
                        }
                    }
                    Inst::Alloca { ty, .. } => {
                        let slots = self.module.slot_count(ty).max(1);
                        let addr = self.alloc(slots);
                        values[v.0 as usize] = Some(Scalar::Addr(addr));
                    }
                    Inst::GlobalAddr(g) => {
                        values[v.0 as usize] = Some(Scalar::Addr(self.global_addrs[g.0 as usize]));
                    }
                    Inst::FuncAddr(f) => {
                        values[v.0 as usize] = Some(Scalar::Func(*f));
                    }
                    Inst::Load { addr, .. } => {
                        let a = get(&values, *addr)?.as_addr()?;
                        let cell = *self
                            .mem
                            .get(a)
                            .ok_or_else(|| ExecError::trap("load out of bounds"))?;
                        values[v.0 as usize] = Some(cell);
                    }
                    Inst::Store { value, addr } => {
                        let cell = get(&values, *value)?;
                        let a = get(&values, *addr)?.as_addr()?;
                        if a >= self.mem.len() {
                            return Err(ExecError::trap("store out of bounds"));
                        }
                        self.mem[a] = cell;
                        values[v.0 as usize] = Some(Scalar::Undef);
                    }
                    Inst::Binary { op, lhs, rhs } => {
                        values[v.0 as usize] = Some(exec_binary(*op, get(&values, *lhs)?, get(&values, *rhs)?)?);
                    }
                    Inst::Cmp {
                        op,
                        float,
                        lhs,
                        rhs,
                    } => {
                        let hit = if *float {
                            let (l, r) = (get(&values, *lhs)?.as_float()?, get(&values, *rhs)?.as_float()?);
                            compare(*op, l.partial_cmp(&r))
                        } else {
                            let (l, r) = (get(&values, *lhs)?.as_int()?, get(&values, *rhs)?.as_int()?);
                            compare(*op, Some(l.cmp(&r)))
                        };
                        values[v.0 as usize] = Some(Scalar::Int(hit as i64));
                    }
                    Inst::Cast { kind, value, to } => {
                        values[v.0 as usize] = Some(exec_cast(*kind, get(&values, *value)?, to)?);
                    }
                    Inst::FieldAddr {
                        base,
                        struct_name,
                        index,
                    } => {
                        let a = get(&values, *base)?.as_addr()?;
                        let offset = self.module.field_offset(struct_name, *index);
                        values[v.0 as usize] = Some(Scalar::Addr(a + offset as usize));
                    }
                    Inst::Phi { incoming, .. } => {
                        let pred = prev_block
                            .ok_or_else(|| ExecError::trap("phi in entry block"))?;
                        let chosen = incoming
                            .iter()
                            .find(|(_, b)| b.0 == pred)
                            .ok_or_else(|| ExecError::trap("phi has no matching predecessor"))?;
                        values[v.0 as usize] = Some(get(&values, chosen.0)?);
                    }
                    Inst::Call { callee, args } => {
                        let mut call_args = Vec::with_capacity(args.len());
                        for arg in args {
                            call_args.push(get(&values, *arg)?);
                        }
                        let target = match callee {
                            Callee::Direct(f) => *f,
                            Callee::Indirect(ptr) => match get(&values, *ptr)? {
                                Scalar::Func(f) => f,
                                other => {
                                    return Err(ExecError::trap(format!(
                                        "indirect call through non-function {other:?}"
                                    )));
                                }
                            },
                        };
                        let ret = self.call(target, call_args)?;
                        values[v.0 as usize] = Some(ret.unwrap_or(Scalar::Undef));
                    }
                    Inst::Br(target) => {
                        prev_block = Some(block as u32);
                        block = target.0 as usize;
                        continue 'blocks;
                    }
                    Inst::CondBr {
                        cond,
                        then_bb,
                        else_bb,
                    } => {
                        let taken = get(&values, *cond)?.as_int()? != 0;
                        prev_block = Some(block as u32);
                        block = if taken { then_bb.0 } else { else_bb.0 } as usize;
                        continue 'blocks;
                    }
                    Inst::Ret(value) => {
                        return match value {
                            Some(id) => Ok(Some(get(&values, *id)?)),
                            None => Ok(None),
                        };
                    }
                }
            }
            return Err(ExecError::trap(format!(
                "block '{}' fell through without a terminator",
                function.blocks[block].label
            )));
        }
    }

    fn call_external(
        &mut self,
        name: &str,
        args: &[Scalar],
    ) -> Result<Option<Scalar>, ExecError> {
        match name {
            "print_i64" => {
                for arg in args {
                    let value = arg.as_int()?;
                    self.output.push_str(&format!("{value}\n"));
                }
                Ok(Some(Scalar::Int(0)))
            }
            "print_f64" => {
                for arg in args {
                    let value = arg.as_float()?;
                    self.output.push_str(&format!("{value}\n"));
                }
                Ok(Some(Scalar::Int(0)))
            }
            _ => Err(ExecError::UnknownExternal { name: name.into() }),
        }
    }
}

fn exec_binary(op: BinOp, lhs: Scalar, rhs: Scalar) -> Result<Scalar, ExecError> {
    match op {
        BinOp::Add => Ok(Scalar::Int(lhs.as_int()?.wrapping_add(rhs.as_int()?))),
        BinOp::Sub => Ok(Scalar::Int(lhs.as_int()?.wrapping_sub(rhs.as_int()?))),
        BinOp::Mul => Ok(Scalar::Int(lhs.as_int()?.wrapping_mul(rhs.as_int()?))),
        BinOp::SDiv => {
            let divisor = rhs.as_int()?;
            if divisor == 0 {
                return Err(ExecError::trap("division by zero"));
            }
            Ok(Scalar::Int(lhs.as_int()?.wrapping_div(divisor)))
        }
        BinOp::SRem => {
            let divisor = rhs.as_int()?;
            if divisor == 0 {
                return Err(ExecError::trap("remainder by zero"));
            }
            Ok(Scalar::Int(lhs.as_int()?.wrapping_rem(divisor)))
        }
        BinOp::FAdd => Ok(Scalar::Float(lhs.as_float()? + rhs.as_float()?)),
        BinOp::FSub => Ok(Scalar::Float(lhs.as_float()? - rhs.as_float()?)),
        BinOp::FMul => Ok(Scalar::Float(lhs.as_float()? * rhs.as_float()?)),
        BinOp::FDiv => Ok(Scalar::Float(lhs.as_float()? / rhs.as_float()?)),
        BinOp::FRem => Ok(Scalar::Float(lhs.as_float()? % rhs.as_float()?)),
    }
}

fn compare(op: CmpOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match (op, ordering) {
        (_, None) => false,
        (CmpOp::Eq, Some(o)) => o == Equal,
        (CmpOp::Ne, Some(o)) => o != Equal,
        (CmpOp::Lt, Some(o)) => o == Less,
        (CmpOp::Gt, Some(o)) => o == Greater,
        (CmpOp::Le, Some(o)) => o != Greater,
        (CmpOp::Ge, Some(o)) => o != Less,
    }
}

fn exec_cast(kind: CastKind, value: Scalar, to: &IrType) -> Result<Scalar, ExecError> {
    match kind {
        CastKind::Trunc => {
            let v = value.as_int()?;
            let width = match to {
                IrType::Int(w) => *w,
                _ => return Err(ExecError::trap("trunc to non-integer")),
            };
            Ok(Scalar::Int(truncate(v, width)))
        }
        // Values are kept sign-extended in 64 bits between instructions.
        CastKind::Sext => Ok(Scalar::Int(value.as_int()?)),
        CastKind::FpTrunc => Ok(Scalar::Float(value.as_float()? as f32 as f64)),
        CastKind::FpExt => Ok(Scalar::Float(value.as_float()?)),
        CastKind::SiToFp => Ok(Scalar::Float(value.as_int()? as f64)),
        CastKind::FpToSi => Ok(Scalar::Int(value.as_float()? as i64)),
        CastKind::IntToPtr => Ok(Scalar::Addr(value.as_int()? as usize)),
    }
}

/// Keep the low `width` bits, sign-extended back into 64 bits.
fn truncate(value: i64, width: u32) -> i64 {
    if width >= 64 {
        return value;
    }
    let shift = 64 - width;
    (value << shift) >> shift
}

#[cfg(test)]
mod tests {
    use super::super::{Builder, FuncSig};
    use super::*;

    fn int_main(build: impl FnOnce(&mut Builder, FuncId)) -> Module {
        let mut b = Builder::new("test");
        let main = b.create_function(
            "main",
            FuncSig {
                ret: IrType::Int(64),
                params: vec![],
                variadic: false,
            },
        );
        build(&mut b, main);
        b.finish()
    }

    #[test]
    fn arithmetic_and_return() {
        let module = int_main(|b, main| {
            let entry = b.create_block(main, "entry");
            b.set_insertion_point(main, entry);
            let six = b.emit_int(64, 6).unwrap();
            let seven = b.emit_int(64, 7).unwrap();
            let product = b.emit_binary(BinOp::Mul, six, seven).unwrap();
            b.emit_ret(Some(product)).unwrap();
        });

        let exec = run_module(&module).unwrap();
        assert_eq!(exec.ret, Some(Scalar::Int(42)));
    }

    #[test]
    fn phi_picks_predecessor() {
        let module = int_main(|b, main| {
            let entry = b.create_block(main, "entry");
            let then_bb = b.create_block(main, "then");
            let else_bb = b.create_block(main, "else");
            let end = b.create_block(main, "end");

            b.set_insertion_point(main, entry);
            let cond = b.emit_int(8, 1).unwrap();
            b.emit_cond_br(cond, then_bb, else_bb).unwrap();

            b.set_insertion_point(main, then_bb);
            let one = b.emit_int(64, 1).unwrap();
            b.emit_br(end).unwrap();

            b.set_insertion_point(main, else_bb);
            let two = b.emit_int(64, 2).unwrap();
            b.emit_br(end).unwrap();

            b.set_insertion_point(main, end);
            let merged = b
                .emit_phi(IrType::Int(64), vec![(one, then_bb), (two, else_bb)])
                .unwrap();
            b.emit_ret(Some(merged)).unwrap();
        });

        let exec = run_module(&module).unwrap();
        assert_eq!(exec.ret, Some(Scalar::Int(1)));
    }

    #[test]
    fn load_store_roundtrip() {
        let module = int_main(|b, main| {
            let entry = b.create_block(main, "entry");
            b.set_insertion_point(main, entry);
            let slot = b.emit_alloca(IrType::Int(64), "x").unwrap();
            let five = b.emit_int(64, 5).unwrap();
            b.emit_store(five, slot).unwrap();
            let loaded = b.emit_load(slot, IrType::Int(64)).unwrap();
            b.emit_ret(Some(loaded)).unwrap();
        });

        let exec = run_module(&module).unwrap();
        assert_eq!(exec.ret, Some(Scalar::Int(5)));
    }

    #[test]
    fn print_external_captures_output() {
        let mut b = Builder::new("test");
        let print = b.declare_external(
            "print_i64",
            FuncSig {
                ret: IrType::Int(64),
                params: vec![IrType::Int(64)],
                variadic: true,
            },
        );
        let main = b.create_function(
            "main",
            FuncSig {
                ret: IrType::Int(64),
                params: vec![],
                variadic: false,
            },
        );
        let entry = b.create_block(main, "entry");
        b.set_insertion_point(main, entry);
        let value = b.emit_int(64, 120).unwrap();
        b.emit_call(print, vec![value]).unwrap();
        let zero = b.emit_int(64, 0).unwrap();
        b.emit_ret(Some(zero)).unwrap();

        let exec = run_module(&b.finish()).unwrap();
        assert_eq!(exec.output, "120\n");
    }

    #[test]
    fn truncate_wraps_and_sign_extends() {
        assert_eq!(truncate(300, 8), 44);
        assert_eq!(truncate(200, 8), -56);
        assert_eq!(truncate(-1, 8), -1);
        assert_eq!(truncate(1, 1), -1);
    }
}
