//! Textual serialization of a module.
//!
//! The printed form is what the core hands to an external driver; it is
//! also what the snapshot-style tests assert against.

use std::fmt;

use super::{Callee, Const, Function, Inst, IrType, Module, ValueId};

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::Int(w) => write!(f, "i{w}"),
            IrType::Float(w) => write!(f, "f{w}"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::Struct(name) => write!(f, "%{name}"),
            IrType::Array(elem, len) => write!(f, "[{elem} x {len}]"),
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int { width, value } => write!(f, "i{width} {value}"),
            Const::Float { width, value } => write!(f, "f{width} {value}"),
            Const::NullPtr => write!(f, "ptr null"),
            Const::Zero(ty) => write!(f, "{ty} zero"),
        }
    }
}

struct V(ValueId);

impl fmt::Display for V {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0.0)
    }
}

fn write_inst(f: &mut fmt::Formatter<'_>, function: &Function, v: ValueId) -> fmt::Result {
    let inst = function.inst(v);
    write!(f, "  ")?;
    match inst {
        Inst::Const(c) => writeln!(f, "{} = const {c}", V(v)),
        Inst::Param { index, ty } => writeln!(f, "{} = param {index} : {ty}", V(v)),
        Inst::Alloca { ty, name } => writeln!(f, "{} = alloca {ty} ; {name}", V(v)),
        Inst::GlobalAddr(g) => writeln!(f, "{} = global_addr #{}", V(v), g.0),
        Inst::FuncAddr(func) => writeln!(f, "{} = func_addr @{}", V(v), func.0),
        Inst::Load { addr, ty } => writeln!(f, "{} = load {ty}, {}", V(v), V(*addr)),
        Inst::Store { value, addr } => writeln!(f, "store {}, {}", V(*value), V(*addr)),
        Inst::Binary { op, lhs, rhs } => {
            writeln!(f, "{} = {op:?} {}, {}", V(v), V(*lhs), V(*rhs))
        }
        Inst::Cmp {
            op,
            float,
            lhs,
            rhs,
        } => {
            let prefix = if *float { "fcmp" } else { "icmp" };
            writeln!(f, "{} = {prefix} {op:?} {}, {}", V(v), V(*lhs), V(*rhs))
        }
        Inst::Cast { kind, value, to } => {
            writeln!(f, "{} = {kind:?} {} to {to}", V(v), V(*value))
        }
        Inst::FieldAddr {
            base,
            struct_name,
            index,
        } => writeln!(f, "{} = field_addr %{struct_name} {}, {index}", V(v), V(*base)),
        Inst::Phi { ty, incoming } => {
            write!(f, "{} = phi {ty}", V(v))?;
            for (value, block) in incoming {
                write!(f, " [{}, {}]", V(*value), function.block(*block).label)?;
            }
            writeln!(f)
        }
        Inst::Call { callee, args } => {
            match callee {
                Callee::Direct(func) => write!(f, "{} = call @{}", V(v), func.0)?,
                Callee::Indirect(ptr) => write!(f, "{} = call_ptr {}", V(v), V(*ptr))?,
            }
            write!(f, "(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", V(*arg))?;
            }
            writeln!(f, ")")
        }
        Inst::Br(target) => writeln!(f, "br {}", function.block(*target).label),
        Inst::CondBr {
            cond,
            then_bb,
            else_bb,
        } => writeln!(
            f,
            "cond_br {}, {}, {}",
            V(*cond),
            function.block(*then_bb).label,
            function.block(*else_bb).label
        ),
        Inst::Ret(Some(value)) => writeln!(f, "ret {}", V(*value)),
        Inst::Ret(None) => writeln!(f, "ret void"),
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; module {}", self.name)?;

        let mut structs: Vec<_> = self.struct_layouts.iter().collect();
        structs.sort_by_key(|(name, _)| name.as_str());
        for (name, fields) in structs {
            let fields: Vec<String> = fields.iter().map(|t| t.to_string()).collect();
            writeln!(f, "%{name} = {{ {} }}", fields.join(", "))?;
        }

        for (i, g) in self.globals.iter().enumerate() {
            writeln!(f, "global #{i} @{} : {} = {}", g.name, g.ty, g.init)?;
        }

        for (i, function) in self.functions.iter().enumerate() {
            let params: Vec<String> = function.sig.params.iter().map(|t| t.to_string()).collect();
            let variadic = if function.sig.variadic { ", ..." } else { "" };
            if function.external {
                writeln!(
                    f,
                    "declare @{i} {}({}{variadic}) -> {}",
                    function.name,
                    params.join(", "),
                    function.sig.ret
                )?;
                continue;
            }
            writeln!(
                f,
                "fn @{i} {}({}{variadic}) -> {} {{",
                function.name,
                params.join(", "),
                function.sig.ret
            )?;
            for block in &function.blocks {
                writeln!(f, "{}:", block.label)?;
                for v in &block.insts {
                    write_inst(f, function, *v)?;
                }
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl Module {
    /// Serialize the module to its textual form.
    pub fn print(&self) -> String {
        self.to_string()
    }
}
