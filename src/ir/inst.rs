use core::fmt;

use super::{Block, Context, Func, Ty, Value, ValueKind};
use crate::collections::storage::ArenaPtr;

/// The atomic ordering of a memory access.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AtomicOrdering {
    #[default]
    NotAtomic,
    Unordered,
    Monotonic,
    Acquire,
    Release,
    AcqRel,
    SeqCst,
}

impl fmt::Display for AtomicOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAtomic => write!(f, "notatomic"),
            Self::Unordered => write!(f, "unordered"),
            Self::Monotonic => write!(f, "monotonic"),
            Self::Acquire => write!(f, "acquire"),
            Self::Release => write!(f, "release"),
            Self::AcqRel => write!(f, "acq_rel"),
            Self::SeqCst => write!(f, "seq_cst"),
        }
    }
}

/// How a load or store accesses memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessMode {
    pub ordering: AtomicOrdering,
    pub volatile: bool,
}

impl AccessMode {
    pub fn atomic(ordering: AtomicOrdering) -> Self {
        Self {
            ordering,
            volatile: false,
        }
    }

    pub fn volatile() -> Self {
        Self {
            ordering: AtomicOrdering::NotAtomic,
            volatile: true,
        }
    }

    /// An access is unordered if it is neither volatile nor ordered stronger
    /// than [AtomicOrdering::Unordered].
    pub fn is_unordered(self) -> bool {
        !self.volatile && self.ordering <= AtomicOrdering::Unordered
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ordering != AtomicOrdering::NotAtomic {
            write!(f, "atomic {} ", self.ordering)?;
        }
        if self.volatile {
            write!(f, "volatile ")?;
        }
        Ok(())
    }
}

/// The memory effects of an instruction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemEffects {
    pub may_read: bool,
    pub may_write: bool,
}

impl MemEffects {
    pub const NONE: MemEffects = MemEffects {
        may_read: false,
        may_write: false,
    };
    pub const READ: MemEffects = MemEffects {
        may_read: true,
        may_write: false,
    };
    pub const READ_WRITE: MemEffects = MemEffects {
        may_read: true,
        may_write: true,
    };
    pub const WRITE: MemEffects = MemEffects {
        may_read: false,
        may_write: true,
    };

    pub fn may_access(self) -> bool { self.may_read || self.may_write }
}

/// A memory location accessed by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemLoc {
    /// The address.
    pub ptr: Value,
    /// The size of the access in bytes, `None` if unknown.
    pub size: Option<u64>,
}

/// Integer binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    And,
    Or,
    Xor,
    Shl,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Mul => write!(f, "mul"),
            Self::SDiv => write!(f, "sdiv"),
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Xor => write!(f, "xor"),
            Self::Shl => write!(f, "shl"),
        }
    }
}

/// The kinds of instructions.
///
/// Operands are stored in [InstData], the kind only carries what is not a
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstKind {
    /// An integer constant.
    IConst(i64),
    /// Allocate a stack slot of the given type.
    Alloca(Ty),
    /// Integer binary operation, operands are `lhs` and `rhs`.
    Binary(BinaryOp),
    /// Pointer arithmetic, operands are `base` and `offset`.
    Offset,
    /// Load from memory, the operand is the address.
    Load(AccessMode),
    /// Store to memory, operands are the stored value and the address.
    Store(AccessMode),
    /// Fetch the next variadic argument, the operand is the `va_list` pointer.
    VaArg,
    /// Direct call, operands are the arguments.
    Call(Func),
    /// Phi node, operands are pairs of incoming value and block label.
    Phi,
    /// Unconditional jump, the operand is the destination label.
    Jump,
    /// Conditional branch, operands are the condition and two labels.
    Br,
    /// Return, with an optional operand.
    Ret,
    /// An instruction the IR has no dedicated kind for, carrying its own
    /// memory effects.
    Opaque { opcode: String, effects: MemEffects },
}

impl InstKind {
    pub fn opcode(&self) -> &str {
        match self {
            InstKind::IConst(_) => "iconst",
            InstKind::Alloca(_) => "alloca",
            InstKind::Binary(op) => match op {
                BinaryOp::Add => "add",
                BinaryOp::Sub => "sub",
                BinaryOp::Mul => "mul",
                BinaryOp::SDiv => "sdiv",
                BinaryOp::And => "and",
                BinaryOp::Or => "or",
                BinaryOp::Xor => "xor",
                BinaryOp::Shl => "shl",
            },
            InstKind::Offset => "offset",
            InstKind::Load(_) => "load",
            InstKind::Store(_) => "store",
            InstKind::VaArg => "va_arg",
            InstKind::Call(_) => "call",
            InstKind::Phi => "phi",
            InstKind::Jump => "jump",
            InstKind::Br => "br",
            InstKind::Ret => "ret",
            InstKind::Opaque { opcode, .. } => opcode.as_str(),
        }
    }
}

/// How an instruction touches memory.
///
/// This is the closed set of memory accessing instructions the dependency
/// analysis understands. [MemAccess::Other] covers everything else, whether
/// it touches memory or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccess {
    Load { loc: MemLoc, mode: AccessMode },
    Store { loc: MemLoc, mode: AccessMode },
    VaArg { loc: MemLoc },
    Call { callee: Func },
    Other,
}

pub struct InstData {
    /// The kind of the instruction.
    kind: InstKind,
    /// The operands, in the order defined by [InstKind].
    operands: Vec<Value>,
    /// The parent block, instructions are always created inside a block.
    parent: Block,
}

impl InstData {
    pub(super) fn parent(&self) -> Block { self.parent }
}

/// An instruction.
///
/// Instructions are values, so the handle of an instruction is the handle of
/// its result value, even if the result is `void`.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Inst(Value);

impl Inst {
    pub(super) fn from_value(value: Value) -> Inst { Inst(value) }

    fn new(ctx: &mut Context, block: Block, kind: InstKind, ty: Ty, operands: Vec<Value>) -> Inst {
        let data = InstData {
            kind,
            operands: operands.clone(),
            parent: block,
        };
        let value = Value::new(ctx, ty, None, ValueKind::Inst(data));
        for operand in operands {
            operand.add_user(ctx, value);
        }
        let inst = Inst(value);
        block.push_inst(ctx, inst);
        inst
    }

    pub fn iconst(ctx: &mut Context, block: Block, ty: Ty, val: i64) -> Inst {
        Self::new(ctx, block, InstKind::IConst(val), ty, vec![])
    }

    pub fn alloca(ctx: &mut Context, block: Block, ty: Ty) -> Inst {
        Self::new(ctx, block, InstKind::Alloca(ty), Ty::Ptr, vec![])
    }

    pub fn binary(ctx: &mut Context, block: Block, op: BinaryOp, lhs: Value, rhs: Value) -> Inst {
        let ty = lhs.ty(ctx);
        Self::new(ctx, block, InstKind::Binary(op), ty, vec![lhs, rhs])
    }

    pub fn offset(ctx: &mut Context, block: Block, base: Value, offset: Value) -> Inst {
        Self::new(ctx, block, InstKind::Offset, Ty::Ptr, vec![base, offset])
    }

    pub fn load(ctx: &mut Context, block: Block, ty: Ty, ptr: Value) -> Inst {
        Self::load_with(ctx, block, ty, ptr, AccessMode::default())
    }

    pub fn load_with(
        ctx: &mut Context,
        block: Block,
        ty: Ty,
        ptr: Value,
        mode: AccessMode,
    ) -> Inst {
        Self::new(ctx, block, InstKind::Load(mode), ty, vec![ptr])
    }

    pub fn store(ctx: &mut Context, block: Block, val: Value, ptr: Value) -> Inst {
        Self::store_with(ctx, block, val, ptr, AccessMode::default())
    }

    pub fn store_with(
        ctx: &mut Context,
        block: Block,
        val: Value,
        ptr: Value,
        mode: AccessMode,
    ) -> Inst {
        Self::new(ctx, block, InstKind::Store(mode), Ty::Void, vec![val, ptr])
    }

    pub fn va_arg(ctx: &mut Context, block: Block, ty: Ty, list: Value) -> Inst {
        Self::new(ctx, block, InstKind::VaArg, ty, vec![list])
    }

    pub fn call(ctx: &mut Context, block: Block, callee: Func, args: Vec<Value>) -> Inst {
        let ty = callee.ret_ty(ctx);
        Self::new(ctx, block, InstKind::Call(callee), ty, args)
    }

    pub fn phi(ctx: &mut Context, block: Block, ty: Ty, incoming: Vec<(Value, Block)>) -> Inst {
        let operands = incoming
            .into_iter()
            .flat_map(|(val, from)| [val, from.label()])
            .collect();
        Self::new(ctx, block, InstKind::Phi, ty, operands)
    }

    pub fn jump(ctx: &mut Context, block: Block, dest: Block) -> Inst {
        Self::new(ctx, block, InstKind::Jump, Ty::Void, vec![dest.label()])
    }

    pub fn br(ctx: &mut Context, block: Block, cond: Value, then: Block, els: Block) -> Inst {
        let operands = vec![cond, then.label(), els.label()];
        Self::new(ctx, block, InstKind::Br, Ty::Void, operands)
    }

    pub fn ret(ctx: &mut Context, block: Block, val: Option<Value>) -> Inst {
        Self::new(ctx, block, InstKind::Ret, Ty::Void, val.into_iter().collect())
    }

    pub fn opaque(
        ctx: &mut Context,
        block: Block,
        opcode: impl Into<String>,
        ty: Ty,
        operands: Vec<Value>,
        effects: MemEffects,
    ) -> Inst {
        let kind = InstKind::Opaque {
            opcode: opcode.into(),
            effects,
        };
        Self::new(ctx, block, kind, ty, operands)
    }

    fn data(self, ctx: &Context) -> &InstData {
        match &self.0.deref(ctx).kind {
            ValueKind::Inst(data) => data,
            ValueKind::Global { .. } | ValueKind::Param { .. } | ValueKind::Block(_) => {
                unreachable!("instruction handle refers to a non-instruction value")
            }
        }
    }

    /// The value of the instruction, which shares the same handle.
    pub fn value(self) -> Value { self.0 }

    pub fn id(self) -> usize { self.0.id() }

    pub fn kind(self, ctx: &Context) -> &InstKind { &self.data(ctx).kind }

    pub fn opcode(self, ctx: &Context) -> &str { self.kind(ctx).opcode() }

    pub fn operands(self, ctx: &Context) -> &[Value] { &self.data(ctx).operands }

    pub fn operand(self, ctx: &Context, idx: usize) -> Value { self.data(ctx).operands[idx] }

    pub fn parent(self, ctx: &Context) -> Block { self.data(ctx).parent }

    pub fn parent_func(self, ctx: &Context) -> Func { self.parent(ctx).parent(ctx) }

    pub fn is_store(self, ctx: &Context) -> bool { matches!(self.kind(ctx), InstKind::Store(_)) }

    pub fn is_load(self, ctx: &Context) -> bool { matches!(self.kind(ctx), InstKind::Load(_)) }

    /// The memory effects of the instruction.
    ///
    /// Ordered (atomic or volatile) loads and stores both read and write,
    /// calls take the effects of the callee.
    pub fn mem_effects(self, ctx: &Context) -> MemEffects {
        match self.kind(ctx) {
            InstKind::Load(mode) if mode.is_unordered() => MemEffects::READ,
            InstKind::Store(mode) if mode.is_unordered() => MemEffects::WRITE,
            InstKind::Load(_) | InstKind::Store(_) | InstKind::VaArg => MemEffects::READ_WRITE,
            InstKind::Call(callee) => callee.effects(ctx),
            InstKind::Opaque { effects, .. } => *effects,
            InstKind::IConst(_)
            | InstKind::Alloca(_)
            | InstKind::Binary(_)
            | InstKind::Offset
            | InstKind::Phi
            | InstKind::Jump
            | InstKind::Br
            | InstKind::Ret => MemEffects::NONE,
        }
    }

    /// Classify how the instruction accesses memory.
    pub fn mem_access(self, ctx: &Context) -> MemAccess {
        match self.kind(ctx) {
            InstKind::Load(mode) => MemAccess::Load {
                loc: MemLoc {
                    ptr: self.operand(ctx, 0),
                    size: self.value().ty(ctx).bytewidth(),
                },
                mode: *mode,
            },
            InstKind::Store(mode) => MemAccess::Store {
                loc: MemLoc {
                    ptr: self.operand(ctx, 1),
                    size: self.operand(ctx, 0).ty(ctx).bytewidth(),
                },
                mode: *mode,
            },
            InstKind::VaArg => MemAccess::VaArg {
                loc: MemLoc {
                    ptr: self.operand(ctx, 0),
                    size: None,
                },
            },
            InstKind::Call(callee) => MemAccess::Call { callee: *callee },
            InstKind::IConst(_)
            | InstKind::Alloca(_)
            | InstKind::Binary(_)
            | InstKind::Offset
            | InstKind::Phi
            | InstKind::Jump
            | InstKind::Br
            | InstKind::Ret
            | InstKind::Opaque { .. } => MemAccess::Other,
        }
    }

    pub fn display(self, ctx: &Context) -> DisplayInst<'_> { DisplayInst { ctx, inst: self } }
}

pub struct DisplayInst<'a> {
    ctx: &'a Context,
    inst: Inst,
}

impl fmt::Display for DisplayInst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        let inst = self.inst;
        let value = inst.value();
        let ty = value.ty(ctx);
        let operands = inst.operands(ctx);

        if !ty.is_void() {
            write!(f, "{} = ", value.display_operand(ctx))?;
        }

        match inst.kind(ctx) {
            InstKind::IConst(val) => write!(f, "iconst {} {}", ty, val),
            InstKind::Alloca(slot_ty) => write!(f, "alloca {}", slot_ty),
            InstKind::Binary(op) => write!(
                f,
                "{} {} {}, {}",
                op,
                ty,
                operands[0].display_operand(ctx),
                operands[1].display_operand(ctx)
            ),
            InstKind::Offset => write!(
                f,
                "offset ptr {}, {} {}",
                operands[0].display_operand(ctx),
                operands[1].ty(ctx),
                operands[1].display_operand(ctx)
            ),
            InstKind::Load(mode) => write!(
                f,
                "load {}{}, ptr {}",
                mode,
                ty,
                operands[0].display_operand(ctx)
            ),
            InstKind::Store(mode) => write!(
                f,
                "store {}{} {}, ptr {}",
                mode,
                operands[0].ty(ctx),
                operands[0].display_operand(ctx),
                operands[1].display_operand(ctx)
            ),
            InstKind::VaArg => write!(
                f,
                "va_arg ptr {}, {}",
                operands[0].display_operand(ctx),
                ty
            ),
            InstKind::Call(callee) => {
                write!(f, "call {} @{}(", ty, callee.name(ctx))?;
                display_list(f, ctx, operands)?;
                write!(f, ")")
            }
            InstKind::Phi => {
                write!(f, "phi {} ", ty)?;
                for (i, pair) in operands.chunks(2).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(
                        f,
                        "[{}, {}]",
                        pair[0].display_operand(ctx),
                        pair[1].display_operand(ctx)
                    )?;
                }
                Ok(())
            }
            InstKind::Jump => write!(f, "jump {}", operands[0].display_operand(ctx)),
            InstKind::Br => write!(
                f,
                "br {}, {}, {}",
                operands[0].display_operand(ctx),
                operands[1].display_operand(ctx),
                operands[2].display_operand(ctx)
            ),
            InstKind::Ret => match operands.first() {
                Some(val) => write!(f, "ret {} {}", val.ty(ctx), val.display_operand(ctx)),
                None => write!(f, "ret void"),
            },
            InstKind::Opaque { opcode, .. } => {
                write!(f, "{}", opcode)?;
                if !operands.is_empty() {
                    write!(f, " ")?;
                    display_list(f, ctx, operands)?;
                }
                Ok(())
            }
        }
    }
}

fn display_list(f: &mut fmt::Formatter<'_>, ctx: &Context, values: &[Value]) -> fmt::Result {
    for (i, val) in values.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} {}", val.ty(ctx), val.display_operand(ctx))?;
    }
    Ok(())
}
