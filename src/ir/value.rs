//! # Values in IR
//!
//! Everything that can be used by an instruction is a value: global
//! variables, function parameters, block labels and instructions themselves.
//! Each value has a stable handle, a type, an optional name and a list of
//! users. The users are kept in the order they were added, and each user
//! appears once even if it uses the value several times.

use std::fmt;

use super::{Block, BlockData, Context, Func, Inst, InstData, Scope, Ty};
use crate::{
    collections::storage::{ArenaAlloc, ArenaPtr, BaseArenaPtr},
    impl_arena,
};

/// The initializer of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalInit {
    /// Zero-initialized.
    Zero,
    /// An integer constant.
    Int(i64),
    /// The address of another global.
    ///
    /// This makes the global a user of the referenced one.
    Ref(Value),
}

/// The kinds of a value.
pub enum ValueKind {
    /// A global variable, the value itself is the address of the storage.
    Global { content_ty: Ty, init: GlobalInit },
    Param { func: Func, idx: usize },
    /// The label of a block, which is used by branches and phi nodes.
    Block(BlockData),
    Inst(InstData),
}

pub struct ValueData {
    /// The self reference of the value.
    self_ptr: Value,
    /// The type of the value.
    ty: Ty,
    /// The name of the value.
    ///
    /// Globals are always named, local values might not be.
    name: Option<String>,
    /// The kind of the value.
    pub(super) kind: ValueKind,
    /// The users of the value, in insertion order.
    users: Vec<Value>,
}

impl ValueData {
    pub fn self_ptr(&self) -> Value { self.self_ptr }
}

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Value(BaseArenaPtr<ValueData>);

impl_arena!(Context, ValueData, Value, values);

impl Value {
    pub(super) fn new(ctx: &mut Context, ty: Ty, name: Option<String>, kind: ValueKind) -> Value {
        ctx.alloc_with(|self_ptr| ValueData {
            self_ptr,
            ty,
            name,
            kind,
            users: Vec::new(),
        })
    }

    /// The stable handle of the value.
    pub fn id(self) -> usize { self.0.id() }

    pub fn ty(self, ctx: &Context) -> Ty { self.deref(ctx).ty }

    pub fn kind(self, ctx: &Context) -> &ValueKind { &self.deref(ctx).kind }

    pub fn name(self, ctx: &Context) -> Option<&str> { self.deref(ctx).name.as_deref() }

    /// Name a local value and add it to the symbol table of its function.
    ///
    /// # Panics
    ///
    /// - Panics if the value is a global, globals are named when created.
    /// - Panics if the name is already used in the function.
    pub fn set_name(self, ctx: &mut Context, name: impl Into<String>) {
        let name = name.into();
        let func = match self.scope(ctx) {
            Scope::Func(func) => func,
            Scope::Module => panic!("global @{} cannot be renamed", name),
        };
        if func
            .symbols(ctx)
            .iter()
            .any(|symbol| symbol.name(ctx) == Some(name.as_str()))
        {
            panic!("local symbol %{} is already defined in @{}", name, func.name(ctx));
        }
        let first_time = self.deref(ctx).name.is_none();
        self.deref_mut(ctx).name = Some(name);
        if first_time {
            func.add_symbol(ctx, self);
        }
    }

    pub fn users(self, ctx: &Context) -> &[Value] { &self.deref(ctx).users }

    pub(super) fn add_user(self, ctx: &mut Context, user: Value) {
        let users = &mut self.deref_mut(ctx).users;
        if !users.contains(&user) {
            users.push(user);
        }
    }

    /// Get the instruction if this value is one.
    pub fn as_inst(self, ctx: &Context) -> Option<Inst> {
        match self.kind(ctx) {
            ValueKind::Inst(_) => Some(Inst::from_value(self)),
            ValueKind::Global { .. } | ValueKind::Param { .. } | ValueKind::Block(_) => None,
        }
    }

    pub fn is_global(self, ctx: &Context) -> bool {
        matches!(self.kind(ctx), ValueKind::Global { .. })
    }

    /// Get the block if this value is a block label.
    pub fn as_block(self, ctx: &Context) -> Option<Block> {
        match self.kind(ctx) {
            ValueKind::Block(_) => Some(Block::from_value(self)),
            ValueKind::Global { .. } | ValueKind::Param { .. } | ValueKind::Inst(_) => None,
        }
    }

    pub fn is_label(self, ctx: &Context) -> bool { matches!(self.kind(ctx), ValueKind::Block(_)) }

    /// The function the value is local to, `None` for globals.
    pub fn parent_func(self, ctx: &Context) -> Option<Func> {
        match self.kind(ctx) {
            ValueKind::Global { .. } => None,
            ValueKind::Param { func, .. } => Some(*func),
            ValueKind::Block(data) => Some(data.parent()),
            ValueKind::Inst(data) => Some(data.parent().parent(ctx)),
        }
    }

    /// The lexical scope of the value.
    pub fn scope(self, ctx: &Context) -> Scope {
        match self.parent_func(ctx) {
            Some(func) => Scope::Func(func),
            None => Scope::Module,
        }
    }

    /// Display the value as it is defined, e.g., `%x = load i32, ptr @g`.
    pub fn display(self, ctx: &Context) -> DisplayValue<'_> { DisplayValue { ctx, value: self } }

    /// Display the value as it appears in an operand position, e.g., `%x`.
    pub fn display_operand(self, ctx: &Context) -> DisplayOperand<'_> {
        DisplayOperand { ctx, value: self }
    }
}

pub struct DisplayOperand<'a> {
    ctx: &'a Context,
    value: Value,
}

impl fmt::Display for DisplayOperand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sigil = if self.value.is_global(self.ctx) { '@' } else { '%' };
        match self.value.name(self.ctx) {
            Some(name) => write!(f, "{}{}", sigil, name),
            None => write!(f, "{}{}", sigil, self.value.id()),
        }
    }
}

pub struct DisplayValue<'a> {
    ctx: &'a Context,
    value: Value,
}

impl fmt::Display for DisplayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.ctx;
        let value = self.value;
        match value.kind(ctx) {
            ValueKind::Global { content_ty, init } => {
                write!(f, "{} = global {} ", value.display_operand(ctx), content_ty)?;
                match init {
                    GlobalInit::Zero => write!(f, "zeroinit"),
                    GlobalInit::Int(val) => write!(f, "{}", val),
                    GlobalInit::Ref(other) => write!(f, "{}", other.display_operand(ctx)),
                }
            }
            ValueKind::Param { .. } => write!(f, "{} {}", value.ty(ctx), value.display_operand(ctx)),
            ValueKind::Block(_) => write!(f, "label {}", value.display_operand(ctx)),
            ValueKind::Inst(_) => write!(f, "{}", Inst::from_value(value).display(ctx)),
        }
    }
}
