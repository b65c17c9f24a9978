use super::{Block, Context, GlobalInit, Inst, MemEffects, Ty, Value, ValueKind};
use crate::{
    collections::storage::{ArenaAlloc, ArenaPtr, BaseArenaPtr},
    impl_arena,
};

/// The lexical scope of a value.
///
/// Globals belong to the module, everything else to the function it is
/// defined in.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Module,
    Func(Func),
}

impl Scope {
    pub fn func(self) -> Option<Func> {
        match self {
            Scope::Module => None,
            Scope::Func(func) => Some(func),
        }
    }
}

/// The data of a function.
///
/// A function without blocks is a declaration.
pub struct FuncData {
    self_ptr: Func,
    /// The name of the function.
    name: String,
    /// The return type.
    ret: Ty,
    /// The parameters.
    params: Vec<Value>,
    /// The blocks in layout order, the first one is the entry.
    blocks: Vec<Block>,
    /// The named local values, in the order they were named.
    symbols: Vec<Value>,
    /// The memory effects of calling this function.
    effects: MemEffects,
}

impl FuncData {
    pub fn self_ptr(&self) -> Func { self.self_ptr }
}

#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Func(BaseArenaPtr<FuncData>);

impl_arena!(Context, FuncData, Func, funcs);

impl Func {
    /// Create a new function with unnamed parameters of the given types.
    ///
    /// Calls are assumed to read and write arbitrary memory unless
    /// [set_effects](Self::set_effects) says otherwise.
    ///
    /// # Panics
    ///
    /// Panics if the symbol is already defined in the context.
    pub fn new(ctx: &mut Context, name: impl Into<String>, params: Vec<Ty>, ret: Ty) -> Func {
        let func = ctx.alloc_with(|self_ptr| FuncData {
            self_ptr,
            name: name.into(),
            ret,
            params: Vec::new(),
            blocks: Vec::new(),
            symbols: Vec::new(),
            effects: MemEffects::READ_WRITE,
        });
        let params = params
            .into_iter()
            .enumerate()
            .map(|(idx, ty)| Value::new(ctx, ty, None, ValueKind::Param { func, idx }))
            .collect();
        func.deref_mut(ctx).params = params;
        ctx.insert_func(func);
        func
    }

    pub fn id(self) -> usize { self.0.id() }

    pub fn name(self, ctx: &Context) -> &str { &self.deref(ctx).name }

    pub fn ret_ty(self, ctx: &Context) -> Ty { self.deref(ctx).ret }

    pub fn params(self, ctx: &Context) -> &[Value] { &self.deref(ctx).params }

    pub fn param(self, ctx: &Context, idx: usize) -> Value { self.deref(ctx).params[idx] }

    pub fn blocks(self, ctx: &Context) -> &[Block] { &self.deref(ctx).blocks }

    /// The symbol table, i.e., all the named local values including block
    /// labels.
    pub fn symbols(self, ctx: &Context) -> &[Value] { &self.deref(ctx).symbols }

    pub fn is_declaration(self, ctx: &Context) -> bool { self.blocks(ctx).is_empty() }

    pub fn effects(self, ctx: &Context) -> MemEffects { self.deref(ctx).effects }

    pub fn set_effects(self, ctx: &mut Context, effects: MemEffects) {
        self.deref_mut(ctx).effects = effects;
    }

    /// Iterate over all the instructions in program order.
    pub fn insts(self, ctx: &Context) -> impl Iterator<Item = Inst> + '_ {
        self.blocks(ctx)
            .iter()
            .flat_map(move |block| block.insts(ctx).iter().copied())
    }

    pub(super) fn push_block(self, ctx: &mut Context, block: Block) {
        self.deref_mut(ctx).blocks.push(block);
    }

    pub(super) fn add_symbol(self, ctx: &mut Context, value: Value) {
        self.deref_mut(ctx).symbols.push(value);
    }

}

impl Value {
    /// Create a global variable holding a value of `content_ty`.
    ///
    /// # Panics
    ///
    /// Panics if the symbol is already defined in the context.
    pub fn global(
        ctx: &mut Context,
        name: impl Into<String>,
        content_ty: Ty,
        init: GlobalInit,
    ) -> Value {
        let kind = ValueKind::Global { content_ty, init };
        let global = Value::new(ctx, Ty::Ptr, Some(name.into()), kind);
        if let GlobalInit::Ref(other) = init {
            other.add_user(ctx, global);
        }
        ctx.insert_global(global);
        global
    }
}
