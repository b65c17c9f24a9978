use super::{Context, Func, Inst, Ty, Value, ValueKind};
use crate::collections::storage::ArenaPtr;

/// The data of a block.
pub struct BlockData {
    /// The instructions in program order.
    insts: Vec<Inst>,
    /// The parent function of the block.
    parent: Func,
}

impl BlockData {
    pub(super) fn parent(&self) -> Func { self.parent }
}

/// A basic block.
///
/// A block is identified by its label, which is a value used by branches and
/// phi nodes, so [Block] wraps the handle of the label.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Block(Value);

impl Block {
    /// Create a new block and append it to the function.
    pub fn new(ctx: &mut Context, func: Func) -> Block {
        let data = BlockData {
            insts: Vec::new(),
            parent: func,
        };
        let block = Block(Value::new(ctx, Ty::Label, None, ValueKind::Block(data)));
        func.push_block(ctx, block);
        block
    }

    pub(super) fn from_value(value: Value) -> Block { Block(value) }

    fn data(self, ctx: &Context) -> &BlockData {
        match &self.0.deref(ctx).kind {
            ValueKind::Block(data) => data,
            ValueKind::Global { .. } | ValueKind::Param { .. } | ValueKind::Inst(_) => {
                unreachable!("block handle refers to a non-block value")
            }
        }
    }

    /// The label of the block.
    pub fn label(self) -> Value { self.0 }

    pub fn id(self) -> usize { self.0.id() }

    pub fn insts(self, ctx: &Context) -> &[Inst] { &self.data(ctx).insts }

    pub fn parent(self, ctx: &Context) -> Func { self.data(ctx).parent }

    pub(super) fn push_inst(self, ctx: &mut Context, inst: Inst) {
        match &mut self.0.deref_mut(ctx).kind {
            ValueKind::Block(data) => data.insts.push(inst),
            ValueKind::Global { .. } | ValueKind::Param { .. } | ValueKind::Inst(_) => {
                unreachable!("block handle refers to a non-block value")
            }
        }
    }
}
