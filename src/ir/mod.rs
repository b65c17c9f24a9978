mod block;
mod context;
mod global;
mod inst;
mod ty;
mod value;

pub mod memdep;
pub mod passes;
pub mod passman;

pub use block::{Block, BlockData};
pub use context::{Context, SymbolKind};
pub use global::{Func, FuncData, Scope};
pub use inst::{
    AccessMode,
    AtomicOrdering,
    BinaryOp,
    Inst,
    InstData,
    InstKind,
    MemAccess,
    MemEffects,
    MemLoc,
};
pub use ty::Ty;
pub use value::{GlobalInit, Value, ValueData, ValueKind};
