//! # Memory Dependence Queries
//!
//! The interface to a memory dependence analysis. The dependency collector
//! only consumes answers through [MemDepOracle], it never decides by itself
//! which earlier instruction an access depends on.
//!
//! [PrecomputedMemDep] is a table-driven oracle for hosts that already have
//! the answers, e.g., from another analysis or from a test fixture.

use std::fmt;

use rustc_hash::FxHashMap;

use super::{Block, Context, Inst, MemLoc, Value};

/// The answer to a dependence query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemDepResult {
    /// The instruction may clobber the queried memory.
    Clobber(Inst),
    /// The instruction defines the queried memory.
    Def(Inst),
    /// The dependency is not in the block of the query, the non-local
    /// queries must be used to resolve it.
    NonLocal,
    /// The dependency is not in the function of the query.
    NonFuncLocal,
    /// The dependency cannot be determined.
    Unknown,
}

impl MemDepResult {
    /// The instruction the result refers to, if any.
    pub fn inst(self) -> Option<Inst> {
        match self {
            MemDepResult::Clobber(inst) | MemDepResult::Def(inst) => Some(inst),
            MemDepResult::NonLocal | MemDepResult::NonFuncLocal | MemDepResult::Unknown => None,
        }
    }

    pub fn is_non_local(self) -> bool { matches!(self, MemDepResult::NonLocal) }
}

impl fmt::Display for MemDepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemDepResult::Clobber(_) => write!(f, "Clobber"),
            MemDepResult::Def(_) => write!(f, "Def"),
            MemDepResult::NonLocal => write!(f, "NonLocal"),
            MemDepResult::NonFuncLocal => write!(f, "NonFuncLocal"),
            MemDepResult::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A dependency found in another block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NonLocalDepResult {
    pub result: MemDepResult,
    /// The block the dependency was resolved in.
    pub block: Block,
}

impl NonLocalDepResult {
    pub fn new(result: MemDepResult, block: Block) -> Self { Self { result, block } }
}

/// A memory dependence analysis.
pub trait MemDepOracle {
    /// The dependency of a memory instruction within its own block.
    fn dependency(&self, ctx: &Context, inst: Inst) -> MemDepResult;

    /// The dependencies of a call whose local result is
    /// [MemDepResult::NonLocal].
    fn non_local_call_dependency(&self, ctx: &Context, call: Inst) -> Vec<NonLocalDepResult>;

    /// The dependencies of an access to `loc` starting from the beginning of
    /// `block`.
    fn non_local_pointer_dependency(
        &self,
        ctx: &Context,
        loc: &MemLoc,
        is_load: bool,
        block: Block,
    ) -> Vec<NonLocalDepResult>;
}

/// The key of a non-local pointer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PointerQuery {
    ptr: Value,
    is_load: bool,
    block: Block,
}

/// A memory dependence oracle answering from tables filled in advance.
///
/// Instructions without a local entry are answered with
/// [MemDepResult::Unknown], missing non-local entries with no dependencies.
#[derive(Default)]
pub struct PrecomputedMemDep {
    local: FxHashMap<Inst, MemDepResult>,
    calls: FxHashMap<Inst, Vec<NonLocalDepResult>>,
    pointers: FxHashMap<PointerQuery, Vec<NonLocalDepResult>>,
}

impl PrecomputedMemDep {
    pub fn new() -> Self { Self::default() }

    pub fn set_dependency(&mut self, inst: Inst, result: MemDepResult) -> &mut Self {
        self.local.insert(inst, result);
        self
    }

    pub fn set_call_dependency(&mut self, call: Inst, deps: Vec<NonLocalDepResult>) -> &mut Self {
        self.calls.insert(call, deps);
        self
    }

    /// Set the answer of non-local queries on `ptr`, the size of the queried
    /// location is not part of the key.
    pub fn set_pointer_dependency(
        &mut self,
        ptr: Value,
        is_load: bool,
        block: Block,
        deps: Vec<NonLocalDepResult>,
    ) -> &mut Self {
        self.pointers.insert(
            PointerQuery {
                ptr,
                is_load,
                block,
            },
            deps,
        );
        self
    }
}

impl MemDepOracle for PrecomputedMemDep {
    fn dependency(&self, _ctx: &Context, inst: Inst) -> MemDepResult {
        self.local
            .get(&inst)
            .copied()
            .unwrap_or(MemDepResult::Unknown)
    }

    fn non_local_call_dependency(&self, _ctx: &Context, call: Inst) -> Vec<NonLocalDepResult> {
        self.calls.get(&call).cloned().unwrap_or_default()
    }

    fn non_local_pointer_dependency(
        &self,
        _ctx: &Context,
        loc: &MemLoc,
        is_load: bool,
        block: Block,
    ) -> Vec<NonLocalDepResult> {
        let query = PointerQuery {
            ptr: loc.ptr,
            is_load,
            block,
        };
        self.pointers.get(&query).cloned().unwrap_or_default()
    }
}
