//! # Memory Dependency Collection
//!
//! For every instruction that may read or write memory, collect the earlier
//! instructions it depends on, as answered by a [MemDepOracle].
//!
//! Each memory instruction gets exactly one [DepSet] in the resulting
//! [DepMap], and the set is never empty. Atomic and volatile loads and stores
//! are not analyzed, they get a single [DepKind::Unknown] record without a
//! source. A memory instruction that is none of load, store, `va_arg` or call
//! aborts the collection, because the classification of instructions and the
//! collector disagree.

use std::fmt;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::ir::{
    memdep::{MemDepOracle, MemDepResult, NonLocalDepResult},
    passman::PassError,
    Block,
    Context,
    Func,
    Inst,
    MemAccess,
    MemLoc,
    Scope,
};

pub const MEM_DEPENDENCY: &str = "mem-dependency";

/// The kind of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepKind {
    Clobber,
    Def,
    NonFuncLocal,
    Unknown,
}

impl DepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DepKind::Clobber => "Clobber",
            DepKind::Def => "Def",
            DepKind::NonFuncLocal => "NonFuncLocal",
            DepKind::Unknown => "Unknown",
        }
    }

    /// The kind of a resolved oracle answer, `None` for
    /// [MemDepResult::NonLocal] which is not an answer yet.
    pub fn of_result(result: MemDepResult) -> Option<DepKind> {
        match result {
            MemDepResult::Clobber(_) => Some(DepKind::Clobber),
            MemDepResult::Def(_) => Some(DepKind::Def),
            MemDepResult::NonFuncLocal => Some(DepKind::NonFuncLocal),
            MemDepResult::Unknown => Some(DepKind::Unknown),
            MemDepResult::NonLocal => None,
        }
    }
}

impl fmt::Display for DepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

/// One dependency of a memory instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepRecord {
    /// The instruction that depends on `source`.
    pub dependent: Inst,
    /// The instruction depended on, `None` if it cannot be represented.
    pub source: Option<Inst>,
    pub kind: DepKind,
    /// The block a non-local dependency was resolved in.
    pub block: Option<Block>,
}

impl DepRecord {
    fn local(dependent: Inst, result: MemDepResult) -> Self {
        Self {
            dependent,
            source: result.inst(),
            kind: DepKind::of_result(result).unwrap_or(DepKind::Unknown),
            block: None,
        }
    }

    fn non_local(dependent: Inst, dep: NonLocalDepResult) -> Self {
        Self {
            dependent,
            source: dep.result.inst(),
            kind: DepKind::NonFuncLocal,
            block: Some(dep.block),
        }
    }

    fn unknown(dependent: Inst) -> Self {
        Self {
            dependent,
            source: None,
            kind: DepKind::Unknown,
            block: None,
        }
    }

    fn same_dep(&self, other: &DepRecord) -> bool {
        self.kind == other.kind && self.source == other.source && self.block == other.block
    }
}

/// The dependencies of one instruction, in insertion order and without
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepSet {
    records: Vec<DepRecord>,
}

impl DepSet {
    /// Insert a record, returns `false` if the same dependency is present.
    pub fn insert(&mut self, record: DepRecord) -> bool {
        if self.records.iter().any(|r| r.same_dep(&record)) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &DepRecord> { self.records.iter() }

    pub fn as_slice(&self) -> &[DepRecord] { &self.records }

    /// Whether some dependency has no source instruction.
    pub fn has_unresolved(&self) -> bool { self.records.iter().any(|r| r.source.is_none()) }
}

impl<'a> IntoIterator for &'a DepSet {
    type IntoIter = std::slice::Iter<'a, DepRecord>;
    type Item = &'a DepRecord;

    fn into_iter(self) -> Self::IntoIter { self.records.iter() }
}

/// The dependency sets of all the memory instructions in one scope.
#[derive(Debug, Default)]
pub struct DepMap {
    sets: FxHashMap<Inst, DepSet>,
    /// The instructions in the order they were analyzed.
    order: Vec<Inst>,
}

impl DepMap {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, inst: Inst) -> Option<&DepSet> { self.sets.get(&inst) }

    pub fn contains(&self, inst: Inst) -> bool { self.sets.contains_key(&inst) }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    /// Iterate in the order the instructions were analyzed.
    pub fn iter(&self) -> impl Iterator<Item = (Inst, &DepSet)> {
        self.order.iter().map(move |inst| (*inst, &self.sets[inst]))
    }

    fn insert(&mut self, inst: Inst, set: DepSet) {
        if self.sets.insert(inst, set).is_none() {
            self.order.push(inst);
        }
    }

    /// Append the entries of another map, keeping their order.
    pub fn extend(&mut self, other: DepMap) {
        let DepMap { mut sets, order } = other;
        for inst in order {
            if let Some(set) = sets.remove(&inst) {
                self.insert(inst, set);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("unknown memory instruction `{opcode}`: {inst}")]
    UnknownMemoryInst { inst: String, opcode: String },
}

impl From<CollectError> for PassError {
    fn from(err: CollectError) -> Self { PassError::analysis_error(MEM_DEPENDENCY, err) }
}

pub type CollectResult<T> = Result<T, CollectError>;

/// Collect the memory dependencies of every instruction in `scope`.
///
/// For [Scope::Module] all the defined functions are visited in declaration
/// order.
pub fn collect(ctx: &Context, scope: Scope, oracle: &dyn MemDepOracle) -> CollectResult<DepMap> {
    let mut deps = DepMap::new();
    match scope {
        Scope::Func(func) => collect_func(ctx, func, oracle, &mut deps)?,
        Scope::Module => {
            for func in ctx.defined_funcs() {
                collect_func(ctx, func, oracle, &mut deps)?;
            }
        }
    }
    Ok(deps)
}

/// Collect the memory dependencies of the whole module, one function per
/// task.
///
/// Every function is collected into its own map, the maps are merged in
/// declaration order, so the result is the same as
/// `collect(ctx, Scope::Module, oracle)`.
pub fn collect_par<O>(ctx: &Context, oracle: &O) -> CollectResult<DepMap>
where
    O: MemDepOracle + Sync,
{
    let funcs: Vec<Func> = ctx.defined_funcs().collect();
    let maps = funcs
        .par_iter()
        .map(|func| {
            let mut deps = DepMap::new();
            collect_func(ctx, *func, oracle, &mut deps)?;
            Ok(deps)
        })
        .collect::<CollectResult<Vec<DepMap>>>()?;

    let mut deps = DepMap::new();
    for map in maps {
        deps.extend(map);
    }
    Ok(deps)
}

fn collect_func<O>(ctx: &Context, func: Func, oracle: &O, deps: &mut DepMap) -> CollectResult<()>
where
    O: MemDepOracle + ?Sized,
{
    debug!(func = func.name(ctx), "collecting memory dependencies");

    for inst in func.insts(ctx) {
        if !inst.mem_effects(ctx).may_access() {
            continue;
        }
        let set = collect_inst(ctx, inst, oracle)?;
        for record in &set {
            trace!(
                inst = %inst.display(ctx),
                kind = %record.kind,
                source = record.source.map(|s| s.id()),
                "dependency"
            );
        }
        deps.insert(inst, set);
    }

    Ok(())
}

enum NonLocalQuery {
    Call,
    Pointer { loc: MemLoc, is_load: bool },
}

fn collect_inst<O>(ctx: &Context, inst: Inst, oracle: &O) -> CollectResult<DepSet>
where
    O: MemDepOracle + ?Sized,
{
    let mut set = DepSet::default();

    // the non-local query to run if the local one is not conclusive
    let query = match inst.mem_access(ctx) {
        MemAccess::Load { mode, .. } | MemAccess::Store { mode, .. } if !mode.is_unordered() => {
            warn!(inst = %inst.display(ctx), "atomic or volatile access is not analyzed");
            set.insert(DepRecord::unknown(inst));
            return Ok(set);
        }
        MemAccess::Other => {
            error!(inst = %inst.display(ctx), "unknown memory instruction");
            return Err(CollectError::UnknownMemoryInst {
                inst: inst.display(ctx).to_string(),
                opcode: inst.opcode(ctx).to_string(),
            });
        }
        MemAccess::Call { .. } => NonLocalQuery::Call,
        MemAccess::Load { loc, .. } => NonLocalQuery::Pointer { loc, is_load: true },
        MemAccess::Store { loc, .. } | MemAccess::VaArg { loc } => {
            NonLocalQuery::Pointer { loc, is_load: false }
        }
    };

    let result = oracle.dependency(ctx, inst);
    if !result.is_non_local() {
        set.insert(DepRecord::local(inst, result));
        return Ok(set);
    }

    let non_local = match query {
        NonLocalQuery::Call => oracle.non_local_call_dependency(ctx, inst),
        NonLocalQuery::Pointer { loc, is_load } => {
            oracle.non_local_pointer_dependency(ctx, &loc, is_load, inst.parent(ctx))
        }
    };

    for dep in non_local {
        set.insert(DepRecord::non_local(inst, dep));
    }
    if set.is_empty() {
        set.insert(DepRecord::unknown(inst));
    }

    Ok(set)
}
