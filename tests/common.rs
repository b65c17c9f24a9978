#![allow(dead_code)]

use orzdep::ir::{
    memdep::{MemDepOracle, MemDepResult, NonLocalDepResult},
    Block,
    Context,
    Func,
    GlobalInit,
    Inst,
    MemLoc,
    Ty,
    Value,
};

/// An oracle that must never be asked.
pub struct PanicOracle;

impl MemDepOracle for PanicOracle {
    fn dependency(&self, _ctx: &Context, _inst: Inst) -> MemDepResult {
        panic!("the oracle should not be queried")
    }

    fn non_local_call_dependency(&self, _ctx: &Context, _call: Inst) -> Vec<NonLocalDepResult> {
        panic!("the oracle should not be queried")
    }

    fn non_local_pointer_dependency(
        &self,
        _ctx: &Context,
        _loc: &MemLoc,
        _is_load: bool,
        _block: Block,
    ) -> Vec<NonLocalDepResult> {
        panic!("the oracle should not be queried")
    }
}

/// A function `f(ptr %p)` storing to `%p` and loading it back.
pub struct StoreLoad {
    pub ctx: Context,
    pub func: Func,
    pub entry: Block,
    pub ptr: Value,
    pub one: Inst,
    pub store: Inst,
    pub load: Inst,
}

pub fn store_load() -> StoreLoad {
    let mut ctx = Context::new("store_load");
    let func = Func::new(&mut ctx, "f", vec![Ty::Ptr], Ty::Void);
    let entry = Block::new(&mut ctx, func);
    entry.label().set_name(&mut ctx, "entry");
    let ptr = func.param(&ctx, 0);
    ptr.set_name(&mut ctx, "p");

    let one = Inst::iconst(&mut ctx, entry, Ty::int(32), 1);
    let store = Inst::store(&mut ctx, entry, one.value(), ptr);
    let load = Inst::load(&mut ctx, entry, Ty::int(32), ptr);
    load.value().set_name(&mut ctx, "x");
    Inst::ret(&mut ctx, entry, None);

    StoreLoad {
        ctx,
        func,
        entry,
        ptr,
        one,
        store,
        load,
    }
}

/// A global `@g` used by `main` through `[store_a, load_b, store_c]` and by
/// `other` through `load_d`.
pub struct Rebase {
    pub ctx: Context,
    pub g: Value,
    pub main: Func,
    pub other: Func,
    pub store_a: Inst,
    pub load_b: Inst,
    pub store_c: Inst,
    pub load_d: Inst,
}

pub fn rebase_module() -> Rebase {
    let mut ctx = Context::new("rebase");
    let g = Value::global(&mut ctx, "g", Ty::int(32), GlobalInit::Int(0));

    let main = Func::new(&mut ctx, "main", vec![], Ty::Void);
    let entry = Block::new(&mut ctx, main);
    let one = Inst::iconst(&mut ctx, entry, Ty::int(32), 1);
    let store_a = Inst::store(&mut ctx, entry, one.value(), g);
    let load_b = Inst::load(&mut ctx, entry, Ty::int(32), g);
    let two = Inst::iconst(&mut ctx, entry, Ty::int(32), 2);
    let store_c = Inst::store(&mut ctx, entry, two.value(), g);
    Inst::ret(&mut ctx, entry, None);

    let other = Func::new(&mut ctx, "other", vec![], Ty::int(32));
    let entry = Block::new(&mut ctx, other);
    let load_d = Inst::load(&mut ctx, entry, Ty::int(32), g);
    Inst::ret(&mut ctx, entry, None);

    Rebase {
        ctx,
        g,
        main,
        other,
        store_a,
        load_b,
        store_c,
        load_d,
    }
}

pub fn node(value: Value) -> String { format!("Node{}", value.id()) }

pub fn edge(from: Value, to: Value) -> String { format!("{} -> {};", node(from), node(to)) }

/// The text of one `subgraph cluster_<id>` block.
pub fn cluster_section<'a>(dot: &'a str, id: &str) -> &'a str {
    let header = format!("subgraph cluster_{} {{", id);
    let start = dot.find(&header).expect("cluster should be rendered");
    let rest = &dot[start..];
    let end = rest.find("\n    }").expect("cluster should be closed");
    &rest[..end]
}

/// The number of node declarations of `value` in `text`, labeled edges
/// pointing at `value` are not counted.
pub fn count_declarations(text: &str, value: Value) -> usize {
    let decl = format!("{} [label=", node(value));
    text.lines()
        .filter(|line| line.trim_start().starts_with(&decl))
        .count()
}
