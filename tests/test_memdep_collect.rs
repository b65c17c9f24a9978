mod common;

use common::{store_load, PanicOracle};
use orzdep::ir::{
    memdep::{MemDepResult, NonLocalDepResult, PrecomputedMemDep},
    passes::dependency::{collect, collect_par, CollectError, DepKind, DepRecord},
    AccessMode,
    AtomicOrdering,
    Block,
    Context,
    Func,
    GlobalInit,
    Inst,
    MemEffects,
    Scope,
    Ty,
    Value,
};

#[test]
fn test_local_dependency() {
    let fixture = store_load();
    let ctx = &fixture.ctx;

    let mut oracle = PrecomputedMemDep::new();
    oracle.set_dependency(fixture.load, MemDepResult::Def(fixture.store));

    let deps = collect(ctx, Scope::Func(fixture.func), &oracle).unwrap();

    // iconst and ret do not touch memory
    assert_eq!(deps.len(), 2);
    assert!(!deps.contains(fixture.one));

    let store = deps.get(fixture.store).unwrap();
    assert_eq!(
        store.as_slice(),
        &[DepRecord {
            dependent: fixture.store,
            source: None,
            kind: DepKind::Unknown,
            block: None,
        }]
    );

    let load = deps.get(fixture.load).unwrap();
    assert_eq!(
        load.as_slice(),
        &[DepRecord {
            dependent: fixture.load,
            source: Some(fixture.store),
            kind: DepKind::Def,
            block: None,
        }]
    );

    let order: Vec<Inst> = deps.iter().map(|(inst, _)| inst).collect();
    assert_eq!(order, vec![fixture.store, fixture.load]);
}

#[test]
fn test_local_kinds() {
    let fixture = store_load();
    let ctx = &fixture.ctx;

    let mut oracle = PrecomputedMemDep::new();
    oracle
        .set_dependency(fixture.store, MemDepResult::NonFuncLocal)
        .set_dependency(fixture.load, MemDepResult::Clobber(fixture.store));

    let deps = collect(ctx, Scope::Func(fixture.func), &oracle).unwrap();

    let store = deps.get(fixture.store).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.as_slice()[0].kind, DepKind::NonFuncLocal);
    assert_eq!(store.as_slice()[0].source, None);

    let load = deps.get(fixture.load).unwrap();
    assert_eq!(load.as_slice()[0].kind, DepKind::Clobber);
    assert_eq!(load.as_slice()[0].source, Some(fixture.store));
}

/// `f` with two blocks, the second loads `%p` after a call.
struct TwoBlocks {
    ctx: Context,
    func: Func,
    entry: Block,
    exit: Block,
    ptr: Value,
    store: Inst,
    call: Inst,
    load: Inst,
}

fn two_blocks() -> TwoBlocks {
    let mut ctx = Context::default();
    let callee = Func::new(&mut ctx, "opaque", vec![], Ty::Void);
    let func = Func::new(&mut ctx, "f", vec![Ty::Ptr], Ty::int(32));
    let ptr = func.param(&ctx, 0);
    let entry = Block::new(&mut ctx, func);
    let exit = Block::new(&mut ctx, func);

    let zero = Inst::iconst(&mut ctx, entry, Ty::int(32), 0);
    let store = Inst::store(&mut ctx, entry, zero.value(), ptr);
    Inst::jump(&mut ctx, entry, exit);

    let call = Inst::call(&mut ctx, exit, callee, vec![]);
    let load = Inst::load(&mut ctx, exit, Ty::int(32), ptr);
    Inst::ret(&mut ctx, exit, Some(load.value()));

    TwoBlocks {
        ctx,
        func,
        entry,
        exit,
        ptr,
        store,
        call,
        load,
    }
}

#[test]
fn test_non_local_fan_out() {
    let fixture = two_blocks();
    let ctx = &fixture.ctx;

    let mut oracle = PrecomputedMemDep::new();
    oracle
        .set_dependency(fixture.call, MemDepResult::NonLocal)
        .set_call_dependency(
            fixture.call,
            vec![
                NonLocalDepResult::new(MemDepResult::Clobber(fixture.store), fixture.entry),
                NonLocalDepResult::new(MemDepResult::Unknown, fixture.entry),
                // repeated answers are not recorded twice
                NonLocalDepResult::new(MemDepResult::Clobber(fixture.store), fixture.entry),
            ],
        )
        .set_dependency(fixture.load, MemDepResult::NonLocal)
        .set_pointer_dependency(
            fixture.ptr,
            true,
            fixture.exit,
            vec![NonLocalDepResult::new(
                MemDepResult::Def(fixture.store),
                fixture.entry,
            )],
        );

    let deps = collect(ctx, Scope::Func(fixture.func), &oracle).unwrap();

    let call = deps.get(fixture.call).unwrap();
    assert_eq!(
        call.as_slice(),
        &[
            DepRecord {
                dependent: fixture.call,
                source: Some(fixture.store),
                kind: DepKind::NonFuncLocal,
                block: Some(fixture.entry),
            },
            DepRecord {
                dependent: fixture.call,
                source: None,
                kind: DepKind::NonFuncLocal,
                block: Some(fixture.entry),
            },
        ]
    );

    let load = deps.get(fixture.load).unwrap();
    assert_eq!(
        load.as_slice(),
        &[DepRecord {
            dependent: fixture.load,
            source: Some(fixture.store),
            kind: DepKind::NonFuncLocal,
            block: Some(fixture.entry),
        }]
    );
}

#[test]
fn test_non_local_store_is_not_a_read() {
    let fixture = two_blocks();
    let ctx = &fixture.ctx;

    let mut oracle = PrecomputedMemDep::new();
    oracle
        .set_dependency(fixture.store, MemDepResult::NonLocal)
        // answers for a read query must not be used for the store
        .set_pointer_dependency(
            fixture.ptr,
            true,
            fixture.entry,
            vec![NonLocalDepResult::new(
                MemDepResult::Def(fixture.load),
                fixture.exit,
            )],
        );

    let deps = collect(ctx, Scope::Func(fixture.func), &oracle).unwrap();
    let store = deps.get(fixture.store).unwrap();

    // nothing was found, so the entry is a single unknown record
    assert_eq!(
        store.as_slice(),
        &[DepRecord {
            dependent: fixture.store,
            source: None,
            kind: DepKind::Unknown,
            block: None,
        }]
    );
}

#[test]
fn test_va_arg() {
    let mut ctx = Context::default();
    let func = Func::new(&mut ctx, "vararg", vec![Ty::Ptr], Ty::int(32));
    let list = func.param(&ctx, 0);
    let entry = Block::new(&mut ctx, func);
    let arg = Inst::va_arg(&mut ctx, entry, Ty::int(32), list);
    Inst::ret(&mut ctx, entry, Some(arg.value()));

    let mut oracle = PrecomputedMemDep::new();
    oracle
        .set_dependency(arg, MemDepResult::NonLocal)
        .set_pointer_dependency(
            list,
            false,
            entry,
            vec![NonLocalDepResult::new(MemDepResult::NonFuncLocal, entry)],
        );

    let deps = collect(&ctx, Scope::Func(func), &oracle).unwrap();
    let set = deps.get(arg).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.as_slice()[0].kind, DepKind::NonFuncLocal);
    assert_eq!(set.as_slice()[0].block, Some(entry));
}

#[test]
fn test_atomic_and_volatile_are_not_queried() {
    let mut ctx = Context::default();
    let func = Func::new(&mut ctx, "f", vec![Ty::Ptr], Ty::Void);
    let ptr = func.param(&ctx, 0);
    let entry = Block::new(&mut ctx, func);
    let load = Inst::load_with(
        &mut ctx,
        entry,
        Ty::int(32),
        ptr,
        AccessMode::atomic(AtomicOrdering::SeqCst),
    );
    let store = Inst::store_with(&mut ctx, entry, load.value(), ptr, AccessMode::volatile());
    Inst::ret(&mut ctx, entry, None);

    let deps = collect(&ctx, Scope::Func(func), &PanicOracle).unwrap();

    for inst in [load, store] {
        let set = deps.get(inst).unwrap();
        assert_eq!(
            set.as_slice(),
            &[DepRecord {
                dependent: inst,
                source: None,
                kind: DepKind::Unknown,
                block: None,
            }]
        );
    }
}

#[test]
fn test_unordered_atomic_is_analyzed() {
    let mut ctx = Context::default();
    let func = Func::new(&mut ctx, "f", vec![Ty::Ptr], Ty::int(32));
    let ptr = func.param(&ctx, 0);
    let entry = Block::new(&mut ctx, func);
    let load = Inst::load_with(
        &mut ctx,
        entry,
        Ty::int(32),
        ptr,
        AccessMode::atomic(AtomicOrdering::Unordered),
    );
    Inst::ret(&mut ctx, entry, Some(load.value()));

    let mut oracle = PrecomputedMemDep::new();
    oracle.set_dependency(load, MemDepResult::NonFuncLocal);

    let deps = collect(&ctx, Scope::Func(func), &oracle).unwrap();
    assert_eq!(deps.get(load).unwrap().as_slice()[0].kind, DepKind::NonFuncLocal);
}

#[test]
fn test_unknown_memory_inst_is_fatal() {
    let mut ctx = Context::default();
    let func = Func::new(&mut ctx, "f", vec![Ty::Ptr], Ty::Void);
    let ptr = func.param(&ctx, 0);
    let entry = Block::new(&mut ctx, func);
    Inst::opaque(&mut ctx, entry, "fence", Ty::Void, vec![], MemEffects::NONE);
    Inst::opaque(
        &mut ctx,
        entry,
        "memset",
        Ty::Void,
        vec![ptr],
        MemEffects::WRITE,
    );
    Inst::ret(&mut ctx, entry, None);

    let err = collect(&ctx, Scope::Func(func), &PrecomputedMemDep::new()).unwrap_err();
    match err {
        CollectError::UnknownMemoryInst { opcode, inst } => {
            assert_eq!(opcode, "memset");
            assert!(inst.contains("memset"));
        }
    }
}

#[test]
fn test_pure_call_is_skipped() {
    let mut ctx = Context::default();
    let pure = Func::new(&mut ctx, "pure", vec![Ty::int(32)], Ty::int(32));
    pure.set_effects(&mut ctx, MemEffects::NONE);
    let reader = Func::new(&mut ctx, "reader", vec![], Ty::int(32));
    reader.set_effects(&mut ctx, MemEffects::READ);

    let func = Func::new(&mut ctx, "f", vec![Ty::int(32)], Ty::int(32));
    let arg = func.param(&ctx, 0);
    let entry = Block::new(&mut ctx, func);
    let pure_call = Inst::call(&mut ctx, entry, pure, vec![arg]);
    let read_call = Inst::call(&mut ctx, entry, reader, vec![]);
    Inst::ret(&mut ctx, entry, Some(pure_call.value()));

    let deps = collect(&ctx, Scope::Func(func), &PrecomputedMemDep::new()).unwrap();
    assert!(!deps.contains(pure_call));
    assert!(deps.contains(read_call));
    assert_eq!(deps.len(), 1);
}

fn module_with_three_funcs() -> (Context, Vec<Inst>) {
    let mut ctx = Context::new("three");
    let g = Value::global(&mut ctx, "g", Ty::int(32), GlobalInit::Zero);
    Func::new(&mut ctx, "declared", vec![], Ty::Void);

    let mut loads = Vec::new();
    for name in ["a", "b", "c"] {
        let func = Func::new(&mut ctx, name, vec![], Ty::int(32));
        let entry = Block::new(&mut ctx, func);
        let load = Inst::load(&mut ctx, entry, Ty::int(32), g);
        let store = Inst::store(&mut ctx, entry, load.value(), g);
        Inst::ret(&mut ctx, entry, Some(load.value()));
        loads.push(load);
        loads.push(store);
    }
    (ctx, loads)
}

#[test]
fn test_module_scope_coverage() {
    let (ctx, insts) = module_with_three_funcs();
    let deps = collect(&ctx, Scope::Module, &PrecomputedMemDep::new()).unwrap();

    let order: Vec<Inst> = deps.iter().map(|(inst, _)| inst).collect();
    assert_eq!(order, insts);
    for (_, set) in deps.iter() {
        assert!(!set.is_empty());
    }
}

#[test]
fn test_parallel_collect() {
    let (ctx, insts) = module_with_three_funcs();

    let mut oracle = PrecomputedMemDep::new();
    for pair in insts.chunks(2) {
        oracle.set_dependency(pair[1], MemDepResult::Clobber(pair[0]));
    }

    let sequential = collect(&ctx, Scope::Module, &oracle).unwrap();
    let parallel = collect_par(&ctx, &oracle).unwrap();

    let sequential: Vec<_> = sequential.iter().map(|(i, s)| (i, s.clone())).collect();
    let parallel: Vec<_> = parallel.iter().map(|(i, s)| (i, s.clone())).collect();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_parallel_collect_is_fatal() {
    let (mut ctx, _) = module_with_three_funcs();
    let func = Func::new(&mut ctx, "bad", vec![], Ty::Void);
    let entry = Block::new(&mut ctx, func);
    Inst::opaque(
        &mut ctx,
        entry,
        "cmpxchg",
        Ty::Void,
        vec![],
        MemEffects::READ_WRITE,
    );

    let result = collect_par(&ctx, &PrecomputedMemDep::new());
    assert!(matches!(
        result,
        Err(CollectError::UnknownMemoryInst { .. })
    ));
}
