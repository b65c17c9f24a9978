mod common;

use common::{rebase_module, store_load};
use orzdep::ir::{
    passes::use_graph::{build, UseGraph},
    Block,
    Context,
    Func,
    GlobalInit,
    Inst,
    Ty,
    Value,
};

#[test]
fn test_global_users() {
    let fixture = rebase_module();
    let graph = build(&fixture.ctx);

    let stack = graph.get(fixture.g).unwrap();
    assert_eq!(
        stack.as_slice(),
        &[
            fixture.store_a.value(),
            fixture.load_b.value(),
            fixture.store_c.value(),
            fixture.load_d.value(),
        ]
    );
    assert_eq!(
        stack.iter_lifo().collect::<Vec<_>>(),
        vec![
            fixture.load_d.value(),
            fixture.store_c.value(),
            fixture.load_b.value(),
            fixture.store_a.value(),
        ]
    );

    // the loads have no users, the constants are not named
    assert_eq!(graph.keys(), &[fixture.g]);
}

#[test]
fn test_walk_order() {
    let fixture = store_load();
    let graph = build(&fixture.ctx);

    // `%entry` is a label and `%x` has no users
    assert_eq!(graph.keys(), &[fixture.ptr]);
    assert!(!graph.contains(fixture.entry.label()));
    assert_eq!(
        graph.get(fixture.ptr).unwrap().as_slice(),
        &[fixture.store.value(), fixture.load.value()]
    );
}

#[test]
fn test_globals_and_loads_come_first() {
    let mut ctx = Context::new("order");
    let g = Value::global(&mut ctx, "g", Ty::Ptr, GlobalInit::Zero);
    let h = Value::global(&mut ctx, "h", Ty::Ptr, GlobalInit::Ref(g));

    let func = Func::new(&mut ctx, "f", vec![Ty::int(32)], Ty::int(32));
    let arg = func.param(&ctx, 0);
    arg.set_name(&mut ctx, "a");
    let entry = Block::new(&mut ctx, func);
    let exit = Block::new(&mut ctx, func);
    exit.label().set_name(&mut ctx, "exit");

    let sum = Inst::binary(&mut ctx, entry, orzdep::ir::BinaryOp::Add, arg, arg);
    let ptr = Inst::load(&mut ctx, entry, Ty::Ptr, h);
    let val = Inst::load(&mut ctx, entry, Ty::int(32), ptr.value());
    Inst::store(&mut ctx, entry, sum.value(), ptr.value());
    Inst::jump(&mut ctx, entry, exit);
    Inst::ret(&mut ctx, exit, Some(val.value()));

    let graph = build(&ctx);

    // globals, then loads in program order, then named values
    assert_eq!(
        graph.keys(),
        &[g, h, ptr.value(), val.value(), arg]
    );
    // a global initialized with another global is its user
    assert_eq!(graph.get(g).unwrap().as_slice(), &[h]);
    // the label `%exit` is used by the jump but never a key
    assert!(!graph.contains(exit.label()));
}

#[test]
fn test_pushing_twice_is_a_no_op() {
    let fixture = store_load();
    let mut graph = UseGraph::new();
    assert!(graph.push(fixture.ptr, fixture.load.value()));
    assert!(!graph.push(fixture.ptr, fixture.load.value()));
    assert_eq!(graph.get(fixture.ptr).unwrap().len(), 1);
}

/// A loop header where `%i` flows into `%next` and on into the phi `%i2`.
fn counting_loop() -> (Context, Value, Value, Value) {
    let mut ctx = Context::new("loop");
    let func = Func::new(&mut ctx, "count", vec![Ty::int(32)], Ty::Void);
    let n = func.param(&ctx, 0);
    n.set_name(&mut ctx, "n");
    let entry = Block::new(&mut ctx, func);
    let header = Block::new(&mut ctx, func);
    let exit = Block::new(&mut ctx, func);

    let zero = Inst::iconst(&mut ctx, entry, Ty::int(32), 0);
    Inst::jump(&mut ctx, entry, header);

    let one = Inst::iconst(&mut ctx, header, Ty::int(32), 1);
    let i = Inst::phi(
        &mut ctx,
        header,
        Ty::int(32),
        vec![(zero.value(), entry)],
    );
    i.value().set_name(&mut ctx, "i");
    let next = Inst::binary(
        &mut ctx,
        header,
        orzdep::ir::BinaryOp::Add,
        i.value(),
        one.value(),
    );
    next.value().set_name(&mut ctx, "next");
    // the phi of the next iteration uses `%next`
    let i2 = Inst::phi(
        &mut ctx,
        header,
        Ty::int(32),
        vec![(next.value(), header)],
    );
    i2.value().set_name(&mut ctx, "i2");
    let again = Inst::binary(
        &mut ctx,
        header,
        orzdep::ir::BinaryOp::Add,
        i2.value(),
        n,
    );
    again.value().set_name(&mut ctx, "again");
    Inst::br(&mut ctx, header, again.value(), header, exit);
    Inst::ret(&mut ctx, exit, None);

    (ctx, i.value(), next.value(), n)
}

#[test]
fn test_transitive_dependents_on_cycle() {
    let (ctx, i, next, _) = counting_loop();
    let mut graph = build(&ctx);

    // a back edge from `%next` to `%i`
    graph.push(next, i);

    let found = graph.transitive_dependents(i);
    assert!(found.contains(&next));
    assert!(!found.contains(&i));

    let from_next = graph.transitive_dependents(next);
    assert!(from_next.contains(&i));
    assert!(!from_next.contains(&next));
}

#[test]
fn test_restrict_to() {
    let (ctx, i, next, n) = counting_loop();
    let mut graph = build(&ctx);
    graph.push(next, i);

    let restricted = graph.restrict_to(&[n]);
    assert!(restricted.contains(n));
    assert!(!restricted.contains(i));
    assert!(!restricted.contains(next));

    let restricted = graph.restrict_to(&[i]);
    assert!(restricted.contains(i));
    assert!(restricted.contains(next));
    assert!(!restricted.contains(n));

    // keys keep their order in `graph`
    let order: Vec<Value> = graph
        .keys()
        .iter()
        .copied()
        .filter(|key| restricted.contains(*key))
        .collect();
    assert_eq!(restricted.keys(), order.as_slice());
}
