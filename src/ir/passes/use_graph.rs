//! # Use Graph
//!
//! A module-wide def-use graph. Each value that has users is mapped to the
//! stack of values using it, independent of whether the users touch memory.
//!
//! The graph may be cyclic, e.g., a phi using a value computed from itself on
//! a back edge, so all the transitive walks here keep a visited set.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ir::{Context, Value};

pub const USE_GRAPH: &str = "use-graph";

/// The users of a value, in push order.
///
/// Pushing a user that is already on the stack does nothing. Consumers that
/// drain the stack must use the pop order, i.e., [iter_lifo](Self::iter_lifo)
/// or [pop](Self::pop), the last pushed user comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependentStack {
    users: Vec<Value>,
}

impl DependentStack {
    /// Push a user, returns `false` if it is already on the stack.
    pub fn push(&mut self, user: Value) -> bool {
        if self.users.contains(&user) {
            return false;
        }
        self.users.push(user);
        true
    }

    pub fn pop(&mut self) -> Option<Value> { self.users.pop() }

    pub fn top(&self) -> Option<Value> { self.users.last().copied() }

    pub fn contains(&self, user: Value) -> bool { self.users.contains(&user) }

    pub fn len(&self) -> usize { self.users.len() }

    pub fn is_empty(&self) -> bool { self.users.is_empty() }

    /// The users in pop order.
    pub fn iter_lifo(&self) -> impl Iterator<Item = Value> + '_ {
        self.users.iter().rev().copied()
    }

    /// The users in push order.
    pub fn as_slice(&self) -> &[Value] { &self.users }
}

#[derive(Debug, Clone, Default)]
pub struct UseGraph {
    stacks: FxHashMap<Value, DependentStack>,
    /// Keys in the order they were first inserted.
    keys: Vec<Value>,
}

impl UseGraph {
    pub fn new() -> Self { Self::default() }

    /// Record that `user` uses `value`.
    ///
    /// Returns `false` if the user was already recorded.
    pub fn push(&mut self, value: Value, user: Value) -> bool {
        let stack = self.stacks.entry(value).or_insert_with(|| {
            self.keys.push(value);
            DependentStack::default()
        });
        stack.push(user)
    }

    pub fn get(&self, value: Value) -> Option<&DependentStack> { self.stacks.get(&value) }

    pub fn contains(&self, value: Value) -> bool { self.stacks.contains_key(&value) }

    pub fn keys(&self) -> &[Value] { &self.keys }

    pub fn len(&self) -> usize { self.keys.len() }

    pub fn is_empty(&self) -> bool { self.keys.is_empty() }

    /// Iterate in key insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (Value, &DependentStack)> {
        self.keys.iter().map(move |key| (*key, &self.stacks[key]))
    }

    /// All the values reachable from `value` through users, in discovery
    /// order, excluding `value` itself.
    pub fn transitive_dependents(&self, value: Value) -> Vec<Value> {
        let mut visited = FxHashSet::default();
        visited.insert(value);
        let mut found = Vec::new();
        self.walk(value, &mut visited, &mut found);
        found
    }

    fn walk(&self, start: Value, visited: &mut FxHashSet<Value>, found: &mut Vec<Value>) {
        let mut worklist = vec![start];
        while let Some(value) = worklist.pop() {
            let stack = match self.stacks.get(&value) {
                Some(stack) => stack,
                None => continue,
            };
            // reversed so that the first pushed user is visited first
            for user in stack.iter_lifo() {
                if visited.insert(user) {
                    found.push(user);
                    worklist.push(user);
                }
            }
        }
    }

    /// A copy of the graph keeping only the keys reachable from `roots`,
    /// including the roots themselves.
    pub fn restrict_to(&self, roots: &[Value]) -> UseGraph {
        let mut visited = FxHashSet::default();
        for root in roots {
            if visited.insert(*root) {
                let mut found = Vec::new();
                self.walk(*root, &mut visited, &mut found);
            }
        }

        let mut restricted = UseGraph::new();
        for (key, stack) in self.iter() {
            if visited.contains(&key) {
                restricted.keys.push(key);
                restricted.stacks.insert(key, stack.clone());
            }
        }
        restricted
    }
}

/// Build the use graph of the whole module.
///
/// The values are visited in this order:
///
/// 1. the global variables,
/// 2. the loads of every function,
/// 3. the named values of every function except block labels.
pub fn build(ctx: &Context) -> UseGraph {
    let mut graph = UseGraph::new();

    for global in ctx.globals() {
        push_users(ctx, &mut graph, *global);
    }

    for func in ctx.funcs() {
        for inst in func.insts(ctx) {
            if inst.is_load(ctx) {
                push_users(ctx, &mut graph, inst.value());
            }
        }

        for value in func.symbols(ctx) {
            if value.is_label(ctx) {
                continue;
            }
            push_users(ctx, &mut graph, *value);
        }
    }

    debug!(keys = graph.len(), "use graph built");
    graph
}

fn push_users(ctx: &Context, graph: &mut UseGraph, value: Value) {
    for user in value.users(ctx) {
        graph.push(value, *user);
    }
}
