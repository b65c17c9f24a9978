//! The graph shared by the dependency collector and the use graph builder.
//!
//! A [GraphModel] is a list of clusters, each holding the nodes declared in it
//! and the edges drawn from it. Nodes are values, keyed by handle. The model
//! is built once and only read by the renderer.

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::ir::{
    passes::{
        dependency::{DepKind, DepMap},
        use_graph::UseGraph,
    },
    Context,
    Func,
    Scope,
    Value,
};

/// How the nodes are partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// One implicit cluster, the function-local graph.
    Flat,
    /// A `global` cluster followed by one cluster per function.
    PerScope,
}

/// An edge from a dependent to the value it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: Value,
    pub to: Value,
    pub label: Option<DepKind>,
}

impl Edge {
    pub fn new(from: Value, to: Value, label: Option<DepKind>) -> Self { Self { from, to, label } }
}

/// The cluster a value belongs to.
pub fn scope_of(ctx: &Context, value: Value) -> Scope { value.scope(ctx) }

pub struct ClusterModel {
    scope: Scope,
    /// Declared nodes in declaration order.
    nodes: Vec<Value>,
    declared: FxHashSet<Value>,
    /// Nodes with a dependency that cannot be drawn as an edge.
    dashed: FxHashSet<Value>,
    edges: Vec<Edge>,
}

impl ClusterModel {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            nodes: Vec::new(),
            declared: FxHashSet::default(),
            dashed: FxHashSet::default(),
            edges: Vec::new(),
        }
    }

    pub fn scope(&self) -> Scope { self.scope }

    /// The function of the cluster, `None` for the global cluster.
    pub fn func(&self) -> Option<Func> { self.scope.func() }

    /// Declare a node, returns `true` if it was already declared.
    pub fn declare(&mut self, value: Value) -> bool {
        if !self.declared.insert(value) {
            return true;
        }
        self.nodes.push(value);
        false
    }

    pub fn is_declared(&self, value: Value) -> bool { self.declared.contains(&value) }

    /// Whether `value` lives in this cluster.
    pub fn owns(&self, ctx: &Context, value: Value) -> bool { scope_of(ctx, value) == self.scope }

    pub fn add_edge(&mut self, edge: Edge) { self.edges.push(edge); }

    pub fn mark_dashed(&mut self, value: Value) { self.dashed.insert(value); }

    pub fn is_dashed(&self, value: Value) -> bool { self.dashed.contains(&value) }

    pub fn nodes(&self) -> &[Value] { &self.nodes }

    pub fn edges(&self) -> &[Edge] { &self.edges }

    /// Drain the dependents of every key with root-rebasing.
    ///
    /// The root of a key starts as the key itself. A store in this cluster
    /// is drawn against the key and becomes the new root, any other dependent
    /// in this cluster is drawn against the current root. Dependents in other
    /// clusters are skipped.
    fn add_use_edges(&mut self, ctx: &Context, graph: &UseGraph) {
        for (key, stack) in graph.iter() {
            let mut root = key;
            for dependent in stack.iter_lifo() {
                if !self.owns(ctx, dependent) {
                    continue;
                }
                let is_store = dependent
                    .as_inst(ctx)
                    .map_or(false, |inst| inst.is_store(ctx));
                if is_store {
                    self.add_edge(Edge::new(dependent, key, None));
                    root = dependent;
                } else {
                    self.add_edge(Edge::new(dependent, root, None));
                }
            }
        }
    }

    /// Declare and draw the memory dependencies of the instructions in
    /// `func`.
    fn add_dep_edges(&mut self, ctx: &Context, func: Func, deps: &DepMap, filter: bool) {
        for (inst, set) in deps.iter() {
            if inst.parent_func(ctx) != func {
                continue;
            }
            let dependent = inst.value();
            self.declare(dependent);
            for record in set {
                trace!(dependent = inst.id(), kind = %record.kind, "dependency edge");
                match record.source {
                    Some(source) => {
                        let source = source.value();
                        if !filter || self.owns(ctx, source) {
                            self.declare(source);
                        }
                        self.add_edge(Edge::new(dependent, source, Some(record.kind)));
                    }
                    None => self.mark_dashed(dependent),
                }
            }
        }
    }
}

pub struct GraphModel {
    grouping: Grouping,
    clusters: Vec<ClusterModel>,
}

impl GraphModel {
    pub fn new(grouping: Grouping) -> Self {
        Self {
            grouping,
            clusters: Vec::new(),
        }
    }

    /// The function-local graph of the memory dependencies in `func`.
    ///
    /// Entries of `deps` from other functions are ignored.
    pub fn from_dependencies(ctx: &Context, func: Func, deps: &DepMap) -> Self {
        let mut cluster = ClusterModel::new(Scope::Func(func));
        cluster.add_dep_edges(ctx, func, deps, false);
        debug!(
            func = func.name(ctx),
            nodes = cluster.nodes().len(),
            edges = cluster.edges().len(),
            "function-local graph built"
        );

        let mut model = Self::new(Grouping::Flat);
        model.clusters.push(cluster);
        model
    }

    /// The module-wide graph of the use graph, clustered by scope.
    ///
    /// If `deps` is given, the memory dependencies are also drawn in the
    /// cluster of their function, labeled with the dependency kind.
    pub fn from_use_graph(ctx: &Context, graph: &UseGraph, deps: Option<&DepMap>) -> Self {
        let known = known_nodes(graph);

        let scopes =
            std::iter::once(Scope::Module).chain(ctx.defined_funcs().map(Scope::Func));

        let mut model = Self::new(Grouping::PerScope);
        for scope in scopes {
            let mut cluster = ClusterModel::new(scope);
            for value in known.iter() {
                if cluster.owns(ctx, *value) {
                    cluster.declare(*value);
                }
            }

            cluster.add_use_edges(ctx, graph);

            if let (Some(deps), Some(func)) = (deps, scope.func()) {
                cluster.add_dep_edges(ctx, func, deps, true);
            }

            debug!(
                cluster = cluster_name(ctx, scope),
                nodes = cluster.nodes().len(),
                edges = cluster.edges().len(),
                "cluster built"
            );
            model.clusters.push(cluster);
        }
        model
    }

    pub fn grouping(&self) -> Grouping { self.grouping }

    pub fn clusters(&self) -> &[ClusterModel] { &self.clusters }

    pub fn cluster(&self, scope: Scope) -> Option<&ClusterModel> {
        self.clusters.iter().find(|cluster| cluster.scope == scope)
    }
}

/// The name of the cluster of `scope`.
pub fn cluster_name(ctx: &Context, scope: Scope) -> &str {
    match scope {
        Scope::Module => "global",
        Scope::Func(func) => func.name(ctx),
    }
}

/// The keys and the dependents of the use graph, in first-seen order.
fn known_nodes(graph: &UseGraph) -> Vec<Value> {
    let mut seen = FxHashSet::default();
    let mut nodes = Vec::new();
    for (key, stack) in graph.iter() {
        for value in std::iter::once(key).chain(stack.iter_lifo()) {
            if seen.insert(value) {
                nodes.push(value);
            }
        }
    }
    nodes
}
