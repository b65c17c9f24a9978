//! # Dependency Graph Printers
//!
//! Passes rendering the dependency graphs as DOT text.

use super::{dependency, use_graph};
use crate::{
    graph::{DotRenderer, GraphModel, RenderOptions},
    ir::{
        memdep::MemDepOracle,
        passman::{GlobalPass, LocalPass, ParamStorage, PassManager, PassResult},
        Context,
        Func,
        Scope,
    },
};

pub const MEMDEP_GRAPH: &str = "memdep-graph";
pub const USE_GRAPH_DOT: &str = "use-graph-dot";

pub const MEMDEP_GRAPH_NAME: &str = "memdep-graph-name";
pub const USE_GRAPH_NAME: &str = "use-graph-name";
pub const DOT_EDGE_LABELS: &str = "dot-edge-labels";
pub const DOT_GLOBAL_FILL: &str = "dot-global-fill";
pub const DOT_FUNC_FILL: &str = "dot-func-fill";

fn register_render_params(passman: &mut PassManager) {
    let defaults = RenderOptions::default();
    passman.add_parameter(DOT_EDGE_LABELS, defaults.edge_labels);
    passman.add_parameter(DOT_GLOBAL_FILL, defaults.global_fill);
    passman.add_parameter(DOT_FUNC_FILL, defaults.func_fill);
}

fn fetch_render_params(options: &mut RenderOptions, params: &ParamStorage) {
    if let Some(edge_labels) = params.get(DOT_EDGE_LABELS) {
        options.edge_labels = edge_labels;
    }
    if let Some(fill) = params.get(DOT_GLOBAL_FILL) {
        options.global_fill = fill;
    }
    if let Some(fill) = params.get(DOT_FUNC_FILL) {
        options.func_fill = fill;
    }
}

/// Render the memory dependencies of one function.
pub struct MemDepGraph<'o> {
    oracle: &'o dyn MemDepOracle,
    options: RenderOptions,
}

impl<'o> MemDepGraph<'o> {
    pub fn new(oracle: &'o dyn MemDepOracle) -> Self {
        Self {
            oracle,
            options: RenderOptions::default(),
        }
    }

    pub fn options(&self) -> &RenderOptions { &self.options }

    pub fn register(passman: &mut PassManager) {
        passman.add_parameter(MEMDEP_GRAPH_NAME, RenderOptions::default().name);
        register_render_params(passman);
    }
}

impl LocalPass for MemDepGraph<'_> {
    type Output = String;

    fn run(&mut self, ctx: &Context, func: Func) -> PassResult<Self::Output> {
        let deps = dependency::collect(ctx, Scope::Func(func), self.oracle)?;
        let model = GraphModel::from_dependencies(ctx, func, &deps);
        let renderer = DotRenderer::new(self.options.clone());
        Ok(renderer.render(ctx, &model))
    }

    fn fetch_params(&mut self, params: &ParamStorage) {
        if let Some(name) = params.get(MEMDEP_GRAPH_NAME) {
            self.options.name = name;
        }
        fetch_render_params(&mut self.options, params);
    }
}

/// Render the use graph of the whole module, optionally with the memory
/// dependencies of every function.
pub struct UseGraphDot<'o> {
    oracle: Option<&'o dyn MemDepOracle>,
    options: RenderOptions,
}

impl<'o> UseGraphDot<'o> {
    pub fn new() -> Self {
        Self {
            oracle: None,
            options: RenderOptions::default().with_name("Use Graph"),
        }
    }

    /// Also draw the memory dependencies answered by `oracle`.
    pub fn with_oracle(oracle: &'o dyn MemDepOracle) -> Self {
        Self {
            oracle: Some(oracle),
            ..Self::new()
        }
    }

    pub fn options(&self) -> &RenderOptions { &self.options }

    pub fn register(passman: &mut PassManager) {
        passman.add_parameter(USE_GRAPH_NAME, "Use Graph");
        register_render_params(passman);
    }
}

impl Default for UseGraphDot<'_> {
    fn default() -> Self { Self::new() }
}

impl GlobalPass for UseGraphDot<'_> {
    type Output = String;

    fn run(&mut self, ctx: &Context) -> PassResult<Self::Output> {
        let graph = use_graph::build(ctx);
        let deps = match self.oracle {
            Some(oracle) => Some(dependency::collect(ctx, Scope::Module, oracle)?),
            None => None,
        };
        let model = GraphModel::from_use_graph(ctx, &graph, deps.as_ref());
        let renderer = DotRenderer::new(self.options.clone());
        Ok(renderer.render(ctx, &model))
    }

    fn fetch_params(&mut self, params: &ParamStorage) {
        if let Some(name) = params.get(USE_GRAPH_NAME) {
            self.options.name = name;
        }
        fetch_render_params(&mut self.options, params);
    }
}
