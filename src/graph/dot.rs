//! # Graphviz Rendering
//!
//! Serialize a [GraphModel] as a DOT digraph.
//!
//! A flat model is written without any subgraph, a per-scope model gets one
//! `subgraph cluster_*` per cluster. Nodes are named `Node<id>` after the
//! handle of their value and labeled with the text of the value.

use std::fmt::{self, Write};

use tracing::debug;

use super::model::{cluster_name, ClusterModel, Edge, GraphModel, Grouping};
use crate::ir::{Context, Scope, Value};

/// Settings of the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// The name of the digraph.
    pub name: String,
    /// Label edges with their dependency kind.
    pub edge_labels: bool,
    pub global_fill: String,
    pub func_fill: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            name: "Memory Dependency".to_string(),
            edge_labels: true,
            global_fill: "lightgrey".to_string(),
            func_fill: "lightyellow".to_string(),
        }
    }
}

impl RenderOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Default)]
pub struct DotRenderer {
    options: RenderOptions,
}

impl DotRenderer {
    pub fn new(options: RenderOptions) -> Self { Self { options } }

    pub fn options(&self) -> &RenderOptions { &self.options }

    pub fn render(&self, ctx: &Context, model: &GraphModel) -> String {
        let mut buf = String::new();
        self.write_to(ctx, model, &mut buf)
            .expect("writing into a string cannot fail");
        buf
    }

    pub fn write_to<W: Write>(&self, ctx: &Context, model: &GraphModel, out: &mut W) -> fmt::Result {
        let name = escape(&self.options.name);
        writeln!(out, "digraph \"{}\" {{", name)?;

        match model.grouping() {
            Grouping::Flat => {
                let scope = match model.clusters().first() {
                    Some(cluster) => cluster_name(ctx, cluster.scope()),
                    None => ctx.name(),
                };
                writeln!(out, "    label=\"{}: {}\";", name, escape(scope))?;
                writeln!(out, "    node [shape=box];")?;
                for cluster in model.clusters() {
                    self.write_body(ctx, cluster, "    ", out)?;
                }
            }
            Grouping::PerScope => {
                writeln!(out, "    label=\"{}: {}\";", name, escape(ctx.name()))?;
                writeln!(out, "    node [shape=box];")?;
                for cluster in model.clusters() {
                    self.write_cluster(ctx, cluster, out)?;
                }
            }
        }

        writeln!(out, "}}")
    }

    fn write_cluster<W: Write>(&self, ctx: &Context, cluster: &ClusterModel, out: &mut W) -> fmt::Result {
        let (id, fill) = match cluster.scope() {
            Scope::Module => ("global".to_string(), &self.options.global_fill),
            Scope::Func(func) => (format!("f{}", func.id()), &self.options.func_fill),
        };
        debug!(cluster = cluster_name(ctx, cluster.scope()), "rendering cluster");

        writeln!(out, "    subgraph cluster_{} {{", id)?;
        writeln!(out, "        label=\"{}\";", escape(cluster_name(ctx, cluster.scope())))?;
        writeln!(out, "        style=filled;")?;
        writeln!(out, "        fillcolor=\"{}\";", escape(fill))?;
        self.write_body(ctx, cluster, "        ", out)?;
        writeln!(out, "    }}")
    }

    fn write_body<W: Write>(
        &self,
        ctx: &Context,
        cluster: &ClusterModel,
        indent: &str,
        out: &mut W,
    ) -> fmt::Result {
        for node in cluster.nodes() {
            write!(out, "{}{} [label=\"{}\"", indent, node_name(*node), node_label(ctx, *node))?;
            if cluster.is_dashed(*node) {
                write!(out, ", style=dashed")?;
            }
            writeln!(out, "];")?;
        }
        for edge in cluster.edges() {
            self.write_edge(edge, indent, out)?;
        }
        Ok(())
    }

    fn write_edge<W: Write>(&self, edge: &Edge, indent: &str, out: &mut W) -> fmt::Result {
        write!(out, "{}{} -> {}", indent, node_name(edge.from), node_name(edge.to))?;
        match edge.label {
            Some(kind) if self.options.edge_labels => writeln!(out, " [label=\"{}\"];", kind),
            Some(_) | None => writeln!(out, ";"),
        }
    }
}

pub fn node_name(value: Value) -> String { format!("Node{}", value.id()) }

fn node_label(ctx: &Context, value: Value) -> String { escape(&value.display(ctx).to_string()) }

/// Escape a string for a quoted DOT id.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
