//! Dependency graphs and their rendering.

pub mod dot;
pub mod model;

pub use dot::{DotRenderer, RenderOptions};
pub use model::{scope_of, ClusterModel, Edge, GraphModel, Grouping};
