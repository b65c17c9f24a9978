pub mod dependency;
pub mod printer;
pub mod use_graph;
