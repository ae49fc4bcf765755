mod graph;

pub use graph::GraphModel;
