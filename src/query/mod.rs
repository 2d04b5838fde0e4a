// Read-side graph queries

pub mod engine;

pub use engine::{GraphEdge, GraphNode, QueryEngine, RepositoryGraph};
