//! Human-readable views of the graph.
pub mod dot;
pub mod trace;
