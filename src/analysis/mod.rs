//! Whole-graph analyses that do not touch quantity values.
pub mod stats;
pub mod topology;
