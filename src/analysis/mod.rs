//! Whole-graph analyses that sit on top of the type graph.
pub mod topology;
