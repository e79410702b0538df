// Domain model and pure derivation algorithms for Kaizen Graph.

pub mod bridges;
pub mod graph;
pub mod insights;
pub mod layering;
pub mod metrics;
pub mod normalize;
pub mod waterfall;
