//! Redundancy Bridges
//!
//! Links each redundant call to the call it duplicates. Indices refer to
//! waterfall rows (input order), not to layout levels.

use crate::domain::graph::{CallFlag, Graph};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedundancyBridge {
    /// Row of the redundant call
    pub source_index: usize,
    /// Row of the call it duplicates
    pub target_index: usize,
    /// Either endpoint is also flagged as model overkill
    pub is_double_whammy: bool,
}

/// At most one bridge per redundant call. References to unknown ids or to
/// the call itself are dropped, and a pair of calls pointing at each other
/// yields a single bridge (the first one met in row order).
pub fn extract_bridges(graph: &Graph) -> Vec<RedundancyBridge> {
    let mut bridges = Vec::new();
    let mut linked: HashSet<(usize, usize)> = HashSet::new();
    let mut dropped = 0usize;

    for (source_index, call) in graph.calls.iter().enumerate() {
        if !call.has(CallFlag::Redundant) {
            continue;
        }
        let Some(target_id) = call.redundant_with_id.as_deref() else {
            continue;
        };
        let Some(target_index) = graph.position(target_id) else {
            dropped += 1;
            continue;
        };
        if target_index == source_index {
            dropped += 1;
            continue;
        }

        let pair = (
            source_index.min(target_index),
            source_index.max(target_index),
        );
        if !linked.insert(pair) {
            continue;
        }

        let target = &graph.calls[target_index];
        bridges.push(RedundancyBridge {
            source_index,
            target_index,
            is_double_whammy: call.has(CallFlag::Overkill) || target.has(CallFlag::Overkill),
        });
    }

    if dropped > 0 {
        debug!(dropped, "redundancy references without a valid target");
    }
    bridges
}
