//! Graph Insights
//!
//! Structural analysis that actually walks the edges, reported alongside the
//! flag-based [`Metrics`](crate::domain::metrics::Metrics) rather than in
//! place of it:
//! - dead branches by backwards reachability from the workflow's output
//! - longest latency-weighted path
//! - information efficiency (edge overlap flowing into live calls)

use crate::domain::graph::Graph;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphInsights {
    /// Last leaf call in trace order, taken as the workflow's final output
    pub intended_output: Option<String>,
    /// Calls that cannot reach the intended output
    pub dead_branch_ids: Vec<String>,
    pub dead_branch_cost: f64,
    /// Longest latency path, first call to last
    pub critical_path: Vec<String>,
    pub critical_path_latency: f64,
    /// Overlap weight into live calls per call, as a percentage
    pub information_efficiency: f64,
}

pub fn analyze(graph: &Graph) -> GraphInsights {
    if graph.is_empty() {
        return GraphInsights::default();
    }

    let (output, alive) = live_calls(graph);
    let dead: Vec<usize> = (0..graph.len()).filter(|&i| !alive[i]).collect();
    let dead_branch_cost: f64 = dead.iter().map(|&i| graph.calls[i].cost).sum();

    let (path, critical_path_latency) = longest_path(graph);

    let total_tokens: u64 = graph
        .calls
        .iter()
        .map(|c| c.tokens_in.saturating_add(c.tokens_out))
        .fold(0, u64::saturating_add);
    let information_efficiency = if total_tokens > 0 {
        let useful: f64 = graph
            .resolved_edges()
            .iter()
            .filter(|r| alive[r.target])
            .map(|r| graph.edges[r.edge].weight.unwrap_or(0.0))
            .sum();
        useful * 100.0 / graph.len() as f64
    } else {
        0.0
    };

    debug!(
        dead = dead.len(),
        path_len = path.len(),
        "graph insights computed"
    );

    let id = |i: usize| graph.calls[i].id.clone();
    GraphInsights {
        intended_output: output.map(id),
        dead_branch_ids: dead.into_iter().map(id).collect(),
        dead_branch_cost,
        critical_path: path.into_iter().map(id).collect(),
        critical_path_latency,
        information_efficiency,
    }
}

/// The intended output and which calls feed it. Without any leaf (every
/// call is on a cycle) nothing can be judged dead.
fn live_calls(graph: &Graph) -> (Option<usize>, Vec<bool>) {
    let n = graph.len();
    let adj = graph.successors();
    let Some(output) = (0..n).rev().find(|&i| adj[i].is_empty()) else {
        return (None, vec![true; n]);
    };

    let radj = graph.predecessors();
    let mut alive = vec![false; n];
    let mut queue = VecDeque::from([output]);
    alive[output] = true;
    while let Some(u) = queue.pop_front() {
        for &p in &radj[u] {
            if !alive[p] {
                alive[p] = true;
                queue.push_back(p);
            }
        }
    }
    (Some(output), alive)
}

/// Longest path where each call weighs its own latency. Relaxation runs at
/// most |V| passes, so cycles end with a bounded, approximate answer.
fn longest_path(graph: &Graph) -> (Vec<usize>, f64) {
    let n = graph.len();
    let mut dist: Vec<f64> = graph.calls.iter().map(|c| c.latency).collect();
    let mut parent: Vec<Option<usize>> = vec![None; n];

    for _ in 0..n {
        let mut changed = false;
        for r in graph.resolved_edges() {
            let through = dist[r.source] + graph.calls[r.target].latency;
            if dist[r.target] < through {
                dist[r.target] = through;
                parent[r.target] = Some(r.source);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut end = 0;
    for i in 1..n {
        if dist[i] > dist[end] {
            end = i;
        }
    }

    let mut path = Vec::new();
    let mut on_path = vec![false; n];
    let mut cursor = Some(end);
    while let Some(i) = cursor {
        if on_path[i] {
            break;
        }
        on_path[i] = true;
        path.push(i);
        cursor = parent[i];
    }
    path.reverse();

    (path, dist[end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{Call, Edge};

    #[test]
    fn test_dead_branch_by_reachability() {
        // a -> b -> out, a -> side (side is a leaf but not the last one)
        let graph = Graph::new(
            vec![
                Call::new("a").with_cost(1.0),
                Call::new("side").with_cost(0.5),
                Call::new("b").with_cost(1.0),
                Call::new("out").with_cost(1.0),
            ],
            vec![
                Edge::new("a", "b"),
                Edge::new("a", "side"),
                Edge::new("b", "out"),
            ],
        );
        let insights = analyze(&graph);
        assert_eq!(insights.intended_output.as_deref(), Some("out"));
        assert_eq!(insights.dead_branch_ids, vec!["side".to_string()]);
        assert_eq!(insights.dead_branch_cost, 0.5);
    }

    #[test]
    fn test_longest_latency_path() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_latency(10.0),
                Call::new("fast").with_latency(5.0),
                Call::new("slow").with_latency(50.0),
                Call::new("d").with_latency(10.0),
            ],
            vec![
                Edge::new("a", "fast"),
                Edge::new("a", "slow"),
                Edge::new("fast", "d"),
                Edge::new("slow", "d"),
            ],
        );
        let insights = analyze(&graph);
        assert_eq!(insights.critical_path, vec!["a", "slow", "d"]);
        assert_eq!(insights.critical_path_latency, 70.0);
    }

    #[test]
    fn test_token_overflow_saturates() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_tokens(u64::MAX, 1),
                Call::new("b").with_tokens(u64::MAX, u64::MAX),
            ],
            vec![Edge::new("a", "b").with_weight(1.0)],
        );
        assert_eq!(analyze(&graph).information_efficiency, 50.0);
    }

    #[test]
    fn test_information_efficiency() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_tokens(100, 10),
                Call::new("b").with_tokens(100, 10),
            ],
            vec![Edge::new("a", "b").with_weight(0.5)],
        );
        assert_eq!(analyze(&graph).information_efficiency, 25.0);

        let tokenless = Graph::new(
            vec![Call::new("a"), Call::new("b")],
            vec![Edge::new("a", "b").with_weight(0.5)],
        );
        assert_eq!(analyze(&tokenless).information_efficiency, 0.0);
    }

    #[test]
    fn test_cycle_is_bounded() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_latency(1.0),
                Call::new("b").with_latency(1.0),
            ],
            vec![Edge::new("a", "b"), Edge::new("b", "a")],
        );
        let insights = analyze(&graph);
        assert!(insights.intended_output.is_none());
        assert!(insights.dead_branch_ids.is_empty());
        assert!(insights.critical_path.len() <= 2);
        assert!(insights.critical_path_latency.is_finite());
    }

    #[test]
    fn test_empty() {
        assert_eq!(analyze(&Graph::default()), GraphInsights::default());
    }
}
