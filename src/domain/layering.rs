//! DAG Layering
//!
//! Assigns every call a level so that each edge points from a lower level to
//! a strictly higher one, then positions levels as rows of a top-down
//! diagram. Levels are found by FIFO label-correcting relaxation from the
//! roots. Cyclic input cannot reach a fixed point; it is handled by an
//! iteration cap and the levels reached so far are kept (approximate).

use crate::domain::graph::Graph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, warn};

/// Canvas spacing, in rendering units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance between two consecutive levels
    pub vertical_spacing: f64,
    /// Horizontal slot width of one node
    pub horizontal_spacing: f64,
    /// Margin around the whole diagram
    pub padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            vertical_spacing: 120.0,
            horizontal_spacing: 220.0,
            padding: 40.0,
        }
    }
}

/// Placement of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePosition {
    pub id: String,
    pub level: usize,
    /// Rank inside its level, following input order
    pub index_in_level: usize,
    pub x: f64,
    pub y: f64,
}

/// All calls sharing one level, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub level: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layout {
    /// One entry per call, in input order
    pub positions: Vec<NodePosition>,
    /// Non-empty levels, ascending
    pub levels: Vec<Level>,
    pub width: f64,
    pub height: f64,
    /// The relaxation hit its iteration cap; levels are approximate
    pub capped: bool,
    /// Calls on, or fed by, a dependency cycle
    pub cyclic_nodes: Vec<String>,
    index: HashMap<String, usize>,
}

impl Layout {
    pub fn get(&self, id: &str) -> Option<&NodePosition> {
        self.index.get(id).map(|&i| &self.positions[i])
    }

    pub fn level_of(&self, id: &str) -> Option<usize> {
        self.get(id).map(|p| p.level)
    }

    pub fn is_acyclic(&self) -> bool {
        self.cyclic_nodes.is_empty()
    }
}

/// Raw level assignment by input position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelAssignment {
    pub levels: Vec<usize>,
    pub capped: bool,
}

/// Longest-incoming-path level of every call.
pub fn assign_levels(graph: &Graph) -> LevelAssignment {
    let n = graph.len();
    let mut levels = vec![0usize; n];
    if n == 0 {
        return LevelAssignment {
            levels,
            capped: false,
        };
    }

    let adj = graph.successors();
    let edge_count = graph.resolved_edges().len();

    let mut in_degree = vec![0usize; n];
    for r in graph.resolved_edges() {
        in_degree[r.target] += 1;
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    if queue.is_empty() {
        warn!(calls = n, "no root call found, seeding layering with every call");
        queue.extend(0..n);
    }

    // Each level can rise at most min(n - 1, e) times on acyclic input, so
    // n * (e + 1) pops always suffice there.
    let cap = n.saturating_mul(edge_count + 1);
    let mut steps = 0usize;
    let mut capped = false;

    while let Some(u) = queue.pop_front() {
        if steps >= cap {
            capped = true;
            break;
        }
        steps += 1;
        for &v in &adj[u] {
            let candidate = levels[u] + 1;
            if candidate > levels[v] {
                levels[v] = candidate;
                queue.push_back(v);
            }
        }
    }

    if capped {
        warn!(cap, "layering did not converge, keeping partial levels");
    }
    debug!(steps, calls = n, edges = edge_count, "layering finished");

    LevelAssignment { levels, capped }
}

/// Positions of calls that Kahn's algorithm can never release, i.e. calls
/// on a cycle or reachable only through one.
pub fn find_cyclic_nodes(graph: &Graph) -> Vec<usize> {
    let n = graph.len();
    let adj = graph.successors();
    let mut in_degree = vec![0usize; n];
    for r in graph.resolved_edges() {
        in_degree[r.target] += 1;
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut released = vec![false; n];
    while let Some(u) = queue.pop_front() {
        released[u] = true;
        for &v in &adj[u] {
            in_degree[v] -= 1;
            if in_degree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    (0..n).filter(|&i| !released[i]).collect()
}

/// Layer the graph and place every call on the canvas.
pub fn layout(graph: &Graph, config: &LayoutConfig) -> Layout {
    if graph.is_empty() {
        return Layout::default();
    }

    let LevelAssignment { levels, capped } = assign_levels(graph);

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &level) in levels.iter().enumerate() {
        groups.entry(level).or_default().push(i);
    }

    let widest = groups.values().map(Vec::len).max().unwrap_or(0);
    let max_level = groups.keys().next_back().copied().unwrap_or(0);
    let width = widest as f64 * config.horizontal_spacing + 2.0 * config.padding;
    let height = (max_level + 1) as f64 * config.vertical_spacing + 2.0 * config.padding;
    let midline = width / 2.0;

    let mut slots: Vec<Option<(usize, f64)>> = vec![None; graph.len()];
    for members in groups.values() {
        let span = members.len() as f64 * config.horizontal_spacing;
        let left = midline - span / 2.0;
        for (rank, &i) in members.iter().enumerate() {
            let x = left + rank as f64 * config.horizontal_spacing + config.horizontal_spacing / 2.0;
            slots[i] = Some((rank, x));
        }
    }

    let index = graph
        .calls
        .iter()
        .enumerate()
        .map(|(i, call)| (call.id.clone(), i))
        .collect();

    let positions = graph
        .calls
        .iter()
        .zip(levels.iter())
        .zip(slots)
        .map(|((call, &level), slot)| {
            let (index_in_level, x) = slot.unwrap_or((0, midline));
            NodePosition {
                id: call.id.clone(),
                level,
                index_in_level,
                x,
                y: level as f64 * config.vertical_spacing + config.padding,
            }
        })
        .collect();

    let levels = groups
        .into_iter()
        .map(|(level, members)| Level {
            level,
            ids: members.iter().map(|&i| graph.calls[i].id.clone()).collect(),
        })
        .collect();

    let cyclic_nodes: Vec<String> = find_cyclic_nodes(graph)
        .into_iter()
        .map(|i| graph.calls[i].id.clone())
        .collect();
    if !cyclic_nodes.is_empty() {
        warn!(count = cyclic_nodes.len(), "dependency cycle detected");
    }

    Layout {
        positions,
        levels,
        width,
        height,
        capped,
        cyclic_nodes,
        index,
    }
}
