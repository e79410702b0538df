//! Waste Metrics
//!
//! Aggregates cost and latency over the whole call set and over the
//! analyst-flagged subsets. One pass, no graph search: `critical_path_latency`
//! only reads the externally assigned critical-path flag. See
//! [`crate::domain::insights`] for the computed longest path.

use crate::domain::graph::{CallFlag, Graph, WasteCategory};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Lower bound for `max_cost` and for ratio denominators
    pub cost_floor: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { cost_floor: 0.01 }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    pub total_cost: f64,
    pub total_latency: f64,
    /// Largest single call cost, never below the configured floor
    pub max_cost: f64,
    /// Cost of calls flagged dead-branch or redundant
    pub dead_branch_cost: f64,
    /// Largest latency among calls flagged critical-path, 0 if none
    pub critical_path_latency: f64,
    pub redundant_cost: f64,
    pub overkill_cost: f64,
    pub bloated_cost: f64,
    /// redundant + overkill + bloated
    pub total_wasted: f64,
    /// Share of spend that is not waste, 0..=100
    pub efficiency_score: f64,
    pub call_count: usize,
    pub security_risk_count: usize,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
}

impl Metrics {
    pub fn waste(&self, category: WasteCategory) -> f64 {
        match category {
            WasteCategory::Redundant => self.redundant_cost,
            WasteCategory::Overkill => self.overkill_cost,
            WasteCategory::Bloated => self.bloated_cost,
        }
    }

    fn waste_mut(&mut self, category: WasteCategory) -> &mut f64 {
        match category {
            WasteCategory::Redundant => &mut self.redundant_cost,
            WasteCategory::Overkill => &mut self.overkill_cost,
            WasteCategory::Bloated => &mut self.bloated_cost,
        }
    }

    /// Cost relative to the most expensive call, for bar widths.
    pub fn relative_cost(&self, cost: f64) -> f64 {
        if self.max_cost > 0.0 {
            cost / self.max_cost
        } else {
            0.0
        }
    }
}

pub fn aggregate(graph: &Graph, config: &MetricsConfig) -> Metrics {
    let mut metrics = Metrics {
        call_count: graph.len(),
        ..Metrics::default()
    };
    let mut max_cost = 0.0f64;

    for call in &graph.calls {
        metrics.total_cost += call.cost;
        metrics.total_latency += call.latency;
        metrics.total_tokens_in = metrics.total_tokens_in.saturating_add(call.tokens_in);
        metrics.total_tokens_out = metrics.total_tokens_out.saturating_add(call.tokens_out);
        max_cost = max_cost.max(call.cost);

        if call.has(CallFlag::DeadBranch) || call.has(CallFlag::Redundant) {
            metrics.dead_branch_cost += call.cost;
        }
        if call.has(CallFlag::CriticalPath) {
            metrics.critical_path_latency = metrics.critical_path_latency.max(call.latency);
        }
        if call.has(CallFlag::SecurityRisk) {
            metrics.security_risk_count += 1;
        }
        for category in call.flags.waste_categories() {
            *metrics.waste_mut(category) += call.cost;
        }
    }

    metrics.max_cost = max_cost.max(config.cost_floor);
    metrics.total_wasted = WasteCategory::ALL
        .iter()
        .map(|c| metrics.waste(*c))
        .sum();
    metrics.efficiency_score = efficiency_score(graph, &metrics, max_cost);

    metrics
}

/// Non-waste share of spend. Totals that overflowed to infinity are redone
/// on costs scaled by the largest one, which leaves the ratio unchanged.
fn efficiency_score(graph: &Graph, metrics: &Metrics, max_cost: f64) -> f64 {
    let (total, wasted) = if metrics.total_cost.is_finite() {
        (metrics.total_cost, metrics.total_wasted)
    } else {
        graph.calls.iter().fold((0.0, 0.0), |(total, wasted), call| {
            let share = call.cost / max_cost;
            let categories = call.flags.waste_categories().count() as f64;
            (total + share, wasted + share * categories)
        })
    };
    if !(total.is_finite() && total > 0.0) {
        return 100.0;
    }
    let score = 100.0 * (total - wasted) / total;
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::Call;

    fn config() -> MetricsConfig {
        MetricsConfig::default()
    }

    #[test]
    fn test_overkill_cost_and_max_floor() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_cost(0.02),
                Call::new("b").with_cost(0.05).with_flag(CallFlag::Overkill),
                Call::new("c").with_cost(0.0),
            ],
            vec![],
        );
        let m = aggregate(&graph, &config());
        assert_eq!(m.overkill_cost, 0.05);
        assert_eq!(m.max_cost, 0.05);
        assert_eq!(m.total_wasted, 0.05);
        assert_eq!(m.call_count, 3);
    }

    #[test]
    fn test_max_cost_floor_applies() {
        let graph = Graph::new(vec![Call::new("a").with_cost(0.001)], vec![]);
        let m = aggregate(&graph, &config());
        assert_eq!(m.max_cost, 0.01);
        assert_eq!(m.relative_cost(0.005), 0.5);
    }

    #[test]
    fn test_dead_branch_counts_redundant_once() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_cost(1.0).with_flag(CallFlag::DeadBranch),
                Call::new("b").with_cost(2.0).with_flag(CallFlag::Redundant),
                Call::new("c")
                    .with_cost(4.0)
                    .with_flag(CallFlag::Redundant)
                    .with_flag(CallFlag::DeadBranch),
                Call::new("d").with_cost(8.0),
            ],
            vec![],
        );
        let m = aggregate(&graph, &config());
        assert_eq!(m.dead_branch_cost, 7.0);
        assert_eq!(m.redundant_cost, 6.0);
    }

    #[test]
    fn test_critical_path_uses_flag_only() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_latency(500.0),
                Call::new("b").with_latency(30.0).with_flag(CallFlag::CriticalPath),
                Call::new("c").with_latency(80.0).with_flag(CallFlag::CriticalPath),
            ],
            vec![],
        );
        let m = aggregate(&graph, &config());
        assert_eq!(m.critical_path_latency, 80.0);
        assert_eq!(m.total_latency, 610.0);
    }

    #[test]
    fn test_call_in_several_categories_counts_in_each() {
        let graph = Graph::new(
            vec![Call::new("a")
                .with_cost(1.0)
                .with_flag(CallFlag::Redundant)
                .with_flag(CallFlag::Overkill)
                .with_flag(CallFlag::Bloated)
                .with_flag(CallFlag::SecurityRisk)],
            vec![],
        );
        let m = aggregate(&graph, &config());
        assert_eq!(m.total_wasted, 3.0);
        assert_eq!(m.redundant_cost + m.overkill_cost + m.bloated_cost, m.total_wasted);
        assert_eq!(m.efficiency_score, 0.0);
        assert_eq!(m.security_risk_count, 1);
    }

    #[test]
    fn test_token_totals_saturate() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_tokens(u64::MAX, 1),
                Call::new("b").with_tokens(u64::MAX, u64::MAX),
            ],
            vec![],
        );
        let m = aggregate(&graph, &config());
        assert_eq!(m.total_tokens_in, u64::MAX);
        assert_eq!(m.total_tokens_out, u64::MAX);
    }

    #[test]
    fn test_efficiency_stays_finite_on_huge_costs() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_cost(1e308).with_flag(CallFlag::Overkill),
                Call::new("b").with_cost(1e308).with_flag(CallFlag::Overkill),
                Call::new("c").with_cost(1e308),
                Call::new("d").with_cost(1e308),
            ],
            vec![],
        );
        let m = aggregate(&graph, &config());
        assert!(m.total_cost.is_infinite());
        assert!(m.efficiency_score.is_finite());
        assert_eq!(m.efficiency_score, 50.0);
    }

    #[test]
    fn test_empty_graph_is_zero() {
        let m = aggregate(&Graph::default(), &config());
        assert_eq!(m.total_cost, 0.0);
        assert_eq!(m.total_latency, 0.0);
        assert_eq!(m.dead_branch_cost, 0.0);
        assert_eq!(m.critical_path_latency, 0.0);
        assert_eq!(m.total_wasted, 0.0);
        assert_eq!(m.max_cost, 0.01);
        assert_eq!(m.efficiency_score, 100.0);
    }
}
