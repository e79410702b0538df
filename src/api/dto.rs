use crate::application::DerivedSnapshot;
use crate::domain::graph::{Call, CallFlag};
use crate::domain::insights::GraphInsights;
use crate::domain::layering::Layout;
use crate::domain::metrics::Metrics;
use serde::{Deserialize, Serialize};

/// Wire shape of one derived snapshot, as consumed by the rendering surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationDto {
    pub name: String,
    pub layout: LayoutDto,
    pub edges: Vec<EdgeDto>,
    pub waterfall: Vec<WaterfallRowDto>,
    pub bridges: Vec<BridgeDto>,
    pub metrics: MetricsDto,
    pub insights: InsightsDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDto {
    pub nodes: Vec<NodeDto>,
    pub levels: Vec<LevelDto>,
    pub width: f64,
    pub height: f64,
    pub capped: bool,
    pub cyclic_nodes: Vec<String>,
}

/// One layout row. `level` is explicit because capped layouts may skip
/// level numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDto {
    pub level: usize,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDto {
    pub id: String,
    pub label: String,
    pub model: String,
    pub level: usize,
    pub index_in_level: usize,
    pub x: f64,
    pub y: f64,
    pub parents: Vec<String>,
    #[serde(flatten)]
    pub flags: FlagsDto,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagsDto {
    pub is_redundant: bool,
    pub is_overkill: bool,
    pub is_bloated: bool,
    pub has_security_risk: bool,
    pub is_dead_branch: bool,
    pub is_critical_path: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDto {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterfallRowDto {
    pub id: String,
    pub label: String,
    pub model: String,
    pub index: usize,
    pub start_time: f64,
    pub latency: f64,
    pub cost: f64,
    pub tokens_in: u64,
    #[serde(flatten)]
    pub flags: FlagsDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redundant_with_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeDto {
    pub source_index: usize,
    pub target_index: usize,
    pub is_double_whammy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDto {
    pub total_cost: f64,
    pub total_latency: f64,
    pub max_cost: f64,
    pub dead_branch_cost: f64,
    pub critical_path_latency: f64,
    pub redundant_cost: f64,
    pub overkill_cost: f64,
    pub bloated_cost: f64,
    pub total_wasted: f64,
    pub efficiency_score: f64,
    pub call_count: usize,
    pub security_risk_count: usize,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsDto {
    pub intended_output: Option<String>,
    pub dead_branch_ids: Vec<String>,
    pub dead_branch_cost: f64,
    pub critical_path: Vec<String>,
    pub critical_path_latency: f64,
    pub information_efficiency: f64,
}

impl From<&Call> for FlagsDto {
    fn from(call: &Call) -> Self {
        FlagsDto {
            is_redundant: call.has(CallFlag::Redundant),
            is_overkill: call.has(CallFlag::Overkill),
            is_bloated: call.has(CallFlag::Bloated),
            has_security_risk: call.has(CallFlag::SecurityRisk),
            is_dead_branch: call.has(CallFlag::DeadBranch),
            is_critical_path: call.has(CallFlag::CriticalPath),
        }
    }
}

impl From<&Metrics> for MetricsDto {
    fn from(m: &Metrics) -> Self {
        MetricsDto {
            total_cost: m.total_cost,
            total_latency: m.total_latency,
            max_cost: m.max_cost,
            dead_branch_cost: m.dead_branch_cost,
            critical_path_latency: m.critical_path_latency,
            redundant_cost: m.redundant_cost,
            overkill_cost: m.overkill_cost,
            bloated_cost: m.bloated_cost,
            total_wasted: m.total_wasted,
            efficiency_score: m.efficiency_score,
            call_count: m.call_count,
            security_risk_count: m.security_risk_count,
            total_tokens_in: m.total_tokens_in,
            total_tokens_out: m.total_tokens_out,
        }
    }
}

impl From<&GraphInsights> for InsightsDto {
    fn from(i: &GraphInsights) -> Self {
        InsightsDto {
            intended_output: i.intended_output.clone(),
            dead_branch_ids: i.dead_branch_ids.clone(),
            dead_branch_cost: i.dead_branch_cost,
            critical_path: i.critical_path.clone(),
            critical_path_latency: i.critical_path_latency,
            information_efficiency: i.information_efficiency,
        }
    }
}

fn layout_dto(layout: &Layout, calls: &[Call]) -> LayoutDto {
    let nodes = calls
        .iter()
        .zip(&layout.positions)
        .map(|(call, pos)| NodeDto {
            id: call.id.clone(),
            label: call.label.clone(),
            model: call.model.clone(),
            level: pos.level,
            index_in_level: pos.index_in_level,
            x: pos.x,
            y: pos.y,
            parents: call.parents.clone(),
            flags: FlagsDto::from(call),
        })
        .collect();

    LayoutDto {
        nodes,
        levels: layout
            .levels
            .iter()
            .map(|l| LevelDto {
                level: l.level,
                ids: l.ids.clone(),
            })
            .collect(),
        width: layout.width,
        height: layout.height,
        capped: layout.capped,
        cyclic_nodes: layout.cyclic_nodes.clone(),
    }
}

impl From<&DerivedSnapshot> for DerivationDto {
    fn from(s: &DerivedSnapshot) -> Self {
        let graph = &s.graph;
        let d = &s.derivation;

        let edges = graph
            .resolved_edges()
            .iter()
            .map(|r| {
                let edge = &graph.edges[r.edge];
                EdgeDto {
                    source: edge.source.clone(),
                    target: edge.target.clone(),
                    weight: edge.weight,
                }
            })
            .collect();

        let waterfall = d
            .waterfall
            .iter()
            .map(|row| {
                let call = &graph.calls[row.index];
                WaterfallRowDto {
                    id: row.id.clone(),
                    label: call.label.clone(),
                    model: call.model.clone(),
                    index: row.index,
                    start_time: row.start_time,
                    latency: row.latency,
                    cost: row.cost,
                    tokens_in: call.tokens_in,
                    flags: FlagsDto::from(call),
                    redundant_with_id: call.redundant_with_id.clone(),
                    recommended_model: call.recommended_model.clone(),
                    reason: call.reason.clone(),
                }
            })
            .collect();

        let bridges = d
            .bridges
            .iter()
            .map(|b| BridgeDto {
                source_index: b.source_index,
                target_index: b.target_index,
                is_double_whammy: b.is_double_whammy,
            })
            .collect();

        DerivationDto {
            name: s.name.clone(),
            layout: layout_dto(&d.layout, &graph.calls),
            edges,
            waterfall,
            bridges,
            metrics: MetricsDto::from(&d.metrics),
            insights: InsightsDto::from(&d.insights),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::derive;
    use crate::config::EngineConfig;
    use crate::domain::graph::{Edge, Graph};

    #[test]
    fn test_camel_case_wire_shape() {
        let graph = Graph::new(
            vec![
                Call::new("a").with_cost(0.5).with_latency(10.0),
                Call::new("b")
                    .with_cost(0.5)
                    .redundant_with("a")
                    .with_flag(CallFlag::Overkill),
            ],
            vec![Edge::new("a", "b")],
        );
        let derivation = derive(&graph, &EngineConfig::default());
        let dto = DerivationDto::from(&DerivedSnapshot {
            name: "wf".to_string(),
            graph,
            derivation,
        });
        let value = serde_json::to_value(&dto).unwrap();

        assert_eq!(value["layout"]["nodes"][1]["indexInLevel"], 0);
        assert_eq!(value["layout"]["nodes"][1]["level"], 1);
        assert_eq!(value["waterfall"][1]["startTime"], 10.0);
        assert_eq!(value["waterfall"][1]["isRedundant"], true);
        assert_eq!(value["waterfall"][1]["redundantWithId"], "a");
        assert!(value["waterfall"][0].get("redundantWithId").is_none());
        assert_eq!(value["bridges"][0]["isDoubleWhammy"], true);
        assert_eq!(value["metrics"]["totalWasted"], 1.0);
        assert_eq!(value["edges"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_levels_carry_their_number() {
        let graph = Graph::new(
            vec![Call::new("root"), Call::new("x"), Call::new("y"), Call::new("tail")],
            vec![
                Edge::new("root", "x"),
                Edge::new("x", "y"),
                Edge::new("y", "x"),
                Edge::new("y", "tail"),
            ],
        );
        let derivation = derive(&graph, &EngineConfig::default());
        let levels = derivation.layout.levels.clone();
        let dto = DerivationDto::from(&DerivedSnapshot {
            name: "cyclic".to_string(),
            graph,
            derivation,
        });

        assert!(dto.layout.capped);
        assert_eq!(dto.layout.levels.len(), levels.len());
        for (wire, level) in dto.layout.levels.iter().zip(&levels) {
            assert_eq!(wire.level, level.level);
            assert_eq!(wire.ids, level.ids);
        }
        let value = serde_json::to_value(&dto).unwrap();
        assert_eq!(value["layout"]["levels"][0]["level"], 0);
        assert_eq!(value["layout"]["levels"][0]["ids"][0], "root");
    }
}
