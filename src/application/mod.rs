use crate::config::EngineConfig;
use crate::domain::bridges::{extract_bridges, RedundancyBridge};
use crate::domain::graph::Graph;
use crate::domain::insights::{analyze, GraphInsights};
use crate::domain::layering::{layout, Layout};
use crate::domain::metrics::{aggregate, Metrics};
use crate::domain::waterfall::{sequence, WaterfallRow};
use crate::error::Result;
use crate::ports::{DerivationExporter, SnapshotSource};
use rayon::prelude::*;
use tracing::{debug, info};

/// Everything derived from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub layout: Layout,
    pub waterfall: Vec<WaterfallRow>,
    pub bridges: Vec<RedundancyBridge>,
    pub metrics: Metrics,
    pub insights: GraphInsights,
}

/// A named workflow snapshot (usually the file it came from).
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub name: String,
    pub graph: Graph,
}

#[derive(Debug, Clone)]
pub struct DerivedSnapshot {
    pub name: String,
    pub graph: Graph,
    pub derivation: Derivation,
}

/// Run every engine stage on one snapshot. Pure and deterministic.
pub fn derive(graph: &Graph, config: &EngineConfig) -> Derivation {
    let derivation = Derivation {
        layout: layout(graph, &config.layout),
        waterfall: sequence(graph),
        bridges: extract_bridges(graph),
        metrics: aggregate(graph, &config.metrics),
        insights: analyze(graph),
    };
    debug!(
        calls = graph.len(),
        levels = derivation.layout.levels.len(),
        bridges = derivation.bridges.len(),
        total_cost = derivation.metrics.total_cost,
        "snapshot derived"
    );
    derivation
}

/// Derive independent snapshots in parallel, preserving input order.
pub fn derive_batch(snapshots: Vec<Snapshot>, config: &EngineConfig) -> Vec<DerivedSnapshot> {
    snapshots
        .into_par_iter()
        .map(|s| {
            let derivation = derive(&s.graph, config);
            DerivedSnapshot {
                name: s.name,
                graph: s.graph,
                derivation,
            }
        })
        .collect()
}

pub struct DeriveUsecase<'a> {
    pub source: &'a dyn SnapshotSource,
    pub exporter: &'a dyn DerivationExporter,
    pub config: EngineConfig,
}

impl<'a> DeriveUsecase<'a> {
    /// Load, derive, export. Returns the number of snapshots written.
    pub fn run(&self, export_path: &str) -> Result<usize> {
        let snapshots = self.source.load()?;
        let derived = derive_batch(snapshots, &self.config);
        self.exporter.export(&derived, export_path)?;
        info!(snapshots = derived.len(), path = export_path, "derivations exported");
        Ok(derived.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::{Call, CallFlag, Edge};
    use std::cell::RefCell;

    fn sample() -> Graph {
        Graph::new(
            vec![
                Call::new("plan").with_cost(0.02).with_latency(100.0),
                Call::new("search").with_cost(0.05).with_latency(300.0),
                Call::new("search_again")
                    .with_cost(0.05)
                    .with_latency(280.0)
                    .redundant_with("search")
                    .with_flag(CallFlag::Overkill),
                Call::new("answer").with_cost(0.01).with_latency(50.0),
            ],
            vec![
                Edge::new("plan", "search"),
                Edge::new("plan", "search_again"),
                Edge::new("search", "answer"),
            ],
        )
    }

    #[test]
    fn test_derive_all_outputs() {
        let d = derive(&sample(), &EngineConfig::default());
        assert_eq!(d.layout.level_of("answer"), Some(2));
        assert_eq!(d.waterfall[3].start_time, 680.0);
        assert_eq!(d.bridges.len(), 1);
        assert!(d.bridges[0].is_double_whammy);
        assert_eq!(d.metrics.redundant_cost, 0.05);
        assert_eq!(d.insights.dead_branch_ids, vec!["search_again".to_string()]);
    }

    #[test]
    fn test_derive_is_idempotent() {
        let graph = sample();
        let config = EngineConfig::default();
        assert_eq!(derive(&graph, &config), derive(&graph, &config));
    }

    #[test]
    fn test_batch_preserves_order() {
        let snapshots: Vec<Snapshot> = (0..8)
            .map(|i| Snapshot {
                name: format!("wf-{}", i),
                graph: Graph::new(vec![Call::new("a").with_cost(i as f64)], vec![]),
            })
            .collect();
        let derived = derive_batch(snapshots, &EngineConfig::default());
        for (i, d) in derived.iter().enumerate() {
            assert_eq!(d.name, format!("wf-{}", i));
            assert_eq!(d.derivation.metrics.total_cost, i as f64);
        }
    }

    struct FixedSource;
    impl SnapshotSource for FixedSource {
        fn load(&self) -> Result<Vec<Snapshot>> {
            Ok(vec![Snapshot {
                name: "fixed".to_string(),
                graph: sample(),
            }])
        }
    }

    #[derive(Default)]
    struct RecordingExporter {
        seen: RefCell<Vec<(String, String)>>,
    }
    impl DerivationExporter for RecordingExporter {
        fn render(&self, snapshots: &[DerivedSnapshot]) -> Result<String> {
            Ok(snapshots.iter().map(|s| s.name.clone()).collect())
        }
        fn export(&self, snapshots: &[DerivedSnapshot], path: &str) -> Result<()> {
            self.seen
                .borrow_mut()
                .push((path.to_string(), self.render(snapshots)?));
            Ok(())
        }
    }

    #[test]
    fn test_usecase_runs_pipeline() {
        let exporter = RecordingExporter::default();
        let usecase = DeriveUsecase {
            source: &FixedSource,
            exporter: &exporter,
            config: EngineConfig::default(),
        };
        assert_eq!(usecase.run("out.json").unwrap(), 1);
        assert_eq!(
            exporter.seen.borrow().as_slice(),
            &[("out.json".to_string(), "fixed".to_string())]
        );
    }
}
