//! Workflow DOT Exporter
//!
//! Exports derived snapshots as Graphviz DOT: one top-down digraph per
//! snapshot, nodes pinned to their layout coordinates and grouped by level,
//! redundancy bridges drawn as dashed non-constraining edges.

use crate::application::DerivedSnapshot;
use crate::domain::graph::{Call, CallFlag};
use crate::error::Result;
use crate::ports::DerivationExporter;

pub struct DotExporter;

/// Visual class of a node, picked from its most severe flag.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NodeKind {
    SecurityRisk,
    Redundant,
    Overkill,
    Bloated,
    DeadBranch,
    CriticalPath,
    Normal,
}

impl DerivationExporter for DotExporter {
    fn render(&self, snapshots: &[DerivedSnapshot]) -> Result<String> {
        let graphs: Vec<String> = snapshots.iter().map(Self::to_dot).collect();
        Ok(graphs.join("\n\n"))
    }
}

impl DotExporter {
    /// Convert one derived snapshot to a DOT digraph.
    pub fn to_dot(snapshot: &DerivedSnapshot) -> String {
        let graph = &snapshot.graph;
        let derivation = &snapshot.derivation;
        let mut lines = Vec::new();

        lines.push(format!("digraph \"{}\" {{", Self::escape_label(&snapshot.name)));
        lines.push("    rankdir=TB;".to_string());
        lines.push("    nodesep=0.8;".to_string());
        lines.push("    ranksep=1.0;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=12];".to_string());
        lines.push("    edge [fontname=\"Helvetica\", fontsize=10];".to_string());
        lines.push("".to_string());

        for (call, pos) in graph.calls.iter().zip(&derivation.layout.positions) {
            let kind = Self::node_kind(call);
            let (shape, fill, style) = Self::node_style(kind);
            lines.push(format!(
                "    \"{}\" [label=\"{}\", shape={}, style=\"{}\", fillcolor=\"{}\", color=\"{}\", pos=\"{:.1},{:.1}!\"];",
                Self::escape_label(&call.id),
                Self::escape_label(&Self::node_label(call)),
                shape,
                style,
                fill,
                Self::border_color(kind),
                pos.x,
                -pos.y
            ));
        }

        lines.push("".to_string());

        for r in graph.resolved_edges() {
            let edge = &graph.edges[r.edge];
            let label = edge
                .weight
                .map(|w| format!(" [label=\"{:.2}\"]", w))
                .unwrap_or_default();
            lines.push(format!(
                "    \"{}\" -> \"{}\"{};",
                Self::escape_label(&edge.source),
                Self::escape_label(&edge.target),
                label
            ));
        }

        for bridge in &derivation.bridges {
            let source = &derivation.waterfall[bridge.source_index].id;
            let target = &derivation.waterfall[bridge.target_index].id;
            let color = if bridge.is_double_whammy { "#d20f39" } else { "#df8e1d" };
            lines.push(format!(
                "    \"{}\" -> \"{}\" [style=dashed, color=\"{}\", constraint=false, label=\"dup\"];",
                Self::escape_label(source),
                Self::escape_label(target),
                color
            ));
        }

        for level in &derivation.layout.levels {
            let ids: Vec<String> = level
                .ids
                .iter()
                .map(|id| format!("\"{}\"", Self::escape_label(id)))
                .collect();
            lines.push(format!("    {{ rank=same; {} }}", ids.join("; ")));
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    fn node_kind(call: &Call) -> NodeKind {
        if call.has(CallFlag::SecurityRisk) {
            NodeKind::SecurityRisk
        } else if call.has(CallFlag::Redundant) {
            NodeKind::Redundant
        } else if call.has(CallFlag::Overkill) {
            NodeKind::Overkill
        } else if call.has(CallFlag::Bloated) {
            NodeKind::Bloated
        } else if call.has(CallFlag::DeadBranch) {
            NodeKind::DeadBranch
        } else if call.has(CallFlag::CriticalPath) {
            NodeKind::CriticalPath
        } else {
            NodeKind::Normal
        }
    }

    fn node_label(call: &Call) -> String {
        if call.model.is_empty() {
            format!("{}\n${:.4}", call.label, call.cost)
        } else {
            format!("{}\n{}\n${:.4}", call.label, call.model, call.cost)
        }
    }

    fn node_style(kind: NodeKind) -> (&'static str, &'static str, &'static str) {
        match kind {
            NodeKind::SecurityRisk => ("octagon", "#f38ba8", "filled"),      // Red
            NodeKind::Redundant => ("box", "#fab387", "filled"),             // Peach
            NodeKind::Overkill => ("box", "#f9e2af", "filled"),              // Yellow
            NodeKind::Bloated => ("box", "#cba6f7", "filled"),               // Purple
            NodeKind::DeadBranch => ("box", "#6c7086", "filled,dashed"),     // Gray
            NodeKind::CriticalPath => ("box", "#a6e3a1", "filled,bold"),     // Green
            NodeKind::Normal => ("box", "#89b4fa", "filled,rounded"),        // Blue
        }
    }

    fn border_color(kind: NodeKind) -> &'static str {
        match kind {
            NodeKind::SecurityRisk => "#d20f39",
            NodeKind::Redundant => "#fe640b",
            NodeKind::Overkill => "#df8e1d",
            NodeKind::Bloated => "#8839ef",
            NodeKind::DeadBranch => "#5c5f77",
            NodeKind::CriticalPath => "#40a02b",
            NodeKind::Normal => "#1e66f5",
        }
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}
