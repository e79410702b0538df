//! Workflow Graph Model
//!
//! Strict internal shape of one workflow execution snapshot: calls (model
//! invocations) and the directed edges between them. Everything downstream
//! of the normalizer works on these types only.

use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Analyst-assigned attribute of a call. Never derived by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallFlag {
    Redundant,
    Overkill,
    Bloated,
    SecurityRisk,
    /// Output is never consumed downstream
    DeadBranch,
    /// Externally marked as lying on the critical path
    CriticalPath,
}

impl CallFlag {
    pub const ALL: [CallFlag; 6] = [
        CallFlag::Redundant,
        CallFlag::Overkill,
        CallFlag::Bloated,
        CallFlag::SecurityRisk,
        CallFlag::DeadBranch,
        CallFlag::CriticalPath,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CallFlag::Redundant => "redundant",
            CallFlag::Overkill => "overkill",
            CallFlag::Bloated => "bloated",
            CallFlag::SecurityRisk => "security_risk",
            CallFlag::DeadBranch => "dead_branch",
            CallFlag::CriticalPath => "critical_path",
        }
    }
}

impl std::fmt::Display for CallFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The subset of flags that carry a cost penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasteCategory {
    Redundant,
    Overkill,
    Bloated,
}

impl WasteCategory {
    pub const ALL: [WasteCategory; 3] = [
        WasteCategory::Redundant,
        WasteCategory::Overkill,
        WasteCategory::Bloated,
    ];

    pub fn flag(self) -> CallFlag {
        match self {
            WasteCategory::Redundant => CallFlag::Redundant,
            WasteCategory::Overkill => CallFlag::Overkill,
            WasteCategory::Bloated => CallFlag::Bloated,
        }
    }
}

/// Zero or more flags attached to a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u8);

impl FlagSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, flag: CallFlag) {
        self.0 |= flag.bit();
    }

    pub fn with(mut self, flag: CallFlag) -> Self {
        self.insert(flag);
        self
    }

    pub fn contains(&self, flag: CallFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = CallFlag> + '_ {
        CallFlag::ALL.into_iter().filter(move |f| self.contains(*f))
    }

    /// Waste categories present in this set, in declaration order.
    pub fn waste_categories(&self) -> impl Iterator<Item = WasteCategory> + '_ {
        WasteCategory::ALL
            .into_iter()
            .filter(move |c| self.contains(c.flag()))
    }
}

impl FromIterator<CallFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = CallFlag>>(iter: I) -> Self {
        let mut set = FlagSet::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

/// A single agent/model invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Unique within a snapshot
    pub id: String,
    /// Display name (agent or step label)
    pub label: String,
    pub model: String,
    /// Currency amount, never negative
    pub cost: f64,
    /// Duration in milliseconds, never negative
    pub latency: f64,
    pub tokens_in: u64,
    pub tokens_out: u64,
    /// Ids of calls with a valid edge into this one, in edge order
    pub parents: Vec<String>,
    pub flags: FlagSet,
    /// Id of the call this one duplicates
    pub redundant_with_id: Option<String>,
    pub recommended_model: Option<String>,
    pub reason: Option<String>,
}

impl Call {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            model: String::new(),
            cost: 0.0,
            latency: 0.0,
            tokens_in: 0,
            tokens_out: 0,
            parents: Vec::new(),
            flags: FlagSet::empty(),
            redundant_with_id: None,
            recommended_model: None,
            reason: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = non_negative(cost);
        self
    }

    pub fn with_latency(mut self, latency: f64) -> Self {
        self.latency = non_negative(latency);
        self
    }

    pub fn with_tokens(mut self, tokens_in: u64, tokens_out: u64) -> Self {
        self.tokens_in = tokens_in;
        self.tokens_out = tokens_out;
        self
    }

    pub fn with_flag(mut self, flag: CallFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn redundant_with(mut self, id: impl Into<String>) -> Self {
        self.flags.insert(CallFlag::Redundant);
        self.redundant_with_id = Some(id.into());
        self
    }

    pub fn has(&self, flag: CallFlag) -> bool {
        self.flags.contains(flag)
    }
}

/// Directed data/control dependency between two calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// Overlap score in [0, 1]
    pub weight: Option<f64>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(if weight.is_nan() { 0.0 } else { weight.clamp(0.0, 1.0) });
        self
    }
}

/// An edge whose endpoints both resolved to calls, by input position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEdge {
    pub source: usize,
    pub target: usize,
    /// Position of the edge in `Graph::edges`
    pub edge: usize,
}

/// Immutable snapshot of one workflow execution.
///
/// Edges are kept exactly as supplied, dangling ones included; consumers go
/// through [`Graph::resolved_edges`] which skips them along with self-loops.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub calls: Vec<Call>,
    pub edges: Vec<Edge>,
    index: HashMap<String, usize>,
    resolved: Vec<ResolvedEdge>,
    dangling: usize,
}

impl Graph {
    /// Build a snapshot. Later calls reusing an earlier id are dropped;
    /// `parents` is recomputed from the valid edges.
    pub fn new(calls: Vec<Call>, edges: Vec<Edge>) -> Self {
        let mut index = HashMap::with_capacity(calls.len());
        let mut kept: Vec<Call> = Vec::with_capacity(calls.len());

        for mut call in calls {
            if index.contains_key(&call.id) {
                warn!(id = %call.id, "dropping call with duplicate id");
                continue;
            }
            call.parents.clear();
            index.insert(call.id.clone(), kept.len());
            kept.push(call);
        }

        let mut resolved = Vec::with_capacity(edges.len());
        let mut dangling = 0usize;
        for (i, edge) in edges.iter().enumerate() {
            match (index.get(&edge.source), index.get(&edge.target)) {
                (Some(&s), Some(&t)) if s != t => resolved.push(ResolvedEdge {
                    source: s,
                    target: t,
                    edge: i,
                }),
                (Some(_), Some(_)) => {}
                _ => dangling += 1,
            }
        }
        if dangling > 0 {
            warn!(dangling, "ignoring edges with unknown endpoints");
        }

        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        for r in &resolved {
            if seen.insert((r.source, r.target)) {
                let parent = kept[r.source].id.clone();
                kept[r.target].parents.push(parent);
            }
        }

        Self {
            calls: kept,
            edges,
            index,
            resolved,
            dangling,
        }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Input position of the call with this id.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Call> {
        self.position(id).map(|i| &self.calls[i])
    }

    /// Edges whose endpoints both exist and differ, in input order.
    pub fn resolved_edges(&self) -> &[ResolvedEdge] {
        &self.resolved
    }

    /// Number of edges skipped because an endpoint is unknown.
    pub fn dangling_edge_count(&self) -> usize {
        self.dangling
    }

    /// Outgoing adjacency by input position.
    pub fn successors(&self) -> Vec<Vec<usize>> {
        let mut adj = vec![Vec::new(); self.calls.len()];
        for r in &self.resolved {
            adj[r.source].push(r.target);
        }
        adj
    }

    /// Incoming adjacency by input position.
    pub fn predecessors(&self) -> Vec<Vec<usize>> {
        let mut radj = vec![Vec::new(); self.calls.len()];
        for r in &self.resolved {
            radj[r.target].push(r.source);
        }
        radj
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
