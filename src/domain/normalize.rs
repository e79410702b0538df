//! Snapshot Normalization
//!
//! Maps loosely-typed call/edge records (mixed key casing, optional fields,
//! numbers-as-strings) onto the strict [`Graph`] model. Never fails: unusable
//! records are skipped and missing values take their defaults.

use crate::domain::graph::{Call, CallFlag, Edge, Graph};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::warn;

const ID: &[&str] = &["id", "run_id", "call_id"];
const LABEL: &[&str] = &["label", "agent", "agent_name", "name"];
const MODEL: &[&str] = &["model"];
const COST: &[&str] = &["cost"];
const LATENCY: &[&str] = &["latency", "latency_ms"];
const TOKENS_IN: &[&str] = &["tokens_in", "prompt_tokens"];
const TOKENS_OUT: &[&str] = &["tokens_out", "completion_tokens"];
const REDUNDANT_WITH: &[&str] = &["redundant_with_id", "redundant_with"];
const RECOMMENDED_MODEL: &[&str] = &["recommended_model"];
const REASON: &[&str] = &["reason"];
const NODE_TYPE: &[&str] = &["node_type"];

const SOURCE: &[&str] = &["source", "source_id", "from"];
const TARGET: &[&str] = &["target", "target_id", "to"];
const WEIGHT: &[&str] = &["weight", "overlap", "overlap_score"];

const CALL_LISTS: &[&str] = &["calls", "events", "nodes"];
const EDGE_LISTS: &[&str] = &["edges", "call_edges", "links"];

fn flag_keys(flag: CallFlag) -> &'static [&'static str] {
    match flag {
        CallFlag::Redundant => &["is_redundant"],
        CallFlag::Overkill => &["is_overkill"],
        CallFlag::Bloated => &["is_bloated"],
        CallFlag::SecurityRisk => &["has_security_risk"],
        CallFlag::DeadBranch => &["is_dead_branch"],
        CallFlag::CriticalPath => &["is_critical_path"],
    }
}

/// `tokensIn`, `tokens_in` and `Tokens-In` all fold to `tokensin`.
fn fold_key(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Case-insensitive view over one JSON object.
struct Fields<'a> {
    map: HashMap<String, &'a Value>,
}

impl<'a> Fields<'a> {
    fn new(obj: &'a Map<String, Value>) -> Self {
        let mut map = HashMap::with_capacity(obj.len());
        for (k, v) in obj {
            map.entry(fold_key(k)).or_insert(v);
        }
        Self { map }
    }

    fn value(&self, aliases: &[&str]) -> Option<&'a Value> {
        aliases
            .iter()
            .filter_map(|a| self.map.get(&fold_key(a)).copied())
            .find(|v| !v.is_null())
    }

    fn string(&self, aliases: &[&str]) -> Option<String> {
        match self.value(aliases)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn number(&self, aliases: &[&str]) -> f64 {
        let raw = match self.value(aliases) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match raw {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => 0.0,
        }
    }

    fn count(&self, aliases: &[&str]) -> u64 {
        match self.value(aliases) {
            Some(Value::Number(n)) => n
                .as_u64()
                .unwrap_or_else(|| n.as_f64().map(f64_to_count).unwrap_or(0)),
            Some(Value::String(s)) => s.trim().parse::<f64>().map(f64_to_count).unwrap_or(0),
            _ => 0,
        }
    }

    fn flag(&self, aliases: &[&str]) -> bool {
        match self.value(aliases) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
            Some(Value::String(s)) => {
                matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1")
            }
            _ => false,
        }
    }
}

fn f64_to_count(v: f64) -> u64 {
    if v.is_finite() && v > 0.0 {
        v.floor() as u64
    } else {
        0
    }
}

/// Normalize one call record. `position` is its 0-based place in the input.
pub fn normalize_call(position: usize, record: &Value) -> Option<Call> {
    let Value::Object(obj) = record else {
        warn!(position, "skipping call record that is not an object");
        return None;
    };
    let fields = Fields::new(obj);

    let id = fields
        .string(ID)
        .unwrap_or_else(|| format!("call_{}", position + 1));
    let label = fields.string(LABEL).unwrap_or_else(|| id.clone());

    let mut call = Call::new(id)
        .with_label(label)
        .with_model(fields.string(MODEL).unwrap_or_default())
        .with_cost(fields.number(COST))
        .with_latency(fields.number(LATENCY))
        .with_tokens(fields.count(TOKENS_IN), fields.count(TOKENS_OUT));

    for flag in CallFlag::ALL {
        if fields.flag(flag_keys(flag)) {
            call.flags.insert(flag);
        }
    }
    match fields.string(NODE_TYPE).map(|s| s.to_lowercase()).as_deref() {
        Some("dead") => call.flags.insert(CallFlag::DeadBranch),
        Some("critical") => call.flags.insert(CallFlag::CriticalPath),
        _ => {}
    }

    call.redundant_with_id = fields.string(REDUNDANT_WITH);
    call.recommended_model = fields.string(RECOMMENDED_MODEL);
    call.reason = fields.string(REASON);
    Some(call)
}

/// Normalize one edge record. Missing endpoints become empty ids, which
/// never resolve, so the edge stays in the list but is inert.
pub fn normalize_edge(record: &Value) -> Option<Edge> {
    let Value::Object(obj) = record else {
        warn!("skipping edge record that is not an object");
        return None;
    };
    let fields = Fields::new(obj);
    let mut edge = Edge::new(
        fields.string(SOURCE).unwrap_or_default(),
        fields.string(TARGET).unwrap_or_default(),
    );
    if fields.value(WEIGHT).is_some() {
        edge = edge.with_weight(fields.number(WEIGHT));
    }
    Some(edge)
}

/// Build a graph from raw call and edge records.
pub fn build_graph(calls: &[Value], edges: &[Value]) -> Graph {
    let calls = calls
        .iter()
        .enumerate()
        .filter_map(|(i, v)| normalize_call(i, v))
        .collect();
    let edges = edges.iter().filter_map(normalize_edge).collect();
    Graph::new(calls, edges)
}

/// Build a graph from a whole snapshot document.
///
/// Accepts an object holding a call list and an edge list, or a bare array
/// of calls. Anything else yields an empty graph.
pub fn graph_from_document(document: &Value) -> Graph {
    match document {
        Value::Array(calls) => build_graph(calls, &[]),
        Value::Object(obj) => {
            let fields = Fields::new(obj);
            let calls = fields
                .value(CALL_LISTS)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let edges = fields
                .value(EDGE_LISTS)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            build_graph(calls, edges)
        }
        _ => {
            warn!("snapshot document is neither an object nor an array");
            Graph::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mixed_casing_and_aliases() {
        let call = normalize_call(
            0,
            &json!({
                "run_id": "r1",
                "agent": "Planner",
                "Model": "gpt-4o",
                "cost": "0.25",
                "latency_ms": 120,
                "TokensIn": 900,
                "completion_tokens": 12.7,
                "isRedundant": true,
                "is_overkill": "true",
                "hasSecurityRisk": 1,
                "redundantWithId": "r0",
                "recommended_model": "gpt-4o-mini"
            }),
        )
        .unwrap();

        assert_eq!(call.id, "r1");
        assert_eq!(call.label, "Planner");
        assert_eq!(call.model, "gpt-4o");
        assert_eq!(call.cost, 0.25);
        assert_eq!(call.latency, 120.0);
        assert_eq!(call.tokens_in, 900);
        assert_eq!(call.tokens_out, 12);
        assert!(call.has(CallFlag::Redundant));
        assert!(call.has(CallFlag::Overkill));
        assert!(call.has(CallFlag::SecurityRisk));
        assert!(!call.has(CallFlag::Bloated));
        assert_eq!(call.redundant_with_id.as_deref(), Some("r0"));
        assert_eq!(call.recommended_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_missing_fields_default() {
        let call = normalize_call(4, &json!({})).unwrap();
        assert_eq!(call.id, "call_5");
        assert_eq!(call.label, "call_5");
        assert_eq!(call.cost, 0.0);
        assert_eq!(call.tokens_in, 0);
        assert!(call.flags.is_empty());
        assert!(normalize_call(0, &json!("nope")).is_none());
    }

    #[test]
    fn test_node_type_sets_graph_flags() {
        let dead = normalize_call(0, &json!({"id": "a", "node_type": "dead"})).unwrap();
        let critical = normalize_call(1, &json!({"id": "b", "nodeType": "Critical"})).unwrap();
        assert!(dead.has(CallFlag::DeadBranch));
        assert!(critical.has(CallFlag::CriticalPath));
    }

    #[test]
    fn test_negative_and_garbage_numbers() {
        let call = normalize_call(0, &json!({"id": 7, "cost": -1.5, "latency": "slow"})).unwrap();
        assert_eq!(call.id, "7");
        assert_eq!(call.cost, 0.0);
        assert_eq!(call.latency, 0.0);
    }

    #[test]
    fn test_document_with_dangling_edges() {
        let graph = graph_from_document(&json!({
            "events": [{"id": "a"}, {"id": "b"}],
            "callEdges": [
                {"source_id": "a", "target_id": "b", "overlap_score": 0.4},
                {"from": "a", "to": "missing"},
                {"target": "b"}
            ]
        }));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.edges[0].weight, Some(0.4));
        assert_eq!(graph.resolved_edges().len(), 1);
        assert_eq!(graph.dangling_edge_count(), 2);
    }

    #[test]
    fn test_bare_array_and_scalar_documents() {
        assert_eq!(graph_from_document(&json!([{"id": "x"}])).len(), 1);
        assert!(graph_from_document(&json!(42)).is_empty());
    }
}
