//! Waterfall Sequencing
//!
//! Gantt-style timeline in trace order. Start offsets accumulate latencies
//! by input position and ignore the edges entirely: this is wall-clock
//! order, which may disagree with the dependency levels of the layout.

use crate::domain::graph::{FlagSet, Graph};

#[derive(Debug, Clone, PartialEq)]
pub struct WaterfallRow {
    pub id: String,
    /// Input position of the call
    pub index: usize,
    /// Sum of the latencies of every earlier row
    pub start_time: f64,
    pub latency: f64,
    pub cost: f64,
    pub flags: FlagSet,
}

impl WaterfallRow {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.latency
    }
}

pub fn sequence(graph: &Graph) -> Vec<WaterfallRow> {
    let mut cursor = 0.0;
    graph
        .calls
        .iter()
        .enumerate()
        .map(|(index, call)| {
            let row = WaterfallRow {
                id: call.id.clone(),
                index,
                start_time: cursor,
                latency: call.latency,
                cost: call.cost,
                flags: call.flags,
            };
            cursor += call.latency;
            row
        })
        .collect()
}
