//! Summary-metric reporting (§6: "The engine emits to stdout summary metrics"). No persistent
//! state and no network I/O — the caller decides whether/where `AnalysisReport`'s `Display`
//! output is printed.

use std::fmt;

use console::style;
use wotan_graph::RoutingGraph;

use crate::aggregate::{node_demand_metric, node_demand_metric_squared, AnalysisResults};

/// The five stdout summary metrics named in §6, snapshotted once an analysis run has finished.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisReport {
    pub normalized_total_prob: f64,
    pub pessimistic_prob: f64,
    pub normalized_demand: f64,
    pub squared_demand: f64,
    pub fraction_enumerated: f64,
}

impl AnalysisReport {
    /// Derives the report from a finished run's [`AnalysisResults`] and the graph it analyzed,
    /// applying `demand_multiplier` the same way every PROBABILITY model reads it.
    pub fn new(results: &AnalysisResults, graph: &RoutingGraph, demand_multiplier: f64) -> Self {
        Self {
            normalized_total_prob: results.normalized_total_prob(),
            pessimistic_prob: results.pessimistic_prob(),
            normalized_demand: node_demand_metric(graph, demand_multiplier),
            squared_demand: node_demand_metric_squared(graph, demand_multiplier),
            fraction_enumerated: results.fraction_enumerated(),
        }
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", style("routability analysis").green().bold())?;
        writeln!(f, "  normalized total probability : {:.6}", self.normalized_total_prob)?;
        writeln!(f, "  pessimistic probability      : {:.6}", self.pessimistic_prob)?;
        writeln!(f, "  normalized demand            : {:.6}", self.normalized_demand)?;
        writeln!(f, "  squared demand               : {:.6}", self.squared_demand)?;
        writeln!(f, "  fraction enumerated          : {:.2}%", self.fraction_enumerated * 100.0)?;
        Ok(())
    }
}
