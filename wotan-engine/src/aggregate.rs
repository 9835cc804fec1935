//! Shared mutable analysis results (§4.10, §5 "Shared mutable state").
//!
//! The mutex-protected running totals every worker folds a connection's outcome into, held only
//! for the short increment/push described in §5.

use std::cmp::Ordering;

use wotan_graph::pq::FixedSizeBoundedPq;
use wotan_graph::RoutingGraph;

fn ascending(a: &f64, b: &f64) -> Ordering {
    a.partial_cmp(b).expect("probabilities are never NaN")
}

/// Running totals across every analyzed connection, protected by a single mutex (§5).
pub struct AnalysisResults {
    pub desired_conns: u64,
    pub num_conns: u64,
    pub total_prob: f64,
    pub max_possible_total_prob: f64,
    /// `lowest_probs_pqs[ℓ]` retains the worst (smallest) sub-pair probabilities seen at
    /// connection length `ℓ`, index 0 unused (lengths start at 1) — same convention as
    /// [`crate::config::AnalysisSettings`].
    lowest_probs_pqs: Vec<FixedSizeBoundedPq<f64, fn(&f64, &f64) -> Ordering>>,
}

impl AnalysisResults {
    /// `conns_at_length[ℓ]` is the planned sub-pair count at each length (index 0 unused), used to
    /// size each length's retention queue to its worst decile (§8 scenario 6).
    pub fn new(desired_conns: u64, conns_at_length: &[u32]) -> Self {
        let lowest_probs_pqs = conns_at_length
            .iter()
            .map(|&n| {
                let capacity = ((n as f64) * 0.10).ceil().max(1.0) as usize;
                FixedSizeBoundedPq::new(capacity, ascending as fn(&f64, &f64) -> Ordering)
            })
            .collect();
        Self { desired_conns, num_conns: 0, total_prob: 0.0, max_possible_total_prob: 0.0, lowest_probs_pqs }
    }

    pub fn record_enumerate(&mut self) {
        self.num_conns += 1;
    }

    /// §4.8 step 3 "After PROBABILITY": folds one sub-pair's scaled probability into the running
    /// totals and pushes its normalized value into that length's worst-probability queue.
    pub fn record_probability(
        &mut self,
        length: usize,
        scaling: f64,
        prob_routable: f64,
        num_sources: f64,
        num_sinks: f64,
    ) {
        self.total_prob += scaling * prob_routable;
        self.max_possible_total_prob += scaling;
        let normalized = scaling * prob_routable / (num_sources * num_sinks);
        self.lowest_probs_pqs[length].push(normalized);
    }

    /// §4.10 `analyze_lowest_probs_pqs`: sums every retained entry across every length.
    pub fn lowest_probs_sum(&self) -> f64 {
        self.lowest_probs_pqs.iter().skip(1).flat_map(|pq| pq.iter()).sum()
    }

    pub fn normalized_total_prob(&self) -> f64 {
        if self.max_possible_total_prob == 0.0 {
            0.0
        } else {
            self.total_prob / self.max_possible_total_prob
        }
    }

    /// The caller-side normalization named in §4.10: the worst-decile sum divided by
    /// `max_possible_total_prob × 0.10`.
    pub fn pessimistic_prob(&self) -> f64 {
        if self.max_possible_total_prob == 0.0 {
            0.0
        } else {
            self.lowest_probs_sum() / (self.max_possible_total_prob * 0.10)
        }
    }

    pub fn fraction_enumerated(&self) -> f64 {
        if self.desired_conns == 0 {
            0.0
        } else {
            self.num_conns as f64 / self.desired_conns as f64
        }
    }
}

/// §4.10 `node_demand_metric`: average of the `k = ⌈0.05 × routing_node_count⌉` largest
/// (CHANX/CHANY-only) demand values, each scaled by `demand_multiplier`.
pub fn node_demand_metric(graph: &RoutingGraph, demand_multiplier: f64) -> f64 {
    top_k_routing_demand_average(graph, demand_multiplier, |d| d)
}

/// Same retention scheme as [`node_demand_metric`], but averaging the square of each scaled
/// demand value (§6 "squared demand").
pub fn node_demand_metric_squared(graph: &RoutingGraph, demand_multiplier: f64) -> f64 {
    top_k_routing_demand_average(graph, demand_multiplier, |d| d * d)
}

fn top_k_routing_demand_average(graph: &RoutingGraph, demand_multiplier: f64, transform: impl Fn(f64) -> f64) -> f64 {
    let routing_node_count = graph.iter_nodes().filter(|n| n.kind.is_routing()).count();
    if routing_node_count == 0 {
        return 0.0;
    }
    let k = ((routing_node_count as f64) * 0.05).ceil().max(1.0) as usize;
    let mut pq = FixedSizeBoundedPq::new(k, |a: &f64, b: &f64| b.partial_cmp(a).unwrap());
    for node in graph.iter_nodes().filter(|n| n.kind.is_routing()) {
        pq.push(transform(node.demand * demand_multiplier));
    }
    let size = pq.size();
    let sum: f64 = pq.iter().sum();
    sum / size as f64
}
