//! BFS hop counting over the legal subgraph (§4.4).
//!
//! Runs strictly after [`crate::distance_pass::compute_distances`]: only nodes already marked
//! legal (both forward- and backward-reachable within `w_prime`, per
//! `SsDistances::is_legal`) are ever enqueued, so a node's hop count is its distance within the
//! pruned subgraph the distance pass already committed to, not the full graph.

use std::collections::VecDeque;

use wotan_graph::id::Id;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;

/// Forward hop-count BFS from `source`, over edges whose target is legal at `w_prime`.
pub fn hops_forward(graph: &RoutingGraph, arena: &mut WorkerArena, source: Id, w_prime: u32) {
    let mut queue = VecDeque::new();
    arena.distances.set_source_hops(source, 0);
    arena.mark_touched(source);
    queue.push_back(source);

    while let Some(node) = queue.pop_front() {
        let hops_here = arena.distances.source_hops(node);
        for &child in graph.node(node).edges(true) {
            if arena.distances.visited_from_source_hops(child) {
                continue;
            }
            let child_weight = graph.node(child).weight;
            if !arena.distances.is_legal(child, child_weight, w_prime) {
                continue;
            }
            arena.distances.set_source_hops(child, hops_here + 1);
            arena.mark_touched(child);
            queue.push_back(child);
        }
    }
}

/// Backward hop-count BFS from `sink`, over reversed edges whose source is legal at `w_prime`.
pub fn hops_backward(graph: &RoutingGraph, arena: &mut WorkerArena, sink: Id, w_prime: u32) {
    let mut queue = VecDeque::new();
    arena.distances.set_sink_hops(sink, 0);
    arena.mark_touched(sink);
    queue.push_back(sink);

    while let Some(node) = queue.pop_front() {
        let hops_here = arena.distances.sink_hops(node);
        for &child in graph.node(node).edges(false) {
            if arena.distances.visited_from_sink_hops(child) {
                continue;
            }
            let child_weight = graph.node(child).weight;
            if !arena.distances.is_legal(child, child_weight, w_prime) {
                continue;
            }
            arena.distances.set_sink_hops(child, hops_here + 1);
            arena.mark_touched(child);
            queue.push_back(child);
        }
    }
}
