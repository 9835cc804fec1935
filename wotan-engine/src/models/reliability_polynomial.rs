//! RELIABILITY_POLYNOMIAL model (§4.7): runs ENUMERATE in `BY_PATH_HOPS` mode to get a
//! hop-indexed histogram of paths at the sink, then evaluates the reliability polynomial
//! `Σ_h source_buckets[h] × p^h × (1 − p)^(N−h)` with a single fixed per-node demand `p`.

use wotan_graph::id::Id;
use wotan_graph::NodeKind;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;
use crate::enumerate::{run_enumerate, FoldMode};
use crate::error::EngineError;
use crate::models::validate_probability;

/// `user_opts.use_routing_node_demand` must be `Some` before calling this (§4.7 "Validation");
/// callers are expected to have already run [`crate::config::UserOptions::validate`].
#[allow(clippy::too_many_arguments)]
pub fn run_reliability_polynomial(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    w_prime: u32,
    fixed_demand: f64,
    length_prob: f64,
    num_sinks: f64,
    sum_pin_probs: f64,
    num_conns_at_length: f64,
) -> Result<f64, EngineError> {
    run_enumerate(
        graph,
        arena,
        source,
        sink,
        w_prime,
        FoldMode::ByPathHops,
        length_prob,
        num_sinks,
        sum_pin_probs,
        num_conns_at_length,
    );

    let routing_nodes_touched = arena
        .nodes_visited
        .iter()
        .filter(|&&id| graph.node(id).kind == NodeKind::Chanx || graph.node(id).kind == NodeKind::Chany)
        .count() as u32;

    let p = 1.0 - fixed_demand;
    let histogram = &arena.topo[sink as usize].source_buckets;
    let mut total = 0.0;
    for h in 0..=histogram.max_weight().min(routing_nodes_touched) {
        let mass = histogram.get(h);
        if mass == 0.0 {
            continue;
        }
        total += mass * p.powi(h as i32) * (1.0 - p).powi((routing_nodes_touched - h) as i32);
    }
    validate_probability(total)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::distance_pass::compute_distances;
    use wotan_graph::grid::{BlockType, ClassKind, GridTile, PinClass};
    use wotan_graph::node::{Footprint, NodeKind};
    use wotan_graph::RrNode;

    fn edge(nodes: &mut [RrNode], from: usize, to: usize) {
        nodes[from].out_edges.push(to as Id);
        nodes[to].in_edges.push(from as Id);
    }

    fn flat_fabric(width: u32, height: u32) -> (Vec<GridTile>, Vec<BlockType>) {
        let grid = (0..width * height)
            .map(|_| GridTile { type_index: 0, width_offset: 0, height_offset: 0 })
            .collect();
        let block_types = vec![BlockType {
            name: "FILL".into(),
            classes: vec![
                PinClass::new(ClassKind::Driver, vec![0]),
                PinClass::new(ClassKind::Receiver, vec![1]),
            ],
            is_global_pin: vec![false, false],
        }];
        (grid, block_types)
    }

    #[test]
    fn zero_fixed_demand_gives_certain_routability() {
        let mut nodes = vec![
            RrNode::new(0, NodeKind::Source, Footprint::point(0, 0), 0, 0),
            RrNode::new(1, NodeKind::Chanx, Footprint::point(0, 0), 1, 0),
            RrNode::new(2, NodeKind::Sink, Footprint::point(0, 0), 0, 0),
        ];
        edge(&mut nodes, 0, 1);
        edge(&mut nodes, 1, 2);
        let (grid, block_types) = flat_fabric(2, 2);
        let mut graph = RoutingGraph::new(nodes, 2, 2, grid, block_types, 0);
        let mut arena = WorkerArena::new(graph.len(), 3);
        let w_prime = compute_distances(&graph, &mut arena, 0, 2, (0, 0), 3, 1.3).unwrap();

        let prob =
            run_reliability_polynomial(&mut graph, &mut arena, 0, 2, w_prime, 0.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        assert!((prob - 1.0).abs() < 1e-9);
    }
}
