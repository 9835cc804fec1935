//! ENUMERATE model (§4.6): two driver passes that fill bucket arrays with scaled path counts and
//! accumulate each touched node's `demand`.
//!
//! Grounded on the fold-parent-into-child shift used by a BDD path-counter's
//! `increment_distribution` operation, generalized from unit-weight shifts to arbitrary node
//! weights via [`wotan_graph::state::WeightBuckets::fold_shifted_into`].

use wotan_graph::id::Id;
use wotan_graph::NodeKind;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;
use crate::traversal::{do_topological_traversal, TraversalCallbacks};

/// Which node-weight unit the forward demand-accumulation pass folds buckets by: a node's own
/// weight (the default), or a count of routing nodes used (used by RELIABILITY_POLYNOMIAL, §4.6
/// "Mode BY_PATH_HOPS"). BY_PATH_HOPS only counts hops into CHANX/CHANY nodes — entering the
/// terminal SOURCE/SINK contributes nothing — so the resulting histogram index lines up with the
/// "routing nodes touched" count the reliability polynomial sums over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldMode {
    ByPathWeight,
    ByPathHops,
}

impl FoldMode {
    fn shift_for(self, node_weight: u32, node_kind: NodeKind) -> u32 {
        match self {
            FoldMode::ByPathWeight => node_weight,
            FoldMode::ByPathHops => {
                if matches!(node_kind, NodeKind::Chanx | NodeKind::Chany) {
                    1
                } else {
                    0
                }
            }
        }
    }
}

struct BackwardFill {
    mode: FoldMode,
}

impl TraversalCallbacks for BackwardFill {
    fn on_popped(&mut self, _graph: &RoutingGraph, _arena: &mut WorkerArena, _node: Id) {}

    fn on_child(&mut self, graph: &RoutingGraph, arena: &mut WorkerArena, parent: Id, child: Id) {
        let child_node = graph.node(child);
        let shift = self.mode.shift_for(child_node.weight, child_node.kind);
        let parent_buckets = arena.topo[parent as usize].sink_buckets.clone();
        arena.topo[child as usize].sink_buckets.fold_shifted_into(&parent_buckets, shift);
    }
}

/// Collects `(node, amount)` demand contributions instead of writing them into the graph directly
/// (§5 "Isolation"): multiple workers may run ENUMERATE concurrently over overlapping fabric, so
/// the actual `RrNode::demand`/`path_count_history` writes are deferred to a single short-held
/// lock in `analyze_connection` rather than raced across threads mid-traversal.
struct ForwardFillAndAccumulate {
    mode: FoldMode,
    w_prime: u32,
    contributions: Vec<(Id, f64)>,
}

impl TraversalCallbacks for ForwardFillAndAccumulate {
    fn on_popped(&mut self, graph: &RoutingGraph, arena: &mut WorkerArena, node: Id) {
        let node_weight = graph.node(node).weight;
        let amount = {
            let topo = &arena.topo[node as usize];
            topo.source_buckets.convolve_total_up_to(&topo.sink_buckets, node_weight, self.w_prime)
        };
        if amount == 0.0 {
            return;
        }
        self.contributions.push((node, amount));
    }

    fn on_child(&mut self, graph: &RoutingGraph, arena: &mut WorkerArena, parent: Id, child: Id) {
        let child_node = graph.node(child);
        let shift = self.mode.shift_for(child_node.weight, child_node.kind);
        let parent_buckets = arena.topo[parent as usize].source_buckets.clone();
        arena.topo[child as usize].source_buckets.fold_shifted_into(&parent_buckets, shift);
    }
}

/// Runs both ENUMERATE passes for one (source, sink) connection and returns the `(node, amount)`
/// demand contribution of every node on a path within `w_prime` (§4.6). The caller is responsible
/// for applying these into `RrNode::demand`/`path_count_history` (§4.8, §5 "Isolation").
///
/// `length_prob`/`num_sinks`/`sum_pin_probs`/`num_conns_at_length` are the scaling inputs derived
/// by `analyze_connection` (§4.8) from pin-class sizes and the user's length probability table.
#[allow(clippy::too_many_arguments)]
pub fn run_enumerate(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    w_prime: u32,
    mode: FoldMode,
    length_prob: f64,
    num_sinks: f64,
    sum_pin_probs: f64,
    num_conns_at_length: f64,
) -> Vec<(Id, f64)> {
    arena.topo[sink as usize].sink_buckets.set(0, 1.0);
    let mut backward = BackwardFill { mode };
    do_topological_traversal(graph, arena, sink, w_prime, false, &mut backward);

    let source_weight = graph.node(source).weight;
    let num_paths = arena.topo[source as usize].sink_buckets.total_up_to(w_prime.saturating_sub(source_weight));
    let scaled_start = if num_paths > 0.0 {
        (length_prob * num_sinks * sum_pin_probs) / (num_conns_at_length * num_paths)
    } else {
        0.0
    };

    arena.topo[source as usize].source_buckets.set(0, scaled_start);
    let mut forward = ForwardFillAndAccumulate { mode, w_prime, contributions: Vec::new() };
    do_topological_traversal(graph, arena, source, w_prime, true, &mut forward);
    forward.contributions
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
    fn single_edge_demand_equals_scaling_on_every_node() {
        // §8 scenario 1: A(SOURCE,w=0) -> B(CHANX,w=1) -> C(SINK,w=0), one path of weight 1.
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

        let contributions =
            run_enumerate(&mut graph, &mut arena, 0, 2, w_prime, FoldMode::ByPathWeight, 1.0, 1.0, 1.0, 1.0);
        for (node, amount) in contributions {
            let rr_node = graph.node_mut(node);
            rr_node.demand += amount;
            rr_node.record_path_count(0, amount);
            rr_node.record_path_count(2, amount);
        }

        // Exactly one path, scaling == 1.0, so every node on it receives demand 1.0.
        assert!((graph.node(1).demand - 1.0).abs() < 1e-9);
        assert_eq!(graph.node(1).path_count_history[&0], 1.0);
        assert_eq!(graph.node(1).path_count_history[&2], 1.0);
    }

    #[test]
    fn zero_conns_at_length_is_treated_as_zero_paths_not_a_panic() {
        let nodes = vec![
            RrNode::new(0, NodeKind::Source, Footprint::point(0, 0), 0, 0),
            RrNode::new(1, NodeKind::Sink, Footprint::point(0, 0), 0, 0),
        ];
        // No edge at all: source and sink disconnected within w.
        let (grid, block_types) = flat_fabric(2, 2);
        let mut graph = RoutingGraph::new(nodes, 2, 2, grid, block_types, 0);
        let mut arena = WorkerArena::new(graph.len(), 2);
        let w_prime = compute_distances(&graph, &mut arena, 0, 1, (0, 0), 2, 1.3).unwrap();

        run_enumerate(&mut graph, &mut arena, 0, 1, w_prime, FoldMode::ByPathWeight, 1.0, 1.0, 1.0, 1.0);
        assert_eq!(graph.node(0).demand, 0.0);
        assert_eq!(graph.node(1).demand, 0.0);
    }
}
