//! PROPAGATE model (§4.7): probability mass folds forward from the source, scaled at each edge
//! by the child's free probability.

use wotan_graph::id::Id;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;
use crate::error::EngineError;
use crate::models::{adjusted_demand, free_probability, validate_probability};
use crate::traversal::{do_topological_traversal, TraversalCallbacks};

struct Propagate {
    source: Id,
    sink: Id,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
}

impl TraversalCallbacks for Propagate {
    fn on_popped(&mut self, _graph: &RoutingGraph, _arena: &mut WorkerArena, _node: Id) {}

    fn on_child(&mut self, graph: &RoutingGraph, arena: &mut WorkerArena, parent: Id, child: Id) {
        let child_weight = graph.node(child).weight;
        let child_demand = graph.node(child).demand * self.demand_multiplier;
        let history = &graph.node(child).path_count_history;
        let adjusted = adjusted_demand(
            child_demand,
            self.source,
            self.sink,
            self.num_pins_source,
            self.num_pins_sink,
            history,
        );
        let p_free = free_probability(adjusted);

        let parent_buckets = arena.topo[parent as usize].source_buckets.scaled(p_free);
        arena.topo[child as usize].source_buckets.fold_shifted_into(&parent_buckets, child_weight);
    }
}

/// Runs the PROPAGATE traversal and returns `P(routable)` for this connection (§4.7).
#[allow(clippy::too_many_arguments)]
pub fn run_propagate(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    w_prime: u32,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
) -> Result<f64, EngineError> {
    arena.topo[source as usize].source_buckets.set(0, 1.0);
    let mut model = Propagate { source, sink, num_pins_source, num_pins_sink, demand_multiplier };
    do_topological_traversal(graph, arena, source, w_prime, true, &mut model);

    let prob = arena.topo[sink as usize].source_buckets.total_up_to(w_prime);
    validate_probability(prob)
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
    fn zero_demand_path_is_certainly_routable() {
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

        let prob = run_propagate(&mut graph, &mut arena, 0, 2, w_prime, 1.0, 1.0, 1.0).unwrap();
        assert!((prob - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fully_demanded_node_blocks_routing() {
        let mut nodes = vec![
            RrNode::new(0, NodeKind::Source, Footprint::point(0, 0), 0, 0),
            RrNode::new(1, NodeKind::Chanx, Footprint::point(0, 0), 1, 0),
            RrNode::new(2, NodeKind::Sink, Footprint::point(0, 0), 0, 0),
        ];
        edge(&mut nodes, 0, 1);
        edge(&mut nodes, 1, 2);
        let (grid, block_types) = flat_fabric(2, 2);
        let mut graph = RoutingGraph::new(nodes, 2, 2, grid, block_types, 0);
        graph.node_mut(1).demand = 1.0;
        let mut arena = WorkerArena::new(graph.len(), 3);
        let w_prime = compute_distances(&graph, &mut arena, 0, 2, (0, 0), 3, 1.3).unwrap();

        let prob = run_propagate(&mut graph, &mut arena, 0, 2, w_prime, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(prob, 0.0);
    }
}
