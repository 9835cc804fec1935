//! CUTLINE model (§4.7): classic reliability-via-cutset estimate. The driver assigns every node
//! a hop-distance "level" (source = 0, each edge crossed adds 1); at each level the probability
//! that the cut is entirely blocked is the product of `(1 − P(v free))` over nodes at that level,
//! and the connection's estimated reliability is the minimum, across levels, of
//! `1 − Π(1 − P(v free))`.

use wotan_graph::id::Id;
use wotan_graph::AHashMap;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;
use crate::error::EngineError;
use crate::models::{adjusted_demand, free_probability, validate_probability};
use crate::traversal::{do_topological_traversal, TraversalCallbacks};

struct Cutline {
    source: Id,
    sink: Id,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
    /// `level_block_product[level]` = running product of `(1 − P(v free))` over nodes assigned
    /// to `level` so far.
    level_block_product: AHashMap<u32, f64>,
}

impl Cutline {
    fn block_probability(&mut self, graph: &RoutingGraph, node: Id, level: u32) {
        let demand = graph.node(node).demand * self.demand_multiplier;
        let history = &graph.node(node).path_count_history;
        let adjusted = adjusted_demand(
            demand,
            self.source,
            self.sink,
            self.num_pins_source,
            self.num_pins_sink,
            history,
        );
        let blocked = 1.0 - free_probability(adjusted);
        let entry = self.level_block_product.entry(level).or_insert(1.0);
        *entry *= blocked;
    }
}

impl TraversalCallbacks for Cutline {
    fn on_popped(&mut self, graph: &RoutingGraph, arena: &mut WorkerArena, node: Id) {
        let level = arena.topo[node as usize].level.get_or_insert(0);
        let level = *level;
        self.block_probability(graph, node, level);
    }

    fn on_child(&mut self, _graph: &RoutingGraph, arena: &mut WorkerArena, parent: Id, child: Id) {
        let parent_level = arena.topo[parent as usize].level.unwrap_or(0);
        let candidate = parent_level + 1;
        let existing = arena.topo[child as usize].level;
        let new_level = existing.map(|l| l.max(candidate)).unwrap_or(candidate);
        arena.topo[child as usize].level = Some(new_level);
    }
}

/// The minimum, across recorded levels, of `1 − Π(1 − P(v free))` (§4.7).
pub(crate) fn min_cut_reliability(level_block_product: &AHashMap<u32, f64>) -> f64 {
    level_block_product
        .values()
        .map(|&blocked| 1.0 - blocked)
        .fold(f64::INFINITY, f64::min)
}

/// Same estimate as [`min_cut_reliability`], computed from an explicit per-layer node-id list
/// instead of an incrementally-built map — the shape [`crate::models::cutline_simple`] needs.
#[allow(clippy::too_many_arguments)]
pub(crate) fn min_cut_reliability_from_layers(
    graph: &RoutingGraph,
    layers: &[Vec<Id>],
    source: Id,
    sink: Id,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
) -> f64 {
    let mut worst = 1.0_f64;
    for layer in layers {
        if layer.is_empty() {
            continue;
        }
        let mut blocked = 1.0;
        for &node in layer {
            let demand = graph.node(node).demand * demand_multiplier;
            let history = &graph.node(node).path_count_history;
            let adjusted = adjusted_demand(demand, source, sink, num_pins_source, num_pins_sink, history);
            blocked *= 1.0 - free_probability(adjusted);
        }
        worst = worst.min(1.0 - blocked);
    }
    worst
}

#[allow(clippy::too_many_arguments)]
pub fn run_cutline(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    w_prime: u32,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
) -> Result<f64, EngineError> {
    let mut model = Cutline {
        source,
        sink,
        num_pins_source,
        num_pins_sink,
        demand_multiplier,
        level_block_product: AHashMap::default(),
    };
    do_topological_traversal(graph, arena, source, w_prime, true, &mut model);

    let estimate = if model.level_block_product.is_empty() {
        1.0
    } else {
        min_cut_reliability(&model.level_block_product)
    };
    validate_probability(estimate)
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
    fn two_parallel_branches_are_more_reliable_than_either_alone() {
        // SOURCE(0) -> A(1) -> SINK(3); SOURCE(0) -> B(2) -> SINK(3); A and B both fully demanded
        // except one, so the shared cut level between them should not be fully blocking.
        let mut nodes = vec![
            RrNode::new(0, NodeKind::Source, Footprint::point(0, 0), 0, 0),
            RrNode::new(1, NodeKind::Chanx, Footprint::point(0, 0), 1, 0),
            RrNode::new(2, NodeKind::Chanx, Footprint::point(0, 0), 1, 0),
            RrNode::new(3, NodeKind::Sink, Footprint::point(0, 0), 0, 0),
        ];
        edge(&mut nodes, 0, 1);
        edge(&mut nodes, 0, 2);
        edge(&mut nodes, 1, 3);
        edge(&mut nodes, 2, 3);
        let (grid, block_types) = flat_fabric(2, 2);
        let mut graph = RoutingGraph::new(nodes, 2, 2, grid, block_types, 0);
        graph.node_mut(1).demand = 1.0; // branch A fully blocked
        let mut arena = WorkerArena::new(graph.len(), 2);
        let w_prime = compute_distances(&graph, &mut arena, 0, 3, (0, 0), 2, 1.0).unwrap();

        let prob = run_cutline(&mut graph, &mut arena, 0, 3, w_prime, 1.0, 1.0, 1.0).unwrap();
        // The A/B level isn't fully blocked (B is free), so reliability there is > 0.
        assert!(prob > 0.0);
    }
}
