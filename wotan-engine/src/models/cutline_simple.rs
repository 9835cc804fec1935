//! CUTLINE_SIMPLE model (§4.7): the same minimum-cut reliability estimate as
//! [`crate::models::cutline`], but with layer membership recorded into a single
//! pre-allocated `Vec<Vec<Id>>` (sized from a hop-count pass run up front) instead of growing a
//! level-keyed map on the fly.

use wotan_graph::id::Id;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;
use crate::error::EngineError;
use crate::hops_pass::hops_forward;
use crate::models::validate_probability;
use crate::traversal::{do_topological_traversal, TraversalCallbacks};

use super::cutline::min_cut_reliability_from_layers;

struct CutlineSimple {
    source: Id,
    sink: Id,
    num_pins_source: f64,
    num_pins_sink: f64,
    /// `layers[hop]` = node ids assigned to hop distance `hop` from the source.
    layers: Vec<Vec<Id>>,
}

impl TraversalCallbacks for CutlineSimple {
    fn on_popped(&mut self, _graph: &RoutingGraph, arena: &mut WorkerArena, node: Id) {
        // Layer indices cover only the *interior* hops between source and sink: level 0 (the
        // source) and the sink's own level both fall outside `0..layers.len()` by construction.
        let level = arena.topo[node as usize].level.unwrap_or(0) as usize;
        if let Some(idx) = level.checked_sub(1) {
            if idx < self.layers.len() {
                self.layers[idx].push(node);
            }
        }
    }

    fn on_child(&mut self, _graph: &RoutingGraph, arena: &mut WorkerArena, parent: Id, child: Id) {
        let parent_level = arena.topo[parent as usize].level.unwrap_or(0);
        let candidate = parent_level + 1;
        let existing = arena.topo[child as usize].level;
        let new_level = existing.map(|l| l.max(candidate)).unwrap_or(candidate);
        arena.topo[child as usize].level = Some(new_level);
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run_cutline_simple(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    w_prime: u32,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
) -> Result<f64, EngineError> {
    hops_forward(graph, arena, source, w_prime);
    let total_hops = arena.distances.source_hops(sink);
    if total_hops <= 1 {
        // Direct source->sink edge: no interior hop layer exists for a cut to form over.
        return validate_probability(1.0);
    }
    let layer_count = (total_hops - 1) as usize;

    let mut model = CutlineSimple {
        source,
        sink,
        num_pins_source,
        num_pins_sink,
        layers: vec![Vec::new(); layer_count],
    };
    do_topological_traversal(graph, arena, source, w_prime, true, &mut model);

    let estimate = min_cut_reliability_from_layers(
        graph,
        &model.layers,
        model.source,
        model.sink,
        model.num_pins_source,
        model.num_pins_sink,
        demand_multiplier,
    );
    validate_probability(estimate)
}
