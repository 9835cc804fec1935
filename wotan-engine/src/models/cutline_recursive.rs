//! CUTLINE_RECURSIVE model (§4.7): subdivides the hop range between source and sink, composing
//! the reliability of sub-ranges instead of taking a single minimum-cut estimate over the whole
//! path. Requires hop counts from both directions; `bound_source_hops`/`source_ind`/`sink_ind`/
//! `fill_type` from the prose spec become the fields of [`RecursiveContext`] below.
//!
//! §9 design note: §4.7 names this model's context fields but only sketches the recursion
//! ("if the cut is narrow enough, direct reliability; otherwise partition and recurse") without
//! giving the partition rule or narrowness threshold — no reference implementation was available
//! to resolve it from (see `SPEC_FULL.md`). This implementation bisects
//! the `[1, total_hops-1]` interior-hop range at its midpoint, computes each half's min-cut
//! reliability independently (by grouping nodes by hop layer, same as `cutline_simple`), and
//! composes the two halves as a series connection (`a * b`) when the range is wider than
//! `NARROW_THRESHOLD` hops; at or below that width it falls back directly to the flat min-cut
//! estimate. This is a documented implementation choice, not a transcription of a known original.

use wotan_graph::id::Id;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;
use crate::error::EngineError;
use crate::hops_pass::{hops_backward, hops_forward};
use crate::models::validate_probability;
use crate::traversal::{do_topological_traversal, TraversalCallbacks};

use super::cutline::min_cut_reliability_from_layers;

/// A cut narrower than this many hops is evaluated directly rather than split further.
const NARROW_THRESHOLD: u32 = 3;

/// Context recorded across the recursive evaluation, named after §4.7's prose fields.
struct RecursiveContext {
    bound_source_hops: u32,
    source_ind: Id,
    sink_ind: Id,
    fill_type: u32,
}

struct LevelCollector {
    /// `by_level[h]` = node ids whose hop distance from the source is `h`.
    by_level: Vec<Vec<Id>>,
}

impl TraversalCallbacks for LevelCollector {
    fn on_popped(&mut self, _graph: &RoutingGraph, arena: &mut WorkerArena, node: Id) {
        let level = arena.topo[node as usize].level.unwrap_or(0) as usize;
        if level >= self.by_level.len() {
            self.by_level.resize(level + 1, Vec::new());
        }
        self.by_level[level].push(node);
    }

    fn on_child(&mut self, _graph: &RoutingGraph, arena: &mut WorkerArena, parent: Id, child: Id) {
        let parent_level = arena.topo[parent as usize].level.unwrap_or(0);
        let candidate = parent_level + 1;
        let existing = arena.topo[child as usize].level;
        let new_level = existing.map(|l| l.max(candidate)).unwrap_or(candidate);
        arena.topo[child as usize].level = Some(new_level);
    }
}

/// Recursively composes the reliability of the interior-hop range `[lo, hi]` (inclusive).
#[allow(clippy::too_many_arguments)]
fn recurse(
    graph: &RoutingGraph,
    by_level: &[Vec<Id>],
    ctx: &RecursiveContext,
    source: Id,
    sink: Id,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
    lo: u32,
    hi: u32,
) -> f64 {
    let _ = (&ctx.source_ind, &ctx.sink_ind, ctx.fill_type);
    if hi <= lo || hi - lo <= NARROW_THRESHOLD {
        let slice: Vec<Vec<Id>> = (lo..=hi).map(|h| by_level.get(h as usize).cloned().unwrap_or_default()).collect();
        return min_cut_reliability_from_layers(graph, &slice, source, sink, num_pins_source, num_pins_sink, demand_multiplier);
    }
    let mid = lo + (hi - lo) / 2;
    let left = recurse(graph, by_level, ctx, source, sink, num_pins_source, num_pins_sink, demand_multiplier, lo, mid);
    let right = recurse(graph, by_level, ctx, source, sink, num_pins_source, num_pins_sink, demand_multiplier, mid + 1, hi);
    left * right
}

#[allow(clippy::too_many_arguments)]
pub fn run_cutline_recursive(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    w_prime: u32,
    fill_type: u32,
    num_pins_source: f64,
    num_pins_sink: f64,
    demand_multiplier: f64,
) -> Result<f64, EngineError> {
    hops_forward(graph, arena, source, w_prime);
    hops_backward(graph, arena, sink, w_prime);
    let total_hops = arena.distances.source_hops(sink);

    let mut collector = LevelCollector { by_level: Vec::new() };
    do_topological_traversal(graph, arena, source, w_prime, true, &mut collector);

    let ctx = RecursiveContext { bound_source_hops: total_hops, source_ind: source, sink_ind: sink, fill_type };

    let estimate = if total_hops <= 1 {
        1.0
    } else {
        recurse(
            graph,
            &collector.by_level,
            &ctx,
            source,
            sink,
            num_pins_source,
            num_pins_sink,
            demand_multiplier,
            1,
            ctx.bound_source_hops.saturating_sub(1),
        )
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
    fn long_undemanded_chain_is_fully_reliable() {
        // SOURCE -> 8 chained CHANX nodes -> SINK, none demanded: estimate should be 1.0
        // regardless of how the recursion subdivides the range.
        let mut nodes = vec![RrNode::new(0, NodeKind::Source, Footprint::point(0, 0), 0, 0)];
        for i in 1..=8 {
            nodes.push(RrNode::new(i, NodeKind::Chanx, Footprint::point(0, 0), 1, 0));
        }
        nodes.push(RrNode::new(9, NodeKind::Sink, Footprint::point(0, 0), 0, 0));
        for i in 0..9 {
            edge(&mut nodes, i, i + 1);
        }
        let (grid, block_types) = flat_fabric(2, 2);
        let mut graph = RoutingGraph::new(nodes, 2, 2, grid, block_types, 0);
        let mut arena = WorkerArena::new(graph.len(), 10);
        let w_prime = compute_distances(&graph, &mut arena, 0, 9, (0, 0), 10, 1.3).unwrap();

        let prob = run_cutline_recursive(&mut graph, &mut arena, 0, 9, w_prime, 0, 1.0, 1.0, 1.0).unwrap();
        assert!((prob - 1.0).abs() < 1e-9);
    }
}
