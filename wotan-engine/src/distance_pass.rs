//! Bidirectional bounded Dijkstra + geometric pruning + `W'` tightening (§4.3).
//!
//! Grounded on a relax-then-prune, touched-nodes-tracked-for-cleanup traversal shape: both walk an
//! arena node-by-node, mutate per-node state in place, and leave cleanup to a side list rather
//! than rescanning.

use wotan_graph::id::Id;
use wotan_graph::pq::BoundedPriorityQueue;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;
use crate::error::EngineError;

/// Which edge list a pass walks "forward" along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn out_edges(self) -> bool {
        matches!(self, Direction::Forward)
    }
}

/// Geometric lower bound on remaining path weight from `node`'s footprint to `(destx, desty)`
/// (§4.3). `delta` is 1 iff the node overlaps the destination's column or row, checked
/// asymmetrically by node kind per the spec's explicit open question (preserve the x/y
/// asymmetry, do not "fix" it to be symmetric): a CHANX node runs along a row at a fixed y, so
/// only its column (x-range) overlap with `destx` counts; a CHANY node runs along a column at a
/// fixed x, so only its row (y-range) overlap with `desty` counts. Any other node kind (terminal,
/// single-tile) falls back to checking both, since it has no preferred spanning axis. No
/// `original_source/` dump was available for this pack (see `SPEC_FULL.md`), so this is a direct,
/// documented reading of the prose rule rather than a transcription of a reference implementation.
fn geometric_remainder(graph: &RoutingGraph, node: Id, destx: u32, desty: u32) -> u32 {
    let rr = graph.node(node);
    let fp = rr.footprint;
    let x_diff = if fp.xlow <= destx && destx <= fp.xhigh {
        0
    } else if destx < fp.xlow {
        fp.xlow - destx
    } else {
        destx - fp.xhigh
    };
    let y_diff = if fp.ylow <= desty && desty <= fp.yhigh {
        0
    } else if desty < fp.ylow {
        fp.ylow - desty
    } else {
        desty - fp.yhigh
    };
    let overlaps_column = fp.xlow <= destx && destx <= fp.xhigh;
    let overlaps_row = fp.ylow <= desty && desty <= fp.yhigh;
    let overlaps = match rr.kind {
        wotan_graph::NodeKind::Chanx => overlaps_column,
        wotan_graph::NodeKind::Chany => overlaps_row,
        _ => overlaps_column || overlaps_row,
    };
    let delta = if overlaps { 1 } else { 0 };
    (x_diff + y_diff).saturating_sub(delta)
}

/// Forward bounded Dijkstra from `source`, writing `source_distance`/`visited_from_source`.
/// Prunes a child geometrically against `(destx, desty)` before it is ever relaxed.
fn forward_pass(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    destx: u32,
    desty: u32,
    w: u32,
) {
    let mut pq: BoundedPriorityQueue<Id> = BoundedPriorityQueue::new(w as usize);
    let source_weight = graph.node(source).weight;
    arena.distances.set_source_distance(source, source_weight);
    arena.mark_touched(source);
    pq.push(source, source_weight.min(w as u32) as usize).ok();

    while let Some((node, _)) = pq.pop() {
        let node_weight_here = arena.distances.source_distance(node);
        for &child in graph.node(node).edges(true) {
            if arena.distances.visited_from_source(child) {
                continue;
            }
            let child_weight = graph.node(child).weight;
            let candidate = node_weight_here + child_weight;
            let remainder = geometric_remainder(graph, child, destx, desty);
            if candidate + remainder > w {
                continue; // pruned: cannot geometrically reach the destination tile within w
            }
            arena.distances.set_source_distance(child, candidate);
            arena.mark_touched(child);
            if let Ok(()) = pq.push(child, candidate.min(w) as usize) {
                // queued
            }
        }
    }
}

/// Backward bounded Dijkstra from `sink`, writing `sink_distance`/`visited_from_sink`. Prunes a
/// child *after* relaxing it, using the already-computed forward distance (§4.3): a child whose
/// combined forward+backward weight exceeds `w` is un-marked so a later, shorter path through it
/// is not shadowed by the stale rejection.
fn backward_pass(graph: &RoutingGraph, arena: &mut WorkerArena, sink: Id, w: u32) {
    let mut pq: BoundedPriorityQueue<Id> = BoundedPriorityQueue::new(w as usize);
    let sink_weight = graph.node(sink).weight;
    arena.distances.set_sink_distance(sink, sink_weight);
    arena.mark_touched(sink);
    pq.push(sink, sink_weight.min(w) as usize).ok();

    while let Some((node, _)) = pq.pop() {
        let node_weight_here = arena.distances.sink_distance(node);
        for &child in graph.node(node).edges(false) {
            if arena.distances.visited_from_sink(child) {
                continue;
            }
            let child_weight = graph.node(child).weight;
            let candidate = node_weight_here + child_weight;
            arena.distances.set_sink_distance(child, candidate);
            arena.mark_touched(child);

            let legal = arena.distances.visited_from_source(child)
                && arena.distances.source_distance(child) + candidate >= child_weight
                && arena.distances.source_distance(child) + candidate - child_weight <= w;
            if !legal {
                arena.distances.unmark_sink(child);
                continue;
            }
            pq.push(child, candidate.min(w) as usize).ok();
        }
    }
}

/// Runs both directions and tightens `W` to `W'` (§4.3). Returns `W'`, or an error if the
/// forward-computed source→sink distance disagrees with the backward-computed sink→source
/// distance (an invariant violation per §7/§8).
pub fn compute_distances(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    dest_tile: (u32, u32),
    w: u32,
    tighten_factor: f64,
) -> Result<u32, EngineError> {
    forward_pass(graph, arena, source, dest_tile.0, dest_tile.1, w);
    backward_pass(graph, arena, sink, w);

    if !arena.distances.visited_from_source(sink) || !arena.distances.visited_from_sink(source) {
        // Source and sink simply are not connected within w; W' is vacuously w (the legal
        // subgraph below will be empty and the caller's per-connection logic handles that).
        return Ok(w);
    }

    let forward_min = arena.distances.source_distance(sink);
    let backward_min = arena.distances.sink_distance(source);
    if forward_min != backward_min {
        return Err(EngineError::DistanceMismatch { forward: forward_min, backward: backward_min });
    }

    let tightened = (forward_min as f64 * tighten_factor).ceil() as u32;
    Ok(w.min(tightened))
}
