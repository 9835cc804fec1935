//! Dispatcher (§4.9): builds the per-thread connection workload from `test_tile_coords` and the
//! fill type's pin classes, then drives the two strictly sequential global phases (§5
//! "Ordering") — every worker's ENUMERATE pass, a single short-held flush of the demand
//! contributions it collected, then every worker's PROBABILITY pass — across `N-1` spawned
//! workers plus the calling thread as the Nth, joined with `std::thread::scope` (§9 design note:
//! not `rayon`, since each worker needs a private arena reused across a whole shard rather than a
//! stateless fork-join map).

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use wotan_graph::grid::ClassKind;
use wotan_graph::id::Id;
use wotan_graph::{NodeKind, RoutingGraph};

use crate::aggregate::AnalysisResults;
use crate::arena::WorkerArena;
use crate::config::{AnalysisSettings, UserOptions};
use crate::connection::{analyze_connection_enumerate, analyze_connection_probability};
use crate::error::EngineError;

/// One (source, sink, length) sub-pair, already assigned to a worker shard.
#[derive(Debug, Clone, Copy)]
struct ConnectionTask {
    source: Id,
    sink: Id,
    length: u32,
}

/// The statically partitioned workload plus the per-length sub-pair counts ENUMERATE's scaling
/// and [`AnalysisResults::new`]'s PQ sizing both need (§4.8 step 1, §4.10 scenario 6).
struct WorkPlan {
    per_worker: Vec<Vec<ConnectionTask>>,
    /// Index 0 unused; lengths start at 1, up to `max_connection_length`.
    conns_at_length: Vec<u32>,
    desired_conns: u64,
}

/// §4.9 destination-tile generation: `for idx in [-ℓ..ℓ], idy in {-(ℓ-|idx|), +(ℓ-|idx|)}` with
/// step `max(2·(ℓ-|idx|), 1)` — which, walked as a stepped range, visits exactly those two values
/// (collapsing to the single value 0 when `ℓ == |idx|`). Returns tile-relative offsets.
fn destination_offsets(length: u32) -> Vec<(i64, i64)> {
    let ell = length as i64;
    let mut offsets = Vec::with_capacity((4 * length).max(1) as usize);
    for idx in -ell..=ell {
        let remainder = ell - idx.abs();
        let step = (2 * remainder).max(1);
        let mut idy = -remainder;
        loop {
            offsets.push((idx, idy));
            if idy >= remainder {
                break;
            }
            idy += step;
        }
    }
    offsets
}

/// Resolves a tile-relative offset to absolute grid coordinates, if in bounds.
fn offset_tile(graph: &RoutingGraph, sx: u32, sy: u32, idx: i64, idy: i64) -> Option<(u32, u32)> {
    let x = sx as i64 + idx;
    let y = sy as i64 + idy;
    if x < 0 || y < 0 || x as u32 >= graph.width() || y as u32 >= graph.height() {
        return None;
    }
    Some((x as u32, y as u32))
}

/// §4.9: a destination tile qualifies iff strictly interior (no perimeter I/O row/column) and of
/// the fill type.
fn is_valid_destination(graph: &RoutingGraph, x: u32, y: u32) -> bool {
    graph.is_interior(x, y) && graph.is_fill_tile(x, y)
}

/// §4.9 "filtered by core-region flag": with `analyze_core` set, only tiles at least
/// [`wotan_graph::graph::CORE_OFFSET`] rows/columns from every edge contribute (§8 scenario 5);
/// otherwise every configured test tile contributes.
fn source_tiles(graph: &RoutingGraph, settings: &AnalysisSettings, user_opts: &UserOptions) -> Vec<(u32, u32)> {
    settings
        .test_tile_coords
        .iter()
        .copied()
        .filter(|&(x, y)| !user_opts.analyze_core || graph.is_core(x, y))
        .collect()
}

/// §4.8 step 2's IPIN fanout hack needs a representative pin per receiver class; since
/// `derive_scaling` already requires every pin in a class to agree on probability, the class's
/// first pin stands in for the whole class.
fn receiver_root(graph: &RoutingGraph, x: u32, y: u32, pins: &[u32]) -> Option<Id> {
    graph.node_at(NodeKind::Ipin, x, y, pins[0])
}

/// §4.9: constructs the full workload (source root node, destination sink node, length) ahead of
/// any thread assignment, then partitions it round-robin — separately counted for driver- and
/// receiver-class roots "so workload is balanced for both enumeration paths".
fn build_work_plan(graph: &RoutingGraph, settings: &AnalysisSettings, user_opts: &UserOptions) -> WorkPlan {
    let num_workers = user_opts.num_threads;
    let mut per_worker: Vec<Vec<ConnectionTask>> = (0..num_workers).map(|_| Vec::new()).collect();
    let mut conns_at_length = vec![0u32; user_opts.max_connection_length as usize + 1];

    let mut driver_counter = 0usize;
    let mut receiver_counter = 0usize;

    for (sx, sy) in source_tiles(graph, settings, user_opts) {
        let tile = graph.tile(sx, sy);
        let block = graph.block_type(tile.type_index);

        for (class_index, class) in block.classes.iter().enumerate() {
            let root = match class.kind {
                ClassKind::Driver => graph.node_at(NodeKind::Source, sx, sy, class_index as u32),
                ClassKind::Receiver => receiver_root(graph, sx, sy, &class.pins),
            };
            let Some(root) = root else { continue };

            let worker = match class.kind {
                ClassKind::Driver => {
                    let w = driver_counter % num_workers;
                    driver_counter += 1;
                    w
                }
                ClassKind::Receiver => {
                    let w = receiver_counter % num_workers;
                    receiver_counter += 1;
                    w
                }
            };

            assign_destinations(graph, root, sx, sy, user_opts, worker, &mut per_worker, &mut conns_at_length);
        }
    }

    let desired_conns: u64 = conns_at_length.iter().map(|&n| n as u64).sum();
    WorkPlan { per_worker, conns_at_length, desired_conns }
}

/// For one source root at tile `(sx, sy)`, generates every qualifying (destination tile, length,
/// receiver class) triple and pushes the resulting task onto `worker`'s shard.
fn assign_destinations(
    graph: &RoutingGraph,
    source: Id,
    sx: u32,
    sy: u32,
    user_opts: &UserOptions,
    worker: usize,
    per_worker: &mut [Vec<ConnectionTask>],
    conns_at_length: &mut [u32],
) {
    let fill_block = graph.fill_block_type();
    for length in 1..=user_opts.max_connection_length {
        for (idx, idy) in destination_offsets(length) {
            let Some((dx, dy)) = offset_tile(graph, sx, sy, idx, idy) else { continue };
            if !is_valid_destination(graph, dx, dy) {
                continue;
            }
            for (class_index, class) in fill_block.classes.iter().enumerate() {
                if class.kind != ClassKind::Receiver {
                    continue;
                }
                let Some(sink) = graph.node_at(NodeKind::Sink, dx, dy, class_index as u32) else { continue };
                per_worker[worker].push(ConnectionTask { source, sink, length });
                conns_at_length[length as usize] += 1;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_enumerate_shard(
    graph: &RoutingGraph,
    settings: &AnalysisSettings,
    user_opts: &UserOptions,
    tasks: &[ConnectionTask],
    max_weight: u32,
    conns_at_length: &[u32],
    results: &Mutex<AnalysisResults>,
    progress: &ProgressBar,
) -> Result<Vec<(Id, Id, Id, f64)>, EngineError> {
    let mut arena = WorkerArena::new(graph.len(), max_weight);
    let mut out = Vec::new();
    for task in tasks {
        let contributions = analyze_connection_enumerate(
            graph,
            &mut arena,
            task.source,
            task.sink,
            task.length,
            settings,
            user_opts,
            conns_at_length[task.length as usize] as f64,
        )?;
        for (node, amount) in contributions {
            out.push((node, task.source, task.sink, amount));
        }
        arena.cleanup();
        results.lock().expect("analysis results mutex poisoned").record_enumerate();
        progress.inc(1);
    }
    Ok(out)
}

fn run_probability_shard(
    graph: &RoutingGraph,
    settings: &AnalysisSettings,
    user_opts: &UserOptions,
    tasks: &[ConnectionTask],
    max_weight: u32,
    results: &Mutex<AnalysisResults>,
    progress: &ProgressBar,
) -> Result<(), EngineError> {
    let mut arena = WorkerArena::new(graph.len(), max_weight);
    for task in tasks {
        analyze_connection_probability(graph, &mut arena, task.source, task.sink, task.length, settings, user_opts, results)?;
        arena.cleanup();
        progress.inc(1);
    }
    Ok(())
}

/// Applies every collected `(node, source, sink, amount)` ENUMERATE contribution into the shared
/// graph, recording it against both endpoints' `path_count_history` for §4.11's later subtraction
/// (§5 "Shared mutable state": this is the single unique borrow taken between the two global
/// phases, once every worker's ENUMERATE pass has already joined).
fn apply_contributions(graph: &mut RoutingGraph, contributions: &[(Id, Id, Id, f64)]) {
    for &(node, source, sink, amount) in contributions {
        let rr = graph.node_mut(node);
        rr.demand += amount;
        rr.record_path_count(source, amount);
        rr.record_path_count(sink, amount);
    }
}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:60.cyan/yellow} {pos:>7}/{len:7} {msg}")
        .progress_chars("#>-")
}

/// Runs a full analysis: builds the workload, spawns `num_threads - 1` workers plus the calling
/// thread for each global phase, and returns the aggregated [`AnalysisResults`] (§4.8, §4.9, §5).
pub fn run_analysis(
    graph: &mut RoutingGraph,
    settings: &AnalysisSettings,
    user_opts: &UserOptions,
) -> Result<AnalysisResults, EngineError> {
    user_opts.validate()?;

    let plan = build_work_plan(graph, settings, user_opts);
    let max_weight = settings.global_max_path_weight(user_opts.max_connection_length);
    let results = Mutex::new(AnalysisResults::new(plan.desired_conns, &plan.conns_at_length));

    let progress = ProgressBar::new(plan.desired_conns);
    progress.set_style(progress_style());
    progress.set_message("enumerate");

    // Phase 1 (§5 "Ordering"): every worker's ENUMERATE pass runs to completion, collecting
    // demand contributions, before any worker's PROBABILITY pass begins. `graph` is only read
    // here — `do_topological_traversal` and everything under it takes `&RoutingGraph` — so every
    // shard can run concurrently against the one shared graph.
    let contributions: Vec<(Id, Id, Id, f64)> = {
        let graph_ref: &RoutingGraph = graph;
        std::thread::scope(|scope| -> Result<Vec<(Id, Id, Id, f64)>, EngineError> {
            let (spawned, last) = plan.per_worker.split_at(plan.per_worker.len().saturating_sub(1));
            let handles: Vec<_> = spawned
                .iter()
                .map(|shard| {
                    let progress = &progress;
                    let results = &results;
                    let conns_at_length = &plan.conns_at_length;
                    scope.spawn(move || {
                        run_enumerate_shard(graph_ref, settings, user_opts, shard, max_weight, conns_at_length, results, progress)
                    })
                })
                .collect();

            let mut collected = match last.first() {
                Some(shard) => run_enumerate_shard(
                    graph_ref,
                    settings,
                    user_opts,
                    shard,
                    max_weight,
                    &plan.conns_at_length,
                    &results,
                    &progress,
                )?,
                None => Vec::new(),
            };
            for handle in handles {
                let shard_result = handle.join().map_err(|_| EngineError::Resource("enumerate worker panicked".into()))??;
                collected.extend(shard_result);
            }
            Ok(collected)
        })?
    };

    // Flush point: every ENUMERATE shard has joined, so this is the only unique borrow of `graph`
    // for the whole run, held only long enough to apply the collected deltas (§5 "Shared mutable
    // state").
    apply_contributions(graph, &contributions);

    progress.set_message("probability");
    progress.set_position(0);

    {
        let graph_ref: &RoutingGraph = graph;
        std::thread::scope(|scope| -> Result<(), EngineError> {
            let (spawned, last) = plan.per_worker.split_at(plan.per_worker.len().saturating_sub(1));
            let handles: Vec<_> = spawned
                .iter()
                .map(|shard| {
                    let results = &results;
                    let progress = &progress;
                    scope.spawn(move || run_probability_shard(graph_ref, settings, user_opts, shard, max_weight, results, progress))
                })
                .collect();

            if let Some(shard) = last.first() {
                run_probability_shard(graph_ref, settings, user_opts, shard, max_weight, &results, &progress)?;
            }
            for handle in handles {
                handle.join().map_err(|_| EngineError::Resource("probability worker panicked".into()))??;
            }
            Ok(())
        })?;
    }

    progress.finish_and_clear();
    Ok(results.into_inner().expect("analysis results mutex poisoned"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn destination_offsets_form_the_length_one_diamond() {
        let mut offsets = destination_offsets(1);
        offsets.sort();
        assert_eq!(offsets, vec![(-1, 0), (0, -1), (0, 1), (1, 0)]);
    }

    #[test]
    fn destination_offsets_are_all_at_the_requested_manhattan_distance() {
        for ell in 1..=4u32 {
            for (idx, idy) in destination_offsets(ell) {
                assert_eq!(idx.unsigned_abs() + idy.unsigned_abs(), ell as u64);
            }
        }
    }
}
