//! Per-connection orchestration (§4.8): derives pin-class scaling factors, resolves IPIN fanout
//! sources, runs distances/hops, and dispatches into ENUMERATE or the configured PROBABILITY
//! model. Split into two entry points — [`analyze_connection_enumerate`] and
//! [`analyze_connection_probability`] — matching §5's "strictly sequential global phases": every
//! connection's ENUMERATE pass across every worker completes before any worker's PROBABILITY pass
//! begins, so `RrNode::demand`/`path_count_history` are never written and read concurrently.

use std::sync::Mutex;

use wotan_graph::grid::PinClass;
use wotan_graph::id::Id;
use wotan_graph::RoutingGraph;

use crate::aggregate::AnalysisResults;
use crate::arena::WorkerArena;
use crate::config::{AnalysisSettings, ProbabilityMode, UserOptions};
use crate::distance_pass::compute_distances;
use crate::enumerate::{run_enumerate, FoldMode};
use crate::error::EngineError;
use crate::models::cutline::run_cutline;
use crate::models::cutline_recursive::run_cutline_recursive;
use crate::models::cutline_simple::run_cutline_simple;
use crate::models::propagate::run_propagate;
use crate::models::reliability_polynomial::run_reliability_polynomial;

const PIN_PROB_EPSILON: f64 = 1e-9;

/// Scaling factors derived from a connection's source/sink pin classes (§4.8 step 1).
#[derive(Debug, Clone, Copy)]
pub struct ConnectionScaling {
    pub num_sources: f64,
    pub num_sinks: f64,
    pub sum_pin_probs: f64,
}

fn pin_class_of<'a>(graph: &'a RoutingGraph, node: Id) -> Result<&'a PinClass, EngineError> {
    let rr = graph.node(node);
    if !rr.footprint.is_single_tile() {
        return Err(EngineError::MultiTileDestination { id: node });
    }
    let tile = graph.tile(rr.footprint.xlow, rr.footprint.ylow);
    let block = graph.block_type(tile.type_index);
    block
        .class_containing(rr.ptc)
        .ok_or_else(|| EngineError::Configuration(format!("node {node} has no pin class for ptc {}", rr.ptc)))
}

/// Every pin in `pins` must agree on its `pin_probabilities` entry within ε (§4.8 step 1,
/// §7 "pin probabilities within a class not equal").
fn class_pin_probability_sum(settings: &AnalysisSettings, pins: &[u32]) -> Result<f64, EngineError> {
    let first = settings.pin_probability(pins[0]);
    for &pin in &pins[1..] {
        let p = settings.pin_probability(pin);
        if (p - first).abs() > PIN_PROB_EPSILON {
            return Err(EngineError::Configuration(format!(
                "pin {pin} has probability {p}, disagreeing with class baseline {first} by more than epsilon"
            )));
        }
    }
    Ok(first * pins.len() as f64)
}

/// §4.8 step 1: derive `num_sources`/`num_sinks`/`Σpin_probs` from the source and sink nodes' own
/// pin classes, before any IPIN→synthetic-source resolution.
pub fn derive_scaling(
    graph: &RoutingGraph,
    settings: &AnalysisSettings,
    source: Id,
    sink: Id,
) -> Result<ConnectionScaling, EngineError> {
    let source_class = pin_class_of(graph, source)?;
    let sink_class = pin_class_of(graph, sink)?;
    let sum_pin_probs = class_pin_probability_sum(settings, &source_class.pins)?;
    Ok(ConnectionScaling {
        num_sources: source_class.len() as f64,
        num_sinks: sink_class.len() as f64,
        sum_pin_probs,
    })
}

/// §4.8 step 2: an IPIN source is a fanout hack — analysis actually proceeds from the synthetic
/// SOURCE node attached to it.
fn resolve_traversal_source(graph: &RoutingGraph, source: Id) -> Id {
    if graph.node(source).kind == wotan_graph::NodeKind::Ipin {
        graph.synthetic_source_of(source).unwrap_or(source)
    } else {
        source
    }
}

/// Runs the ENUMERATE phase for one (source, sink, length) sub-pair connection and returns its
/// demand contributions. The caller applies them into the shared graph under a single lock and
/// calls [`WorkerArena::cleanup`] afterward (§4.8 step 4, §4.11).
#[allow(clippy::too_many_arguments)]
pub fn analyze_connection_enumerate(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    length: u32,
    settings: &AnalysisSettings,
    user_opts: &UserOptions,
    num_conns_at_length: f64,
) -> Result<Vec<(Id, f64)>, EngineError> {
    let scaling = derive_scaling(graph, settings, source, sink)?;
    let traversal_source = resolve_traversal_source(graph, source);

    let w = settings.get_max_path_weight(length);
    let w_prime = compute_distances(graph, arena, traversal_source, sink, dest_tile(graph, sink), w, user_opts.distance_tighten_factor)?;

    // This is the global demand-accumulation pass shared by every model (§5 "strictly sequential
    // global phases"), so it always folds by node weight; RELIABILITY_POLYNOMIAL's own
    // BY_PATH_HOPS pass is a separate, unscaled call made later from its own branch in
    // `analyze_connection_probability`.
    let length_prob = settings.length_probability(length);
    Ok(run_enumerate(
        graph,
        arena,
        traversal_source,
        sink,
        w_prime,
        FoldMode::ByPathWeight,
        length_prob,
        scaling.num_sinks,
        scaling.sum_pin_probs,
        num_conns_at_length,
    ))
}

/// Runs the PROBABILITY phase for one (source, sink, length) sub-pair connection and folds the
/// result into `results` (§4.8 step 3 "After PROBABILITY").
#[allow(clippy::too_many_arguments)]
pub fn analyze_connection_probability(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    source: Id,
    sink: Id,
    length: u32,
    settings: &AnalysisSettings,
    user_opts: &UserOptions,
    results: &Mutex<AnalysisResults>,
) -> Result<(), EngineError> {
    let scaling = derive_scaling(graph, settings, source, sink)?;
    let traversal_source = resolve_traversal_source(graph, source);

    let w = settings.get_max_path_weight(length);
    let w_prime = compute_distances(graph, arena, traversal_source, sink, dest_tile(graph, sink), w, user_opts.distance_tighten_factor)?;

    let prob_routable = match user_opts.probability_mode {
        ProbabilityMode::Propagate => run_propagate(
            graph,
            arena,
            traversal_source,
            sink,
            w_prime,
            scaling.num_sources,
            scaling.num_sinks,
            user_opts.demand_multiplier,
        )?,
        ProbabilityMode::Cutline => run_cutline(
            graph,
            arena,
            traversal_source,
            sink,
            w_prime,
            scaling.num_sources,
            scaling.num_sinks,
            user_opts.demand_multiplier,
        )?,
        ProbabilityMode::CutlineSimple => run_cutline_simple(
            graph,
            arena,
            traversal_source,
            sink,
            w_prime,
            scaling.num_sources,
            scaling.num_sinks,
            user_opts.demand_multiplier,
        )?,
        ProbabilityMode::CutlineRecursive => run_cutline_recursive(
            graph,
            arena,
            traversal_source,
            sink,
            w_prime,
            graph.fill_type(),
            scaling.num_sources,
            scaling.num_sinks,
            user_opts.demand_multiplier,
        )?,
        ProbabilityMode::ReliabilityPolynomial => {
            let fixed_demand = user_opts.use_routing_node_demand.ok_or(EngineError::MissingRoutingNodeDemand)?;
            // This inner ENUMERATE pass exists only to build a hop-count probability mass
            // function for *this* connection alone, not to accumulate cross-connection demand —
            // so it is run unscaled (every scaling input 1.0) rather than with the pin-class/
            // length-probability factors `analyze_connection` itself was given.
            run_reliability_polynomial(graph, arena, traversal_source, sink, w_prime, fixed_demand, 1.0, 1.0, 1.0, 1.0)?
        }
    };

    let scaling_factor = settings.length_probability(length) * scaling.sum_pin_probs;
    let mut guard = results.lock().expect("analysis results mutex poisoned");
    guard.record_probability(length as usize, scaling_factor, prob_routable, scaling.num_sources, scaling.num_sinks);
    Ok(())
}

/// The destination tile a geometric-prune pass should aim for: the sink node's own tile, since
/// SINK/IPIN nodes are always single-tile (§4.3).
fn dest_tile(graph: &RoutingGraph, sink: Id) -> (u32, u32) {
    let fp = graph.node(sink).footprint;
    (fp.xlow, fp.ylow)
}
