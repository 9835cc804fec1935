//! Probability models (§4.7). Each model is driven by the same
//! [`crate::traversal::do_topological_traversal`] and receives the same precomputed distances
//! and `W'`; what differs is how `on_popped`/`on_child` turn bucket contents into a probability.

pub mod cutline;
pub mod cutline_recursive;
pub mod cutline_simple;
pub mod propagate;
pub mod reliability_polynomial;

use wotan_graph::id::Id;

use crate::error::EngineError;

/// Checks the §4.7 "Validation" invariant common to every model.
pub fn validate_probability(value: f64) -> Result<f64, EngineError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EngineError::ProbabilityOutOfRange { value });
    }
    Ok(value)
}

/// `P(node free)` given its adjusted demand, shared by PROPAGATE and the cutline family.
pub fn free_probability(adjusted_demand: f64) -> f64 {
    (1.0 - adjusted_demand).max(0.0)
}

/// A node's demand with its self-contribution from the current connection subtracted out
/// (§4.11 "Demand-adjustment for probability analysis").
pub fn adjusted_demand(
    raw_demand: f64,
    source: Id,
    sink: Id,
    num_pins_source: f64,
    num_pins_sink: f64,
    history: &wotan_graph::AHashMap<Id, f64>,
) -> f64 {
    let source_contribution = history.get(&source).copied().unwrap_or(0.0) / num_pins_source;
    let sink_contribution = history.get(&sink).copied().unwrap_or(0.0) / num_pins_sink;
    (raw_demand - source_contribution.max(sink_contribution)).max(0.0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn adjusted_demand_subtracts_the_larger_contribution_and_floors_at_zero() {
        let mut history = wotan_graph::AHashMap::default();
        history.insert(1u32, 4.0); // source
        history.insert(2u32, 1.0); // sink
        let adjusted = adjusted_demand(3.0, 1, 2, 2.0, 1.0, &history);
        // source_contribution = 4/2 = 2.0, sink_contribution = 1/1 = 1.0; subtract max = 2.0
        assert!((adjusted - 1.0).abs() < 1e-9);
    }

    #[test]
    fn free_probability_never_goes_negative() {
        assert_eq!(free_probability(1.5), 0.0);
        assert!((free_probability(0.25) - 0.75).abs() < 1e-9);
    }
}
