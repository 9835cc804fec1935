//! Graph-level invariant violations (§7 "Graph invariant violation").
//!
//! Hand-written: no `thiserror`, just a plain enum with a manual `Display` impl, matching how
//! `wotan_engine::error::EngineError` reports its own domain errors.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// A push into a [`crate::pq::BoundedPriorityQueue`] exceeded its configured max weight.
    WeightExceedsBound { weight: usize, max_weight: usize },
    /// A node expected to occupy a single tile (SOURCE/SINK/IPIN/OPIN) has a multi-tile footprint.
    MultiTileNode { id: u32 },
    /// Pin probabilities within one pin class were not all equal, within tolerance (§4.8).
    UnequalPinProbabilities { class_ptc: u32, min: f64, max: f64 },
    /// Subtracting a node's history-derived contribution would drive its demand below zero
    /// beyond tolerance (§4.11).
    DemandUnderflow { node: u32, demand: f64, subtracted: f64 },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::WeightExceedsBound { weight, max_weight } => write!(
                f,
                "pushed weight {weight} exceeds the bounded queue's max weight {max_weight}"
            ),
            GraphError::MultiTileNode { id } => {
                write!(f, "node {id} is expected to be single-tile but has a multi-tile footprint")
            }
            GraphError::UnequalPinProbabilities { class_ptc, min, max } => write!(
                f,
                "pin probabilities in class containing ptc {class_ptc} are not equal: min {min}, max {max}"
            ),
            GraphError::DemandUnderflow { node, demand, subtracted } => write!(
                f,
                "node {node} has demand {demand} but history subtraction of {subtracted} would drive it below zero"
            ),
        }
    }
}

impl std::error::Error for GraphError {}
