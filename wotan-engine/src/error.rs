//! Engine-level error taxonomy (§7).
//!
//! Same hand-written idiom as `wotan_graph::GraphError`: no `thiserror` for this kind of crate
//! (see `SPEC_FULL.md` §1.1).

use std::fmt;

use wotan_graph::GraphError;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Graph(GraphError),
    /// An unrecognized mode, missing required option, or non-positive size in `UserOptions`.
    Configuration(String),
    /// The forward-computed source→sink distance disagreed with the backward-computed
    /// sink→source distance (§4.3).
    DistanceMismatch { forward: u32, backward: u32 },
    /// A destination node expected to be single-tile was not (§4.3: "multi-tile destination
    /// node seen where single-tile required").
    MultiTileDestination { id: u32 },
    /// An IPIN/OPIN/SOURCE/SINK resolution produced an unexpected node kind.
    UnexpectedNodeKind { id: u32, expected: &'static str },
    /// A probability model produced a result outside `[0, 1]` (§4.7 "Validation").
    ProbabilityOutOfRange { value: f64 },
    /// `RELIABILITY_POLYNOMIAL` selected without `user_opts.use_routing_node_demand` set (§4.7).
    MissingRoutingNodeDemand,
    /// Thread spawn or join failed (§7 "Resource error").
    Resource(String),
}

impl From<GraphError> for EngineError {
    fn from(e: GraphError) -> Self {
        EngineError::Graph(e)
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Graph(e) => write!(f, "{e}"),
            EngineError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            EngineError::DistanceMismatch { forward, backward } => write!(
                f,
                "forward source->sink distance {forward} disagrees with backward sink->source distance {backward}"
            ),
            EngineError::MultiTileDestination { id } => {
                write!(f, "destination node {id} is not single-tile")
            }
            EngineError::UnexpectedNodeKind { id, expected } => {
                write!(f, "node {id} was expected to be {expected}")
            }
            EngineError::ProbabilityOutOfRange { value } => {
                write!(f, "computed probability {value} outside [0, 1]")
            }
            EngineError::MissingRoutingNodeDemand => write!(
                f,
                "RELIABILITY_POLYNOMIAL requires user_opts.use_routing_node_demand to be set"
            ),
            EngineError::Resource(msg) => write!(f, "resource error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
