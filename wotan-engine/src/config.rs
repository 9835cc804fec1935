//! `Analysis_Settings` and `User_Options` (§6): plain data handed in by an external collaborator.
//!
//! Plain struct, no magic — parsing these from a file or CLI remains the external collaborator's
//! job per §1/§6.

/// Which routing-resource-graph reader format was used to build the graph handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RrStructsMode {
    Vpr,
    Simple,
}

/// The probability model to evaluate in the PROBABILITY phase (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbabilityMode {
    Propagate,
    Cutline,
    CutlineSimple,
    CutlineRecursive,
    ReliabilityPolynomial,
}

#[derive(Debug, Clone)]
pub struct UserOptions {
    pub rr_structs_mode: RrStructsMode,
    pub num_threads: usize,
    pub max_connection_length: u32,
    pub analyze_core: bool,
    pub demand_multiplier: f64,
    /// `Some(p)` sets a fixed demand value used by RELIABILITY_POLYNOMIAL in place of the node's
    /// own observed demand; `None` means the model is unavailable (§4.7 validation).
    pub use_routing_node_demand: Option<f64>,
    pub keep_path_count_history: bool,
    pub probability_mode: ProbabilityMode,
    /// Factor applied when tightening `W` to `W'` in §4.3 (`1.3` per spec; exposed because §9
    /// flags the constant as possibly architecture-dependent).
    pub distance_tighten_factor: f64,
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            rr_structs_mode: RrStructsMode::Vpr,
            num_threads: 1,
            max_connection_length: 4,
            analyze_core: true,
            demand_multiplier: 1.0,
            use_routing_node_demand: None,
            keep_path_count_history: true,
            probability_mode: ProbabilityMode::Propagate,
            distance_tighten_factor: 1.3,
        }
    }
}

impl UserOptions {
    pub fn validate(&self) -> Result<(), crate::error::EngineError> {
        if self.num_threads == 0 {
            return Err(crate::error::EngineError::Configuration(
                "num_threads must be >= 1".into(),
            ));
        }
        if self.max_connection_length == 0 {
            return Err(crate::error::EngineError::Configuration(
                "max_connection_length must be >= 1".into(),
            ));
        }
        if self.probability_mode == ProbabilityMode::ReliabilityPolynomial
            && self.use_routing_node_demand.is_none()
        {
            return Err(crate::error::EngineError::MissingRoutingNodeDemand);
        }
        Ok(())
    }
}

/// Per-length/per-pin analysis inputs (§6).
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// `length_probabilities[ℓ] ∈ [0, 1]`, indexed from 0; index 0 is unused (lengths start at 1).
    pub length_probabilities: Vec<f64>,
    /// `pin_probabilities[pin] ∈ [0, 1]`.
    pub pin_probabilities: Vec<f64>,
    pub test_tile_coords: Vec<(u32, u32)>,
    /// `get_max_path_weight(ℓ)`, tabulated per length (index 0 unused).
    max_path_weight_by_length: Vec<u32>,
}

impl AnalysisSettings {
    pub fn new(
        length_probabilities: Vec<f64>,
        pin_probabilities: Vec<f64>,
        test_tile_coords: Vec<(u32, u32)>,
        max_path_weight_by_length: Vec<u32>,
    ) -> Self {
        Self { length_probabilities, pin_probabilities, test_tile_coords, max_path_weight_by_length }
    }

    pub fn get_max_path_weight(&self, length: u32) -> u32 {
        self.max_path_weight_by_length[length as usize]
    }

    pub fn length_probability(&self, length: u32) -> f64 {
        self.length_probabilities[length as usize]
    }

    pub fn pin_probability(&self, pin: u32) -> f64 {
        self.pin_probabilities[pin as usize]
    }

    /// The largest `get_max_path_weight(ℓ)` across every length up to `max_connection_length`,
    /// used to size each worker's reusable bucket arena once up front (§9 "Per-thread arenas").
    pub fn global_max_path_weight(&self, max_connection_length: u32) -> u32 {
        (1..=max_connection_length).map(|l| self.get_max_path_weight(l)).max().unwrap_or(0)
    }
}
