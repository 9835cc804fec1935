//! `wotan-engine`: the routability-analysis engine itself — per-connection scaling and dispatch,
//! the ENUMERATE/PROBABILITY traversal machinery, the probability models (§4.7), and the
//! multi-threaded dispatcher that ties them together into a single [`dispatcher::run_analysis`]
//! call (§4.8, §4.9, §5). Building the graph and loading `Analysis_Settings`/`User_Options` from
//! whatever external source (VPR `rr_graph.xml`, a test harness) is the caller's job — this crate
//! only analyzes an already-built [`wotan_graph::RoutingGraph`].

pub mod aggregate;
pub mod arena;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod distance_pass;
pub mod enumerate;
pub mod error;
pub mod hops_pass;
pub mod models;
pub mod report;
pub mod traversal;

pub use aggregate::AnalysisResults;
pub use config::{AnalysisSettings, ProbabilityMode, RrStructsMode, UserOptions};
pub use dispatcher::run_analysis;
pub use error::EngineError;
pub use report::AnalysisReport;
