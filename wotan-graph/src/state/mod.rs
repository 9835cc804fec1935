pub mod buckets;
pub mod distances;

pub use buckets::{NodeTopoState, WeightBuckets};
pub use distances::SsDistances;
