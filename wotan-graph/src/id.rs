use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

use ahash::AHasher;

/// Index of a node in a [`RoutingGraph`](crate::graph::RoutingGraph). Dense and zero-based, so it
/// doubles as an index into any `Vec` arena addressed "per node".
pub type Id = u32;

/// Hash map keyed by [`Id`] (or anything else), using `ahash` instead of the default SipHash.
/// Used wherever a sparse, non-dense mapping over node ids is needed (e.g. `path_count_history`).
pub type AHashMap<K, V> = HashMap<K, V, BuildHasherDefault<AHasher>>;
pub type AHashSet<K> = HashSet<K, BuildHasherDefault<AHasher>>;
