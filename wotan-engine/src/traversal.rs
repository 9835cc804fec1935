//! Weight-layered topological traversal driver (§4.5).
//!
//! Grounded on a level-by-level BDD traversal shape (bucket-keyed PQ driving expansion, callbacks
//! invoked per node/edge), generalized from a fixed "by BDD level" order to §4.5's "by
//! accumulated path weight, readiness-gated" order, with cycle breaking added for the RRG's
//! feedback loops (a concern acyclic BDD traversal never had).
//!
//! The driver is run twice per connection during ENUMERATE (backward then forward) and at least
//! once per connection during PROBABILITY. Because `parents_remaining` and each node's
//! "popped yet" flag are call-scoped, not connection-scoped, every call resets them for exactly
//! the nodes the connection has touched so far — cheap (bounded by `nodes_visited.len()`) and
//! allocation-free, the same touched-list idiom `WorkerArena::cleanup` already uses.

use wotan_graph::id::Id;
use wotan_graph::pq::BoundedPriorityQueue;
use wotan_graph::RoutingGraph;

use crate::arena::WorkerArena;

/// Model-specific behavior injected into the driver. The driver itself never inspects bucket
/// contents or probability math — only `WorkerArena`/`RoutingGraph` structure (§4.5: "the driver
/// does not know the model").
pub trait TraversalCallbacks {
    fn on_popped(&mut self, graph: &RoutingGraph, arena: &mut WorkerArena, node: Id);
    fn on_child(&mut self, graph: &RoutingGraph, arena: &mut WorkerArena, parent: Id, child: Id);
    fn on_done(&mut self, _graph: &RoutingGraph, _arena: &mut WorkerArena) {}
}

/// Runs the traversal from `from` in direction `forward` (true: `out_edges`, false: `in_edges`),
/// over the legal subgraph bounded by `w_prime`. Only `WorkerArena` state is mutated; graph
/// structure is read-only, so every worker can traverse the same `RoutingGraph` concurrently
/// (§5 "Isolation") — ENUMERATE's callbacks collect `RrNode::demand`/`path_count_history`
/// contributions instead of writing them here, deferring the actual write to a caller-held lock.
pub fn do_topological_traversal<C: TraversalCallbacks>(
    graph: &RoutingGraph,
    arena: &mut WorkerArena,
    from: Id,
    w_prime: u32,
    forward: bool,
    callbacks: &mut C,
) {
    for &id in &arena.nodes_visited {
        arena.topo[id as usize].was_visited = false;
    }
    arena.parents_remaining.clear();

    let mut ready: BoundedPriorityQueue<Id> = BoundedPriorityQueue::new(w_prime as usize);
    let mut waiting: BoundedPriorityQueue<Id> = BoundedPriorityQueue::new(w_prime as usize);

    let seed_key = traversal_key(arena, from, forward).min(w_prime);
    ready.push(from, seed_key as usize).ok();
    arena.mark_touched(from);

    loop {
        let popped = match ready.pop() {
            Some((node, _)) => Some(node),
            None => loop {
                match waiting.pop() {
                    Some((node, _)) => {
                        if !arena.topo[node as usize].was_visited {
                            break Some(node);
                        }
                        // stale entry: this node was already finalized through the ready path.
                    }
                    None => break None,
                }
            },
        };

        let node = match popped {
            Some(n) => n,
            None => break,
        };
        if arena.topo[node as usize].was_visited {
            continue;
        }
        arena.topo[node as usize].was_visited = true;
        callbacks.on_popped(graph, arena, node);

        let children: Vec<Id> = graph.node(node).edges(forward).to_vec();
        for child in children {
            let child_weight = graph.node(child).weight;
            if !arena.distances.is_legal(child, child_weight, w_prime) {
                continue;
            }
            callbacks.on_child(graph, arena, node, child);
            arena.mark_touched(child);

            if arena.topo[child as usize].was_visited {
                continue; // cycle-broken node already finalized; contribution still folded above.
            }

            if !arena.parents_remaining.contains_key(&child) {
                let total_legal_parents = graph
                    .node(child)
                    .edges(!forward)
                    .iter()
                    .filter(|&&p| arena.distances.is_legal(p, graph.node(p).weight, w_prime))
                    .count() as u32;
                arena.parents_remaining.insert(child, total_legal_parents);
            }
            let remaining_slot = arena.parents_remaining.get_mut(&child).unwrap();
            *remaining_slot = remaining_slot.saturating_sub(1);
            let remaining = *remaining_slot;

            let key = traversal_key(arena, child, forward).min(w_prime);
            if remaining == 0 {
                ready.push(child, key as usize).ok();
            } else {
                waiting.push(child, key as usize).ok();
            }
        }
    }

    callbacks.on_done(graph, arena);
}

/// The weight used to order a node in the expansion PQ: its already-computed directional
/// distance from [`crate::distance_pass::compute_distances`] (§9 design note: the traversal
/// reuses `SsDistances` as its ready-weight key instead of tracking a second tentative-distance
/// array).
fn traversal_key(arena: &WorkerArena, node: Id, forward: bool) -> u32 {
    if forward {
        arena.distances.source_distance(node)
    } else {
        arena.distances.sink_distance(node)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::distance_pass::compute_distances;
    use wotan_graph::grid::{BlockType, ClassKind, GridTile, PinClass};
    use wotan_graph::node::{Footprint, NodeKind};
    use wotan_graph::RrNode;

    fn edge(nodes: &mut [RrNode], from: usize, to: usize) {
        nodes[from].out_edges.push(to as Id);
        nodes[to].in_edges.push(from as Id);
    }

    fn flat_fabric(width: u32, height: u32) -> (Vec<GridTile>, Vec<BlockType>) {
        let grid = (0..width * height)
            .map(|_| GridTile { type_index: 0, width_offset: 0, height_offset: 0 })
            .collect();
        let block_types = vec![BlockType {
            name: "FILL".into(),
            classes: vec![
                PinClass::new(ClassKind::Driver, vec![0]),
                PinClass::new(ClassKind::Receiver, vec![1]),
            ],
            is_global_pin: vec![false, false],
        }];
        (grid, block_types)
    }

    struct RecordingCallbacks {
        popped_order: Vec<Id>,
        child_edges: Vec<(Id, Id)>,
    }

    impl TraversalCallbacks for RecordingCallbacks {
        fn on_popped(&mut self, _graph: &RoutingGraph, _arena: &mut WorkerArena, node: Id) {
            self.popped_order.push(node);
        }

        fn on_child(&mut self, _graph: &RoutingGraph, _arena: &mut WorkerArena, parent: Id, child: Id) {
            self.child_edges.push((parent, child));
        }
    }

    #[test]
    fn diamond_every_legal_node_popped_exactly_once() {
        let mut nodes = vec![
            RrNode::new(0, NodeKind::Source, Footprint::point(0, 0), 0, 0),
            RrNode::new(1, NodeKind::Chanx, Footprint::point(0, 0), 1, 0),
            RrNode::new(2, NodeKind::Chanx, Footprint::point(0, 0), 1, 0),
            RrNode::new(3, NodeKind::Sink, Footprint::point(0, 0), 0, 0),
        ];
        edge(&mut nodes, 0, 1);
        edge(&mut nodes, 0, 2);
        edge(&mut nodes, 1, 3);
        edge(&mut nodes, 2, 3);
        let (grid, block_types) = flat_fabric(2, 2);
        let mut graph = RoutingGraph::new(nodes, 2, 2, grid, block_types, 0);
        let mut arena = WorkerArena::new(graph.len(), 2);

        let w_prime = compute_distances(&graph, &mut arena, 0, 3, (0, 0), 2, 1.0).unwrap();
        assert_eq!(w_prime, 1);

        let mut cb = RecordingCallbacks { popped_order: Vec::new(), child_edges: Vec::new() };
        do_topological_traversal(&mut graph, &mut arena, 0, w_prime, true, &mut cb);

        assert_eq!(cb.popped_order.len(), cb.popped_order.iter().collect::<std::collections::HashSet<_>>().len());
        assert_eq!(cb.popped_order[0], 0);
        assert!(cb.popped_order.contains(&3));
        // both branches fold into the sink.
        assert!(cb.child_edges.contains(&(1, 3)));
        assert!(cb.child_edges.contains(&(2, 3)));
    }

    #[test]
    fn two_calls_in_one_connection_each_repop_the_shared_nodes() {
        // The ENUMERATE shape: backward from sink, then forward from source, in the same
        // connection (same arena, same nodes_visited). Both calls must invoke on_popped for the
        // nodes they each own.
        let mut nodes = vec![
            RrNode::new(0, NodeKind::Source, Footprint::point(0, 0), 0, 0),
            RrNode::new(1, NodeKind::Chanx, Footprint::point(0, 0), 1, 0),
            RrNode::new(2, NodeKind::Sink, Footprint::point(0, 0), 0, 0),
        ];
        edge(&mut nodes, 0, 1);
        edge(&mut nodes, 1, 2);
        let (grid, block_types) = flat_fabric(2, 2);
        let mut graph = RoutingGraph::new(nodes, 2, 2, grid, block_types, 0);
        let mut arena = WorkerArena::new(graph.len(), 2);
        let w_prime = compute_distances(&graph, &mut arena, 0, 2, (0, 0), 2, 1.0).unwrap();

        let mut backward_cb = RecordingCallbacks { popped_order: Vec::new(), child_edges: Vec::new() };
        do_topological_traversal(&mut graph, &mut arena, 2, w_prime, false, &mut backward_cb);
        assert_eq!(backward_cb.popped_order, vec![2, 1, 0]);

        let mut forward_cb = RecordingCallbacks { popped_order: Vec::new(), child_edges: Vec::new() };
        do_topological_traversal(&mut graph, &mut arena, 0, w_prime, true, &mut forward_cb);
        assert_eq!(forward_cb.popped_order, vec![0, 1, 2]);
    }
}
