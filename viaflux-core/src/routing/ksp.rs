//! Bounded k-shortest-paths search.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::{debug, trace};
use petgraph::graph::{EdgeIndex, NodeIndex};

use super::path::{PathSet, RoutePath};
use crate::Error;
use crate::model::network::RoadGraph;
use crate::model::od::OdPair;

/// Partial path in the working set.
struct Candidate {
    cost: f64,
    /// Insertion sequence; equal costs expand first-inserted-first.
    seq: usize,
    node: NodeIndex,
    edges: Vec<EdgeIndex>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap by cost (reversed from standard Rust BinaryHeap), FIFO on
        // ties. Costs are finite sums of resolved edge attributes.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Computes up to `k` loop-free minimum-cost paths for every OD pair.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] when a label resolves to no node and
/// [`Error::NoRouteFound`] when no pair yields a single path.
pub fn k_shortest_paths(graph: &RoadGraph, pairs: &[OdPair], k: usize) -> Result<PathSet, Error> {
    let mut all = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let origin = graph
            .od_node(&pair.origin)
            .ok_or_else(|| Error::InvalidData(format!("no node labelled '{}'", pair.origin)))?;
        let destination = graph.od_node(&pair.destination).ok_or_else(|| {
            Error::InvalidData(format!("no node labelled '{}'", pair.destination))
        })?;
        let paths = pair_paths(graph, pair, origin, destination, k);
        debug!(
            "{} -> {}: {} path(s)",
            pair.origin,
            pair.destination,
            paths.len()
        );
        all.push(paths);
    }
    if all.iter().all(Vec::is_empty) {
        return Err(Error::NoRouteFound);
    }
    Ok(PathSet::new(all))
}

/// Cost-ordered expansion bounded to `k` expansions per node.
fn pair_paths(
    graph: &RoadGraph,
    pair: &OdPair,
    origin: NodeIndex,
    destination: NodeIndex,
    k: usize,
) -> Vec<RoutePath> {
    // Expansion counters are search-local so repeated searches never leak
    // state into each other through the shared topology.
    let mut expansions = vec![0usize; graph.node_count()];
    let mut heap = BinaryHeap::new();
    let mut seq = 0usize;
    heap.push(Candidate {
        cost: 0.0,
        seq,
        node: origin,
        edges: Vec::new(),
    });

    let mut found = Vec::new();
    while let Some(candidate) = heap.pop() {
        let node = candidate.node;
        if expansions[node.index()] >= k {
            continue;
        }
        expansions[node.index()] += 1;

        if node == destination {
            // The loop rule below makes any extension past the destination
            // unable to arrive again, so the path is final here.
            found.push(RoutePath {
                edges: candidate.edges,
                cost: candidate.cost,
            });
            if found.len() == k {
                break;
            }
            continue;
        }

        for (edge_idx, edge) in graph.out_edges(node) {
            let Some(step_cost) = edge.cost(pair.cost_type) else {
                trace!("edge {} has no resolved {:?} cost, skipped", edge.id, pair.cost_type);
                continue;
            };
            let (_, target) = graph.edge_endpoints(edge_idx);
            // Loop rule: never revisit a node the path has already left
            // from. This is not a full visited-set check.
            if leaves_from(graph, &candidate.edges, target) {
                continue;
            }
            seq += 1;
            let mut edges = candidate.edges.clone();
            edges.push(edge_idx);
            heap.push(Candidate {
                cost: candidate.cost + step_cost,
                seq,
                node: target,
                edges,
            });
        }
    }
    found
}

/// True when `node` is already the origin of one of the path's edges.
fn leaves_from(graph: &RoadGraph, edges: &[EdgeIndex], node: NodeIndex) -> bool {
    edges.iter().any(|&edge| graph.edge_endpoints(edge).0 == node)
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use super::*;
    use crate::model::network::{CostType, RoadEdge, RoadNode, Tags};

    /// A -> B with a short and a long branch, plus a detour via C.
    ///
    /// ```text
    ///   1 --100--> 2          (edge 0)
    ///   1 --250--> 2          (edge 1)
    ///   1 --80--> 3 --90--> 2 (edges 2, 3)
    ///   2 --50--> 1           (edge 4, back edge)
    /// ```
    fn fixture() -> RoadGraph {
        let mut graph = RoadGraph::new();
        for id in 1..=3 {
            graph.add_or_update_node(RoadNode::new(id, Point::new(0.0, 0.0), Tags::new()));
        }
        graph.set_od_label(1, "A").unwrap();
        graph.set_od_label(2, "B").unwrap();
        let segments = [(0, 1, 2, 100.0), (1, 1, 2, 250.0), (2, 1, 3, 80.0), (3, 3, 2, 90.0), (4, 2, 1, 50.0)];
        for (id, from, to, distance) in segments {
            let mut edge = RoadEdge::new(id, id as i64, from, to, Tags::new());
            edge.distance = Some(distance);
            edge.duration = Some(distance / 10.0);
            graph.add_edge(edge).unwrap();
        }
        graph
    }

    fn pair() -> OdPair {
        OdPair::new("A", "B", CostType::Distance)
    }

    #[test]
    fn returns_at_most_k_paths_in_cost_order() {
        let graph = fixture();
        let set = k_shortest_paths(&graph, &[pair()], 3).unwrap();
        let paths = set.paths(0);
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[0].cost, 100.0);
        assert_eq!(paths[1].cost, 170.0);
        assert_eq!(paths[2].cost, 250.0);
        for window in paths.windows(2) {
            assert!(window[0].cost <= window[1].cost);
        }
    }

    #[test]
    fn k_bounds_the_result() {
        let graph = fixture();
        let set = k_shortest_paths(&graph, &[pair()], 2).unwrap();
        assert_eq!(set.paths(0).len(), 2);
        let set = k_shortest_paths(&graph, &[pair()], 1).unwrap();
        assert_eq!(set.paths(0).len(), 1);
        assert_eq!(set.paths(0)[0].cost, 100.0);
    }

    #[test]
    fn paths_are_loop_free() {
        let graph = fixture();
        let set = k_shortest_paths(&graph, &[pair()], 5).unwrap();
        for path in set.paths(0) {
            let mut origins: Vec<_> = path
                .edges
                .iter()
                .map(|&edge| graph.edge_endpoints(edge).0)
                .collect();
            origins.sort();
            origins.dedup();
            assert_eq!(origins.len(), path.edges.len());
        }
    }

    #[test]
    fn duration_cost_type_prefers_traffic_adjusted_values() {
        let mut graph = fixture();
        let pair = OdPair::new("A", "B", CostType::Duration);
        let set = k_shortest_paths(&graph, &[pair.clone()], 1).unwrap();
        assert_eq!(set.paths(0)[0].cost, 10.0);

        // Congestion on the direct edge makes the detour via node 3 cheapest.
        let idx = graph.edge_index(0).unwrap();
        graph.edge_by_index_mut(idx).traffic_duration = Some(60.0);
        let set = k_shortest_paths(&graph, &[pair], 1).unwrap();
        assert_eq!(set.paths(0)[0].cost, 17.0);
    }

    #[test]
    fn unreachable_pair_is_no_route_found() {
        let mut graph = fixture();
        graph.add_or_update_node(RoadNode::new(9, Point::new(0.0, 0.0), Tags::new()));
        graph.set_od_label(9, "Z").unwrap();
        let result = k_shortest_paths(&graph, &[OdPair::new("Z", "B", CostType::Distance)], 3);
        assert!(matches!(result, Err(Error::NoRouteFound)));
    }

    #[test]
    fn one_empty_pair_among_routable_ones_is_tolerated() {
        let mut graph = fixture();
        graph.add_or_update_node(RoadNode::new(9, Point::new(0.0, 0.0), Tags::new()));
        graph.set_od_label(9, "Z").unwrap();
        let set = k_shortest_paths(
            &graph,
            &[pair(), OdPair::new("Z", "B", CostType::Distance)],
            3,
        )
        .unwrap();
        assert_eq!(set.paths(0).len(), 3);
        assert!(set.paths(1).is_empty());
    }

    #[test]
    fn unknown_label_is_invalid_data() {
        let graph = fixture();
        let result = k_shortest_paths(&graph, &[OdPair::new("A", "nope", CostType::Distance)], 3);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn unresolved_edges_are_skipped() {
        let mut graph = fixture();
        for id in 0..=4u64 {
            let idx = graph.edge_index(id).unwrap();
            graph.edge_by_index_mut(idx).distance = None;
        }
        // Distances gone, durations still resolved.
        let result = k_shortest_paths(&graph, &[pair()], 3);
        assert!(matches!(result, Err(Error::NoRouteFound)));
        let set = k_shortest_paths(&graph, &[OdPair::new("A", "B", CostType::Duration)], 3).unwrap();
        assert_eq!(set.paths(0).len(), 3);
    }
}
