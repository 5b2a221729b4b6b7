//! Simulation-time view of the road network.
//!
//! The loading simulation never mutates the topology store. It owns a
//! parallel arena of [`SimNode`]/[`SimEdge`] wrappers, each holding the
//! static topology reference plus the mutable time-series state - a graph
//! view with extra state, attached by composition.

use hashbrown::HashMap;
use log::debug;
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::assignment::AssignmentTables;
use crate::config::EngineConfig;
use crate::model::network::{CostType, RoadEdge, RoadGraph};
use crate::routing::PathSet;
use crate::{EdgeId, Error};

/// Saturation flow of a single lane, vehicles per second.
const LANE_SATURATION_FLOW: f64 = 0.5;

/// Speed assumed when only one of distance/duration is resolved, m/s.
const FALLBACK_SPEED: f64 = 13.9;

/// Congestion classification of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionLevel {
    Free,
    Moderate,
    Heavy,
}

/// Occurrences of each congestion level over the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct CongestionCounters {
    pub free: u32,
    pub moderate: u32,
    pub heavy: u32,
}

/// Derived dynamic attributes of an edge, recomputed every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeDynamics {
    /// Vehicles per meter
    pub density: f64,
    /// Vehicles per second leaving the edge over the last step
    pub flow: f64,
    /// Meters per second
    pub velocity: f64,
}

/// Static topology reference plus the mutable loading state of one edge.
#[derive(Debug, Clone)]
pub(crate) struct SimEdge {
    /// Topology reference: the provider-facing edge id
    pub id: EdgeId,
    /// Simulation node ids
    pub from: usize,
    pub to: usize,
    /// Free-flow traversal time in seconds
    pub travel_time: f64,
    /// Length in meters
    pub length: f64,
    /// Vehicles the edge can admit per second, weather-adjusted
    pub capacity: f64,
    /// Vehicles the edge holds at capacity flow
    pub storage: f64,
    /// Demand-weighted successors: `None` is the terminating share.
    /// Fractions over a single incoming edge sum to 1 (or the list is empty
    /// when no demand crosses the edge).
    pub succ: Vec<(Option<usize>, f64)>,
    /// Cumulative vehicle count at the upstream end, one sample per time
    /// point
    pub upstream: Vec<f64>,
    /// Cumulative vehicle count at the downstream end
    pub downstream: Vec<f64>,
    pub sending: f64,
    pub receiving: f64,
    pub inflow: f64,
    pub outflow: f64,
    pub volume: f64,
    pub crossings: f64,
    pub level: CongestionLevel,
    pub counters: CongestionCounters,
    pub dynamics: EdgeDynamics,
}

impl SimEdge {
    pub fn free_flow_velocity(&self) -> f64 {
        self.length / self.travel_time
    }
}

/// Static topology reference plus the mutable state of one node.
#[derive(Debug, Clone)]
pub(crate) struct SimNode {
    /// Topology arena handle
    pub node: NodeIndex,
    pub incoming: Vec<usize>,
    pub outgoing: Vec<usize>,
    /// Paths injecting demand at this node
    pub origin_paths: Vec<usize>,
    /// Vehicles started here
    pub started: f64,
    /// Vehicles arrived here
    pub arrived: f64,
}

/// One routed path with its demand share.
#[derive(Debug, Clone)]
pub(crate) struct SimPath {
    /// Simulation edge ids in traversal order
    pub edges: Vec<usize>,
    /// Vehicles this path injects over the whole run
    pub demand: f64,
    /// Vehicles not yet injected
    pub remaining: f64,
}

/// The mutable simulation graph, discarded at reset.
#[derive(Debug, Clone)]
pub(crate) struct SimGraph {
    pub nodes: Vec<SimNode>,
    pub edges: Vec<SimEdge>,
    pub paths: Vec<SimPath>,
    /// Fixed simulation time step in seconds
    pub dt: f64,
}

impl SimGraph {
    /// Builds the simulation view from a snapshot of topology, routed paths,
    /// assignment and estimated demand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoData`] when no routed edge exists.
    ///
    /// # Panics
    ///
    /// Non-positive capacities or travel times are programming-contract
    /// violations, as are capacity factors outside `(0, 1]`.
    pub fn build(
        graph: &RoadGraph,
        paths: &PathSet,
        tables: &AssignmentTables,
        demand: &[Option<u32>],
        capacity_factor: f64,
        config: &EngineConfig,
    ) -> Result<Self, Error> {
        assert!(
            capacity_factor > 0.0 && capacity_factor <= 1.0,
            "capacity factor out of range"
        );
        assert!(
            config.heavy_threshold >= config.moderate_threshold,
            "congestion thresholds out of order"
        );
        if tables.edge_index.is_empty() {
            return Err(Error::NoData);
        }

        let mut nodes: Vec<SimNode> = Vec::new();
        let mut node_ids: HashMap<NodeIndex, usize> = HashMap::new();
        let mut edges: Vec<SimEdge> = Vec::with_capacity(tables.edge_index.len());
        let mut edge_ids: HashMap<EdgeIndex, usize> = HashMap::new();

        for &edge_idx in &tables.edge_index {
            let (from, to) = graph.edge_endpoints(edge_idx);
            let from_id = intern_node(&mut nodes, &mut node_ids, from);
            let to_id = intern_node(&mut nodes, &mut node_ids, to);
            let road_edge = graph.edge_by_index(edge_idx);
            let (travel_time, length) = resolved_geometry(road_edge);
            let capacity = lanes(road_edge) * LANE_SATURATION_FLOW * capacity_factor;
            assert!(capacity > 0.0, "edge capacity must be positive");
            assert!(travel_time > 0.0, "edge travel time must be positive");

            let sim_edge_id = edges.len();
            nodes[from_id].outgoing.push(sim_edge_id);
            nodes[to_id].incoming.push(sim_edge_id);
            edges.push(SimEdge {
                id: road_edge.id,
                from: from_id,
                to: to_id,
                travel_time,
                length,
                capacity,
                storage: capacity * travel_time,
                succ: Vec::new(),
                upstream: vec![0.0],
                downstream: vec![0.0],
                sending: 0.0,
                receiving: 0.0,
                inflow: 0.0,
                outflow: 0.0,
                volume: 0.0,
                crossings: 0.0,
                level: CongestionLevel::Free,
                counters: CongestionCounters::default(),
                dynamics: EdgeDynamics::default(),
            });
            edge_ids.insert(edge_idx, sim_edge_id);
        }

        // Per-path demand shares: the pair's estimated demand split
        // proportionally to choice probability, integer remainder on the
        // first path so the total is preserved.
        let mut sim_paths: Vec<SimPath> = Vec::new();
        for (pair_idx, pair_paths) in paths.iter().enumerate() {
            if pair_paths.is_empty() {
                continue;
            }
            let pair_demand = demand.get(pair_idx).copied().flatten().unwrap_or(0);
            let shares = demand_shares(&tables.probabilities[pair_idx], pair_demand);
            for (path, share) in pair_paths.iter().zip(shares) {
                let edge_list: Vec<usize> =
                    path.edges.iter().map(|edge| edge_ids[edge]).collect();
                let Some(&first) = edge_list.first() else {
                    continue;
                };
                let origin_node = edges[first].from;
                nodes[origin_node].origin_paths.push(sim_paths.len());
                let share = f64::from(share);
                sim_paths.push(SimPath {
                    edges: edge_list,
                    demand: share,
                    remaining: share,
                });
            }
        }

        // Demand-weighted turn fractions: how an edge's sending flow splits
        // across its successors (None terminates at the edge's target).
        let mut turn_weights: HashMap<(usize, Option<usize>), f64> = HashMap::new();
        for path in &sim_paths {
            if path.demand <= 0.0 {
                continue;
            }
            for window in path.edges.windows(2) {
                *turn_weights.entry((window[0], Some(window[1]))).or_insert(0.0) += path.demand;
            }
            if let Some(&last) = path.edges.last() {
                *turn_weights.entry((last, None)).or_insert(0.0) += path.demand;
            }
        }
        let mut per_edge: HashMap<usize, f64> = HashMap::new();
        for (&(edge, _), &weight) in &turn_weights {
            *per_edge.entry(edge).or_insert(0.0) += weight;
        }
        for ((edge, successor), weight) in turn_weights {
            let total = per_edge[&edge];
            // An edge no demand crosses keeps an empty successor list; its
            // (zero) flow has nowhere to go by construction.
            if total > 0.0 {
                edges[edge].succ.push((successor, weight / total));
            }
        }
        for edge in &mut edges {
            // Deterministic split order regardless of hash iteration.
            edge.succ
                .sort_by_key(|&(successor, _)| successor.map_or(usize::MAX, |s| s));
        }

        let min_travel_time = edges
            .iter()
            .map(|edge| edge.travel_time)
            .fold(f64::INFINITY, f64::min);
        let dt = min_travel_time.min(config.max_step);

        debug!(
            "simulation graph: {} nodes, {} edges, {} paths, dt {:.2}s",
            nodes.len(),
            edges.len(),
            sim_paths.len(),
            dt
        );
        Ok(SimGraph {
            nodes,
            edges,
            paths: sim_paths,
            dt,
        })
    }

    /// Total demand not yet injected at the origins.
    pub fn remaining_demand(&self) -> f64 {
        self.paths.iter().map(|path| path.remaining).sum()
    }
}

fn intern_node(
    nodes: &mut Vec<SimNode>,
    node_ids: &mut HashMap<NodeIndex, usize>,
    node: NodeIndex,
) -> usize {
    *node_ids.entry(node).or_insert_with(|| {
        nodes.push(SimNode {
            node,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            origin_paths: Vec::new(),
            started: 0.0,
            arrived: 0.0,
        });
        nodes.len() - 1
    })
}

/// Free-flow travel time and length of a routed edge; a missing attribute is
/// derived from the other at [`FALLBACK_SPEED`].
///
/// **Panics** when neither attribute is resolved - a routed edge always has
/// at least one.
fn resolved_geometry(edge: &RoadEdge) -> (f64, f64) {
    let travel_time = edge
        .cost(CostType::Duration)
        .or_else(|| edge.distance.map(|d| d / FALLBACK_SPEED))
        .expect("routed edge has a resolved attribute");
    let length = edge
        .distance
        .or_else(|| edge.cost(CostType::Duration).map(|d| d * FALLBACK_SPEED))
        .expect("routed edge has a resolved attribute");
    (travel_time, length)
}

/// Lane count from the `lanes` tag, defaulting to a single lane.
fn lanes(edge: &RoadEdge) -> f64 {
    edge.tags
        .get("lanes")
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|&lanes| lanes >= 1.0)
        .unwrap_or(1.0)
}

/// Splits a pair's demand across its paths proportionally to choice
/// probability; the integer remainder goes to the first path so the total is
/// preserved.
fn demand_shares(probabilities: &[f64], demand: u32) -> Vec<u32> {
    if probabilities.is_empty() {
        return Vec::new();
    }
    let mut shares = vec![0u32; probabilities.len()];
    let mut tail = 0u32;
    for (idx, &probability) in probabilities.iter().enumerate().skip(1) {
        shares[idx] = (probability * f64::from(demand)).floor() as u32;
        tail += shares[idx];
    }
    shares[0] = demand.saturating_sub(tail);
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_shares_preserve_the_integer_total() {
        assert_eq!(demand_shares(&[0.448, 0.322, 0.23], 10), vec![5, 3, 2]);
        assert_eq!(demand_shares(&[0.5, 0.5], 7), vec![4, 3]);
        assert_eq!(demand_shares(&[1.0], 33), vec![33]);
        assert_eq!(demand_shares(&[], 5), Vec::<u32>::new());
        let shares = demand_shares(&[0.333, 0.333, 0.333], 100);
        assert_eq!(shares.iter().sum::<u32>(), 100);
        // Remainder lands on the first path.
        assert_eq!(shares, vec![34, 33, 33]);
    }
}
