//! Discrete-time dynamic network loading (link transmission model).
//!
//! Cumulative vehicle counts are propagated edge by edge over a fixed time
//! step. Every step runs three sub-phases network-wide, in order: boundary
//! (sending/receiving) flows, node transition flows, cumulative counter
//! updates. A phase completes for every node before the next begins.

mod graph;

pub use graph::{CongestionCounters, CongestionLevel, EdgeDynamics};

use std::time::{Duration, Instant};

use hashbrown::HashMap;
use log::{debug, info};

use crate::EdgeId;
use crate::Error;
use crate::algo::extrapolation::extrapolate;
use crate::assignment::AssignmentTables;
use crate::config::EngineConfig;
use crate::model::network::RoadGraph;
use crate::routing::PathSet;
use graph::SimGraph;

/// Below this many vehicles an edge volume snaps to zero, so drain
/// detection stays exact despite float accumulation.
const VOLUME_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Uninitialized,
    Running,
    Paused,
    Ended,
}

/// Network-wide statistics, recomputed after every step.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulationStats {
    /// Simulated seconds
    pub elapsed: f64,
    /// Completed steps
    pub steps: usize,
    /// Vehicles currently on the network
    pub total_volume: f64,
    /// Vehicles injected at origins so far
    pub started: f64,
    /// Vehicles absorbed at destinations so far
    pub arrived: f64,
    /// Flow-weighted network mean speed in m/s
    pub mean_speed: f64,
}

/// Snapshot of one edge's loading state.
#[derive(Debug, Clone)]
pub struct EdgeReport {
    pub edge: EdgeId,
    pub volume: f64,
    pub level: CongestionLevel,
    pub counters: CongestionCounters,
    /// Vehicles that finished crossing the edge
    pub crossings: f64,
    pub dynamics: EdgeDynamics,
}

/// Started/arrived totals of one node.
#[derive(Debug, Clone)]
pub struct NodeReport {
    /// Topology arena handle of the node
    pub node: petgraph::graph::NodeIndex,
    pub started: f64,
    pub arrived: f64,
}

/// The dynamic loading simulator.
///
/// Exclusively owns its simulation graph while a run is active; the
/// topology store is only read at `init`. Stepping is driven externally -
/// one `propagate_flows` call per scheduler tick, never interleaved.
pub struct LtmSimulation {
    config: EngineConfig,
    state: SimulationState,
    graph: Option<SimGraph>,
    /// Time axis, one entry per completed step plus the initial point
    timeline: Vec<f64>,
    stats: SimulationStats,
    last_step_duration: Duration,
}

impl LtmSimulation {
    pub fn new(config: EngineConfig) -> Self {
        LtmSimulation {
            config,
            state: SimulationState::Uninitialized,
            graph: None,
            timeline: Vec::new(),
            stats: SimulationStats::default(),
            last_step_duration: Duration::ZERO,
        }
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn timeline(&self) -> &[f64] {
        &self.timeline
    }

    /// Fixed step size of the active run, in seconds.
    pub fn step_size(&self) -> Option<f64> {
        self.graph.as_ref().map(|sim| sim.dt)
    }

    /// Lower bound for the external scheduler's inter-step delay: the
    /// wall-clock duration of the last completed step. Observed, not
    /// estimated.
    pub fn min_step_delay(&self) -> Duration {
        self.last_step_duration
    }

    /// Builds the simulation graph and arms the time axis at t=0.
    /// Uninitialized -> Paused.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] when a run is already initialized,
    /// [`Error::NoData`] when no routed edge exists.
    pub fn init(
        &mut self,
        graph: &RoadGraph,
        paths: &PathSet,
        tables: &AssignmentTables,
        demand: &[Option<u32>],
        capacity_factor: f64,
    ) -> Result<(), Error> {
        if self.state != SimulationState::Uninitialized {
            return Err(Error::InvalidData(
                "simulation is already initialized".into(),
            ));
        }
        let sim = SimGraph::build(graph, paths, tables, demand, capacity_factor, &self.config)?;
        info!(
            "Simulation initialized: {} nodes, {} edges, {} paths, {:.0} vehicles, dt {:.2}s",
            sim.nodes.len(),
            sim.edges.len(),
            sim.paths.len(),
            sim.remaining_demand(),
            sim.dt
        );
        self.timeline = vec![0.0];
        self.stats = SimulationStats::default();
        self.graph = Some(sim);
        self.state = SimulationState::Paused;
        Ok(())
    }

    /// One simulation step: the three phases for every node and edge, then
    /// statistics and the time-axis extension. Paused -> Running; the run
    /// ends when the network has fully drained.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidData`] unless the simulation is Paused or Running.
    pub fn propagate_flows(&mut self) -> Result<(), Error> {
        match self.state {
            SimulationState::Paused | SimulationState::Running => {}
            _ => return Err(Error::InvalidData("simulation is not active".into())),
        }
        self.state = SimulationState::Running;
        let started_at = Instant::now();

        let sim = self.graph.as_mut().expect("active simulation owns a graph");
        let t = *self.timeline.last().expect("time axis is armed at init");
        let t_next = t + sim.dt;

        boundary_flows(sim, &self.timeline, t_next);
        transition_flows(sim);
        let total_volume = cumulative_update(sim, &self.config);

        self.stats = collect_stats(sim, t_next, self.stats.steps + 1, total_volume);
        self.timeline.push(t_next);
        self.last_step_duration = started_at.elapsed();

        if total_volume == 0.0 {
            debug!("network drained after {} steps", self.stats.steps);
            self.state = SimulationState::Ended;
        }
        Ok(())
    }

    /// Running -> Paused. The graph is left exactly as of the last completed
    /// step; cancelling the pending tick is the scheduler's job.
    pub fn pause(&mut self) {
        if self.state == SimulationState::Running {
            self.state = SimulationState::Paused;
        }
    }

    /// Discards the simulation graph and time axis. Any state ->
    /// Uninitialized.
    pub fn reset(&mut self) {
        self.graph = None;
        self.timeline.clear();
        self.stats = SimulationStats::default();
        self.last_step_duration = Duration::ZERO;
        self.state = SimulationState::Uninitialized;
    }

    /// Alias of [`Self::reset`] matching the external control surface.
    pub fn stop(&mut self) {
        self.reset();
    }

    /// Per-node started/arrived totals.
    pub fn node_reports(&self) -> Vec<NodeReport> {
        self.graph
            .as_ref()
            .map(|sim| {
                sim.nodes
                    .iter()
                    .map(|node| NodeReport {
                        node: node.node,
                        started: node.started,
                        arrived: node.arrived,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Per-edge loading snapshots, in routed-edge order.
    pub fn edge_reports(&self) -> Vec<EdgeReport> {
        self.graph
            .as_ref()
            .map(|sim| {
                sim.edges
                    .iter()
                    .map(|edge| EdgeReport {
                        edge: edge.id,
                        volume: edge.volume,
                        level: edge.level,
                        counters: edge.counters,
                        crossings: edge.crossings,
                        dynamics: edge.dynamics,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Phase 1: sending and receiving flows, every edge.
///
/// The cumulative upstream (downstream) curve is extrapolated at the next
/// time point offset by minus (plus) the free-flow travel time; both results
/// are capped by the per-step capacity.
fn boundary_flows(sim: &mut SimGraph, timeline: &[f64], t_next: f64) {
    let dt = sim.dt;
    for edge in &mut sim.edges {
        let step_capacity = edge.capacity * dt;
        assert!(step_capacity >= 0.0, "negative edge capacity");

        let upstream_at = extrapolate(timeline, &edge.upstream, t_next - edge.travel_time);
        let downstream_now = *edge.downstream.last().expect("seeded at init");
        edge.sending = (upstream_at - downstream_now).clamp(0.0, step_capacity);

        let downstream_at = extrapolate(timeline, &edge.downstream, t_next + edge.travel_time);
        let upstream_now = *edge.upstream.last().expect("seeded at init");
        edge.receiving =
            (downstream_at + edge.storage - upstream_now).clamp(0.0, step_capacity);

        edge.inflow = 0.0;
        edge.outflow = 0.0;
    }
}

/// Phase 2: transition flows, node by node.
///
/// Each incoming edge's sending flow splits across the node's outgoing
/// edges by demand-weighted turn fractions, constrained to a fair share of
/// the receiving capacity against all competing inflows. Origins inject
/// bounded by unsent demand and remaining receiving room; destinations
/// absorb terminating flow unconditionally.
fn transition_flows(sim: &mut SimGraph) {
    let SimGraph {
        nodes,
        edges,
        paths,
        ..
    } = sim;

    for node_id in 0..nodes.len() {
        // Competing sending shares per outgoing edge of this node.
        let mut competing: HashMap<usize, f64> = nodes[node_id]
            .outgoing
            .iter()
            .map(|&out| (out, 0.0))
            .collect();
        let mut desired: Vec<(usize, usize, f64)> = Vec::new();
        let mut absorbed_here = 0.0;

        for position in 0..nodes[node_id].incoming.len() {
            let edge_id = nodes[node_id].incoming[position];
            let sending = edges[edge_id].sending;
            if sending <= 0.0 {
                continue;
            }
            for slot in 0..edges[edge_id].succ.len() {
                let (successor, fraction) = edges[edge_id].succ[slot];
                let share = sending * fraction;
                if share <= 0.0 {
                    continue;
                }
                match successor {
                    Some(out) => {
                        desired.push((edge_id, out, share));
                        *competing.entry(out).or_insert(0.0) += share;
                    }
                    // Terminating share: the destination absorbs it no
                    // matter what.
                    None => {
                        edges[edge_id].outflow += share;
                        absorbed_here += share;
                    }
                }
            }
        }
        nodes[node_id].arrived += absorbed_here;

        for (edge_id, out, share) in desired {
            let total = competing[&out];
            // Guarded fair share: an empty competing pool moves nothing
            // instead of dividing by zero.
            let admitted = if total > 0.0 {
                share.min(edges[out].receiving * share / total)
            } else {
                0.0
            };
            edges[edge_id].outflow += admitted;
            edges[out].inflow += admitted;
        }

        // Origin injection, after the network traffic has claimed its
        // receiving room.
        for position in 0..nodes[node_id].origin_paths.len() {
            let path = &mut paths[nodes[node_id].origin_paths[position]];
            if path.remaining <= 0.0 {
                continue;
            }
            let first = path.edges[0];
            let room = (edges[first].receiving - edges[first].inflow).max(0.0);
            let injected = path.remaining.min(room);
            if injected > 0.0 {
                edges[first].inflow += injected;
                path.remaining -= injected;
                nodes[node_id].started += injected;
            }
        }
    }
}

/// Phase 3: cumulative counters, congestion classification, dynamics.
/// Returns the total network volume.
fn cumulative_update(sim: &mut SimGraph, config: &EngineConfig) -> f64 {
    let dt = sim.dt;
    let mut total = 0.0;
    for edge in &mut sim.edges {
        let upstream = edge.upstream.last().expect("seeded at init") + edge.inflow;
        let mut downstream = edge.downstream.last().expect("seeded at init") + edge.outflow;
        let mut volume = upstream - downstream;
        assert!(volume > -VOLUME_EPS, "more vehicles left an edge than entered");
        if volume.abs() < VOLUME_EPS {
            // Snap float crumbs so the drain condition is exact.
            downstream = upstream;
            volume = 0.0;
        }
        edge.upstream.push(upstream);
        edge.downstream.push(downstream);
        edge.volume = volume;
        edge.crossings += edge.outflow;

        edge.level = if volume >= config.heavy_threshold * edge.storage {
            CongestionLevel::Heavy
        } else if volume >= config.moderate_threshold * edge.storage {
            CongestionLevel::Moderate
        } else {
            CongestionLevel::Free
        };
        match edge.level {
            CongestionLevel::Free => edge.counters.free += 1,
            CongestionLevel::Moderate => edge.counters.moderate += 1,
            CongestionLevel::Heavy => edge.counters.heavy += 1,
        }

        edge.dynamics.flow = edge.outflow / dt;
        edge.dynamics.density = volume / edge.length;
        edge.dynamics.velocity = if edge.dynamics.density > 0.0 {
            (edge.dynamics.flow / edge.dynamics.density).min(edge.free_flow_velocity())
        } else {
            edge.free_flow_velocity()
        };

        total += volume;
    }
    total
}

/// Started/arrived totals and the flow-weighted network mean speed.
fn collect_stats(sim: &SimGraph, elapsed: f64, steps: usize, total_volume: f64) -> SimulationStats {
    let started = sim.nodes.iter().map(|node| node.started).sum();
    let arrived = sim.nodes.iter().map(|node| node.arrived).sum();
    let flow_sum: f64 = sim.edges.iter().map(|edge| edge.dynamics.flow).sum();
    let mean_speed = if flow_sum > 0.0 {
        sim.edges
            .iter()
            .map(|edge| edge.dynamics.flow * edge.dynamics.velocity)
            .sum::<f64>()
            / flow_sum
    } else {
        // Nothing moves: report the free-flow average instead of 0/0.
        sim.edges
            .iter()
            .map(|edge| edge.free_flow_velocity())
            .sum::<f64>()
            / sim.edges.len() as f64
    };
    SimulationStats {
        elapsed,
        steps,
        total_volume,
        started,
        arrived,
        mean_speed,
    }
}
