//! Convenience re-exports of the engine surface.

pub use crate::assignment::{AssignmentTables, assign};
pub use crate::config::EngineConfig;
pub use crate::error::Error;
pub use crate::estimation::{LinkFlow, estimate_demand};
pub use crate::loading::{
    LegData, NetworkData, apply_leg_data, capacity_factor, road_graph_from_elements,
};
pub use crate::model::network::{CostType, RoadEdge, RoadGraph, RoadNode};
pub use crate::model::od::OdPair;
pub use crate::routing::{PathSet, RoutePath, k_shortest_paths};
pub use crate::simulation::{
    CongestionLevel, EdgeReport, LtmSimulation, NodeReport, SimulationState, SimulationStats,
};
pub use crate::{EdgeId, NodeId, WayId};
