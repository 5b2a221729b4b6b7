//! Data model of the road network.

pub mod network;
pub mod od;

pub use network::{CostType, RoadEdge, RoadGraph, RoadNode};
pub use od::OdPair;
