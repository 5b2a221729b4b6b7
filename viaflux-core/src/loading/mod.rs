//! Provider contracts and graph construction.
//!
//! The engine consumes three external providers: a network data provider
//! returning structured map elements, a travel-time/traffic provider
//! returning per-edge leg data, and a weather provider whose observations
//! collapse into a single capacity factor. Only the payload shapes live
//! here - transport is somebody else's problem.

mod builder;
pub mod elements;
mod travel_time;
mod weather;

pub use builder::road_graph_from_elements;
pub use elements::{Element, NetworkData};
pub use travel_time::{LegData, apply_leg_data};
pub use weather::capacity_factor;
