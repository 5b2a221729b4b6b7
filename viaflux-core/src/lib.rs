//! Traffic-flow estimation and dynamic network loading engine.
//!
//! The engine derives a road graph from provider map data, enumerates route
//! alternatives per origin/destination pair, turns their costs into
//! multinomial-logit choice probabilities, infers unobserved demand from
//! observed link flows and finally propagates the resulting vehicle counts
//! through the network with a link transmission model, step by step, until
//! the network drains.

pub mod algo;
pub mod assignment;
pub mod config;
pub mod error;
pub mod estimation;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod simulation;

pub use error::Error;

/// External id of a node, as assigned by the network data provider.
pub type NodeId = i64;

/// Id of a way in the provider response.
pub type WayId = i64;

/// Sequential id of an edge, assigned at graph construction.
pub type EdgeId = u64;
