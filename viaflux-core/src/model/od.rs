//! Origin/destination pairs.

use serde::{Deserialize, Serialize};

use super::network::CostType;

/// An origin/destination pair demand and route alternatives are computed
/// for. Labels resolve through [`RoadGraph::od_node`](super::RoadGraph::od_node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdPair {
    /// Label of the origin node
    pub origin: String,
    /// Label of the destination node
    pub destination: String,
    /// Attribute paths between the pair are costed by
    pub cost_type: CostType,
}

impl OdPair {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        cost_type: CostType,
    ) -> Self {
        OdPair {
            origin: origin.into(),
            destination: destination.into(),
            cost_type,
        }
    }
}
