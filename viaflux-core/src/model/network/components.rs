//! Road network components - nodes, edges, and pass-through relations

use geo::Point;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{EdgeId, NodeId, WayId};

/// Tag set carried by nodes, edges and relations (OSM-style key/value pairs).
pub type Tags = HashMap<String, String>;

/// Attribute an OD pair's paths are costed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostType {
    Distance,
    Duration,
}

/// Road graph node
#[derive(Debug, Clone)]
pub struct RoadNode {
    /// Provider id of the node
    pub id: NodeId,
    /// Label marking the node as an origin/destination candidate
    pub od_label: Option<String>,
    /// Node coordinates
    pub geometry: Point<f64>,
    /// Semantic attributes
    pub tags: Tags,
}

impl RoadNode {
    pub fn new(id: NodeId, geometry: Point<f64>, tags: Tags) -> Self {
        RoadNode {
            id,
            od_label: None,
            geometry,
            tags,
        }
    }

    /// Merges a second record describing the same node. Tag sets are unioned;
    /// the OD label is only filled in, never overwritten.
    pub(crate) fn merge(&mut self, other: RoadNode) {
        debug_assert_eq!(self.id, other.id);
        for (key, value) in other.tags {
            self.tags.entry(key).or_insert(value);
        }
        if self.od_label.is_none() {
            self.od_label = other.od_label;
        }
    }
}

/// Road graph edge (one way segment)
#[derive(Debug, Clone)]
pub struct RoadEdge {
    /// Sequential id assigned at insertion
    pub id: EdgeId,
    /// Id of the way this segment was cut from
    pub way_id: WayId,
    /// Provider id of the origin node
    pub from: NodeId,
    /// Provider id of the destination node
    pub to: NodeId,
    /// Semantic attributes inherited from the way
    pub tags: Tags,
    /// Length in meters, once resolved by the travel-time provider
    pub distance: Option<f64>,
    /// Free-flow traversal time in seconds
    pub duration: Option<f64>,
    /// Traversal time under current traffic, when the provider supplied one
    pub traffic_duration: Option<f64>,
}

impl RoadEdge {
    pub fn new(id: EdgeId, way_id: WayId, from: NodeId, to: NodeId, tags: Tags) -> Self {
        RoadEdge {
            id,
            way_id,
            from,
            to,
            tags,
            distance: None,
            duration: None,
            traffic_duration: None,
        }
    }

    /// Cost of traversing the edge under the given cost type.
    ///
    /// Durations prefer the traffic-adjusted value. `None` until the
    /// corresponding attribute has been resolved.
    pub fn cost(&self, cost_type: CostType) -> Option<f64> {
        match cost_type {
            CostType::Distance => self.distance,
            CostType::Duration => self.traffic_duration.or(self.duration),
        }
    }
}

/// One member of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    pub member_type: String,
    pub member_ref: i64,
    pub role: String,
}

/// Relation: ordered member list plus tags, passed through unmodified.
#[derive(Debug, Clone)]
pub struct Relation {
    pub id: i64,
    pub members: Vec<RelationMember>,
    pub tags: Tags,
}
