//! Travel-time/traffic provider contract.

use geo::{Distance, Haversine};
use log::warn;
use serde::Deserialize;

use crate::model::network::RoadGraph;
use crate::{EdgeId, Error};

/// A reported distance may exceed the great-circle distance between the edge
/// endpoints by at most this factor before the leg is considered
/// implausible.
const GEODESIC_SLACK: f64 = 10.0;

/// One leg of a travel-time provider response.
#[derive(Debug, Clone, Deserialize)]
pub struct LegData {
    /// Travelled distance in meters
    pub distance: f64,
    /// Travel time in seconds
    pub duration: f64,
    /// Travel time under current traffic, when available
    pub duration_in_traffic: Option<f64>,
    /// Number of steps the provider split the leg into
    pub steps: usize,
}

/// Applies a provider leg to an edge.
///
/// Legs failing the plausibility checks leave the edge's resolved attributes
/// empty; the condition is logged and recovered, never propagated. Callers
/// must tolerate edges whose attributes stay unresolved.
///
/// # Errors
///
/// Returns [`Error::InvalidData`] when the edge id is unknown.
pub fn apply_leg_data(graph: &mut RoadGraph, edge_id: EdgeId, leg: &LegData) -> Result<(), Error> {
    let edge_idx = graph
        .edge_index(edge_id)
        .ok_or_else(|| Error::InvalidData(format!("unknown edge {edge_id}")))?;
    let (from, to) = graph.edge_endpoints(edge_idx);
    let bound = GEODESIC_SLACK
        * Haversine.distance(
            graph.node_by_index(from).geometry,
            graph.node_by_index(to).geometry,
        );

    if let Some(reason) = implausibility(leg, bound) {
        warn!("Inconsistent leg data for edge {edge_id}: {reason}");
        let edge = graph.edge_by_index_mut(edge_idx);
        edge.distance = None;
        edge.duration = None;
        edge.traffic_duration = None;
        return Ok(());
    }

    let edge = graph.edge_by_index_mut(edge_idx);
    edge.distance = Some(leg.distance);
    edge.duration = Some(leg.duration);
    edge.traffic_duration = leg.duration_in_traffic;
    Ok(())
}

fn implausibility(leg: &LegData, geodesic_bound: f64) -> Option<&'static str> {
    if leg.steps != 1 {
        return Some("a single edge must come back as a single-step leg");
    }
    if leg.distance < 0.0 || leg.duration < 0.0 || leg.duration_in_traffic.is_some_and(|d| d < 0.0)
    {
        return Some("negative distance or duration");
    }
    if geodesic_bound > 0.0 && leg.distance > geodesic_bound {
        return Some("distance far exceeds the great-circle bound between the endpoints");
    }
    None
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use super::*;
    use crate::model::network::{RoadEdge, RoadNode, Tags};

    fn graph_with_edge() -> RoadGraph {
        let mut graph = RoadGraph::new();
        // Roughly 1.1 km apart.
        graph.add_or_update_node(RoadNode::new(1, Point::new(11.50, 48.10), Tags::new()));
        graph.add_or_update_node(RoadNode::new(2, Point::new(11.51, 48.10), Tags::new()));
        graph
            .add_edge(RoadEdge::new(0, 100, 1, 2, Tags::new()))
            .unwrap();
        graph
    }

    #[test]
    fn plausible_leg_resolves_edge_attributes() {
        let mut graph = graph_with_edge();
        let leg = LegData {
            distance: 820.0,
            duration: 65.0,
            duration_in_traffic: Some(91.0),
            steps: 1,
        };
        apply_leg_data(&mut graph, 0, &leg).unwrap();
        let edge = graph.edge(0).unwrap();
        assert_eq!(edge.distance, Some(820.0));
        assert_eq!(edge.duration, Some(65.0));
        assert_eq!(edge.traffic_duration, Some(91.0));
    }

    #[test]
    fn multi_step_leg_is_nulled() {
        let mut graph = graph_with_edge();
        let leg = LegData {
            distance: 820.0,
            duration: 65.0,
            duration_in_traffic: None,
            steps: 3,
        };
        apply_leg_data(&mut graph, 0, &leg).unwrap();
        let edge = graph.edge(0).unwrap();
        assert_eq!(edge.distance, None);
        assert_eq!(edge.duration, None);
    }

    #[test]
    fn distance_beyond_geodesic_bound_is_nulled() {
        let mut graph = graph_with_edge();
        // Hundreds of kilometres for a ~1 km hop.
        let leg = LegData {
            distance: 400_000.0,
            duration: 65.0,
            duration_in_traffic: None,
            steps: 1,
        };
        apply_leg_data(&mut graph, 0, &leg).unwrap();
        assert_eq!(graph.edge(0).unwrap().distance, None);
    }

    #[test]
    fn unknown_edge_is_an_error() {
        let mut graph = graph_with_edge();
        let leg = LegData {
            distance: 1.0,
            duration: 1.0,
            duration_in_traffic: None,
            steps: 1,
        };
        assert!(apply_leg_data(&mut graph, 42, &leg).is_err());
    }
}
