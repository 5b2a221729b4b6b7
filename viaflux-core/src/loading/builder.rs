use geo::Point;
use log::{info, warn};

use super::elements::{Element, NetworkData};
use crate::model::network::{Relation, RelationMember, RoadEdge, RoadGraph, RoadNode};
use crate::{EdgeId, Error};

/// Creates the topology store from a structured network response.
///
/// Nodes are inserted first (merging repeated records), then every
/// consecutive node pair of a way becomes one edge carrying the way's tags.
/// Relations are stored verbatim.
///
/// # Errors
///
/// Returns [`Error::NoData`] when the response holds no elements.
pub fn road_graph_from_elements(data: &NetworkData) -> Result<RoadGraph, Error> {
    if data.elements.is_empty() {
        return Err(Error::NoData);
    }

    let mut graph = RoadGraph::new();

    // Nodes first so way segmentation can resolve endpoints.
    for element in &data.elements {
        if let Element::Node(node) = element {
            graph.add_or_update_node(RoadNode::new(
                node.id,
                Point::new(node.lon, node.lat),
                node.tags.clone(),
            ));
        }
    }

    let mut next_edge_id: EdgeId = 0;
    for element in &data.elements {
        match element {
            Element::Way(way) => {
                for pair in way.nodes.windows(2) {
                    let (from, to) = (pair[0], pair[1]);
                    if graph.node_index(from).is_none() || graph.node_index(to).is_none() {
                        warn!(
                            "way {} references an unknown node, skipping segment {from} -> {to}",
                            way.id
                        );
                        continue;
                    }
                    graph.add_edge(RoadEdge::new(
                        next_edge_id,
                        way.id,
                        from,
                        to,
                        way.tags.clone(),
                    ))?;
                    next_edge_id += 1;
                }
            }
            Element::Relation(relation) => {
                graph.add_relation(Relation {
                    id: relation.id,
                    members: relation
                        .members
                        .iter()
                        .map(|member| RelationMember {
                            member_type: member.member_type.clone(),
                            member_ref: member.member_ref,
                            role: member.role.clone(),
                        })
                        .collect(),
                    tags: relation.tags.clone(),
                });
            }
            Element::Node(_) => {}
        }
    }

    info!(
        "Road graph built: {} nodes, {} edges, {} relations",
        graph.node_count(),
        graph.edge_count(),
        graph.relations().len()
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn network(nodes: &[i64], ways: &[(i64, i64)], way_tags: Value) -> NetworkData {
        let mut elements: Vec<Value> = nodes
            .iter()
            .map(|id| {
                json!({
                    "type": "node",
                    "id": id,
                    "lat": 48.1 + (*id as f64) * 1e-4,
                    "lon": 11.5 + (*id as f64) * 1e-4,
                })
            })
            .collect();
        for (way_id, (from, to)) in ways.iter().enumerate() {
            elements.push(json!({
                "type": "way",
                "id": 1000 + way_id as i64,
                "nodes": [from, to],
                "tags": way_tags.clone(),
            }));
        }
        serde_json::from_value(json!({ "elements": elements })).unwrap()
    }

    #[test]
    fn empty_response_is_no_data() {
        let data: NetworkData = serde_json::from_value(json!({ "elements": [] })).unwrap();
        assert!(matches!(road_graph_from_elements(&data), Err(Error::NoData)));
    }

    #[test]
    fn segment_and_node_counts_match_the_response() {
        // 19 single-segment ways over 12 distinct nodes.
        let nodes: Vec<i64> = (1..=12).collect();
        let ways = [
            (1, 2),
            (2, 3),
            (3, 4),
            (4, 1),
            (2, 5),
            (5, 6),
            (6, 7),
            (7, 8),
            (8, 5),
            (6, 9),
            (9, 10),
            (10, 11),
            (11, 12),
            (12, 9),
            (3, 6),
            (7, 10),
            (4, 8),
            (1, 5),
            (11, 2),
        ];
        let data = network(&nodes, &ways, json!({ "highway": "residential" }));
        let graph = road_graph_from_elements(&data).unwrap();
        assert_eq!(graph.edge_count(), 19);
        assert_eq!(graph.node_count(), 12);
    }

    #[test]
    fn roundabout_response_keeps_ring_edges_oneway() {
        // 13 distinct nodes: a 5-node ring plus 8 approach nodes, 19 edges.
        let ring: Vec<i64> = (1..=5).collect();
        let outer: Vec<i64> = (6..=13).collect();
        let mut elements: Vec<Value> = ring
            .iter()
            .chain(outer.iter())
            .map(|id| json!({ "type": "node", "id": id, "lat": 48.1, "lon": 11.5 }))
            .collect();
        // Ring segments, tagged as roundabout.
        for i in 0..5 {
            elements.push(json!({
                "type": "way",
                "id": 2000 + i,
                "nodes": [ring[i as usize], ring[((i + 1) % 5) as usize]],
                "tags": { "junction": "roundabout" },
            }));
        }
        // Approach legs in and out of the ring.
        let legs = [
            (6, 1),
            (1, 6),
            (7, 2),
            (2, 7),
            (8, 3),
            (3, 8),
            (9, 4),
            (4, 9),
            (10, 5),
            (5, 10),
            (11, 6),
            (12, 7),
            (13, 8),
            (6, 13),
        ];
        for (way_id, (from, to)) in legs.iter().enumerate() {
            elements.push(json!({
                "type": "way",
                "id": 3000 + way_id as i64,
                "nodes": [from, to],
            }));
        }
        let data: NetworkData =
            serde_json::from_value(json!({ "elements": elements })).unwrap();
        let graph = road_graph_from_elements(&data).unwrap();

        assert_eq!(graph.edge_count(), 19);
        assert_eq!(graph.node_count(), 13);
        // The five ring edges classify as roundabout and therefore one-way.
        for id in 0..5u64 {
            assert!(graph.is_roundabout(id));
            assert!(graph.is_oneway(id));
        }
        assert!(!graph.is_roundabout(5));
    }

    #[test]
    fn unknown_node_references_are_skipped() {
        let nodes = [1, 2];
        let ways = [(1, 2), (2, 99)];
        let data = network(&nodes, &ways, json!({}));
        let graph = road_graph_from_elements(&data).unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn relations_pass_through_unmodified() {
        let data: NetworkData = serde_json::from_value(json!({
            "elements": [
                { "type": "node", "id": 1, "lat": 48.1, "lon": 11.5 },
                {
                    "type": "relation",
                    "id": 7,
                    "members": [
                        { "type": "way", "ref": 1000, "role": "from" },
                        { "type": "node", "ref": 1, "role": "via" },
                    ],
                    "tags": { "restriction": "no_left_turn" },
                },
            ]
        }))
        .unwrap();
        let graph = road_graph_from_elements(&data).unwrap();
        assert_eq!(graph.relations().len(), 1);
        assert_eq!(graph.relations()[0].members.len(), 2);
        assert_eq!(graph.relations()[0].members[1].role, "via");
    }
}
