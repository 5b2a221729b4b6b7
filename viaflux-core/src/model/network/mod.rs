//! Road network topology store

pub mod components;

pub use components::{CostType, Relation, RelationMember, RoadEdge, RoadNode, Tags};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::{EdgeId, Error, NodeId};

/// Road network topology store.
///
/// Nodes and edges live in flat petgraph arenas addressed by
/// `NodeIndex`/`EdgeIndex`; provider ids map into the arenas through lookup
/// tables so partial responses about the same node can be merged. Incident
/// in/out edge lists are the arena adjacency - back-references by index,
/// never ownership.
#[derive(Debug, Default, Clone)]
pub struct RoadGraph {
    graph: DiGraph<RoadNode, RoadEdge>,
    node_map: HashMap<NodeId, NodeIndex>,
    edge_map: HashMap<EdgeId, EdgeIndex>,
    relations: Vec<Relation>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node, or merges the record into the existing one when the
    /// id is already known. Merging unions tag sets and fills in a missing OD
    /// label; incident edges stay tracked by the arena and are never
    /// duplicated, so the operation is idempotent.
    pub fn add_or_update_node(&mut self, node: RoadNode) -> NodeIndex {
        match self.node_map.entry(node.id) {
            Entry::Occupied(entry) => {
                let idx = *entry.get();
                self.graph[idx].merge(node);
                idx
            }
            Entry::Vacant(entry) => {
                let idx = self.graph.add_node(node);
                entry.insert(idx);
                idx
            }
        }
    }

    /// Appends an edge. Edges are never merged; every call adds a new arena
    /// entry. Both endpoints must already be present in the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] when an endpoint is unknown.
    pub fn add_edge(&mut self, edge: RoadEdge) -> Result<EdgeIndex, Error> {
        let from = self.node_index(edge.from).ok_or_else(|| {
            Error::InvalidData(format!(
                "unknown origin node {} for edge {}",
                edge.from, edge.id
            ))
        })?;
        let to = self.node_index(edge.to).ok_or_else(|| {
            Error::InvalidData(format!(
                "unknown destination node {} for edge {}",
                edge.to, edge.id
            ))
        })?;
        let id = edge.id;
        let idx = self.graph.add_edge(from, to, edge);
        self.edge_map.insert(id, idx);
        Ok(idx)
    }

    /// Stores a relation verbatim; relations are never interpreted.
    pub fn add_relation(&mut self, relation: Relation) {
        self.relations.push(relation);
    }

    pub fn node(&self, id: NodeId) -> Option<&RoadNode> {
        self.node_map.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn edge(&self, id: EdgeId) -> Option<&RoadEdge> {
        self.edge_map.get(&id).map(|&idx| &self.graph[idx])
    }

    pub fn node_index(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_map.get(&id).copied()
    }

    pub fn edge_index(&self, id: EdgeId) -> Option<EdgeIndex> {
        self.edge_map.get(&id).copied()
    }

    pub fn node_by_index(&self, idx: NodeIndex) -> &RoadNode {
        &self.graph[idx]
    }

    pub fn edge_by_index(&self, idx: EdgeIndex) -> &RoadEdge {
        &self.graph[idx]
    }

    pub(crate) fn edge_by_index_mut(&mut self, idx: EdgeIndex) -> &mut RoadEdge {
        &mut self.graph[idx]
    }

    /// Arena endpoints of an edge.
    ///
    /// **Panics** when the index does not belong to this graph.
    pub fn edge_endpoints(&self, idx: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.graph
            .edge_endpoints(idx)
            .expect("edge index belongs to this graph")
    }

    /// Marks a node as an origin/destination candidate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] when the node is unknown.
    pub fn set_od_label(&mut self, id: NodeId, label: impl Into<String>) -> Result<(), Error> {
        let idx = self
            .node_index(id)
            .ok_or_else(|| Error::InvalidData(format!("unknown node {id}")))?;
        self.graph[idx].od_label = Some(label.into());
        Ok(())
    }

    /// Nodes carrying an OD label.
    pub fn od_nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.graph
            .node_weights()
            .filter(|node| node.od_label.is_some())
    }

    /// Resolves an OD label to its arena index.
    pub fn od_node(&self, label: &str) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].od_label.as_deref() == Some(label))
    }

    /// True when the edge is explicitly one-way or part of a roundabout.
    pub fn is_oneway(&self, id: EdgeId) -> bool {
        self.edge(id)
            .is_some_and(|edge| edge.tags.get("oneway").is_some_and(|v| v != "no"))
            || self.is_roundabout(id)
    }

    /// True when the edge's junction tag marks a roundabout.
    pub fn is_roundabout(&self, id: EdgeId) -> bool {
        self.edge(id).is_some_and(|edge| {
            edge.tags
                .get("junction")
                .is_some_and(|v| v == "roundabout" || v == "circular")
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing incident edges of a node.
    pub fn out_edges(&self, node: NodeIndex) -> impl Iterator<Item = (EdgeIndex, &RoadEdge)> {
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (edge.id(), edge.weight()))
    }

    /// Incoming incident edges of a node.
    pub fn in_edges(&self, node: NodeIndex) -> impl Iterator<Item = (EdgeIndex, &RoadEdge)> {
        self.graph
            .edges_directed(node, Direction::Incoming)
            .map(|edge| (edge.id(), edge.weight()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = &RoadEdge> {
        self.graph.edge_weights()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Clears the store at scenario reset.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
