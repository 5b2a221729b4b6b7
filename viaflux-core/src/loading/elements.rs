//! Raw payload of the network data provider.

use serde::Deserialize;

use crate::model::network::Tags;
use crate::{Error, NodeId};

/// Structured network response.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkData {
    pub elements: Vec<Element>,
}

impl NetworkData {
    /// Parses a raw provider response.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for malformed payloads.
    pub fn from_json(payload: &str) -> Result<Self, Error> {
        serde_json::from_str(payload)
            .map_err(|source| Error::InvalidData(format!("malformed network response: {source}")))
    }
}

/// One element of the provider response.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Node(NodeElement),
    Way(WayElement),
    Relation(RelationElement),
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeElement {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WayElement {
    pub id: i64,
    /// Ordered node ids the way passes through
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelationElement {
    pub id: i64,
    #[serde(default)]
    pub members: Vec<MemberElement>,
    #[serde(default)]
    pub tags: Tags,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberElement {
    #[serde(rename = "type")]
    pub member_type: String,
    #[serde(rename = "ref")]
    pub member_ref: i64,
    #[serde(default)]
    pub role: String,
}
