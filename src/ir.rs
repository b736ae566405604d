use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Caller-supplied node. Immutable from the engine's perspective; the layout
/// only reads `id` and `children`, everything else is presentation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            children: Vec::new(),
            color: None,
            status: None,
            description: None,
            icon: None,
            data: serde_json::Map::new(),
        }
    }

    pub fn with_children(id: &str, label: &str, children: &[&str]) -> Self {
        let mut node = Self::new(id, label);
        node.children = children.iter().map(|child| child.to_string()).collect();
        node
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateId(String),
    #[error("graph has no nodes")]
    Empty,
}

/// Flat node set, input order preserved. Lookup is linear; plex graphs are a
/// handful of visible nodes at a time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Graph {
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Strict constructor for callers that want id validation up front. The
    /// layout engine itself never validates (unknown ids degrade silently).
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, GraphError> {
        if nodes.is_empty() {
            return Err(GraphError::Empty);
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for node in &nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateId(node.id.clone()));
            }
        }
        Ok(Self { nodes })
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// First node whose children list mentions `id`. Multiple parents are a
    /// caller data-integrity issue; first match wins.
    pub fn parent_of(&self, id: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|node| node.children.iter().any(|child| child == id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Active,
    Parent,
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Parent,
    Child,
}

/// Path shape for connective edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    #[default]
    Waterfall,
    #[serde(rename = "scurve")]
    SCurve,
    Straight,
}

impl EdgeStyle {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "waterfall" => Some(Self::Waterfall),
            "scurve" => Some(Self::SCurve),
            "straight" => Some(Self::Straight),
            _ => None,
        }
    }
}
