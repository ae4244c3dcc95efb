use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetPayload {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    Bfs,
    Dfs,
    Dijkstra,
    BellmanFord,
}

impl Algorithm {
    pub fn parse(input: &str) -> Option<Self> {
        match input.to_ascii_lowercase().as_str() {
            "bfs" => Some(Self::Bfs),
            "dfs" => Some(Self::Dfs),
            "dijkstra" => Some(Self::Dijkstra),
            "bellman" | "bellman-ford" => Some(Self::BellmanFord),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bfs => "bfs",
            Self::Dfs => "dfs",
            Self::Dijkstra => "dijkstra",
            Self::BellmanFord => "bellman-ford",
        }
    }

    // Traversals explore from the origin alone; the shortest-path pair needs both ends.
    pub fn requires_destination(self) -> bool {
        matches!(self, Self::Dijkstra | Self::BellmanFord)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Bfs => "breadth-first expansion (levels from origin)",
            Self::Dfs => "depth-first exploration (discovery order)",
            Self::Dijkstra => "least-cost route (non-negative weights)",
            Self::BellmanFord => "least-cost route (negative weights allowed)",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryRequest {
    pub algorithm: Algorithm,
    pub origin: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<NodeId>,
    pub dataset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultPayload {
    Path {
        nodes: Vec<NodeId>,
        cost: f64,
        algorithm: String,
    },
    Expansion {
        metric_by_node: BTreeMap<NodeId, f64>,
        metric: String,
        algorithm: String,
    },
}

// Services report failures as a bare { "erro": ... } object instead of a payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceFailure {
    pub erro: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QueryOutcome {
    Failure(ServiceFailure),
    Payload(ResultPayload),
}
