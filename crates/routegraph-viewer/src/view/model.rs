use crate::surface::{
    EdgeMutation, EdgeStyle, NodeMutation, NodeStyle, SceneEdge, SceneNode, SceneSpec, StyleBatch,
    SurfaceOptions,
};
use crate::util::config::Theme;
use routegraph_core::{DatasetPayload, EdgeId, Node, NodeId};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub node: Node,
    pub style: NodeStyle,
}

impl NodeRecord {
    pub fn display_name(&self) -> &str {
        self.node.original_title.as_deref().unwrap_or(&self.node.label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub label: Option<String>,
    pub title: Option<String>,
    pub style: EdgeStyle,
}

// Owned copy of the active dataset plus the styles currently mounted on the
// surface. Collections keep dataset order; the maps only index into them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphModel {
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    node_ix: HashMap<NodeId, usize>,
    edge_ix: HashMap<EdgeId, usize>,
}

impl GraphModel {
    pub fn from_payload(payload: &DatasetPayload, theme: &Theme) -> Self {
        let mut model = Self::default();
        for node in &payload.nodes {
            if model.node_ix.contains_key(&node.id) {
                continue;
            }
            model.node_ix.insert(node.id.clone(), model.nodes.len());
            model
                .nodes
                .push(NodeRecord { node: node.clone(), style: baseline_node_style(node, theme) });
        }
        for (ix, edge) in payload.edges.iter().enumerate() {
            // Edges without a wire id get a positional one.
            let id = edge.id.clone().unwrap_or_else(|| EdgeId(format!("e{ix}")));
            if model.edge_ix.contains_key(&id) {
                continue;
            }
            model.edge_ix.insert(id.clone(), model.edges.len());
            model.edges.push(EdgeRecord {
                id,
                from: edge.from.clone(),
                to: edge.to.clone(),
                label: edge.label.clone(),
                title: edge.title.clone(),
                style: theme.edge_base,
            });
        }
        model
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.node_ix.get(id).map(|&ix| &self.nodes[ix])
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_ix.contains_key(id)
    }

    // First edge joining the pair in dataset order. Undirected datasets accept
    // the reversed orientation as well.
    pub fn find_edge(&self, from: &NodeId, to: &NodeId, directed: bool) -> Option<&EdgeRecord> {
        self.edges.iter().find(|edge| {
            (edge.from == *from && edge.to == *to)
                || (!directed && edge.from == *to && edge.to == *from)
        })
    }

    // Mutations for ids the model does not hold are dropped; a result may
    // mention nodes a partial dataset never shipped.
    pub fn apply(&mut self, batch: &StyleBatch) {
        for m in &batch.nodes {
            if let Some(&ix) = self.node_ix.get(&m.id) {
                let style = &mut self.nodes[ix].style;
                style.color = m.color;
                if let Some(size) = m.size {
                    style.size = size;
                }
                if let Some(label) = &m.label {
                    style.label = label.clone();
                }
                if let Some(width) = m.border_width {
                    style.border_width = width;
                }
                if let Some(font) = m.font {
                    style.font = font;
                }
            }
        }
        for m in &batch.edges {
            if let Some(&ix) = self.edge_ix.get(&m.id) {
                self.edges[ix].style = m.style;
            }
        }
    }

    // Full restyle of every element back to its baseline.
    pub fn baseline_batch(&self, theme: &Theme) -> StyleBatch {
        StyleBatch {
            nodes: self
                .nodes
                .iter()
                .map(|record| {
                    let style = baseline_node_style(&record.node, theme);
                    NodeMutation {
                        id: record.node.id.clone(),
                        color: style.color,
                        size: Some(style.size),
                        label: Some(style.label.clone()),
                        border_width: Some(style.border_width),
                        font: Some(style.font),
                    }
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|record| EdgeMutation { id: record.id.clone(), style: theme.edge_base })
                .collect(),
        }
    }

    pub fn scene(&self, dataset: &str, options: SurfaceOptions) -> SceneSpec {
        SceneSpec {
            dataset: dataset.to_string(),
            nodes: self
                .nodes
                .iter()
                .map(|record| SceneNode { node: record.node.clone(), style: record.style.clone() })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|record| SceneEdge {
                    id: record.id.clone(),
                    from: record.from.clone(),
                    to: record.to.clone(),
                    label: record.label.clone(),
                    title: record.title.clone(),
                    style: record.style,
                })
                .collect(),
            options,
        }
    }
}

pub fn baseline_node_style(node: &Node, theme: &Theme) -> NodeStyle {
    NodeStyle {
        color: theme.node_base,
        size: if node.value.is_some() { theme.size_valued } else { theme.size_plain },
        label: node.label.clone(),
        border_width: theme.base_border_width,
        font: theme.font_base,
    }
}

// Deep copy of the model exactly as load produced it. Restore hands back a
// clone, so reset cannot drift from the loaded identity data.
#[derive(Debug, Clone, PartialEq)]
pub struct PristineSnapshot(GraphModel);

impl PristineSnapshot {
    pub fn of(model: &GraphModel) -> Self {
        Self(model.clone())
    }

    pub fn restore(&self) -> GraphModel {
        self.0.clone()
    }

    #[allow(dead_code)]
    pub fn model(&self) -> &GraphModel {
        &self.0
    }
}
