use crate::surface::{EdgeMutation, NodeColor, NodeMutation, StyleBatch};
use crate::util::config::Theme;
use crate::view::model::GraphModel;
use crate::view::palette::{ratio_for, ColorScale};
use routegraph_core::{NodeId, ResultPayload};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayPhase {
    Idle,
    Dimmed,
    Highlighted,
}

impl Default for OverlayPhase {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayUpdate {
    pub dim: StyleBatch,
    pub highlight: StyleBatch,
}

// Turns a query result into style batches: one batch pushing the whole graph
// into the background, one painting the result on top of it.
#[derive(Debug, Default)]
pub struct ResultOverlay {
    phase: OverlayPhase,
}

impl ResultOverlay {
    pub fn phase(&self) -> OverlayPhase {
        self.phase
    }

    // Batches depend only on the payload and the model, never on the previous
    // overlay, so rendering the same payload twice yields the same mutations.
    pub fn render(
        &mut self,
        payload: &ResultPayload,
        model: &GraphModel,
        theme: &Theme,
        scale: &ColorScale,
        directed: bool,
    ) -> OverlayUpdate {
        let dim = dim_batch(model, theme);
        self.phase = OverlayPhase::Dimmed;
        let highlight = match payload {
            ResultPayload::Path { nodes, .. } => path_batch(nodes, model, theme, directed),
            ResultPayload::Expansion { metric_by_node, .. } => {
                expansion_batch(metric_by_node, model, theme, scale)
            }
        };
        self.phase = OverlayPhase::Highlighted;
        OverlayUpdate { dim, highlight }
    }

    pub fn clear(&mut self) {
        self.phase = OverlayPhase::Idle;
    }
}

// The dim pass writes every style field; a partial mutation would let the
// previous result's step labels and widened borders show through.
fn dim_batch(model: &GraphModel, theme: &Theme) -> StyleBatch {
    StyleBatch {
        nodes: model
            .nodes()
            .iter()
            .map(|record| NodeMutation {
                id: record.node.id.clone(),
                color: theme.node_dim,
                size: Some(if record.node.value.is_some() {
                    theme.size_valued
                } else {
                    theme.size_plain
                }),
                label: Some(record.node.label.clone()),
                border_width: Some(theme.base_border_width),
                font: Some(theme.font_dim),
            })
            .collect(),
        edges: model
            .edges()
            .iter()
            .map(|record| EdgeMutation { id: record.id.clone(), style: theme.edge_dim })
            .collect(),
    }
}

fn path_batch(route: &[NodeId], model: &GraphModel, theme: &Theme, directed: bool) -> StyleBatch {
    let mut batch = StyleBatch::default();
    let last = route.len().saturating_sub(1);
    for (step, id) in route.iter().enumerate() {
        let Some(record) = model.node(id) else {
            tracing::debug!(node = %id.0, "route mentions a node the dataset does not have");
            continue;
        };
        let background = if step == 0 {
            theme.path_origin
        } else if step == last {
            theme.path_destination
        } else {
            theme.path_waypoint
        };
        batch.nodes.push(NodeMutation {
            id: id.clone(),
            color: NodeColor { background, border: theme.highlight_border },
            size: Some(theme.size_path),
            label: Some(format!("{}. {}", step + 1, record.node.label)),
            border_width: Some(theme.path_border_width),
            font: Some(theme.font_path),
        });
    }
    for pair in route.windows(2) {
        // A hop with no matching edge leaves a visual gap, nothing else.
        if let Some(edge) = model.find_edge(&pair[0], &pair[1], directed) {
            batch.edges.push(EdgeMutation { id: edge.id.clone(), style: theme.edge_path });
        }
    }
    batch
}

fn expansion_batch(
    metric_by_node: &BTreeMap<NodeId, f64>,
    model: &GraphModel,
    theme: &Theme,
    scale: &ColorScale,
) -> StyleBatch {
    let mut batch = StyleBatch::default();
    // Unreached nodes come through as non-finite metrics; they stay dimmed.
    let reached: Vec<(&NodeId, f64)> = metric_by_node
        .iter()
        .filter(|(id, value)| value.is_finite() && model.contains_node(id))
        .map(|(id, value)| (id, *value))
        .collect();
    let Some(min) = reached.iter().map(|(_, v)| *v).reduce(f64::min) else {
        return batch;
    };
    let max = reached.iter().map(|(_, v)| *v).reduce(f64::max).unwrap_or(min);
    for (id, value) in reached {
        let ratio = ratio_for(value, min, max);
        let background = scale.interpolate(ratio);
        // A flat metric makes every node share the minimum, and each one is
        // treated as an origin.
        let is_origin = value == min;
        batch.nodes.push(NodeMutation {
            id: id.clone(),
            color: NodeColor {
                background,
                border: if is_origin { theme.highlight_border } else { background },
            },
            size: Some(if is_origin { theme.size_heat_origin } else { theme.size_heat }),
            label: None,
            border_width: Some(if is_origin {
                theme.origin_border_width
            } else {
                theme.heat_border_width
            }),
            font: Some(theme.font_heat),
        });
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::palette::Rgb;
    use routegraph_core::{DatasetPayload, Edge, Node};

    fn node(id: &str, label: &str, value: Option<f64>) -> Node {
        Node {
            id: NodeId(id.to_string()),
            label: label.to_string(),
            original_title: None,
            value,
            group: None,
            title: None,
        }
    }

    fn edge(from: &str, to: &str) -> Edge {
        Edge {
            id: None,
            from: NodeId(from.to_string()),
            to: NodeId(to.to_string()),
            label: None,
            title: None,
        }
    }

    fn model() -> GraphModel {
        let payload = DatasetPayload {
            nodes: vec![node("a", "A", Some(3.0)), node("b", "B", None), node("c", "C", None)],
            edges: vec![edge("a", "b"), edge("b", "c")],
        };
        GraphModel::from_payload(&payload, &Theme::default())
    }

    fn path(nodes: &[&str]) -> ResultPayload {
        ResultPayload::Path {
            nodes: nodes.iter().map(|id| NodeId(id.to_string())).collect(),
            cost: 7.0,
            algorithm: "dijkstra".to_string(),
        }
    }

    fn expansion(metric: &[(&str, f64)]) -> ResultPayload {
        ResultPayload::Expansion {
            metric_by_node: metric
                .iter()
                .map(|(id, value)| (NodeId(id.to_string()), *value))
                .collect(),
            metric: "level".to_string(),
            algorithm: "bfs".to_string(),
        }
    }

    #[test]
    fn render_dims_the_whole_graph_first() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update = overlay.render(&path(&["a", "b", "c"]), &model(), &theme, &ColorScale::heatmap(), false);

        assert_eq!(update.dim.nodes.len(), 3);
        assert_eq!(update.dim.edges.len(), 2);
        assert_eq!(update.dim.nodes[0].color, theme.node_dim);
        assert_eq!(update.dim.nodes[0].font, Some(theme.font_dim));
        assert_eq!(update.dim.nodes[0].label.as_deref(), Some("A"));
        assert_eq!(update.dim.nodes[0].border_width, Some(theme.base_border_width));
        assert_eq!(update.dim.edges[0].style, theme.edge_dim);
        assert_eq!(overlay.phase(), OverlayPhase::Highlighted);
    }

    #[test]
    fn path_colors_origin_waypoints_and_destination() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update = overlay.render(&path(&["a", "b", "c"]), &model(), &theme, &ColorScale::heatmap(), false);

        let highlighted = &update.highlight.nodes;
        assert_eq!(highlighted.len(), 3);
        assert_eq!(highlighted[0].color.background, theme.path_origin);
        assert_eq!(highlighted[1].color.background, theme.path_waypoint);
        assert_eq!(highlighted[2].color.background, theme.path_destination);
        for mutation in highlighted {
            assert_eq!(mutation.color.border, theme.highlight_border);
            assert_eq!(mutation.size, Some(theme.size_path));
            assert_eq!(mutation.border_width, Some(theme.path_border_width));
        }
        assert_eq!(highlighted[0].label.as_deref(), Some("1. A"));
        assert_eq!(highlighted[1].label.as_deref(), Some("2. B"));
        assert_eq!(highlighted[2].label.as_deref(), Some("3. C"));
    }

    #[test]
    fn path_highlights_every_hop_edge() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update = overlay.render(&path(&["a", "b", "c"]), &model(), &theme, &ColorScale::heatmap(), false);

        let ids: Vec<&str> = update.highlight.edges.iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(ids, vec!["e0", "e1"]);
        assert!(update.highlight.edges.iter().all(|m| m.style == theme.edge_path));
    }

    #[test]
    fn reversed_hops_only_match_on_undirected_datasets() {
        let theme = Theme::default();
        let scale = ColorScale::heatmap();
        let mut overlay = ResultOverlay::default();

        let update = overlay.render(&path(&["b", "a"]), &model(), &theme, &scale, true);
        assert!(update.highlight.edges.is_empty());

        let update = overlay.render(&path(&["b", "a"]), &model(), &theme, &scale, false);
        assert_eq!(update.highlight.edges.len(), 1);
        assert_eq!(update.highlight.edges[0].id.0, "e0");
    }

    #[test]
    fn single_node_route_is_an_origin() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update = overlay.render(&path(&["b"]), &model(), &theme, &ColorScale::heatmap(), false);

        assert_eq!(update.highlight.nodes.len(), 1);
        assert_eq!(update.highlight.nodes[0].color.background, theme.path_origin);
        assert!(update.highlight.edges.is_empty());
    }

    #[test]
    fn unknown_route_nodes_are_skipped() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update =
            overlay.render(&path(&["a", "ghost", "c"]), &model(), &theme, &ColorScale::heatmap(), false);

        let ids: Vec<&str> = update.highlight.nodes.iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(update.highlight.edges.is_empty());
    }

    #[test]
    fn rendering_the_same_payload_twice_is_idempotent() {
        let theme = Theme::default();
        let scale = ColorScale::heatmap();
        let graph = model();
        let payload = path(&["a", "b"]);
        let mut overlay = ResultOverlay::default();

        let first = overlay.render(&payload, &graph, &theme, &scale, false);
        let second = overlay.render(&payload, &graph, &theme, &scale, false);
        assert_eq!(first, second);
    }

    #[test]
    fn expansion_scales_colors_between_min_and_max() {
        let theme = Theme::default();
        let scale = ColorScale::heatmap();
        let mut overlay = ResultOverlay::default();
        let update = overlay.render(
            &expansion(&[("a", 0.0), ("b", 1.0), ("c", 1.0)]),
            &model(),
            &theme,
            &scale,
            false,
        );

        let by_id = |needle: &str| {
            update
                .highlight
                .nodes
                .iter()
                .find(|m| m.id.0 == needle)
                .expect("mutation for node")
        };
        let origin = by_id("a");
        assert_eq!(origin.color.background, Rgb::new(59, 130, 246));
        assert_eq!(origin.color.border, theme.highlight_border);
        assert_eq!(origin.size, Some(theme.size_heat_origin));
        assert_eq!(origin.border_width, Some(theme.origin_border_width));

        let far = by_id("b");
        assert_eq!(far.color.background, Rgb::new(239, 68, 68));
        assert_eq!(far.color.border, far.color.background);
        assert_eq!(far.size, Some(theme.size_heat));
        assert_eq!(far.border_width, Some(theme.heat_border_width));
        assert_eq!(by_id("c").color.background, Rgb::new(239, 68, 68));
    }

    #[test]
    fn flat_expansion_treats_every_node_as_origin() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update = overlay.render(
            &expansion(&[("a", 2.0), ("b", 2.0), ("c", 2.0)]),
            &model(),
            &theme,
            &ColorScale::heatmap(),
            false,
        );

        assert_eq!(update.highlight.nodes.len(), 3);
        for mutation in &update.highlight.nodes {
            assert_eq!(mutation.color.background, Rgb::new(59, 130, 246));
            assert_eq!(mutation.color.border, theme.highlight_border);
            assert_eq!(mutation.size, Some(theme.size_heat_origin));
        }
    }

    #[test]
    fn non_finite_metrics_stay_dimmed() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update = overlay.render(
            &expansion(&[("a", 0.0), ("b", f64::INFINITY)]),
            &model(),
            &theme,
            &ColorScale::heatmap(),
            false,
        );

        let ids: Vec<&str> = update.highlight.nodes.iter().map(|m| m.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn empty_expansion_leaves_everything_dimmed() {
        let theme = Theme::default();
        let mut overlay = ResultOverlay::default();
        let update =
            overlay.render(&expansion(&[]), &model(), &theme, &ColorScale::heatmap(), false);

        assert!(update.highlight.is_empty());
        assert_eq!(update.dim.nodes.len(), 3);
        assert_eq!(overlay.phase(), OverlayPhase::Highlighted);
    }

    #[test]
    fn clear_returns_the_overlay_to_idle() {
        let mut overlay = ResultOverlay::default();
        overlay.render(&path(&["a"]), &model(), &Theme::default(), &ColorScale::heatmap(), false);
        assert_eq!(overlay.phase(), OverlayPhase::Highlighted);
        overlay.clear();
        assert_eq!(overlay.phase(), OverlayPhase::Idle);
    }
}
