use crate::datasets::DatasetSource;
use crate::error::{DatasetLoadError, QueryServiceError, ResolutionError, ViewError};
use crate::surface::{Surface, SurfaceEvent, SurfaceFactory, SurfaceOptions};
use crate::util::config::ViewerConfig;
use crate::view::model::{GraphModel, PristineSnapshot};
use crate::view::overlay::{OverlayPhase, ResultOverlay};
use crate::view::palette::ColorScale;
use crate::view::resolve::{normalize, NameIndex};
use crossbeam_channel::Sender;
use routegraph_core::{Algorithm, NodeId, QueryOutcome, QueryRequest, ResultPayload};

pub struct ActiveDataset {
    pub id: String,
    pub directed: bool,
    pub scale: ColorScale,
    pub model: GraphModel,
    pub index: NameIndex,
    pub snapshot: PristineSnapshot,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryInputs {
    pub origin: String,
    pub destination: String,
}

// Tag handed out by begin_query and checked by complete_query. The epoch
// pins the response to the dataset generation it was asked against.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingQuery {
    pub epoch: u64,
    pub request: QueryRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadSummary {
    pub id: String,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickApplied {
    Origin(String),
    Destination(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryReport {
    Stale,
    Path { algorithm: String, cost: f64, route: Vec<String> },
    Expansion { algorithm: String, metric: String, reached: usize },
}

// One view over one active dataset. Owns its collaborators, so several
// instances can coexist and tests drive it without any global setup.
pub struct GraphViewState {
    cfg: ViewerConfig,
    source: Box<dyn DatasetSource>,
    factory: Box<dyn SurfaceFactory>,
    events_tx: Sender<SurfaceEvent>,
    active: Option<ActiveDataset>,
    surface: Option<Box<dyn Surface>>,
    overlay: ResultOverlay,
    pub inputs: QueryInputs,
    pub selected_algorithm: Algorithm,
    epoch: u64,
}

impl GraphViewState {
    pub fn new(
        cfg: ViewerConfig,
        source: Box<dyn DatasetSource>,
        factory: Box<dyn SurfaceFactory>,
        events_tx: Sender<SurfaceEvent>,
    ) -> Self {
        Self {
            cfg,
            source,
            factory,
            events_tx,
            active: None,
            surface: None,
            overlay: ResultOverlay::default(),
            inputs: QueryInputs::default(),
            selected_algorithm: Algorithm::Dijkstra,
            epoch: 0,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.cfg
    }

    pub fn active(&self) -> Option<&ActiveDataset> {
        self.active.as_ref()
    }

    pub fn overlay_phase(&self) -> OverlayPhase {
        self.overlay.phase()
    }

    #[allow(dead_code)]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[allow(dead_code)]
    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn dataset_ids(&self) -> Vec<&str> {
        self.cfg.datasets.iter().map(|entry| entry.id.as_str()).collect()
    }

    fn scene_options(&self, directed: bool) -> SurfaceOptions {
        SurfaceOptions {
            directed,
            font_face: self.cfg.theme.font_face.clone(),
            physics: self.cfg.physics.clone(),
            interaction: self.cfg.interaction.clone(),
        }
    }

    // Everything that can fail happens before the previous dataset is touched;
    // a failed load leaves the old view fully intact.
    pub fn load(&mut self, dataset_id: &str) -> Result<LoadSummary, ViewError> {
        let entry = self
            .cfg
            .dataset(dataset_id)
            .ok_or_else(|| DatasetLoadError::UnknownDataset(dataset_id.to_string()))?
            .clone();
        let payload = self.source.fetch(&entry)?;
        if payload.nodes.is_empty() {
            return Err(DatasetLoadError::Malformed {
                id: entry.id,
                reason: "dataset has no nodes".to_string(),
            }
            .into());
        }

        let model = GraphModel::from_payload(&payload, &self.cfg.theme);
        let index = NameIndex::build(&payload.nodes);
        let snapshot = PristineSnapshot::of(&model);
        let scene = model.scene(&entry.id, self.scene_options(entry.directed));
        let (nodes, edges) = (model.nodes().len(), model.edges().len());

        if let Some(mut old) = self.surface.take() {
            old.destroy();
        }
        self.surface = Some(self.factory.create(&scene, self.events_tx.clone()));
        self.active = Some(ActiveDataset {
            id: entry.id.clone(),
            directed: entry.directed,
            scale: entry.scale,
            model,
            index,
            snapshot,
        });
        self.overlay.clear();
        self.inputs = QueryInputs::default();
        // In-flight queries against the previous dataset turn stale here.
        self.epoch += 1;
        Ok(LoadSummary { id: entry.id, nodes, edges })
    }

    pub fn switch_dataset(&mut self, dataset_id: &str) -> Result<LoadSummary, ViewError> {
        self.load(dataset_id)
    }

    // Puts every element back to its baseline style. Identity data is restored
    // from the snapshot wholesale, so nothing a query overlaid can survive.
    pub fn reset(&mut self) -> Result<(), ViewError> {
        let Some(active) = self.active.as_mut() else {
            return Err(ViewError::NoDataset);
        };
        active.model = active.snapshot.restore();
        let batch = active.model.baseline_batch(&self.cfg.theme);
        if let Some(surface) = self.surface.as_mut() {
            surface.apply_nodes(&batch.nodes);
            surface.apply_edges(&batch.edges);
        }
        self.overlay.clear();
        Ok(())
    }

    // Local validation only. The caller ships request to the service and hands
    // whatever comes back to complete_query together with this tag.
    pub fn begin_query(
        &self,
        algorithm: Algorithm,
        origin_text: &str,
        destination_text: Option<&str>,
    ) -> Result<PendingQuery, ViewError> {
        let Some(active) = self.active.as_ref() else {
            return Err(ViewError::NoDataset);
        };
        let origin = active
            .index
            .resolve(origin_text)
            .ok_or_else(|| ResolutionError::Origin(origin_text.trim().to_string()))?;
        let destination = if algorithm.requires_destination() {
            let text = destination_text.unwrap_or_default();
            Some(
                active
                    .index
                    .resolve(text)
                    .ok_or_else(|| ResolutionError::Destination(text.trim().to_string()))?,
            )
        } else {
            // Traversals ignore whatever sits in the destination field.
            None
        };
        Ok(PendingQuery {
            epoch: self.epoch,
            request: QueryRequest { algorithm, origin, destination, dataset: active.id.clone() },
        })
    }

    pub fn complete_query(
        &mut self,
        pending: &PendingQuery,
        outcome: QueryOutcome,
    ) -> Result<QueryReport, ViewError> {
        if pending.epoch != self.epoch {
            tracing::debug!(
                dataset = %pending.request.dataset,
                "dropping response for a superseded dataset"
            );
            return Ok(QueryReport::Stale);
        }
        let payload = match outcome {
            QueryOutcome::Failure(failure) => {
                return Err(QueryServiceError::Service(failure.erro).into());
            }
            QueryOutcome::Payload(payload) => payload,
        };
        let Some(active) = self.active.as_mut() else {
            return Err(ViewError::NoDataset);
        };
        let update = self.overlay.render(
            &payload,
            &active.model,
            &self.cfg.theme,
            &active.scale,
            active.directed,
        );
        active.model.apply(&update.dim);
        active.model.apply(&update.highlight);
        if let Some(surface) = self.surface.as_mut() {
            surface.apply_nodes(&update.dim.nodes);
            surface.apply_edges(&update.dim.edges);
            surface.apply_nodes(&update.highlight.nodes);
            surface.apply_edges(&update.highlight.edges);
        }
        Ok(report_for(&payload, active))
    }

    // Click-to-fill mirrors the route form: the first click seeds the origin,
    // with a traversal selected every click re-seeds it, otherwise a second
    // distinct click fills the destination and any further click starts over.
    pub fn handle_node_click(&mut self, id: &NodeId) -> Option<ClickApplied> {
        let active = self.active.as_ref()?;
        let name = active.model.node(id)?.display_name().to_string();
        let traversal = !self.selected_algorithm.requires_destination();
        let applied = if self.inputs.origin.is_empty() || traversal {
            self.inputs.origin = name.clone();
            ClickApplied::Origin(name)
        } else if self.inputs.destination.is_empty() && self.inputs.origin != name {
            self.inputs.destination = name.clone();
            ClickApplied::Destination(name)
        } else {
            self.inputs.origin = name.clone();
            self.inputs.destination.clear();
            ClickApplied::Origin(name)
        };
        Some(applied)
    }

    // Alphabetical under accent folding, the way a person scans the list.
    pub fn place_names(&self) -> Vec<String> {
        let Some(active) = self.active.as_ref() else {
            return Vec::new();
        };
        let mut names: Vec<String> =
            active.model.nodes().iter().map(|record| record.display_name().to_string()).collect();
        names.sort_by_cached_key(|name| normalize(name));
        names
    }

    pub fn dispose(&mut self) {
        if let Some(mut surface) = self.surface.take() {
            surface.destroy();
        }
        self.active = None;
        self.overlay.clear();
        self.inputs = QueryInputs::default();
        // Responses still in flight must not land on a disposed view.
        self.epoch += 1;
    }
}

fn report_for(payload: &ResultPayload, active: &ActiveDataset) -> QueryReport {
    match payload {
        ResultPayload::Path { nodes, cost, algorithm } => QueryReport::Path {
            algorithm: algorithm.clone(),
            cost: *cost,
            route: nodes
                .iter()
                .map(|id| {
                    active
                        .model
                        .node(id)
                        .map(|record| record.display_name().to_string())
                        .unwrap_or_else(|| id.0.clone())
                })
                .collect(),
        },
        ResultPayload::Expansion { metric_by_node, metric, algorithm } => QueryReport::Expansion {
            algorithm: algorithm.clone(),
            metric: metric.clone(),
            reached: metric_by_node.values().filter(|v| v.is_finite()).count(),
        },
    }
}
