use crate::view::palette::Rgb;
use crossbeam_channel::Sender;
use routegraph_core::{EdgeId, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeColor {
    pub background: Rgb,
    pub border: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontStyle {
    pub color: Rgb,
    pub size: u32,
    pub stroke_width: u32,
    pub stroke: Rgb,
}

// Resolved appearance of a node as currently mounted. Identity fields live on
// the Node; this is everything a reset has to restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStyle {
    pub color: NodeColor,
    pub size: f64,
    pub label: String,
    pub border_width: u32,
    pub font: FontStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: Rgb,
    pub opacity: f64,
    pub width: f64,
}

// A style change for one node. `color` is always present; the optional fields
// leave the current value in place when None.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMutation {
    pub id: NodeId,
    pub color: NodeColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<FontStyle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeMutation {
    pub id: EdgeId,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleBatch {
    pub nodes: Vec<NodeMutation>,
    pub edges: Vec<EdgeMutation>,
}

impl StyleBatch {
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    #[serde(flatten)]
    pub node: Node,
    pub style: NodeStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    pub stabilization: bool,
    pub gravitational_constant: f64,
    pub central_gravity: f64,
    pub spring_length: f64,
    pub spring_constant: f64,
    pub damping: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            stabilization: true,
            gravitational_constant: -8000.0,
            central_gravity: 0.3,
            spring_length: 200.0,
            spring_constant: 0.01,
            damping: 0.09,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interaction {
    pub hover: bool,
    pub tooltip_delay_ms: u64,
    pub hide_edges_on_drag: bool,
}

impl Default for Interaction {
    fn default() -> Self {
        Self { hover: true, tooltip_delay_ms: 100, hide_edges_on_drag: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceOptions {
    // Directed datasets get arrowheads; undirected ones draw bare edges.
    pub directed: bool,
    pub font_face: String,
    pub physics: Physics,
    pub interaction: Interaction,
}

// Everything needed to mount a dataset on a fresh surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneSpec {
    pub dataset: String,
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
    pub options: SurfaceOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    NodeClicked(NodeId),
}

pub trait Surface {
    fn apply_nodes(&mut self, batch: &[NodeMutation]);
    fn apply_edges(&mut self, batch: &[EdgeMutation]);
    fn destroy(&mut self);
}

pub trait SurfaceFactory {
    fn create(&mut self, scene: &SceneSpec, events: Sender<SurfaceEvent>) -> Box<dyn Surface>;
}

// ----- JSON-lines sink -----

// One JSON object per line; a mount line for the full scene, update lines for
// mutation batches, a destroy line on teardown. Whatever draws the graph tails
// this file.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SurfaceLine<'a> {
    Mount { scene: &'a SceneSpec },
    Nodes { dataset: &'a str, update: &'a [NodeMutation] },
    Edges { dataset: &'a str, update: &'a [EdgeMutation] },
    Destroy { dataset: &'a str },
}

fn emit<W: Write>(out: &mut W, line: &SurfaceLine<'_>) {
    let mut json = match serde_json::to_string(line) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "scene line did not serialize");
            return;
        }
    };
    json.push('\n');
    if let Err(e) = out.write_all(json.as_bytes()) {
        tracing::warn!(error = %e, "scene sink write failed");
    }
}

pub struct JsonLinesSurface<W: Write> {
    out: W,
    dataset: String,
}

impl<W: Write> Surface for JsonLinesSurface<W> {
    fn apply_nodes(&mut self, batch: &[NodeMutation]) {
        if batch.is_empty() {
            return;
        }
        emit(&mut self.out, &SurfaceLine::Nodes { dataset: &self.dataset, update: batch });
    }

    fn apply_edges(&mut self, batch: &[EdgeMutation]) {
        if batch.is_empty() {
            return;
        }
        emit(&mut self.out, &SurfaceLine::Edges { dataset: &self.dataset, update: batch });
    }

    fn destroy(&mut self) {
        emit(&mut self.out, &SurfaceLine::Destroy { dataset: &self.dataset });
    }
}

pub struct JsonLinesFactory {
    path: PathBuf,
}

impl JsonLinesFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SurfaceFactory for JsonLinesFactory {
    // The sink file is truncated per mount, so it always holds one scene plus
    // the updates applied to it. A sink that cannot be opened downgrades to the
    // null surface; the view itself stays usable.
    fn create(&mut self, scene: &SceneSpec, _events: Sender<SurfaceEvent>) -> Box<dyn Surface> {
        match File::create(&self.path) {
            Ok(file) => {
                let mut out = file;
                emit(&mut out, &SurfaceLine::Mount { scene });
                Box::new(JsonLinesSurface { out, dataset: scene.dataset.clone() })
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "scene sink unavailable, rendering disabled");
                Box::new(NullSurface)
            }
        }
    }
}

// ----- null sink -----

pub struct NullSurface;

impl Surface for NullSurface {
    fn apply_nodes(&mut self, _batch: &[NodeMutation]) {}
    fn apply_edges(&mut self, _batch: &[EdgeMutation]) {}
    fn destroy(&mut self) {}
}

pub struct NullFactory;

impl SurfaceFactory for NullFactory {
    fn create(&mut self, _scene: &SceneSpec, _events: Sender<SurfaceEvent>) -> Box<dyn Surface> {
        Box::new(NullSurface)
    }
}

// ----- recording sink for tests -----

#[cfg(test)]
pub mod recording {
    use super::*;
    use std::sync::{Arc, Mutex, MutexGuard};

    #[derive(Debug, Default)]
    pub struct SurfaceLog {
        pub scenes: Vec<SceneSpec>,
        pub node_batches: Vec<Vec<NodeMutation>>,
        pub edge_batches: Vec<Vec<EdgeMutation>>,
        pub created: usize,
        pub destroyed: usize,
    }

    #[derive(Debug, Clone, Default)]
    pub struct Recorder(Arc<Mutex<SurfaceLog>>);

    impl Recorder {
        pub fn log(&self) -> MutexGuard<'_, SurfaceLog> {
            self.0.lock().expect("surface log poisoned")
        }
    }

    pub struct RecordingFactory {
        recorder: Recorder,
    }

    impl RecordingFactory {
        pub fn new() -> (Self, Recorder) {
            let recorder = Recorder::default();
            (Self { recorder: recorder.clone() }, recorder)
        }
    }

    impl SurfaceFactory for RecordingFactory {
        fn create(&mut self, scene: &SceneSpec, _events: Sender<SurfaceEvent>) -> Box<dyn Surface> {
            {
                let mut log = self.recorder.log();
                log.scenes.push(scene.clone());
                log.created += 1;
            }
            Box::new(RecordingSurface { recorder: self.recorder.clone() })
        }
    }

    pub struct RecordingSurface {
        recorder: Recorder,
    }

    impl Surface for RecordingSurface {
        fn apply_nodes(&mut self, batch: &[NodeMutation]) {
            self.recorder.log().node_batches.push(batch.to_vec());
        }

        fn apply_edges(&mut self, batch: &[EdgeMutation]) {
            self.recorder.log().edge_batches.push(batch.to_vec());
        }

        fn destroy(&mut self) {
            self.recorder.log().destroyed += 1;
        }
    }
}
