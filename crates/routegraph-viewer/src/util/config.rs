use crate::surface::{EdgeStyle, FontStyle, Interaction, NodeColor, Physics};
use crate::view::palette::{ColorScale, Rgb};
use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryEndpointKind {
    UdsPath(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryEndpoint {
    pub name: String,
    pub kind: QueryEndpointKind,
    pub auto_connect: bool,
}

impl Default for QueryEndpoint {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            kind: QueryEndpointKind::UdsPath(default_uds_path()),
            auto_connect: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: String,
    pub file: String,
    // Directed datasets draw arrowheads and only match forward edges when a
    // route is highlighted.
    #[serde(default)]
    pub directed: bool,
    #[serde(default = "ColorScale::heatmap")]
    pub scale: ColorScale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SceneSink {
    JsonlPath(PathBuf),
    Null,
}

impl Default for SceneSink {
    fn default() -> Self {
        Self::JsonlPath(PathBuf::from("routegraph-scene.jsonl"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub font_face: String,
    pub node_base: NodeColor,
    pub node_dim: NodeColor,
    pub highlight_border: Rgb,
    pub path_origin: Rgb,
    pub path_waypoint: Rgb,
    pub path_destination: Rgb,
    pub edge_base: EdgeStyle,
    pub edge_dim: EdgeStyle,
    pub edge_path: EdgeStyle,
    pub font_base: FontStyle,
    pub font_dim: FontStyle,
    pub font_path: FontStyle,
    pub font_heat: FontStyle,
    pub base_border_width: u32,
    pub path_border_width: u32,
    pub origin_border_width: u32,
    pub heat_border_width: u32,
    pub size_plain: f64,
    pub size_valued: f64,
    pub size_path: f64,
    pub size_heat: f64,
    pub size_heat_origin: f64,
}

impl Default for Theme {
    fn default() -> Self {
        let white = Rgb::new(255, 255, 255);
        let ink = Rgb::new(31, 41, 55);
        Self {
            font_face: "Inter".to_string(),
            node_base: NodeColor {
                background: Rgb::new(55, 65, 81),
                border: Rgb::new(107, 114, 128),
            },
            node_dim: NodeColor { background: ink, border: Rgb::new(55, 65, 81) },
            highlight_border: white,
            path_origin: Rgb::new(16, 185, 129),
            path_waypoint: Rgb::new(251, 191, 36),
            path_destination: Rgb::new(239, 68, 68),
            edge_base: EdgeStyle { color: Rgb::new(75, 85, 99), opacity: 0.3, width: 1.0 },
            edge_dim: EdgeStyle { color: ink, opacity: 0.05, width: 1.0 },
            edge_path: EdgeStyle { color: Rgb::new(251, 191, 36), opacity: 1.0, width: 5.0 },
            font_base: FontStyle { color: white, size: 14, stroke_width: 4, stroke: ink },
            font_dim: FontStyle {
                color: Rgb::new(75, 85, 99),
                size: 14,
                stroke_width: 0,
                stroke: ink,
            },
            font_path: FontStyle { color: white, size: 16, stroke_width: 4, stroke: ink },
            font_heat: FontStyle { color: white, size: 14, stroke_width: 3, stroke: ink },
            base_border_width: 2,
            path_border_width: 3,
            origin_border_width: 4,
            heat_border_width: 1,
            size_plain: 10.0,
            size_valued: 15.0,
            size_path: 45.0,
            size_heat: 25.0,
            size_heat_origin: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub data_dir: PathBuf,
    pub default_dataset: String,
    pub endpoint: QueryEndpoint,
    #[serde(default = "default_datasets")]
    pub datasets: Vec<DatasetEntry>,
    pub scene_sink: SceneSink,
    pub theme: Theme,
    pub physics: Physics,
    pub interaction: Interaction,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            default_dataset: "recife".to_string(),
            endpoint: QueryEndpoint::default(),
            datasets: default_datasets(),
            scene_sink: SceneSink::default(),
            theme: Theme::default(),
            physics: Physics::default(),
            interaction: Interaction::default(),
        }
    }
}

impl ViewerConfig {
    pub fn dataset(&self, id: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|entry| entry.id == id)
    }
}

fn default_uds_path() -> String {
    static CACHED: OnceLock<String> = OnceLock::new();
    CACHED
        .get_or_init(|| {
            if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
                format!("{dir}/routegraph.sock")
            } else {
                "/tmp/routegraph.sock".to_string()
            }
        })
        .clone()
}

fn default_datasets() -> Vec<DatasetEntry> {
    vec![
        DatasetEntry {
            id: "recife".to_string(),
            file: "recife.json".to_string(),
            directed: false,
            scale: ColorScale::heatmap(),
        },
        DatasetEntry {
            id: "usa".to_string(),
            file: "usa.json".to_string(),
            directed: true,
            scale: ColorScale::heatmap(),
        },
    ]
}

fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "routegraph")?;
    Some(proj.config_dir().join("viewer.toml"))
}

pub fn load_or_default() -> ViewerConfig {
    let Some(path) = config_file_path() else {
        return ViewerConfig::default();
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> ViewerConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return ViewerConfig::default();
    };
    toml::from_str(&contents).unwrap_or_else(|_| ViewerConfig::default())
}

pub fn save(cfg: &ViewerConfig) -> anyhow::Result<PathBuf> {
    let Some(path) = config_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(cfg, &path)?;
    Ok(path)
}

fn save_to_path(cfg: &ViewerConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize viewer config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write viewer config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn viewer_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("viewer.toml");
        let cfg = ViewerConfig::default();

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn unreadable_or_invalid_config_falls_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        assert_eq!(load_or_default_from_path(&missing), ViewerConfig::default());

        let garbled = dir.path().join("viewer.toml");
        fs::write(&garbled, "datasets = 3").expect("write");
        assert_eq!(load_or_default_from_path(&garbled), ViewerConfig::default());
    }

    #[test]
    fn query_endpoint_rejects_unknown_kind() {
        let bad = r#"
name = "bad"
kind = "tcp"
value = "127.0.0.1:1234"
auto_connect = true
"#;

        let decoded: Result<QueryEndpoint, _> = toml::from_str(bad);
        assert!(decoded.is_err());
    }

    #[test]
    fn default_datasets_cover_both_edge_conventions() {
        let cfg = ViewerConfig::default();
        let recife = cfg.dataset("recife").expect("recife entry");
        let usa = cfg.dataset("usa").expect("usa entry");
        assert!(!recife.directed);
        assert!(usa.directed);
        assert_eq!(cfg.dataset("mars"), None);
    }

    #[test]
    fn dataset_entry_defaults_fill_directedness_and_scale() {
        let entry: DatasetEntry =
            toml::from_str("id = \"recife\"\nfile = \"recife.json\"").expect("entry");
        assert!(!entry.directed);
        assert_eq!(entry.scale, ColorScale::heatmap());
    }

    #[test]
    fn theme_colors_serialize_as_hex_strings() {
        let encoded = toml::to_string_pretty(&Theme::default()).expect("serialize theme");
        assert!(encoded.contains("\"#10b981\""));
        assert!(encoded.contains("\"#fbbf24\""));
    }
}
