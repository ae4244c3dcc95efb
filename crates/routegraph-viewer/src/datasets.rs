use crate::error::DatasetLoadError;
use crate::util::config::DatasetEntry;
use routegraph_core::DatasetPayload;
use std::fs;
use std::path::PathBuf;

// Where dataset payloads come from. The view only ever sees the payload, so
// tests substitute an in-memory source.
pub trait DatasetSource {
    fn fetch(&self, entry: &DatasetEntry) -> Result<DatasetPayload, DatasetLoadError>;
}

pub struct FileDatasetSource {
    data_dir: PathBuf,
}

impl FileDatasetSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }
}

impl DatasetSource for FileDatasetSource {
    fn fetch(&self, entry: &DatasetEntry) -> Result<DatasetPayload, DatasetLoadError> {
        let path = self.data_dir.join(&entry.file);
        let raw = fs::read_to_string(&path)
            .map_err(|source| DatasetLoadError::Unreachable { id: entry.id.clone(), source })?;
        serde_json::from_str(&raw)
            .map_err(|e| DatasetLoadError::Malformed { id: entry.id.clone(), reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::palette::ColorScale;

    fn entry(id: &str, file: &str) -> DatasetEntry {
        DatasetEntry {
            id: id.to_string(),
            file: file.to_string(),
            directed: false,
            scale: ColorScale::heatmap(),
        }
    }

    #[test]
    fn fetch_reads_a_payload_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("tiny.json"),
            r#"{"nodes":[{"id":"a","label":"A"}],"edges":[{"from":"a","to":"a"}]}"#,
        )
        .expect("write dataset");

        let source = FileDatasetSource::new(dir.path());
        let payload = source.fetch(&entry("tiny", "tiny.json")).expect("payload");
        assert_eq!(payload.nodes.len(), 1);
        assert_eq!(payload.edges.len(), 1);
    }

    #[test]
    fn missing_file_reports_unreachable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = FileDatasetSource::new(dir.path());
        let err = source.fetch(&entry("tiny", "absent.json")).expect_err("must fail");
        assert!(matches!(err, DatasetLoadError::Unreachable { .. }));
    }

    #[test]
    fn missing_arrays_report_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.json"), r#"{"nodes":[]}"#).expect("write dataset");
        let source = FileDatasetSource::new(dir.path());
        let err = source.fetch(&entry("broken", "broken.json")).expect_err("must fail");
        match err {
            DatasetLoadError::Malformed { id, reason } => {
                assert_eq!(id, "broken");
                assert!(reason.contains("edges"), "reason should name the missing field: {reason}");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn invalid_json_reports_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("junk.json"), "not json at all").expect("write dataset");
        let source = FileDatasetSource::new(dir.path());
        let err = source.fetch(&entry("junk", "junk.json")).expect_err("must fail");
        assert!(matches!(err, DatasetLoadError::Malformed { .. }));
    }
}
