//! Loading serialized pipeline artifacts from the model directory
//!
//! An artifact is a pair of files sharing a stem: `<stem>.onnx` holds the
//! inference graph and `<stem>.json` the [`PipelineManifest`]. The primary
//! artifact is required; the secondary one is best-effort.

use crate::error::ArtifactError;
use crate::predictor::{Classifier, OnnxClassifier, PipelineManifest};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Stem of the required priority classifier
pub const PRIMARY_ARTIFACT: &str = "priority_rf_pipeline";

/// Stem of the optional secondary classifier
pub const SECONDARY_ARTIFACT: &str = "rfc_failure_pipeline";

const GRAPH_EXTENSION: &str = "onnx";
const MANIFEST_EXTENSION: &str = "json";

/// Description of a loaded artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub version: String,
    pub checksum: String,
    pub size_bytes: usize,
    pub graph_path: PathBuf,
    pub supports_proba: bool,
    pub loaded_at: i64,
}

/// A classifier together with where it came from
pub struct LoadedArtifact {
    pub info: ArtifactInfo,
    pub classifier: Arc<OnnxClassifier>,
}

impl LoadedArtifact {
    pub fn as_classifier(&self) -> Arc<dyn Classifier> {
        self.classifier.clone()
    }
}

/// Resolves artifact stems against a model directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    model_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn graph_path(&self, stem: &str) -> PathBuf {
        self.model_dir.join(format!("{}.{}", stem, GRAPH_EXTENSION))
    }

    pub fn manifest_path(&self, stem: &str) -> PathBuf {
        self.model_dir.join(format!("{}.{}", stem, MANIFEST_EXTENSION))
    }

    /// True when both files of the artifact are present
    pub fn exists(&self, stem: &str) -> bool {
        self.graph_path(stem).is_file() && self.manifest_path(stem).is_file()
    }

    /// Load an artifact that the service cannot run without
    pub fn load_required(&self, stem: &str) -> Result<LoadedArtifact, ArtifactError> {
        for path in [self.graph_path(stem), self.manifest_path(stem)] {
            if !path.is_file() {
                return Err(ArtifactError::NotFound {
                    file: file_name(&path),
                });
            }
        }
        self.load(stem)
    }

    /// Load an artifact if it is present and valid; otherwise `None`
    pub fn load_optional(&self, stem: &str) -> Option<LoadedArtifact> {
        if !self.exists(stem) {
            debug!(artifact = %stem, dir = ?self.model_dir, "Optional artifact not present");
            return None;
        }
        match self.load(stem) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                info!(artifact = %stem, error = %e, "Optional artifact could not be loaded, continuing without it");
                None
            }
        }
    }

    fn load(&self, stem: &str) -> Result<LoadedArtifact, ArtifactError> {
        let graph_path = self.graph_path(stem);
        let manifest_path = self.manifest_path(stem);

        let graph = read(&graph_path)?;
        let manifest_bytes = read(&manifest_path)?;
        let manifest =
            PipelineManifest::from_json(&manifest_bytes).map_err(|source| ArtifactError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        let checksum = compute_checksum(&graph);
        let version = manifest.version.clone();
        let classifier = OnnxClassifier::from_bytes(stem, &graph, manifest).map_err(|source| {
            ArtifactError::Model {
                name: stem.to_string(),
                source,
            }
        })?;

        info!(
            artifact = %stem,
            version = %version,
            checksum = %checksum,
            size = graph.len(),
            "Artifact loaded"
        );

        Ok(LoadedArtifact {
            info: ArtifactInfo {
                name: stem.to_string(),
                version,
                checksum,
                size_bytes: graph.len(),
                graph_path,
                supports_proba: classifier.supports_proba(),
                loaded_at: chrono::Utc::now().timestamp(),
            },
            classifier: Arc::new(classifier),
        })
    }
}

fn read(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Compute SHA256 checksum
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "name": "priority_rf_pipeline",
        "version": "1.2.0",
        "categories": {"Status": ["Open"], "Category": ["incident"], "Closure_Code": ["Other"]},
        "classes": [1, 2, 3, 4, 5]
    }"#;

    #[test]
    fn test_missing_required_artifact() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());

        let err = store.load_required(PRIMARY_ARTIFACT).err().unwrap();
        assert!(matches!(err, ArtifactError::NotFound { ref file } if file == "priority_rf_pipeline.onnx"));
        assert!(err.to_string().starts_with(
            "Required artifact not found: priority_rf_pipeline.onnx."
        ));
    }

    #[test]
    fn test_missing_manifest_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("priority_rf_pipeline.onnx"), b"graph").unwrap();
        let store = ArtifactStore::new(dir.path());

        let err = store.load_required(PRIMARY_ARTIFACT).err().unwrap();
        assert!(matches!(err, ArtifactError::NotFound { ref file } if file == "priority_rf_pipeline.json"));
    }

    #[test]
    fn test_invalid_manifest_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("priority_rf_pipeline.onnx"), b"graph").unwrap();
        fs::write(dir.path().join("priority_rf_pipeline.json"), b"{not json").unwrap();
        let store = ArtifactStore::new(dir.path());

        let err = store.load_required(PRIMARY_ARTIFACT).err().unwrap();
        assert!(matches!(err, ArtifactError::Manifest { .. }));
    }

    #[test]
    fn test_corrupt_graph_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("priority_rf_pipeline.onnx"), b"graph").unwrap();
        fs::write(dir.path().join("priority_rf_pipeline.json"), MANIFEST).unwrap();
        let store = ArtifactStore::new(dir.path());

        let err = store.load_required(PRIMARY_ARTIFACT).err().unwrap();
        assert!(matches!(err, ArtifactError::Model { ref name, .. } if name == PRIMARY_ARTIFACT));
    }

    #[test]
    fn test_optional_artifact_absent_or_broken_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.load_optional(SECONDARY_ARTIFACT).is_none());

        fs::write(dir.path().join("rfc_failure_pipeline.onnx"), b"garbage").unwrap();
        fs::write(dir.path().join("rfc_failure_pipeline.json"), MANIFEST).unwrap();
        assert!(store.exists(SECONDARY_ARTIFACT));
        assert!(store.load_optional(SECONDARY_ARTIFACT).is_none());
    }

    #[test]
    fn test_paths() {
        let store = ArtifactStore::new("/models");
        assert_eq!(
            store.graph_path(PRIMARY_ARTIFACT),
            PathBuf::from("/models/priority_rf_pipeline.onnx")
        );
        assert_eq!(
            store.manifest_path(SECONDARY_ARTIFACT),
            PathBuf::from("/models/rfc_failure_pipeline.json")
        );
    }

    #[test]
    fn test_compute_checksum() {
        assert_eq!(
            compute_checksum(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
