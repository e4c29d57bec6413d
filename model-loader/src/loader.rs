//! Startup model loading.

use std::path::{Path, PathBuf};

use crate::artifact::{ArtifactDocument, ArtifactError};
use crate::classifier::ClassifierArtifact;
use crate::discovery::find_latest_artifact;
use crate::feature::{FEATURE_COUNT, FEATURE_NAMES, matches_training_layout};
use crate::model_type::{ModelTypeDetection, ModelTypeTag, classify_model_type};

/// Why an artifact could not be turned into a classifier.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactLoadCause {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML artifact: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid artifact structure: {0}")]
    Invalid(#[from] ArtifactError),

    #[error("unsupported artifact format '{0}' (expected json or toml)")]
    UnsupportedFormat(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no model artifact found under {}", root.display())]
    ArtifactNotFound { root: PathBuf },

    #[error("failed to load model artifact {}: {source}", path.display())]
    ArtifactLoad {
        path: PathBuf,
        #[source]
        source: ArtifactLoadCause,
    },
}

/// A deserialized classifier plus what we know about where it came from.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub classifier: ClassifierArtifact,
    pub model_type: ModelTypeTag,
    pub detection: ModelTypeDetection,
    pub path: PathBuf,
    pub file_size: u64,
    pub n_features_in: Option<usize>,
}

/// Find the newest artifact under `root` and load it.
pub fn load_latest_model(root: &Path) -> Result<LoadedModel, LoadError> {
    let latest = find_latest_artifact(root).ok_or_else(|| LoadError::ArtifactNotFound {
        root: root.to_path_buf(),
    })?;
    tracing::info!(
        path = %latest.path.display(),
        modified = ?latest.modified,
        size = latest.size,
        "most recent model artifact"
    );
    load_model_from_path(&latest.path)
}

/// Load one artifact file.
pub fn load_model_from_path(path: &Path) -> Result<LoadedModel, LoadError> {
    tracing::info!("Loading model from {}", path.display());
    let wrap = |source: ArtifactLoadCause| LoadError::ArtifactLoad {
        path: path.to_path_buf(),
        source,
    };

    let file_size = std::fs::metadata(path)
        .map_err(|e| wrap(e.into()))?
        .len();
    let document = read_artifact(path).map_err(wrap)?;
    let detection = classify_model_type(&document.class_name, file_size);
    if !matches_training_layout(&document.feature_names) {
        tracing::warn!(
            expected = ?FEATURE_NAMES,
            found = ?document.feature_names,
            "artifact columns differ from the training feature order"
        );
    }

    tracing::info!(
        class_name = %document.class_name,
        estimator = document.estimator.kind(),
        file_size,
        "model class"
    );
    match detection {
        ModelTypeDetection::ByName(_) => {}
        ModelTypeDetection::ByHeuristic { .. } | ModelTypeDetection::Unknown { .. } => {
            tracing::info!("Model file size: {file_size} bytes");
        }
    }
    tracing::info!(
        model_type = %detection.tag(),
        detected_by = detection.method(),
        "identified model type"
    );
    let classifier = ClassifierArtifact::from_document(document);
    let n_features_in = classifier.n_features_in();
    tracing::info!(
        probabilistic = classifier.supports_probability(),
        "model capabilities"
    );
    if let Some(n) = n_features_in {
        tracing::info!("Model expects {n} features");
        if n != FEATURE_COUNT {
            tracing::warn!(
                expected = n,
                provided = FEATURE_COUNT,
                "artifact feature count differs from the service feature layout; predictions will fail"
            );
        }
    }

    Ok(LoadedModel {
        classifier,
        model_type: detection.tag(),
        detection,
        path: path.to_path_buf(),
        file_size,
        n_features_in,
    })
}

/// Read, decode and validate an artifact document.
pub fn read_artifact(path: &Path) -> Result<ArtifactDocument, ArtifactLoadCause> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let document = match extension.as_str() {
        "json" => ArtifactDocument::from_json_str(&std::fs::read_to_string(path)?)?,
        "toml" => ArtifactDocument::from_toml_str(&std::fs::read_to_string(path)?)?,
        _ => return Err(ArtifactLoadCause::UnsupportedFormat(extension)),
    };
    document.validate()?;
    Ok(document)
}
