//! `weatherguard-model`: trained classifier artifacts for the risk service.
//!
//! Locates the most recent classifier artifact produced by the external
//! training pipeline (an `mlruns/` experiment tree), deserializes it, and
//! exposes it behind the [`ClassifierArtifact`] capability split:
//! probabilistic estimators versus decision-only ones.
//!
//! ## Artifact layout
//!
//! ```text
//! mlruns/<experiment>/<run>/artifacts/model.json
//! mlruns/<experiment>/models/<model>/artifacts/model.toml
//! ```
//!
//! The newest file (by modification time) wins.

pub mod artifact;
pub mod classifier;
pub mod discovery;
pub mod feature;
pub mod loader;
pub mod model_type;

pub use artifact::ArtifactDocument;
pub use artifact::Estimator;
pub use classifier::Classifier;
pub use classifier::ClassifierArtifact;
pub use classifier::InferenceError;
pub use classifier::ProbabilisticClassifier;
pub use discovery::DEFAULT_MLRUNS_DIR;
pub use discovery::find_latest_artifact;
pub use feature::FEATURE_COUNT;
pub use feature::FEATURE_NAMES;
pub use feature::FeatureVector;
pub use loader::LoadError;
pub use loader::LoadedModel;
pub use loader::load_latest_model;
pub use loader::load_model_from_path;
pub use model_type::ModelTypeDetection;
pub use model_type::ModelTypeTag;
pub use model_type::classify_model_type;
