//! JSON bodies of the HTTP API that are not prediction payloads.
//!
//! `POST /api/predict` answers with [`crate::engine::RiskAssessment`]
//! directly; everything else is defined here.

use serde::{Deserialize, Serialize};
use weatherguard_model::ModelTypeTag;

pub const STATUS_HEALTHY: &str = "healthy";
pub const MODEL_LOADED: &str = "loaded";
pub const MODEL_NOT_LOADED: &str = "not_loaded";

pub const ROOT_MESSAGE: &str = "WeatherGuardTN API is running";

/// Message returned with 503 when no classifier is loaded.
pub const DETAIL_MODEL_NOT_LOADED: &str = "Model not loaded";

/// Prefix of the 500 message for failed predictions.
pub const DETAIL_PREDICTION_PREFIX: &str = "Erreur de prédiction";

// ─────────────────────────────────────────────────────────────────────────────
// GET /
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// GET /api/health
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    /// `null` while no model is loaded.
    pub model_type: Option<ModelTypeTag>,
}

impl HealthResponse {
    pub fn new(model_type: Option<ModelTypeTag>) -> Self {
        let model = if model_type.is_some() {
            MODEL_LOADED
        } else {
            MODEL_NOT_LOADED
        };
        Self {
            status: STATUS_HEALTHY.to_string(),
            model: model.to_string(),
            model_type,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
