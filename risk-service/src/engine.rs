//! Risk prediction: request fields in, [`RiskAssessment`] out.
//!
//! Stateless over the shared [`AppContext`]. Missing weather readings fall
//! back to fixed defaults, the city is encoded, the feature vector is built
//! in training order, and the classifier output becomes a probability and
//! then a tier.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use weatherguard_model::{ClassifierArtifact, FeatureVector, InferenceError, ModelTypeTag};

use crate::context::AppContext;
use crate::governorates::city_code;
use crate::risk::RiskLevel;

pub const DEFAULT_TEMP_MAX: f64 = 25.0;
pub const DEFAULT_TEMP_MIN: f64 = 18.0;
pub const DEFAULT_HUMIDITY_PERCENT: f64 = 60.0;
pub const DEFAULT_WIND_SPEED_KMH: f64 = 15.0;

/// Label of the "danger" class.
pub const POSITIVE_CLASS: i64 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Body of `POST /api/predict`. `null` is treated like an absent field.
///
/// Aliases accept the training column names and the short forms used by
/// older clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    pub city: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "temp_max_fb")]
    pub temp_max: Option<f64>,
    #[serde(default, alias = "temp_min_fb")]
    pub temp_min: Option<f64>,
    #[serde(default, alias = "humidity", alias = "humidity_percent_hist_fb")]
    pub humidity_percent: Option<f64>,
    #[serde(default, alias = "wind_speed", alias = "wind_speed_kmh_hist_fb")]
    pub wind_speed_kmh: Option<f64>,
}

impl PredictRequest {
    pub fn for_city(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            ..Self::default()
        }
    }
}

/// Every value that went into the prediction, defaults included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionDetails {
    pub city: String,
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub humidity_percent: f64,
    pub wind_speed_kmh: f64,
    pub city_encoded: u32,
    pub raw_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// Rounded to three decimals.
    pub probability: f64,
    pub recommendation: String,
    pub model_used: ModelTypeTag,
    pub details: PredictionDetails,
}

#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error("invalid date '{value}', expected YYYY-MM-DD: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{0}")]
    Prediction(String),
}

impl From<InferenceError> for PredictError {
    fn from(err: InferenceError) -> Self {
        PredictError::Prediction(err.to_string())
    }
}

/// Predict using today's local date when the request has none.
pub fn predict(context: &AppContext, request: &PredictRequest) -> Result<RiskAssessment, PredictError> {
    predict_on(context, request, Local::now().date_naive())
}

/// Same as [`predict`] with an explicit fallback date.
pub fn predict_on(
    context: &AppContext,
    request: &PredictRequest,
    today: NaiveDate,
) -> Result<RiskAssessment, PredictError> {
    let model = context.model().ok_or(PredictError::ModelUnavailable)?;

    // An empty string counts as "no date".
    let date = match request.date.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|source| {
                PredictError::InvalidDate {
                    value: raw.to_string(),
                    source,
                }
            })?
        }
        None => today,
    };

    let city_encoded = city_code(&request.city);
    let temp_max = request.temp_max.unwrap_or(DEFAULT_TEMP_MAX);
    let temp_min = request.temp_min.unwrap_or(DEFAULT_TEMP_MIN);
    let humidity_percent = request.humidity_percent.unwrap_or(DEFAULT_HUMIDITY_PERCENT);
    let wind_speed_kmh = request.wind_speed_kmh.unwrap_or(DEFAULT_WIND_SPEED_KMH);

    let features = FeatureVector::new(
        temp_max,
        temp_min,
        humidity_percent,
        wind_speed_kmh,
        city_encoded,
    );
    tracing::info!(features = ?features.as_array(), "Prediction features");

    let probability = positive_probability(&model.classifier, &features)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(PredictError::Prediction(format!(
            "classifier returned invalid probability {probability}"
        )));
    }
    tracing::info!("Prediction probability: {probability}");

    let risk_level = RiskLevel::from_probability(probability);
    Ok(RiskAssessment {
        risk_level,
        probability: round3(probability),
        recommendation: risk_level.recommendation().to_string(),
        model_used: model.model_type,
        details: PredictionDetails {
            city: request.city.clone(),
            date,
            temp_max,
            temp_min,
            humidity_percent,
            wind_speed_kmh,
            city_encoded,
            raw_probability: probability,
        },
    })
}

/// Probability mass on the danger class.
///
/// A one-column distribution is used as-is. Decision-only models give 1.0
/// for the danger class and 0.0 otherwise.
pub fn positive_probability(
    classifier: &ClassifierArtifact,
    features: &FeatureVector,
) -> Result<f64, InferenceError> {
    match classifier {
        ClassifierArtifact::Probabilistic(model) => {
            let proba = model.predict_proba(features)?;
            match proba.as_slice() {
                [] => Err(InferenceError::EmptyDistribution),
                [only] => Ok(*only),
                [_, positive, ..] => Ok(*positive),
            }
        }
        ClassifierArtifact::DecisionOnly(model) => {
            let label = model.predict(features)?;
            Ok(if label == POSITIVE_CLASS { 1.0 } else { 0.0 })
        }
    }
}

/// Round to three decimals from the exact binary value, so `0.6665` (stored
/// just below the tie) gives `0.666`.
fn round3(value: f64) -> f64 {
    format!("{value:.3}").parse().unwrap_or(value)
}
