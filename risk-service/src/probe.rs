//! Diagnostic run of the loaded classifier over fixed weather scenarios.
//!
//! Used by `weatherguard-service probe` to sanity-check a freshly trained
//! artifact before it is served: every scenario should produce a class and
//! a probability, and the hot/storm cases should rank above the normal day.

use std::fmt;

use serde::Serialize;
use weatherguard_model::{FeatureVector, LoadedModel};

use crate::engine::{PredictError, positive_probability};
use crate::risk::RiskLevel;

/// A named feature vector in training order.
#[derive(Debug, Clone, Copy)]
pub struct ProbeCase {
    pub name: &'static str,
    pub features: [f32; 5],
}

pub const PROBE_CASES: [ProbeCase; 6] = [
    ProbeCase {
        name: "Normal day - Tunis",
        features: [25.0, 18.0, 60.0, 15.0, 1.0],
    },
    ProbeCase {
        name: "Hot day - Tunis",
        features: [38.0, 24.0, 80.0, 20.0, 1.0],
    },
    ProbeCase {
        name: "Storm - Tunis",
        features: [22.0, 18.0, 95.0, 55.0, 1.0],
    },
    ProbeCase {
        name: "Cold wave - Tunis",
        features: [5.0, -2.0, 85.0, 30.0, 1.0],
    },
    ProbeCase {
        name: "Normal day - Sfax",
        features: [25.0, 18.0, 60.0, 15.0, 6.0],
    },
    ProbeCase {
        name: "Extreme heat - Sfax",
        features: [42.0, 28.0, 15.0, 25.0, 6.0],
    },
];

/// One-feature-at-a-time changes from the normal Tunis day. A model that
/// gives the same probability for all of them ignores its inputs.
pub const SENSITIVITY_CASES: [ProbeCase; 5] = [
    ProbeCase {
        name: "Base case",
        features: [25.0, 18.0, 60.0, 15.0, 1.0],
    },
    ProbeCase {
        name: "Higher temp",
        features: [35.0, 18.0, 60.0, 15.0, 1.0],
    },
    ProbeCase {
        name: "Higher humidity",
        features: [25.0, 18.0, 90.0, 15.0, 1.0],
    },
    ProbeCase {
        name: "Higher wind",
        features: [25.0, 18.0, 60.0, 45.0, 1.0],
    },
    ProbeCase {
        name: "Different city",
        features: [25.0, 18.0, 60.0, 15.0, 6.0],
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeRow {
    pub name: &'static str,
    pub features: [f32; 5],
    pub predicted_class: i64,
    pub probability: f64,
    pub risk_level: RiskLevel,
}

impl fmt::Display for ProbeRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<22} {:?} -> class {} p={:.4} ({})",
            self.name, self.features, self.predicted_class, self.probability, self.risk_level
        )
    }
}

/// Run every case in [`PROBE_CASES`]; stops at the first inference failure.
pub fn probe_model(model: &LoadedModel) -> Result<Vec<ProbeRow>, PredictError> {
    run_cases(model, &PROBE_CASES)
}

/// Run [`SENSITIVITY_CASES`].
pub fn sensitivity(model: &LoadedModel) -> Result<Vec<ProbeRow>, PredictError> {
    run_cases(model, &SENSITIVITY_CASES)
}

/// Whether any row's probability differs from the first one.
pub fn responds_to_inputs(rows: &[ProbeRow]) -> bool {
    match rows.split_first() {
        Some((base, rest)) => rest.iter().any(|row| row.probability != base.probability),
        None => false,
    }
}

fn run_cases(model: &LoadedModel, cases: &[ProbeCase]) -> Result<Vec<ProbeRow>, PredictError> {
    cases
        .iter()
        .map(|case| -> Result<ProbeRow, PredictError> {
            let features = FeatureVector::from(case.features);
            let predicted_class = model.classifier.predict(&features)?;
            let probability = positive_probability(&model.classifier, &features)?;
            tracing::debug!(case = case.name, predicted_class, probability, "probe");
            Ok(ProbeRow {
                name: case.name,
                features: case.features,
                predicted_class,
                probability,
                risk_level: RiskLevel::from_probability(probability),
            })
        })
        .collect()
}
