//! Five-tier vigilance scale.

use serde::{Deserialize, Serialize};

/// Lower bounds (inclusive) of yellow, orange, orange_red and red.
pub const TIER_THRESHOLDS: [f64; 4] = [0.20, 0.40, 0.60, 0.80];

/// Ordered from least to most dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Green,
    Yellow,
    Orange,
    OrangeRed,
    Red,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        Self::Green,
        Self::Yellow,
        Self::Orange,
        Self::OrangeRed,
        Self::Red,
    ];

    /// Half-open intervals `[lower, upper)`; red is closed at 1.0.
    pub fn from_probability(probability: f64) -> Self {
        let reached = TIER_THRESHOLDS
            .iter()
            .take_while(|threshold| probability >= **threshold)
            .count();
        Self::ALL[reached]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::OrangeRed => "orange_red",
            Self::Red => "red",
        }
    }

    /// Recommendation shown to the public, in French.
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Green => "Conditions normales - aucune mesure particulière",
            Self::Yellow => "Soyez vigilant - conditions potentiellement dangereuses",
            Self::Orange => "Risque élevé - limitez les déplacements non essentiels",
            Self::OrangeRed => "Risque très élevé - préparez-vous à des mesures d'urgence",
            Self::Red => "DANGER EXTRÊME - suivez les instructions des autorités",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
