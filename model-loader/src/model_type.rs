//! Model family tagging for health and prediction reports.
//!
//! The tag is informational only and never changes inference. Detection by
//! class name is exact; the file-size fallback is a rough guess that is
//! unreliable for any family the name check does not recognise, so it is
//! kept as its own [`ModelTypeDetection`] variant.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Artifacts larger than this are guessed to be random forests.
pub const RANDOM_FOREST_MIN_BYTES: u64 = 50_000;

/// Artifacts larger than this (and not above the forest cutoff) are guessed
/// to be XGBoost models. LightGBM artifacts land in the same band.
pub const XGBOOST_MIN_BYTES: u64 = 20_000;

/// Class-name substrings checked in order.
const NAME_MARKERS: [(&str, ModelTypeTag); 3] = [
    ("LGBMClassifier", ModelTypeTag::LightGbm),
    ("XGBClassifier", ModelTypeTag::XgBoost),
    ("RandomForestClassifier", ModelTypeTag::RandomForest),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelTypeTag {
    #[serde(rename = "lightgbm")]
    LightGbm,
    #[serde(rename = "xgboost")]
    XgBoost,
    #[serde(rename = "randomforest")]
    RandomForest,
    #[serde(rename = "unknown")]
    Unknown,
}

impl ModelTypeTag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LightGbm => "lightgbm",
            Self::XgBoost => "xgboost",
            Self::RandomForest => "randomforest",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ModelTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the tag was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTypeDetection {
    /// Class name contained a known family marker.
    ByName(ModelTypeTag),
    /// Best-effort guess from the artifact's size on disk.
    ByHeuristic { tag: ModelTypeTag, file_size: u64 },
    /// Neither the name nor the size gave a hint.
    Unknown { file_size: u64 },
}

impl ModelTypeDetection {
    pub fn tag(&self) -> ModelTypeTag {
        match self {
            Self::ByName(tag) => *tag,
            Self::ByHeuristic { tag, .. } => *tag,
            Self::Unknown { .. } => ModelTypeTag::Unknown,
        }
    }

    /// Short label for logs.
    pub fn method(&self) -> &'static str {
        match self {
            Self::ByName(_) => "class_name",
            Self::ByHeuristic { .. } => "file_size",
            Self::Unknown { .. } => "none",
        }
    }
}

/// Case-sensitive family lookup on the runtime class name.
pub fn detect_by_name(class_name: &str) -> Option<ModelTypeTag> {
    NAME_MARKERS
        .iter()
        .find(|(marker, _)| class_name.contains(marker))
        .map(|(_, tag)| *tag)
}

/// Size-only guess, used when the class name is not recognised.
pub fn detect_by_size(file_size: u64) -> ModelTypeDetection {
    if file_size > RANDOM_FOREST_MIN_BYTES {
        ModelTypeDetection::ByHeuristic {
            tag: ModelTypeTag::RandomForest,
            file_size,
        }
    } else if file_size > XGBOOST_MIN_BYTES {
        ModelTypeDetection::ByHeuristic {
            tag: ModelTypeTag::XgBoost,
            file_size,
        }
    } else {
        ModelTypeDetection::Unknown { file_size }
    }
}

pub fn classify_model_type(class_name: &str, file_size: u64) -> ModelTypeDetection {
    match detect_by_name(class_name) {
        Some(tag) => ModelTypeDetection::ByName(tag),
        None => detect_by_size(file_size),
    }
}
