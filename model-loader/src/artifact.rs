//! Serialized classifier artifacts.
//!
//! The training pipeline exports the fitted estimator as a plain document
//! (JSON or TOML) next to its run metadata. Trees are flat node arrays with
//! node 0 as the root:
//!
//! ```json
//! {
//!   "class_name": "LGBMClassifier",
//!   "n_features_in": 5,
//!   "classes": [0, 1],
//!   "estimator": {
//!     "type": "gradient_boosting",
//!     "base_score": -1.2,
//!     "trees": [{ "nodes": [
//!       { "feature_index": 0, "threshold": 35.0, "left": 1, "right": 2 },
//!       { "value": -0.4 },
//!       { "value": 1.8 }
//!     ]}]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::feature::FEATURE_COUNT;

/// Structural problems found while validating a decoded artifact.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArtifactError {
    #[error("artifact declares no classes")]
    NoClasses,

    #[error("{kind} needs at least {required} classes, artifact declares {actual}")]
    TooFewClasses {
        kind: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("{kind} has no trees")]
    EmptyEnsemble { kind: &'static str },

    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },

    #[error("tree {tree} node {node}: child {child} out of range ({len} nodes)")]
    ChildOutOfRange {
        tree: usize,
        node: usize,
        child: usize,
        len: usize,
    },

    #[error("tree {tree} node {node}: feature index {feature_index} out of range ({width} features)")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature_index: usize,
        width: usize,
    },

    #[error("expected {expected} coefficients, found {actual}")]
    CoefficientCount { expected: usize, actual: usize },

    #[error("non-finite value in {field}")]
    NonFinite { field: String },

    #[error("constant estimator has an empty probability distribution")]
    EmptyDistribution,
}

/// Top-level artifact document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDocument {
    /// Runtime class name of the fitted estimator, e.g. `XGBClassifier`.
    pub class_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features_in: Option<usize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_names: Vec<String>,

    /// Class labels in probability-column order. `1` is the danger class.
    #[serde(default = "default_classes")]
    pub classes: Vec<i64>,

    pub estimator: Estimator,
}

fn default_classes() -> Vec<i64> {
    vec![0, 1]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Estimator {
    /// Additive raw scores squashed through a sigmoid (LightGBM, XGBoost).
    GradientBoosting {
        #[serde(default)]
        base_score: f64,
        trees: Vec<Tree>,
    },
    /// Leaf values are the positive-class share; trees are averaged.
    RandomForest { trees: Vec<Tree> },
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Margin classifier without probability estimates.
    LinearSvc {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    /// Fixed class distribution, independent of the input.
    Constant { class_probabilities: Vec<f64> },
}

impl Estimator {
    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::GradientBoosting { .. } => "gradient_boosting",
            Estimator::RandomForest { .. } => "random_forest",
            Estimator::LogisticRegression { .. } => "logistic_regression",
            Estimator::LinearSvc { .. } => "linear_svc",
            Estimator::Constant { .. } => "constant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

/// A split node, or a leaf when `value` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature_index: usize,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: usize,
    #[serde(default)]
    pub right: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl TreeNode {
    pub fn leaf(value: f64) -> Self {
        Self {
            feature_index: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
            value: Some(value),
        }
    }

    pub fn split(feature_index: usize, threshold: f64, left: usize, right: usize) -> Self {
        Self {
            feature_index,
            threshold,
            left,
            right,
            value: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }
}

impl ArtifactDocument {
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Number of input columns the estimator indexes into.
    pub fn input_width(&self) -> usize {
        self.n_features_in.unwrap_or(FEATURE_COUNT)
    }

    /// Check the structure so inference never indexes out of bounds.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.classes.is_empty() {
            return Err(ArtifactError::NoClasses);
        }
        let width = self.input_width();

        match &self.estimator {
            Estimator::GradientBoosting { base_score, trees } => {
                ensure_finite(*base_score, "base_score")?;
                validate_trees(self.estimator.kind(), trees, width)
            }
            Estimator::RandomForest { trees } => {
                validate_trees(self.estimator.kind(), trees, width)
            }
            Estimator::LogisticRegression {
                coefficients,
                intercept,
            } => validate_linear(coefficients, *intercept, width),
            Estimator::LinearSvc {
                coefficients,
                intercept,
            } => {
                if self.classes.len() < 2 {
                    return Err(ArtifactError::TooFewClasses {
                        kind: self.estimator.kind(),
                        required: 2,
                        actual: self.classes.len(),
                    });
                }
                validate_linear(coefficients, *intercept, width)
            }
            Estimator::Constant {
                class_probabilities,
            } => {
                if class_probabilities.is_empty() {
                    return Err(ArtifactError::EmptyDistribution);
                }
                for (i, p) in class_probabilities.iter().enumerate() {
                    ensure_finite(*p, &format!("class_probabilities[{i}]"))?;
                }
                Ok(())
            }
        }
    }
}

fn ensure_finite(value: f64, field: &str) -> Result<(), ArtifactError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ArtifactError::NonFinite {
            field: field.to_string(),
        })
    }
}

fn validate_linear(coefficients: &[f64], intercept: f64, width: usize) -> Result<(), ArtifactError> {
    if coefficients.len() != width {
        return Err(ArtifactError::CoefficientCount {
            expected: width,
            actual: coefficients.len(),
        });
    }
    for (i, w) in coefficients.iter().enumerate() {
        ensure_finite(*w, &format!("coefficients[{i}]"))?;
    }
    ensure_finite(intercept, "intercept")
}

fn validate_trees(kind: &'static str, trees: &[Tree], width: usize) -> Result<(), ArtifactError> {
    if trees.is_empty() {
        return Err(ArtifactError::EmptyEnsemble { kind });
    }
    for (t, tree) in trees.iter().enumerate() {
        let len = tree.nodes.len();
        if len == 0 {
            return Err(ArtifactError::EmptyTree { tree: t });
        }
        for (n, node) in tree.nodes.iter().enumerate() {
            if let Some(value) = node.value {
                ensure_finite(value, &format!("trees[{t}].nodes[{n}].value"))?;
                continue;
            }
            if node.feature_index >= width {
                return Err(ArtifactError::FeatureOutOfRange {
                    tree: t,
                    node: n,
                    feature_index: node.feature_index,
                    width,
                });
            }
            ensure_finite(node.threshold, &format!("trees[{t}].nodes[{n}].threshold"))?;
            for child in [node.left, node.right] {
                if child >= len {
                    return Err(ArtifactError::ChildOutOfRange {
                        tree: t,
                        node: n,
                        child,
                        len,
                    });
                }
            }
        }
    }
    Ok(())
}
