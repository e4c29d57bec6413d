//! Loaded classifiers and their capability split.
//!
//! Whether an artifact can estimate probabilities is decided once, when the
//! document is turned into a [`ClassifierArtifact`]. Callers match on the
//! variant instead of probing capabilities per request.

use std::sync::Arc;

use crate::artifact::{ArtifactDocument, Estimator, Tree};
use crate::feature::{FEATURE_COUNT, FeatureVector};

/// Errors raised while evaluating a loaded classifier.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InferenceError {
    #[error("X has {actual} features, but {class_name} is expecting {expected} features as input")]
    FeatureCount {
        class_name: String,
        expected: usize,
        actual: usize,
    },

    #[error("tree {tree} did not reach a leaf within {limit} steps")]
    UnterminatedTree { tree: usize, limit: usize },

    #[error("tree {tree} references missing node {node}")]
    MissingNode { tree: usize, node: usize },

    #[error("tree {tree} splits on missing feature {feature_index}")]
    MissingFeature { tree: usize, feature_index: usize },

    #[error("classifier returned an empty probability distribution")]
    EmptyDistribution,

    #[error("no class label for output column {0}")]
    UnknownClass(usize),
}

/// Any loaded model: produces a discrete class label.
pub trait Classifier: Send + Sync + std::fmt::Debug {
    fn class_name(&self) -> &str;

    fn n_features_in(&self) -> Option<usize>;

    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError>;
}

/// A model that can also estimate the class-probability distribution.
///
/// Columns follow the artifact's `classes` order.
pub trait ProbabilisticClassifier: Classifier {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError>;
}

/// The loaded artifact, tagged by capability.
#[derive(Debug, Clone)]
pub enum ClassifierArtifact {
    Probabilistic(Arc<dyn ProbabilisticClassifier>),
    DecisionOnly(Arc<dyn Classifier>),
}

impl ClassifierArtifact {
    /// Build the runtime classifier. The document must already be validated.
    pub fn from_document(doc: ArtifactDocument) -> Self {
        let meta = ModelMeta {
            class_name: doc.class_name,
            n_features_in: doc.n_features_in,
            classes: doc.classes,
        };
        let model = match doc.estimator {
            Estimator::LinearSvc {
                coefficients,
                intercept,
            } => {
                return ClassifierArtifact::DecisionOnly(Arc::new(MarginClassifier {
                    meta,
                    coefficients,
                    intercept,
                }));
            }
            Estimator::GradientBoosting { base_score, trees } => {
                ProbabilityModel::Boosted { base_score, trees }
            }
            Estimator::RandomForest { trees } => ProbabilityModel::Forest { trees },
            Estimator::LogisticRegression {
                coefficients,
                intercept,
            } => ProbabilityModel::Logistic {
                coefficients,
                intercept,
            },
            Estimator::Constant {
                class_probabilities,
            } => ProbabilityModel::Prior {
                class_probabilities,
            },
        };
        ClassifierArtifact::Probabilistic(Arc::new(ProbabilityEstimator { meta, model }))
    }

    pub fn class_name(&self) -> &str {
        match self {
            ClassifierArtifact::Probabilistic(model) => model.class_name(),
            ClassifierArtifact::DecisionOnly(model) => model.class_name(),
        }
    }

    pub fn n_features_in(&self) -> Option<usize> {
        match self {
            ClassifierArtifact::Probabilistic(model) => model.n_features_in(),
            ClassifierArtifact::DecisionOnly(model) => model.n_features_in(),
        }
    }

    pub fn supports_probability(&self) -> bool {
        matches!(self, ClassifierArtifact::Probabilistic(_))
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        match self {
            ClassifierArtifact::Probabilistic(model) => model.predict(features),
            ClassifierArtifact::DecisionOnly(model) => model.predict(features),
        }
    }
}

#[derive(Debug)]
struct ModelMeta {
    class_name: String,
    n_features_in: Option<usize>,
    classes: Vec<i64>,
}

impl ModelMeta {
    fn check_width(&self) -> Result<(), InferenceError> {
        match self.n_features_in {
            Some(expected) if expected != FEATURE_COUNT => Err(InferenceError::FeatureCount {
                class_name: self.class_name.clone(),
                expected,
                actual: FEATURE_COUNT,
            }),
            _ => Ok(()),
        }
    }

    fn label(&self, column: usize) -> Result<i64, InferenceError> {
        self.classes
            .get(column)
            .copied()
            .ok_or(InferenceError::UnknownClass(column))
    }
}

#[derive(Debug)]
enum ProbabilityModel {
    Boosted { base_score: f64, trees: Vec<Tree> },
    Forest { trees: Vec<Tree> },
    Logistic { coefficients: Vec<f64>, intercept: f64 },
    Prior { class_probabilities: Vec<f64> },
}

#[derive(Debug)]
struct ProbabilityEstimator {
    meta: ModelMeta,
    model: ProbabilityModel,
}

impl Classifier for ProbabilityEstimator {
    fn class_name(&self) -> &str {
        &self.meta.class_name
    }

    fn n_features_in(&self) -> Option<usize> {
        self.meta.n_features_in
    }

    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        let proba = self.predict_proba(features)?;
        let mut best: Option<(usize, f64)> = None;
        for (column, p) in proba.iter().copied().enumerate() {
            // First maximum wins on ties.
            if best.is_none_or(|(_, top)| p > top) {
                best = Some((column, p));
            }
        }
        let (column, _) = best.ok_or(InferenceError::EmptyDistribution)?;
        self.meta.label(column)
    }
}

impl ProbabilisticClassifier for ProbabilityEstimator {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, InferenceError> {
        self.meta.check_width()?;
        let positive = match &self.model {
            ProbabilityModel::Boosted { base_score, trees } => {
                let mut raw = *base_score;
                for (t, tree) in trees.iter().enumerate() {
                    raw += leaf_value(t, tree, features)?;
                }
                sigmoid(raw)
            }
            ProbabilityModel::Forest { trees } => {
                if trees.is_empty() {
                    return Err(InferenceError::EmptyDistribution);
                }
                let mut sum = 0.0;
                for (t, tree) in trees.iter().enumerate() {
                    sum += leaf_value(t, tree, features)?;
                }
                sum / trees.len() as f64
            }
            ProbabilityModel::Logistic {
                coefficients,
                intercept,
            } => sigmoid(linear_margin(coefficients, *intercept, features)),
            ProbabilityModel::Prior {
                class_probabilities,
            } => {
                if class_probabilities.is_empty() {
                    return Err(InferenceError::EmptyDistribution);
                }
                return Ok(class_probabilities.clone());
            }
        };
        Ok(vec![1.0 - positive, positive])
    }
}

/// Decision-only linear margin model (`LinearSVC`-style).
#[derive(Debug)]
struct MarginClassifier {
    meta: ModelMeta,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl Classifier for MarginClassifier {
    fn class_name(&self) -> &str {
        &self.meta.class_name
    }

    fn n_features_in(&self) -> Option<usize> {
        self.meta.n_features_in
    }

    fn predict(&self, features: &FeatureVector) -> Result<i64, InferenceError> {
        self.meta.check_width()?;
        let margin = linear_margin(&self.coefficients, self.intercept, features);
        self.meta.label(usize::from(margin > 0.0))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn linear_margin(coefficients: &[f64], intercept: f64, features: &FeatureVector) -> f64 {
    coefficients
        .iter()
        .zip(features.as_array())
        .fold(intercept, |acc, (w, x)| acc + w * f64::from(*x))
}

/// Walk one tree from the root. Bounded by the node count so a cyclic tree
/// fails instead of spinning.
fn leaf_value(tree_index: usize, tree: &Tree, features: &FeatureVector) -> Result<f64, InferenceError> {
    let limit = tree.nodes.len();
    let mut cursor = 0;
    for _ in 0..=limit {
        let node = tree.nodes.get(cursor).ok_or(InferenceError::MissingNode {
            tree: tree_index,
            node: cursor,
        })?;
        if let Some(value) = node.value {
            return Ok(value);
        }
        let x = features
            .get(node.feature_index)
            .ok_or(InferenceError::MissingFeature {
                tree: tree_index,
                feature_index: node.feature_index,
            })?;
        cursor = if f64::from(x) <= node.threshold {
            node.left
        } else {
            node.right
        };
    }
    Err(InferenceError::UnterminatedTree {
        tree: tree_index,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::TreeNode;
    use pretty_assertions::assert_eq;

    fn doc(class_name: &str, estimator: Estimator) -> ArtifactDocument {
        ArtifactDocument {
            class_name: class_name.to_string(),
            n_features_in: Some(5),
            feature_names: Vec::new(),
            classes: vec![0, 1],
            estimator,
        }
    }

    fn heat_stump(low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                TreeNode::split(0, 35.0, 1, 2),
                TreeNode::leaf(low),
                TreeNode::leaf(high),
            ],
        }
    }

    fn mild() -> FeatureVector {
        FeatureVector::new(25.0, 18.0, 60.0, 15.0, 1)
    }

    fn scorching() -> FeatureVector {
        FeatureVector::new(42.0, 28.0, 15.0, 25.0, 6)
    }

    #[test]
    fn forest_averages_leaf_shares() {
        let artifact = ClassifierArtifact::from_document(doc(
            "RandomForestClassifier",
            Estimator::RandomForest {
                trees: vec![heat_stump(0.1, 0.9), heat_stump(0.2, 0.7)],
            },
        ));
        let ClassifierArtifact::Probabilistic(model) = &artifact else {
            panic!("forest should be probabilistic");
        };
        let proba = model.predict_proba(&scorching()).expect("proba");
        assert!((proba[1] - 0.8).abs() < 1e-12);
        assert_eq!(artifact.predict(&scorching()), Ok(1));
        assert_eq!(artifact.predict(&mild()), Ok(0));
    }

    #[test]
    fn boosting_squashes_raw_score() {
        let artifact = ClassifierArtifact::from_document(doc(
            "LGBMClassifier",
            Estimator::GradientBoosting {
                base_score: 0.0,
                trees: vec![heat_stump(-1.0, 1.0), heat_stump(-1.0, 1.0)],
            },
        ));
        let ClassifierArtifact::Probabilistic(model) = &artifact else {
            panic!("boosting should be probabilistic");
        };
        let proba = model.predict_proba(&scorching()).expect("proba");
        assert!((proba[1] - sigmoid(2.0)).abs() < 1e-12);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn logistic_uses_training_column_order() {
        // Only the wind column carries weight.
        let artifact = ClassifierArtifact::from_document(doc(
            "LogisticRegression",
            Estimator::LogisticRegression {
                coefficients: vec![0.0, 0.0, 0.0, 1.0, 0.0],
                intercept: -15.0,
            },
        ));
        let ClassifierArtifact::Probabilistic(model) = &artifact else {
            panic!("logistic should be probabilistic");
        };
        let proba = model.predict_proba(&mild()).expect("proba");
        assert!((proba[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn linear_svc_is_decision_only() {
        let artifact = ClassifierArtifact::from_document(doc(
            "LinearSVC",
            Estimator::LinearSvc {
                coefficients: vec![1.0, 0.0, 0.0, 0.0, 0.0],
                intercept: -35.0,
            },
        ));
        assert!(!artifact.supports_probability());
        assert_eq!(artifact.predict(&scorching()), Ok(1));
        assert_eq!(artifact.predict(&mild()), Ok(0));
    }

    #[test]
    fn constant_returns_distribution_verbatim() {
        let artifact = ClassifierArtifact::from_document(doc(
            "DummyClassifier",
            Estimator::Constant {
                class_probabilities: vec![0.85],
            },
        ));
        let ClassifierArtifact::Probabilistic(model) = &artifact else {
            panic!("constant should be probabilistic");
        };
        assert_eq!(model.predict_proba(&mild()), Ok(vec![0.85]));
        assert_eq!(artifact.predict(&mild()), Ok(0));
    }

    #[test]
    fn width_mismatch_is_an_inference_error() {
        let mut document = doc(
            "XGBClassifier",
            Estimator::Constant {
                class_probabilities: vec![0.5, 0.5],
            },
        );
        document.n_features_in = Some(7);
        let artifact = ClassifierArtifact::from_document(document);
        assert_eq!(
            artifact.predict(&mild()),
            Err(InferenceError::FeatureCount {
                class_name: "XGBClassifier".to_string(),
                expected: 7,
                actual: 5,
            })
        );
    }

    #[test]
    fn cyclic_tree_terminates() {
        let looping = Tree {
            nodes: vec![TreeNode::split(0, 100.0, 0, 0)],
        };
        assert_eq!(
            leaf_value(3, &looping, &mild()),
            Err(InferenceError::UnterminatedTree { tree: 3, limit: 1 })
        );
    }
}
