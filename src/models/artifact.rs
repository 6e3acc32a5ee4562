//! Serialized model artifacts and their bound predictors
//!
//! Artifacts are JSON documents tagged by `kind`. Binding resolves every
//! referenced feature against the deployment schema and validates the model
//! structure once, so evaluation never indexes out of bounds and never
//! loops.

use crate::errors::{LoadError, PredictionError};
use crate::features::{Feature, FeatureSchema, FeatureVector};
use crate::models::predictor::{checked_probability, sigmoid, Predictor};
use serde::{Deserialize, Serialize};

/// Any model document the registry knows how to read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic(LogisticSpec),
    TreeEnsemble(TreeEnsembleSpec),
    Stacking(StackingSpec),
    HardClassifier(HardClassifierSpec),
}

/// Linear model with optional standard scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticSpec {
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<ScalerSpec>,
}

/// Per-feature `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerSpec {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// How tree outputs turn into a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    /// Boosting: leaves are log-odds contributions
    #[default]
    Logit,
    /// Forest: leaves are class probabilities
    Average,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsembleSpec {
    pub features: Vec<String>,
    #[serde(default)]
    pub link: Link,
    #[serde(default)]
    pub base_score: f64,
    pub trees: Vec<TreeSpec>,
}

/// Flat node list; node 0 is the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSpec {
    pub nodes: Vec<NodeSpec>,
}

/// `x <= threshold` goes left
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Meta model over bundled base estimators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingSpec {
    pub estimators: Vec<NamedEstimator>,
    pub final_estimator: FinalEstimatorSpec,
    #[serde(default)]
    pub passthrough: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedEstimator {
    pub name: String,
    pub model: ModelArtifact,
}

/// Logistic layer over estimator probabilities, in estimator order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalEstimatorSpec {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Decision rule exported without `predict_proba`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardClassifierSpec {
    pub features: Vec<String>,
    #[serde(default)]
    pub classes: Vec<i64>,
}

impl ModelArtifact {
    /// Decode artifact bytes
    pub fn from_slice(bytes: &[u8], location: &str) -> Result<Self, LoadError> {
        serde_json::from_slice(bytes).map_err(|e| LoadError::Corrupt {
            location: location.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::Logistic(_) => "logistic",
            ModelArtifact::TreeEnsemble(_) => "tree_ensemble",
            ModelArtifact::Stacking(_) => "stacking",
            ModelArtifact::HardClassifier(_) => "hard_classifier",
        }
    }

    /// Validate against a schema and wrap as a `Predictor`
    pub fn bind(self, schema: FeatureSchema, location: &str) -> Result<Box<dyn Predictor>, LoadError> {
        let corrupt = |reason: String| LoadError::Corrupt {
            location: location.to_string(),
            reason,
        };

        match self {
            ModelArtifact::Logistic(spec) => {
                Ok(Box::new(LogisticPredictor::bind(spec, schema, &corrupt)?))
            }
            ModelArtifact::TreeEnsemble(spec) => {
                Ok(Box::new(TreeEnsemblePredictor::bind(spec, schema, &corrupt)?))
            }
            ModelArtifact::Stacking(spec) => {
                Ok(Box::new(StackingPredictor::bind(spec, schema, location)?))
            }
            ModelArtifact::HardClassifier(_) => Err(LoadError::MissingCapability {
                kind: "hard_classifier".to_string(),
            }),
        }
    }
}

fn resolve_features(names: &[String], schema: FeatureSchema) -> Result<Vec<usize>, LoadError> {
    names
        .iter()
        .map(|name| {
            Feature::from_name(name)
                .and_then(|feature| schema.position(feature))
                .ok_or_else(|| LoadError::SchemaMismatch {
                    feature: name.clone(),
                    schema: schema.to_string(),
                })
        })
        .collect()
}

fn ensure_schema(expected: FeatureSchema, features: &FeatureVector) -> Result<(), PredictionError> {
    if features.schema() == expected {
        Ok(())
    } else {
        Err(PredictionError::SchemaMismatch {
            expected: expected.to_string(),
            found: features.schema().to_string(),
        })
    }
}

struct LogisticPredictor {
    schema: FeatureSchema,
    indices: Vec<usize>,
    coefficients: Vec<f64>,
    intercept: f64,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl LogisticPredictor {
    fn bind(
        spec: LogisticSpec,
        schema: FeatureSchema,
        corrupt: &dyn Fn(String) -> LoadError,
    ) -> Result<Self, LoadError> {
        let indices = resolve_features(&spec.features, schema)?;
        let n = indices.len();
        if spec.coefficients.len() != n {
            return Err(corrupt(format!(
                "{} coefficients for {} features",
                spec.coefficients.len(),
                n
            )));
        }
        let (mean, scale) = match spec.scaler {
            Some(scaler) => {
                if scaler.mean.len() != n || scaler.scale.len() != n {
                    return Err(corrupt("scaler length does not match features".to_string()));
                }
                if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                    return Err(corrupt("scaler contains a zero or non-finite scale".to_string()));
                }
                (scaler.mean, scaler.scale)
            }
            None => (vec![0.0; n], vec![1.0; n]),
        };
        if spec.coefficients.iter().chain(&mean).any(|v| !v.is_finite()) || !spec.intercept.is_finite() {
            return Err(corrupt("non-finite model parameter".to_string()));
        }

        Ok(Self {
            schema,
            indices,
            coefficients: spec.coefficients,
            intercept: spec.intercept,
            mean,
            scale,
        })
    }

    fn decision(&self, values: &[f64]) -> f64 {
        self.indices
            .iter()
            .enumerate()
            .fold(self.intercept, |acc, (i, &idx)| {
                acc + self.coefficients[i] * (values[idx] - self.mean[i]) / self.scale[i]
            })
    }
}

impl Predictor for LogisticPredictor {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        ensure_schema(self.schema, features)?;
        checked_probability(sigmoid(self.decision(features.values())))
    }

    fn kind(&self) -> &str {
        "logistic"
    }
}

struct Tree {
    nodes: Vec<NodeSpec>,
}

impl Tree {
    /// Children always point forward, so the walk terminates
    fn bind(
        spec: TreeSpec,
        n_features: usize,
        link: Link,
        corrupt: &dyn Fn(String) -> LoadError,
    ) -> Result<Self, LoadError> {
        if spec.nodes.is_empty() {
            return Err(corrupt("tree has no nodes".to_string()));
        }
        let len = spec.nodes.len();
        for (i, node) in spec.nodes.iter().enumerate() {
            match node {
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(corrupt(format!("node {} splits on unknown feature {}", i, feature)));
                    }
                    if !threshold.is_finite() {
                        return Err(corrupt(format!("node {} has a non-finite threshold", i)));
                    }
                    if *left <= i || *right <= i || *left >= len || *right >= len {
                        return Err(corrupt(format!("node {} has invalid children", i)));
                    }
                }
                NodeSpec::Leaf { value } => {
                    let valid = match link {
                        Link::Logit => value.is_finite(),
                        Link::Average => value.is_finite() && (0.0..=1.0).contains(value),
                    };
                    if !valid {
                        return Err(corrupt(format!("node {} has invalid leaf value {}", i, value)));
                    }
                }
            }
        }
        Ok(Self { nodes: spec.nodes })
    }

    fn evaluate(&self, indices: &[usize], values: &[f64]) -> f64 {
        let mut current = 0;
        loop {
            match &self.nodes[current] {
                NodeSpec::Leaf { value } => return *value,
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    current = if values[indices[*feature]] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

struct TreeEnsemblePredictor {
    schema: FeatureSchema,
    indices: Vec<usize>,
    link: Link,
    base_score: f64,
    trees: Vec<Tree>,
}

impl TreeEnsemblePredictor {
    fn bind(
        spec: TreeEnsembleSpec,
        schema: FeatureSchema,
        corrupt: &dyn Fn(String) -> LoadError,
    ) -> Result<Self, LoadError> {
        let indices = resolve_features(&spec.features, schema)?;
        if spec.trees.is_empty() {
            return Err(corrupt("ensemble has no trees".to_string()));
        }
        if !spec.base_score.is_finite() {
            return Err(corrupt("non-finite base score".to_string()));
        }
        let trees = spec
            .trees
            .into_iter()
            .map(|tree| Tree::bind(tree, indices.len(), spec.link, corrupt))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            schema,
            indices,
            link: spec.link,
            base_score: spec.base_score,
            trees,
        })
    }
}

impl Predictor for TreeEnsemblePredictor {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        ensure_schema(self.schema, features)?;
        let values = features.values();
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.evaluate(&self.indices, values))
            .sum();
        let probability = match self.link {
            Link::Logit => sigmoid(self.base_score + total),
            Link::Average => total / self.trees.len() as f64,
        };
        checked_probability(probability)
    }

    fn kind(&self) -> &str {
        match self.link {
            Link::Logit => "gradient_boosting",
            Link::Average => "random_forest",
        }
    }
}

struct StackingPredictor {
    schema: FeatureSchema,
    estimators: Vec<(String, Box<dyn Predictor>)>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl StackingPredictor {
    fn bind(spec: StackingSpec, schema: FeatureSchema, location: &str) -> Result<Self, LoadError> {
        let corrupt = |reason: String| LoadError::Corrupt {
            location: location.to_string(),
            reason,
        };
        if spec.passthrough {
            return Err(corrupt("passthrough stacking is not supported".to_string()));
        }
        if spec.estimators.is_empty() {
            return Err(corrupt("stacking model has no base estimators".to_string()));
        }
        if spec.final_estimator.coefficients.len() != spec.estimators.len() {
            return Err(corrupt(format!(
                "final estimator has {} coefficients for {} estimators",
                spec.final_estimator.coefficients.len(),
                spec.estimators.len()
            )));
        }
        let estimators = spec
            .estimators
            .into_iter()
            .map(|named| {
                let predictor = named.model.bind(schema, location)?;
                Ok((named.name, predictor))
            })
            .collect::<Result<Vec<_>, LoadError>>()?;

        Ok(Self {
            schema,
            estimators,
            coefficients: spec.final_estimator.coefficients,
            intercept: spec.final_estimator.intercept,
        })
    }
}

impl Predictor for StackingPredictor {
    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        ensure_schema(self.schema, features)?;
        let mut z = self.intercept;
        for ((name, estimator), weight) in self.estimators.iter().zip(&self.coefficients) {
            let p = estimator.predict_probability(features).map_err(|e| match e {
                PredictionError::SchemaMismatch { .. } => e,
                other => PredictionError::Invocation(format!("base estimator '{}': {}", name, other)),
            })?;
            z += weight * p;
        }
        checked_probability(sigmoid(z))
    }

    fn kind(&self) -> &str {
        "stacking"
    }
}
