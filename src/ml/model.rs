use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analysis::FEATURE_NAMES;
use crate::flow::FlowKey;
use crate::ml::store::{self, ParameterStore};
use crate::ml::ModelError;

/// Probabilities strictly above this are labelled malicious
pub const MALICIOUS_THRESHOLD: f64 = 0.5;

/// Verdict for one flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Benign,
    Malicious,
}

impl Label {
    pub fn from_probability(probability: f64) -> Self {
        if probability > MALICIOUS_THRESHOLD {
            Label::Malicious
        } else {
            Label::Benign
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Label::Benign => write!(f, "benign"),
            Label::Malicious => write!(f, "malicious"),
        }
    }
}

/// Score of one flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub key: FlowKey,
    pub probability: f64,
    pub label: Label,
}

/// Logistic-regression parameters with per-feature standardization
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    weights: Vec<f64>,
    intercept: f64,
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Model {
    /// Build a model, checking that every per-feature list has the same length
    pub fn new(weights: Vec<f64>, intercept: f64, means: Vec<f64>, stds: Vec<f64>) -> Result<Self, ModelError> {
        if weights.is_empty() {
            return Err(ModelError::Config("weights must not be empty".to_string()));
        }
        let n = weights.len();
        for (name, values) in [(store::MEANS, &means), (store::STDS, &stds)] {
            if values.len() != n {
                return Err(ModelError::Config(format!(
                    "{} length {}, want {}",
                    name,
                    values.len(),
                    n
                )));
            }
        }

        Ok(Self {
            weights,
            intercept,
            means,
            stds,
        })
    }

    /// Load weights, intercept, means and standard deviations from `source`.
    ///
    /// When the store also lists feature names they must match the feature
    /// vector layout this crate produces.
    pub fn load(source: &impl ParameterStore) -> Result<Self, ModelError> {
        let weights = read_required(source, store::WEIGHTS)?;

        let intercept = read_required(source, store::INTERCEPT)?;
        if intercept.len() != 1 {
            return Err(ModelError::Config(format!(
                "{} must contain exactly one value, found {}",
                store::INTERCEPT,
                intercept.len()
            )));
        }

        let means = read_required(source, store::MEANS)?;
        let stds = read_required(source, store::STDS)?;
        let model = Self::new(weights, intercept[0], means, stds)?;

        if let Some(text) = source.read(store::FEATURES)? {
            let names = store::parse_names(&text);
            if names != FEATURE_NAMES {
                return Err(ModelError::Config(format!(
                    "{} lists {:?}, expected {:?}",
                    store::FEATURES,
                    names,
                    FEATURE_NAMES
                )));
            }
            debug!("Feature names match the trained model");
        }

        let constant = model.stds.iter().filter(|&&s| s == 0.0).count();
        info!(
            "Loaded model with {} features ({} constant, excluded from scoring)",
            model.dimension(),
            constant
        );
        Ok(model)
    }

    /// Number of features the model expects
    pub fn dimension(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// Probability that `features` belongs to the malicious class.
    ///
    /// Each feature is standardized with its training mean and deviation.
    /// Features whose deviation is exactly zero are left out of the sum.
    pub fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.weights.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }

        let mut z = self.intercept;
        for (i, &x) in features.iter().enumerate() {
            if self.stds[i] == 0.0 {
                continue;
            }
            let scaled = (x - self.means[i]) / self.stds[i];
            z += self.weights[i] * scaled;
        }

        Ok(sigmoid(z))
    }

    /// Score `features` and attach the verdict for `key`
    pub fn classify(&self, key: &FlowKey, features: &[f64]) -> Result<ClassificationResult, ModelError> {
        let probability = self.predict(features)?;
        Ok(ClassificationResult {
            key: key.clone(),
            probability,
            label: Label::from_probability(probability),
        })
    }
}

/// Standard logistic function
pub fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn read_required(source: &impl ParameterStore, resource: &str) -> Result<Vec<f64>, ModelError> {
    let text = source
        .read(resource)?
        .ok_or_else(|| ModelError::MissingResource(resource.to_string()))?;
    store::parse_values(resource, &text)
}
