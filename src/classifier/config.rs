//! Classifier Configuration
//!
//! Defines the configuration structures and enums used by the
//! [`DecisionTreeClassifier`](crate::DecisionTreeClassifier).
use crate::constants::{DEFAULT_SEED, VALIDATION_FRACTION};
use crate::errors::DecisionTreeError;
use crate::metric::Metric;
use crate::utils::validate_float_parameter;
use serde::{Deserialize, Deserializer, Serialize};

/// How missing feature values are handled during training and prediction.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub enum MissingTreatment {
    /// Missing values are left out of split counts, and a missing value at
    /// prediction time stops at the node splitting on that feature.
    #[default]
    Exclude,
    /// Missing values are replaced by the most common training value of their column.
    ImputeMode,
}

/// Method to calculate variable importance.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum ImportanceMethod {
    /// The number of times a feature is used to split the data.
    Weight,
    /// The average gain ratio across all splits the feature is used in.
    Gain,
    /// The total gain ratio across all splits the feature is used in.
    TotalGain,
}

fn default_prune() -> bool {
    true
}
fn default_validation_fraction() -> f32 {
    VALIDATION_FRACTION
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}

pub(crate) fn parse_missing<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Deserialize::deserialize(d).map(|x: Option<_>| x.unwrap_or(f64::NAN))
}

/// Configuration for the `DecisionTreeClassifier`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Representation of missing values.
    #[serde(deserialize_with = "parse_missing", default = "f64_nan")]
    pub missing: f64,
    /// Strategy for missing values.
    #[serde(default)]
    pub missing_treatment: MissingTreatment,
    /// Whether to apply reduced error pruning after growing the tree.
    #[serde(default = "default_prune")]
    pub prune: bool,
    /// Share of the training rows held out for pruning when no validation set is given.
    #[serde(default = "default_validation_fraction")]
    pub validation_fraction: f32,
    /// Score compared while pruning.
    #[serde(default)]
    pub prune_metric: Metric,
    /// Seed for the holdout sampler.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Optional depth limit.
    #[serde(default)]
    pub max_depth: Option<usize>,
    /// Number of threads used for prediction.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

fn f64_nan() -> f64 {
    f64::NAN
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            missing: f64::NAN,
            missing_treatment: MissingTreatment::Exclude,
            prune: true,
            validation_fraction: VALIDATION_FRACTION,
            prune_metric: Metric::Accuracy,
            seed: DEFAULT_SEED,
            max_depth: None,
            num_threads: None,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<(), DecisionTreeError> {
        validate_float_parameter(self.validation_fraction as f64, 0.0, 1.0, "validation_fraction")?;
        if self.validation_fraction >= 1.0 {
            return Err(DecisionTreeError::InvalidParameter(
                "validation_fraction".to_string(),
                "a value below 1".to_string(),
                self.validation_fraction.to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(DecisionTreeError::InvalidParameter(
                "num_threads".to_string(),
                "a positive number of threads".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }

    /// Dump the configuration as a json object.
    pub fn json_dump(&self) -> Result<String, DecisionTreeError> {
        serde_json::to_string(self).map_err(|e| DecisionTreeError::UnableToWrite(e.to_string()))
    }

    /// Load a configuration from a json string, fields left out take their default.
    ///
    /// * `json_str` - String object, which can be serialized to json.
    pub fn from_json(json_str: &str) -> Result<Self, DecisionTreeError> {
        let cfg = serde_json::from_str::<Self>(json_str).map_err(|e| DecisionTreeError::UnableToRead(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
