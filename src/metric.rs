use crate::errors::DecisionTreeError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type MetricFn = fn(&[f64], &[f64]) -> f64;

/// Score used to judge a tree against held out rows. Every metric lies in
/// `[0, 1]`, greater is better, and is `NaN` when there are no rows.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    #[default]
    Accuracy,
    BalancedAccuracy,
}

impl FromStr for Metric {
    type Err = DecisionTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Accuracy" => Ok(Metric::Accuracy),
            "BalancedAccuracy" => Ok(Metric::BalancedAccuracy),

            _ => Err(DecisionTreeError::ParseString(
                s.to_string(),
                "Metric".to_string(),
                items_to_strings(vec!["Accuracy", "BalancedAccuracy"]),
            )),
        }
    }
}

pub fn metric_callables(metric_type: &Metric) -> MetricFn {
    match metric_type {
        Metric::Accuracy => AccuracyMetric::calculate_metric,
        Metric::BalancedAccuracy => BalancedAccuracyMetric::calculate_metric,
    }
}

impl Metric {
    pub fn calculate(&self, y: &[f64], yhat: &[f64]) -> f64 {
        metric_callables(self)(y, yhat)
    }
}

pub trait EvaluationMetric {
    fn calculate_metric(y: &[f64], yhat: &[f64]) -> f64;
}

pub struct AccuracyMetric {}
impl EvaluationMetric for AccuracyMetric {
    fn calculate_metric(y: &[f64], yhat: &[f64]) -> f64 {
        accuracy(y, yhat)
    }
}

pub struct BalancedAccuracyMetric {}
impl EvaluationMetric for BalancedAccuracyMetric {
    fn calculate_metric(y: &[f64], yhat: &[f64]) -> f64 {
        balanced_accuracy(y, yhat)
    }
}

/// Share of rows whose predicted class equals the true class.
pub fn accuracy(y: &[f64], yhat: &[f64]) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    let correct = y.iter().zip(yhat).filter(|(y_, yhat_)| y_ == yhat_).count();
    correct as f64 / y.len() as f64
}

/// Mean over the classes present in `y` of the share of that class predicted correctly.
pub fn balanced_accuracy(y: &[f64], yhat: &[f64]) -> f64 {
    if y.is_empty() {
        return f64::NAN;
    }
    let mut classes: Vec<(f64, usize, usize)> = Vec::new();
    for (y_, yhat_) in y.iter().zip(yhat) {
        let hit = usize::from(y_ == yhat_);
        match classes.iter_mut().find(|(c, _, _)| c == y_) {
            Some((_, n, correct)) => {
                *n += 1;
                *correct += hit;
            }
            None => classes.push((*y_, 1, hit)),
        }
    }
    classes.iter().map(|(_, n, correct)| *correct as f64 / *n as f64).sum::<f64>() / classes.len() as f64
}
