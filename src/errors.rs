//! Errors
//!
//! Custom error types used throughout the `ratiotree` crate.
use thiserror::Error;

/// Errors that can occur while building, pruning or using a decision tree.
#[derive(Debug, Error)]
pub enum DecisionTreeError {
    /// Number of feature rows does not match the number of labels.
    #[error("Feature matrix has {0} rows, but {1} labels were provided.")]
    InputShape(usize, usize),
    /// The builder reached a split step without an eligible feature.
    #[error("No splittable feature was available for a node at depth {0}, but the node was not stopped.")]
    NoSplittableFeature(usize),
    /// There is no data to train on.
    #[error("Unable to fit a tree on an empty dataset.")]
    EmptyData,
    /// A feature value that is not a valid category encoding.
    #[error("Row {0}, column {1} holds {2}, which is not a valid category for that column.")]
    InvalidCategory(usize, usize, f64),
    /// A label value that is not a valid class encoding.
    #[error("Row {0} holds the label {1}, labels must be non-negative integers.")]
    InvalidLabel(usize, f64),
    /// Data passed for prediction does not have the width the tree was trained on.
    #[error("Expected {0} feature columns, but {1} were provided.")]
    FeatureCount(usize, usize),
    /// Prediction was requested before fitting.
    #[error("The classifier has not been fitted yet.")]
    NotFitted,
    /// Unable to serialize a configuration.
    #[error("Unable to write configuration: {0}")]
    UnableToWrite(String),
    /// Unable to read a configuration.
    #[error("Unable to read configuration: {0}")]
    UnableToRead(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
}
