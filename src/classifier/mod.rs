// public modules
pub mod config;
pub mod core;

// private modules
mod setters;

pub use self::core::DecisionTreeClassifier;
