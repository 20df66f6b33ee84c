// Modules
pub mod classifier;
pub mod constants;
pub mod data;
pub mod errors;
pub mod metric;
pub mod node;
pub mod prune;
pub mod sampler;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use classifier::DecisionTreeClassifier;
pub use data::Matrix;
pub use tree::{predict, train, Tree};
