pub mod predict;
pub mod tree;

pub use predict::predict;
pub use tree::{train, Tree};
