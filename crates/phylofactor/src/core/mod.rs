//! Core data structures: the tree, the tip-indexed data matrix, and the error taxonomy.

pub mod dataset;
pub mod error;
pub mod tree;

pub use dataset::{TipData, DEFAULT_PSEUDOCOUNT};
pub use error::FactorError;
pub use tree::Tree;
