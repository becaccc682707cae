#![doc = include_str!("../README.md")]

mod core;
pub mod factor;
pub mod utils;

pub use core::{dataset, error, tree, FactorError, TipData, Tree, DEFAULT_PSEUDOCOUNT};
pub use factor::{
    BalanceBasis, ContrastVariance, EdgeScore, Factor, Factorization, KsUniform, MaxFactors, Objective, StopCriteria,
    StopCriterion, StopMode, VarianceExplained,
};

/// The current version of the crate.
pub const VERSION: &str = "0.1.0";
