//! Errors surfaced by tree construction, data preparation, and factorization.

use thiserror::Error;

/// Errors returned by tree construction, data preparation, and factorization.
///
/// All of these are non-recoverable for the current call: the operation aborts
/// and surfaces the error rather than skipping an edge or substituting a
/// default. The algorithm is deterministic given its inputs, so there is no
/// retry policy.
#[derive(Error, Debug)]
pub enum FactorError {
    /// The tree is malformed: cyclic, disconnected, multiply rooted, or (where
    /// strict bifurcation is required) contains a polytomy.
    #[error("invalid tree: {0}")]
    InvalidTree(String),

    /// A Newick string could not be parsed.
    #[error("newick parse error at byte {position}: {reason}")]
    NewickParse {
        /// Byte offset into the Newick string where parsing failed.
        position: usize,
        /// What went wrong.
        reason: String,
    },

    /// The data matrix's tip set does not match the tree's tip set.
    #[error("tip-set mismatch between tree and data: {0}")]
    DataMismatch(String),

    /// A selected split produced an empty group. Unreachable for well-formed
    /// trees.
    #[error("edge {edge} produced a degenerate (empty) group")]
    DegenerateGroup {
        /// The edge whose split degenerated.
        edge: usize,
    },

    /// A log-ratio contrast was requested on data containing a non-positive
    /// value. Zeros must be replaced with a pseudocount first; see
    /// [`TipData::zero_replaced`](crate::TipData::zero_replaced).
    #[error("non-positive value {value} for tip {tip:?} in sample {sample}")]
    NonPositiveValue {
        /// Label of the offending tip.
        tip: String,
        /// Index of the offending sample.
        sample: usize,
        /// The value found.
        value: f64,
    },

    /// The data matrix itself is malformed: empty, ragged rows, duplicate tip
    /// labels, or a covariate of the wrong length.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The chosen objective needs an explanatory covariate but the data
    /// carries none.
    #[error("the objective requires a covariate but the data carries none")]
    MissingCovariate,
}
