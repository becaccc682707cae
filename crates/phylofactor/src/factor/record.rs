//! Result types produced by a factorization run.

use serde::{Deserialize, Serialize};

use super::BalanceBasis;

/// One iteration's output: the selected edge, the two tip groups it
/// separates, and the score and statistics it attained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    /// The selected edge, identified by its child node index.
    pub edge: usize,
    /// The sorted tip indices on the edge's descendant side.
    pub group1: Vec<usize>,
    /// The sorted tip indices of the rest of the bin that was split.
    pub group2: Vec<usize>,
    /// The per-sample ILR contrast between the two groups.
    pub contrast: Vec<f64>,
    /// The objective score attained.
    pub score: f64,
    /// The fitted regression coefficient, for regression objectives.
    pub coefficient: Option<f64>,
    /// The F statistic, when the objective defines one.
    pub f_statistic: Option<f64>,
    /// The two-sided p-value of the F statistic, when defined.
    pub p_value: Option<f64>,
}

/// The full output of a factorization run: the ordered factor sequence, the
/// final bins, and the balance basis for downstream projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factorization {
    /// Tip labels, indexed by tree tip.
    pub(crate) tip_labels: Vec<String>,
    /// The ordered sequence of selected factors.
    pub(crate) factors: Vec<Factor>,
    /// The final bins; always a partition of the full tip set.
    pub(crate) bins: Vec<Vec<usize>>,
    /// Per-tip contrast weights for each selected edge.
    pub(crate) basis: BalanceBasis,
}

impl Factorization {
    /// The ordered sequence of selected factors.
    #[must_use]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// The number of factors selected.
    #[must_use]
    pub fn n_factors(&self) -> usize {
        self.factors.len()
    }

    /// The final bins, each a sorted set of tip indices. With `k` factors
    /// there are `k + 1` bins, together covering every tip exactly once.
    #[must_use]
    pub fn bins(&self) -> &[Vec<usize>] {
        &self.bins
    }

    /// The balance basis over the selected edges.
    #[must_use]
    pub fn basis(&self) -> &BalanceBasis {
        &self.basis
    }

    /// Tip labels, indexed by tree tip.
    #[must_use]
    pub fn tip_labels(&self) -> &[String] {
        &self.tip_labels
    }

    /// The labels of a set of tip indices.
    #[must_use]
    pub fn labels_of(&self, tips: &[usize]) -> Vec<&str> {
        tips.iter().map(|&t| self.tip_labels[t].as_str()).collect()
    }

    /// The final bins as label sets.
    #[must_use]
    pub fn bin_labels(&self) -> Vec<Vec<&str>> {
        self.bins.iter().map(|bin| self.labels_of(bin)).collect()
    }
}
