//! The greedy edge partitioner.
//!
//! Each iteration scores every eligible edge by the configured objective,
//! selects the maximum, records it as a [`Factor`], and refines the bin the
//! edge lies in. Selected edges leave the pool permanently, so the partition
//! sequence strictly refines and the run ends within `n_tips - 1` iterations.

mod contrast;
mod criteria;
mod objective;
mod record;

use core::cmp::Ordering;

use mt_logger::{mt_log, Level};
use rayon::prelude::*;

use crate::core::{error::FactorError, TipData, Tree};
use crate::utils;

pub use contrast::BalanceBasis;
pub use criteria::{KsUniform, MaxFactors, StopCriteria, StopCriterion, StopMode};
pub use objective::{ContrastVariance, EdgeScore, Objective, VarianceExplained};
pub use record::{Factor, Factorization};

/// One scored candidate edge within an iteration.
struct Candidate {
    /// The candidate edge, identified by its child node index.
    edge: usize,
    /// Sorted tips on the edge's descendant side, within its bin.
    group1: Vec<usize>,
    /// Sorted tips of the rest of the bin.
    group2: Vec<usize>,
    /// The per-sample ILR contrast of the split.
    contrast: Vec<f64>,
    /// The objective's verdict.
    score: EdgeScore,
}

/// Bookkeeping for the bins and the eligible-edge pool.
///
/// Each unselected edge is tagged with the bin it currently lies in; refining
/// a bin re-tags the edges on the descendant side of the selected edge.
struct BinLedger {
    /// The current bins, each a sorted set of tip indices.
    bins: Vec<Vec<usize>>,
    /// The bin each edge currently lies in, indexed by node. The root's entry
    /// is unused.
    edge_bin: Vec<usize>,
    /// Whether an edge has been selected, indexed by node.
    selected: Vec<bool>,
}

impl BinLedger {
    fn new(tree: &Tree) -> Self {
        Self {
            bins: vec![(0..tree.n_tips()).collect()],
            edge_bin: vec![0; tree.n_nodes()],
            selected: vec![false; tree.n_nodes()],
        }
    }

    /// The two-group split an edge would induce within its bin, or `None` if
    /// the edge is no longer eligible.
    fn candidate_split(&self, tree: &Tree, edge: usize) -> Option<(Vec<usize>, Vec<usize>)> {
        if self.selected[edge] {
            return None;
        }
        let bin = &self.bins[self.edge_bin[edge]];
        if bin.len() < 2 {
            return None;
        }
        let group1 = utils::intersect_sorted(tree.descendant_tips(edge), bin);
        if group1.is_empty() || group1.len() == bin.len() {
            return None;
        }
        let group2 = utils::difference_sorted(bin, &group1);
        Some((group1, group2))
    }

    /// All eligible edges with their induced splits, in ascending edge order.
    fn candidates(&self, tree: &Tree) -> Vec<(usize, Vec<usize>, Vec<usize>)> {
        tree.edges()
            .filter_map(|edge| {
                self.candidate_split(tree, edge)
                    .map(|(g1, g2)| (edge, g1, g2))
            })
            .collect()
    }

    /// Splits the selected edge's bin into `group1` and `group2` and re-tags
    /// the remaining edges on the descendant side.
    fn refine(&mut self, tree: &Tree, edge: usize, group1: &[usize], group2: &[usize]) -> Result<(), FactorError> {
        if group1.is_empty() || group2.is_empty() {
            return Err(FactorError::DegenerateGroup { edge });
        }
        let bin = self.edge_bin[edge];
        let descendant_bin = self.bins.len();
        self.bins[bin] = group2.to_vec();
        self.bins.push(group1.to_vec());
        self.selected[edge] = true;
        for other in tree.edges() {
            if !self.selected[other] && self.edge_bin[other] == bin && tree.is_strict_descendant(other, edge) {
                self.edge_bin[other] = descendant_bin;
            }
        }
        Ok(())
    }
}

/// Orders two candidates by score, with NaN below everything and ties broken
/// towards the lower edge index. The maximum under this order is unique.
fn prefer(a: &Candidate, b: &Candidate) -> Ordering {
    let by_score = match (a.score.score.is_nan(), b.score.score.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.score.score.partial_cmp(&b.score.score).unwrap_or(Ordering::Equal),
    };
    by_score.then_with(|| b.edge.cmp(&a.edge))
}

/// Validates the inputs and precomputes the log-transformed data matrix in
/// tree tip order.
fn prepare(tree: &Tree, data: &TipData, objective: &dyn Objective) -> Result<Vec<Vec<f64>>, FactorError> {
    if !tree.is_binary() {
        return Err(FactorError::InvalidTree(
            "factorization requires a strictly bifurcating tree".to_string(),
        ));
    }
    if objective.requires_covariate() && data.covariate().is_none() {
        return Err(FactorError::MissingCovariate);
    }

    let alignment = data.alignment(tree)?;
    let mut ln_data = Vec::with_capacity(data.n_samples());
    for s in 0..data.n_samples() {
        let row = data.sample(s);
        let mut ln_row = Vec::with_capacity(tree.n_tips());
        for (t, &column) in alignment.iter().enumerate() {
            let v = row[column];
            if v <= 0.0 {
                return Err(FactorError::NonPositiveValue {
                    tip: tree.tip_label(t).to_string(),
                    sample: s,
                    value: v,
                });
            }
            ln_row.push(v.ln());
        }
        ln_data.push(ln_row);
    }
    Ok(ln_data)
}

/// Scores one candidate split.
fn score_candidate(
    edge: usize,
    group1: Vec<usize>,
    group2: Vec<usize>,
    ln_data: &[Vec<f64>],
    covariate: Option<&[f64]>,
    objective: &dyn Objective,
) -> Result<Candidate, FactorError> {
    let contrast = contrast::split_contrast(ln_data, &group1, &group2);
    let score = objective.score(&contrast, covariate)?;
    Ok(Candidate {
        edge,
        group1,
        group2,
        contrast,
        score,
    })
}

/// Turns the winning candidate into its partition record.
fn into_factor(candidate: Candidate) -> Factor {
    Factor {
        edge: candidate.edge,
        group1: candidate.group1,
        group2: candidate.group2,
        contrast: candidate.contrast,
        score: candidate.score.score,
        coefficient: candidate.score.coefficient,
        f_statistic: candidate.score.f_statistic,
        p_value: candidate.score.p_value,
    }
}

impl Factorization {
    /// Runs the greedy factorization.
    ///
    /// # Arguments
    ///
    /// - `tree`: the tree to partition; must be strictly bifurcating.
    /// - `data`: the tip-indexed data matrix; its tip set must equal the
    ///   tree's, and every value must be strictly positive.
    /// - `objective`: the scoring objective.
    /// - `criteria`: the stopping configuration.
    ///
    /// # Returns
    ///
    /// The ordered factor sequence, the final bins, and the balance basis.
    ///
    /// # Errors
    ///
    /// * [`FactorError::InvalidTree`] if the tree contains a polytomy.
    /// * [`FactorError::DataMismatch`] if the tip sets differ.
    /// * [`FactorError::NonPositiveValue`] if the data is not strictly
    ///   positive.
    /// * [`FactorError::MissingCovariate`] if the objective needs a covariate
    ///   the data does not carry.
    pub fn new(
        tree: &Tree,
        data: &TipData,
        objective: &dyn Objective,
        criteria: &StopCriteria,
    ) -> Result<Self, FactorError> {
        let ln_data = prepare(tree, data, objective)?;
        let covariate = data.covariate();

        let mut ledger = BinLedger::new(tree);
        let mut factors = Vec::new();
        loop {
            if criteria.stop_on_count(factors.len()) {
                break;
            }
            let splits = ledger.candidates(tree);
            if splits.is_empty() {
                break;
            }
            let scored = splits
                .into_iter()
                .map(|(edge, g1, g2)| score_candidate(edge, g1, g2, &ln_data, covariate, objective))
                .collect::<Result<Vec<_>, _>>()?;

            let p_values = scored.iter().filter_map(|c| c.score.p_value).collect::<Vec<_>>();
            let triggered = criteria.stop_on_scores(&p_values);
            if triggered && criteria.mode() == StopMode::StopEarly {
                break;
            }

            let best = scored
                .into_iter()
                .max_by(prefer)
                .unwrap_or_else(|| unreachable!("candidates are non-empty"));
            mt_log!(
                Level::Info,
                "factor {}: edge {} splits {} | {} tips with score {:.6}",
                factors.len() + 1,
                best.edge,
                best.group1.len(),
                best.group2.len(),
                best.score.score
            );
            ledger.refine(tree, best.edge, &best.group1, &best.group2)?;
            factors.push(into_factor(best));

            if triggered {
                break;
            }
        }

        let basis = BalanceBasis::from_factors(tree, &factors);
        Ok(Self {
            tip_labels: tree.tip_labels().to_vec(),
            factors,
            bins: ledger.bins,
            basis,
        })
    }

    /// Parallelized version of the [`new`](Self::new) method.
    ///
    /// Candidate edges are scored across the rayon thread pool; the selection
    /// itself is a deterministic max-by-score reduction, so the result is
    /// identical to the sequential run.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn par_new(
        tree: &Tree,
        data: &TipData,
        objective: &dyn Objective,
        criteria: &StopCriteria,
    ) -> Result<Self, FactorError> {
        let ln_data = prepare(tree, data, objective)?;
        let covariate = data.covariate();

        let mut ledger = BinLedger::new(tree);
        let mut factors = Vec::new();
        loop {
            if criteria.stop_on_count(factors.len()) {
                break;
            }
            let splits = ledger.candidates(tree);
            if splits.is_empty() {
                break;
            }
            let scored = splits
                .into_par_iter()
                .map(|(edge, g1, g2)| score_candidate(edge, g1, g2, &ln_data, covariate, objective))
                .collect::<Result<Vec<_>, _>>()?;

            let p_values = scored.iter().filter_map(|c| c.score.p_value).collect::<Vec<_>>();
            let triggered = criteria.stop_on_scores(&p_values);
            if triggered && criteria.mode() == StopMode::StopEarly {
                break;
            }

            let best = scored
                .into_iter()
                .max_by(prefer)
                .unwrap_or_else(|| unreachable!("candidates are non-empty"));
            mt_log!(
                Level::Info,
                "factor {}: edge {} splits {} | {} tips with score {:.6}",
                factors.len() + 1,
                best.edge,
                best.group1.len(),
                best.group2.len(),
                best.score.score
            );
            ledger.refine(tree, best.edge, &best.group1, &best.group2)?;
            factors.push(into_factor(best));

            if triggered {
                break;
            }
        }

        let basis = BalanceBasis::from_factors(tree, &factors);
        Ok(Self {
            tip_labels: tree.tip_labels().to_vec(),
            factors,
            bins: ledger.bins,
            basis,
        })
    }
}
