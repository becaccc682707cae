//! Isometric log-ratio contrasts and the balance basis over selected edges.

use serde::{Deserialize, Serialize};

use crate::core::{dataset, error::FactorError, TipData, Tree};

use super::Factor;

/// The ILR scaling constant `sqrt(r * s / (r + s))` for group sizes `r` and `s`.
pub(crate) fn ilr_scale(r: usize, s: usize) -> f64 {
    ((r * s) as f64 / (r + s) as f64).sqrt()
}

/// The per-sample ILR contrast between two tip groups.
///
/// `ln_data` holds the log-transformed measurements, one row per sample, in
/// tree tip order. The contrast is the scaled difference of mean log-values,
/// `ilr_scale * (mean over g1 - mean over g2)`.
pub(crate) fn split_contrast(ln_data: &[Vec<f64>], g1: &[usize], g2: &[usize]) -> Vec<f64> {
    let scale = ilr_scale(g1.len(), g2.len());
    ln_data
        .iter()
        .map(|row| {
            let m1 = g1.iter().map(|&t| row[t]).sum::<f64>() / g1.len() as f64;
            let m2 = g2.iter().map(|&t| row[t]).sum::<f64>() / g2.len() as f64;
            scale * (m1 - m2)
        })
        .collect()
}

/// The matrix of per-tip contrast weights across all selected edges.
///
/// Each row corresponds to one factor; projecting log-transformed data through
/// a row reproduces that factor's contrast values. Tips in the factor's first
/// group carry weight `scale / r`, tips in the second `-scale / s`, all others
/// zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceBasis {
    /// Tip labels, fixing the column order of `weights`.
    tip_labels: Vec<String>,
    /// One row of per-tip weights per factor.
    weights: Vec<Vec<f64>>,
}

impl BalanceBasis {
    /// Builds the basis for a sequence of factors over `tree`'s tips.
    pub(crate) fn from_factors(tree: &Tree, factors: &[Factor]) -> Self {
        let weights = factors
            .iter()
            .map(|factor| {
                let (r, s) = (factor.group1.len(), factor.group2.len());
                let scale = ilr_scale(r, s);
                let mut row = vec![0.0; tree.n_tips()];
                for &t in &factor.group1 {
                    row[t] = scale / r as f64;
                }
                for &t in &factor.group2 {
                    row[t] = -scale / s as f64;
                }
                row
            })
            .collect();
        Self {
            tip_labels: tree.tip_labels().to_vec(),
            weights,
        }
    }

    /// The number of factors (rows).
    #[must_use]
    pub fn n_factors(&self) -> usize {
        self.weights.len()
    }

    /// The number of tips (columns).
    #[must_use]
    pub fn n_tips(&self) -> usize {
        self.tip_labels.len()
    }

    /// The tip labels fixing the column order.
    #[must_use]
    pub fn tip_labels(&self) -> &[String] {
        &self.tip_labels
    }

    /// The per-factor weight rows.
    #[must_use]
    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    /// Projects a data matrix into ILR coordinates.
    ///
    /// Columns are matched to this basis by tip label; the data's own column
    /// order does not matter. Returns one row per factor, one column per
    /// sample.
    ///
    /// # Errors
    ///
    /// * [`FactorError::DataMismatch`] if the data's tip set differs from the
    ///   basis's.
    /// * [`FactorError::NonPositiveValue`] if any entry is not strictly
    ///   positive.
    pub fn project(&self, data: &TipData) -> Result<Vec<Vec<f64>>, FactorError> {
        let alignment = dataset::align_labels(&self.tip_labels, data)?;

        let mut ln_data = Vec::with_capacity(data.n_samples());
        for s in 0..data.n_samples() {
            let row = data.sample(s);
            let mut ln_row = Vec::with_capacity(alignment.len());
            for (t, &column) in alignment.iter().enumerate() {
                let v = row[column];
                if v <= 0.0 {
                    return Err(FactorError::NonPositiveValue {
                        tip: self.tip_labels[t].clone(),
                        sample: s,
                        value: v,
                    });
                }
                ln_row.push(v.ln());
            }
            ln_data.push(ln_row);
        }

        Ok(self
            .weights
            .iter()
            .map(|w| {
                ln_data
                    .iter()
                    .map(|ln_row| w.iter().zip(ln_row.iter()).map(|(a, b)| a * b).sum())
                    .collect()
            })
            .collect())
    }
}
