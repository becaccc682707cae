//! Tip-indexed compositional data.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{error::FactorError, tree::Tree};

/// The documented pseudocount for replacing zero counts ahead of log-ratio
/// work.
pub const DEFAULT_PSEUDOCOUNT: f64 = 0.65;

/// A matrix of per-sample measurements indexed by tip label.
///
/// Rows are samples, columns are tips in the order of `tip_labels`. The tip
/// set must match the tree's tip set identity-wise; column order is free and
/// reconciled by label at call time. Optionally carries one explanatory
/// covariate value per sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TipData {
    /// Column labels, one per tip.
    tip_labels: Vec<String>,
    /// One row per sample, one column per tip.
    samples: Vec<Vec<f64>>,
    /// Optional explanatory covariate, one value per sample.
    covariate: Option<Vec<f64>>,
    /// The name of the dataset.
    name: String,
}

impl TipData {
    /// Creates a new `TipData`.
    ///
    /// # Parameters
    ///
    /// - `tip_labels`: column labels, unique and non-empty.
    /// - `samples`: one row per sample; every row must have one value per tip.
    ///
    /// # Errors
    ///
    /// * If there are no tips or no samples.
    /// * If a row's length disagrees with the number of tips.
    /// * If tip labels are empty or duplicated.
    pub fn new(tip_labels: Vec<String>, samples: Vec<Vec<f64>>) -> Result<Self, FactorError> {
        if tip_labels.is_empty() {
            return Err(FactorError::InvalidData("no tip labels".to_string()));
        }
        if samples.is_empty() {
            return Err(FactorError::InvalidData("no samples".to_string()));
        }
        for (s, row) in samples.iter().enumerate() {
            if row.len() != tip_labels.len() {
                return Err(FactorError::InvalidData(format!(
                    "sample {s} has {} values for {} tips",
                    row.len(),
                    tip_labels.len()
                )));
            }
        }
        for (i, label) in tip_labels.iter().enumerate() {
            if label.is_empty() {
                return Err(FactorError::InvalidData(format!("tip {i} has an empty label")));
            }
            if tip_labels[..i].contains(label) {
                return Err(FactorError::InvalidData(format!("duplicate tip label {label:?}")));
            }
        }
        Ok(Self {
            tip_labels,
            samples,
            covariate: None,
            name: "Unknown TipData".to_string(),
        })
    }

    /// Attaches an explanatory covariate, one value per sample.
    ///
    /// # Errors
    ///
    /// * If the covariate length does not match the number of samples.
    pub fn with_covariate(mut self, covariate: Vec<f64>) -> Result<Self, FactorError> {
        if covariate.len() != self.samples.len() {
            return Err(FactorError::InvalidData(format!(
                "covariate has {} values for {} samples",
                covariate.len(),
                self.samples.len()
            )));
        }
        self.covariate = Some(covariate);
        Ok(self)
    }

    /// Changes the name of the dataset.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// The name of the dataset.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// The number of tips.
    #[must_use]
    pub fn n_tips(&self) -> usize {
        self.tip_labels.len()
    }

    /// The column labels.
    #[must_use]
    pub fn tip_labels(&self) -> &[String] {
        &self.tip_labels
    }

    /// One sample row, in this dataset's own column order.
    #[must_use]
    pub fn sample(&self, index: usize) -> &[f64] {
        &self.samples[index]
    }

    /// The covariate, if one was attached.
    #[must_use]
    pub fn covariate(&self) -> Option<&[f64]> {
        self.covariate.as_deref()
    }

    /// Returns a copy with every zero entry replaced by `pseudocount`.
    ///
    /// This is the caller-side preparation contract for log-ratio objectives;
    /// the documented convention value is [`DEFAULT_PSEUDOCOUNT`]. Negative
    /// entries are left untouched and will still fail positivity checks.
    #[must_use]
    pub fn zero_replaced(mut self, pseudocount: f64) -> Self {
        for row in &mut self.samples {
            for v in row.iter_mut() {
                if *v == 0.0 {
                    *v = pseudocount;
                }
            }
        }
        self
    }

    /// Maps each of the tree's tips to its column in this dataset.
    ///
    /// # Errors
    ///
    /// * [`FactorError::DataMismatch`] if the two tip sets differ, naming the
    ///   labels missing from either side.
    pub fn alignment(&self, tree: &Tree) -> Result<Vec<usize>, FactorError> {
        align_labels(tree.tip_labels(), self)
    }
}

/// Maps each label in `reference` to its column in `data`, requiring the two
/// label sets to match exactly.
pub(crate) fn align_labels(reference: &[String], data: &TipData) -> Result<Vec<usize>, FactorError> {
    let mut by_label: HashMap<&str, usize> = data
        .tip_labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect();

    let mut mapping = Vec::with_capacity(reference.len());
    let mut missing = Vec::new();
    for label in reference {
        match by_label.remove(label.as_str()) {
            Some(column) => mapping.push(column),
            None => missing.push(label.clone()),
        }
    }
    let mut extra = by_label.into_keys().map(String::from).collect::<Vec<_>>();
    extra.sort_unstable();

    if missing.is_empty() && extra.is_empty() {
        Ok(mapping)
    } else {
        Err(FactorError::DataMismatch(format!(
            "tips missing from data: {missing:?}; tips absent from reference: {extra:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn creation() -> Result<(), FactorError> {
        let data = TipData::new(labels(&["A", "B"]), vec![vec![1.0, 2.0], vec![3.0, 4.0]])?;
        assert_eq!(data.n_samples(), 2);
        assert_eq!(data.n_tips(), 2);
        assert_eq!(data.sample(1), &[3.0, 4.0]);
        assert!(data.covariate().is_none());

        let data = data.with_covariate(vec![0.0, 1.0])?.with_name("demo");
        assert_eq!(data.name(), "demo");
        assert_eq!(data.covariate(), Some([0.0, 1.0].as_slice()));
        Ok(())
    }

    #[test]
    fn rejects_ragged_rows() {
        assert!(matches!(
            TipData::new(labels(&["A", "B"]), vec![vec![1.0, 2.0], vec![3.0]]),
            Err(FactorError::InvalidData(_))
        ));
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            TipData::new(labels(&["A"]), vec![]),
            Err(FactorError::InvalidData(_))
        ));
        assert!(matches!(TipData::new(vec![], vec![]), Err(FactorError::InvalidData(_))));
    }

    #[test]
    fn rejects_duplicate_labels() {
        assert!(matches!(
            TipData::new(labels(&["A", "A"]), vec![vec![1.0, 2.0]]),
            Err(FactorError::InvalidData(_))
        ));
    }

    #[test]
    fn rejects_bad_covariate_length() {
        let data = TipData::new(labels(&["A", "B"]), vec![vec![1.0, 2.0]]).unwrap();
        assert!(matches!(
            data.with_covariate(vec![0.0, 1.0]),
            Err(FactorError::InvalidData(_))
        ));
    }

    #[test]
    fn zero_replacement() {
        let data = TipData::new(labels(&["A", "B"]), vec![vec![0.0, 2.0], vec![3.0, 0.0]])
            .unwrap()
            .zero_replaced(DEFAULT_PSEUDOCOUNT);
        assert_eq!(data.sample(0), &[DEFAULT_PSEUDOCOUNT, 2.0]);
        assert_eq!(data.sample(1), &[3.0, DEFAULT_PSEUDOCOUNT]);
    }

    #[test]
    fn alignment_is_order_independent() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:1);").unwrap();
        let data = TipData::new(labels(&["C", "A", "B"]), vec![vec![1.0, 2.0, 3.0]]).unwrap();
        // Tree tips A,B,C map to data columns 1,2,0.
        assert_eq!(data.alignment(&tree).unwrap(), vec![1, 2, 0]);
    }

    #[test]
    fn alignment_rejects_mismatched_tip_sets() {
        let tree = Tree::from_newick("((A:1,B:1):1,C:1);").unwrap();
        let data = TipData::new(labels(&["A", "B", "X"]), vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert!(matches!(data.alignment(&tree), Err(FactorError::DataMismatch(_))));
    }
}
