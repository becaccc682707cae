//! Objective functions for scoring candidate splits.

use serde::{Deserialize, Serialize};

use crate::core::error::FactorError;
use crate::utils;

/// The score and regression statistics attained by one candidate split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeScore {
    /// The objective value; higher is better.
    pub score: f64,
    /// The fitted regression coefficient, for regression objectives.
    pub coefficient: Option<f64>,
    /// The F statistic, when the objective defines one.
    pub f_statistic: Option<f64>,
    /// The two-sided p-value of the F statistic, when defined.
    pub p_value: Option<f64>,
}

/// An objective used to score one candidate split from its per-sample
/// contrast values.
pub trait Objective: Send + Sync {
    /// Score a candidate split.
    ///
    /// # Arguments
    ///
    /// * `contrast`: the per-sample ILR contrast of the split.
    /// * `covariate`: the explanatory covariate, if the data carries one.
    ///
    /// # Errors
    ///
    /// * If the objective's requirements are not met, e.g. a missing
    ///   covariate.
    fn score(&self, contrast: &[f64], covariate: Option<&[f64]>) -> Result<EdgeScore, FactorError>;

    /// Whether this objective needs an explanatory covariate.
    fn requires_covariate(&self) -> bool {
        false
    }
}

/// Scores a split by the sum of squares explained when regressing its
/// contrast on the covariate. This is the default objective.
#[derive(Debug, Clone, Default)]
pub struct VarianceExplained;

impl Objective for VarianceExplained {
    fn score(&self, contrast: &[f64], covariate: Option<&[f64]>) -> Result<EdgeScore, FactorError> {
        let covariate = covariate.ok_or(FactorError::MissingCovariate)?;
        let reg = utils::simple_regression(covariate, contrast);
        Ok(EdgeScore {
            score: reg.explained,
            coefficient: Some(reg.slope),
            f_statistic: reg.f_statistic,
            p_value: reg.p_value,
        })
    }

    fn requires_covariate(&self) -> bool {
        true
    }
}

/// Scores a split by the population variance of its contrast, for runs
/// without an explanatory covariate.
#[derive(Debug, Clone, Default)]
pub struct ContrastVariance;

impl Objective for ContrastVariance {
    fn score(&self, contrast: &[f64], _covariate: Option<&[f64]>) -> Result<EdgeScore, FactorError> {
        let mean = utils::mean(contrast);
        Ok(EdgeScore {
            score: utils::variance(contrast, mean),
            coefficient: None,
            f_statistic: None,
            p_value: None,
        })
    }
}
