//! Criteria used to decide when a factorization should stop.

use crate::utils;

/// The KS uniformity test is skipped below this many candidate p-values.
const MIN_KS_CANDIDATES: usize = 3;

/// A criterion used to decide when a factorization should stop.
///
/// Count-based criteria are consulted before an iteration runs; score-based
/// criteria are consulted on the p-values of the iteration's candidate edges.
pub trait StopCriterion: Send + Sync {
    /// Check against the number of factors chosen so far.
    fn check_count(&self, n_factors: usize) -> bool {
        let _ = n_factors;
        false
    }

    /// Check against the p-values of the current candidate edges.
    fn check_scores(&self, p_values: &[f64]) -> bool {
        let _ = p_values;
        false
    }
}

/// Stop after a fixed number of factors.
#[derive(Debug, Clone)]
pub struct MaxFactors(usize);

impl StopCriterion for MaxFactors {
    fn check_count(&self, n_factors: usize) -> bool {
        n_factors >= self.0
    }
}

/// Stop when the candidate p-values are statistically indistinguishable from
/// Uniform(0,1), read as "no remaining edge carries a detectable signal".
///
/// Uses the Kolmogorov-Smirnov test; the run stops when the KS p-value is
/// strictly greater than the threshold. Skipped when fewer than 3 candidate
/// p-values exist.
#[derive(Debug, Clone)]
pub struct KsUniform {
    /// The significance threshold the KS p-value must exceed.
    threshold: f64,
}

impl StopCriterion for KsUniform {
    fn check_scores(&self, p_values: &[f64]) -> bool {
        if p_values.len() < MIN_KS_CANDIDATES {
            return false;
        }
        utils::ks_uniform_statistic(p_values)
            .is_some_and(|d| utils::ks_p_value(d, p_values.len()) > self.threshold)
    }
}

/// Whether the iteration that triggers a score-based criterion is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// Terminate without recording the triggering iteration.
    #[default]
    StopEarly,
    /// Record the triggering iteration, then terminate.
    IncludeLast,
}

/// A collection of criteria used to decide when a factorization should stop.
///
/// The run stops as soon as any one criterion triggers. An empty collection
/// never stops early; the run then ends only when the eligible-edge pool is
/// exhausted.
#[derive(Default)]
pub struct StopCriteria {
    /// The criteria; any one triggering stops the run.
    criteria: Vec<Box<dyn StopCriterion>>,
    /// Whether the triggering iteration of a score-based criterion is kept.
    mode: StopMode,
}

impl StopCriteria {
    /// Create a new, empty `StopCriteria`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the `MaxFactors` criterion.
    ///
    /// # Arguments
    ///
    /// * `threshold`: the number of factors after which the run stops.
    #[must_use]
    pub fn with_max_factors(mut self, threshold: usize) -> Self {
        self.criteria.push(Box::new(MaxFactors(threshold)));
        self
    }

    /// Add the `KsUniform` criterion.
    ///
    /// # Arguments
    ///
    /// * `threshold`: the significance threshold the KS p-value must strictly
    ///   exceed for the run to stop.
    #[must_use]
    pub fn with_ks_uniform(mut self, threshold: f64) -> Self {
        self.criteria.push(Box::new(KsUniform { threshold }));
        self
    }

    /// Add a custom criterion.
    #[must_use]
    pub fn with_custom(mut self, criterion: Box<dyn StopCriterion>) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Set whether the iteration that triggers a score-based criterion is
    /// recorded.
    #[must_use]
    pub const fn with_mode(mut self, mode: StopMode) -> Self {
        self.mode = mode;
        self
    }

    /// The configured stop mode.
    #[must_use]
    pub const fn mode(&self) -> StopMode {
        self.mode
    }

    /// Whether any count-based criterion stops a run with `n_factors` chosen.
    #[must_use]
    pub fn stop_on_count(&self, n_factors: usize) -> bool {
        self.criteria.iter().any(|c| c.check_count(n_factors))
    }

    /// Whether any score-based criterion stops a run given the candidate
    /// p-values of the current iteration.
    #[must_use]
    pub fn stop_on_scores(&self, p_values: &[f64]) -> bool {
        self.criteria.iter().any(|c| c.check_scores(p_values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_factors_is_exact() {
        let criteria = StopCriteria::new().with_max_factors(2);
        assert!(!criteria.stop_on_count(0));
        assert!(!criteria.stop_on_count(1));
        assert!(criteria.stop_on_count(2));
        assert!(criteria.stop_on_count(3));
    }

    #[test]
    fn empty_criteria_never_stop() {
        let criteria = StopCriteria::new();
        assert!(!criteria.stop_on_count(1_000));
        assert!(!criteria.stop_on_scores(&[0.5, 0.5, 0.5, 0.5]));
    }

    #[test]
    fn ks_needs_enough_candidates() {
        let criteria = StopCriteria::new().with_ks_uniform(0.0);
        assert!(!criteria.stop_on_scores(&[0.4, 0.6]));
        // With three or more, any positive KS p-value beats a zero threshold.
        assert!(criteria.stop_on_scores(&[0.2, 0.5, 0.8]));
    }

    #[test]
    fn ks_threshold_is_strict() {
        // A threshold of 1.0 can never be strictly exceeded.
        let criteria = StopCriteria::new().with_ks_uniform(1.0);
        assert!(!criteria.stop_on_scores(&[0.25, 0.5, 0.75]));
    }

    #[test]
    fn mode_defaults_to_stop_early() {
        assert_eq!(StopCriteria::new().mode(), StopMode::StopEarly);
        let criteria = StopCriteria::new().with_mode(StopMode::IncludeLast);
        assert_eq!(criteria.mode(), StopMode::IncludeLast);
    }
}
