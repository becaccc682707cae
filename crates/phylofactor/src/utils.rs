//! Numeric helpers shared across the crate.

use core::cmp::Ordering;

use statrs::distribution::{ContinuousCDF, FisherSnedecor};

/// Return the mean value of the given slice of values.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Return the population variance of the given slice of values.
pub fn variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| v - mean).map(|v| v * v).sum::<f64>() / values.len() as f64
}

/// Summary of a simple linear regression of `y` on `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionSummary {
    /// The fitted slope.
    pub slope: f64,
    /// The explained sum of squares.
    pub explained: f64,
    /// The residual sum of squares.
    pub residual: f64,
    /// The F statistic on (1, n-2) degrees of freedom, when defined.
    pub f_statistic: Option<f64>,
    /// The upper-tail p-value of the F statistic, when defined.
    pub p_value: Option<f64>,
}

/// Fit a simple linear regression of `y` on `x` and summarize the variance
/// decomposition.
///
/// A constant `x` carries no signal: the summary reports a zero slope, zero
/// explained sum of squares, and no F statistic. A constant `y` likewise
/// yields no F statistic. With fewer than 3 observations the residual degrees
/// of freedom vanish and the F statistic is undefined. A numerically perfect
/// fit reports an infinite F statistic and a zero p-value.
///
/// # Arguments
///
/// * `x` - The explanatory values.
/// * `y` - The response values. Must have the same length as `x`.
pub fn simple_regression(x: &[f64], y: &[f64]) -> RegressionSummary {
    debug_assert_eq!(x.len(), y.len());

    let x_bar = mean(x);
    let y_bar = mean(y);
    let (mut s_xx, mut s_xy, mut s_yy) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_bar;
        let dy = yi - y_bar;
        s_xx += dx * dx;
        s_xy += dx * dy;
        s_yy += dy * dy;
    }

    if s_xx <= f64::EPSILON || s_yy <= f64::EPSILON {
        return RegressionSummary {
            slope: 0.0,
            explained: 0.0,
            residual: s_yy,
            f_statistic: None,
            p_value: None,
        };
    }

    let slope = s_xy / s_xx;
    let explained = s_xy * s_xy / s_xx;
    let residual = (s_yy - explained).max(0.0);

    let df = x.len().saturating_sub(2);
    let (f_statistic, p_value) = if df == 0 {
        (None, None)
    } else if residual <= s_yy * 1e-12 {
        (Some(f64::INFINITY), Some(0.0))
    } else {
        let f = explained / (residual / df as f64);
        (Some(f), Some(f_test_p_value(f, 1.0, df as f64)))
    };

    RegressionSummary {
        slope,
        explained,
        residual,
        f_statistic,
        p_value,
    }
}

/// Upper-tail p-value of an F statistic on `(df1, df2)` degrees of freedom.
pub fn f_test_p_value(f: f64, df1: f64, df2: f64) -> f64 {
    FisherSnedecor::new(df1, df2).map_or(f64::NAN, |dist| 1.0 - dist.cdf(f))
}

/// Two-sided Kolmogorov-Smirnov statistic of `values` against Uniform(0,1).
///
/// Values are clamped into `[0, 1]` before comparison. Returns `None` for an
/// empty slice.
pub fn ks_uniform_statistic(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.iter().map(|v| v.clamp(0.0, 1.0)).collect::<Vec<_>>();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = sorted.len() as f64;
    let mut d = 0.0_f64;
    for (i, v) in sorted.into_iter().enumerate() {
        let above = (i + 1) as f64 / n - v;
        let below = v - i as f64 / n;
        d = d.max(above).max(below);
    }
    Some(d)
}

/// Asymptotic two-sided p-value for a Kolmogorov-Smirnov statistic `d` on `n`
/// observations, via the Kolmogorov tail series with the small-sample
/// correction `(sqrt(n) + 0.12 + 0.11 / sqrt(n)) * d`.
pub fn ks_p_value(d: f64, n: usize) -> f64 {
    let sqrt_n = (n as f64).sqrt();
    kolmogorov_tail((sqrt_n + 0.12 + 0.11 / sqrt_n) * d)
}

/// The Kolmogorov distribution tail `Q(lambda) = 2 sum (-1)^(k-1) exp(-2 k^2 lambda^2)`.
fn kolmogorov_tail(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 1..=100 {
        let k = k as f64;
        let term = (-2.0 * k * k * lambda * lambda).exp();
        sum += sign * term;
        if term < 1e-12 {
            break;
        }
        sign = -sign;
    }
    (2.0 * sum).clamp(0.0, 1.0)
}

/// Intersection of two sorted index slices.
pub(crate) fn intersect_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Elements of sorted `a` not present in sorted `b`.
pub(crate) fn difference_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut j = 0;
    for &v in a {
        while j < b.len() && b[j] < v {
            j += 1;
        }
        if j >= b.len() || b[j] != v {
            out.push(v);
        }
    }
    out
}
