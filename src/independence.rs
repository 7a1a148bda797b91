//! Independence
//!
//! Pearson chi-square test of independence for 2x2 contingency tables.
use crate::constants::{DEFAULT_ALPHA, DEGREES_OF_FREEDOM, DENSITY_MIN_UPPER, YATES_MAX_ADJUSTMENT};
use crate::errors::BalanceError;
use crate::utils::{col_sums, row_sums, scale, table_sum, validate_float_parameter, validate_positive_float_parameter, Table2x2};
use log::debug;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, Continuous, ContinuousCDF};

/// Auxiliary verdict of comparing a p-value with alpha.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Significance {
    /// p-value <= alpha, the variables do not look independent.
    Reject,
    /// p-value > alpha.
    FailToReject,
}

/// Outcome of a chi-square test on one contingency table.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TestResult {
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
    /// Expected counts under independence.
    pub expected: Table2x2,
    /// Observed counts the statistic was computed from.
    pub observed: Table2x2,
    pub sample_size: f64,
    /// Whether the Yates continuity correction was applied.
    pub corrected: bool,
    pub alpha: f64,
    pub significance: Significance,
}

/// Runs chi-square tests of independence.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct IndependenceTester {
    /// Significance level used for the auxiliary verdict only.
    pub alpha: f64,
    /// Apply the Yates continuity correction.
    pub continuity_correction: bool,
}

impl Default for IndependenceTester {
    fn default() -> Self {
        IndependenceTester {
            alpha: DEFAULT_ALPHA,
            continuity_correction: false,
        }
    }
}

impl IndependenceTester {
    pub fn new(alpha: f64, continuity_correction: bool) -> Result<Self, BalanceError> {
        validate_float_parameter(alpha, 0.0, 1.0, "alpha")?;
        Ok(IndependenceTester {
            alpha,
            continuity_correction,
        })
    }

    /// Test a table of proportions scaled to `sample_size` individuals.
    ///
    /// * `table` - Cell proportions.
    /// * `sample_size` - Number of individuals the proportions refer to.
    pub fn test(&self, table: &Table2x2, sample_size: f64) -> Result<TestResult, BalanceError> {
        validate_positive_float_parameter(sample_size, "sample_size")?;
        let mut result = self.test_counts(&scale(table, sample_size))?;
        result.sample_size = sample_size;
        Ok(result)
    }

    /// Test a table of absolute counts.
    pub fn test_counts(&self, observed: &Table2x2) -> Result<TestResult, BalanceError> {
        if observed.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(BalanceError::InvalidParameter(
                "observed".to_string(),
                "nonnegative finite counts".to_string(),
                format!("{:?}", observed),
            ));
        }
        if !table_sum(observed).is_finite() {
            return Err(too_large(observed));
        }
        let expected = expected_counts(observed);
        if expected.iter().flatten().any(|e| *e == 0.0 || e.is_nan()) {
            return Err(BalanceError::DegenerateTable(format!("{:?}", expected)));
        }
        if expected.iter().flatten().any(|e| e.is_infinite()) {
            return Err(too_large(observed));
        }

        let adjustment = if self.continuity_correction {
            YATES_MAX_ADJUSTMENT
        } else {
            0.0
        };
        let statistic = chi2_statistic(observed, &expected, adjustment);
        if !statistic.is_finite() {
            return Err(too_large(observed));
        }
        let p_value = chi2_survival(statistic, DEGREES_OF_FREEDOM)?;
        let significance = if p_value <= self.alpha {
            Significance::Reject
        } else {
            Significance::FailToReject
        };
        debug!("Chi-square statistic {:.4}, p-value {:.4}", statistic, p_value);

        Ok(TestResult {
            statistic,
            dof: DEGREES_OF_FREEDOM,
            p_value,
            expected,
            observed: *observed,
            sample_size: table_sum(observed),
            corrected: self.continuity_correction,
            alpha: self.alpha,
            significance,
        })
    }
}

fn too_large(observed: &Table2x2) -> BalanceError {
    BalanceError::InvalidParameter(
        "observed".to_string(),
        "counts small enough for finite expected counts and statistic".to_string(),
        format!("{:?}", observed),
    )
}

/// Expected counts under independence, `row[i] * col[j] / total`.
///
/// Every cell is `NaN` when the table is empty.
pub fn expected_counts(observed: &Table2x2) -> Table2x2 {
    let rows = row_sums(observed);
    let cols = col_sums(observed);
    let total = table_sum(observed);
    let mut expected = [[0.0; 2]; 2];
    for i in 0..2 {
        for j in 0..2 {
            expected[i][j] = rows[i] * cols[j] / total;
        }
    }
    expected
}

/// Sum of `(|O - E| - c)^2 / E`, where `c = min(adjustment, |O - E|)`.
///
/// With an adjustment of 0 this is the plain Pearson statistic.
pub fn chi2_statistic(observed: &Table2x2, expected: &Table2x2, adjustment: f64) -> f64 {
    let mut chi2 = 0.0;
    for (o_row, e_row) in observed.iter().zip(expected.iter()) {
        for (o, e) in o_row.iter().zip(e_row.iter()) {
            let diff = (o - e).abs();
            let diff = diff - adjustment.min(diff);
            chi2 += diff * diff / e;
        }
    }
    chi2
}

/// p-value `1 - CDF(statistic)` of the chi-square distribution, computed as the
/// survival function so small tails do not cancel to zero.
pub fn chi2_survival(statistic: f64, dof: usize) -> Result<f64, BalanceError> {
    let dist = chi_squared(dof)?;
    if statistic <= 0.0 {
        return Ok(1.0);
    }
    Ok(dist.sf(statistic))
}

fn chi_squared(dof: usize) -> Result<ChiSquared, BalanceError> {
    ChiSquared::new(dof as f64).map_err(|e| {
        BalanceError::InvalidParameter("dof".to_string(), "positive degrees of freedom".to_string(), e.to_string())
    })
}

/// Chi-square density sampled for plotting next to a test result.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DensityCurve {
    pub x: Vec<f64>,
    pub density: Vec<f64>,
    pub statistic: f64,
    /// Probability mass beyond the statistic, equal to the p-value.
    pub tail_mass: f64,
}

/// Sample the chi-square density with `dof` degrees of freedom on
/// `(0, max(2 * statistic, 10)]`.
///
/// The grid excludes 0, where the density with one degree of freedom diverges.
pub fn density_curve(statistic: f64, dof: usize, points: usize) -> Result<DensityCurve, BalanceError> {
    validate_positive_float_parameter(statistic, "statistic")?;
    if points < 2 {
        return Err(BalanceError::InvalidParameter(
            "points".to_string(),
            "at least 2".to_string(),
            points.to_string(),
        ));
    }
    let dist = chi_squared(dof)?;
    let upper = (2.0 * statistic).max(DENSITY_MIN_UPPER);
    let x: Vec<f64> = (1..=points).map(|i| upper * i as f64 / points as f64).collect();
    let density = x.iter().map(|&v| dist.pdf(v)).collect();
    Ok(DensityCurve {
        x,
        density,
        statistic,
        tail_mass: chi2_survival(statistic, dof)?,
    })
}
