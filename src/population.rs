//! Population
//!
//! The 2x2 joint distribution of two binary variables `A` and `B`, together with
//! the marginal and conditional probabilities derived from it.
use crate::constants::DEFAULT_TOLERANCE;
use crate::errors::BalanceError;
use crate::utils::{items_to_strings, table_sum, transpose, validate_float_parameter, validate_probability, Table2x2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the two binary variables of the population.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    A,
    B,
}

impl Variable {
    /// The variable that is not `self`.
    pub fn other(&self) -> Variable {
        match self {
            Variable::A => Variable::B,
            Variable::B => Variable::A,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::A => write!(f, "A"),
            Variable::B => write!(f, "B"),
        }
    }
}

impl FromStr for Variable {
    type Err = BalanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Variable::A),
            "B" | "b" => Ok(Variable::B),
            _ => Err(BalanceError::ParseString(
                s.to_string(),
                "Variable".to_string(),
                items_to_strings(vec!["A", "B"]),
            )),
        }
    }
}

/// Level of a binary variable.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Yes,
    No,
}

impl Level {
    pub const BOTH: [Level; 2] = [Level::Yes, Level::No];

    /// Row or column index of this level in a [`Table2x2`].
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Level::Yes => 0,
            Level::No => 1,
        }
    }

    pub fn complement(&self) -> Level {
        match self {
            Level::Yes => Level::No,
            Level::No => Level::Yes,
        }
    }
}

/// How raw cell weights that do not sum to one are treated.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizationPolicy {
    /// Divide every cell by the total.
    #[default]
    Normalize,
    /// Only accept weights that already form a distribution.
    Reject,
}

/// Joint distribution over `A` (rows) and `B` (columns).
///
/// Cells are `[[p(A,B), p(A,¬B)], [p(¬A,B), p(¬A,¬B)]]`. A value of this type
/// always holds four nonnegative proportions summing to one within the
/// tolerance it was built with.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct JointDistribution {
    cells: Table2x2,
}

impl JointDistribution {
    /// Build from the four joint proportions.
    ///
    /// * `p_ab` - p(A,B).
    /// * `p_a_not_b` - p(A,¬B).
    /// * `p_not_a_b` - p(¬A,B).
    /// * `p_not_a_not_b` - p(¬A,¬B).
    /// * `tolerance` - Allowed distance of the sum from one.
    pub fn new(
        p_ab: f64,
        p_a_not_b: f64,
        p_not_a_b: f64,
        p_not_a_not_b: f64,
        tolerance: f64,
    ) -> Result<Self, BalanceError> {
        Self::from_table([[p_ab, p_a_not_b], [p_not_a_b, p_not_a_not_b]], tolerance)
    }

    /// Build from a table laid out as `[[p(A,B), p(A,¬B)], [p(¬A,B), p(¬A,¬B)]]`.
    pub fn from_table(cells: Table2x2, tolerance: f64) -> Result<Self, BalanceError> {
        validate_float_parameter(tolerance, 0.0, 1.0, "tolerance")?;
        check_cells(&cells)?;
        let total = table_sum(&cells);
        if (total - 1.0).abs() > tolerance {
            return Err(BalanceError::InvalidDistribution(format!(
                "proportions sum to {}, expected 1 within {}",
                total, tolerance
            )));
        }
        Ok(JointDistribution { cells })
    }

    /// Build from the marginal of `A` and the conditional of `B` on each level of `A`.
    ///
    /// * `p_a` - p(A).
    /// * `p_b_given_a` - p(B|A).
    /// * `p_b_given_not_a` - p(B|¬A).
    pub fn from_marginals(p_a: f64, p_b_given_a: f64, p_b_given_not_a: f64) -> Result<Self, BalanceError> {
        for (value, name) in [(p_a, "p(A)"), (p_b_given_a, "p(B|A)"), (p_b_given_not_a, "p(B|¬A)")] {
            validate_probability(value, name)
                .map_err(|_| BalanceError::InvalidDistribution(format!("{} is {}, expected a probability", name, value)))?;
        }
        let p_not_a = 1.0 - p_a;
        let cells = [
            [p_a * p_b_given_a, p_a * (1.0 - p_b_given_a)],
            [p_not_a * p_b_given_not_a, p_not_a * (1.0 - p_b_given_not_a)],
        ];
        Self::from_table(cells, DEFAULT_TOLERANCE)
    }

    /// Build from nonnegative cell weights, for instance raw counts or free
    /// sliders that are not tied together.
    pub fn from_counts(counts: Table2x2, policy: NormalizationPolicy, tolerance: f64) -> Result<Self, BalanceError> {
        check_cells(&counts)?;
        match policy {
            NormalizationPolicy::Reject => Self::from_table(counts, tolerance),
            NormalizationPolicy::Normalize => {
                let total = table_sum(&counts);
                if total <= 0.0 {
                    return Err(BalanceError::InvalidDistribution(
                        "cell weights sum to 0, nothing to normalize".to_string(),
                    ));
                }
                Self::from_table(counts.map(|row| row.map(|v| v / total)), tolerance)
            }
        }
    }

    /// Joint proportions, rows indexed by `A`, columns by `B`.
    pub fn table(&self) -> Table2x2 {
        self.cells
    }

    /// Joint proportions with rows indexed by `rows` and columns by the other variable.
    pub fn oriented(&self, rows: Variable) -> Table2x2 {
        match rows {
            Variable::A => self.cells,
            Variable::B => transpose(&self.cells),
        }
    }

    /// p(A=a, B=b).
    pub fn joint(&self, a: Level, b: Level) -> f64 {
        self.cells[a.index()][b.index()]
    }

    /// Marginal probability of `variable` taking `level`.
    pub fn marginal(&self, variable: Variable, level: Level) -> f64 {
        let row = self.oriented(variable)[level.index()];
        row[0] + row[1]
    }

    /// p(target=target_level | other=given), where `other` is the variable
    /// that is not `target`.
    pub fn conditional(&self, target: Variable, target_level: Level, given: Level) -> Result<f64, BalanceError> {
        let given_var = target.other();
        let denominator = self.marginal(given_var, given);
        if denominator == 0.0 {
            return Err(BalanceError::UndefinedConditional(format!(
                "{}={:?}",
                given_var, given
            )));
        }
        let table = self.oriented(given_var);
        Ok(table[given.index()][target_level.index()] / denominator)
    }

    /// Both conditionals of `target`'s levels given each level of the other
    /// variable, rows indexed by the conditioning level.
    pub fn conditional_table(&self, target: Variable) -> Result<Table2x2, BalanceError> {
        let mut out = [[0.0; 2]; 2];
        for given in Level::BOTH {
            for level in Level::BOTH {
                out[given.index()][level.index()] = self.conditional(target, level, given)?;
            }
        }
        Ok(out)
    }

    /// (p(A,B) p(¬A,¬B)) / (p(A,¬B) p(¬A,B)).
    ///
    /// Infinite when only the denominator vanishes and `NaN` when both do.
    pub fn odds_ratio(&self) -> f64 {
        odds_ratio(&self.cells)
    }
}

/// Odds ratio of any 2x2 table. It is unchanged by scaling rows or columns.
pub fn odds_ratio(table: &Table2x2) -> f64 {
    (table[0][0] * table[1][1]) / (table[0][1] * table[1][0])
}

fn check_cells(cells: &Table2x2) -> Result<(), BalanceError> {
    if let Some(bad) = cells.iter().flatten().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(BalanceError::InvalidDistribution(format!(
            "cell value {} is not a nonnegative finite number",
            bad
        )));
    }
    Ok(())
}
