//! Sampler
//!
//! Construction of the largest sample in which both levels of one variable are
//! equally represented. All members of the rarer level are kept and a random
//! subset of matching size is drawn from the more frequent level.
use crate::constants::MAX_DRAW_POPULATION;
use crate::errors::BalanceError;
use crate::population::{JointDistribution, Level, Variable};
use crate::utils::{validate_positive_float_parameter, Table2x2};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

/// Expected composition of a maximal balanced sample.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct BalancedSample {
    /// Variable whose two levels each make up half of the sample.
    pub balance_on: Variable,
    /// Proportions, rows indexed by `balance_on`, columns by the other variable.
    pub table: Table2x2,
    /// Share of the population that ends up in the sample, `2 min(m1, m2)`.
    pub proportion: f64,
    /// Absolute sample size, `proportion * total_population_size`.
    pub sample_size: f64,
}

/// Build the maximal sample balanced on `balance_on`.
///
/// * `model` - Population the sample is drawn from.
/// * `balance_on` - Variable to balance.
/// * `total_population_size` - Number of individuals in the population.
pub fn build_balanced(
    model: &JointDistribution,
    balance_on: Variable,
    total_population_size: f64,
) -> Result<BalancedSample, BalanceError> {
    validate_positive_float_parameter(total_population_size, "total_population_size")?;
    let m_yes = model.marginal(balance_on, Level::Yes);
    let m_no = model.marginal(balance_on, Level::No);
    if m_yes == 0.0 || m_no == 0.0 {
        return Err(BalanceError::EmptyBalancedSample(balance_on.to_string()));
    }

    let other = balance_on.other();
    let mut table = [[0.0; 2]; 2];
    for level in Level::BOTH {
        for other_level in Level::BOTH {
            table[level.index()][other_level.index()] = 0.5 * model.conditional(other, other_level, level)?;
        }
    }

    let proportion = 2.0 * m_yes.min(m_no);
    let sample_size = proportion * total_population_size;
    debug!(
        "Balanced on {}: proportion {:.4}, sample size {:.2}",
        balance_on, proportion, sample_size
    );
    Ok(BalancedSample {
        balance_on,
        table,
        proportion,
        sample_size,
    })
}

/// A sampler draws an actual balanced subsample from integer population counts.
pub trait Sampler {
    /// Draw a sample from `counts`, laid out with rows indexed by `A` and
    /// columns by `B`. The result has rows indexed by the balancing variable.
    ///
    /// Populations of more than `MAX_DRAW_POPULATION` individuals are rejected.
    fn sample(&mut self, rng: &mut StdRng, counts: &[[u64; 2]; 2]) -> Result<[[u64; 2]; 2], BalanceError>;
}

pub struct RandomBalancedSampler {
    balance_on: Variable,
}

impl RandomBalancedSampler {
    pub fn new(balance_on: Variable) -> Self {
        RandomBalancedSampler { balance_on }
    }
}

impl Sampler for RandomBalancedSampler {
    fn sample(&mut self, rng: &mut StdRng, counts: &[[u64; 2]; 2]) -> Result<[[u64; 2]; 2], BalanceError> {
        let population = counts.iter().flatten().try_fold(0u64, |acc, &c| acc.checked_add(c));
        match population {
            Some(total) if total <= MAX_DRAW_POPULATION => {}
            _ => {
                return Err(BalanceError::InvalidParameter(
                    "counts".to_string(),
                    format!("at most {} individuals in total", MAX_DRAW_POPULATION),
                    format!("{:?}", counts),
                ))
            }
        }
        let rows = match self.balance_on {
            Variable::A => *counts,
            Variable::B => [[counts[0][0], counts[1][0]], [counts[0][1], counts[1][1]]],
        };
        let totals = [rows[0][0] + rows[0][1], rows[1][0] + rows[1][1]];
        if totals[0] == 0 || totals[1] == 0 {
            return Err(BalanceError::EmptyBalancedSample(self.balance_on.to_string()));
        }

        let (rare, frequent) = if totals[0] <= totals[1] { (0, 1) } else { (1, 0) };
        let amount = totals[rare] as usize;
        let pool = totals[frequent] as usize;
        // Members of the frequent level are numbered with the "yes" column first.
        let yes_members = rows[frequent][0] as usize;
        let drawn_yes = index::sample(rng, pool, amount)
            .iter()
            .filter(|&i| i < yes_members)
            .count() as u64;

        let mut out = [[0; 2]; 2];
        out[rare] = rows[rare];
        out[frequent] = [drawn_yes, amount as u64 - drawn_yes];
        Ok(out)
    }
}
