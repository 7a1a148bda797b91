use crate::controller::config::ControllerConfig;
use crate::controller::core::Parameterization;
use crate::population::NormalizationPolicy;

impl ControllerConfig {
    // Set methods for parameters

    /// Set the initial population.
    /// * `population` - Joint weights or marginal/conditional inputs.
    pub fn set_population(mut self, population: Parameterization) -> Self {
        self.population = population;
        self
    }

    /// Set the total population size.
    /// * `total_population_size` - Number of individuals balanced samples are drawn from.
    pub fn set_total_population_size(mut self, total_population_size: f64) -> Self {
        self.total_population_size = total_population_size;
        self
    }

    /// Set the tolerance of the sum-to-one check.
    /// * `tolerance` - Allowed distance of the joint proportions' sum from one.
    pub fn set_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the significance level.
    /// * `alpha` - Only used for the auxiliary reject/fail-to-reject annotation.
    pub fn set_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set how joint weights that do not sum to one are handled.
    /// * `normalization` - Normalize them, or reject the update.
    pub fn set_normalization(mut self, normalization: NormalizationPolicy) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the continuity correction.
    /// * `continuity_correction` - Apply the Yates correction to the 2x2 tests.
    pub fn set_continuity_correction(mut self, continuity_correction: bool) -> Self {
        self.continuity_correction = continuity_correction;
        self
    }
}
