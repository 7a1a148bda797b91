//! Controller Configuration
//!
//! Settings recognised by the controller and the initial parameter set it
//! starts from.
use crate::constants::{DEFAULT_ALPHA, DEFAULT_POPULATION, DEFAULT_POPULATION_SIZE, DEFAULT_TOLERANCE};
use crate::controller::core::Parameterization;
use crate::errors::BalanceError;
use crate::population::NormalizationPolicy;
use crate::utils::{validate_float_parameter, validate_positive_float_parameter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_population() -> Parameterization {
    Parameterization::Joint(DEFAULT_POPULATION)
}
fn default_total_population_size() -> f64 {
    DEFAULT_POPULATION_SIZE
}
fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}
fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

/// Configuration for the `ReactiveController`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Population the controller starts with.
    #[serde(default = "default_population")]
    pub population: Parameterization,
    /// Number of individuals in the population.
    #[serde(default = "default_total_population_size")]
    pub total_population_size: f64,
    /// Allowed distance of the joint proportions' sum from one.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Significance level for the auxiliary verdict.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Treatment of joint cell weights that do not sum to one.
    #[serde(default)]
    pub normalization: NormalizationPolicy,
    /// Apply the Yates continuity correction to every test.
    #[serde(default)]
    pub continuity_correction: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            population: default_population(),
            total_population_size: DEFAULT_POPULATION_SIZE,
            tolerance: DEFAULT_TOLERANCE,
            alpha: DEFAULT_ALPHA,
            normalization: NormalizationPolicy::Normalize,
            continuity_correction: false,
        }
    }
}

impl ControllerConfig {
    /// Check the scalar settings. The population itself is checked when the
    /// controller first builds it.
    pub fn validate(&self) -> Result<(), BalanceError> {
        validate_positive_float_parameter(self.total_population_size, "total_population_size")?;
        validate_float_parameter(self.tolerance, 0.0, 1.0, "tolerance")?;
        validate_float_parameter(self.alpha, 0.0, 1.0, "alpha")?;
        Ok(())
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save a configuration as a json object to a file.
    ///
    /// * `path` - Path to save configuration.
    fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), BalanceError> {
        fs::write(path, self.json_dump()?).map_err(|e| BalanceError::UnableToWrite(e.to_string()))
    }

    /// Dump a configuration as a json object
    fn json_dump(&self) -> Result<String, BalanceError> {
        serde_json::to_string(self).map_err(|e| BalanceError::UnableToWrite(e.to_string()))
    }

    /// Load a configuration from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, BalanceError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| BalanceError::UnableToRead(e.to_string()))
    }

    /// Load a configuration from a path to a json object.
    ///
    /// * `path` - Path to load configuration from.
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, BalanceError> {
        let json_str = fs::read_to_string(path).map_err(|e| BalanceError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for ControllerConfig {}
