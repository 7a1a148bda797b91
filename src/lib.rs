// Modules
pub mod constants;
pub mod controller;
pub mod errors;
pub mod independence;
pub mod population;
pub mod sampler;
pub mod utils;


// Individual classes, and functions
pub use controller::config::{ConfigIO, ControllerConfig};
pub use controller::core::{ParameterChange, ReactiveController, Snapshot, View};
pub use errors::BalanceError;
pub use independence::{IndependenceTester, TestResult};
pub use population::{JointDistribution, Level, Variable};
pub use sampler::{build_balanced, BalancedSample};
