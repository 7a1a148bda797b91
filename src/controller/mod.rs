//! Controller
//!
//! Owns the current parameter set and reruns population, sampling and testing
//! every time a parameter changes, handing the results to a view.
// public modules
pub mod config;
pub mod core;

// private modules
mod setters;
