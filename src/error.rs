//! Error types for hivsim

use thiserror::Error;

/// Failures surfaced by the model and the integration driver.
///
/// Configuration problems are always detected before the solver is built,
/// so a [SimulationError::Configuration] guarantees no integration work was done.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Invalid parameters, initial state, time span or solver options
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The solver could not produce a trajectory that meets its tolerances
    #[error("Numerical failure{}: {}", at_time(.t), .reason)]
    NumericalFailure { t: Option<f64>, reason: String },
}

impl SimulationError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimulationError::Configuration(msg.into())
    }

    pub(crate) fn numerical(t: Option<f64>, reason: impl Into<String>) -> Self {
        SimulationError::NumericalFailure {
            t,
            reason: reason.into(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, SimulationError::Configuration(_))
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, SimulationError::NumericalFailure { .. })
    }
}

fn at_time(t: &Option<f64>) -> String {
    match t {
        Some(t) => format!(" at t = {}", t),
        None => String::new(),
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numerical_failure_mentions_time() {
        let err = SimulationError::numerical(Some(12.5), "step size underflow");
        assert_eq!(
            err.to_string(),
            "Numerical failure at t = 12.5: step size underflow"
        );
        assert!(err.is_numerical());
    }

    #[test]
    fn numerical_failure_without_time() {
        let err = SimulationError::numerical(None, "expected 10 samples, got 9");
        assert_eq!(err.to_string(), "Numerical failure: expected 10 samples, got 9");
    }

    #[test]
    fn configuration_message() {
        let err = SimulationError::config("t_max must be positive");
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Configuration error: t_max must be positive");
    }
}
