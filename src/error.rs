use thiserror::Error;

use crate::trajectory::Trajectory;

/// Error type returned by [crate::solve()] and [crate::OdeProblem::solve]
///
/// There are only two kinds of failure: the problem was badly specified (detected before any integration
/// happens), or the integrator could not make progress. Neither is retried automatically.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Numerical failure: {0}")]
    Numerical(#[from] NumericalFailure),
}

impl SolveError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, SolveError::Configuration(_))
    }

    /// The partial trajectory computed before a numerical failure, if any.
    pub fn partial(&self) -> Option<&Trajectory> {
        match self {
            SolveError::Numerical(failure) => Some(&failure.partial),
            SolveError::Configuration(_) => None,
        }
    }
}

/// Possible errors in the shape, ordering or tolerances of a problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Time span is reversed: t_start = {t_start} > t_end = {t_end}")]
    ReversedTimeSpan { t_start: f64, t_end: f64 },
    #[error("Time span contains a non-finite value: ({t_start}, {t_end})")]
    NonFiniteTimeSpan { t_start: f64, t_end: f64 },
    #[error("Initial state is empty")]
    EmptyInitialState,
    #[error("Initial state has a non-finite value at index {index}")]
    NonFiniteInitialState { index: usize },
    #[error("Derivative has wrong length: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Relative tolerance must be positive and finite, got {0}")]
    InvalidRelativeTolerance(f64),
    #[error("Absolute tolerance must be positive and finite, got {0}")]
    InvalidAbsoluteTolerance(f64),
    #[error("saveat must contain at least one time")]
    EmptySaveat,
    #[error("saveat must be non-decreasing, but saveat[{index}] = {time} follows {previous}")]
    DecreasingSaveat {
        index: usize,
        time: f64,
        previous: f64,
    },
    #[error("saveat[{index}] = {time} is outside the time span [{t_start}, {t_end}]")]
    SaveatOutOfSpan {
        index: usize,
        time: f64,
        t_start: f64,
        t_end: f64,
    },
    #[error("Unknown algorithm '{0}', expected one of: bdf, tr_bdf2, esdirk34, tsit45")]
    UnknownAlgorithm(String),
    #[error("Step budget must be at least one step")]
    ZeroStepBudget,
    #[error("Invalid expression in equation {equation} at position {position}: {message}")]
    InvalidExpression {
        equation: usize,
        position: usize,
        message: String,
    },
    #[error("Equation {equation} references {name}, but only {available} values are available")]
    UnknownVariable {
        equation: usize,
        name: String,
        available: usize,
    },
}

/// The integrator stopped before reaching the end of the time span.
///
/// The samples computed up to the failure are kept in `partial`.
#[derive(Error, Debug)]
#[error("{reason} ({} samples computed)", .partial.len())]
pub struct NumericalFailure {
    pub reason: FailureReason,
    pub partial: Trajectory,
}

/// Why the integration could not proceed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FailureReason {
    #[error("Step size is too small at time = {time}")]
    StepSizeTooSmall { time: f64 },
    #[error("Exceeded maximum number of error test failures at time = {time}")]
    TooManyErrorTestFailures { time: f64 },
    #[error("Nonlinear solver failed to converge: {0}")]
    NonlinearSolver(String),
    #[error("Solution is no longer finite at time = {time}")]
    NonFiniteState { time: f64 },
    #[error("Exceeded the step budget of {max_steps} steps at time = {time}")]
    StepBudgetExceeded { max_steps: usize, time: f64 },
    #[error("Exceeded the wall-clock budget of {seconds}s at time = {time}")]
    WallTimeExceeded { seconds: f64, time: f64 },
    #[error("Solver error: {0}")]
    Solver(String),
}

#[macro_export]
macro_rules! config_error {
    ($variant:ident) => {
        $crate::error::SolveError::from($crate::error::ConfigurationError::$variant)
    };
    ($variant:ident, $($arg:tt)*) => {
        $crate::error::SolveError::from($crate::error::ConfigurationError::$variant($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_messages() {
        let err = SolveError::from(ConfigurationError::ReversedTimeSpan {
            t_start: 1.0,
            t_end: 0.0,
        });
        insta::assert_snapshot!(err, @"Configuration error: Time span is reversed: t_start = 1 > t_end = 0");

        let err = config_error!(UnknownAlgorithm, "rk4".to_string());
        insta::assert_snapshot!(err, @"Configuration error: Unknown algorithm 'rk4', expected one of: bdf, tr_bdf2, esdirk34, tsit45");
        assert!(err.is_configuration());
        assert!(err.partial().is_none());

        let err = config_error!(EmptySaveat);
        insta::assert_snapshot!(err, @"Configuration error: saveat must contain at least one time");
    }

    #[test]
    fn numerical_failure_keeps_partial() {
        let partial = Trajectory::from_samples(vec![0.0, 0.5], vec![vec![1.0], vec![2.0]]);
        let err = SolveError::from(NumericalFailure {
            reason: FailureReason::StepBudgetExceeded {
                max_steps: 10,
                time: 0.5,
            },
            partial,
        });
        insta::assert_snapshot!(err, @"Numerical failure: Exceeded the step budget of 10 steps at time = 0.5 (2 samples computed)");
        assert!(!err.is_configuration());
        assert_eq!(err.partial().map(Trajectory::len), Some(2));
    }
}
