use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{algorithm::Algorithm, config_error, error::SolveError};

/// Options for [crate::solve()].
///
/// Every field has a default, so a configuration file only needs to name the options it changes:
/// - `p = []`
/// - `alg = tsit45`
/// - `rtol = 1e-6`
/// - `atol = 1e-6`
/// - `saveat = None` (save at every internal step)
/// - `max_steps = 100_000`
/// - `max_wall_time = None` (no limit)
///
/// # Example
///
/// ```rust
/// use diffsol_ivp::{Algorithm, SolveOptions};
///
/// let options = SolveOptions::default()
///     .p([10.0, 28.0, 8.0 / 3.0])
///     .alg(Algorithm::Bdf)
///     .rtol(1e-8)
///     .atol(1e-8)
///     .saveat((0..=100).map(|i| i as f64));
/// assert_eq!(options.saveat.as_ref().map(Vec::len), Some(101));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolveOptions {
    pub p: Vec<f64>,
    pub alg: Algorithm,
    pub rtol: f64,
    pub atol: f64,
    pub saveat: Option<Vec<f64>>,
    pub max_steps: usize,
    #[serde(rename = "max_wall_time_secs", with = "duration_secs")]
    pub max_wall_time: Option<Duration>,
}

pub const DEFAULT_RTOL: f64 = 1e-6;
pub const DEFAULT_ATOL: f64 = 1e-6;
pub const DEFAULT_MAX_STEPS: usize = 100_000;

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            p: vec![],
            alg: Algorithm::default(),
            rtol: DEFAULT_RTOL,
            atol: DEFAULT_ATOL,
            saveat: None,
            max_steps: DEFAULT_MAX_STEPS,
            max_wall_time: None,
        }
    }
}

impl SolveOptions {
    /// Set the parameters passed unchanged to the derivative function.
    pub fn p<V>(mut self, p: V) -> Self
    where
        V: IntoIterator<Item = f64>,
    {
        self.p = p.into_iter().collect();
        self
    }

    pub fn alg(mut self, alg: Algorithm) -> Self {
        self.alg = alg;
        self
    }

    /// Set the relative tolerance.
    pub fn rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    /// Set the absolute tolerance.
    pub fn atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    /// Report the solution only at these times (non-decreasing, within the time span).
    pub fn saveat<V>(mut self, saveat: V) -> Self
    where
        V: IntoIterator<Item = f64>,
    {
        self.saveat = Some(saveat.into_iter().collect());
        self
    }

    /// Maximum number of internal steps before the solve fails with
    /// [crate::FailureReason::StepBudgetExceeded].
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn max_wall_time(mut self, max_wall_time: Duration) -> Self {
        self.max_wall_time = Some(max_wall_time);
        self
    }

    /// Check the tolerances and budgets. Checks that need the problem (time span, saveat range) live in
    /// [crate::solve()].
    pub fn validate(&self) -> Result<(), SolveError> {
        if !(self.rtol.is_finite() && self.rtol > 0.0) {
            return Err(config_error!(InvalidRelativeTolerance, self.rtol));
        }
        if !(self.atol.is_finite() && self.atol > 0.0) {
            return Err(config_error!(InvalidAbsoluteTolerance, self.atol));
        }
        if self.max_steps == 0 {
            return Err(config_error!(ZeroStepBudget));
        }
        Ok(())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(D::Error::custom))
            .transpose()
    }
}
