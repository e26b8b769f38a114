use std::time::Duration;

use crate::{
    algorithm::Algorithm, error::SolveError, function::OdeFunction, options::SolveOptions,
    solve::solve, trajectory::Trajectory,
};

/// An initial value problem `du/dt = f(u, p, t)`, `u(t_start) = u0`, built up with chained setters and solved with
/// [OdeProblem::solve].
///
/// # Example
///
/// ```rust
/// use diffsol_ivp::{Algorithm, OdeProblem, ScalarRhs};
///
/// let trajectory = OdeProblem::new(ScalarRhs(|u: f64, p: &[f64], _t: f64| p[0] * u), [0.5], (0.0, 1.0))
///     .p([1.01])
///     .alg(Algorithm::TrBdf2)
///     .rtol(1e-8)
///     .atol(1e-8)
///     .solve()
///     .unwrap();
/// assert_eq!(trajectory.times()[0], 0.0);
/// ```
#[derive(Clone)]
pub struct OdeProblem<F> {
    f: F,
    u0: Vec<f64>,
    tspan: (f64, f64),
    options: SolveOptions,
}

impl<F> OdeProblem<F> {
    pub fn new<U>(f: F, u0: U, tspan: (f64, f64)) -> Self
    where
        U: IntoIterator<Item = f64>,
    {
        Self {
            f,
            u0: u0.into_iter().collect(),
            tspan,
            options: SolveOptions::default(),
        }
    }

    /// Set the parameters.
    pub fn p<V>(mut self, p: V) -> Self
    where
        V: IntoIterator<Item = f64>,
    {
        self.options = self.options.p(p);
        self
    }

    pub fn alg(mut self, alg: Algorithm) -> Self {
        self.options.alg = alg;
        self
    }

    /// Set the relative tolerance.
    pub fn rtol(mut self, rtol: f64) -> Self {
        self.options.rtol = rtol;
        self
    }

    /// Set the absolute tolerance.
    pub fn atol(mut self, atol: f64) -> Self {
        self.options.atol = atol;
        self
    }

    /// Report the solution only at these times.
    pub fn saveat<V>(mut self, saveat: V) -> Self
    where
        V: IntoIterator<Item = f64>,
    {
        self.options = self.options.saveat(saveat);
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.options.max_steps = max_steps;
        self
    }

    pub fn max_wall_time(mut self, max_wall_time: Duration) -> Self {
        self.options.max_wall_time = Some(max_wall_time);
        self
    }

    /// Replace all options at once, e.g. with ones read from a configuration file.
    pub fn options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn get_options(&self) -> &SolveOptions {
        &self.options
    }

    pub fn u0(&self) -> &[f64] {
        &self.u0
    }

    pub fn tspan(&self) -> (f64, f64) {
        self.tspan
    }

    pub fn rhs(&self) -> &F {
        &self.f
    }
}

impl<F: OdeFunction> OdeProblem<F> {
    /// Solve the problem. The problem is not consumed, so it can be solved again, e.g. after changing options on a
    /// clone.
    pub fn solve(&self) -> Result<Trajectory, SolveError> {
        solve(&self.f, &self.u0, self.tspan, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        function::{Rhs, ScalarRhs},
        Algorithm, OdeProblem, SolveOptions,
    };

    #[test]
    fn setters_fill_options() {
        let problem = OdeProblem::new(
            Rhs(|u: &[f64], _p: &[f64], _t: f64| vec![-u[0], -u[1]]),
            [1.0, 2.0],
            (0.0, 2.0),
        )
        .alg(Algorithm::Esdirk34)
        .rtol(1e-7)
        .atol(1e-9)
        .saveat([0.0, 1.0, 2.0])
        .max_steps(500);
        let options = problem.get_options();
        assert_eq!(options.alg, Algorithm::Esdirk34);
        assert_eq!(options.rtol, 1e-7);
        assert_eq!(options.atol, 1e-9);
        assert_eq!(options.saveat, Some(vec![0.0, 1.0, 2.0]));
        assert_eq!(options.max_steps, 500);
        assert_eq!(problem.u0(), &[1.0, 2.0]);
        assert_eq!(problem.tspan(), (0.0, 2.0));

        let trajectory = problem.solve().unwrap();
        assert_eq!(trajectory.len(), 3);
        assert!((trajectory.state(2)[1] - 2.0 * (-2.0f64).exp()).abs() < 1e-5);
    }

    #[test]
    fn options_from_config() {
        let options: SolveOptions =
            serde_json::from_str(r#"{ "p": [1.01], "alg": "bdf", "saveat": [0.0, 1.0] }"#).unwrap();
        let problem =
            OdeProblem::new(ScalarRhs(|u: f64, p: &[f64], _t: f64| p[0] * u), [0.5], (0.0, 1.0))
                .options(options);
        let trajectory = problem.solve().unwrap();
        assert_eq!(trajectory.times(), &[0.0, 1.0]);
        assert!((trajectory.state(1)[0] - 0.5 * 1.01f64.exp()).abs() < 1e-4);

        // solving again gives the same answer
        let again = problem.solve().unwrap();
        assert_eq!(again.max_abs_diff(&trajectory), Some(0.0));
    }
}
