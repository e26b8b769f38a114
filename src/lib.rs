//! # diffsol-ivp
//!
//! Solve an ordinary differential equation initial value problem and sample its trajectory in a single call:
//!
//! ```text
//! du/dt = f(u, p, t),  u(t_start) = u0,  t in [t_start, t_end]
//! ```
//!
//! The integration itself is done by [diffsol](https://docs.rs/diffsol). This crate supplies the front-end: the
//! derivative function contract ([OdeFunction] and its closure adapters), validation of the problem, selection of the
//! integration method ([Algorithm]), sampling at explicit times or at every internal step, step and wall-clock budgets
//! and a [Trajectory] that can be reshaped into a table for plotting.
//!
//! ## Solving a problem
//!
//! Use [solve] with a set of [SolveOptions], or the [OdeProblem] builder:
//!
//! ```rust
//! use diffsol_ivp::{Algorithm, OdeProblem, RhsInplace};
//!
//! fn lorenz(u: &[f64], p: &[f64], _t: f64, du: &mut [f64]) {
//!     du[0] = p[0] * (u[1] - u[0]);
//!     du[1] = u[0] * (p[1] - u[2]) - u[1];
//!     du[2] = u[0] * u[1] - p[2] * u[2];
//! }
//!
//! let trajectory = OdeProblem::new(RhsInplace(lorenz), [1.0, 0.0, 0.0], (0.0, 10.0))
//!     .p([10.0, 28.0, 8.0 / 3.0])
//!     .alg(Algorithm::Tsit45)
//!     .rtol(1e-8)
//!     .atol(1e-8)
//!     .solve()
//!     .unwrap();
//! let table = trajectory.to_table();
//! assert_eq!(table.ncols(), 4);
//! ```
//!
//! ## Derivative functions
//!
//! Any type implementing [OdeFunction] can be solved. Closures are wrapped in [Rhs] (returns a new vector),
//! [RhsInplace] (writes into a buffer) or [ScalarRhs] (one-dimensional problems). [ExprRhs] parses equations from
//! strings and interprets them, which is useful when the equations are only known at runtime and as a baseline for
//! measuring the per-call overhead of compiled closures.
//!
//! The implicit methods ([Algorithm::Bdf], [Algorithm::TrBdf2], [Algorithm::Esdirk34]) need Jacobian-vector products,
//! which are approximated by forward differences of `f`.
//!
//! ## Errors
//!
//! [SolveError] has two variants. [ConfigurationError]s are found before integrating (bad time span, initial state,
//! tolerances, sample times, or a derivative of the wrong length). [NumericalFailure]s happen during integration and
//! carry the partial trajectory computed before the failure.
//!
//! ## Logging
//!
//! Progress is reported through the [log](https://docs.rs/log) facade at `debug` and `trace` level, and failures at
//! `warn` level. No logger is installed by this crate.

pub mod algorithm;
pub mod error;
pub mod expr;
pub mod function;
pub mod options;
pub mod problem;
pub mod solve;
pub mod test_models;
pub mod trajectory;

pub use algorithm::Algorithm;
pub use error::{ConfigurationError, FailureReason, NumericalFailure, SolveError};
pub use expr::ExprRhs;
pub use function::{OdeFunction, Rhs, RhsInplace, ScalarRhs};
pub use options::SolveOptions;
pub use problem::OdeProblem;
pub use solve::solve;
pub use trajectory::{SolveStats, Trajectory};

#[cfg(test)]
mod tests {
    use crate::{solve, OdeProblem, ScalarRhs, SolveOptions};

    // WARNING: if this test fails and you make a change to the code, you should update the README.md file as well!!!
    #[test]
    fn test_readme() {
        let f = ScalarRhs(|u: f64, p: &[f64], _t: f64| p[0] * u);
        let options = SolveOptions::default()
            .p([1.01])
            .saveat((0..=10).map(|i| i as f64 / 10.0));
        let trajectory = solve(&f, &[0.5], (0.0, 1.0), &options).unwrap();
        for (t, u) in trajectory.iter() {
            let expect = 0.5 * (1.01 * t).exp();
            assert!((u[0] - expect).abs() < 1e-4 * expect);
        }

        let trajectory = OdeProblem::new(f, [0.5], (0.0, 1.0))
            .p([1.01])
            .solve()
            .unwrap();
        let mut csv = Vec::new();
        trajectory.to_csv(&mut csv).unwrap();
        assert!(String::from_utf8(csv).unwrap().starts_with("t,u1\n0,0.5\n"));
    }
}
