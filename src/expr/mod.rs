//! Interpreted derivative functions.
//!
//! [ExprRhs] parses one equation string per state component and evaluates the resulting expression trees on every call.
//! It is the slow path of the compiled-vs-interpreted comparison: the same system written as a Rust closure is compiled
//! to native code, while an [ExprRhs] pays a tree walk for every operation on every evaluation.
//!
//! Variables are `t`, the states `u1..un` (or `u[1]..u[n]`) and the parameters `p1..pm` (or `p[1]..p[m]`), all
//! 1-based. The constants `pi` and `e`, the operators `+ - * / ^` and the functions `sin`, `cos`, `tan`, `exp`,
//! `ln` (or `log`), `sqrt`, `abs` and `tanh` are available.
//!
//! ```rust
//! use diffsol_ivp::{solve, ExprRhs, SolveOptions};
//!
//! let lorenz = ExprRhs::parse(&[
//!     "p1 * (u2 - u1)",
//!     "u1 * (p2 - u3) - u2",
//!     "u1 * u2 - p3 * u3",
//! ])
//! .unwrap();
//! let options = SolveOptions::default().p([10.0, 28.0, 8.0 / 3.0]);
//! let trajectory = solve(&lorenz, &[1.0, 0.0, 0.0], (0.0, 1.0), &options).unwrap();
//! assert_eq!(trajectory.nstates(), 3);
//! ```

mod node;
mod parse;

use node::Node;

use crate::{error::ConfigurationError, function::OdeFunction};

/// A system of equations `du_i/dt = expr_i(u, p, t)` evaluated by interpretation.
#[derive(Debug, Clone)]
pub struct ExprRhs {
    equations: Vec<Node>,
    sources: Vec<String>,
    nstates_used: usize,
    nparams_used: usize,
}

impl ExprRhs {
    /// Parse one expression per state component.
    pub fn parse<S: AsRef<str>>(equations: &[S]) -> Result<Self, ConfigurationError> {
        let mut nodes = Vec::with_capacity(equations.len());
        for (i, src) in equations.iter().enumerate() {
            let node = parse::parse(src.as_ref()).map_err(|err| {
                ConfigurationError::InvalidExpression {
                    equation: i,
                    position: err.position,
                    message: err.message,
                }
            })?;
            nodes.push(node);
        }
        let (nstates_used, nparams_used) = nodes.iter().fold((0, 0), |(u, p), node| {
            let (nu, np) = node.extent();
            (u.max(nu), p.max(np))
        });
        Ok(Self {
            equations: nodes,
            sources: equations.iter().map(|s| s.as_ref().to_string()).collect(),
            nstates_used,
            nparams_used,
        })
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    /// The equation strings this system was parsed from
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    fn check_extent(&self, u: &[f64], p: &[f64]) -> Result<(), ConfigurationError> {
        if self.nstates_used > u.len() {
            return Err(self.unknown_variable("u", self.nstates_used, u.len()));
        }
        if self.nparams_used > p.len() {
            return Err(self.unknown_variable("p", self.nparams_used, p.len()));
        }
        Ok(())
    }

    fn unknown_variable(&self, prefix: &str, needed: usize, available: usize) -> ConfigurationError {
        // report the first equation that uses the out-of-range index
        let equation = self
            .equations
            .iter()
            .position(|node| {
                let (nu, np) = node.extent();
                if prefix == "u" {
                    nu == needed
                } else {
                    np == needed
                }
            })
            .unwrap_or(0);
        ConfigurationError::UnknownVariable {
            equation,
            name: format!("{prefix}{needed}"),
            available,
        }
    }
}

impl OdeFunction for ExprRhs {
    fn call_inplace(
        &self,
        u: &[f64],
        p: &[f64],
        t: f64,
        du: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        if self.equations.len() != du.len() {
            return Err(ConfigurationError::DimensionMismatch {
                expected: du.len(),
                found: self.equations.len(),
            });
        }
        self.check_extent(u, p)?;
        for (dui, node) in du.iter_mut().zip(self.equations.iter()) {
            *dui = node.eval(u, p, t);
        }
        Ok(())
    }

    fn nout(&self) -> Option<usize> {
        Some(self.equations.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lorenz_matches_closure() {
        let rhs = ExprRhs::parse(&["p1 * (u2 - u1)", "u1 * (p2 - u3) - u2", "u1 * u2 - p3 * u3"])
            .unwrap();
        let p = [10.0, 28.0, 8.0 / 3.0];
        let u = [1.5, -0.5, 20.0];
        let mut du = [0.0; 3];
        rhs.call_inplace(&u, &p, 0.0, &mut du).unwrap();
        let expected = [
            p[0] * (u[1] - u[0]),
            u[0] * (p[1] - u[2]) - u[1],
            u[0] * u[1] - p[2] * u[2],
        ];
        assert_eq!(du, expected);
        assert_eq!(rhs.len(), 3);
        assert_eq!(rhs.sources()[0], "p1 * (u2 - u1)");
    }

    #[test]
    fn parse_error_names_equation() {
        let err = ExprRhs::parse(&["u1", "u2 +"]).unwrap_err();
        insta::assert_snapshot!(err, @"Invalid expression in equation 1 at position 4: unexpected end of expression");
    }

    #[test]
    fn out_of_range_variables() {
        let rhs = ExprRhs::parse(&["-u1", "p2 * u1"]).unwrap();
        let err = rhs.check(&[1.0, 2.0], &[1.0], 0.0).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownVariable {
                equation: 1,
                name: "p2".to_string(),
                available: 1,
            }
        );

        let rhs = ExprRhs::parse(&["u3", "u1"]).unwrap();
        let err = rhs.check(&[1.0, 2.0], &[], 0.0).unwrap_err();
        insta::assert_snapshot!(err, @"Equation 0 references u3, but only 2 values are available");
    }

    #[test]
    fn dimension_is_number_of_equations() {
        let rhs = ExprRhs::parse(&["-u1", "-u2"]).unwrap();
        assert_eq!(
            rhs.check(&[1.0, 2.0, 3.0], &[], 0.0),
            Err(ConfigurationError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        );
    }
}
