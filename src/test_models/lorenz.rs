use crate::{error::ConfigurationError, expr::ExprRhs, function::RhsInplace, problem::OdeProblem};

/// sigma, rho, beta
pub const LORENZ_P: [f64; 3] = [10.0, 28.0, 8.0 / 3.0];
pub const LORENZ_U0: [f64; 3] = [1.0, 0.0, 0.0];
pub const LORENZ_TSPAN: (f64, f64) = (0.0, 100.0);

/// The Lorenz system
/// ```text
/// dx/dt = sigma (y - x)
/// dy/dt = x (rho - z) - y
/// dz/dt = x y - beta z
/// ```
pub fn lorenz(u: &[f64], p: &[f64], _t: f64, du: &mut [f64]) {
    du[0] = p[0] * (u[1] - u[0]);
    du[1] = u[0] * (p[1] - u[2]) - u[1];
    du[2] = u[0] * u[1] - p[2] * u[2];
}

/// The same system as [lorenz], interpreted
pub fn lorenz_expr() -> Result<ExprRhs, ConfigurationError> {
    ExprRhs::parse(&[
        "p1 * (u2 - u1)",
        "u1 * (p2 - u3) - u2",
        "u1 * u2 - p3 * u3",
    ])
}

pub type LorenzRhs = RhsInplace<fn(&[f64], &[f64], f64, &mut [f64])>;

/// Lorenz on `[0, 100]` with `rtol = atol = 1e-8`
pub fn lorenz_problem() -> OdeProblem<LorenzRhs> {
    OdeProblem::new(
        RhsInplace(lorenz as fn(&[f64], &[f64], f64, &mut [f64])),
        LORENZ_U0,
        LORENZ_TSPAN,
    )
    .p(LORENZ_P)
    .rtol(1e-8)
    .atol(1e-8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::OdeFunction;

    #[test]
    fn compiled_and_interpreted_rhs_match() {
        let expr = lorenz_expr().unwrap();
        let compiled = lorenz_problem();
        for u in [[1.0, 0.0, 0.0], [-3.5, 7.25, 20.0]] {
            let mut a = [0.0; 3];
            let mut b = [0.0; 3];
            compiled.rhs().call_inplace(&u, &LORENZ_P, 0.0, &mut a).unwrap();
            expr.call_inplace(&u, &LORENZ_P, 0.0, &mut b).unwrap();
            assert_eq!(a, b);
        }
    }
}
