use crate::{function::ScalarRhs, problem::OdeProblem, trajectory::Trajectory};

/// Growth rate used throughout the notebook
pub const GROWTH_RATE: f64 = 1.01;
pub const GROWTH_U0: f64 = 0.5;

// du/dt = k u (p = [k])
pub fn exponential_growth(u: f64, p: &[f64], _t: f64) -> f64 {
    p[0] * u
}

pub type ExponentialGrowthRhs = ScalarRhs<fn(f64, &[f64], f64) -> f64>;

/// `du/dt = 1.01 u`, `u(0) = 0.5` on `[0, 1]`, sampled at `t = 0, 0.1, ..., 1`, together with the analytic solution
/// `u0 exp(k t)` at the same times.
pub fn exponential_growth_problem() -> (OdeProblem<ExponentialGrowthRhs>, Trajectory) {
    let times = (0..=10).map(|i| i as f64 / 10.0).collect::<Vec<_>>();
    let problem = OdeProblem::new(
        ScalarRhs(exponential_growth as fn(f64, &[f64], f64) -> f64),
        [GROWTH_U0],
        (0.0, 1.0),
    )
    .p([GROWTH_RATE])
    .saveat(times.iter().copied());
    let soln = Trajectory::from_samples(
        times.clone(),
        times
            .iter()
            .map(|t| vec![GROWTH_U0 * (GROWTH_RATE * t).exp()])
            .collect(),
    );
    (problem, soln)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_solution() {
        let (problem, soln) = exponential_growth_problem();
        assert_eq!(soln.len(), 11);
        assert_eq!(soln.times(), problem.get_options().saveat.as_deref().unwrap());
        assert_eq!(soln.state(0), &[0.5]);
        assert_eq!(exponential_growth(2.0, &[GROWTH_RATE], 0.0), 2.02);
    }
}
