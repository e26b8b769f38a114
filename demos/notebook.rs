//! Walk through the tutorial sequence: a scalar ODE, the Lorenz system, tolerances and sample points, solver
//! selection, and a compiled vs interpreted timing comparison. Each trajectory is written as CSV to the directory given
//! as the first argument (default: the current directory), ready for plotting.

use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{Context, Result};
use diffsol_ivp::{
    solve,
    test_models::lorenz::{lorenz, lorenz_expr, LORENZ_P, LORENZ_TSPAN, LORENZ_U0},
    Algorithm, OdeProblem, RhsInplace, ScalarRhs, SolveOptions, Trajectory,
};

fn write_csv(dir: &Path, name: &str, trajectory: &Trajectory) -> Result<()> {
    let path = dir.join(format!("{name}.csv"));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    trajectory.to_csv(BufWriter::new(file))?;
    println!("  wrote {} ({} samples)", path.display(), trajectory.len());
    Ok(())
}

fn main() -> Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    // 1. a scalar ODE: du/dt = 1.01 u, u(0) = 0.5
    println!("Scalar ODE");
    let f = ScalarRhs(|u: f64, p: &[f64], _t: f64| p[0] * u);
    let trajectory = solve(&f, &[0.5], (0.0, 1.0), &SolveOptions::default().p([1.01]))?;
    let (t_end, u_end) = trajectory.last().context("empty trajectory")?;
    println!(
        "  u({t_end}) = {:.6} (exact {:.6}) after {} steps",
        u_end[0],
        0.5 * 1.01f64.exp(),
        trajectory.stats.nsteps
    );
    write_csv(&dir, "scalar", &trajectory)?;

    // 2. the Lorenz system
    println!("Lorenz system");
    let trajectory = OdeProblem::new(RhsInplace(lorenz), LORENZ_U0, LORENZ_TSPAN)
        .p(LORENZ_P)
        .solve()?;
    println!("  {} samples", trajectory.len());
    write_csv(&dir, "lorenz", &trajectory)?;

    // 3. tighter tolerances, saved at fixed times
    println!("Lorenz system, rtol = atol = 1e-8, saved every 0.01");
    let saveat = (0..=10_000).map(|i| i as f64 / 100.0);
    let options = SolveOptions::default()
        .p(LORENZ_P)
        .rtol(1e-8)
        .atol(1e-8)
        .saveat(saveat);
    let trajectory = solve(RhsInplace(lorenz), &LORENZ_U0, LORENZ_TSPAN, &options)?;
    println!(
        "  {} steps, {} function evaluations",
        trajectory.stats.nsteps, trajectory.stats.nfev
    );
    write_csv(&dir, "lorenz_saveat", &trajectory)?;

    // 4. choosing a solver
    println!("Solver selection");
    for alg in Algorithm::ALL {
        let options = options.clone().alg(alg).saveat([0.0, 1.0]);
        let trajectory = solve(RhsInplace(lorenz), &LORENZ_U0, (0.0, 1.0), &options)?;
        println!(
            "  {alg:>8}: u(1) = {:?}, {} steps in {:?}",
            trajectory.state(1),
            trajectory.stats.nsteps,
            trajectory.stats.elapsed
        );
    }
    let alg: Algorithm = "tsit5".parse()?;
    println!("  'tsit5' selects {alg}");

    // 5. compiled vs interpreted
    println!("Compiled vs interpreted derivative");
    let expr = lorenz_expr()?;
    let start = Instant::now();
    let compiled = solve(RhsInplace(lorenz), &LORENZ_U0, LORENZ_TSPAN, &options)?;
    let compiled_time = start.elapsed();
    let start = Instant::now();
    let interpreted = solve(&expr, &LORENZ_U0, LORENZ_TSPAN, &options)?;
    let interpreted_time = start.elapsed();
    println!("  compiled:    {compiled_time:?}");
    println!("  interpreted: {interpreted_time:?}");
    println!(
        "  max difference between trajectories: {:e}",
        compiled
            .max_abs_diff(&interpreted)
            .context("trajectories sampled at different times")?
    );

    Ok(())
}
