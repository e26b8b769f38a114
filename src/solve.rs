use std::{
    cell::{Cell, RefCell},
    time::Instant,
};

use diffsol::{
    error::{DiffsolError, OdeSolverError},
    NalgebraLU, NalgebraMat, NalgebraVec, OdeBuilder, OdeEquations, OdeSolverMethod,
    OdeSolverStopReason, VectorHost,
};
use log::{debug, trace, warn};

use crate::{
    algorithm::Algorithm,
    config_error,
    error::{ConfigurationError, FailureReason, NumericalFailure, SolveError},
    function::OdeFunction,
    options::SolveOptions,
    trajectory::{SolveStats, Trajectory},
};

type M = NalgebraMat<f64>;
type V = NalgebraVec<f64>;
type LS = NalgebraLU<f64>;

/// Solve `du/dt = f(u, p, t)` from `u0` over `tspan` and sample the solution.
///
/// If `options.saveat` is given the trajectory holds exactly those times, otherwise it holds every internal step of the
/// integrator, starting at `tspan.0` and ending at `tspan.1`. With `saveat`, integration stops at the last requested
/// time.
///
/// The problem is validated before any integration happens, see [ConfigurationError] for what is checked. A failure
/// during integration returns a [NumericalFailure] holding the samples computed so far.
///
/// # Example
///
/// ```rust
/// use diffsol_ivp::{solve, ScalarRhs, SolveOptions};
///
/// let f = ScalarRhs(|u: f64, p: &[f64], _t: f64| p[0] * u);
/// let options = SolveOptions::default().p([1.01]).saveat([0.0, 0.5, 1.0]);
/// let trajectory = solve(f, &[0.5], (0.0, 1.0), &options).unwrap();
/// assert_eq!(trajectory.times(), &[0.0, 0.5, 1.0]);
/// let u1 = trajectory.state(2)[0];
/// assert!((u1 - 0.5 * 1.01f64.exp()).abs() < 1e-4);
/// ```
pub fn solve<F: OdeFunction>(
    f: F,
    u0: &[f64],
    tspan: (f64, f64),
    options: &SolveOptions,
) -> Result<Trajectory, SolveError> {
    validate(u0, tspan, options)?;
    f.check(u0, &options.p, tspan.0)?;
    debug!(
        "Solving {}-dimensional problem on [{}, {}] with {} (rtol = {}, atol = {})",
        u0.len(),
        tspan.0,
        tspan.1,
        options.alg,
        options.rtol,
        options.atol
    );

    let rhs = Instrumented::new(f, u0.len());
    let mut run = Run::new(&rhs, options, u0.len());

    if tspan.0 == tspan.1 {
        let ntimes = options.saveat.as_ref().map_or(1, Vec::len);
        for _ in 0..ntimes {
            run.trajectory.push(tspan.0, u0);
        }
        return run.finish(Ok(()));
    }

    let problem = OdeBuilder::<M>::new()
        .t0(tspan.0)
        .rtol(options.rtol)
        .atol([options.atol])
        .p(options.p.iter().copied())
        .rhs_implicit(
            |x: &V, p: &V, t: f64, y: &mut V| rhs.call(x.as_slice(), p.as_slice(), t, y.as_mut_slice()),
            |x: &V, p: &V, t: f64, v: &V, y: &mut V| {
                rhs.jac_mul(x.as_slice(), p.as_slice(), t, v.as_slice(), y.as_mut_slice())
            },
        )
        .init(
            move |_p: &V, _t: f64, y: &mut V| y.as_mut_slice().copy_from_slice(u0),
            u0.len(),
        )
        .build();
    let problem = match problem {
        Ok(problem) => problem,
        Err(err) => return run.finish(Err(Halt::Failure(failure_reason(err)))),
    };

    let result = match options.alg {
        Algorithm::Bdf => run.drive(problem.bdf::<LS>(), tspan.1),
        Algorithm::TrBdf2 => run.drive(problem.tr_bdf2::<LS>(), tspan.1),
        Algorithm::Esdirk34 => run.drive(problem.esdirk34::<LS>(), tspan.1),
        Algorithm::Tsit45 => run.drive(problem.tsit45(), tspan.1),
    };
    run.finish(result)
}

fn validate(u0: &[f64], (t0, t1): (f64, f64), options: &SolveOptions) -> Result<(), SolveError> {
    if !(t0.is_finite() && t1.is_finite()) {
        return Err(ConfigurationError::NonFiniteTimeSpan {
            t_start: t0,
            t_end: t1,
        }
        .into());
    }
    if t0 > t1 {
        return Err(ConfigurationError::ReversedTimeSpan {
            t_start: t0,
            t_end: t1,
        }
        .into());
    }
    if u0.is_empty() {
        return Err(config_error!(EmptyInitialState));
    }
    if let Some(index) = u0.iter().position(|u| !u.is_finite()) {
        return Err(ConfigurationError::NonFiniteInitialState { index }.into());
    }
    options.validate()?;
    if let Some(saveat) = &options.saveat {
        if saveat.is_empty() {
            return Err(config_error!(EmptySaveat));
        }
        for (index, &time) in saveat.iter().enumerate() {
            if !(t0..=t1).contains(&time) {
                return Err(ConfigurationError::SaveatOutOfSpan {
                    index,
                    time,
                    t_start: t0,
                    t_end: t1,
                }
                .into());
            }
            if index > 0 && time < saveat[index - 1] {
                return Err(ConfigurationError::DecreasingSaveat {
                    index,
                    time,
                    previous: saveat[index - 1],
                }
                .into());
            }
        }
    }
    Ok(())
}

fn failure_reason(err: DiffsolError) -> FailureReason {
    match err {
        DiffsolError::OdeSolverError(OdeSolverError::StepSizeTooSmall { time }) => {
            FailureReason::StepSizeTooSmall { time }
        }
        DiffsolError::OdeSolverError(OdeSolverError::TooManyErrorTestFailures { time }) => {
            FailureReason::TooManyErrorTestFailures { time }
        }
        DiffsolError::NonLinearSolverError(err) => FailureReason::NonlinearSolver(err.to_string()),
        err => FailureReason::Solver(err.to_string()),
    }
}

fn l2_norm(x: &[f64]) -> f64 {
    x.iter().map(|xi| xi * xi).sum::<f64>().sqrt()
}

/// Wraps the user's function for the integrator: counts evaluations, records the first error (the integrator's
/// callbacks cannot return one) and supplies Jacobian-vector products by forward differences.
struct Instrumented<F> {
    f: F,
    nfev: Cell<usize>,
    error: Cell<Option<ConfigurationError>>,
    scratch: RefCell<(Vec<f64>, Vec<f64>)>,
}

impl<F: OdeFunction> Instrumented<F> {
    fn new(f: F, nstates: usize) -> Self {
        Self {
            f,
            nfev: Cell::new(0),
            error: Cell::new(None),
            scratch: RefCell::new((vec![0.0; nstates], vec![0.0; nstates])),
        }
    }

    fn call(&self, u: &[f64], p: &[f64], t: f64, du: &mut [f64]) {
        self.nfev.set(self.nfev.get() + 1);
        if let Err(err) = self.f.call_inplace(u, p, t, du) {
            // poison the output so the integrator stops making progress
            du.fill(f64::NAN);
            let first = self.error.take().unwrap_or(err);
            self.error.set(Some(first));
        }
    }

    /// `J v ~ (f(u + sigma v) - f(u)) / sigma`
    fn jac_mul(&self, u: &[f64], p: &[f64], t: f64, v: &[f64], jv: &mut [f64]) {
        let vnorm = l2_norm(v);
        if vnorm == 0.0 {
            jv.fill(0.0);
            return;
        }
        let sigma = f64::EPSILON.sqrt() * (1.0 + l2_norm(u)) / vnorm;
        let mut scratch = self.scratch.borrow_mut();
        let (u_pert, f0) = &mut *scratch;
        u_pert.clear();
        u_pert.extend(u.iter().zip(v).map(|(ui, vi)| ui + sigma * vi));
        f0.resize(u.len(), 0.0);
        self.call(u, p, t, f0);
        self.call(u_pert, p, t, jv);
        for (jvi, f0i) in jv.iter_mut().zip(f0.iter()) {
            *jvi = (*jvi - f0i) / sigma;
        }
    }

    fn take_error(&self) -> Option<ConfigurationError> {
        self.error.take()
    }
}

/// Why the driver stopped early
enum Halt {
    Config(ConfigurationError),
    Failure(FailureReason),
}

/// State of one solve: budgets, counters and the samples collected so far.
struct Run<'r, F> {
    rhs: &'r Instrumented<F>,
    options: &'r SolveOptions,
    start: Instant,
    nsteps: usize,
    trajectory: Trajectory,
}

impl<'r, F: OdeFunction> Run<'r, F> {
    fn new(rhs: &'r Instrumented<F>, options: &'r SolveOptions, nstates: usize) -> Self {
        Self {
            rhs,
            options,
            start: Instant::now(),
            nsteps: 0,
            trajectory: Trajectory::new(nstates),
        }
    }

    fn check_rhs(&self) -> Result<(), Halt> {
        match self.rhs.take_error() {
            Some(err) => Err(Halt::Config(err)),
            None => Ok(()),
        }
    }

    fn drive<'a, Solver, Eqn>(
        &mut self,
        solver: Result<Solver, DiffsolError>,
        t_end: f64,
    ) -> Result<(), Halt>
    where
        Solver: OdeSolverMethod<'a, Eqn>,
        Eqn: OdeEquations<T = f64, V = V> + 'a,
    {
        // the solver evaluates f while computing its initial step
        self.check_rhs()?;
        let mut solver = solver.map_err(|err| Halt::Failure(failure_reason(err)))?;
        let options = self.options;
        match options.saveat.as_deref() {
            Some(saveat) => self.sample_at(&mut solver, saveat),
            None => self.sample_steps(&mut solver, t_end),
        }
    }

    /// Take one step, enforcing the budgets beforehand and checking the new state afterwards.
    fn step<'a, Solver, Eqn>(
        &mut self,
        solver: &mut Solver,
    ) -> Result<OdeSolverStopReason<f64>, Halt>
    where
        Solver: OdeSolverMethod<'a, Eqn>,
        Eqn: OdeEquations<T = f64, V = V> + 'a,
    {
        let time = solver.state().t;
        if self.nsteps >= self.options.max_steps {
            return Err(Halt::Failure(FailureReason::StepBudgetExceeded {
                max_steps: self.options.max_steps,
                time,
            }));
        }
        if let Some(max_wall_time) = self.options.max_wall_time {
            if self.start.elapsed() >= max_wall_time {
                return Err(Halt::Failure(FailureReason::WallTimeExceeded {
                    seconds: max_wall_time.as_secs_f64(),
                    time,
                }));
            }
        }

        let result = solver.step();
        self.check_rhs()?;
        let reason = result.map_err(|err| Halt::Failure(failure_reason(err)))?;
        self.nsteps += 1;

        let state = solver.state();
        trace!("step {} accepted at t = {}, h = {}", self.nsteps, state.t, state.h);
        if state.y.as_slice().iter().any(|y| !y.is_finite()) {
            return Err(Halt::Failure(FailureReason::NonFiniteState { time: state.t }));
        }
        Ok(reason)
    }

    /// Record the initial state and every accepted step up to `t_end`.
    fn sample_steps<'a, Solver, Eqn>(&mut self, solver: &mut Solver, t_end: f64) -> Result<(), Halt>
    where
        Solver: OdeSolverMethod<'a, Eqn>,
        Eqn: OdeEquations<T = f64, V = V> + 'a,
    {
        let state = solver.state();
        self.trajectory.push(state.t, state.y.as_slice());
        solver
            .set_stop_time(t_end)
            .map_err(|err| Halt::Failure(failure_reason(err)))?;
        loop {
            let reason = self.step(solver)?;
            let state = solver.state();
            match reason {
                OdeSolverStopReason::TstopReached => {
                    self.trajectory.push(t_end, state.y.as_slice());
                    return Ok(());
                }
                OdeSolverStopReason::InternalTimestep | OdeSolverStopReason::RootFound(_) => {
                    self.trajectory.push(state.t, state.y.as_slice());
                }
            }
        }
    }

    /// Record the solution at each of `saveat`, interpolating between steps.
    fn sample_at<'a, Solver, Eqn>(&mut self, solver: &mut Solver, saveat: &[f64]) -> Result<(), Halt>
    where
        Solver: OdeSolverMethod<'a, Eqn>,
        Eqn: OdeEquations<T = f64, V = V> + 'a,
    {
        let t0 = solver.state().t;
        if let Some(&t_last) = saveat.last() {
            if t_last > t0 {
                solver
                    .set_stop_time(t_last)
                    .map_err(|err| Halt::Failure(failure_reason(err)))?;
            }
        }
        for &t in saveat {
            while solver.state().t < t {
                self.step(solver)?;
            }
            let state = solver.state();
            if state.t == t {
                self.trajectory.push(t, state.y.as_slice());
            } else {
                let y = solver
                    .interpolate(t)
                    .map_err(|err| Halt::Failure(failure_reason(err)))?;
                self.check_rhs()?;
                self.trajectory.push(t, y.as_slice());
            }
        }
        Ok(())
    }

    fn finish(self, result: Result<(), Halt>) -> Result<Trajectory, SolveError> {
        let mut trajectory = self.trajectory;
        trajectory.stats = SolveStats {
            nsteps: self.nsteps,
            nfev: self.rhs.nfev.get(),
            elapsed: self.start.elapsed(),
        };
        match result {
            Ok(()) => {
                debug!(
                    "Solve finished: {} samples, {} steps, {} function evaluations in {:?}",
                    trajectory.len(),
                    trajectory.stats.nsteps,
                    trajectory.stats.nfev,
                    trajectory.stats.elapsed
                );
                Ok(trajectory)
            }
            Err(Halt::Config(err)) => Err(err.into()),
            Err(Halt::Failure(reason)) => {
                warn!(
                    "Solve failed after {} steps: {reason}",
                    trajectory.stats.nsteps
                );
                Err(NumericalFailure {
                    reason,
                    partial: trajectory,
                }
                .into())
            }
        }
    }
}
