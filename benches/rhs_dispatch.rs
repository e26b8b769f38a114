use criterion::{criterion_group, criterion_main, Criterion};
use diffsol_ivp::{
    solve,
    test_models::{
        exponential_growth::exponential_growth_problem,
        lorenz::{lorenz, lorenz_expr, LORENZ_P, LORENZ_U0},
    },
    Algorithm, OdeFunction, RhsInplace, SolveOptions,
};

fn criterion_benchmark(c: &mut Criterion) {
    let expr = lorenz_expr().unwrap();

    // a single derivative evaluation, compiled vs interpreted
    let u = [1.5, -0.5, 20.0];
    let mut du = [0.0; 3];
    c.bench_function("lorenz_rhs_compiled", |b| {
        let f = RhsInplace(lorenz);
        b.iter(|| f.call_inplace(&u, &LORENZ_P, 0.0, &mut du).unwrap())
    });
    c.bench_function("lorenz_rhs_interpreted", |b| {
        b.iter(|| expr.call_inplace(&u, &LORENZ_P, 0.0, &mut du).unwrap())
    });

    macro_rules! bench_lorenz {
        ($name:ident, $alg:expr, $f:expr, $t_end:expr) => {
            c.bench_function(stringify!($name), |b| {
                let options = SolveOptions::default()
                    .p(LORENZ_P)
                    .alg($alg)
                    .rtol(1e-8)
                    .atol(1e-8);
                b.iter(|| solve($f, &LORENZ_U0, (0.0, $t_end), &options).unwrap())
            });
        };
    }

    bench_lorenz!(
        tsit45_lorenz_compiled,
        Algorithm::Tsit45,
        RhsInplace(lorenz),
        10.0
    );
    bench_lorenz!(tsit45_lorenz_interpreted, Algorithm::Tsit45, &expr, 10.0);
    bench_lorenz!(bdf_lorenz_compiled, Algorithm::Bdf, RhsInplace(lorenz), 1.0);
    bench_lorenz!(bdf_lorenz_interpreted, Algorithm::Bdf, &expr, 1.0);

    macro_rules! bench_growth {
        ($name:ident, $alg:expr) => {
            c.bench_function(stringify!($name), |b| {
                let (problem, _soln) = exponential_growth_problem();
                let problem = problem.alg($alg);
                b.iter(|| problem.solve().unwrap())
            });
        };
    }

    bench_growth!(bdf_exponential_growth, Algorithm::Bdf);
    bench_growth!(tr_bdf2_exponential_growth, Algorithm::TrBdf2);
    bench_growth!(esdirk34_exponential_growth, Algorithm::Esdirk34);
    bench_growth!(tsit45_exponential_growth, Algorithm::Tsit45);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
