//! Reference problems with known behaviour, used by the tests, the benchmarks and the demo.

pub mod exponential_growth;
pub mod lorenz;
