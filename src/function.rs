//! The derivative function contract: `(state, parameters, time) -> derivative`.
//!
//! A derivative function must be pure. The integrators call it many times per step, possibly at trial states that are
//! later rejected, so it must not rely on being called in any particular order.
//!
//! Closures are wrapped in one of the adapters below to select a calling convention:
//! - [Rhs]: out-of-place, `Fn(&[f64], &[f64], f64) -> Vec<f64>`. The returned length is checked on every call.
//! - [RhsInplace]: in-place, `Fn(&[f64], &[f64], f64, &mut [f64])`. No allocation per call and no length check.
//! - [ScalarRhs]: scalar problems, `Fn(f64, &[f64], f64) -> f64`.
//!
//! [crate::ExprRhs] implements the same trait by interpreting parsed equations.

use crate::error::ConfigurationError;

/// A derivative function `du/dt = f(u, p, t)`.
pub trait OdeFunction {
    /// Evaluate the derivative at `(u, p, t)` and write it into `du`, which has the same length as `u`.
    ///
    /// Returns [ConfigurationError::DimensionMismatch] if the function produces a derivative of a different length.
    fn call_inplace(
        &self,
        u: &[f64],
        p: &[f64],
        t: f64,
        du: &mut [f64],
    ) -> Result<(), ConfigurationError>;

    /// Number of components this function produces, if known without evaluating it.
    fn nout(&self) -> Option<usize> {
        None
    }

    /// Check the function against the initial state before any integration happens.
    fn check(&self, u0: &[f64], p: &[f64], t0: f64) -> Result<(), ConfigurationError> {
        if let Some(nout) = self.nout() {
            if nout != u0.len() {
                return Err(ConfigurationError::DimensionMismatch {
                    expected: u0.len(),
                    found: nout,
                });
            }
        }
        let mut du = vec![0.0; u0.len()];
        self.call_inplace(u0, p, t0, &mut du)
    }
}

impl<F: OdeFunction + ?Sized> OdeFunction for &F {
    fn call_inplace(
        &self,
        u: &[f64],
        p: &[f64],
        t: f64,
        du: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        (**self).call_inplace(u, p, t, du)
    }
    fn nout(&self) -> Option<usize> {
        (**self).nout()
    }
    fn check(&self, u0: &[f64], p: &[f64], t0: f64) -> Result<(), ConfigurationError> {
        (**self).check(u0, p, t0)
    }
}

impl<F: OdeFunction + ?Sized> OdeFunction for Box<F> {
    fn call_inplace(
        &self,
        u: &[f64],
        p: &[f64],
        t: f64,
        du: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        (**self).call_inplace(u, p, t, du)
    }
    fn nout(&self) -> Option<usize> {
        (**self).nout()
    }
    fn check(&self, u0: &[f64], p: &[f64], t0: f64) -> Result<(), ConfigurationError> {
        (**self).check(u0, p, t0)
    }
}

/// Out-of-place derivative: the closure returns a new vector.
#[derive(Clone, Copy)]
pub struct Rhs<F>(pub F);

impl<F> OdeFunction for Rhs<F>
where
    F: Fn(&[f64], &[f64], f64) -> Vec<f64>,
{
    fn call_inplace(
        &self,
        u: &[f64],
        p: &[f64],
        t: f64,
        du: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        let ret = (self.0)(u, p, t);
        if ret.len() != du.len() {
            return Err(ConfigurationError::DimensionMismatch {
                expected: du.len(),
                found: ret.len(),
            });
        }
        du.copy_from_slice(&ret);
        Ok(())
    }
}

/// In-place derivative: the closure writes into a buffer of the state's length.
///
/// The length of what the closure computes cannot be observed, so a mismatch is never reported as
/// [ConfigurationError::DimensionMismatch]. Writing past `du` panics inside the closure and components left unwritten
/// keep whatever the buffer held. Use [Rhs] or [crate::ExprRhs] when the output length should be checked.
#[derive(Clone, Copy)]
pub struct RhsInplace<F>(pub F);

impl<F> OdeFunction for RhsInplace<F>
where
    F: Fn(&[f64], &[f64], f64, &mut [f64]),
{
    #[inline]
    fn call_inplace(
        &self,
        u: &[f64],
        p: &[f64],
        t: f64,
        du: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        (self.0)(u, p, t, du);
        Ok(())
    }
}

/// Scalar derivative `du/dt = f(u, p, t)` for one-dimensional problems.
#[derive(Clone, Copy)]
pub struct ScalarRhs<F>(pub F);

impl<F> OdeFunction for ScalarRhs<F>
where
    F: Fn(f64, &[f64], f64) -> f64,
{
    fn call_inplace(
        &self,
        u: &[f64],
        p: &[f64],
        t: f64,
        du: &mut [f64],
    ) -> Result<(), ConfigurationError> {
        if u.len() != 1 {
            return Err(ConfigurationError::DimensionMismatch {
                expected: u.len(),
                found: 1,
            });
        }
        du[0] = (self.0)(u[0], p, t);
        Ok(())
    }

    fn nout(&self) -> Option<usize> {
        Some(1)
    }
}
