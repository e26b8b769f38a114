use std::{io, time::Duration};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Counters collected during a solve
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveStats {
    /// Number of internal steps taken by the integrator
    pub nsteps: usize,
    /// Number of evaluations of the derivative function, including those used for Jacobians
    pub nfev: usize,
    /// Wall-clock time spent in the solve
    pub elapsed: Duration,
}

/// A sampled solution: one state vector per sample time.
///
/// States are stored row-major, so `states()` and `state(i)` are contiguous slices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryRepr")]
pub struct Trajectory {
    t: Vec<f64>,
    y: Vec<f64>,
    nstates: usize,
    pub stats: SolveStats,
}

/// Serialized form of [Trajectory], checked before it is accepted
#[derive(Deserialize)]
struct TrajectoryRepr {
    t: Vec<f64>,
    y: Vec<f64>,
    nstates: usize,
    #[serde(default)]
    stats: SolveStats,
}

impl TryFrom<TrajectoryRepr> for Trajectory {
    type Error = String;

    fn try_from(repr: TrajectoryRepr) -> Result<Self, Self::Error> {
        if repr.nstates == 0 && !repr.t.is_empty() {
            return Err("nstates must be positive for a non-empty trajectory".to_string());
        }
        if repr.y.len() != repr.t.len() * repr.nstates {
            return Err(format!(
                "expected {} state values for {} samples of dimension {}, got {}",
                repr.t.len() * repr.nstates,
                repr.t.len(),
                repr.nstates,
                repr.y.len()
            ));
        }
        Ok(Self {
            t: repr.t,
            y: repr.y,
            nstates: repr.nstates,
            stats: repr.stats,
        })
    }
}

impl Trajectory {
    pub(crate) fn new(nstates: usize) -> Self {
        Self {
            t: Vec::new(),
            y: Vec::new(),
            nstates,
            stats: SolveStats::default(),
        }
    }

    /// Build a trajectory from sample times and one state vector per time.
    ///
    /// Panics if the states do not all have the same length, or if the number of states differs from the number of
    /// times.
    pub fn from_samples(t: Vec<f64>, states: Vec<Vec<f64>>) -> Self {
        assert_eq!(t.len(), states.len(), "one state per sample time");
        let nstates = states.first().map_or(0, Vec::len);
        let mut ret = Self::new(nstates);
        for (ti, yi) in t.into_iter().zip(states) {
            ret.push(ti, &yi);
        }
        ret
    }

    pub(crate) fn push(&mut self, t: f64, y: &[f64]) {
        assert_eq!(y.len(), self.nstates, "state has wrong length");
        self.t.push(t);
        self.y.extend_from_slice(y);
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Dimension of each state vector
    pub fn nstates(&self) -> usize {
        self.nstates
    }

    pub fn times(&self) -> &[f64] {
        &self.t
    }

    /// All states, row-major (`len() * nstates()` values)
    pub fn states(&self) -> &[f64] {
        &self.y
    }

    /// State at sample `i`
    pub fn state(&self, i: usize) -> &[f64] {
        &self.y[i * self.nstates..(i + 1) * self.nstates]
    }

    /// Time series of component `j`
    pub fn component(&self, j: usize) -> Vec<f64> {
        assert!(j < self.nstates, "component index out of range");
        self.y
            .iter()
            .skip(j)
            .step_by(self.nstates)
            .copied()
            .collect()
    }

    /// The last sample, if any
    pub fn last(&self) -> Option<(f64, &[f64])> {
        let n = self.len();
        (n > 0).then(|| (self.t[n - 1], self.state(n - 1)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &[f64])> + '_ {
        self.t.iter().copied().zip(self.y.chunks_exact(self.nstates.max(1)))
    }

    /// Flatten a one-dimensional trajectory to its scalar values. Returns `None` for systems.
    pub fn scalar_values(&self) -> Option<&[f64]> {
        (self.nstates == 1).then_some(self.y.as_slice())
    }

    /// Reshape into a table with one row per sample: the time in the first column followed by one column per state.
    pub fn to_table(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), self.nstates + 1, |i, j| match j {
            0 => self.t[i],
            _ => self.y[i * self.nstates + j - 1],
        })
    }

    /// Write the table from [Self::to_table] as CSV, with a header row `t,u1,...,un`.
    pub fn to_csv<W: io::Write>(&self, w: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(w);
        let header = std::iter::once("t".to_string())
            .chain((1..=self.nstates).map(|j| format!("u{j}")));
        wtr.write_record(header)?;
        for (t, y) in self.iter() {
            let row = std::iter::once(t).chain(y.iter().copied());
            wtr.write_record(row.map(|x| x.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Largest absolute difference between the states of two trajectories sampled at the same times.
    ///
    /// Returns `None` if the sample times or state dimensions differ.
    pub fn max_abs_diff(&self, other: &Trajectory) -> Option<f64> {
        if self.t != other.t || self.nstates != other.nstates {
            return None;
        }
        Some(
            self.y
                .iter()
                .zip(other.y.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }

    /// True if both trajectories have the same sample times and every state component satisfies
    /// `|a - b| <= atol + rtol * |b|`.
    pub fn agrees_with(&self, other: &Trajectory, rtol: f64, atol: f64) -> bool {
        self.t == other.t
            && self.nstates == other.nstates
            && self
                .y
                .iter()
                .zip(other.y.iter())
                .all(|(a, b)| (a - b).abs() <= atol + rtol * b.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> Trajectory {
        Trajectory::from_samples(
            vec![0.0, 0.5, 1.0],
            vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
        )
    }

    #[test]
    fn accessors() {
        let traj = example();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.nstates(), 2);
        assert_eq!(traj.times(), &[0.0, 0.5, 1.0]);
        assert_eq!(traj.state(1), &[2.0, 20.0]);
        assert_eq!(traj.component(1), vec![10.0, 20.0, 30.0]);
        assert_eq!(traj.last(), Some((1.0, &[3.0, 30.0][..])));
        assert!(traj.scalar_values().is_none());
        let samples = traj.iter().collect::<Vec<_>>();
        assert_eq!(samples[2], (1.0, &[3.0, 30.0][..]));
    }

    #[test]
    fn table_has_time_column() {
        let table = example().to_table();
        assert_eq!(table.shape(), (3, 3));
        insta::assert_snapshot!(format!("{:?}", table.row(1).iter().collect::<Vec<_>>()), @"[0.5, 2.0, 20.0]");
        assert_eq!(table[(2, 0)], 1.0);
        assert_eq!(table[(0, 2)], 10.0);
    }

    #[test]
    fn csv_output() {
        let mut out = Vec::new();
        example().to_csv(&mut out).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        t,u1,u2
        0,1,10
        0.5,2,20
        1,3,30
        ");
    }

    #[test]
    fn csv_reports_writer_errors() {
        struct Broken;
        impl io::Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let err = example().to_csv(Broken).unwrap_err();
        assert!(matches!(err.kind(), csv::ErrorKind::Io(_)));
    }

    #[test]
    fn deserialize_checks_lengths() {
        let json = serde_json::to_string(&example()).unwrap();
        let traj: Trajectory = serde_json::from_str(&json).unwrap();
        assert_eq!(traj, example());

        let err =
            serde_json::from_str::<Trajectory>(r#"{ "t": [0.0, 1.0], "y": [1.0], "nstates": 1 }"#)
                .unwrap_err();
        assert!(err
            .to_string()
            .contains("expected 2 state values for 2 samples of dimension 1, got 1"));

        let err = serde_json::from_str::<Trajectory>(r#"{ "t": [0.0], "y": [], "nstates": 0 }"#)
            .unwrap_err();
        assert!(err.to_string().contains("nstates must be positive"));

        let empty: Trajectory = serde_json::from_str(r#"{ "t": [], "y": [], "nstates": 2 }"#).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.to_table().shape(), (0, 3));
    }

    #[test]
    fn scalar_flatten() {
        let traj = Trajectory::from_samples(vec![0.0, 1.0], vec![vec![0.5], vec![1.5]]);
        assert_eq!(traj.scalar_values(), Some(&[0.5, 1.5][..]));
    }

    #[test]
    fn comparison() {
        let a = example();
        let mut b = example();
        b.y[3] += 1e-9;
        assert_eq!(a.max_abs_diff(&a), Some(0.0));
        assert!(a.max_abs_diff(&b).unwrap() > 0.0);
        assert!(a.agrees_with(&b, 1e-6, 1e-6));
        b.y[3] += 1.0;
        assert!(!a.agrees_with(&b, 1e-6, 1e-6));

        let c = Trajectory::from_samples(vec![0.0, 0.5], vec![vec![1.0, 10.0], vec![2.0, 20.0]]);
        assert_eq!(a.max_abs_diff(&c), None);
        assert!(!a.agrees_with(&c, 1.0, 1.0));
    }
}
