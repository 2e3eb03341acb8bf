use std::time::Duration;

use crate::error::TransportError;
use crate::problem::TransportProblem;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// Column residual fell below the tolerance
    Converged,
    /// The iteration cap was hit; the solution is the last iterate
    DidNotConverge,
}

/// Entropic coupling `μ_xy = exp((Φ_xy − u_x − v_y)/σ)` with its diagnostics
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct TransportSolution {
    pub status: SolutionStatus,
    pub sigma: f64,
    pub coupling: Vec<Vec<f64>>,
    /// Row potentials
    pub u: Vec<f64>,
    /// Column potentials
    pub v: Vec<f64>,
    /// Observed surplus `Σ μ·Φ`
    pub valobs: f64,
    /// Regularised value `valobs − σ·Σ μ·log μ`
    pub valtot: f64,
    /// `max_y |col_sum_y / m_y − 1|` at the last row update
    pub residual: f64,
    pub row_sums: Vec<f64>,
    pub col_sums: Vec<f64>,
    /// Largest absolute deviation of either set of sums from its marginal
    pub marginal_error: f64,
    /// Mass of each row type left single (matching markets only)
    pub unmatched_rows: Option<Vec<f64>>,
    /// Mass of each column type left single (matching markets only)
    pub unmatched_cols: Option<Vec<f64>>,
    pub iterations: usize,
    pub elapsed: Duration,
    pub label: &'static str,
}

/// Loop outcome handed to [`TransportSolution::from_potentials`]
#[derive(Debug, Clone, Copy)]
pub struct IterationReport {
    pub status: SolutionStatus,
    pub residual: f64,
    pub iterations: usize,
    pub elapsed: Duration,
    pub label: &'static str,
}

impl TransportSolution {
    /// Rebuild the coupling from the final potentials and compute every diagnostic.
    pub fn from_potentials(
        problem: &TransportProblem,
        sigma: f64,
        u: Vec<f64>,
        v: Vec<f64>,
        report: IterationReport,
    ) -> Result<Self, TransportError> {
        let coupling: Vec<Vec<f64>> = problem
            .surplus
            .iter()
            .zip(&u)
            .map(|(row, ux)| {
                row.iter()
                    .zip(&v)
                    .map(|(phi, vy)| ((phi - ux - vy) / sigma).exp())
                    .collect()
            })
            .collect();
        if coupling.iter().flatten().any(|x| !x.is_finite()) {
            return Err(TransportError::NumericalInstability {
                label: report.label,
                iteration: report.iterations,
                sigma,
            });
        }

        let valobs = problem
            .surplus
            .iter()
            .flatten()
            .zip(coupling.iter().flatten())
            .map(|(phi, mu)| phi * mu)
            .sum::<f64>();
        let valtot = valobs - sigma * sum_x_log_x(coupling.iter().flatten().copied());

        let row_sums = row_sums(&coupling);
        let col_sums = col_sums(&coupling, problem.num_cols());
        let marginal_error = max_abs_diff(&row_sums, &problem.n).max(max_abs_diff(&col_sums, &problem.m));

        let (unmatched_rows, unmatched_cols) = if problem.outside_options {
            let last_row = problem.num_rows() - 1;
            let last_col = problem.num_cols() - 1;
            (
                Some(coupling[..last_row].iter().map(|row| row[last_col]).collect()),
                Some(coupling[last_row][..last_col].to_vec()),
            )
        } else {
            (None, None)
        };

        Ok(Self {
            status: report.status,
            sigma,
            coupling,
            u,
            v,
            valobs,
            valtot,
            residual: report.residual,
            row_sums,
            col_sums,
            marginal_error,
            unmatched_rows,
            unmatched_cols,
            iterations: report.iterations,
            elapsed: report.elapsed,
            label: report.label,
        })
    }

    /// Frobenius distance between two couplings of the same shape
    pub fn coupling_distance(&self, other: &TransportSolution) -> f64 {
        self.coupling
            .iter()
            .flatten()
            .zip(other.coupling.iter().flatten())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

/// `Σ x·log x` with `0·log 0 = 0`
pub fn sum_x_log_x(values: impl IntoIterator<Item = f64>) -> f64 {
    values
        .into_iter()
        .filter(|&x| x > 0.0)
        .map(|x| x * x.ln())
        .sum()
}

pub fn row_sums(coupling: &[Vec<f64>]) -> Vec<f64> {
    coupling.iter().map(|row| row.iter().sum()).collect()
}

pub fn col_sums(coupling: &[Vec<f64>], cols: usize) -> Vec<f64> {
    let mut sums = vec![0.0; cols];
    for row in coupling {
        for (s, x) in sums.iter_mut().zip(row) {
            *s += x;
        }
    }
    sums
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> IterationReport {
        IterationReport {
            status: SolutionStatus::Converged,
            residual: 0.0,
            iterations: 1,
            elapsed: Duration::ZERO,
            label: "test",
        }
    }

    #[test]
    fn test_x_log_x_treats_zero_as_zero() {
        assert_eq!(sum_x_log_x([0.0, 1.0]), 0.0);
        let half = sum_x_log_x([0.5, 0.5, 0.0]);
        assert!((half - 0.5f64.ln()).abs() < 1e-15);
        assert!(!sum_x_log_x([0.0; 4]).is_nan());
    }

    #[test]
    fn test_independent_coupling_from_potentials() {
        // Zero surplus, u = −σ log n, v = −σ log m gives μ = n·mᵀ
        let sigma = 0.5;
        let problem = TransportProblem::new(
            vec![vec![0.0; 2]; 2],
            vec![0.25, 0.75],
            vec![0.5, 0.5],
        )
        .unwrap();
        let u = problem.n.iter().map(|x| -sigma * x.ln()).collect();
        let v = problem.m.iter().map(|y| -sigma * y.ln()).collect();
        let solution = TransportSolution::from_potentials(&problem, sigma, u, v, report()).unwrap();

        assert!((solution.coupling[0][0] - 0.125).abs() < 1e-12);
        assert!((solution.coupling[1][1] - 0.375).abs() < 1e-12);
        assert!(solution.marginal_error < 1e-12);
        assert_eq!(solution.valobs, 0.0);
        let entropy = sum_x_log_x([0.125, 0.125, 0.375, 0.375]);
        assert!((solution.valtot + sigma * entropy).abs() < 1e-12);
        assert!(solution.unmatched_rows.is_none());
    }

    #[test]
    fn test_overflowing_potentials_are_reported() {
        let problem = TransportProblem::new(vec![vec![1.0]], vec![1.0], vec![1.0]).unwrap();
        let err = TransportSolution::from_potentials(&problem, 1e-3, vec![0.0], vec![0.0], report())
            .unwrap_err();
        assert!(matches!(err, TransportError::NumericalInstability { iteration: 1, .. }));
    }

    #[test]
    fn test_sums() {
        let coupling = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
        assert_eq!(col_sums(&coupling, 2).len(), 2);
        assert!((row_sums(&coupling)[1] - 0.7).abs() < 1e-15);
        assert!((col_sums(&coupling, 2)[0] - 0.4).abs() < 1e-15);
    }
}
