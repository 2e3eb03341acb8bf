use std::time::Instant;

use log::{debug, warn};

use crate::error::TransportError;
use crate::ipfp::{check_sigma, column_residual, ensure_finite, IpfpConfig, TransportSolver, LOG_EVERY};
use crate::problem::TransportProblem;
use crate::solution::{IterationReport, SolutionStatus, TransportSolution};

/// IPFP on scaling vectors `A = exp(−u/σ)`, `B = exp(−v/σ)` against the
/// kernel `K = exp(Φ/σ)`.
///
/// Cheapest per round, but `K` overflows once `max Φ/σ` passes ~709.
#[derive(Debug, Clone, Default)]
pub struct MatrixIpfp {
    config: IpfpConfig,
}

impl MatrixIpfp {
    pub const LABEL: &'static str = "ipfp-matrix";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IpfpConfig) -> Self {
        Self { config }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.config.tolerance = tol;
        self
    }
}

impl TransportSolver for MatrixIpfp {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn config(&self) -> &IpfpConfig {
        &self.config
    }

    fn solve(&self, problem: &TransportProblem, sigma: f64) -> Result<TransportSolution, TransportError> {
        check_sigma(sigma)?;
        problem.validate()?;
        let start = Instant::now();
        let (rows, cols) = (problem.num_rows(), problem.num_cols());
        let (n, m) = (&problem.n, &problem.m);

        let kernel: Vec<Vec<f64>> = problem
            .surplus
            .iter()
            .map(|row| row.iter().map(|phi| (phi / sigma).exp()).collect())
            .collect();
        for row in &kernel {
            ensure_finite(row, Self::LABEL, 0, sigma)?;
        }

        debug!("{}: {}x{} problem, sigma {}", Self::LABEL, rows, cols, sigma);

        let mut a = vec![1.0; rows];
        let mut b = vec![1.0; cols];
        let mut kt_a = vec![0.0; cols];
        let mut residual = f64::INFINITY;
        let mut status = SolutionStatus::DidNotConverge;
        let mut iterations = 0;

        for iteration in 1..=self.config.max_iterations {
            iterations = iteration;

            // A ← n / (K·B)
            for (x, ax) in a.iter_mut().enumerate() {
                let k_b: f64 = kernel[x].iter().zip(&b).map(|(k, by)| k * by).sum();
                *ax = n[x] / k_b;
            }
            ensure_finite(&a, Self::LABEL, iteration, sigma)?;

            kt_a.iter_mut().for_each(|s| *s = 0.0);
            for (row, ax) in kernel.iter().zip(&a) {
                for (s, k) in kt_a.iter_mut().zip(row) {
                    *s += k * ax;
                }
            }
            let col_sums: Vec<f64> = kt_a.iter().zip(&b).map(|(s, by)| s * by).collect();
            residual = column_residual(&col_sums, m);

            if residual < self.config.tolerance {
                status = SolutionStatus::Converged;
                break;
            }
            if iteration == self.config.max_iterations {
                break;
            }
            if iteration % LOG_EVERY == 0 {
                debug!("{}: iteration {}, residual {:.3e}", Self::LABEL, iteration, residual);
            }

            // B ← m / (Kᵗ·A)
            for ((by, my), s) in b.iter_mut().zip(m).zip(&kt_a) {
                *by = my / s;
            }
            ensure_finite(&b, Self::LABEL, iteration, sigma)?;
        }

        if status == SolutionStatus::DidNotConverge {
            warn!(
                "{}: no convergence after {} iterations (residual {:.3e}, sigma {})",
                Self::LABEL,
                iterations,
                residual,
                sigma
            );
        }

        let u: Vec<f64> = a.iter().map(|ax| -sigma * ax.ln()).collect();
        let v: Vec<f64> = b.iter().map(|by| -sigma * by.ln()).collect();
        ensure_finite(&u, Self::LABEL, iterations, sigma)?;
        ensure_finite(&v, Self::LABEL, iterations, sigma)?;

        let solution = TransportSolution::from_potentials(
            problem,
            sigma,
            u,
            v,
            IterationReport {
                status,
                residual,
                iterations,
                elapsed: start.elapsed(),
                label: Self::LABEL,
            },
        )?;
        debug!(
            "{}: {:?} after {} iterations, valobs {:.6}",
            Self::LABEL,
            status,
            iterations,
            solution.valobs
        );
        Ok(solution)
    }
}
