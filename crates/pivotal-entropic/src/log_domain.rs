use std::time::Instant;

use log::{debug, warn};

use crate::error::TransportError;
use crate::ipfp::{
    check_sigma, column_residual, ensure_finite, soft_max, soft_max_stable, IpfpConfig, TransportSolver,
    LOG_EVERY,
};
use crate::problem::TransportProblem;
use crate::solution::{IterationReport, SolutionStatus, TransportSolution};

/// IPFP on the potentials `u`, `v` themselves:
/// `u_x ← λ_x + σ·log Σ_y exp((Φ_xy − v_y)/σ)` and symmetrically for `v`.
#[derive(Debug, Clone, Default)]
pub struct LogDomainIpfp {
    config: IpfpConfig,
}

impl LogDomainIpfp {
    pub const LABEL: &'static str = "ipfp-log";

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

impl TransportSolver for LogDomainIpfp {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn config(&self) -> &IpfpConfig {
        &self.config
    }

    fn solve(&self, problem: &TransportProblem, sigma: f64) -> Result<TransportSolution, TransportError> {
        iterate_potentials(problem, sigma, &self.config, Self::LABEL, false)
    }
}

/// Alternating potential updates shared by the plain and the stabilized
/// log-domain solvers; `stabilized` selects the max-shifted log-sum-exp.
pub(crate) fn iterate_potentials(
    problem: &TransportProblem,
    sigma: f64,
    config: &IpfpConfig,
    label: &'static str,
    stabilized: bool,
) -> Result<TransportSolution, TransportError> {
    check_sigma(sigma)?;
    problem.validate()?;
    let start = Instant::now();
    let (rows, cols) = (problem.num_rows(), problem.num_cols());
    let phi = &problem.surplus;

    let reduce = |len: usize, f: &dyn Fn(usize) -> f64| {
        if stabilized {
            soft_max_stable(len, sigma, f)
        } else {
            soft_max(len, sigma, f)
        }
    };
    let lambda: Vec<f64> = problem.n.iter().map(|nx| -sigma * nx.ln()).collect();
    let zeta: Vec<f64> = problem.m.iter().map(|my| -sigma * my.ln()).collect();

    debug!("{}: {}x{} problem, sigma {}", label, rows, cols, sigma);

    let mut u = vec![0.0; rows];
    let mut v = vec![0.0; cols];
    let mut residual = f64::INFINITY;
    let mut status = SolutionStatus::DidNotConverge;
    let mut iterations = 0;

    for iteration in 1..=config.max_iterations {
        iterations = iteration;

        for x in 0..rows {
            u[x] = lambda[x] + reduce(cols, &|y| phi[x][y] - v[y]);
        }
        ensure_finite(&u, label, iteration, sigma)?;

        let col_sums: Vec<f64> = (0..cols)
            .map(|y| (0..rows).map(|x| ((phi[x][y] - u[x] - v[y]) / sigma).exp()).sum())
            .collect();
        residual = column_residual(&col_sums, &problem.m);

        if residual < config.tolerance {
            status = SolutionStatus::Converged;
            break;
        }
        if iteration == config.max_iterations {
            break;
        }
        if iteration % LOG_EVERY == 0 {
            debug!("{}: iteration {}, residual {:.3e}", label, iteration, residual);
        }

        for y in 0..cols {
            v[y] = zeta[y] + reduce(rows, &|x| phi[x][y] - u[x]);
        }
        ensure_finite(&v, label, iteration, sigma)?;
    }

    if status == SolutionStatus::DidNotConverge {
        warn!(
            "{}: no convergence after {} iterations (residual {:.3e}, sigma {})",
            label, iterations, residual, sigma
        );
    }

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
            label,
        },
    )?;
    debug!(
        "{}: {:?} after {} iterations, valobs {:.6}",
        label, status, iterations, solution.valobs
    );
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced() -> TransportProblem {
        TransportProblem::new(
            vec![
                vec![0.1, 0.9, 0.4],
                vec![0.7, 0.2, 0.5],
                vec![0.3, 0.6, 1.0],
            ],
            vec![1.0 / 3.0; 3],
            vec![1.0 / 3.0; 3],
        )
        .unwrap()
    }

    #[test]
    fn test_marginals_hold_at_convergence() {
        let problem = balanced();
        let solution = LogDomainIpfp::new().solve(&problem, 0.1).unwrap();

        assert_eq!(solution.status, SolutionStatus::Converged);
        assert_eq!(solution.label, "ipfp-log");
        assert!(solution.marginal_error < 1e-9);
    }

    #[test]
    fn test_potentials_define_the_coupling() {
        let problem = balanced();
        let sigma = 0.2;
        let solution = LogDomainIpfp::new().solve(&problem, sigma).unwrap();
        for x in 0..3 {
            for y in 0..3 {
                let expected = ((problem.surplus[x][y] - solution.u[x] - solution.v[y]) / sigma).exp();
                assert!((solution.coupling[x][y] - expected).abs() < 1e-15);
            }
        }
    }

    #[test]
    fn test_overflow_is_an_instability() {
        let err = LogDomainIpfp::new().solve(&balanced(), 0.001).unwrap_err();
        assert!(matches!(
            err,
            TransportError::NumericalInstability {
                label: "ipfp-log",
                iteration: 1,
                ..
            }
        ));
    }
}
