use log::debug;
use rayon::prelude::*;

use crate::error::TransportError;
use crate::ipfp::TransportSolver;
use crate::problem::TransportProblem;
use crate::solution::TransportSolution;

/// Solve one problem at several regularization levels in parallel.
///
/// Results come back in the order of `sigmas`; each run owns its own
/// potentials, so one failing level does not affect the others.
pub fn solve_batch<S>(
    solver: &S,
    problem: &TransportProblem,
    sigmas: &[f64],
) -> Vec<Result<TransportSolution, TransportError>>
where
    S: TransportSolver + Sync + ?Sized,
{
    debug!("{}: batch of {} sigma levels", solver.label(), sigmas.len());
    sigmas
        .par_iter()
        .map(|&sigma| solver.solve(problem, sigma))
        .collect()
}

/// Observed value per regularization level; the sequence approaches the
/// unregularized optimum as `σ` shrinks.
pub fn value_path<S>(
    solver: &S,
    problem: &TransportProblem,
    sigmas: &[f64],
) -> Result<Vec<(f64, f64)>, TransportError>
where
    S: TransportSolver + Sync + ?Sized,
{
    solve_batch(solver, problem, sigmas)
        .into_iter()
        .map(|result| result.map(|s| (s.sigma, s.valobs)))
        .collect()
}
