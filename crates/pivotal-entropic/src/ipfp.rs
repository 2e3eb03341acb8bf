use std::fmt;

use crate::error::TransportError;
use crate::log_domain::LogDomainIpfp;
use crate::matrix::MatrixIpfp;
use crate::problem::TransportProblem;
use crate::solution::TransportSolution;
use crate::stabilized::StabilizedIpfp;

/// Iteration controls shared by every IPFP variant
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IpfpConfig {
    /// Maximum row/column update rounds
    pub max_iterations: usize,
    /// Target for `max_y |col_sum_y / m_y − 1|`
    pub tolerance: f64,
}

impl Default for IpfpConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            tolerance: 1e-9,
        }
    }
}

/// Progress is logged every this many rounds
pub(crate) const LOG_EVERY: usize = 1000;

/// An algorithm computing the entropic coupling of a [`TransportProblem`].
pub trait TransportSolver {
    /// Name reported in [`TransportSolution::label`]
    fn label(&self) -> &'static str;

    fn config(&self) -> &IpfpConfig;

    /// Solve at regularization `sigma`. Hitting the iteration cap is not an
    /// error; the returned solution carries `DidNotConverge` instead.
    fn solve(&self, problem: &TransportProblem, sigma: f64) -> Result<TransportSolution, TransportError>;
}

/// The three numerical representations of the same fixed point
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpfpVariant {
    /// Scaling vectors against the kernel `exp(Φ/σ)`
    Matrix,
    /// Potentials with plain `log Σ exp`
    LogDomain,
    /// Potentials with max-shifted `log Σ exp`
    #[default]
    Stabilized,
}

impl IpfpVariant {
    pub const ALL: [IpfpVariant; 3] = [IpfpVariant::Matrix, IpfpVariant::LogDomain, IpfpVariant::Stabilized];

    pub fn solver(self, config: IpfpConfig) -> Box<dyn TransportSolver + Send + Sync> {
        match self {
            IpfpVariant::Matrix => Box::new(MatrixIpfp::with_config(config)),
            IpfpVariant::LogDomain => Box::new(LogDomainIpfp::with_config(config)),
            IpfpVariant::Stabilized => Box::new(StabilizedIpfp::with_config(config)),
        }
    }
}

impl fmt::Display for IpfpVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpfpVariant::Matrix => write!(f, "matrix"),
            IpfpVariant::LogDomain => write!(f, "log"),
            IpfpVariant::Stabilized => write!(f, "stabilized"),
        }
    }
}

pub(crate) fn check_sigma(sigma: f64) -> Result<(), TransportError> {
    if sigma.is_finite() && sigma > 0.0 {
        Ok(())
    } else {
        Err(TransportError::InvalidRegularization(sigma))
    }
}

/// Fails with `NumericalInstability` unless every value is finite.
pub(crate) fn ensure_finite(
    values: &[f64],
    label: &'static str,
    iteration: usize,
    sigma: f64,
) -> Result<(), TransportError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(TransportError::NumericalInstability {
            label,
            iteration,
            sigma,
        })
    }
}

/// `max_y |col_sum_y / m_y − 1|`
pub(crate) fn column_residual(col_sums: &[f64], m: &[f64]) -> f64 {
    col_sums
        .iter()
        .zip(m)
        .map(|(s, my)| (s / my - 1.0).abs())
        .fold(0.0, f64::max)
}

/// `σ·log Σ_i exp(f(i)/σ)` computed naively
pub(crate) fn soft_max(len: usize, sigma: f64, f: impl Fn(usize) -> f64) -> f64 {
    sigma * (0..len).map(|i| (f(i) / sigma).exp()).sum::<f64>().ln()
}

/// `σ·log Σ_i exp(f(i)/σ)` after shifting by the largest `f(i)`
pub(crate) fn soft_max_stable(len: usize, sigma: f64, f: impl Fn(usize) -> f64) -> f64 {
    let max = (0..len).map(&f).fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + sigma * (0..len).map(|i| ((f(i) - max) / sigma).exp()).sum::<f64>().ln()
}
