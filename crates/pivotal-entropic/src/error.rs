use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// Marginal entries must be strictly positive and finite
    #[error("Invalid marginal {which}[{index}] = {value}")]
    InvalidMarginal {
        which: &'static str,
        index: usize,
        value: f64,
    },
    #[error("Marginals carry different mass: rows {rows}, columns {cols}")]
    MassMismatch { rows: f64, cols: f64 },
    #[error("Regularization must be positive and finite, got {0}")]
    InvalidRegularization(f64),
    /// Overflow or underflow in the potentials or the kernel
    #[error(
        "{label} produced a non-finite value at iteration {iteration} (sigma = {sigma}); use the stabilized variant"
    )]
    NumericalInstability {
        label: &'static str,
        iteration: usize,
        sigma: f64,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
