use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PivotError {
    /// The ratio test found no positive entry along the entering direction
    #[error("Unbounded ray: entering column has no positive component in the basis direction")]
    Unbounded,
    /// The basis matrix could not be factorised
    #[error("Singular basis matrix (degenerate pivot sequence)")]
    SingularBasis,
    #[error("Dimension mismatch in {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
