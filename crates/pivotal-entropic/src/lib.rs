mod batch;
mod error;
mod ipfp;
mod log_domain;
mod matrix;
mod problem;
mod solution;
mod stabilized;

pub use batch::{solve_batch, value_path};
pub use error::TransportError;
pub use ipfp::{IpfpConfig, IpfpVariant, TransportSolver};
pub use log_domain::LogDomainIpfp;
pub use matrix::MatrixIpfp;
pub use problem::TransportProblem;
pub use solution::{col_sums, row_sums, sum_x_log_x, IterationReport, SolutionStatus, TransportSolution};
pub use stabilized::StabilizedIpfp;
