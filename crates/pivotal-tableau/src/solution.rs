use std::time::Duration;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolutionStatus {
    /// The algorithm reached its termination criterion
    Optimal,
    /// The iteration cap was hit; the solution is the last iterate
    DidNotConverge,
}

/// Result of the slack-basis primal simplex
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct LpSolution {
    pub status: SolutionStatus,
    /// Values of the structural variables
    pub values: Vec<f64>,
    /// Shadow price per constraint row, in the sense of the original objective
    pub shadow_prices: Vec<f64>,
    pub objective_value: f64,
    pub iterations: usize,
    pub elapsed: Duration,
    pub label: &'static str,
}

/// A cutting pattern kept in the final basis
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PatternUsage {
    /// Pieces of each item width cut from one roll
    pub pattern: Vec<usize>,
    /// Number of rolls cut this way (LP relaxation, fractional)
    pub rolls: f64,
}

/// Result of column generation on a cutting-stock instance
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct CuttingStockSolution {
    pub status: SolutionStatus,
    /// Basic patterns with their usage
    pub patterns: Vec<PatternUsage>,
    /// Dual price of one unit of each item at the last iterate
    pub prices: Vec<f64>,
    /// Total rolls used, `Σ x_B`
    pub objective_value: f64,
    /// Objective after the initial basis and after every pivot
    pub history: Vec<f64>,
    /// Accepted pivots (generated columns)
    pub iterations: usize,
    pub elapsed: Duration,
    pub label: &'static str,
}

/// Result of complementary pivoting on an LCP
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct LcpSolution {
    pub status: SolutionStatus,
    /// `z` at the final basis
    pub z: Vec<f64>,
    /// `w = M·z + q` at the final basis
    pub w: Vec<f64>,
    pub pivots: usize,
    pub elapsed: Duration,
    pub label: &'static str,
}

/// Mixed-strategy Nash equilibrium of a bimatrix game
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct NashEquilibrium {
    pub status: SolutionStatus,
    /// Row player's mixed strategy `p`
    pub row_strategy: Vec<f64>,
    /// Column player's mixed strategy `q`
    pub column_strategy: Vec<f64>,
    /// `pᵀ·A·q` in the original payoff scale
    pub row_payoff: f64,
    /// `pᵀ·B·q` in the original payoff scale
    pub column_payoff: f64,
    pub pivots: usize,
    pub elapsed: Duration,
    pub label: &'static str,
}

impl NashEquilibrium {
    /// Whether the two strategies are equal up to `tol` in every coordinate
    pub fn same_profile(&self, other: &NashEquilibrium, tol: f64) -> bool {
        let close = |a: &[f64], b: &[f64]| a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tol);
        close(&self.row_strategy, &other.row_strategy)
            && close(&self.column_strategy, &other.column_strategy)
    }
}
