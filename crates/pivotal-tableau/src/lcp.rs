use std::time::Instant;

use log::{debug, trace, warn};

use crate::error::PivotError;
use crate::solution::{LcpSolution, SolutionStatus};
use crate::tableau::{Column, Pivotable, Tableau, VarId};

/// Linear complementarity problem: find `z ≥ 0` with `w = M·z + q ≥ 0` and `zᵀw = 0`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Lcp {
    /// Row-major `k×k` matrix
    pub m: Vec<Vec<f64>>,
    pub q: Vec<f64>,
}

impl Lcp {
    pub fn new(m: Vec<Vec<f64>>, q: Vec<f64>) -> Result<Self, PivotError> {
        let k = q.len();
        if k == 0 {
            return Err(PivotError::InvalidInput("empty LCP".to_string()));
        }
        if m.len() != k {
            return Err(PivotError::DimensionMismatch {
                what: "LCP matrix rows",
                expected: k,
                found: m.len(),
            });
        }
        if let Some(row) = m.iter().find(|row| row.len() != k) {
            return Err(PivotError::DimensionMismatch {
                what: "LCP matrix columns",
                expected: k,
                found: row.len(),
            });
        }
        if m.iter().flatten().chain(&q).any(|v| !v.is_finite()) {
            return Err(PivotError::InvalidInput("LCP data must be finite".to_string()));
        }
        Ok(Self { m, q })
    }

    /// LCP of a bimatrix game with positive payoffs `a` (I×J) and `b` (I×J):
    /// `M = −[[0, A], [Bᵀ, 0]]`, `q = 1`, with `z = (x, y)`.
    pub fn bimatrix(a: &[Vec<f64>], b: &[Vec<f64>]) -> Result<Self, PivotError> {
        let rows = a.len();
        let cols = a.first().map_or(0, |r| r.len());
        if b.len() != rows {
            return Err(PivotError::DimensionMismatch {
                what: "column player payoff rows",
                expected: rows,
                found: b.len(),
            });
        }
        for row in a.iter().chain(b) {
            if row.len() != cols {
                return Err(PivotError::DimensionMismatch {
                    what: "payoff columns",
                    expected: cols,
                    found: row.len(),
                });
            }
        }

        let k = rows + cols;
        let mut m = vec![vec![0.0; k]; k];
        for i in 0..rows {
            for j in 0..cols {
                m[i][rows + j] = -a[i][j];
                m[rows + j][i] = -b[i][j];
            }
        }
        Self::new(m, vec![1.0; k])
    }

    pub fn dim(&self) -> usize {
        self.q.len()
    }

    /// `M·z + q`
    pub fn slack(&self, z: &[f64]) -> Vec<f64> {
        self.m
            .iter()
            .zip(&self.q)
            .map(|(row, q)| row.iter().zip(z).map(|(a, b)| a * b).sum::<f64>() + q)
            .collect()
    }

    /// `I·w − M·z = q` with `z_i` as variable `i` and `w_i` as variable `k + i`,
    /// starting from the basis of all `w`.
    fn tableau(&self) -> Result<Tableau, PivotError> {
        let k = self.dim();
        let mut columns = Vec::with_capacity(2 * k);
        for j in 0..k {
            let coefficients = self.m.iter().map(|row| -row[j]).collect();
            columns.push(Column::new(format!("z_{}", j), coefficients, 0.0));
        }
        for i in 0..k {
            let mut unit = vec![0.0; k];
            unit[i] = 1.0;
            columns.push(Column::new(format!("w_{}", i), unit, 0.0));
        }
        Tableau::new(columns, (k..2 * k).collect(), self.q.clone())
    }
}

/// The other member of the pair `(z_i, w_i)`
pub fn complement(var: VarId, k: usize) -> VarId {
    if var < k { var + k } else { var - k }
}

/// Whether exactly one variable of every complementary pair is basic
pub fn is_complementary<P: Pivotable>(tableau: &P, k: usize) -> bool {
    (0..k).all(|i| tableau.is_basic(i) != tableau.is_basic(i + k))
}

/// Complementary pivoting from the trivial solution `z = 0, w = q`.
///
/// `z_label` enters first; afterwards the complement of whatever just left
/// the basis enters, until every pair has exactly one basic member again.
pub struct LemkeHowson {
    /// Maximum pivots before giving up
    max_iterations: usize,
    /// Tolerance for the ratio test
    tolerance: f64,
}

impl Default for LemkeHowson {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl LemkeHowson {
    pub const LABEL: &'static str = "lemke-howson";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn solve(&self, lcp: &Lcp, label: usize) -> Result<LcpSolution, PivotError> {
        let start = Instant::now();
        let k = lcp.dim();
        if label >= k {
            return Err(PivotError::InvalidInput(format!(
                "missing label {} out of range for an LCP of size {}",
                label, k
            )));
        }
        if let Some(i) = lcp.q.iter().position(|&v| v < 0.0) {
            return Err(PivotError::InvalidInput(format!(
                "q[{}] = {} is negative; complementary pivoting needs the trivial start z = 0",
                i, lcp.q[i]
            )));
        }

        let mut tableau = lcp.tableau()?.with_tolerance(self.tolerance);
        debug!("lemke-howson: {} complementary pairs, dropping label {}", k, label);

        let mut entering = label;
        let mut pivots = 0;
        let mut status = SolutionStatus::DidNotConverge;
        while pivots < self.max_iterations {
            let departing = tableau.pivot(entering)?;
            pivots += 1;
            trace!(
                "pivot {}: {} entered, {} left",
                pivots,
                tableau.name(entering),
                tableau.name(departing)
            );
            if is_complementary(&tableau, k) {
                status = SolutionStatus::Optimal;
                break;
            }
            entering = complement(departing, k);
        }

        if status == SolutionStatus::DidNotConverge {
            warn!(
                "lemke-howson stopped after {} pivots without a complementary basis",
                pivots
            );
        }

        tableau.refresh()?;
        let z: Vec<f64> = (0..k).map(|i| tableau.value(i)).collect();
        let w: Vec<f64> = (k..2 * k).map(|i| tableau.value(i)).collect();
        debug!("lemke-howson finished: {:?} after {} pivots", status, pivots);

        Ok(LcpSolution {
            status,
            z,
            w,
            pivots,
            elapsed: start.elapsed(),
            label: Self::LABEL,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_solves(lcp: &Lcp, solution: &LcpSolution) {
        let w = lcp.slack(&solution.z);
        for i in 0..lcp.dim() {
            assert!(solution.z[i] >= -1e-9, "z = {:?}", solution.z);
            assert!(w[i] >= -1e-9, "w = {:?}", w);
            assert!((w[i] - solution.w[i]).abs() < 1e-9);
            assert!((solution.z[i] * w[i]).abs() < 1e-9, "pair {} not complementary", i);
        }
    }

    #[test]
    fn test_single_pivot() {
        // w = q - [[2, 1], [1, 2]]·z; z_0 enters and w_0 leaves at once
        let lcp = Lcp::new(vec![vec![-2.0, -1.0], vec![-1.0, -2.0]], vec![1.0, 1.0]).unwrap();
        let solution = LemkeHowson::new().solve(&lcp, 0).unwrap();

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert_eq!(solution.pivots, 1);
        assert!((solution.z[0] - 0.5).abs() < 1e-12);
        assert!((solution.w[1] - 0.5).abs() < 1e-12);
        assert_solves(&lcp, &solution);
    }

    #[test]
    fn test_bimatrix_construction() {
        let a = vec![vec![1.0, 2.0, 3.0]];
        let b = vec![vec![4.0, 5.0, 6.0]];
        let lcp = Lcp::bimatrix(&a, &b).unwrap();
        assert_eq!(lcp.dim(), 4);
        assert_eq!(lcp.m[0], vec![0.0, -1.0, -2.0, -3.0]);
        assert_eq!(lcp.m[2], vec![-5.0, 0.0, 0.0, 0.0]);
        assert_eq!(lcp.q, vec![1.0; 4]);
    }

    #[test]
    fn test_random_positive_bimatrix_lcps() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let rows = rng.random_range(1..=4);
            let cols = rng.random_range(1..=4);
            let draw = |rng: &mut StdRng| -> Vec<Vec<f64>> {
                (0..rows)
                    .map(|_| (0..cols).map(|_| rng.random_range(1.0..10.0)).collect())
                    .collect()
            };
            let a = draw(&mut rng);
            let b = draw(&mut rng);
            let lcp = Lcp::bimatrix(&a, &b).unwrap();
            for label in 0..lcp.dim() {
                let solution = LemkeHowson::new().solve(&lcp, label).unwrap();
                assert_eq!(solution.status, SolutionStatus::Optimal);
                assert_solves(&lcp, &solution);
                // Not the trivial solution
                assert!(solution.z.iter().sum::<f64>() > 0.0);
            }
        }
    }

    #[test]
    fn test_ray_termination_is_unbounded() {
        // w = z + 1 never blocks z
        let lcp = Lcp::new(vec![vec![1.0]], vec![1.0]).unwrap();
        assert_eq!(LemkeHowson::new().solve(&lcp, 0).unwrap_err(), PivotError::Unbounded);
    }

    #[test]
    fn test_pivot_cap() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let b = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        let lcp = Lcp::bimatrix(&a, &b).unwrap();
        let solution = LemkeHowson::new().with_max_iterations(1).solve(&lcp, 0).unwrap();
        assert_eq!(solution.status, SolutionStatus::DidNotConverge);
        assert_eq!(solution.pivots, 1);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            Lcp::new(vec![vec![1.0, 0.0]], vec![1.0]),
            Err(PivotError::DimensionMismatch { .. })
        ));
        assert!(Lcp::new(vec![vec![f64::NAN]], vec![1.0]).is_err());
        assert!(Lcp::bimatrix(&[vec![1.0, 2.0]], &[vec![1.0]]).is_err());

        let lcp = Lcp::new(vec![vec![-1.0]], vec![-1.0]).unwrap();
        assert!(matches!(LemkeHowson::new().solve(&lcp, 0), Err(PivotError::InvalidInput(_))));
        let lcp = Lcp::new(vec![vec![-1.0]], vec![1.0]).unwrap();
        assert!(matches!(LemkeHowson::new().solve(&lcp, 1), Err(PivotError::InvalidInput(_))));
    }

    #[test]
    fn test_complement() {
        assert_eq!(complement(0, 3), 3);
        assert_eq!(complement(5, 3), 2);
    }
}
