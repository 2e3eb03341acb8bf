use std::time::Instant;

use rand::Rng;

use crate::error::PivotError;
use crate::lcp::{Lcp, LemkeHowson};
use crate::solution::NashEquilibrium;

/// Two-player game in normal form; `a[i][j]` and `b[i][j]` are the row and
/// column player's payoffs when row `i` meets column `j`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BimatrixGame {
    pub a: Vec<Vec<f64>>,
    pub b: Vec<Vec<f64>>,
}

impl BimatrixGame {
    pub fn new(a: Vec<Vec<f64>>, b: Vec<Vec<f64>>) -> Result<Self, PivotError> {
        let game = Self { a, b };
        game.validate()?;
        Ok(game)
    }

    /// Payoffs drawn uniformly from `[0, 1)`.
    pub fn random<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Result<Self, PivotError> {
        let mut draw = || -> Vec<Vec<f64>> {
            (0..rows)
                .map(|_| (0..cols).map(|_| rng.random_range(0.0..1.0)).collect())
                .collect()
        };
        let a = draw();
        let b = draw();
        Self::new(a, b)
    }

    pub fn num_rows(&self) -> usize {
        self.a.len()
    }

    pub fn num_cols(&self) -> usize {
        self.a.first().map_or(0, |r| r.len())
    }

    fn validate(&self) -> Result<(), PivotError> {
        if self.num_rows() == 0 || self.num_cols() == 0 {
            return Err(PivotError::InvalidInput("each player needs at least one strategy".to_string()));
        }
        if self.b.len() != self.num_rows() {
            return Err(PivotError::DimensionMismatch {
                what: "column player payoff rows",
                expected: self.num_rows(),
                found: self.b.len(),
            });
        }
        for row in self.a.iter().chain(&self.b) {
            if row.len() != self.num_cols() {
                return Err(PivotError::DimensionMismatch {
                    what: "payoff columns",
                    expected: self.num_cols(),
                    found: row.len(),
                });
            }
        }
        if self.a.iter().chain(&self.b).flatten().any(|v| !v.is_finite()) {
            return Err(PivotError::InvalidInput("payoffs must be finite".to_string()));
        }
        Ok(())
    }

    /// Run Lemke–Howson on the shifted game, dropping `label`
    /// (`0..I` for row strategies, `I..I+J` for column strategies).
    pub fn solve(&self, solver: &LemkeHowson, label: usize) -> Result<NashEquilibrium, PivotError> {
        self.validate()?;
        let start = Instant::now();
        let rows = self.num_rows();

        let lcp = Lcp::bimatrix(&shift_positive(&self.a), &shift_positive(&self.b))?;
        let solution = solver.solve(&lcp, label)?;

        let row_strategy = normalize(&solution.z[..rows]);
        let column_strategy = normalize(&solution.z[rows..]);
        let row_payoff = bilinear(&self.a, &row_strategy, &column_strategy);
        let column_payoff = bilinear(&self.b, &row_strategy, &column_strategy);

        Ok(NashEquilibrium {
            status: solution.status,
            row_strategy,
            column_strategy,
            row_payoff,
            column_payoff,
            pivots: solution.pivots,
            elapsed: start.elapsed(),
            label: LemkeHowson::LABEL,
        })
    }

    /// One run per starting label, keeping distinct strategy profiles only.
    pub fn equilibria_from_all_labels(&self, solver: &LemkeHowson) -> Result<Vec<NashEquilibrium>, PivotError> {
        let tol = solver.tolerance().max(1e-7);
        let mut found: Vec<NashEquilibrium> = Vec::new();
        for label in 0..self.num_rows() + self.num_cols() {
            let eq = self.solve(solver, label)?;
            if !found.iter().any(|other| other.same_profile(&eq, tol)) {
                found.push(eq);
            }
        }
        Ok(found)
    }

    /// Largest gain either player gets from a pure deviation against `(p, q)`.
    pub fn regret(&self, p: &[f64], q: &[f64]) -> Result<f64, PivotError> {
        if p.len() != self.num_rows() {
            return Err(PivotError::DimensionMismatch {
                what: "row strategy",
                expected: self.num_rows(),
                found: p.len(),
            });
        }
        if q.len() != self.num_cols() {
            return Err(PivotError::DimensionMismatch {
                what: "column strategy",
                expected: self.num_cols(),
                found: q.len(),
            });
        }

        let a_q: Vec<f64> = self
            .a
            .iter()
            .map(|row| row.iter().zip(q).map(|(a, y)| a * y).sum())
            .collect();
        let p_b: Vec<f64> = (0..self.num_cols())
            .map(|j| self.b.iter().zip(p).map(|(row, x)| row[j] * x).sum())
            .collect();

        let row_value: f64 = a_q.iter().zip(p).map(|(v, x)| v * x).sum();
        let col_value: f64 = p_b.iter().zip(q).map(|(v, y)| v * y).sum();
        let best_row = a_q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let best_col = p_b.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok((best_row - row_value).max(best_col - col_value))
    }
}

/// `payoff − min + 1`, so every entry is at least one
fn shift_positive(payoff: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let min = payoff.iter().flatten().copied().fold(f64::INFINITY, f64::min);
    payoff
        .iter()
        .map(|row| row.iter().map(|v| v - min + 1.0).collect())
        .collect()
}

fn normalize(x: &[f64]) -> Vec<f64> {
    let total: f64 = x.iter().sum();
    if total > 0.0 {
        x.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; x.len()]
    }
}

fn bilinear(payoff: &[Vec<f64>], p: &[f64], q: &[f64]) -> f64 {
    payoff
        .iter()
        .zip(p)
        .map(|(row, x)| x * row.iter().zip(q).map(|(a, y)| a * y).sum::<f64>())
        .sum()
}
