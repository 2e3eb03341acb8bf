use crate::error::PivotError;

/// LU factorisation with partial pivoting, `P·A = L·U`.
///
/// `L` (unit diagonal, below the diagonal) and `U` (on and above it) share
/// one dense row-major buffer. `perm[i]` is the row of `A` moved to row `i`.
#[derive(Debug, Clone)]
pub struct LuFactors {
    lu: Vec<Vec<f64>>,
    perm: Vec<usize>,
}

impl LuFactors {
    /// Factorise a square row-major matrix.
    ///
    /// Fails with [`PivotError::SingularBasis`] when no pivot larger than
    /// `tolerance` exists in some column.
    pub fn factorize(matrix: &[Vec<f64>], tolerance: f64) -> Result<Self, PivotError> {
        let n = matrix.len();
        let mut lu = matrix.to_vec();
        if let Some(row) = lu.iter().find(|row| row.len() != n) {
            return Err(PivotError::DimensionMismatch {
                what: "square matrix row",
                expected: n,
                found: row.len(),
            });
        }
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            // Largest magnitude in column k at or below the diagonal
            let mut pivot_row = k;
            let mut pivot_abs = lu[k][k].abs();
            for i in (k + 1)..n {
                if lu[i][k].abs() > pivot_abs {
                    pivot_abs = lu[i][k].abs();
                    pivot_row = i;
                }
            }
            if pivot_abs <= tolerance {
                return Err(PivotError::SingularBasis);
            }
            lu.swap(k, pivot_row);
            perm.swap(k, pivot_row);

            let pivot_val = lu[k][k];
            for i in (k + 1)..n {
                let factor = lu[i][k] / pivot_val;
                lu[i][k] = factor;
                if factor != 0.0 {
                    for j in (k + 1)..n {
                        lu[i][j] -= factor * lu[k][j];
                    }
                }
            }
        }

        Ok(Self { lu, perm })
    }

    pub fn dim(&self) -> usize {
        self.perm.len()
    }

    /// Solve `A·x = b`.
    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.dim();
        // Forward substitution on P·b
        let mut x: Vec<f64> = self.perm.iter().map(|&p| rhs[p]).collect();
        for i in 0..n {
            let mut acc = x[i];
            for j in 0..i {
                acc -= self.lu[i][j] * x[j];
            }
            x[i] = acc;
        }
        // Back substitution
        for i in (0..n).rev() {
            let mut acc = x[i];
            for j in (i + 1)..n {
                acc -= self.lu[i][j] * x[j];
            }
            x[i] = acc / self.lu[i][i];
        }
        x
    }

    /// Solve `Aᵀ·y = c`.
    pub fn solve_transposed(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.dim();
        // Uᵀ·w = c
        let mut w = rhs.to_vec();
        for i in 0..n {
            let mut acc = w[i];
            for j in 0..i {
                acc -= self.lu[j][i] * w[j];
            }
            w[i] = acc / self.lu[i][i];
        }
        // Lᵀ·t = w
        for i in (0..n).rev() {
            let mut acc = w[i];
            for j in (i + 1)..n {
                acc -= self.lu[j][i] * w[j];
            }
            w[i] = acc;
        }
        // y = Pᵀ·t
        let mut y = vec![0.0; n];
        for (i, &p) in self.perm.iter().enumerate() {
            y[p] = w[i];
        }
        y
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mat_vec(a: &[Vec<f64>], x: &[f64]) -> Vec<f64> {
        a.iter().map(|row| dot(row, x)).collect()
    }

    #[test]
    fn test_solve_needs_row_exchange() {
        let a = vec![
            vec![0.0, 2.0, 1.0],
            vec![1.0, 1.0, 0.0],
            vec![3.0, 0.0, 4.0],
        ];
        let b = vec![5.0, 3.0, 10.0];
        let lu = LuFactors::factorize(&a, 1e-12).unwrap();
        let x = lu.solve(&b);
        let back = mat_vec(&a, &x);
        for (lhs, rhs) in back.iter().zip(&b) {
            assert!((lhs - rhs).abs() < 1e-10, "A x = {:?}, b = {:?}", back, b);
        }
    }

    #[test]
    fn test_solve_transposed() {
        let a = vec![
            vec![2.0, 1.0, 0.0],
            vec![0.0, 0.0, 3.0],
            vec![1.0, 4.0, 1.0],
        ];
        let c = vec![1.0, -2.0, 0.5];
        let lu = LuFactors::factorize(&a, 1e-12).unwrap();
        let y = lu.solve_transposed(&c);
        let at: Vec<Vec<f64>> = (0..3).map(|j| (0..3).map(|i| a[i][j]).collect()).collect();
        let back = mat_vec(&at, &y);
        for (lhs, rhs) in back.iter().zip(&c) {
            assert!((lhs - rhs).abs() < 1e-10, "Aᵀ y = {:?}, c = {:?}", back, c);
        }
    }

    #[test]
    fn test_singular_matrix() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(LuFactors::factorize(&a, 1e-12).unwrap_err(), PivotError::SingularBasis);
    }

    #[test]
    fn test_ragged_matrix() {
        let a = vec![vec![1.0, 2.0], vec![2.0]];
        assert!(matches!(
            LuFactors::factorize(&a, 1e-12),
            Err(PivotError::DimensionMismatch { .. })
        ));
    }
}
