use rand::Rng;

use crate::error::TransportError;

/// Relative tolerance on `Σn = Σm`
const MASS_TOLERANCE: f64 = 1e-9;

/// Discrete transport problem between row masses `n` and column masses `m`
/// with surplus `surplus[x][y]` per unit moved from `x` to `y`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct TransportProblem {
    pub surplus: Vec<Vec<f64>>,
    pub n: Vec<f64>,
    pub m: Vec<f64>,
    /// Last row and column are the "unmatched" outside options of a matching market
    #[cfg_attr(feature = "serde", serde(default))]
    pub outside_options: bool,
}

impl TransportProblem {
    pub fn new(surplus: Vec<Vec<f64>>, n: Vec<f64>, m: Vec<f64>) -> Result<Self, TransportError> {
        let problem = Self {
            surplus,
            n,
            m,
            outside_options: false,
        };
        problem.validate()?;
        Ok(problem)
    }

    /// Transferable-utility market where either side may stay single.
    ///
    /// Adds a row holding the column mass and a column holding the row mass,
    /// both with zero surplus, so the augmented masses balance even when
    /// `Σn ≠ Σm`.
    pub fn matching_market(surplus: Vec<Vec<f64>>, n: Vec<f64>, m: Vec<f64>) -> Result<Self, TransportError> {
        let cols = surplus.first().map_or(0, |r| r.len());
        check_shape(&surplus, &n, &m)?;

        let n_total: f64 = n.iter().sum();
        let m_total: f64 = m.iter().sum();

        let mut augmented: Vec<Vec<f64>> = surplus
            .into_iter()
            .map(|mut row| {
                row.push(0.0);
                row
            })
            .collect();
        augmented.push(vec![0.0; cols + 1]);

        let mut n = n;
        n.push(m_total);
        let mut m = m;
        m.push(n_total);

        let problem = Self {
            surplus: augmented,
            n,
            m,
            outside_options: true,
        };
        problem.validate()?;
        Ok(problem)
    }

    /// Surplus uniform in `[0, 1)`, marginals uniform in `[0.5, 1.5)` then
    /// normalised to unit mass.
    pub fn random<R: Rng>(rng: &mut R, rows: usize, cols: usize) -> Result<Self, TransportError> {
        let surplus = (0..rows)
            .map(|_| (0..cols).map(|_| rng.random_range(0.0..1.0)).collect())
            .collect();
        let mut draw_marginal = |len: usize| -> Vec<f64> {
            let raw: Vec<f64> = (0..len).map(|_| rng.random_range(0.5..1.5)).collect();
            let total: f64 = raw.iter().sum();
            raw.into_iter().map(|v| v / total).collect()
        };
        let n = draw_marginal(rows);
        let m = draw_marginal(cols);
        Self::new(surplus, n, m)
    }

    pub fn num_rows(&self) -> usize {
        self.n.len()
    }

    pub fn num_cols(&self) -> usize {
        self.m.len()
    }

    pub fn total_mass(&self) -> f64 {
        self.n.iter().sum()
    }

    /// Largest minus smallest surplus entry
    pub fn surplus_range(&self) -> f64 {
        let (lo, hi) = self
            .surplus
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        hi - lo
    }

    pub fn validate(&self) -> Result<(), TransportError> {
        check_shape(&self.surplus, &self.n, &self.m)?;

        for (which, marginal) in [("n", &self.n), ("m", &self.m)] {
            if let Some((index, &value)) = marginal
                .iter()
                .enumerate()
                .find(|&(_, &v)| !(v.is_finite() && v > 0.0))
            {
                return Err(TransportError::InvalidMarginal { which, index, value });
            }
        }

        let rows: f64 = self.n.iter().sum();
        let cols: f64 = self.m.iter().sum();
        if (rows - cols).abs() > MASS_TOLERANCE * rows.max(cols) {
            return Err(TransportError::MassMismatch { rows, cols });
        }
        Ok(())
    }
}

fn check_shape(surplus: &[Vec<f64>], n: &[f64], m: &[f64]) -> Result<(), TransportError> {
    if n.is_empty() || m.is_empty() {
        return Err(TransportError::InvalidInput(
            "both sides need at least one type".to_string(),
        ));
    }
    if surplus.len() != n.len() {
        return Err(TransportError::ShapeMismatch {
            what: "surplus rows",
            expected: n.len(),
            found: surplus.len(),
        });
    }
    if let Some(row) = surplus.iter().find(|row| row.len() != m.len()) {
        return Err(TransportError::ShapeMismatch {
            what: "surplus columns",
            expected: m.len(),
            found: row.len(),
        });
    }
    if surplus.iter().flatten().any(|v| !v.is_finite()) {
        return Err(TransportError::InvalidInput("surplus must be finite".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_matching_market_augmentation() {
        let problem = TransportProblem::matching_market(
            vec![vec![0.9, 0.9], vec![0.6, 0.5], vec![0.9, 0.3]],
            vec![1.0 / 3.0; 3],
            vec![1.0 / 3.0; 2],
        )
        .unwrap();

        assert!(problem.outside_options);
        assert_eq!(problem.num_rows(), 4);
        assert_eq!(problem.num_cols(), 3);
        assert_eq!(problem.surplus[0], vec![0.9, 0.9, 0.0]);
        assert_eq!(problem.surplus[3], vec![0.0, 0.0, 0.0]);
        assert!((problem.n[3] - 2.0 / 3.0).abs() < 1e-12);
        assert!((problem.m[2] - 1.0).abs() < 1e-12);
        assert!((problem.total_mass() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_random_problem_is_balanced() {
        let mut rng = StdRng::seed_from_u64(3);
        let problem = TransportProblem::random(&mut rng, 4, 6).unwrap();
        assert_eq!(problem.surplus.len(), 4);
        assert!(problem.surplus.iter().all(|r| r.len() == 6));
        assert!((problem.n.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((problem.m.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(problem.n.iter().chain(&problem.m).all(|&v| v > 0.0));
    }

    #[test]
    fn test_surplus_range() {
        let problem = TransportProblem::new(
            vec![vec![0.1, 0.9], vec![-0.2, 0.4]],
            vec![0.5, 0.5],
            vec![0.5, 0.5],
        )
        .unwrap();
        assert!((problem.surplus_range() - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_validation_errors() {
        let square = || vec![vec![0.0, 1.0], vec![1.0, 0.0]];

        assert!(matches!(
            TransportProblem::new(square(), vec![0.5, 0.5, 0.0], vec![0.5, 0.5]),
            Err(TransportError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            TransportProblem::new(vec![vec![0.0], vec![1.0]], vec![0.5, 0.5], vec![0.5, 0.5]),
            Err(TransportError::ShapeMismatch { .. })
        ));
        assert_eq!(
            TransportProblem::new(square(), vec![1.0, 0.0], vec![0.5, 0.5]).unwrap_err(),
            TransportError::InvalidMarginal {
                which: "n",
                index: 1,
                value: 0.0
            }
        );
        assert!(matches!(
            TransportProblem::new(square(), vec![0.5, 0.5], vec![0.5, f64::NAN]),
            Err(TransportError::InvalidMarginal { which: "m", .. })
        ));
        assert!(matches!(
            TransportProblem::new(square(), vec![0.5, 0.5], vec![0.5, 0.6]),
            Err(TransportError::MassMismatch { .. })
        ));
        assert!(matches!(
            TransportProblem::new(vec![vec![f64::INFINITY]], vec![1.0], vec![1.0]),
            Err(TransportError::InvalidInput(_))
        ));
        assert!(TransportProblem::new(vec![], vec![], vec![]).is_err());
    }
}
