use crate::error::PivotError;

/// Bounded-integer knapsack over item types with integer widths.
///
/// `solve` maximises `Σ kᵢ·aᵢ` subject to `Σ wᵢ·aᵢ ≤ W`, `aᵢ ∈ ℤ≥0`, by
/// dynamic programming over item types and every integer capacity up to `W`.
#[derive(Debug, Clone)]
pub struct Knapsack {
    weights: Vec<usize>,
    capacity: usize,
}

/// Optimal multiplicity vector returned by [`Knapsack::solve`]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct KnapsackPattern {
    pub multiplicities: Vec<usize>,
    pub value: f64,
}

impl KnapsackPattern {
    pub fn weight(&self, weights: &[usize]) -> usize {
        self.multiplicities.iter().zip(weights).map(|(a, w)| a * w).sum()
    }
}

impl Knapsack {
    pub fn new(weights: Vec<usize>, capacity: usize) -> Result<Self, PivotError> {
        if weights.is_empty() {
            return Err(PivotError::InvalidInput("knapsack needs at least one item".to_string()));
        }
        if let Some(i) = weights.iter().position(|&w| w == 0) {
            return Err(PivotError::InvalidInput(format!("item {} has zero weight", i)));
        }
        Ok(Self { weights, capacity })
    }

    pub fn weights(&self) -> &[usize] {
        &self.weights
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most valuable pattern for per-unit `values` (negative values are never packed).
    pub fn solve(&self, values: &[f64]) -> Result<KnapsackPattern, PivotError> {
        let n = self.weights.len();
        if values.len() != n {
            return Err(PivotError::DimensionMismatch {
                what: "knapsack values",
                expected: n,
                found: values.len(),
            });
        }
        let cap = self.capacity;

        // best[i][v]: best value with items 0..=i and capacity v
        // choice[i][v]: multiplicity of item i achieving it
        let mut best = vec![vec![0.0; cap + 1]; n];
        let mut choice = vec![vec![0usize; cap + 1]; n];

        let w0 = self.weights[0];
        if values[0] > 0.0 {
            for v in 0..=cap {
                choice[0][v] = v / w0;
                best[0][v] = (v / w0) as f64 * values[0];
            }
        }

        for i in 1..n {
            let w = self.weights[i];
            for v in 0..=cap {
                let mut best_val = best[i - 1][v];
                let mut best_a = 0;
                for a in 1..=(v / w) {
                    let val = values[i] * a as f64 + best[i - 1][v - a * w];
                    if val > best_val {
                        best_val = val;
                        best_a = a;
                    }
                }
                best[i][v] = best_val;
                choice[i][v] = best_a;
            }
        }

        let mut multiplicities = vec![0; n];
        let mut v = cap;
        for i in (0..n).rev() {
            multiplicities[i] = choice[i][v];
            v -= multiplicities[i] * self.weights[i];
        }

        Ok(KnapsackPattern {
            multiplicities,
            value: best[n - 1][cap],
        })
    }
}
