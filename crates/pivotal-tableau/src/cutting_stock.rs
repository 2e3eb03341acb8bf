use std::time::Instant;

use log::{debug, trace, warn};

use crate::error::PivotError;
use crate::knapsack::Knapsack;
use crate::solution::{CuttingStockSolution, PatternUsage, SolutionStatus};
use crate::tableau::{Column, Pivotable, Tableau};

/// Cutting-stock instance: cut rolls of `roll_width` into `demand[i]` pieces
/// of width `widths[i]` using as few rolls as possible.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct CuttingStock {
    pub widths: Vec<usize>,
    pub demand: Vec<f64>,
    pub roll_width: usize,
}

impl CuttingStock {
    pub fn new(widths: Vec<usize>, demand: Vec<f64>, roll_width: usize) -> Result<Self, PivotError> {
        let problem = Self {
            widths,
            demand,
            roll_width,
        };
        problem.validate()?;
        Ok(problem)
    }

    pub fn num_items(&self) -> usize {
        self.widths.len()
    }

    fn validate(&self) -> Result<(), PivotError> {
        if self.widths.is_empty() {
            return Err(PivotError::InvalidInput("no item widths given".to_string()));
        }
        if self.demand.len() != self.widths.len() {
            return Err(PivotError::DimensionMismatch {
                what: "demand vector",
                expected: self.widths.len(),
                found: self.demand.len(),
            });
        }
        for (i, &w) in self.widths.iter().enumerate() {
            if w == 0 {
                return Err(PivotError::InvalidInput(format!("item {} has zero width", i)));
            }
            if w > self.roll_width {
                return Err(PivotError::InvalidInput(format!(
                    "item {} of width {} does not fit in a roll of width {}",
                    i, w, self.roll_width
                )));
            }
        }
        if let Some(i) = self.demand.iter().position(|&q| q < 0.0 || q.is_nan()) {
            return Err(PivotError::InvalidInput(format!(
                "demand for item {} is negative or not a number",
                i
            )));
        }
        Ok(())
    }
}

fn pattern_name(pattern: &[usize]) -> String {
    let counts: Vec<String> = pattern.iter().map(|a| a.to_string()).collect();
    format!("pattern_{}", counts.join("-"))
}

/// Column generation for the LP relaxation of cutting stock.
///
/// The restricted master starts from one single-width pattern per item and
/// prices new patterns with the knapsack oracle until none has `k·a > 1`.
pub struct ColumnGeneration {
    /// Maximum pivots before giving up
    max_iterations: usize,
    /// Tolerance for the pricing test and the ratio test
    tolerance: f64,
}

impl Default for ColumnGeneration {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl ColumnGeneration {
    pub const LABEL: &'static str = "column-generation";

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

    pub fn solve(&self, problem: &CuttingStock) -> Result<CuttingStockSolution, PivotError> {
        problem.validate()?;
        let start = Instant::now();
        let m = problem.num_items();

        // Patterns indexed by tableau variable id
        let mut patterns: Vec<Vec<usize>> = (0..m)
            .map(|j| {
                let mut pattern = vec![0; m];
                pattern[j] = problem.roll_width / problem.widths[j];
                pattern
            })
            .collect();
        let columns = patterns
            .iter()
            .map(|p| Column::new(pattern_name(p), as_column(p), 1.0))
            .collect();

        let mut tableau = Tableau::new(columns, (0..m).collect(), problem.demand.clone())?
            .with_tolerance(self.tolerance);
        let knapsack = Knapsack::new(problem.widths.clone(), problem.roll_width)?;

        let mut history = vec![tableau.objective()];
        let mut prices = tableau.dual_prices()?;
        let mut status = SolutionStatus::DidNotConverge;
        let mut iterations = 0;

        debug!(
            "column generation: {} items, roll width {}, initial rolls {:.4}",
            m,
            problem.roll_width,
            history[0]
        );

        loop {
            let candidate = knapsack.solve(&prices)?;
            if candidate.value <= 1.0 + self.tolerance {
                status = SolutionStatus::Optimal;
                break;
            }
            if iterations == self.max_iterations {
                break;
            }

            let column = as_column(&candidate.multiplicities);
            let departure = tableau.determine_departing(&column)?;
            let var = tableau.add_column(Column::new(
                pattern_name(&candidate.multiplicities),
                column,
                1.0,
            ))?;
            tableau.update(var, &departure)?;
            patterns.push(candidate.multiplicities);

            iterations += 1;
            history.push(tableau.objective());
            prices = tableau.dual_prices()?;
            trace!(
                "iteration {}: priced {} at {:.6}, rolls {:.6}",
                iterations,
                tableau.name(var),
                candidate.value,
                tableau.objective()
            );
        }

        if status == SolutionStatus::DidNotConverge {
            warn!(
                "column generation stopped after {} iterations without proving optimality",
                iterations
            );
        }

        tableau.refresh()?;
        let usage = tableau
            .basis()
            .iter()
            .zip(tableau.basic_values())
            .map(|(&var, &rolls)| PatternUsage {
                pattern: patterns[var].clone(),
                rolls,
            })
            .collect();
        let objective_value = tableau.objective();

        debug!(
            "column generation finished: {:?} after {} iterations, rolls {:.6}",
            status, iterations, objective_value
        );

        Ok(CuttingStockSolution {
            status,
            patterns: usage,
            prices,
            objective_value,
            history,
            iterations,
            elapsed: start.elapsed(),
            label: Self::LABEL,
        })
    }
}

fn as_column(pattern: &[usize]) -> Vec<f64> {
    pattern.iter().map(|&a| a as f64).collect()
}
