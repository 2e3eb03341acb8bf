use std::time::Instant;

use log::{debug, warn};

use crate::error::PivotError;
use crate::problem::LinearProgram;
use crate::solution::{LpSolution, SolutionStatus};
use crate::tableau::{Column, EnteringRule, Pivotable, Tableau};

/// Primal simplex on a [`Tableau`] started from the all-slack basis
pub struct Simplex {
    /// Maximum pivots before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Entering variable selection
    rule: EnteringRule,
}

impl Default for Simplex {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            rule: EnteringRule::Bland,
        }
    }
}

impl Simplex {
    pub const LABEL: &'static str = "primal-simplex";

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

    pub fn with_rule(mut self, rule: EnteringRule) -> Self {
        self.rule = rule;
        self
    }

    /// Solve the LP; an unbounded objective is reported as [`PivotError::Unbounded`].
    pub fn solve(&self, problem: &LinearProgram) -> Result<LpSolution, PivotError> {
        let start = Instant::now();
        let n_vars = problem.num_variables();
        let mut tableau = self.build_tableau(problem)?;

        let (status, iterations) = optimize(&mut tableau, self.max_iterations)?;
        if status == SolutionStatus::DidNotConverge {
            warn!("simplex hit the iteration cap ({}) before optimality", iterations);
        }

        let values: Vec<f64> = (0..n_vars).map(|j| tableau.value(j)).collect();
        let objective_value = values
            .iter()
            .zip(&problem.objective.coefficients)
            .map(|(x, c)| x * c)
            .sum();
        let sign = if problem.objective.minimize { -1.0 } else { 1.0 };
        let shadow_prices = tableau
            .dual_prices()?
            .into_iter()
            .map(|y| sign * y)
            .collect();

        debug!(
            "simplex finished: {:?} after {} pivots, objective {:.6}",
            status, iterations, objective_value
        );

        Ok(LpSolution {
            status,
            values,
            shadow_prices,
            objective_value,
            iterations,
            elapsed: start.elapsed(),
            label: Self::LABEL,
        })
    }

    fn build_tableau(&self, problem: &LinearProgram) -> Result<Tableau, PivotError> {
        problem.validate()?;
        let n_vars = problem.num_variables();
        let n_constraints = problem.num_constraints();

        // The tableau maximises, so minimisation negates the costs
        let sign = if problem.objective.minimize { -1.0 } else { 1.0 };
        let mut columns = Vec::with_capacity(n_vars + n_constraints);
        for (j, name) in problem.variables.iter().enumerate() {
            let coefficients = problem.constraints.iter().map(|c| c.coefficients[j]).collect();
            columns.push(Column::new(
                name.clone(),
                coefficients,
                sign * problem.objective.coefficients[j],
            ));
        }
        for (i, c) in problem.constraints.iter().enumerate() {
            let mut unit = vec![0.0; n_constraints];
            unit[i] = 1.0;
            columns.push(Column::new(format!("slack_{}", c.name), unit, 0.0));
        }

        let basis = (n_vars..n_vars + n_constraints).collect();
        let rhs = problem.constraints.iter().map(|c| c.rhs).collect();
        Ok(Tableau::new(columns, basis, rhs)?
            .with_rule(self.rule)
            .with_tolerance(self.tolerance))
    }
}

/// Pivot on `determine_entering` until no improving variable is left.
///
/// Returns the final status and the number of pivots made.
pub fn optimize<P: Pivotable>(
    tableau: &mut P,
    max_iterations: usize,
) -> Result<(SolutionStatus, usize), PivotError> {
    let mut iterations = 0;
    while let Some(entering) = tableau.determine_entering()? {
        if iterations == max_iterations {
            return Ok((SolutionStatus::DidNotConverge, iterations));
        }
        tableau.pivot(entering)?;
        iterations += 1;
    }
    Ok((SolutionStatus::Optimal, iterations))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LinearProgram::new(names(&["x", "y"]));
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], 3.0);

        let solution = Simplex::new().solve(&problem).unwrap();

        println!("Status: {:?}", solution.status);
        println!("Values: {:?}", solution.values);
        println!("Objective: {}", solution.objective_value);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-9, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-9, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-9, "obj = {} (expected 11)", solution.objective_value);

        // Strong duality: bᵀy equals the objective
        let expected = [2.0, 1.0, 0.0];
        for (y, e) in solution.shadow_prices.iter().zip(expected) {
            assert!((y - e).abs() < 1e-9, "shadow prices {:?}", solution.shadow_prices);
        }
    }

    #[test]
    fn test_minimization() {
        // Minimize: x - 2y s.t. x + y <= 4, y <= 3 -> x=0, y=3, obj=-6
        let mut problem = LinearProgram::new(names(&["x", "y"]));
        problem.set_objective(vec![1.0, -2.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], 4.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], 3.0);

        let solution = Simplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!(solution.values[0].abs() < 1e-9);
        assert!((solution.values[1] - 3.0).abs() < 1e-9);
        assert!((solution.objective_value + 6.0).abs() < 1e-9);
        // Relaxing y_max by one unit lowers the cost by 2
        assert!((solution.shadow_prices[1] + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bland_terminates_on_beale_example() {
        // Beale's degenerate LP, which cycles under the textbook largest-coefficient rule
        let mut problem = LinearProgram::new(names(&["x4", "x5", "x6", "x7"]));
        problem.set_objective(vec![0.75, -150.0, 0.02, -6.0], false);
        problem.add_constraint("r1", vec![0.25, -60.0, -0.04, 9.0], 0.0);
        problem.add_constraint("r2", vec![0.5, -90.0, -0.02, 3.0], 0.0);
        problem.add_constraint("r3", vec![0.0, 0.0, 1.0, 0.0], 1.0);

        let solution = Simplex::new().solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 0.05).abs() < 1e-9, "obj = {}", solution.objective_value);
    }

    #[test]
    fn test_dantzig_rule_agrees() {
        let mut problem = LinearProgram::new(names(&["x", "y", "z"]));
        problem.set_objective(vec![5.0, 4.0, 3.0], false);
        problem.add_constraint("a", vec![2.0, 3.0, 1.0], 5.0);
        problem.add_constraint("b", vec![4.0, 1.0, 2.0], 11.0);
        problem.add_constraint("c", vec![3.0, 4.0, 2.0], 8.0);

        let bland = Simplex::new().solve(&problem).unwrap();
        let dantzig = Simplex::new().with_rule(EnteringRule::Dantzig).solve(&problem).unwrap();
        assert!((bland.objective_value - 13.0).abs() < 1e-9);
        assert!((dantzig.objective_value - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_unbounded() {
        // Maximize x s.t. -x + y <= 1
        let mut problem = LinearProgram::new(names(&["x", "y"]));
        problem.set_objective(vec![1.0, 0.0], false);
        problem.add_constraint("c", vec![-1.0, 1.0], 1.0);

        assert_eq!(Simplex::new().solve(&problem).unwrap_err(), PivotError::Unbounded);
    }

    #[test]
    fn test_negative_rhs_is_rejected() {
        let mut problem = LinearProgram::new(names(&["x"]));
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![-1.0], -5.0);

        assert!(matches!(Simplex::new().solve(&problem), Err(PivotError::InvalidInput(_))));
    }

    #[test]
    fn test_iteration_cap() {
        let mut problem = LinearProgram::new(names(&["x", "y"]));
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], 3.0);

        let solution = Simplex::new().with_max_iterations(1).solve(&problem).unwrap();
        assert_eq!(solution.status, SolutionStatus::DidNotConverge);
        assert_eq!(solution.iterations, 1);
    }
}
