use crate::error::PivotError;

/// Linear program in inequality form: optimise `cᵀx` s.t. `A·x ≤ b`, `x ≥ 0`.
///
/// The simplex driver starts from the all-slack basis, so every `b` must be
/// nonnegative.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct LinearProgram {
    pub variables: Vec<String>,
    pub objective: Objective,
    /// Rows of `A·x ≤ b`
    pub constraints: Vec<Constraint>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Objective {
    /// `c`, one entry per variable
    pub coefficients: Vec<f64>,
    pub minimize: bool,
}

/// One row `aᵀx ≤ rhs`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct Constraint {
    pub name: String,
    pub coefficients: Vec<f64>,
    pub rhs: f64,
}

impl LinearProgram {
    /// Empty maximisation over `variables` with a zero objective.
    pub fn new(variables: Vec<String>) -> Self {
        let coefficients = vec![0.0; variables.len()];
        Self {
            variables,
            objective: Objective {
                coefficients,
                minimize: false,
            },
            constraints: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, coefficients: Vec<f64>, minimize: bool) {
        self.objective = Objective { coefficients, minimize };
    }

    pub fn add_constraint(&mut self, name: impl Into<String>, coefficients: Vec<f64>, rhs: f64) {
        self.constraints.push(Constraint {
            name: name.into(),
            coefficients,
            rhs,
        });
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Checks row lengths and that the slack basis `x = 0` is feasible.
    pub fn validate(&self) -> Result<(), PivotError> {
        let n = self.num_variables();
        if self.objective.coefficients.len() != n {
            return Err(PivotError::DimensionMismatch {
                what: "objective coefficients",
                expected: n,
                found: self.objective.coefficients.len(),
            });
        }
        for c in &self.constraints {
            if c.coefficients.len() != n {
                return Err(PivotError::DimensionMismatch {
                    what: "constraint coefficients",
                    expected: n,
                    found: c.coefficients.len(),
                });
            }
            if c.rhs < 0.0 || c.rhs.is_nan() {
                return Err(PivotError::InvalidInput(format!(
                    "constraint {} has right-hand side {}; the slack basis needs b >= 0",
                    c.name, c.rhs
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        let mut lp = LinearProgram::new(vec!["x".into(), "y".into()]);
        lp.set_objective(vec![1.0, 1.0], false);
        lp.add_constraint("ok", vec![1.0, 2.0], 3.0);
        assert!(lp.validate().is_ok());

        lp.add_constraint("short", vec![1.0], 3.0);
        assert!(matches!(lp.validate(), Err(PivotError::DimensionMismatch { .. })));

        let mut lp = LinearProgram::new(vec!["x".into()]);
        lp.set_objective(vec![1.0, 2.0], true);
        assert!(matches!(lp.validate(), Err(PivotError::DimensionMismatch { .. })));
    }
}
