use std::fmt;

use log::trace;

use crate::error::PivotError;
use crate::linalg::{dot, LuFactors};

/// Identifier of a tableau variable (its insertion order)
pub type VarId = usize;

/// A named constraint column with its objective coefficient
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub coefficients: Vec<f64>,
    pub cost: f64,
}

impl Column {
    pub fn new(name: impl Into<String>, coefficients: Vec<f64>, cost: f64) -> Self {
        Self {
            name: name.into(),
            coefficients,
            cost,
        }
    }
}

/// How `determine_entering` picks among improving nonbasic variables
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnteringRule {
    /// First improving variable by lowest index (anti-cycling)
    #[default]
    Bland,
    /// Most negative reduced cost, ties to the lowest index
    Dantzig,
}

/// Outcome of a ratio test: which row leaves and how far the entering variable moves
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    /// Basis row of the departing variable
    pub row: usize,
    /// Value the entering variable takes (the minimum ratio)
    pub step: f64,
    /// `B⁻¹·a` for the entering column `a`
    pub direction: Vec<f64>,
}

/// Pivoting capability over a basic/nonbasic partition of `B·x_B + N·x_N = d`.
pub trait Pivotable {
    /// `x_B = B⁻¹·d`
    fn solve_for_basic(&self) -> Result<Vec<f64>, PivotError>;

    /// Nonbasic variable with negative reduced cost `t_N = Nᵀ·B⁻ᵀ·c_B − c_N`,
    /// or `None` when the current vertex is optimal.
    fn determine_entering(&self) -> Result<Option<VarId>, PivotError>;

    /// Ratio test for an entering column.
    fn determine_departing(&self, entering_column: &[f64]) -> Result<Departure, PivotError>;

    /// Exchange `entering` with the basic variable in `departure.row`.
    /// Returns the variable that left the basis.
    fn update(&mut self, entering: VarId, departure: &Departure) -> Result<VarId, PivotError>;

    /// Constraint column of `var`; unknown ids are `InvalidInput`.
    fn column(&self, var: VarId) -> Result<&[f64], PivotError>;

    fn is_basic(&self, var: VarId) -> bool;

    /// Current value of a variable; nonbasic variables are zero.
    fn value(&self, var: VarId) -> f64;

    /// Ratio test on `entering`'s column followed by the basis exchange.
    fn pivot(&mut self, entering: VarId) -> Result<VarId, PivotError> {
        let departure = self.determine_departing(self.column(entering)?)?;
        self.update(entering, &departure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Basic(usize),
    Nonbasic(usize),
}

/// Revised-simplex tableau: the current vertex of `{x ≥ 0 : A·x = d}` in basis form.
///
/// `B` and `N` are kept as column lists, partitioned like the index sets.
/// A pivot swaps one column, its cost and its label between the two sides;
/// `B⁻¹` is never stored, every solve refactorises `B`.
#[derive(Debug, Clone)]
pub struct Tableau {
    names: Vec<String>,
    slots: Vec<Slot>,
    basis: Vec<VarId>,
    nonbasis: Vec<VarId>,
    basic_columns: Vec<Vec<f64>>,
    nonbasic_columns: Vec<Vec<f64>>,
    basic_costs: Vec<f64>,
    nonbasic_costs: Vec<f64>,
    rhs: Vec<f64>,
    values: Vec<f64>,
    rule: EnteringRule,
    tolerance: f64,
}

impl Tableau {
    /// Build a tableau from all variable columns and the initial basis.
    ///
    /// `basis[r]` is the variable basic in row `r`; it must list `rhs.len()`
    /// distinct variables whose columns form a nonsingular, primal feasible basis.
    pub fn new(columns: Vec<Column>, basis: Vec<VarId>, rhs: Vec<f64>) -> Result<Self, PivotError> {
        let m = rhs.len();
        if basis.len() != m {
            return Err(PivotError::DimensionMismatch {
                what: "initial basis",
                expected: m,
                found: basis.len(),
            });
        }
        let mut slots = vec![None; columns.len()];
        for (row, &var) in basis.iter().enumerate() {
            match slots.get(var).copied() {
                None => {
                    return Err(PivotError::InvalidInput(format!(
                        "basis refers to unknown variable {}",
                        var
                    )))
                }
                Some(Some(_)) => {
                    return Err(PivotError::InvalidInput(format!(
                        "variable {} appears twice in the basis",
                        columns[var].name
                    )))
                }
                Some(None) => slots[var] = Some(Slot::Basic(row)),
            }
        }

        let mut tableau = Self {
            names: Vec::with_capacity(columns.len()),
            slots: Vec::with_capacity(columns.len()),
            basis,
            nonbasis: Vec::new(),
            basic_columns: vec![Vec::new(); m],
            nonbasic_columns: Vec::new(),
            basic_costs: vec![0.0; m],
            nonbasic_costs: Vec::new(),
            rhs,
            values: Vec::new(),
            rule: EnteringRule::default(),
            tolerance: 1e-9,
        };

        for (var, column) in columns.into_iter().enumerate() {
            if column.coefficients.len() != m {
                return Err(PivotError::DimensionMismatch {
                    what: "constraint column",
                    expected: m,
                    found: column.coefficients.len(),
                });
            }
            tableau.names.push(column.name);
            match slots[var] {
                Some(Slot::Basic(row)) => {
                    tableau.slots.push(Slot::Basic(row));
                    tableau.basic_columns[row] = column.coefficients;
                    tableau.basic_costs[row] = column.cost;
                }
                _ => {
                    tableau.slots.push(Slot::Nonbasic(tableau.nonbasis.len()));
                    tableau.nonbasis.push(var);
                    tableau.nonbasic_columns.push(column.coefficients);
                    tableau.nonbasic_costs.push(column.cost);
                }
            }
        }

        tableau.values = tableau.solve_for_basic()?;
        if let Some(row) = tableau.values.iter().position(|&x| x < -tableau.tolerance) {
            return Err(PivotError::InvalidInput(format!(
                "initial basis is not primal feasible: {} = {}",
                tableau.names[tableau.basis[row]], tableau.values[row]
            )));
        }
        Ok(tableau)
    }

    pub fn with_rule(mut self, rule: EnteringRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn num_rows(&self) -> usize {
        self.rhs.len()
    }

    pub fn num_variables(&self) -> usize {
        self.names.len()
    }

    /// Basic variables in row order
    pub fn basis(&self) -> &[VarId] {
        &self.basis
    }

    pub fn nonbasis(&self) -> &[VarId] {
        &self.nonbasis
    }

    pub fn name(&self, var: VarId) -> &str {
        &self.names[var]
    }

    /// `x_B`, row-aligned with [`Tableau::basis`]
    pub fn basic_values(&self) -> &[f64] {
        &self.values
    }

    pub fn cost(&self, var: VarId) -> f64 {
        match self.slots[var] {
            Slot::Basic(row) => self.basic_costs[row],
            Slot::Nonbasic(k) => self.nonbasic_costs[k],
        }
    }

    /// `c_B·x_B`
    pub fn objective(&self) -> f64 {
        dot(&self.basic_costs, &self.values)
    }

    /// Dense row-major copy of `B`
    pub fn basis_matrix(&self) -> Vec<Vec<f64>> {
        let m = self.num_rows();
        (0..m)
            .map(|i| self.basic_columns.iter().map(|col| col[i]).collect())
            .collect()
    }

    fn factorize(&self) -> Result<LuFactors, PivotError> {
        LuFactors::factorize(&self.basis_matrix(), self.tolerance * 1e-3)
    }

    /// Dual prices `B⁻ᵀ·c_B`
    pub fn dual_prices(&self) -> Result<Vec<f64>, PivotError> {
        Ok(self.factorize()?.solve_transposed(&self.basic_costs))
    }

    /// Reduced costs `t_N` for every nonbasic variable, in nonbasis order
    pub fn reduced_costs(&self) -> Result<Vec<(VarId, f64)>, PivotError> {
        let prices = self.dual_prices()?;
        Ok(self
            .nonbasis
            .iter()
            .zip(&self.nonbasic_columns)
            .zip(&self.nonbasic_costs)
            .map(|((&var, column), &cost)| (var, dot(column, &prices) - cost))
            .collect())
    }

    /// Append a nonbasic column (column generation). Returns its id.
    pub fn add_column(&mut self, column: Column) -> Result<VarId, PivotError> {
        if column.coefficients.len() != self.num_rows() {
            return Err(PivotError::DimensionMismatch {
                what: "generated column",
                expected: self.num_rows(),
                found: column.coefficients.len(),
            });
        }
        let var = self.names.len();
        self.names.push(column.name);
        self.slots.push(Slot::Nonbasic(self.nonbasis.len()));
        self.nonbasis.push(var);
        self.nonbasic_columns.push(column.coefficients);
        self.nonbasic_costs.push(column.cost);
        Ok(var)
    }

    /// Recompute `x_B` from scratch, discarding drift from incremental updates.
    pub fn refresh(&mut self) -> Result<(), PivotError> {
        self.values = self.solve_for_basic()?;
        Ok(())
    }

    /// `B⁻¹·N` rows for display, one row per basic variable
    fn transformed_rows(&self) -> Result<Vec<Vec<f64>>, PivotError> {
        let lu = self.factorize()?;
        let columns: Vec<Vec<f64>> = self.nonbasic_columns.iter().map(|c| lu.solve(c)).collect();
        Ok((0..self.num_rows())
            .map(|r| columns.iter().map(|c| c[r]).collect())
            .collect())
    }
}

impl Pivotable for Tableau {
    fn solve_for_basic(&self) -> Result<Vec<f64>, PivotError> {
        Ok(self.factorize()?.solve(&self.rhs))
    }

    fn determine_entering(&self) -> Result<Option<VarId>, PivotError> {
        let candidates = self
            .reduced_costs()?
            .into_iter()
            .filter(|&(_, t)| t < -self.tolerance);

        let chosen = match self.rule {
            EnteringRule::Bland => candidates.min_by_key(|&(var, _)| var),
            EnteringRule::Dantzig => candidates.min_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            }),
        };
        Ok(chosen.map(|(var, _)| var))
    }

    fn determine_departing(&self, entering_column: &[f64]) -> Result<Departure, PivotError> {
        if entering_column.len() != self.num_rows() {
            return Err(PivotError::DimensionMismatch {
                what: "entering column",
                expected: self.num_rows(),
                found: entering_column.len(),
            });
        }
        let direction = self.factorize()?.solve(entering_column);

        let mut best: Option<(usize, f64)> = None;
        for (row, &z) in direction.iter().enumerate() {
            if z <= self.tolerance {
                continue;
            }
            let ratio = self.values[row] / z;
            best = match best {
                None => Some((row, ratio)),
                Some((best_row, best_ratio)) => {
                    let tie = (ratio - best_ratio).abs() <= self.tolerance;
                    if (!tie && ratio < best_ratio) || (tie && self.basis[row] < self.basis[best_row]) {
                        Some((row, ratio))
                    } else {
                        Some((best_row, best_ratio))
                    }
                }
            };
        }

        let (row, step) = best.ok_or(PivotError::Unbounded)?;
        Ok(Departure { row, step, direction })
    }

    fn update(&mut self, entering: VarId, departure: &Departure) -> Result<VarId, PivotError> {
        let k = match self.slots.get(entering) {
            Some(&Slot::Nonbasic(k)) => k,
            Some(&Slot::Basic(_)) => {
                return Err(PivotError::InvalidInput(format!(
                    "{} is already basic",
                    self.names[entering]
                )))
            }
            None => {
                return Err(PivotError::InvalidInput(format!(
                    "unknown entering variable {}",
                    entering
                )))
            }
        };
        let row = departure.row;
        let departing = self.basis[row];

        for (x, z) in self.values.iter_mut().zip(&departure.direction) {
            *x -= departure.step * z;
        }
        self.values[row] = departure.step;

        std::mem::swap(&mut self.basic_columns[row], &mut self.nonbasic_columns[k]);
        std::mem::swap(&mut self.basic_costs[row], &mut self.nonbasic_costs[k]);
        self.basis[row] = entering;
        self.nonbasis[k] = departing;
        self.slots[entering] = Slot::Basic(row);
        self.slots[departing] = Slot::Nonbasic(k);

        trace!(
            "pivot: {} enters, {} leaves at row {} (step {:.6})",
            self.names[entering],
            self.names[departing],
            row,
            departure.step
        );
        Ok(departing)
    }

    fn column(&self, var: VarId) -> Result<&[f64], PivotError> {
        match self.slots.get(var) {
            Some(&Slot::Basic(row)) => Ok(&self.basic_columns[row]),
            Some(&Slot::Nonbasic(k)) => Ok(&self.nonbasic_columns[k]),
            None => Err(PivotError::InvalidInput(format!("unknown variable {}", var))),
        }
    }

    fn is_basic(&self, var: VarId) -> bool {
        matches!(self.slots[var], Slot::Basic(_))
    }

    fn value(&self, var: VarId) -> f64 {
        match self.slots[var] {
            Slot::Basic(row) => self.values[row],
            Slot::Nonbasic(_) => 0.0,
        }
    }
}

/// Prints every basic row as an equation in the nonbasic variables,
/// followed by the objective row.
impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.transformed_rows().map_err(|_| fmt::Error)?;
        let reduced = self.reduced_costs().map_err(|_| fmt::Error)?;

        for (r, coefficients) in rows.iter().enumerate() {
            write!(f, "{} = {:.4}", self.names[self.basis[r]], self.values[r])?;
            for (&var, &coef) in self.nonbasis.iter().zip(coefficients) {
                if coef.abs() > self.tolerance {
                    let sign = if coef > 0.0 { '-' } else { '+' };
                    write!(f, " {} {:.4}*{}", sign, coef.abs(), self.names[var])?;
                }
            }
            writeln!(f)?;
        }

        write!(f, "obj = {:.4}", self.objective())?;
        for (var, t) in reduced {
            if t.abs() > self.tolerance {
                let sign = if t > 0.0 { '-' } else { '+' };
                write!(f, " {} {:.4}*{}", sign, t.abs(), self.names[var])?;
            }
        }
        Ok(())
    }
}
