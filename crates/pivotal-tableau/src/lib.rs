mod cutting_stock;
mod error;
mod game;
mod knapsack;
mod lcp;
mod linalg;
mod problem;
mod simplex;
mod solution;
mod tableau;

pub use cutting_stock::{ColumnGeneration, CuttingStock};
pub use error::PivotError;
pub use game::BimatrixGame;
pub use knapsack::{Knapsack, KnapsackPattern};
pub use lcp::{complement, is_complementary, Lcp, LemkeHowson};
pub use linalg::LuFactors;
pub use problem::{Constraint, LinearProgram, Objective};
pub use simplex::{optimize, Simplex};
pub use solution::{
    CuttingStockSolution, LcpSolution, LpSolution, NashEquilibrium, PatternUsage, SolutionStatus,
};
pub use tableau::{Column, Departure, EnteringRule, Pivotable, Tableau, VarId};
