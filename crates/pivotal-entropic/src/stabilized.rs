use crate::error::TransportError;
use crate::ipfp::{IpfpConfig, TransportSolver};
use crate::log_domain::iterate_potentials;
use crate::problem::TransportProblem;
use crate::solution::TransportSolution;

/// Log-domain IPFP with every `log Σ exp` shifted by its largest term, so no
/// exponent is positive. The default solver; remains exact for `σ` far below
/// the range of `Φ`.
#[derive(Debug, Clone, Default)]
pub struct StabilizedIpfp {
    config: IpfpConfig,
}

impl StabilizedIpfp {
    pub const LABEL: &'static str = "ipfp-log-stabilized";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IpfpConfig) -> Self {
        Self { config }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.config.tolerance = tol;
        self
    }
}

impl TransportSolver for StabilizedIpfp {
    fn label(&self) -> &'static str {
        Self::LABEL
    }

    fn config(&self) -> &IpfpConfig {
        &self.config
    }

    fn solve(&self, problem: &TransportProblem, sigma: f64) -> Result<TransportSolution, TransportError> {
        iterate_potentials(problem, sigma, &self.config, Self::LABEL, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipfp::IpfpVariant;
    use crate::log_domain::LogDomainIpfp;
    use crate::matrix::MatrixIpfp;
    use crate::solution::SolutionStatus;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn balanced() -> TransportProblem {
        TransportProblem::new(
            vec![
                vec![0.1, 0.9, 0.4],
                vec![0.7, 0.2, 0.5],
                vec![0.3, 0.6, 1.0],
            ],
            vec![1.0 / 3.0; 3],
            vec![1.0 / 3.0; 3],
        )
        .unwrap()
    }

    /// Joint surplus of the two-sided market, singles allowed on both sides
    fn tu_market() -> TransportProblem {
        let alpha = [[0.2, 0.6], [0.3, -0.1], [0.7, 0.5]];
        let gamma = [[0.7, 0.3], [0.3, 0.6], [0.2, -0.2]];
        let phi = alpha
            .iter()
            .zip(&gamma)
            .map(|(a, g)| a.iter().zip(g).map(|(x, y)| x + y).collect())
            .collect();
        TransportProblem::matching_market(phi, vec![1.0 / 3.0; 3], vec![1.0 / 3.0; 2]).unwrap()
    }

    #[test]
    fn test_variants_agree_at_moderate_sigma() {
        init();
        let problem = balanced();
        let solutions: Vec<TransportSolution> = IpfpVariant::ALL
            .iter()
            .map(|v| v.solver(IpfpConfig::default()).solve(&problem, 0.1).unwrap())
            .collect();

        for s in &solutions {
            println!("{}: {} iterations, valobs {:.9}", s.label, s.iterations, s.valobs);
            assert_eq!(s.status, SolutionStatus::Converged);
        }
        for s in &solutions[1..] {
            let distance = s.coupling_distance(&solutions[0]);
            assert!(distance < 1e-6, "{} vs {}: {}", s.label, solutions[0].label, distance);
            assert!((s.valobs - solutions[0].valobs).abs() < 1e-6);
            assert!((s.valtot - solutions[0].valtot).abs() < 1e-6);
        }
    }

    #[test]
    fn test_only_stabilized_survives_small_sigma() {
        let problem = balanced();
        let sigma = 0.001;
        assert!(problem.surplus_range() > 10.0 * sigma);

        assert!(matches!(
            MatrixIpfp::new().solve(&problem, sigma),
            Err(TransportError::NumericalInstability { .. })
        ));
        assert!(matches!(
            LogDomainIpfp::new().solve(&problem, sigma),
            Err(TransportError::NumericalInstability { .. })
        ));

        let solution = StabilizedIpfp::new().solve(&problem, sigma).unwrap();
        assert_eq!(solution.status, SolutionStatus::Converged);
        assert!(solution.residual < 1e-6);
        assert!(solution.coupling.iter().flatten().all(|x| x.is_finite()));
        // The regularised optimum is the assignment 0→1, 1→0, 2→2
        assert!((solution.valobs - 2.6 / 3.0).abs() < 1e-6, "valobs {}", solution.valobs);
    }

    #[test]
    fn test_tu_market_recovers_optimal_matching() {
        init();
        let problem = tu_market();
        let solution = StabilizedIpfp::new()
            .with_tolerance(1e-5)
            .solve(&problem, 0.001)
            .unwrap();

        println!("Iterations: {}", solution.iterations);
        println!("valobs: {:.8}", solution.valobs);

        assert_eq!(solution.status, SolutionStatus::Converged);
        assert!((solution.valobs - 0.6).abs() < 1e-5, "valobs {}", solution.valobs);

        let third = 1.0 / 3.0;
        assert!((solution.coupling[0][1] - third).abs() < 1e-4);
        assert!((solution.coupling[2][0] - third).abs() < 1e-4);

        let unmatched_rows = solution.unmatched_rows.as_ref().unwrap();
        assert!((unmatched_rows[1] - third).abs() < 1e-4);
        assert!(unmatched_rows[0] < 1e-4 && unmatched_rows[2] < 1e-4);
        let unmatched_cols = solution.unmatched_cols.as_ref().unwrap();
        assert!(unmatched_cols.iter().all(|&s| s < 1e-4));
    }

    #[test]
    fn test_marginals_hold_on_random_problems() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..5 {
            let problem = TransportProblem::random(&mut rng, 5, 4).unwrap();
            let solution = StabilizedIpfp::new().solve(&problem, 0.05).unwrap();
            assert_eq!(solution.status, SolutionStatus::Converged);
            for (s, nx) in solution.row_sums.iter().zip(&problem.n) {
                assert!((s - nx).abs() < 1e-9);
            }
            for (s, my) in solution.col_sums.iter().zip(&problem.m) {
                assert!((s - my).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_regularised_value_exceeds_observed_value() {
        // The entropy term is nonnegative for a coupling of unit mass
        let solution = StabilizedIpfp::new().solve(&balanced(), 0.1).unwrap();
        assert!(solution.valtot >= solution.valobs);
    }

    #[test]
    fn test_cap_returns_last_iterate() {
        let solution = StabilizedIpfp::new()
            .with_max_iterations(10)
            .solve(&tu_market(), 0.001)
            .unwrap();
        assert_eq!(solution.status, SolutionStatus::DidNotConverge);
        assert_eq!(solution.iterations, 10);
        assert!(solution.residual.is_finite());
    }
}
