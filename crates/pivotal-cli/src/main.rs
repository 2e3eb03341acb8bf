use clap::{Parser, Subcommand, ValueEnum};
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use pivotal_entropic::{IpfpConfig, IpfpVariant, TransportProblem, TransportSolution};
use pivotal_tableau::{
    BimatrixGame, ColumnGeneration, CuttingStock, EnteringRule, LemkeHowson, LinearProgram, NashEquilibrium,
    Simplex,
};

#[derive(Parser)]
#[command(name = "pivotal")]
#[command(about = "Benchmark driver for pivoting and entropic transport solvers", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Entropic optimal transport by IPFP
    Transport {
        /// JSON instance: {"surplus": [[..]], "n": [..], "m": [..], "market": false}
        file: PathBuf,
        /// Regularization level
        #[arg(short, long, default_value_t = 0.1)]
        sigma: f64,
        /// Solve at each of these levels in parallel instead of --sigma
        #[arg(long, value_delimiter = ',')]
        sweep: Vec<f64>,
        #[arg(long, value_enum, default_value = "stabilized")]
        variant: Variant,
        #[arg(short, long, default_value_t = 1e-9)]
        tolerance: f64,
        #[arg(long, default_value_t = 100_000)]
        max_iterations: usize,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Cutting-stock LP relaxation by column generation
    CuttingStock {
        /// JSON instance: {"widths": [..], "demand": [..], "roll_width": W}
        file: PathBuf,
        #[arg(long, default_value_t = 10_000)]
        max_iterations: usize,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Nash equilibria of a bimatrix game by Lemke-Howson
    Nash {
        /// JSON instance: {"a": [[..]], "b": [[..]]}
        file: PathBuf,
        /// Label dropped at the start of the path
        #[arg(short, long, default_value_t = 0)]
        label: usize,
        /// Run from every label and list the distinct equilibria
        #[arg(long)]
        all_labels: bool,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Slack-basis primal simplex on a small LP
    Simplex {
        /// JSON LinearProgram with nonnegative right-hand sides
        file: PathBuf,
        /// Use the most negative reduced cost instead of Bland's rule
        #[arg(long)]
        dantzig: bool,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    Matrix,
    Log,
    Stabilized,
    All,
}

impl Variant {
    fn variants(self) -> Vec<IpfpVariant> {
        match self {
            Variant::Matrix => vec![IpfpVariant::Matrix],
            Variant::Log => vec![IpfpVariant::LogDomain],
            Variant::Stabilized => vec![IpfpVariant::Stabilized],
            Variant::All => IpfpVariant::ALL.to_vec(),
        }
    }
}

#[derive(Deserialize)]
struct TransportInstance {
    surplus: Vec<Vec<f64>>,
    n: Vec<f64>,
    m: Vec<f64>,
    /// Allow both sides to stay unmatched
    #[serde(default)]
    market: bool,
}

fn load<T: DeserializeOwned>(file: &Path) -> T {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&source) {
        Ok(instance) => {
            debug!("loaded {} ({} bytes)", file.display(), source.len());
            instance
        }
        Err(e) => {
            eprintln!("Error parsing {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("Error serializing result: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_transport(solution: &TransportSolution) {
    println!("Algorithm: {}", solution.label);
    println!("Sigma: {}", solution.sigma);
    println!("Status: {:?}", solution.status);
    println!("Iterations: {}", solution.iterations);
    println!("Residual: {:.3e}", solution.residual);
    println!("Observed value: {:.8}", solution.valobs);
    println!("Regularized value: {:.8}", solution.valtot);
    println!("Elapsed: {:?}", solution.elapsed);
    println!("Coupling:");
    for row in &solution.coupling {
        let cells: Vec<String> = row.iter().map(|x| format!("{:10.6}", x)).collect();
        println!("  {}", cells.join(" "));
    }
    if let (Some(rows), Some(cols)) = (&solution.unmatched_rows, &solution.unmatched_cols) {
        println!("Unmatched rows: {:?}", rows);
        println!("Unmatched columns: {:?}", cols);
    }
}

fn print_equilibrium(eq: &NashEquilibrium) {
    println!("Status: {:?}", eq.status);
    println!("Row strategy: {:?}", eq.row_strategy);
    println!("Column strategy: {:?}", eq.column_strategy);
    println!("Payoffs: row {:.6}, column {:.6}", eq.row_payoff, eq.column_payoff);
    println!("Pivots: {}", eq.pivots);
    println!("Elapsed: {:?}", eq.elapsed);
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Transport {
            file,
            sigma,
            sweep,
            variant,
            tolerance,
            max_iterations,
            format,
        } => {
            let instance: TransportInstance = load(&file);
            let built = if instance.market {
                TransportProblem::matching_market(instance.surplus, instance.n, instance.m)
            } else {
                TransportProblem::new(instance.surplus, instance.n, instance.m)
            };
            let problem = match built {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Invalid instance: {}", e);
                    std::process::exit(1);
                }
            };

            let config = IpfpConfig {
                max_iterations,
                tolerance,
            };
            let sigmas = if sweep.is_empty() { vec![sigma] } else { sweep };
            debug!(
                "transport: {}x{} instance, total mass {}, sigmas {:?}",
                problem.num_rows(),
                problem.num_cols(),
                problem.total_mass(),
                sigmas
            );

            let mut solutions = Vec::new();
            let mut failed = false;
            for v in variant.variants() {
                debug!("running {} variant", v);
                let solver = v.solver(config);
                for result in pivotal_entropic::solve_batch(solver.as_ref(), &problem, &sigmas) {
                    match result {
                        Ok(solution) => solutions.push(solution),
                        Err(e) => {
                            eprintln!("{}: {}", v, e);
                            failed = true;
                        }
                    }
                }
            }

            if format == "json" {
                print_json(&solutions);
            } else {
                for (i, solution) in solutions.iter().enumerate() {
                    if i > 0 {
                        println!();
                    }
                    print_transport(solution);
                }
            }
            if failed {
                std::process::exit(1);
            }
        }
        Commands::CuttingStock {
            file,
            max_iterations,
            format,
        } => {
            let instance: CuttingStock = load(&file);
            let problem = match CuttingStock::new(instance.widths, instance.demand, instance.roll_width) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("Invalid instance: {}", e);
                    std::process::exit(1);
                }
            };

            let solution = match ColumnGeneration::new()
                .with_max_iterations(max_iterations)
                .solve(&problem)
            {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Solver error: {}", e);
                    std::process::exit(1);
                }
            };

            if format == "json" {
                print_json(&solution);
            } else {
                println!("Algorithm: {}", solution.label);
                println!("Status: {:?}", solution.status);
                println!("Rolls (LP bound): {:.6}", solution.objective_value);
                println!("Iterations: {}", solution.iterations);
                println!("Elapsed: {:?}", solution.elapsed);
                println!();
                println!("Patterns:");
                for usage in &solution.patterns {
                    if usage.rolls > 1e-9 {
                        println!("  {:?} x {:.4}", usage.pattern, usage.rolls);
                    }
                }
            }
        }
        Commands::Nash {
            file,
            label,
            all_labels,
            format,
        } => {
            let instance: BimatrixGame = load(&file);
            let game = match BimatrixGame::new(instance.a, instance.b) {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("Invalid game: {}", e);
                    std::process::exit(1);
                }
            };

            debug!(
                "nash: {}x{} game, {}",
                game.num_rows(),
                game.num_cols(),
                if all_labels { "all labels".to_string() } else { format!("label {}", label) }
            );
            let solver = LemkeHowson::new();
            let result = if all_labels {
                game.equilibria_from_all_labels(&solver)
            } else {
                game.solve(&solver, label).map(|eq| vec![eq])
            };
            let equilibria = match result {
                Ok(eqs) => eqs,
                Err(e) => {
                    eprintln!("Solver error: {}", e);
                    std::process::exit(1);
                }
            };

            if format == "json" {
                print_json(&equilibria);
            } else {
                println!("Algorithm: {}", LemkeHowson::LABEL);
                for (i, eq) in equilibria.iter().enumerate() {
                    println!();
                    println!("Equilibrium {}:", i + 1);
                    print_equilibrium(eq);
                }
            }
        }
        Commands::Simplex { file, dantzig, format } => {
            let problem: LinearProgram = load(&file);
            let rule = if dantzig { EnteringRule::Dantzig } else { EnteringRule::Bland };
            debug!(
                "simplex: {} variables, {} constraints, {:?} rule",
                problem.num_variables(),
                problem.num_constraints(),
                rule
            );

            let solution = match Simplex::new().with_rule(rule).solve(&problem) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Solver error: {}", e);
                    std::process::exit(1);
                }
            };

            if format == "json" {
                print_json(&solution);
            } else {
                println!("Algorithm: {}", solution.label);
                println!("Status: {:?}", solution.status);
                println!("Objective: {:.6}", solution.objective_value);
                println!("Iterations: {}", solution.iterations);
                println!("Elapsed: {:?}", solution.elapsed);
                println!();
                println!("Values:");
                for (name, value) in problem.variables.iter().zip(&solution.values) {
                    println!("  {:20} {:10.4}", name, value);
                }
                println!("Shadow prices:");
                for (c, price) in problem.constraints.iter().zip(&solution.shadow_prices) {
                    println!("  {:20} {:10.4}", c.name, price);
                }
            }
        }
    }
}
