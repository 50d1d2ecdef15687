//! ferrite-softmax: runs both softmax loss implementations on a synthetic
//! minibatch, compares them, and gradient-checks the vectorized one.
//!
//! ```text
//! ferrite-softmax --seed 1 --reg 5e-6
//! ferrite-softmax --config problem.json --log-level debug
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{ensure, Context, Result};
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};

use ferrite_softmax::{grad_check_sparse, matrix_rel_error, LossStrategy, Matrix, Problem, ProblemConfig};

#[derive(Parser)]
#[command(name = "ferrite-softmax")]
#[command(about = "Compare naive and vectorized softmax loss on a synthetic minibatch")]
#[command(version)]
struct Cli {
    /// Problem config JSON; defaults are used when omitted
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// RNG seed (overrides the config)
    #[arg(long)]
    seed: Option<u64>,

    /// Regularization strength (overrides the config)
    #[arg(long)]
    reg: Option<f64>,

    /// Minibatch size N (overrides the config)
    #[arg(long)]
    examples: Option<usize>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Write the effective config to this path before running
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

struct Run {
    loss: f64,
    grad: Matrix,
    elapsed: Duration,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = load_config(&cli)?;
    if let Some(path) = &cli.write_config {
        config
            .save_json(path)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        info!(path = %path.display(), "wrote effective config");
    }

    let problem = Problem::generate(&config).context("failed to generate problem")?;
    info!(
        n = config.num_examples,
        d = config.num_features,
        c = config.num_classes,
        reg = config.reg,
        "generated problem"
    );

    compare_strategies(&problem, config.tolerance)?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    // dW reports reg·W against a reg·ΣW² loss, so only the data term is
    // checked against central differences.
    let unregularized = problem.with_reg(0.0);
    let (_, grad) = unregularized.loss(LossStrategy::Vectorized)?;
    let report = grad_check_sparse(
        |w| unregularized.loss_at(w, LossStrategy::Vectorized),
        &unregularized.w,
        &grad,
        config.grad_checks,
        config.grad_check_step,
        &mut rng,
    )?;
    if report.passed(config.tolerance) {
        info!(
            max_rel_error = report.max_rel_error,
            mean_rel_error = report.mean_rel_error,
            "gradient check passed"
        );
    } else {
        warn!(
            max_rel_error = report.max_rel_error,
            tolerance = config.tolerance,
            "gradient check above tolerance"
        );
    }

    Ok(())
}

/// Runs both strategies on `problem` and fails when they disagree beyond
/// `tolerance`.
fn compare_strategies(problem: &Problem, tolerance: f64) -> Result<()> {
    let runs = LossStrategy::ALL
        .iter()
        .map(|&strategy| run_strategy(problem, strategy))
        .collect::<Result<Vec<_>>>()?;
    let (naive, vectorized) = (&runs[0], &runs[1]);

    let speedup = naive.elapsed.as_secs_f64() / vectorized.elapsed.as_secs_f64().max(f64::EPSILON);
    info!(speedup, "naive vs vectorized timing");
    check_agreement(naive, vectorized, tolerance)
}

fn check_agreement(naive: &Run, vectorized: &Run, tolerance: f64) -> Result<()> {
    let loss_diff = (naive.loss - vectorized.loss).abs();
    let grad_rel_error = matrix_rel_error(&naive.grad, &vectorized.grad)?;
    info!(loss_diff, grad_rel_error, "naive vs vectorized agreement");

    ensure!(
        ferrite_softmax::rel_error(naive.loss, vectorized.loss) <= tolerance,
        "loss mismatch: naive={} vectorized={}",
        naive.loss,
        vectorized.loss
    );
    ensure!(
        grad_rel_error <= tolerance,
        "gradient mismatch: max relative error {grad_rel_error:e} exceeds {tolerance:e}"
    );
    Ok(())
}

fn run_strategy(problem: &Problem, strategy: LossStrategy) -> Result<Run> {
    let start = Instant::now();
    let (loss, grad) = problem
        .loss(strategy)
        .with_context(|| format!("{strategy} softmax loss failed"))?;
    let elapsed = start.elapsed();
    info!(%strategy, loss, elapsed_ms = elapsed.as_secs_f64() * 1e3, "computed softmax loss");
    Ok(Run { loss, grad, elapsed })
}

fn load_config(cli: &Cli) -> Result<ProblemConfig> {
    let mut config = match &cli.config {
        Some(path) => ProblemConfig::load_json(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ProblemConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(reg) = cli.reg {
        config.reg = reg;
    }
    if let Some(n) = cli.examples {
        config.num_examples = n;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
