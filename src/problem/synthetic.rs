use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::debug;

use crate::error::Result;
use crate::loss::strategy::LossStrategy;
use crate::math::matrix::Matrix;
use crate::problem::problem_config::ProblemConfig;

/// A random minibatch plus weights: everything a loss call needs.
#[derive(Debug, Clone)]
pub struct Problem {
    /// (D, C)
    pub w: Matrix,
    /// (N, D)
    pub x: Matrix,
    pub y: Vec<usize>,
    pub reg: f64,
}

impl Problem {
    /// Builds a problem from `config`, seeded from `config.seed` when set.
    pub fn generate(config: &ProblemConfig) -> Result<Problem> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Problem::generate_with(config, &mut rng)
    }

    /// Same as `generate`, drawing from the caller's RNG.
    pub fn generate_with<R: Rng + ?Sized>(config: &ProblemConfig, rng: &mut R) -> Result<Problem> {
        config.validate()?;
        let (d, c, n) = (config.num_features, config.num_classes, config.num_examples);

        let w = Matrix::randn(d, c, rng).scale(config.weight_scale);
        let x = Matrix::randn(n, d, rng);
        let y = (0..n).map(|_| rng.gen_range(0..c)).collect();

        debug!(n, d, c, reg = config.reg, "generated synthetic problem");
        Ok(Problem { w, x, y, reg: config.reg })
    }

    pub fn loss(&self, strategy: LossStrategy) -> Result<(f64, Matrix)> {
        strategy.compute(&self.w, &self.x, &self.y, self.reg)
    }

    /// Loss only, at weights `w` instead of `self.w`. This is the closure body
    /// handed to the gradient checker.
    pub fn loss_at(&self, w: &Matrix, strategy: LossStrategy) -> Result<f64> {
        strategy.compute(w, &self.x, &self.y, self.reg).map(|(loss, _)| loss)
    }

    pub fn with_reg(&self, reg: f64) -> Problem {
        Problem { reg, ..self.clone() }
    }
}
