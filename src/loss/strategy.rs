use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::Result;
use crate::loss::softmax::{softmax_loss_naive, softmax_loss_vectorized};
use crate::math::matrix::Matrix;

/// Selects which softmax loss implementation to run.
///
/// - `Naive`      — explicit per-example loops; the readable reference.
/// - `Vectorized` — whole-batch matrix products; the fast path.
///
/// Both return the same `(loss, dW)` up to floating-point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossStrategy {
    Naive,
    #[default]
    Vectorized,
}

impl LossStrategy {
    pub const ALL: [LossStrategy; 2] = [LossStrategy::Naive, LossStrategy::Vectorized];

    pub fn compute(&self, w: &Matrix, x: &Matrix, y: &[usize], reg: f64) -> Result<(f64, Matrix)> {
        match self {
            LossStrategy::Naive      => softmax_loss_naive(w, x, y, reg),
            LossStrategy::Vectorized => softmax_loss_vectorized(w, x, y, reg),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LossStrategy::Naive      => "naive",
            LossStrategy::Vectorized => "vectorized",
        }
    }
}

impl fmt::Display for LossStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "naive"      => Ok(LossStrategy::Naive),
            "vectorized" => Ok(LossStrategy::Vectorized),
            other => Err(format!("unknown loss strategy '{other}' (expected naive or vectorized)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_displays_names() {
        for strategy in LossStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<LossStrategy>().unwrap(), strategy);
        }
        assert_eq!("Naive".parse::<LossStrategy>().unwrap(), LossStrategy::Naive);
        assert!("blas".parse::<LossStrategy>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&LossStrategy::Vectorized).unwrap();
        assert_eq!(json, "\"vectorized\"");
        let back: LossStrategy = serde_json::from_str("\"naive\"").unwrap();
        assert_eq!(back, LossStrategy::Naive);
    }

    #[test]
    fn compute_dispatches_to_matching_implementation() {
        let w = Matrix::from_data(vec![vec![0.1, -0.2], vec![0.3, 0.05]]);
        let x = Matrix::from_data(vec![vec![1.0, 2.0], vec![-1.0, 0.5]]);
        let y = [1, 0];
        let direct = softmax_loss_naive(&w, &x, &y, 0.1).unwrap();
        let dispatched = LossStrategy::Naive.compute(&w, &x, &y, 0.1).unwrap();
        assert_eq!(direct, dispatched);
    }
}
