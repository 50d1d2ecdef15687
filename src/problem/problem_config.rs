use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::error::{Result, SoftmaxError};

/// Describes a synthetic softmax problem and how to check it.
///
/// # Fields
/// - `num_features`    — D, columns of X and rows of W (3072 pixels + bias by default)
/// - `num_classes`     — C, columns of W
/// - `num_examples`    — N, rows of X
/// - `reg`             — regularization strength, `reg * Σ W²`
/// - `weight_scale`    — W is drawn as N(0, 1) · `weight_scale`
/// - `seed`            — RNG seed; `None` draws from OS entropy
/// - `tolerance`       — max relative error accepted between strategies and
///                       in gradient checks
/// - `grad_checks`     — entries sampled by the sparse gradient check
/// - `grad_check_step` — central-difference step h
///
/// Missing JSON fields take their defaults; unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemConfig {
    pub num_features: usize,
    pub num_classes: usize,
    pub num_examples: usize,
    pub reg: f64,
    pub weight_scale: f64,
    pub seed: Option<u64>,
    pub tolerance: f64,
    pub grad_checks: usize,
    pub grad_check_step: f64,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        ProblemConfig {
            num_features: 3073,
            num_classes: 10,
            num_examples: 500,
            reg: 5e-6,
            weight_scale: 1e-4,
            seed: None,
            tolerance: 1e-5,
            grad_checks: 10,
            grad_check_step: 1e-5,
        }
    }
}

impl ProblemConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("num_features", self.num_features),
            ("num_classes", self.num_classes),
            ("num_examples", self.num_examples),
        ] {
            if value == 0 {
                return Err(SoftmaxError::InvalidParameter(format!("{name} must be at least 1")));
            }
        }
        non_negative("reg", self.reg)?;
        non_negative("weight_scale", self.weight_scale)?;
        non_negative("tolerance", self.tolerance)?;
        if !self.grad_check_step.is_finite() || self.grad_check_step <= 0.0 {
            return Err(SoftmaxError::InvalidParameter(format!(
                "grad_check_step must be finite and positive, got {}",
                self.grad_check_step
            )));
        }
        Ok(())
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes and validates a config written by `save_json` (or by hand).
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<ProblemConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: ProblemConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SoftmaxError::InvalidParameter(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}
