use rand::Rng;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::error::{Result, SoftmaxError};
use crate::math::matrix::Matrix;

/// Denominator floor for `rel_error`, so two near-zero values compare as equal.
const REL_ERROR_FLOOR: f64 = 1e-8;

/// Relative error `|a - b| / max(1e-8, |a| + |b|)`.
pub fn rel_error(a: f64, b: f64) -> f64 {
    (a - b).abs() / (a.abs() + b.abs()).max(REL_ERROR_FLOOR)
}

/// Largest entry-wise `rel_error` between two same-shape matrices.
pub fn matrix_rel_error(a: &Matrix, b: &Matrix) -> Result<f64> {
    ensure_same_shape(a, b)?;
    Ok(a.data.iter().flatten().zip(b.data.iter().flatten())
        .map(|(&x, &y)| rel_error(x, y))
        .fold(0.0, f64::max))
}

/// One compared gradient entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradCheckSample {
    pub row: usize,
    pub col: usize,
    pub analytic: f64,
    pub numerical: f64,
    pub rel_error: f64,
}

/// Outcome of comparing an analytic gradient against central differences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradCheckReport {
    pub samples: Vec<GradCheckSample>,
    pub max_rel_error: f64,
    pub mean_rel_error: f64,
}

impl GradCheckReport {
    fn from_samples(samples: Vec<GradCheckSample>) -> GradCheckReport {
        let max_rel_error = samples.iter().map(|s| s.rel_error).fold(0.0, f64::max);
        let mean_rel_error = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|s| s.rel_error).sum::<f64>() / samples.len() as f64
        };
        GradCheckReport { samples, max_rel_error, mean_rel_error }
    }

    pub fn passed(&self, tolerance: f64) -> bool {
        self.max_rel_error <= tolerance
    }
}

/// Central-difference estimate of ∂f/∂W for every entry of `w`:
///   (f(W + h·e_ij) - f(W - h·e_ij)) / 2h
///
/// `w` itself is never touched; the probes run on a private copy.
pub fn numerical_gradient<F>(f: F, w: &Matrix, h: f64) -> Result<Matrix>
where
    F: Fn(&Matrix) -> Result<f64>,
{
    ensure_step(h)?;
    let mut probe = w.clone();
    let mut grad = Matrix::zeros(w.rows, w.cols);
    for i in 0..w.rows {
        for j in 0..w.cols {
            grad.data[i][j] = central_difference(&f, &mut probe, i, j, h)?;
        }
    }
    Ok(grad)
}

/// Compares `analytic` against central differences at every entry of `w`.
pub fn grad_check_full<F>(f: F, w: &Matrix, analytic: &Matrix, h: f64) -> Result<GradCheckReport>
where
    F: Fn(&Matrix) -> Result<f64>,
{
    ensure_same_shape(w, analytic)?;
    let numerical = numerical_gradient(f, w, h)?;
    let samples = (0..w.rows)
        .flat_map(|i| (0..w.cols).map(move |j| (i, j)))
        .map(|(i, j)| sample(i, j, analytic.data[i][j], numerical.data[i][j]))
        .collect();
    Ok(GradCheckReport::from_samples(samples))
}

/// Compares `analytic` against central differences at `num_checks` randomly
/// chosen entries of `w` (with replacement).
pub fn grad_check_sparse<F, R>(
    f: F,
    w: &Matrix,
    analytic: &Matrix,
    num_checks: usize,
    h: f64,
    rng: &mut R,
) -> Result<GradCheckReport>
where
    F: Fn(&Matrix) -> Result<f64>,
    R: Rng + ?Sized,
{
    ensure_same_shape(w, analytic)?;
    ensure_step(h)?;
    if w.rows == 0 || w.cols == 0 {
        return Err(SoftmaxError::InvalidParameter(
            "cannot sample entries of an empty matrix".to_string(),
        ));
    }

    let mut probe = w.clone();
    let mut samples = Vec::with_capacity(num_checks);
    for _ in 0..num_checks {
        let i = rng.gen_range(0..w.rows);
        let j = rng.gen_range(0..w.cols);
        let numerical = central_difference(&f, &mut probe, i, j, h)?;
        let s = sample(i, j, analytic.data[i][j], numerical);
        debug!(
            row = s.row, col = s.col,
            numerical = s.numerical, analytic = s.analytic, rel_error = s.rel_error,
            "gradient check sample"
        );
        samples.push(s);
    }
    Ok(GradCheckReport::from_samples(samples))
}

/// Perturbs `probe[i][j]` by ±h, evaluates `f`, and restores the entry.
fn central_difference<F>(f: &F, probe: &mut Matrix, i: usize, j: usize, h: f64) -> Result<f64>
where
    F: Fn(&Matrix) -> Result<f64>,
{
    let original = probe.data[i][j];

    probe.data[i][j] = original + h;
    let plus = f(&*probe);
    probe.data[i][j] = original - h;
    let minus = f(&*probe);
    probe.data[i][j] = original;

    Ok((plus? - minus?) / (2.0 * h))
}

fn sample(row: usize, col: usize, analytic: f64, numerical: f64) -> GradCheckSample {
    GradCheckSample { row, col, analytic, numerical, rel_error: rel_error(analytic, numerical) }
}

fn ensure_same_shape(a: &Matrix, b: &Matrix) -> Result<()> {
    if a.rows != b.rows {
        return Err(SoftmaxError::ShapeMismatch { context: "gradient rows", expected: a.rows, actual: b.rows });
    }
    if a.cols != b.cols {
        return Err(SoftmaxError::ShapeMismatch { context: "gradient columns", expected: a.cols, actual: b.cols });
    }
    Ok(())
}

fn ensure_step(h: f64) -> Result<()> {
    if !h.is_finite() || h <= 0.0 {
        return Err(SoftmaxError::InvalidParameter(format!("step h must be finite and positive, got {h}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    /// f(W) = Σ W³, so ∂f/∂W = 3W².
    fn cubic(w: &Matrix) -> Result<f64> {
        Ok(w.data.iter().flatten().map(|x| x * x * x).sum())
    }

    fn cubic_grad(w: &Matrix) -> Matrix {
        w.map(|x| 3.0 * x * x)
    }

    #[test]
    fn rel_error_is_symmetric_and_floored() {
        assert_eq!(rel_error(1.0, 1.0), 0.0);
        assert_relative_eq!(rel_error(1.0, 3.0), 0.5);
        assert_eq!(rel_error(3.0, 1.0), rel_error(1.0, 3.0));
        // Both tiny: the floor keeps the ratio small instead of ~1.
        assert!(rel_error(1e-12, -1e-12) < 1e-3);
    }

    #[test]
    fn numerical_gradient_matches_cubic() {
        let w = Matrix::from_data(vec![vec![1.0, -2.0], vec![0.5, 3.0]]);
        let num = numerical_gradient(cubic, &w, 1e-5).unwrap();
        assert!(matrix_rel_error(&num, &cubic_grad(&w)).unwrap() < 1e-7);
    }

    #[test]
    fn probing_leaves_input_untouched() {
        let w = Matrix::from_data(vec![vec![0.25, -0.75]]);
        let before = w.clone();
        let _ = numerical_gradient(cubic, &w, 1e-3).unwrap();
        assert_eq!(w, before);
    }

    #[test]
    fn full_check_flags_a_wrong_gradient() {
        let w = Matrix::from_data(vec![vec![1.0, 2.0]]);
        let good = grad_check_full(cubic, &w, &cubic_grad(&w), 1e-5).unwrap();
        assert!(good.passed(1e-6));
        assert_eq!(good.samples.len(), 2);

        let wrong = cubic_grad(&w).scale(2.0);
        let bad = grad_check_full(cubic, &w, &wrong, 1e-5).unwrap();
        assert!(!bad.passed(1e-2));
        assert_relative_eq!(bad.max_rel_error, 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn sparse_check_draws_requested_samples() {
        let w = Matrix::from_data(vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0]]);
        let mut rng = StdRng::seed_from_u64(3);
        let report = grad_check_sparse(cubic, &w, &cubic_grad(&w), 8, 1e-5, &mut rng).unwrap();
        assert_eq!(report.samples.len(), 8);
        assert!(report.samples.iter().all(|s| s.row < 2 && s.col < 3));
        assert!(report.passed(1e-6));
    }

    #[test]
    fn rejects_bad_step_and_shape() {
        let w = Matrix::zeros(2, 2);
        assert!(matches!(numerical_gradient(cubic, &w, 0.0), Err(SoftmaxError::InvalidParameter(_))));
        assert!(matches!(
            grad_check_full(cubic, &w, &Matrix::zeros(2, 3), 1e-5),
            Err(SoftmaxError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn loss_errors_propagate() {
        let w = Matrix::zeros(1, 1);
        let failing = |_: &Matrix| -> Result<f64> { Err(SoftmaxError::EmptyBatch) };
        assert!(matches!(numerical_gradient(failing, &w, 1e-5), Err(SoftmaxError::EmptyBatch)));
    }
}
