//! Softmax (multinomial logistic) classifier loss with L2 regularization.
//!
//! Shapes: `w` is (D, C), `x` is (N, D), `y` holds N labels in `[0, C)`.
//!
//!   L  = -1/N · Σ_i log softmax(x_i · W)[y_i]  +  reg · Σ W²
//!   dW =  1/N · Xᵗ · (P - onehot(y))           +  reg · W
//!
//! The regularization term carries no ½ factor, yet dW adds only `reg · W`.
//! With reg > 0, central differences of L exceed dW by exactly `reg · W`.
//!
//! Both strategies below compute exactly this. `softmax_loss_naive` walks the
//! batch one example at a time; `softmax_loss_vectorized` works on whole
//! matrices. Neither mutates its inputs.

use tracing::debug;

use crate::error::{Result, SoftmaxError};
use crate::math::matrix::Matrix;

/// Checks every precondition shared by both strategies.
pub fn validate_inputs(w: &Matrix, x: &Matrix, y: &[usize], reg: f64) -> Result<()> {
    ensure_rectangular(w)?;
    ensure_rectangular(x)?;

    if w.rows != x.cols {
        return Err(SoftmaxError::ShapeMismatch {
            context: "W rows vs X columns (feature dimension)",
            expected: x.cols,
            actual: w.rows,
        });
    }
    if y.len() != x.rows {
        return Err(SoftmaxError::ShapeMismatch {
            context: "label count vs X rows",
            expected: x.rows,
            actual: y.len(),
        });
    }
    if x.rows == 0 {
        return Err(SoftmaxError::EmptyBatch);
    }
    if let Some((index, &label)) = y.iter().enumerate().find(|&(_, &label)| label >= w.cols) {
        return Err(SoftmaxError::InvalidLabel { index, label, num_classes: w.cols });
    }
    if !reg.is_finite() || reg < 0.0 {
        return Err(SoftmaxError::InvalidParameter(format!(
            "reg must be finite and non-negative, got {reg}"
        )));
    }
    Ok(())
}

fn ensure_rectangular(m: &Matrix) -> Result<()> {
    if m.data.len() != m.rows {
        return Err(SoftmaxError::ShapeMismatch {
            context: "matrix row count vs stored rows",
            expected: m.rows,
            actual: m.data.len(),
        });
    }
    if let Some((row, r)) = m.data.iter().enumerate().find(|(_, r)| r.len() != m.cols) {
        return Err(SoftmaxError::RaggedMatrix { row, expected: m.cols, actual: r.len() });
    }
    Ok(())
}

/// Loop-based reference implementation.
pub fn softmax_loss_naive(w: &Matrix, x: &Matrix, y: &[usize], reg: f64) -> Result<(f64, Matrix)> {
    validate_inputs(w, x, y, reg)?;

    let (n, d) = x.shape();
    let c = w.cols;
    let mut loss = 0.0;
    let mut dw = Matrix::zeros(d, c);
    let mut scores = vec![0.0; c];

    for i in 0..n {
        let x_i = x.row(i);

        for (j, score) in scores.iter_mut().enumerate() {
            let mut z = 0.0;
            for k in 0..d {
                z += x_i[k] * w.data[k][j];
            }
            *score = z;
        }

        // Shift by the row max so exp() never overflows.
        let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let target_shifted = scores[y[i]] - max_score;

        let mut sum_exp = 0.0;
        for score in scores.iter_mut() {
            *score = (*score - max_score).exp();
            sum_exp += *score;
        }

        // -log(exp(s_y) / Σ exp(s)) written in log-space.
        loss += sum_exp.ln() - target_shifted;

        for j in 0..c {
            let mut p = scores[j] / sum_exp;
            if j == y[i] {
                p -= 1.0;
            }
            for k in 0..d {
                dw.data[k][j] += x_i[k] * p;
            }
        }
    }

    let inv_n = 1.0 / n as f64;
    loss *= inv_n;
    loss += reg * w.sum_squares();

    for k in 0..d {
        for j in 0..c {
            dw.data[k][j] = dw.data[k][j] * inv_n + reg * w.data[k][j];
        }
    }

    debug!(n, d, c, reg, loss, "softmax loss (naive)");
    Ok((loss, dw))
}

/// Matrix-expression implementation; same inputs and outputs as
/// `softmax_loss_naive`.
pub fn softmax_loss_vectorized(w: &Matrix, x: &Matrix, y: &[usize], reg: f64) -> Result<(f64, Matrix)> {
    validate_inputs(w, x, y, reg)?;

    let (n, d) = x.shape();
    let c = w.cols;
    let inv_n = 1.0 / n as f64;

    let scores = x.matmul(w)?;
    let StabilizedExp { shifted, exp, sums } = stabilized_exp(&scores);

    let data_loss = shifted.gather(y).iter().zip(sums.iter())
        .map(|(target, sum)| sum.ln() - target)
        .sum::<f64>() * inv_n;
    let loss = data_loss + reg * w.sum_squares();

    // P - onehot(y), built in the private probability buffer.
    let mut probs = exp.broadcast_column(&sums, |e, s| e / s);
    for (row, &label) in probs.data.iter_mut().zip(y.iter()) {
        row[label] -= 1.0;
    }

    let dw = x.transpose().matmul(&probs)?.scale(inv_n) + w.scale(reg);

    debug!(n, d, c, reg, loss, "softmax loss (vectorized)");
    Ok((loss, dw))
}

/// Row-wise softmax of a logits matrix, stabilized by the row maximum.
pub fn softmax_probabilities(logits: &Matrix) -> Matrix {
    let StabilizedExp { exp, sums, .. } = stabilized_exp(logits);
    exp.broadcast_column(&sums, |e, s| e / s)
}

/// Predicted class (argmax of `x · w`) for every example.
pub fn predict(w: &Matrix, x: &Matrix) -> Result<Vec<usize>> {
    ensure_rectangular(w)?;
    ensure_rectangular(x)?;
    if w.cols == 0 {
        return Err(SoftmaxError::InvalidParameter("W has no classes".to_string()));
    }
    let scores = x.matmul(w)?;
    Ok(scores.data.iter().map(|row| argmax(row)).collect())
}

struct StabilizedExp {
    /// logits minus their row max
    shifted: Matrix,
    exp: Matrix,
    sums: Vec<f64>,
}

fn stabilized_exp(logits: &Matrix) -> StabilizedExp {
    let shifted = logits.broadcast_column(&logits.row_max(), |z, max| z - max);
    let exp = shifted.map(f64::exp);
    let sums = exp.row_sums();
    StabilizedExp { shifted, exp, sums }
}

/// Index of the maximum element in a slice.
fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
