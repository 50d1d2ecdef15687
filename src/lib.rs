pub mod error;
pub mod math;
pub mod loss;
pub mod check;
pub mod problem;

// Convenience re-exports
pub use error::{Result, SoftmaxError};
pub use math::matrix::Matrix;
pub use loss::softmax::{predict, softmax_loss_naive, softmax_loss_vectorized, softmax_probabilities};
pub use loss::strategy::LossStrategy;
pub use check::grad_check::{grad_check_sparse, matrix_rel_error, numerical_gradient, rel_error, GradCheckReport};
pub use problem::{Problem, ProblemConfig};
