pub mod softmax;
pub mod strategy;

pub use softmax::{predict, softmax_loss_naive, softmax_loss_vectorized, softmax_probabilities, validate_inputs};
pub use strategy::LossStrategy;
