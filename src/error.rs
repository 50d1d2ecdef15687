use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoftmaxError {
    /// Two dimensions that must agree do not, e.g. `W.rows` vs `X.cols`.
    #[error("Shape mismatch: {context} expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid label {label} at example {index}: must be in [0, {num_classes})")]
    InvalidLabel {
        index: usize,
        label: usize,
        num_classes: usize,
    },

    #[error("Empty minibatch: at least one example is required")]
    EmptyBatch,

    #[error("Ragged matrix: row {row} has {actual} columns, expected {expected}")]
    RaggedMatrix {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SoftmaxError>;
