pub mod grad_check;

pub use grad_check::{
    grad_check_full, grad_check_sparse, matrix_rel_error, numerical_gradient, rel_error,
    GradCheckReport, GradCheckSample,
};
