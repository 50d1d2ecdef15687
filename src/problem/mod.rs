pub mod problem_config;
pub mod synthetic;

pub use problem_config::ProblemConfig;
pub use synthetic::Problem;
