use thiserror::Error;

/// Why a regression run produced no result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressionError {
    #[error("select at least one explanatory variable")]
    EmptySelection,

    #[error("invalid formula '{formula}': {reason}")]
    Formula { formula: String, reason: String },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("dependent variable '{column}' {reason}")]
    InvalidResponse { column: String, reason: String },

    #[error("singular design matrix: {0}")]
    SingularDesign(String),

    #[error("{rows} usable row(s) are too few to estimate {params} parameters")]
    InsufficientData { rows: usize, params: usize },

    #[error("fit did not converge after {iterations} iterations (max |gradient| = {gradient:.3e})")]
    NoConvergence { iterations: usize, gradient: f64 },

    #[error("numerical failure: {0}")]
    Numerical(String),
}

pub type Result<T> = std::result::Result<T, RegressionError>;
