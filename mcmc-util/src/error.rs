use thiserror::Error;

pub type Result<T> = std::result::Result<T, SummaryError>;

/// Errors raised while summarizing posterior draws
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummaryError {
    /// Summary mode other than `means` or `contrasts`
    #[error("unsupported summary mode `{0}` (expected `means` or `contrasts`)")]
    InvalidMode(String),

    /// Malformed draws matrix
    #[error("malformed draws: {0}")]
    Shape(String),

    #[error("non-finite draw at sample {sample}, coefficient {coef}")]
    NonFinite { sample: usize, coef: usize },

    #[error("interval mass must be in (0, 1], got {0}")]
    InvalidMass(f64),

    #[error(
        "at most {max} decimal places are supported, got {0}",
        max = crate::summary::MAX_DIGITS
    )]
    InvalidDigits(u32),

    #[error("invalid design: {0}")]
    InvalidDesign(String),
}
