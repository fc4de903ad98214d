pub mod design;
pub mod draws;
pub mod error;
pub mod interval;
pub mod summary;
pub mod traits;

pub use design::{LinearCombination, LinearDesign};
pub use draws::PosteriorDraws;
pub use error::SummaryError;
pub use summary::{
    summarize, IntervalKind, PosteriorContrastSummarizer, Summary, SummaryConfig, SummaryMode,
    SummaryRow, MAX_DIGITS,
};
