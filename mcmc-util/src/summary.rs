use crate::design::{LinearCombination, LinearDesign};
use crate::draws::PosteriorDraws;
use crate::error::{Result, SummaryError};
use crate::traits::IntervalOps;

use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// What to derive from the coefficient draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    /// one row per group × time cell
    Means,
    /// within-group differences between timepoints
    Contrasts,
}

impl FromStr for SummaryMode {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "means" => Ok(SummaryMode::Means),
            "contrasts" => Ok(SummaryMode::Contrasts),
            _ => Err(SummaryError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryMode::Means => write!(f, "means"),
            SummaryMode::Contrasts => write!(f, "contrasts"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalKind {
    /// highest posterior density
    Hpd,
    /// central quantiles
    EqualTail,
}

/// Largest number of decimal places `SummaryConfig::digits` may ask for
pub const MAX_DIGITS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryConfig {
    /// probability mass covered by the interval
    pub mass: f64,
    /// decimal places kept in the output, up to [`MAX_DIGITS`]; `None`
    /// keeps full precision
    pub digits: Option<u32>,
    pub interval: IntervalKind,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            mass: 0.95,
            digits: Some(2),
            interval: IntervalKind::Hpd,
        }
    }
}

/// Posterior mean and credible interval of one derived quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Summary {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    fn rounded(self, digits: u32) -> Self {
        let scale = 10f64.powi(digits as i32);
        let round = |x: f64| (x * scale).round() / scale;
        Self {
            estimate: round(self.estimate),
            lower: round(self.lower),
            upper: round(self.upper),
        }
    }
}

/// `(group, label, estimate, lower, upper)`; the label is a time level in
/// `means` mode and a pair such as `t3-t1` in `contrasts` mode
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub group: Box<str>,
    pub label: Box<str>,
    pub summary: Summary,
}

impl SummaryRow {
    pub fn estimate(&self) -> f64 {
        self.summary.estimate
    }

    pub fn lower(&self) -> f64 {
        self.summary.lower
    }

    pub fn upper(&self) -> f64 {
        self.summary.upper
    }
}

/// Turns coefficient draws into group × time means and within-group
/// contrasts with credible intervals
#[derive(Debug, Clone)]
pub struct PosteriorContrastSummarizer {
    design: LinearDesign,
    config: SummaryConfig,
}

impl Default for PosteriorContrastSummarizer {
    fn default() -> Self {
        Self::new(LinearDesign::group_by_time(), SummaryConfig::default())
    }
}

impl PosteriorContrastSummarizer {
    pub fn new(design: LinearDesign, config: SummaryConfig) -> Self {
        Self { design, config }
    }

    pub fn design(&self) -> &LinearDesign {
        &self.design
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// The weight vectors summarized in `mode`, in output order
    pub fn combinations(&self, mode: SummaryMode) -> Vec<LinearCombination> {
        match mode {
            SummaryMode::Means => self.design.cells().to_vec(),
            SummaryMode::Contrasts => self.design.contrasts(),
        }
    }

    /// Summarize every derived quantity of `mode`
    ///
    /// * `draws` - at least one sample with exactly one column per
    ///   design coefficient
    /// * `mode` - cell means or within-group contrasts
    pub fn summarize(&self, draws: &PosteriorDraws, mode: SummaryMode) -> Result<Vec<SummaryRow>> {
        self.check_shape(draws)?;
        self.combinations(mode)
            .into_iter()
            .map(|comb| -> Result<SummaryRow> {
                let values = draws.combine(&comb.weights)?;
                Ok(SummaryRow {
                    group: comb.group,
                    label: comb.label,
                    summary: self.summarize_values(&values)?,
                })
            })
            .collect()
    }

    /// Summarize several independently fitted models. Output order
    /// follows the input; the first failing model aborts the batch.
    pub fn summarize_many(
        &self,
        models: &[(Box<str>, PosteriorDraws)],
        mode: SummaryMode,
    ) -> Result<Vec<(Box<str>, Vec<SummaryRow>)>> {
        models
            .par_iter()
            .map(|(name, draws)| {
                self.summarize(draws, mode)
                    .map(|rows| (name.clone(), rows))
            })
            .collect()
    }

    /// Mean and interval of a single derived draw sequence
    ///
    /// The interval is widened when needed so that
    /// `lower <= estimate <= upper` holds for every input.
    pub fn summarize_values(&self, values: &[f64]) -> Result<Summary> {
        if let Some(digits) = self.config.digits.filter(|&d| d > MAX_DIGITS) {
            return Err(SummaryError::InvalidDigits(digits));
        }
        let estimate = values.sample_mean();
        // both interval kinds always contain the estimate
        let (lower, upper) = match self.config.interval {
            IntervalKind::Hpd => values.hpd_interval_around(self.config.mass, estimate)?,
            IntervalKind::EqualTail => {
                let (lo, hi) = values.equal_tail_interval(self.config.mass)?;
                (lo.min(estimate), hi.max(estimate))
            }
        };
        let summary = Summary {
            estimate,
            lower,
            upper,
        };
        Ok(match self.config.digits {
            Some(digits) => summary.rounded(digits),
            None => summary,
        })
    }

    fn check_shape(&self, draws: &PosteriorDraws) -> Result<()> {
        if draws.is_empty() {
            return Err(SummaryError::Shape("draws matrix has no samples".into()));
        }
        if draws.ncols() != self.design.n_coefficients() {
            return Err(SummaryError::Shape(format!(
                "draws matrix has {} columns, design expects {}",
                draws.ncols(),
                self.design.n_coefficients()
            )));
        }
        Ok(())
    }
}

/// Summarize draws of the two-group, three-timepoint design
pub fn summarize(
    draws: &PosteriorDraws,
    mode: SummaryMode,
    config: SummaryConfig,
) -> Result<Vec<SummaryRow>> {
    PosteriorContrastSummarizer::new(LinearDesign::group_by_time(), config).summarize(draws, mode)
}
