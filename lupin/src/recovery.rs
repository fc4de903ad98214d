use anyhow::Result;
use mcmc_util::{PosteriorContrastSummarizer, PosteriorDraws, SummaryMode, SummaryRow};

/// A summarized quantity next to the value that generated the data
#[derive(Debug, Clone)]
pub struct RecoveryRow {
    pub mode: SummaryMode,
    pub row: SummaryRow,
    pub truth: f64,
}

impl RecoveryRow {
    pub fn covered(&self) -> bool {
        self.row.summary.contains(self.truth)
    }
}

/// Pair each summary row with the true value of the same combination
pub fn attach_truth(
    summarizer: &PosteriorContrastSummarizer,
    mode: SummaryMode,
    rows: Vec<SummaryRow>,
    truth: &[f64],
) -> Vec<RecoveryRow> {
    summarizer
        .combinations(mode)
        .iter()
        .zip(rows)
        .map(|(comb, row)| RecoveryRow {
            mode,
            truth: comb.evaluate(truth),
            row,
        })
        .collect()
}

/// Cell means followed by contrasts, each against the generating value
pub fn summarize_recovery(
    summarizer: &PosteriorContrastSummarizer,
    draws: &PosteriorDraws,
    truth: &[f64],
) -> Result<Vec<RecoveryRow>> {
    let mut ret = vec![];
    for mode in [SummaryMode::Means, SummaryMode::Contrasts] {
        let rows = summarizer.summarize(draws, mode)?;
        ret.extend(attach_truth(summarizer, mode, rows, truth));
    }
    Ok(ret)
}
