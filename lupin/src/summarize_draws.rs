use anyhow::Result;
use clap::{Args, ValueEnum};
use log::info;
use std::path::Path;

use lupin::io::{read_draws, write_summary};
use mcmc_util::{
    IntervalKind, LinearDesign, PosteriorContrastSummarizer, PosteriorDraws, SummaryConfig,
    SummaryMode, MAX_DIGITS,
};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum IntervalArg {
    /// highest posterior density interval
    Hpd,
    /// interval between central quantiles
    EqualTail,
}

impl From<IntervalArg> for IntervalKind {
    fn from(arg: IntervalArg) -> Self {
        match arg {
            IntervalArg::Hpd => IntervalKind::Hpd,
            IntervalArg::EqualTail => IntervalKind::EqualTail,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SummaryArgs {
    /// Probability mass of the credible intervals
    #[arg(long, default_value = "0.95")]
    pub mass: f64,

    /// Decimal places in the output (at most 15)
    #[arg(
        long,
        default_value = "2",
        value_parser = clap::value_parser!(u32).range(0..=MAX_DIGITS as i64)
    )]
    pub digits: u32,

    /// Keep full precision instead of rounding
    #[arg(long, default_value_t = false)]
    pub no_round: bool,

    /// Interval type
    #[arg(long, value_enum, default_value = "hpd")]
    pub interval: IntervalArg,
}

impl SummaryArgs {
    pub fn to_config(&self) -> SummaryConfig {
        SummaryConfig {
            mass: self.mass,
            digits: (!self.no_round).then_some(self.digits),
            interval: self.interval.into(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SummarizeDrawsArgs {
    /// Draws files written by `lupin fit`; several files are summarized
    /// as separate models
    #[arg(required = true)]
    pub draws_files: Vec<String>,

    /// `means` (group x time cells) or `contrasts` (within-group visit
    /// differences)
    #[arg(long, short, default_value = "means")]
    pub mode: SummaryMode,

    #[command(flatten)]
    pub summary: SummaryArgs,

    /// Output file
    #[arg(short, long, default_value = "stdout")]
    pub output: String,
}

/// File name without directory and the `.draws.tsv[.gz]` suffix
fn model_name(file: &str) -> Box<str> {
    let base = Path::new(file)
        .file_name()
        .and_then(|x| x.to_str())
        .unwrap_or(file);
    let mut name = base;
    for suffix in [".gz", ".tsv", ".draws"] {
        name = name.strip_suffix(suffix).unwrap_or(name);
    }
    name.into()
}

pub fn label_header(mode: SummaryMode) -> &'static str {
    match mode {
        SummaryMode::Means => "time",
        SummaryMode::Contrasts => "contrast",
    }
}

pub fn summarize_draws(args: &SummarizeDrawsArgs) -> Result<()> {
    info!("Starting summarize ({})", args.mode);

    let models = args
        .draws_files
        .iter()
        .map(|f| -> Result<(Box<str>, PosteriorDraws)> {
            Ok((model_name(f), read_draws(f)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let summarizer =
        PosteriorContrastSummarizer::new(LinearDesign::group_by_time(), args.summary.to_config());
    let summaries = summarizer.summarize_many(&models, args.mode)?;

    write_summary(&summaries, label_header(args.mode), &args.output)?;
    info!("summarize completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_names_drop_suffixes() {
        assert_eq!(model_name("out/run1.draws.tsv.gz").as_ref(), "run1");
        assert_eq!(model_name("run2.tsv").as_ref(), "run2");
        assert_eq!(model_name("plain").as_ref(), "plain");
    }

    #[derive(clap::Parser)]
    struct SummaryCli {
        #[command(flatten)]
        summary: SummaryArgs,
    }

    #[test]
    fn digits_are_bounded_on_the_command_line() {
        use clap::Parser;
        let cli = SummaryCli::try_parse_from(["lupin", "--digits", "15"]).unwrap();
        assert_eq!(cli.summary.to_config().digits, Some(15));
        assert!(SummaryCli::try_parse_from(["lupin", "--digits", "400"]).is_err());
        let cli = SummaryCli::try_parse_from(["lupin", "--no-round"]).unwrap();
        assert_eq!(cli.summary.to_config().digits, None);
    }
}
