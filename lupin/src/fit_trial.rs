use anyhow::Result;
use clap::Args;
use log::info;

use lupin::io::{read_trial, write_draws, write_imputed};
use lupin::model::{fit_conjugate, impute_missing, ConjugateFit, FitConfig, PriorSpec};
use lupin::simulation::TrialRecord;
use mcmc_util::{LinearDesign, PosteriorContrastSummarizer, SummaryConfig};

#[derive(Args, Debug, Clone)]
pub struct FitModelArgs {
    /// Number of posterior draws (split across chains)
    #[arg(long, default_value = "4000")]
    pub n_draws: usize,

    /// Number of independent sampling streams run in parallel
    #[arg(long, default_value = "4")]
    pub n_chains: usize,

    /// Random seed; chain `c` uses `seed + c`
    #[arg(long, default_value = "42")]
    pub fit_seed: u64,

    /// Prior variance scale of the coefficients (relative to the noise variance)
    #[arg(long, default_value = "100.0")]
    pub prior_scale: f64,

    /// Prior means of the six coefficients (comma-separated); zero if omitted
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub prior_mean: Option<Vec<f64>>,

    /// Inverse-gamma shape a0 of the noise variance prior
    #[arg(long, default_value = "1.0")]
    pub a0: f64,

    /// Inverse-gamma rate b0 of the noise variance prior
    #[arg(long, default_value = "1.0")]
    pub b0: f64,
}

impl FitModelArgs {
    pub fn to_config(&self) -> FitConfig {
        FitConfig {
            n_draws: self.n_draws,
            n_chains: self.n_chains,
            seed: self.fit_seed,
            prior: PriorSpec {
                mean: self.prior_mean.clone(),
                scale: self.prior_scale,
                a0: self.a0,
                b0: self.b0,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "n_draws": self.n_draws,
            "n_chains": self.n_chains,
            "fit_seed": self.fit_seed,
            "prior_scale": self.prior_scale,
            "prior_mean": self.prior_mean,
            "a0": self.a0,
            "b0": self.b0,
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct FitTrialArgs {
    /// Trial table (`subject group time response`, `.tsv` or `.tsv.gz`)
    pub trial_file: String,

    #[command(flatten)]
    pub model: FitModelArgs,

    /// Also write posterior predictive summaries of missing responses
    #[arg(long, default_value_t = false)]
    pub impute: bool,

    /// Output prefix
    #[arg(short, long)]
    pub output: String,
}

/// Posterior predictive summaries of the missing responses
fn write_imputations(
    records: &[TrialRecord],
    design: &LinearDesign,
    fit: &ConjugateFit,
    config: &FitConfig,
    path: &str,
) -> Result<()> {
    let imputed = impute_missing(records, design, fit, config)?;
    let summarizer = PosteriorContrastSummarizer::new(design.clone(), SummaryConfig::default());
    let summaries = imputed
        .into_iter()
        .map(|imp| -> Result<_> {
            let s = summarizer.summarize_values(&imp.draws)?;
            Ok((imp, s))
        })
        .collect::<Result<Vec<_>>>()?;
    write_imputed(&summaries, path)
}

pub fn fit_trial(args: &FitTrialArgs) -> Result<()> {
    info!("Starting fit");

    let records = read_trial(&args.trial_file)?;
    let design = LinearDesign::group_by_time();
    let config = args.model.to_config();
    let fit = fit_conjugate(&records, &design, &config)?;

    write_draws(&fit.draws, &format!("{}.draws.tsv.gz", args.output))?;

    if args.impute {
        let path = format!("{}.imputed.tsv.gz", args.output);
        write_imputations(&records, &design, &fit, &config, &path)?;
    }

    let param_file = format!("{}.parameters.json", args.output);
    let mut json = args.model.to_json();
    json["command"] = "fit".into();
    json["trial_file"] = args.trial_file.clone().into();
    json["num_observed"] = fit.n_obs.into();
    json["sigma_sq_mean"] = fit.posterior.sigma_sq_mean().into();
    std::fs::write(&param_file, serde_json::to_string_pretty(&json)?)?;
    info!("Wrote parameters: {}", param_file);

    info!("fit completed successfully");
    Ok(())
}
