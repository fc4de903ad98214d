use anyhow::Result;
use clap::Args;
use log::info;

use lupin::io::{write_trial, write_truth};
use lupin::simulation::{simulate_trial, SimulatedTrial, TrialSimParams};
use mcmc_util::LinearDesign;

#[derive(Args, Debug, Clone)]
pub struct SimTrialArgs {
    /// Subjects per arm
    #[arg(long, default_value = "50")]
    pub n_per_group: usize,

    /// Control mean at the first visit
    #[arg(long, default_value = "20.0")]
    pub baseline: f64,

    /// Control change at visits 2 and 3 (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [2.0, 5.0])]
    pub time_effects: Vec<f64>,

    /// Intervention shift at the first visit
    #[arg(long, default_value = "1.0")]
    pub group_effect: f64,

    /// Extra intervention change at visits 2 and 3 (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_values_t = [0.0, 1.0])]
    pub interaction_effects: Vec<f64>,

    /// Standard deviation of the per-subject random intercept
    #[arg(long, default_value = "1.0")]
    pub subject_sd: f64,

    /// Standard deviation of the measurement noise
    #[arg(long, default_value = "2.0")]
    pub noise_sd: f64,

    /// Responses are truncated below at this value
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    pub lower_bound: f64,

    /// Probability that a follow-up measurement is missing
    #[arg(long, default_value = "0.1")]
    pub missing_rate: f64,

    /// Probability that an observed measurement is an outlier
    #[arg(long, default_value = "0.02")]
    pub outlier_rate: f64,

    /// Shift added to outlying measurements
    #[arg(long, default_value = "15.0", allow_hyphen_values = true)]
    pub outlier_shift: f64,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Output prefix
    #[arg(short, long)]
    pub output: String,
}

impl SimTrialArgs {
    pub fn to_params(&self) -> Result<TrialSimParams> {
        let pair = |name: &str, v: &[f64]| -> Result<[f64; 2]> {
            match v {
                [a, b] => Ok([*a, *b]),
                _ => anyhow::bail!("--{} takes exactly two values, got {}", name, v.len()),
            }
        };
        Ok(TrialSimParams {
            n_per_group: self.n_per_group,
            baseline: self.baseline,
            time_effects: pair("time-effects", &self.time_effects)?,
            group_effect: self.group_effect,
            interaction_effects: pair("interaction-effects", &self.interaction_effects)?,
            subject_sd: self.subject_sd,
            noise_sd: self.noise_sd,
            lower_bound: self.lower_bound,
            missing_rate: self.missing_rate,
            outlier_rate: self.outlier_rate,
            outlier_shift: self.outlier_shift,
            seed: self.seed,
        })
    }
}

pub fn sim_params_json(params: &TrialSimParams) -> serde_json::Value {
    serde_json::json!({
        "n_per_group": params.n_per_group,
        "baseline": params.baseline,
        "time_effects": params.time_effects,
        "group_effect": params.group_effect,
        "interaction_effects": params.interaction_effects,
        "subject_sd": params.subject_sd,
        "noise_sd": params.noise_sd,
        "lower_bound": params.lower_bound,
        "missing_rate": params.missing_rate,
        "outlier_rate": params.outlier_rate,
        "outlier_shift": params.outlier_shift,
        "seed": params.seed,
    })
}

pub fn write_sim_outputs(trial: &SimulatedTrial, output: &str) -> Result<()> {
    write_trial(&trial.records, &format!("{}.trial.tsv.gz", output))?;
    let design = LinearDesign::group_by_time();
    write_truth(
        design.coefficient_names(),
        &trial.truth,
        &format!("{}.truth.tsv", output),
    )
}

pub fn sim_trial(args: &SimTrialArgs) -> Result<()> {
    info!("Starting simulate");

    let params = args.to_params()?;
    let trial = simulate_trial(&params)?;
    write_sim_outputs(&trial, &args.output)?;

    let param_file = format!("{}.parameters.json", args.output);
    let mut json = sim_params_json(&params);
    json["command"] = "simulate".into();
    json["num_records"] = trial.records.len().into();
    json["num_observed"] = trial.num_observed().into();
    std::fs::write(&param_file, serde_json::to_string_pretty(&json)?)?;
    info!("Wrote parameters: {}", param_file);

    info!("simulate completed successfully");
    Ok(())
}
