use anyhow::Result;
use clap::Args;
use log::{info, warn};
use std::io::Write;

use crate::fit_trial::FitModelArgs;
use crate::sim_trial::{sim_params_json, write_sim_outputs, SimTrialArgs};
use crate::summarize_draws::SummaryArgs;

use lupin::io::{open_buf_writer, write_draws};
use lupin::model::fit_conjugate;
use lupin::recovery::{summarize_recovery, RecoveryRow};
use lupin::simulation::simulate_trial;
use mcmc_util::{LinearDesign, PosteriorContrastSummarizer};

#[derive(Args, Debug, Clone)]
pub struct RecoverArgs {
    #[command(flatten)]
    pub sim: SimTrialArgs,

    #[command(flatten)]
    pub model: FitModelArgs,

    #[command(flatten)]
    pub summary: SummaryArgs,
}

fn write_recovery(rows: &[RecoveryRow], path: &str) -> Result<()> {
    let mut buf = open_buf_writer(path)?;
    writeln!(buf, "mode\tgroup\tlabel\ttruth\testimate\tlower\tupper\tcovered")?;
    for r in rows {
        writeln!(
            buf,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.mode,
            r.row.group,
            r.row.label,
            r.truth,
            r.row.estimate(),
            r.row.lower(),
            r.row.upper(),
            r.covered()
        )?;
    }
    buf.flush()?;
    Ok(())
}

pub fn recover_effects(args: &RecoverArgs) -> Result<()> {
    info!("Starting recover");
    let output = &args.sim.output;

    // ── simulate ──
    let params = args.sim.to_params()?;
    let trial = simulate_trial(&params)?;
    write_sim_outputs(&trial, output)?;

    // ── fit ──
    let design = LinearDesign::group_by_time();
    let config = args.model.to_config();
    let fit = fit_conjugate(&trial.records, &design, &config)?;
    write_draws(&fit.draws, &format!("{}.draws.tsv.gz", output))?;

    // ── summarize against the truth ──
    let summarizer = PosteriorContrastSummarizer::new(design, args.summary.to_config());
    let recovery = summarize_recovery(&summarizer, &fit.draws, &trial.truth)?;

    let n_covered = recovery.iter().filter(|r| r.covered()).count();
    info!(
        "{} of {} true values inside their {:.0}% intervals",
        n_covered,
        recovery.len(),
        100.0 * args.summary.mass
    );
    for r in recovery.iter().filter(|r| !r.covered()) {
        warn!(
            "{} {} {}: truth {} outside [{}, {}]",
            r.mode,
            r.row.group,
            r.row.label,
            r.truth,
            r.row.lower(),
            r.row.upper()
        );
    }

    let recovery_file = format!("{}.recovery.tsv", output);
    write_recovery(&recovery, &recovery_file)?;
    info!("Wrote recovery table: {}", recovery_file);

    let param_file = format!("{}.parameters.json", output);
    let json = serde_json::json!({
        "command": "recover",
        "simulation": sim_params_json(&params),
        "fit": args.model.to_json(),
        "mass": args.summary.mass,
        "num_observed": fit.n_obs,
        "num_covered": n_covered,
        "num_summaries": recovery.len(),
    });
    std::fs::write(&param_file, serde_json::to_string_pretty(&json)?)?;
    info!("Wrote parameters: {}", param_file);

    info!("recover completed successfully");
    Ok(())
}
