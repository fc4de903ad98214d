mod fit_trial;
mod recover_effects;
mod sim_trial;
mod summarize_draws;

use fit_trial::*;
use recover_effects::*;
use sim_trial::*;
use summarize_draws::*;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "lupin")]
#[command(version, about = "Longitudinal group-by-time effects from posterior draws")]
struct Cli {
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a two-arm, three-visit trial with missing follow-ups and outliers
    Simulate(SimTrialArgs),
    /// Fit the treatment-coded linear model and write coefficient draws
    Fit(FitTrialArgs),
    /// Summarize coefficient draws as group x time means or within-group contrasts
    Summarize(SummarizeDrawsArgs),
    /// Simulate, fit, and check the intervals against the generating effects
    Recover(RecoverArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    match &cli.commands {
        Commands::Simulate(args) => {
            sim_trial(args)?;
        }
        Commands::Fit(args) => {
            fit_trial(args)?;
        }
        Commands::Summarize(args) => {
            summarize_draws(args)?;
        }
        Commands::Recover(args) => {
            recover_effects(args)?;
        }
    }

    Ok(())
}
