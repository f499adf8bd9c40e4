//! Character sheet evaluator.
//!
//! A command line front end for the rules engine: evaluate sheets against a
//! rulebook, roll dice, check programs against their functions and look for
//! problems in rule documents.
//!
//! ```bash
//! cargo run -p charsheet -- eval --rulebook srd.json --sheet fighter.json --seed 7
//! cargo run -p charsheet -- roll 2d6+3
//! ```

mod headless;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "charsheet")]
#[command(about = "Evaluate tabletop RPG character sheets against a rulebook")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every variable on a sheet, or just one.
    Eval {
        #[arg(long)]
        rulebook: PathBuf,
        #[arg(long)]
        sheet: PathBuf,
        /// Seed for dice rolls; omitted means a fresh random seed.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        variable: Option<String>,
        /// Add the variables of every active mechanic before evaluating.
        #[arg(long)]
        mechanics: bool,
    },
    /// Roll dice written in notation such as `2d6+1d4+3`.
    Roll {
        notation: String,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a program against every tuple of a function.
    Conformance {
        #[arg(long)]
        rulebook: PathBuf,
        #[arg(long)]
        program: String,
        #[arg(long)]
        function: String,
    },
    /// Report dependency cycles and forward references.
    Check {
        #[arg(long)]
        rulebook: PathBuf,
        #[arg(long)]
        sheet: Option<PathBuf>,
    },
    /// Snapshot a sheet document into a save directory.
    Save {
        #[arg(long)]
        rulebook: PathBuf,
        #[arg(long)]
        sheet: PathBuf,
        #[arg(long, default_value = "saves")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CHARSHEET_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ok = match cli.command {
        Commands::Eval {
            rulebook,
            sheet,
            seed,
            variable,
            mechanics,
        } => {
            headless::run_eval(headless::EvalOptions {
                rulebook,
                sheet,
                seed,
                variable,
                mechanics,
            })
            .await?
        }
        Commands::Roll { notation, seed } => headless::run_roll(&notation, seed)?,
        Commands::Conformance {
            rulebook,
            program,
            function,
        } => headless::run_conformance(&rulebook, &program, &function).await?,
        Commands::Check { rulebook, sheet } => headless::run_check(&rulebook, sheet.as_deref()).await?,
        Commands::Save { rulebook, sheet, dir } => headless::run_save(&rulebook, &sheet, &dir).await?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
