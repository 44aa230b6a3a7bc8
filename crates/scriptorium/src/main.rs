//! Scriptorium CLI binary.
//!
//! This binary provides command-line access to Scriptorium's functionality:
//! - Write long stories in one call or in segments
//! - Propose story ideas
//! - List supported languages

use clap::Parser;
use scriptorium::{ObservabilityConfig, ScriptoriumConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, list_languages, run_ideas, run_write};

    // Credentials may live in .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_observability(
        &ObservabilityConfig::default()
            .with_verbosity(cli.verbose)
            .with_json_logs(cli.json_logs),
    )?;

    match cli.command {
        Commands::Write(args) => {
            let config = ScriptoriumConfig::load(cli.config.as_deref())?;
            run_write(args, &config).await?;
        }

        Commands::Ideas(args) => {
            let config = ScriptoriumConfig::load(cli.config.as_deref())?;
            run_ideas(args, &config).await?;
        }

        Commands::Languages => list_languages(),
    }

    Ok(())
}
