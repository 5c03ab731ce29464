mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::ParameterArgs;

#[derive(Parser)]
#[command(
    name = "rulepay",
    version,
    about = "Compute reward program payments from block-partitioned data"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute payments and write the payment table
    Run {
        #[command(flatten)]
        parameters: ParameterArgs,
        /// Directory to write results.parquet to
        #[arg(long, default_value = "./output")]
        output: PathBuf,
    },
    /// Validate parameters, construct the rule and print its identity
    Check {
        #[command(flatten)]
        parameters: ParameterArgs,
    },
    /// List available rules
    Rules,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { parameters, output } => commands::run::execute(&parameters, &output).await,
        Commands::Check { parameters } => commands::check::execute(&parameters),
        Commands::Rules => commands::rules::execute(),
    }
}
