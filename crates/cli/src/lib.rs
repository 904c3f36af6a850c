pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "staywise",
    about = "Staywise operator CLI",
    long_about = "Inspect configuration, check readiness, and exercise the hotel search agent from a terminal.",
    after_help = "Examples:\n  staywise doctor --json\n  staywise decode \"Lisbon from 2025-05-01 to 2025-05-04 for 2 adults\"\n  staywise rates --file rates.json --cheapest-first"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, provider key readiness, and LLM client setup")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Decode destination, dates, and party size from a free-text request")]
    Decode {
        #[arg(help = "Free-text search request")]
        text: String,
    },
    #[command(about = "Normalize and rank a saved rate-search response")]
    Rates {
        #[arg(long, help = "Path to a JSON rate-search response")]
        file: PathBuf,
        #[arg(long, help = "Order hotels by their cheapest rate")]
        cheapest_first: bool,
    },
    #[command(about = "Run one agent turn against the configured model and provider")]
    Chat {
        #[arg(help = "User message")]
        text: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Decode { text } => commands::decode::run(&text),
        Command::Rates { file, cheapest_first } => commands::rates::run(&file, cheapest_first),
        Command::Chat { text } => commands::chat::run(&text),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
