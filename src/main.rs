//! Evotape CLI - run evolutionary searches and inspect strategy codes.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{ArgAction, Parser, Subcommand};
use std::process::ExitCode;

/// Evotape - evolutionary search for tape-machine programs
#[derive(Parser, Debug)]
#[command(name = "evotape")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve programs until one prints the expected output
    Run(cli::run::RunArgs),

    /// List registered strategy codes per role
    Strategies {
        /// Only list this role (create, score, select, crossover, mutate, reproduce, step)
        #[arg(short, long)]
        role: Option<String>,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match args.command {
        Commands::Run(run_args) => cli::run::execute(&run_args),
        Commands::Strategies { role } => cli::strategies::execute(role.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
