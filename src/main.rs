//! Ontocheck CLI entry point.

use clap::Parser;
use ontocheck::cli::{self, Cli, Commands, EXIT_ERROR};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli::init_tracing(&cli.global) {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_ERROR);
    }

    let result = match &cli.command {
        Commands::Report(args) => cli::run_report(&cli.global, args),
        Commands::Reconcile(args) => cli::run_reconcile(&cli.global, args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
