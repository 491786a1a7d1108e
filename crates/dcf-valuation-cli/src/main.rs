mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::export::ExportArgs;
use commands::monte_carlo::MonteCarloArgs;
use commands::scenarios::SensitivityArgs;
use commands::valuation::{ProjectArgs, ValueArgs};

/// Discounted cash flow valuation with sensitivity and Monte Carlo analysis
#[derive(Parser)]
#[command(
    name = "dcf",
    version,
    about = "Discounted cash flow valuation with sensitivity and Monte Carlo analysis",
    long_about = "A CLI for valuing a company from trailing revenue and a set of assumption \
                  ratios with decimal precision. Projects free cash flow, discounts it with a \
                  Gordon terminal value, sweeps discount rate against terminal growth, and \
                  runs seeded Monte Carlo simulations over growth and margin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log debug detail to stderr (otherwise RUST_LOG, default warn)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Project revenue through free cash flow
    Project(ProjectArgs),
    /// Run a DCF valuation through to equity value and price per share
    Value(ValueArgs),
    /// Discount rate x terminal growth enterprise value grid
    Sensitivity(SensitivityArgs),
    /// Monte Carlo DCF over revenue growth and EBIT margin
    MonteCarlo(MonteCarloArgs),
    /// Write the Projections and Sensitivity Table sheets as CSV
    Export(ExportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::valuation::run_project(args),
        Commands::Value(args) => commands::valuation::run_value(args),
        Commands::Sensitivity(args) => commands::scenarios::run_sensitivity(args),
        Commands::MonteCarlo(args) => commands::monte_carlo::run_monte_carlo(args),
        Commands::Export(args) => commands::export::run_export(args),
        Commands::Version => {
            println!("dcf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_value_flags() {
        let cli = Cli::try_parse_from([
            "dcf",
            "value",
            "--base-revenue",
            "100",
            "--growth-rate",
            "-0.02",
            "--output",
            "minimal",
        ])
        .unwrap();
        match cli.command {
            Commands::Value(args) => {
                assert_eq!(args.company.base_revenue.unwrap().to_string(), "100");
                assert_eq!(args.assumptions.growth_rate.unwrap().to_string(), "-0.02");
            }
            _ => panic!("expected value subcommand"),
        }
    }

    #[test]
    fn test_financials_requires_ticker() {
        assert!(Cli::try_parse_from(["dcf", "value", "--financials", "f.json"]).is_err());
    }
}
