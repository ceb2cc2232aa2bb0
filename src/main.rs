//! Genomic variant database worker main executable

pub mod common;
pub mod conf;
pub mod err;
pub mod genotypes;
pub mod query;
pub mod store;

use clap::{Args, Parser, Subcommand};
use console::{Emoji, Term};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Genomic variant database worker",
    long_about = "This tool merges sample genotypes into variant rows and runs searches against the variant datastore"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Genotype ingestion commands.
    Genotypes(Genotypes),
    /// Search commands.
    Query(Query),
}

/// Parsing of "genotypes *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Genotypes {
    /// The sub command to run
    #[command(subcommand)]
    command: GenotypesCommands,
}

/// Enum supporting the parsing of "genotypes *" sub commands.
#[derive(Debug, Subcommand)]
enum GenotypesCommands {
    Merge(genotypes::Args),
}

/// Parsing of "query *" sub commands.
#[derive(Debug, Args)]
#[command(args_conflicts_with_subcommands = true)]
struct Query {
    /// The sub command to run
    #[command(subcommand)]
    command: QueryCommands,
}

/// Enum supporting the parsing of "query *" sub commands.
#[derive(Debug, Subcommand)]
enum QueryCommands {
    Compile(query::compile::Args),
    Run(query::run::Args),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    // Install collector and go into sub commands.
    let term = Term::stderr();
    let result = tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Genotypes(genotypes) => match &genotypes.command {
                GenotypesCommands::Merge(args) => {
                    genotypes::run(&cli.common, args)?;
                }
            },
            Commands::Query(query) => match &query.command {
                QueryCommands::Compile(args) => query::compile::run(&cli.common, args)?,
                QueryCommands::Run(args) => {
                    if query::run::run(&cli.common, args)?.is_empty() {
                        term.write_line("No results found.")?;
                    }
                }
            },
        }

        Ok::<(), anyhow::Error>(())
    });

    match result {
        Ok(()) => {
            let _ = term.write_line(&format!("All done. Have a nice day!{}", Emoji(" 😃", "")));
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            let _ = term.write_line(&format!("Error: {:#}", e));
            match e.downcast::<err::Error>() {
                Ok(e) => std::process::Termination::report(e),
                Err(_) => std::process::ExitCode::FAILURE,
            }
        }
    }
}
