//! Stratum CLI - Command-line interface for the Stratum pretraining recipes
//!
//! This CLI provides a `stratum` command for listing recipe factories,
//! building configuration trees and inspecting model presets.

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use stratum_recipes::StratumConfig;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::show::{FormatArg, ShowOptions};
use commands::{list, presets, show};

/// Stratum - Pretraining recipe builder
///
/// Stratum builds typed configuration trees for large language model
/// pretraining runs. Each recipe describes the model, trainer, data,
/// logging, optimizer and resume settings, printed as JSON or TOML.
#[derive(Parser, Debug)]
#[command(name = "stratum", author, version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered recipe factories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a recipe and print its configuration tree
    ///
    /// FACTORY is a factory name or call expression such as
    /// `nemotron4_22b(num_nodes=2, name='trial')`, or `<preset>.model`
    /// for a bare model node.
    Show {
        /// Factory name or expression
        factory: String,

        /// Keyword argument for the factory (key=value, repeatable)
        #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,

        /// Dotted-path override on the built tree (path=value, repeatable)
        #[arg(short = 's', long = "set", value_name = "PATH=VALUE")]
        overrides: Vec<String>,

        /// Output format (overrides output.format from config)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List model architecture presets and TP overlap profiles
    Presets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = StratumConfig::discover_and_load()?;

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .or(config.log_level.as_deref())
        .unwrap_or("info");
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Rendered trees go to stdout, so logs go to stderr.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // If no command provided, show help
    let command = if let Some(cmd) = args.command {
        cmd
    } else {
        Args::command().print_help()?;
        return Ok(());
    };

    match command {
        Command::List { json } => {
            list::execute(json)?;
        }
        Command::Show {
            factory,
            args,
            overrides,
            format,
            output,
        } => {
            let options = ShowOptions {
                factory,
                args,
                overrides,
                format,
                output,
            };
            show::execute(&options, &config)?;
        }
        Command::Presets { json } => {
            presets::execute(json)?;
        }
    }

    Ok(())
}
