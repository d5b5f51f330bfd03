#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

mod commands;
mod logging;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tsref_core::Config;

#[derive(Parser, Debug)]
#[command(name = "tsref")]
#[command(
    author,
    version,
    about = "Explain outDir to rootDir source redirection",
    long_about = None
)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Show whether a file would be redirected to its source, and why
    Explain {
        /// File being resolved (e.g. a package's dist/index.js)
        file: PathBuf,

        /// Package boundary directory (default: nearest package.json ancestor)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine working directory, anchoring a relative --cwd
    let cwd = match cli.cwd {
        Some(cwd) if cwd.is_absolute() => cwd,
        Some(cwd) => std::env::current_dir().into_diagnostic()?.join(cwd),
        None => std::env::current_dir().into_diagnostic()?,
    };

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Commands::Version => commands::version::run(),
        Commands::Explain { file, root } => {
            commands::explain::run(&config, &file, root.as_deref(), cli.json)
        }
    }
}
