//! Kiln CLI — the command-line interface for the Kiln asset pipeline.
//!
//! Provides `kiln init` for project scaffolding and `kiln export` for
//! running the export pipeline over a project's source tree.

#![warn(missing_docs)]

mod export;
mod init;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Kiln — an offline game-asset build pipeline.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln asset pipeline")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to the project directory (defaults to the current directory).
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new Kiln project.
    Init {
        /// Project name (creates a subdirectory). If omitted, initializes in
        /// the current directory.
        name: Option<String>,
    },
    /// Export the project's source tree into its output targets.
    Export(ExportArgs),
}

/// Arguments for the `kiln export` subcommand.
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Rebuild everything, ignoring persisted digests.
    #[arg(short, long)]
    pub force: bool,

    /// Run without the build cache even when one is configured.
    #[arg(long)]
    pub no_cache: bool,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional project directory override.
    pub project: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        color,
        project: cli.project,
    };

    let result = match cli.command {
        Command::Init { name } => init::run(name),
        Command::Export(ref args) => export::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Rough terminal detection — checks if stdout is a terminal.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok()
}
