mod cmd;
mod output;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{ContextArgs, cmd_missed, cmd_outdated, cmd_record};
use output::{OutputFormat, Status, status};

/// remake - find what a pipeline needs to rebuild
#[derive(Parser)]
#[command(name = "remake")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// List targets that must be rebuilt
  Outdated {
    #[command(flatten)]
    context: ContextArgs,

    /// Do not refresh import hashes first
    #[arg(long)]
    no_imports: bool,

    /// Do not run prework steps first
    #[arg(long)]
    no_prework: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// List declared imports that are absent
  Missed {
    #[command(flatten)]
    context: ContextArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Record that a target was built
  Record {
    #[command(flatten)]
    context: ContextArgs,

    /// Target id; quote file targets, e.g. "'out/report.html'"
    target: String,

    /// JSON value of an object target
    #[arg(long)]
    value: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let result = match cli.command {
    Commands::Outdated {
      context,
      no_imports,
      no_prework,
      output,
    } => cmd_outdated(&context, !no_imports, !no_prework, output),
    Commands::Missed { context, output } => cmd_missed(&context, output),
    Commands::Record {
      context,
      target,
      value,
      output,
    } => cmd_record(&context, &target, value.as_deref(), output),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      status(Status::Failed, &format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
