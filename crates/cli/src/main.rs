mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use qtmd_lib::pipeline::PipelineError;
use qtmd_lib::platform::paths;

use cmd::{BuildArgs, Selection};
use output::{OutputFormat, print_error};

/// qtmd - package recipe engine for the QtMarkdown library
#[derive(Parser)]
#[command(name = "qtmd")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (RUST_LOG takes precedence)
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Build store directory [default: $QTMD_STORE or <data dir>/store]
  #[arg(long, global = true, value_name = "DIR")]
  store: Option<PathBuf>,

  /// Local package registry [default: $QTMD_REGISTRY or <data dir>/registry]
  #[arg(long, global = true, value_name = "DIR")]
  registry: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve, build, verify and optionally publish a package
  Build(BuildArgs),

  /// Resolve options and the dependency graph without building
  Graph {
    #[command(flatten)]
    selection: Selection,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Show recipe metadata, effective options and package info
  Inspect {
    #[command(flatten)]
    selection: Selection,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },

  /// Show detected settings and paths
  Info {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
  },
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

/// Map an error to the process exit code of its failure class.
fn exit_code(err: &anyhow::Error) -> u8 {
  err
    .downcast_ref::<PipelineError>()
    .map(|e| e.kind().exit_code())
    .and_then(|code| u8::try_from(code).ok())
    .unwrap_or(1)
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let dirs = cmd::Dirs {
    store: cli.store.unwrap_or_else(paths::store_dir),
    registry: cli.registry.unwrap_or_else(paths::registry_dir),
  };

  let result = match cli.command {
    Commands::Build(args) => cmd::cmd_build(&args, &dirs, cli.verbose),
    Commands::Graph { selection, format } => cmd::cmd_graph(&selection, &dirs, format),
    Commands::Inspect { selection, format } => cmd::cmd_inspect(&selection, format),
    Commands::Info { format } => cmd::cmd_info(&dirs, format),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::from(exit_code(&err))
    }
  }
}
