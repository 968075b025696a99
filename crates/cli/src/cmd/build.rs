//! Implementation of the `qtmd build` command.
//!
//! Runs the full pipeline for one recipe and target: resolve options and
//! dependencies, export sources, drive the build tool through its phases,
//! verify the installed artifacts and, with `--publish`, register the package.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use qtmd_lib::options::EffectiveOptions;
use qtmd_lib::pipeline::{BuildOutcome, BuildRequest, create_package, publish};
use qtmd_lib::registry::LocalRegistry;
use qtmd_lib::settings::Settings;
use qtmd_lib::tool::CMakeTool;

use super::{Dirs, Selection};
use crate::output::{OutputFormat, print_json, print_stat, print_success, symbols, truncate_hash};

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
  #[command(flatten)]
  pub selection: Selection,

  /// Source tree to export from [default: the recipe's directory, or the current directory]
  #[arg(long, value_name = "DIR")]
  pub source: Option<PathBuf>,

  /// Publish the verified package into the local registry
  #[arg(long)]
  pub publish: bool,

  #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
  pub format: OutputFormat,
}

#[derive(Serialize)]
struct BuildReport<'a> {
  reference: String,
  key: &'a str,
  cached: bool,
  settings: &'a Settings,
  options: &'a EffectiveOptions,
  dependencies: Vec<String>,
  package_folder: &'a Path,
  libraries: &'a [PathBuf],
  #[serde(skip_serializing_if = "Option::is_none")]
  published: Option<PathBuf>,
  duration_ms: u128,
}

pub fn cmd_build(args: &BuildArgs, dirs: &Dirs, verbose: bool) -> Result<()> {
  let start = Instant::now();

  let recipe = args.selection.recipe()?;
  let settings = args.selection.settings()?;
  let overrides = args.selection.overrides()?;

  let source_dir = match &args.source {
    Some(dir) => dir.clone(),
    None => match args.selection.recipe_dir() {
      Some(dir) => dir,
      None => std::env::current_dir().context("Failed to determine current directory")?,
    },
  };

  let request = BuildRequest {
    recipe,
    settings,
    overrides,
    source_dir: Some(source_dir),
    store: dirs.store.clone(),
    command: std::env::args().collect::<Vec<_>>().join(" "),
  };
  let registry = LocalRegistry::new(dirs.registry.clone());
  let tool = CMakeTool::new();
  let cancel = CancellationToken::new();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt
    .block_on(async {
      let on_interrupt = cancel.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("interrupted, stopping before the next phase");
          on_interrupt.cancel();
        }
      });
      create_package(&request, &registry, &tool, &cancel).await
    })
    .context("Build failed")?;

  let published = if args.publish {
    let path = publish(&outcome, &registry).context("Publish failed")?;
    info!(path = %path.display(), "package published");
    Some(path)
  } else {
    None
  };

  let elapsed = start.elapsed();
  if args.format.is_json() {
    print_json(&report(&outcome, published, elapsed.as_millis()))?;
  } else {
    print_text(&outcome, published.as_deref(), elapsed, verbose);
  }

  Ok(())
}

fn report(outcome: &BuildOutcome, published: Option<PathBuf>, duration_ms: u128) -> BuildReport<'_> {
  BuildReport {
    reference: outcome.reference.to_string(),
    key: &outcome.key.0,
    cached: outcome.cached,
    settings: &outcome.settings,
    options: &outcome.options,
    dependencies: outcome.graph.dependencies().map(|dep| dep.reference.to_string()).collect(),
    package_folder: outcome.package_folder(),
    libraries: &outcome.libraries,
    published,
    duration_ms,
  }
}

fn print_text(outcome: &BuildOutcome, published: Option<&Path>, elapsed: Duration, verbose: bool) {
  println!();
  if outcome.cached {
    print_success(&format!("{} is up to date (cached)", outcome.reference));
  } else {
    print_success(&format!("Built {}", outcome.reference));
  }
  print_stat("Key", truncate_hash(&outcome.key.0));
  print_stat("Settings", &outcome.settings.to_string());
  print_stat("Package", &outcome.package_folder().display().to_string());
  print_stat("Libraries", &outcome.libraries.len().to_string());
  if let Some(path) = published {
    print_stat("Published", &path.display().to_string());
  }
  print_stat("Duration", &humantime::format_duration(round_to_millis(elapsed)).to_string());

  if verbose {
    println!();
    println!("Libraries:");
    for lib in &outcome.libraries {
      println!("  {} {}", symbols::INFO, lib.display());
    }
  }
}

fn round_to_millis(duration: Duration) -> Duration {
  Duration::from_millis(duration.as_millis() as u64)
}
