//! Build-phase driver.
//!
//! Sequences the four phases of a [`BuildTool`] as a state machine:
//!
//! ```text
//! Uninitialized -generate-> Generated -configure-> Configured -build-> Built -install-> Installed
//! ```
//!
//! Each phase is allowed only from the state right before it. A failing phase
//! stops the sequence and the driver stays at the last state it reached; there
//! are no retries. Cancellation is observed between phases, never inside one.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::tool::{BuildContext, BuildTool, ToolError, ToolchainArtifacts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseState {
  Uninitialized,
  Generated,
  Configured,
  Built,
  Installed,
}

impl fmt::Display for PhaseState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      PhaseState::Uninitialized => "uninitialized",
      PhaseState::Generated => "generated",
      PhaseState::Configured => "configured",
      PhaseState::Built => "built",
      PhaseState::Installed => "installed",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
  Generate,
  Configure,
  Build,
  Install,
}

impl Phase {
  pub const ALL: [Phase; 4] = [Phase::Generate, Phase::Configure, Phase::Build, Phase::Install];

  /// State the driver must be in for this phase to run.
  pub fn requires(&self) -> PhaseState {
    match self {
      Phase::Generate => PhaseState::Uninitialized,
      Phase::Configure => PhaseState::Generated,
      Phase::Build => PhaseState::Configured,
      Phase::Install => PhaseState::Built,
    }
  }

  /// State reached when this phase succeeds.
  pub fn produces(&self) -> PhaseState {
    match self {
      Phase::Generate => PhaseState::Generated,
      Phase::Configure => PhaseState::Configured,
      Phase::Build => PhaseState::Built,
      Phase::Install => PhaseState::Installed,
    }
  }
}

impl fmt::Display for Phase {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Phase::Generate => "generate",
      Phase::Configure => "configure",
      Phase::Build => "build",
      Phase::Install => "install",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Error)]
pub enum DriverError {
  #[error("cannot run {phase} while {actual}, expected {expected}")]
  OutOfOrder {
    phase: Phase,
    expected: PhaseState,
    actual: PhaseState,
  },

  #[error("{phase} phase failed (reached {reached}): {source}")]
  Phase {
    phase: Phase,
    reached: PhaseState,
    #[source]
    source: ToolError,
  },

  #[error("build cancelled (reached {reached})")]
  Cancelled { reached: PhaseState },
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct DriverOutput {
  pub toolchain: ToolchainArtifacts,
  pub package_folder: PathBuf,
}

/// Drives one build through its phases.
pub struct BuildDriver<'t, T: BuildTool + ?Sized> {
  tool: &'t T,
  state: PhaseState,
  toolchain: Option<ToolchainArtifacts>,
}

impl<'t, T: BuildTool + ?Sized> BuildDriver<'t, T> {
  pub fn new(tool: &'t T) -> Self {
    Self {
      tool,
      state: PhaseState::Uninitialized,
      toolchain: None,
    }
  }

  pub fn state(&self) -> PhaseState {
    self.state
  }

  fn enter(&self, phase: Phase) -> Result<(), DriverError> {
    if self.state != phase.requires() {
      return Err(DriverError::OutOfOrder {
        phase,
        expected: phase.requires(),
        actual: self.state,
      });
    }
    info!(phase = %phase, tool = self.tool.name(), "running phase");
    Ok(())
  }

  fn fail(&self, phase: Phase, source: ToolError) -> DriverError {
    warn!(phase = %phase, reached = %self.state, error = %source, "phase failed");
    DriverError::Phase {
      phase,
      reached: self.state,
      source,
    }
  }

  pub async fn generate(&mut self, ctx: &BuildContext<'_>) -> Result<&ToolchainArtifacts, DriverError> {
    self.enter(Phase::Generate)?;
    let artifacts = self
      .tool
      .generate(ctx)
      .await
      .map_err(|e| self.fail(Phase::Generate, e))?;
    self.state = PhaseState::Generated;
    Ok(self.toolchain.insert(artifacts))
  }

  pub async fn configure(&mut self, ctx: &BuildContext<'_>) -> Result<(), DriverError> {
    self.enter(Phase::Configure)?;
    self
      .tool
      .configure(ctx)
      .await
      .map_err(|e| self.fail(Phase::Configure, e))?;
    self.state = PhaseState::Configured;
    Ok(())
  }

  pub async fn build(&mut self, ctx: &BuildContext<'_>) -> Result<(), DriverError> {
    self.enter(Phase::Build)?;
    self.tool.build(ctx).await.map_err(|e| self.fail(Phase::Build, e))?;
    self.state = PhaseState::Built;
    Ok(())
  }

  pub async fn install(&mut self, ctx: &BuildContext<'_>) -> Result<PathBuf, DriverError> {
    self.enter(Phase::Install)?;
    let folder = self
      .tool
      .install(ctx)
      .await
      .map_err(|e| self.fail(Phase::Install, e))?;
    self.state = PhaseState::Installed;
    Ok(folder)
  }

  /// Run every remaining phase, checking `cancel` before each one.
  pub async fn run(mut self, ctx: &BuildContext<'_>, cancel: &CancellationToken) -> Result<DriverOutput, DriverError> {
    let mut package_folder = None;

    for phase in Phase::ALL {
      if self.state >= phase.produces() {
        continue;
      }
      if cancel.is_cancelled() {
        warn!(reached = %self.state, "build cancelled");
        return Err(DriverError::Cancelled { reached: self.state });
      }

      match phase {
        Phase::Generate => {
          self.generate(ctx).await?;
        }
        Phase::Configure => self.configure(ctx).await?,
        Phase::Build => self.build(ctx).await?,
        Phase::Install => package_folder = Some(self.install(ctx).await?),
      }
    }

    Ok(DriverOutput {
      toolchain: self.toolchain.unwrap_or_default(),
      package_folder: package_folder.unwrap_or_else(|| ctx.layout.package.clone()),
    })
  }
}
