//! Adhoc runner
//!
//! Prepares artifacts for one request, builds the argument vector and runs
//! the resolved binary. Artifact guards live until the process returned.

use async_trait::async_trait;
use sortie_core::dto::execution::ExecutionRequest;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::artifact::ArtifactManager;
use crate::config::{RunnerConfig, anchor_binary};
use crate::error::RunnerError;
use crate::locator::BinaryLocator;
use crate::process::{OutputSink, ProcessOutcome, run_process_in};

/// Executes adhoc requests on behalf of the execution tracker
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs one request to completion or timeout
    ///
    /// # Arguments
    /// * `request` - The validated request
    /// * `sink` - Optional per-execution receiver of live stdout lines
    async fn run_adhoc(
        &self,
        request: &ExecutionRequest,
        sink: Option<OutputSink>,
    ) -> Result<ProcessOutcome, RunnerError>;

    /// Invokes the binary with `--version` and returns the first banner line
    async fn check_installation(&self) -> Result<String, RunnerError>;

    /// The resolved binary path
    fn binary(&self) -> &Path;

    /// The hard per-process timeout
    fn timeout(&self) -> Duration;
}

/// Standard implementation of [`CommandRunner`] backed by `ansible`
#[derive(Debug)]
pub struct AdhocRunner {
    config: RunnerConfig,
    binary: PathBuf,
    artifacts: ArtifactManager,
}

impl AdhocRunner {
    /// Creates a runner, resolving the binary with the default locator
    pub fn new(config: RunnerConfig) -> Result<Self, RunnerError> {
        Self::with_locator(config, &BinaryLocator::default())
    }

    /// Creates a runner, resolving the binary with `locator`
    pub fn with_locator(config: RunnerConfig, locator: &BinaryLocator) -> Result<Self, RunnerError> {
        let config = config.into_absolute().map_err(RunnerError::Paths)?;
        let binary = locator.resolve(config.binary_path.as_deref());
        let binary = anchor_binary(&binary).map_err(RunnerError::Paths)?;
        let artifacts = ArtifactManager::new(config.artifact_dir())?;

        info!(
            binary = %binary.display(),
            artifacts = %artifacts.dir().display(),
            timeout_secs = config.timeout.as_secs(),
            "Adhoc runner initialized"
        );

        Ok(Self {
            config,
            binary,
            artifacts,
        })
    }

    pub fn artifact_dir(&self) -> &Path {
        self.artifacts.dir()
    }
}

#[async_trait]
impl CommandRunner for AdhocRunner {
    async fn run_adhoc(
        &self,
        request: &ExecutionRequest,
        sink: Option<OutputSink>,
    ) -> Result<ProcessOutcome, RunnerError> {
        let inventory = self.artifacts.write_inventory(&request.inventory).await?;
        let extra_vars = self.artifacts.write_extra_vars(&request.extra_vars).await?;

        let args = build_adhoc_args(
            request,
            inventory.path(),
            extra_vars.as_ref().map(|a| a.path()),
            self.config.verbose,
        );

        debug!(module = %request.module, hosts = %request.hosts, "Running adhoc command");

        run_process_in(
            &self.binary,
            &args,
            Some(&self.config.work_dir),
            self.config.timeout,
            sink,
        )
        .await
        // inventory and extra_vars drop here, after the process returned
    }

    async fn check_installation(&self) -> Result<String, RunnerError> {
        let outcome = run_process_in(
            &self.binary,
            &["--version".to_string()],
            None,
            self.config.timeout,
            None,
        )
        .await?;

        if !outcome.success {
            let mut output = outcome.stdout;
            output.extend(outcome.stderr);
            return Err(RunnerError::NotInstalled {
                binary: self.binary.clone(),
                output: output.join("\n"),
            });
        }

        Ok(outcome.stdout.into_iter().next().unwrap_or_default())
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }
}

/// Builds the argument vector for an adhoc invocation:
/// `<hosts> -m <module> [-a <args>] -i <inventory> [-e @<vars>] [-v]`
pub fn build_adhoc_args(
    request: &ExecutionRequest,
    inventory: &Path,
    extra_vars: Option<&Path>,
    verbose: bool,
) -> Vec<String> {
    let mut args = vec![
        request.hosts.clone(),
        "-m".to_string(),
        request.module.clone(),
    ];

    if !request.args.is_empty() {
        args.push("-a".to_string());
        args.push(request.args.clone());
    }

    args.push("-i".to_string());
    args.push(inventory.display().to_string());

    if let Some(vars) = extra_vars {
        args.push("-e".to_string());
        args.push(format!("@{}", vars.display()));
    }

    if verbose {
        args.push("-v".to_string());
    }

    args
}
