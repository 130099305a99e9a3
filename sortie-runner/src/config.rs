//! Runner configuration
//!
//! Settings supplied by the configuration layer at construction time:
//! where the automation binary lives, where ephemeral artifacts go and how
//! long a single process may run.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default wall-clock limit for one process
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Explicitly configured binary path, checked first by the locator
    pub binary_path: Option<PathBuf>,

    /// Working directory the binary is launched in
    pub work_dir: PathBuf,

    /// Directory for ephemeral artifacts, defaults to `<work_dir>/temp/ansible`
    pub temp_dir: Option<PathBuf>,

    /// Hard wall-clock limit applied to every process
    pub timeout: Duration,

    /// Pass `-v` to the binary
    pub verbose: bool,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: None,
            work_dir: work_dir.into(),
            temp_dir: None,
            timeout: DEFAULT_TIMEOUT,
            verbose: true,
        }
    }

    pub fn with_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    pub fn with_temp_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Directory where artifacts are written
    pub fn artifact_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join("temp").join("ansible"))
    }

    /// Anchors every relative path at the current directory
    ///
    /// The binary is launched inside `work_dir`, so the paths handed to it
    /// must not depend on the server's own working directory.
    pub fn into_absolute(self) -> io::Result<Self> {
        let temp_dir = std::path::absolute(self.artifact_dir())?;
        let work_dir = std::path::absolute(&self.work_dir)?;
        let binary_path = self
            .binary_path
            .map(|path| anchor_binary(&path))
            .transpose()?;

        Ok(Self {
            binary_path,
            work_dir,
            temp_dir: Some(temp_dir),
            ..self
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout.is_zero() {
            anyhow::bail!("timeout must be greater than 0");
        }

        if self.work_dir.as_os_str().is_empty() {
            anyhow::bail!("work_dir cannot be empty");
        }

        Ok(())
    }
}

/// Makes a relative binary path that exists on disk absolute
///
/// A bare command name that does not exist locally is left for `PATH`
/// lookup at launch.
pub(crate) fn anchor_binary(path: &Path) -> io::Result<PathBuf> {
    if path.is_relative() && path.exists() {
        std::path::absolute(path)
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new("./")
    }
}
