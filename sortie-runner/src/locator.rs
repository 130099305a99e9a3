//! Binary locator
//!
//! Resolves the path of the automation binary. The search order is fixed:
//! 1. explicitly configured path, if it exists
//! 2. environment override, if it exists
//! 3. `PATH` lookup
//! 4. conventional install locations
//! 5. the bare command name, so a later launch fails with "not found"

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DEFAULT_COMMAND: &str = "ansible";
const DEFAULT_ENV_VAR: &str = "ANSIBLE_PATH";
const CONVENTIONAL_PATHS: &[&str] = &[
    "/usr/local/bin/ansible",
    "/opt/homebrew/bin/ansible",
    "/usr/local/homebrew/bin/ansible",
    "/usr/bin/ansible",
    "/bin/ansible",
];

/// Ordered fallback search for an executable
#[derive(Debug, Clone)]
pub struct BinaryLocator {
    command: String,
    env_var: String,
    conventional_paths: Vec<PathBuf>,
}

impl BinaryLocator {
    pub fn new(
        command: impl Into<String>,
        env_var: impl Into<String>,
        conventional_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            command: command.into(),
            env_var: env_var.into(),
            conventional_paths,
        }
    }

    /// Resolves the binary using the process environment. Never fails.
    pub fn resolve(&self, configured: Option<&Path>) -> PathBuf {
        self.resolve_with(
            configured,
            std::env::var_os(&self.env_var),
            std::env::var_os("PATH"),
        )
    }

    /// Resolves the binary against explicit environment values.
    pub fn resolve_with(
        &self,
        configured: Option<&Path>,
        env_override: Option<OsString>,
        path_var: Option<OsString>,
    ) -> PathBuf {
        if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
            if path.exists() {
                info!(path = %path.display(), "Using configured {} binary", self.command);
                return path.to_path_buf();
            }
            debug!(path = %path.display(), "Configured binary does not exist");
        }

        if let Some(value) = env_override.filter(|v| !v.is_empty()) {
            let path = PathBuf::from(value);
            if path.exists() {
                info!(path = %path.display(), env = %self.env_var, "Using binary from environment");
                return path;
            }
            debug!(path = %path.display(), env = %self.env_var, "Environment binary does not exist");
        }

        if let Some(path) = path_var.as_deref().and_then(|p| self.search_path(p)) {
            info!(path = %path.display(), "Found {} on PATH", self.command);
            return path;
        }

        if let Some(path) = self.conventional_paths.iter().find(|p| p.exists()) {
            info!(path = %path.display(), "Found {} in a conventional location", self.command);
            return path.clone();
        }

        info!("{} not found, falling back to bare command name", self.command);
        PathBuf::from(&self.command)
    }

    fn search_path(&self, path_var: &OsStr) -> Option<PathBuf> {
        std::env::split_paths(path_var)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(&self.command))
            .find(|candidate| is_executable(candidate))
    }
}

impl Default for BinaryLocator {
    fn default() -> Self {
        Self::new(
            DEFAULT_COMMAND,
            DEFAULT_ENV_VAR,
            CONVENTIONAL_PATHS.iter().map(PathBuf::from).collect(),
        )
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
