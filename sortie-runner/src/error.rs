//! Error types for the runner

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while preparing ephemeral artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The artifact directory could not be created
    #[error("create artifact directory {} failed: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An artifact file could not be written
    #[error("write artifact file {} failed: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The variable set could not be encoded as JSON
    #[error("serialize extra vars failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that prevent a process from producing a result
///
/// Non-zero exits and timeouts are not errors: they are reported through
/// [`crate::ProcessOutcome`].
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Preparation failed before launch
    #[error("prepare artifacts failed: {0}")]
    Artifact(#[from] ArtifactError),

    /// The process could not be started (missing binary, permissions)
    #[error("start command {} failed: {source}", .binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A standard stream was not piped
    #[error("capture {0} of child process failed")]
    Pipe(&'static str),

    /// Waiting on the child failed
    #[error("wait for command failed: {0}")]
    Wait(#[source] io::Error),

    /// Runner paths could not be anchored at the current directory
    #[error("resolve runner paths failed: {0}")]
    Paths(#[source] io::Error),

    /// The version check ran but the binary reported failure
    #[error("{} not installed or not working: {output}", .binary.display())]
    NotInstalled { binary: PathBuf, output: String },
}

impl RunnerError {
    /// Check if this error happened before the process was started
    pub fn is_launch_error(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::Pipe(_))
    }
}
