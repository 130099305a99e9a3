//! Sortie Runner
//!
//! Turns an adhoc execution request into an external `ansible` process.
//!
//! Architecture:
//! - Locator: resolves the automation binary once, through an ordered fallback search
//! - Artifacts: ephemeral inventory / variable files, removed when their guard drops
//! - Process: spawns the binary, drains stdout and stderr concurrently, enforces a timeout
//! - Adhoc: glues the above into a [`CommandRunner`] consumed by the execution tracker

mod adhoc;
mod artifact;
mod config;
mod error;
mod locator;
mod process;

pub use adhoc::{AdhocRunner, CommandRunner, build_adhoc_args};
pub use artifact::{Artifact, ArtifactManager, DEFAULT_INVENTORY};
pub use config::RunnerConfig;
pub use error::{ArtifactError, RunnerError};
pub use locator::BinaryLocator;
pub use process::{LineBuffer, OutputSink, ProcessOutcome, run_process};
