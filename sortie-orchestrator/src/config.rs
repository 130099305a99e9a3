//! Orchestrator configuration
//!
//! Loaded from command-line flags with environment variable fallbacks.

use clap::Parser;
use sortie_runner::RunnerConfig;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "sortie-orchestrator")]
#[command(about = "Sortie fleet automation execution engine", long_about = None)]
pub struct Config {
    /// Address the HTTP API listens on
    #[arg(long, env = "SORTIE_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// Postgres connection string; records are kept in memory when unset
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Explicit path of the ansible binary
    #[arg(long, env = "SORTIE_ANSIBLE_PATH")]
    pub ansible_path: Option<PathBuf>,

    /// Working directory ansible is launched in
    #[arg(long, env = "SORTIE_WORK_DIR", default_value = "./")]
    pub work_dir: PathBuf,

    /// Directory for inventory / variable files (default: <work_dir>/temp/ansible)
    #[arg(long, env = "SORTIE_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Hard timeout for a single execution, in seconds
    #[arg(long, env = "SORTIE_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Pass -v to ansible
    #[arg(long, env = "SORTIE_VERBOSE", default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,

    /// Maximum number of executions running at the same time
    #[arg(long, env = "SORTIE_MAX_CONCURRENT", default_value_t = 8)]
    pub max_concurrent: usize,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be greater than 0");
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        self.runner_config().validate()
    }

    /// Settings handed to the adhoc runner
    pub fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::new(&self.work_dir)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_verbose(self.verbose);

        if let Some(path) = &self.ansible_path {
            config = config.with_binary_path(path);
        }
        if let Some(dir) = &self.temp_dir {
            config = config.with_temp_dir(dir);
        }

        config
    }
}
