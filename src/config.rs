use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::exclusion::ExclusionConfig;
use crate::record::StalePolicy;
use crate::remote::FetchStrategy;
use crate::repo::RepoId;

/// Environment variable consulted when no access token is configured
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Main configuration structure for mdsync
///
/// Built once at startup from defaults, an optional YAML file and CLI flags, then
/// handed to the sync engine.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Bearer credential for API calls
    #[serde(default)]
    pub access_token: Option<String>,

    /// Repositories to sync, as `owner/name` or full URLs
    #[serde(default)]
    pub repos: Vec<String>,

    /// Root output directory
    #[serde(default = "default_output")]
    pub output: String,

    /// Change record locator
    #[serde(default = "default_history")]
    pub history: String,

    /// Exclusions in `repo:path1,path2,...` form
    #[serde(default)]
    pub ignore: Vec<String>,

    /// File suffix selecting which files are synced
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Content retrieval backend
    #[serde(default)]
    pub fetch_strategy: FetchStrategy,

    /// API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Drop record entries for files no longer present upstream
    #[serde(default)]
    pub prune_stale: bool,
}

/// Values given on the command line, each overriding its config-file counterpart
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub access_token: Option<String>,
    pub repos: Vec<String>,
    pub output: Option<String>,
    pub history: Option<String>,
    pub ignore: Vec<String>,
    pub extension: Option<String>,
    pub fetch_strategy: Option<FetchStrategy>,
    pub api_url: Option<String>,
    pub prune_stale: bool,
}

// Default value functions
fn default_output() -> String {
    "docs".to_string()
}
fn default_history() -> String {
    "history.json".to_string()
}
fn default_extension() -> String {
    ".md".to_string()
}
fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token: None,
            repos: Vec::new(),
            output: default_output(),
            history: default_history(),
            ignore: Vec::new(),
            extension: default_extension(),
            fetch_strategy: FetchStrategy::default(),
            api_url: default_api_url(),
            prune_stale: false,
        }
    }
}

impl Config {
    /// Load the default configuration file if present, otherwise use defaults
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            debug!("No configuration file at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("mdsync").join("config.yml"))
    }

    /// Apply command-line values on top of this configuration
    pub fn with_overrides(mut self, cli: CliOverrides) -> Self {
        if let Some(token) = cli.access_token {
            self.access_token = Some(token);
        }
        if !cli.repos.is_empty() {
            self.repos = cli.repos;
        }
        if let Some(output) = cli.output {
            self.output = output;
        }
        if let Some(history) = cli.history {
            self.history = history;
        }
        if !cli.ignore.is_empty() {
            self.ignore = cli.ignore;
        }
        if let Some(extension) = cli.extension {
            self.extension = extension;
        }
        if let Some(strategy) = cli.fetch_strategy {
            self.fetch_strategy = strategy;
        }
        if let Some(api_url) = cli.api_url {
            self.api_url = api_url;
        }
        self.prune_stale |= cli.prune_stale;
        self
    }

    /// Expand environment variables and `~` in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.output = shellexpand::full(&self.output)
            .context("Failed to expand output path")?
            .into_owned();

        self.history = shellexpand::full(&self.history)
            .context("Failed to expand history path")?
            .into_owned();

        Ok(())
    }

    /// Access token from the configuration, falling back to `GITHUB_TOKEN`.
    ///
    /// Empty values count as absent.
    pub fn resolve_access_token(&self) -> Option<String> {
        if let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Some(token.to_string());
        }

        match env::var(TOKEN_ENV_VAR) {
            Ok(token) if !token.is_empty() => {
                debug!("Using access token from {}", TOKEN_ENV_VAR);
                Some(token)
            }
            _ => None,
        }
    }

    /// Normalized repository identifiers; invalid entries are logged and skipped
    pub fn repositories(&self) -> Vec<RepoId> {
        let mut repositories: Vec<RepoId> = Vec::with_capacity(self.repos.len());

        for raw in &self.repos {
            match RepoId::parse(raw) {
                Ok(repo) if repositories.contains(&repo) => {
                    warn!("Repository listed more than once: {}", repo);
                }
                Ok(repo) => repositories.push(repo),
                Err(e) => error!("Invalid repository {:?}: {}", raw, e),
            }
        }

        repositories
    }

    /// Parsed exclusion configuration
    pub fn exclusions(&self) -> ExclusionConfig {
        ExclusionConfig::parse(&self.ignore)
    }

    pub fn stale_policy(&self) -> StalePolicy {
        if self.prune_stale {
            StalePolicy::Prune
        } else {
            StalePolicy::Retain
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output)
    }

    pub fn history_path(&self) -> PathBuf {
        PathBuf::from(&self.history)
    }
}
