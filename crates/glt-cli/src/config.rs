//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use glt_core::LabelCatalog;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// GitLab instance base URL.
    pub gitlab_url: String,
    /// Personal access token with read access.
    pub token: String,
    /// Numeric project id or URL-encoded project path.
    pub project: String,
    /// Usernames whose assigned issues are tracked.
    pub users: Vec<String>,
    /// Workflow label taxonomy.
    pub labels: LabelCatalog,
    /// How far the spend ledger reaches back from the reporting end date.
    pub lookback_days: i64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("gitlab_url", &self.gitlab_url)
            .field("token", &"[REDACTED]")
            .field("project", &self.project)
            .field("users", &self.users)
            .field("labels", &self.labels)
            .field("lookback_days", &self.lookback_days)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gitlab_url: "https://gitlab.com".to_string(),
            token: String::new(),
            project: String::new(),
            users: Vec::new(),
            labels: LabelCatalog::default(),
            lookback_days: 90,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (GLT_*)
        figment = figment.merge(Env::prefixed("GLT_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for glt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("glt"))
}
