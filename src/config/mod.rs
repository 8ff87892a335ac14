use anyhow::{Result, bail};
use config::{Config, Environment, File};
use dirs::home_dir;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "CHROMA_VIEWER";

/// Viewer tuning. Connection details always come from the command line; these
/// only shape how results are fetched and shown.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub preview_limit: usize,
    pub document_width: usize,
    pub tenant: String,
    pub database: String,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            preview_limit: 5,
            document_width: 100,
            tenant: "default_tenant".to_string(),
            database: "default_database".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Loads `~/.chroma-viewer/config.toml` (if present) overlaid with
    /// `CHROMA_VIEWER_*` environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(Some(&Settings::get_config_file_path()), ENV_PREFIX)
    }

    pub fn load_from(path: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let settings: Settings = builder
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.preview_limit == 0 {
            bail!("preview_limit must be at least 1");
        }
        if self.document_width == 0 {
            bail!("document_width must be at least 1");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be at least 1");
        }
        if self.tenant.trim().is_empty() || self.database.trim().is_empty() {
            bail!("tenant and database must not be empty");
        }
        Ok(())
    }

    fn get_config_file_path() -> PathBuf {
        let mut config_dir = home_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.push(".chroma-viewer");
        config_dir.push("config.toml");
        config_dir
    }
}
