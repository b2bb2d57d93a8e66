use crate::Result;
use camino::Utf8PathBuf;
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use url::Url;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// The configuration file searched for in the working directory.
const CONFIG_FILE_NAME: &str = "pkgvet.toml";

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base URL of the insights service
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Credential for the insights service; the `VET_API_KEY` environment
    /// variable takes precedence over this
    #[serde(default)]
    pub api_key: Option<String>,

    /// Maximum concurrent enrichment requests
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Outbound request rate cap (requests per second, 0 disables pacing)
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Per-request timeout
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_api_url() -> String {
    "https://insights.pkgvet.dev".to_string()
}

const fn default_max_concurrency() -> usize {
    10
}

const fn default_requests_per_second() -> u32 {
    25
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading pkgvet configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = Utf8PathBuf::from(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // No config file found, use defaults
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading pkgvet configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if values are out of range or the API URL is invalid
    fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(app_err!("max_concurrency must be at least 1"));
        }

        let _ = Url::parse(&self.api_url).map_err(|e| app_err!("api_url '{}' is not a valid URL: {e}", self.api_url))?;

        if self.request_timeout.is_zero() {
            return Err(app_err!("request_timeout must be non-zero"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
