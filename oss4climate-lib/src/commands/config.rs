use crate::Result;
use crate::hosting::{DEFAULT_GITHUB_API_BASE, DEFAULT_GITHUB_RAW_BASE, HostingConfig};
use crate::pipeline::DiscoverySources;
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use url::Url;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "oss4climate.toml";

/// Longest accepted post-miss delay.
const MAX_REQUEST_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Persisted index of organisations, repositories and dropped targets
    #[serde(default = "default_target_index")]
    pub target_index: Utf8PathBuf,

    /// Index of curated listings read during discovery
    #[serde(default = "default_listings_index")]
    pub listings_index: Utf8PathBuf,

    /// Directory receiving the dataset, its snapshot and its summary
    #[serde(default = "default_output_dir")]
    pub output_dir: Utf8PathBuf,

    /// Pause after every request that missed the cache, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Number of organisations or repositories fetched at once
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    #[serde(default)]
    pub lfenergy_landscape_url: Option<String>,

    #[serde(default)]
    pub lfenergy_projects_url: Option<String>,

    #[serde(default)]
    pub opensustain_url: Option<String>,

    /// Base URL a published dataset is downloaded from
    #[serde(default)]
    pub publish_url: Option<String>,

    #[serde(default = "default_github_api_base")]
    pub github_api_base: String,

    #[serde(default = "default_github_raw_base")]
    pub github_raw_base: String,
}

fn default_target_index() -> Utf8PathBuf {
    Utf8PathBuf::from("repo_index.toml")
}

fn default_listings_index() -> Utf8PathBuf {
    Utf8PathBuf::from("listings_index.toml")
}

fn default_output_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(".data")
}

const fn default_request_delay_ms() -> u64 {
    100
}

const fn default_max_concurrent_fetches() -> usize {
    8
}

fn default_github_api_base() -> String {
    DEFAULT_GITHUB_API_BASE.to_string()
}

fn default_github_raw_base() -> String {
    DEFAULT_GITHUB_RAW_BASE.to_string()
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `oss4climate.toml` in the working directory is used
    /// when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(DEFAULT_CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range or a URL does not parse
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [("target_index", &self.target_index), ("listings_index", &self.listings_index)] {
            if path.extension() != Some("toml") {
                return Err(app_err!("{name} must be a .toml file, got '{path}'"));
            }
        }

        if self.request_delay_ms > MAX_REQUEST_DELAY_MS {
            return Err(app_err!(
                "request_delay_ms must be at most {MAX_REQUEST_DELAY_MS}, got {}",
                self.request_delay_ms
            ));
        }

        if self.max_concurrent_fetches == 0 {
            return Err(app_err!("max_concurrent_fetches must be at least 1"));
        }

        let urls = [
            ("lfenergy_landscape_url", self.lfenergy_landscape_url.as_deref()),
            ("lfenergy_projects_url", self.lfenergy_projects_url.as_deref()),
            ("opensustain_url", self.opensustain_url.as_deref()),
            ("publish_url", self.publish_url.as_deref()),
            ("github_api_base", Some(self.github_api_base.as_str())),
            ("github_raw_base", Some(self.github_raw_base.as_str())),
        ];

        for (name, url) in urls.into_iter().filter_map(|(name, url)| Some((name, url?))) {
            let parsed = Url::parse(url).map_err(|e| app_err!("{name} is not a valid URL ('{url}'): {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(app_err!("{name} must be an http(s) URL, got '{url}'"));
            }
        }

        Ok(())
    }

    #[must_use]
    pub const fn request_delay(&self) -> Option<Duration> {
        if self.request_delay_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.request_delay_ms))
        }
    }

    #[must_use]
    pub fn discovery_sources(&self) -> DiscoverySources {
        DiscoverySources {
            lfenergy_landscape_url: self.lfenergy_landscape_url.clone(),
            lfenergy_projects_url: self.lfenergy_projects_url.clone(),
            opensustain_url: self.opensustain_url.clone(),
        }
    }

    #[must_use]
    pub fn hosting_config(&self, github_token: Option<String>, gitlab_token: Option<String>) -> HostingConfig {
        HostingConfig {
            github_token,
            gitlab_token,
            github_api_base: self.github_api_base.clone(),
            github_raw_base: self.github_raw_base.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
