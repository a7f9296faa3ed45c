//! Application configuration for DocRelay.
//!
//! User config lives at `~/.docrelay/docrelay.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DocRelayError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docrelay.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docrelay";

// ---------------------------------------------------------------------------
// Config structs (matching docrelay.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream documentation host settings.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// The wrapper's own serving identity.
    #[serde(default)]
    pub wrapper: WrapperConfig,
}

/// `[upstream]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the documentation site being mirrored.
    #[serde(default = "default_upstream_base")]
    pub base_url: String,

    /// Timeout for upstream requests in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_base(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_upstream_base() -> String {
    "https://hexdocs.pm".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("DocRelay/", env!("CARGO_PKG_VERSION")).into()
}

/// `[wrapper]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrapperConfig {
    /// Origin the wrapper serves from; every rewritten link points here.
    #[serde(default = "default_origin")]
    pub origin: String,
}

impl Default for WrapperConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

fn default_origin() -> String {
    "http://localhost:8787".into()
}

// ---------------------------------------------------------------------------
// Site config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime site configuration — validated URLs for one render session.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// Base URL of the upstream documentation site.
    pub upstream_base: Url,
    /// The wrapper's own origin.
    pub origin: Url,
    /// Timeout for upstream requests in seconds.
    pub timeout_secs: u64,
    /// User-Agent string for upstream requests.
    pub user_agent: String,
}

impl SiteConfig {
    /// Validate and build a `SiteConfig` from an [`AppConfig`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let upstream_base = Url::parse(&config.upstream.base_url).map_err(|e| {
            DocRelayError::config(format!(
                "invalid upstream base_url '{}': {e}",
                config.upstream.base_url
            ))
        })?;
        let origin = Url::parse(&config.wrapper.origin).map_err(|e| {
            DocRelayError::config(format!(
                "invalid wrapper origin '{}': {e}",
                config.wrapper.origin
            ))
        })?;

        Ok(Self {
            upstream_base,
            origin,
            timeout_secs: config.upstream.timeout_secs,
            user_agent: config.upstream.user_agent.clone(),
        })
    }

    /// Host of the upstream documentation site.
    pub fn upstream_host(&self) -> &str {
        self.upstream_base.host_str().unwrap_or_default()
    }

    /// Absolute upstream URL for a file under a package's base path.
    pub fn upstream_url(&self, base_path: &str, file: &str) -> String {
        join_url(self.upstream_base.as_str(), base_path, file)
    }

    /// Absolute wrapper URL for a file under a package's base path.
    pub fn wrapper_url(&self, base_path: &str, file: &str) -> String {
        join_url(self.origin.as_str(), base_path, file)
    }
}

/// Join origin + base path + file without doubling slashes.
fn join_url(origin: &str, base_path: &str, file: &str) -> String {
    format!(
        "{}/{}/{}",
        origin.trim_end_matches('/'),
        base_path.trim_matches('/'),
        file.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Package coordinates
// ---------------------------------------------------------------------------

/// Coordinates of one documentation set: package name plus optional version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCoords {
    /// Package name as it appears in the path.
    pub package: String,
    /// Pinned version, when the path carries one.
    pub version: Option<String>,
}

impl PackageCoords {
    /// Build coordinates, validating that the package name is path-safe.
    pub fn new(package: impl Into<String>, version: Option<String>) -> Result<Self> {
        let package = package.into();
        if package.is_empty()
            || !package
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(DocRelayError::validation(format!(
                "invalid package name '{package}'"
            )));
        }
        Ok(Self { package, version })
    }

    /// Normalized base path: `pkg` or `pkg/1.2.3`.
    pub fn base_path(&self) -> String {
        match &self.version {
            Some(v) => format!("{}/{v}", self.package),
            None => self.package.clone(),
        }
    }

    /// Whether these coordinates pin a version.
    pub fn versioned(&self) -> bool {
        self.version.is_some()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docrelay/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocRelayError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docrelay/docrelay.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocRelayError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocRelayError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocRelayError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocRelayError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocRelayError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
