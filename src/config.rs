//! Configuration types for vkvideo-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`EngineConfig::binary_path`]
pub const YT_DLP_ENV: &str = "VKVIDEO_DL_YT_DLP";

/// Where downloaded files go
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory (None = current working directory)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// External downloader (yt-dlp) settings
///
/// The executable is resolved lazily on the first download, in this order:
/// `binary_path`, then `PATH` (if `search_path`), then a copy previously
/// installed into `install_dir`, then a fresh install (if `auto_install`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub binary_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Download yt-dlp from its release page when it cannot be found (default: true)
    #[serde(default = "default_true")]
    pub auto_install: bool,

    /// Directory holding a self-installed yt-dlp (default: "./.vkvideo-dl/bin")
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// Base URL of the yt-dlp release assets
    #[serde(default = "default_release_base_url")]
    pub release_base_url: String,

    /// yt-dlp format selector (default: "best")
    #[serde(default = "default_format")]
    pub format: String,

    /// Download a single video even when the link points into a playlist (default: true)
    #[serde(default = "default_true")]
    pub no_playlist: bool,

    /// Extra arguments passed to yt-dlp before the URL
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            search_path: true,
            auto_install: true,
            install_dir: default_install_dir(),
            release_base_url: default_release_base_url(),
            format: default_format(),
            no_playlist: true,
            extra_args: Vec::new(),
        }
    }
}

/// Main configuration for vkvideo-dl
///
/// ```json
/// {
///   "download": { "output_dir": "/srv/videos" },
///   "engine": { "format": "best[height<=720]", "auto_install": false }
/// }
/// ```
///
/// Every field is optional; missing fields take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Output location
    #[serde(default)]
    pub download: DownloadConfig,

    /// External downloader settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", path.display()),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Apply environment overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(YT_DLP_ENV).filter(|p| !p.trim().is_empty()) {
            tracing::debug!(path = %path, "yt-dlp path overridden from {}", YT_DLP_ENV);
            self.engine.binary_path = Some(PathBuf::from(path));
        }
    }

    /// Check settings that serde alone cannot reject
    pub fn validate(&self) -> Result<()> {
        if self.engine.format.trim().is_empty() {
            return Err(Error::Config {
                message: "format selector must not be empty".into(),
                key: Some("engine.format".into()),
            });
        }

        match url::Url::parse(&self.engine.release_base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(Error::Config {
                    message: format!("unsupported release URL scheme: {}", url.scheme()),
                    key: Some("engine.release_base_url".into()),
                });
            }
            Err(e) => {
                return Err(Error::Config {
                    message: format!("invalid release URL: {e}"),
                    key: Some("engine.release_base_url".into()),
                });
            }
        }

        if let Some(dir) = &self.download.output_dir
            && dir.exists()
            && !dir.is_dir()
        {
            return Err(Error::Config {
                message: format!("{} is not a directory", dir.display()),
                key: Some("download.output_dir".into()),
            });
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("./.vkvideo-dl/bin")
}

fn default_release_base_url() -> String {
    "https://github.com/yt-dlp/yt-dlp/releases/latest/download".to_string()
}

fn default_format() -> String {
    "best".to_string()
}
