//! Discovery and self-installation of the yt-dlp executable
//!
//! Resolution runs at most once per [`Installer`]; the result (including a
//! failure) is cached for the lifetime of the engine.

use super::traits::{LogLevel, ProgressHook};
use crate::config::EngineConfig;
use crate::error::EngineError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Name of the tool, for messages
pub const TOOL_NAME: &str = "yt-dlp";

/// Name of the checksum manifest published next to the release assets
pub const CHECKSUM_MANIFEST: &str = "SHA2-256SUMS";

/// Release asset for the current platform
pub fn asset_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else if cfg!(target_os = "macos") {
        "yt-dlp_macos"
    } else if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
        "yt-dlp_linux"
    } else if cfg!(all(target_os = "linux", target_arch = "aarch64")) {
        "yt-dlp_linux_aarch64"
    } else {
        "yt-dlp"
    }
}

/// File name of the installed executable
pub fn binary_file_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

#[derive(Debug, Clone)]
enum Failure {
    NotInstalled(String),
    InstallFailed(String),
}

impl Failure {
    fn to_error(&self) -> EngineError {
        match self {
            Failure::NotInstalled(reason) => EngineError::NotInstalled {
                tool: TOOL_NAME.to_string(),
                reason: reason.clone(),
            },
            Failure::InstallFailed(reason) => EngineError::InstallFailed {
                tool: TOOL_NAME.to_string(),
                reason: reason.clone(),
            },
        }
    }
}

/// Locates yt-dlp, installing it from the release page if allowed
pub struct Installer {
    binary_path: Option<PathBuf>,
    search_path: bool,
    auto_install: bool,
    install_dir: PathBuf,
    release_base_url: String,
    client: reqwest::Client,
    resolved: OnceCell<Result<PathBuf, Failure>>,
}

impl Installer {
    /// Create an installer from engine settings
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
            search_path: config.search_path,
            auto_install: config.auto_install,
            install_dir: config.install_dir.clone(),
            release_base_url: config.release_base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            resolved: OnceCell::new(),
        }
    }

    /// Path of the executable, resolving (and installing) it on first use
    ///
    /// Concurrent callers wait for the same resolution. Later calls return the
    /// cached result without touching the filesystem or network again.
    pub async fn ensure(&self, hook: &dyn ProgressHook) -> Result<PathBuf, EngineError> {
        self.resolved
            .get_or_init(|| self.resolve(hook))
            .await
            .clone()
            .map_err(|failure| failure.to_error())
    }

    /// Where a self-installed copy lives
    pub fn installed_path(&self) -> PathBuf {
        self.install_dir.join(binary_file_name())
    }

    async fn resolve(&self, hook: &dyn ProgressHook) -> Result<PathBuf, Failure> {
        if let Some(found) = self.locate() {
            tracing::debug!(path = %found.display(), "using existing yt-dlp");
            return Ok(found);
        }

        if !self.auto_install {
            return Err(Failure::NotInstalled(
                "not found and automatic installation is disabled".to_string(),
            ));
        }

        hook.on_log(LogLevel::Info, "yt-dlp not found, installing...");
        match self.install().await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "installed yt-dlp");
                hook.on_log(LogLevel::Info, "yt-dlp installed successfully");
                Ok(path)
            }
            Err(reason) => {
                tracing::warn!(error = %reason, "yt-dlp installation failed");
                Err(Failure::InstallFailed(reason))
            }
        }
    }

    fn locate(&self) -> Option<PathBuf> {
        if let Some(configured) = &self.binary_path {
            if configured.is_file() {
                return Some(configured.clone());
            }
            tracing::warn!(
                path = %configured.display(),
                "configured yt-dlp path does not exist, searching elsewhere"
            );
        }

        if self.search_path
            && let Ok(found) = which::which(TOOL_NAME)
        {
            return Some(found);
        }

        let installed = self.installed_path();
        installed.is_file().then_some(installed)
    }

    async fn install(&self) -> Result<PathBuf, String> {
        let asset = asset_name();
        let manifest_url = format!("{}/{}", self.release_base_url, CHECKSUM_MANIFEST);
        let asset_url = format!("{}/{}", self.release_base_url, asset);

        tracing::info!(url = %asset_url, "downloading yt-dlp release");

        let manifest = self.fetch(&manifest_url).await?;
        let manifest = String::from_utf8_lossy(&manifest);
        let expected = parse_checksum(&manifest, asset)
            .ok_or_else(|| format!("{CHECKSUM_MANIFEST} has no entry for {asset}"))?;

        let body = self.fetch(&asset_url).await?;
        verify_checksum(&body, &expected)?;

        let target = self.installed_path();
        write_executable(&target, &body)
            .await
            .map_err(|e| format!("cannot write {}: {e}", target.display()))?;
        Ok(target)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("{url} returned HTTP {status}"));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("reading {url} failed: {e}"))?;
        Ok(bytes.to_vec())
    }
}

/// Find the expected SHA-256 of `asset` in a `sha256sum`-style manifest
pub fn parse_checksum(manifest: &str, asset: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let digest = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == asset && digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| digest.to_ascii_lowercase())
    })
}

/// Compare the SHA-256 of `body` with the expected hex digest
pub fn verify_checksum(body: &[u8], expected: &str) -> Result<(), String> {
    let actual = format!("{:x}", Sha256::digest(body));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(format!(
            "checksum mismatch: expected {expected}, got {actual}"
        ))
    }
}

/// Write to a temporary sibling, mark executable, then rename into place
async fn write_executable(target: &Path, body: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp = target.with_extension("part");
    tokio::fs::write(&temp, body).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        if let Err(e) = tokio::fs::set_permissions(&temp, perms).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
    }

    if let Err(e) = tokio::fs::rename(&temp, target).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}
