//! yt-dlp engine: drives the `yt-dlp` executable as a child process

use super::install::{Installer, TOOL_NAME};
use super::parser::{META_TEMPLATE, OutputLine, PROGRESS_TEMPLATE, parse_line};
use super::traits::{FetchRequest, LogLevel, MediaEngine, MediaInfo, ProgressHook};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::sanitize;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// [`MediaEngine`] backed by the yt-dlp command line program
///
/// Progress is read from the child's output as it is produced. While a
/// progress tick is suspended (the task is paused) the output is not read,
/// so yt-dlp stalls once the pipe buffer fills.
pub struct YtDlpEngine {
    config: EngineConfig,
    installer: Installer,
}

impl YtDlpEngine {
    /// Create an engine from its settings
    pub fn new(config: EngineConfig) -> Self {
        let installer = Installer::new(&config);
        Self { config, installer }
    }

    /// Command line passed to yt-dlp for `request`
    pub fn build_args(&self, request: &FetchRequest) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.config.format.clone()];
        if self.config.no_playlist {
            args.push("--no-playlist".to_string());
        }
        args.extend(
            [
                "--newline",
                "--progress",
                "--progress-template",
                PROGRESS_TEMPLATE,
                "--print",
                META_TEMPLATE,
                "--no-simulate",
                "-o",
            ]
            .map(String::from),
        );
        args.push(request.output_template());
        args.extend(self.config.extra_args.iter().cloned());
        args.push(request.url.to_string());
        args
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    async fn prepare(&self, hook: &dyn ProgressHook) -> Result<(), EngineError> {
        self.installer.ensure(hook).await.map(|_| ())
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        hook: &dyn ProgressHook,
    ) -> Result<MediaInfo, EngineError> {
        let binary = self.installer.ensure(hook).await?;
        let args = self.build_args(request);

        tracing::debug!(binary = %binary.display(), ?args, "spawning yt-dlp");

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                binary: binary.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Other("yt-dlp stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Other("yt-dlp stderr was not captured".into()))?;
        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);

        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_open = true;
        let mut err_open = true;

        let mut info: Option<MediaInfo> = None;
        let mut last_error: Option<String> = None;

        while out_open || err_open {
            let (stream, read) = tokio::select! {
                read = stdout.read_until(b'\n', &mut out_buf), if out_open => (Stream::Stdout, read),
                read = stderr.read_until(b'\n', &mut err_buf), if err_open => (Stream::Stderr, read),
            };

            let (buf, open) = match stream {
                Stream::Stdout => (&mut out_buf, &mut out_open),
                Stream::Stderr => (&mut err_buf, &mut err_open),
            };
            if read? == 0 {
                *open = false;
                continue;
            }
            let line = String::from_utf8_lossy(buf).into_owned();
            buf.clear();

            match parse_line(&line) {
                None => {}
                Some(OutputLine::Progress(tick)) => {
                    if hook.on_progress(tick).await.is_err() {
                        tracing::debug!("progress hook aborted, killing yt-dlp");
                        if let Err(e) = child.kill().await {
                            tracing::warn!(error = %e, "failed to kill yt-dlp");
                        }
                        return Err(EngineError::Aborted);
                    }
                }
                Some(OutputLine::Metadata(media)) => {
                    tracing::debug!(title = %media.title, ext = %media.extension, "yt-dlp reported file");
                    info = Some(media);
                }
                Some(OutputLine::Log(level, text)) => {
                    if level == LogLevel::Error {
                        last_error = Some(sanitize::clean(&text));
                    }
                    hook.on_log(level, &text);
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            let message = last_error.unwrap_or_else(|| format!("yt-dlp exited with {status}"));
            tracing::debug!(code = ?status.code(), %message, "yt-dlp failed");
            return Err(EngineError::Exited {
                code: status.code(),
                message,
            });
        }

        info.ok_or(EngineError::MissingMetadata)
    }
}
