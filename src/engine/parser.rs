//! Parser for yt-dlp's line-oriented output
//!
//! The engine asks yt-dlp to print progress and final metadata with marker
//! prefixes (see [`PROGRESS_MARKER`] and [`META_MARKER`]); everything else is a
//! log line.

use super::traits::{LogLevel, MediaInfo, ProgressTick};
use crate::sanitize::strip_control_sequences;
use serde::Deserialize;
use std::path::PathBuf;

/// Prefix of lines printed through `--progress-template`
pub const PROGRESS_MARKER: &str = "[vkdl-progress]";

/// Prefix of lines printed through `--print after_move:`; the rest is JSON
pub const META_MARKER: &str = "[vkdl-meta]";

/// `--progress-template` value: percent, speed and eta separated by `|`
pub const PROGRESS_TEMPLATE: &str = "download:[vkdl-progress]%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s";

/// `--print` value: title, extension and final path as one JSON object
pub const META_TEMPLATE: &str = "after_move:[vkdl-meta]%(.{title,ext,filepath})j";

/// Placeholder yt-dlp prints for missing template fields
const NOT_AVAILABLE: &str = "NA";

/// One classified line of yt-dlp output
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// A progress tick
    Progress(ProgressTick),
    /// Final metadata of the saved file
    Metadata(MediaInfo),
    /// Anything else
    Log(LogLevel, String),
}

/// Classify a single output line
///
/// Returns `None` for blank lines.
pub fn parse_line(line: &str) -> Option<OutputLine> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    if let Some((_, rest)) = line.split_once(PROGRESS_MARKER) {
        return Some(OutputLine::Progress(parse_progress(rest)));
    }

    if let Some((_, rest)) = line.split_once(META_MARKER)
        && let Some(info) = parse_metadata(rest)
    {
        return Some(OutputLine::Metadata(info));
    }

    Some(OutputLine::Log(classify(line), line.to_string()))
}

/// Log level of a non-marker line, from its prefix
pub fn classify(line: &str) -> LogLevel {
    let plain = strip_control_sequences(line);
    let plain = plain.trim_start();
    if plain.starts_with("ERROR:") {
        LogLevel::Error
    } else if plain.starts_with("WARNING:") {
        LogLevel::Warning
    } else if plain.starts_with("[debug]") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

fn parse_progress(rest: &str) -> ProgressTick {
    let mut fields = rest.splitn(3, '|');
    let percent = fields.next().and_then(parse_percent);
    let speed = fields.next().and_then(present);
    let eta = fields.next().and_then(present);
    ProgressTick {
        percent,
        speed,
        eta,
    }
}

/// Parse `" 42.0%"` (possibly colored) into `42.0`
pub fn parse_percent(text: &str) -> Option<f64> {
    let plain = strip_control_sequences(text);
    let value: f64 = plain.trim().trim_end_matches('%').trim().parse().ok()?;
    value.is_finite().then_some(value.clamp(0.0, 100.0))
}

fn present(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() || trimmed == NOT_AVAILABLE {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Fields selected by [`META_TEMPLATE`]; yt-dlp leaves out or nulls unknown ones
#[derive(Deserialize)]
struct MetaLine {
    title: String,
    ext: String,
    #[serde(default)]
    filepath: Option<String>,
}

fn parse_metadata(rest: &str) -> Option<MediaInfo> {
    let meta: MetaLine = match serde_json::from_str(rest.trim()) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!(error = %e, "unreadable yt-dlp metadata line");
            return None;
        }
    };

    Some(MediaInfo {
        title: meta.title,
        extension: meta.ext.trim().to_string(),
        file_path: meta.filepath.as_deref().and_then(present).map(PathBuf::from),
    })
}
