//! Turning user input into one canonical VK request URL
//!
//! Users paste links in many shapes: `https://vk.com/video-1_2`,
//! `vk.com/video-1_2?list=...`, `https://vkvideo.ru/video-1_2`, clip links, or
//! just the `-1_2` identifier. [`normalize`] maps every one of them to a single
//! [`CanonicalUrl`] so that equivalent inputs produce byte-identical requests.
//!
//! The recognition rules are ordered and overlap on purpose; the first rule
//! that matches wins:
//!
//! 1. `vkvideo.ru` link whose path starts with `video` -> `https://vk.com/video{owner}_{id}`
//! 2. `vk.com` link whose path starts with `clip-` -> `https://vk.com/{path}`
//! 3. `vk.com` link whose path contains `video` -> re-rooted at the first `video`
//! 4. anything containing `clip-` -> `https://vk.com/clip-...`
//! 5. anything without a URL scheme -> bare identifier, `https://vk.com/video{input}`
//! 6. any other absolute URL -> passed through unchanged

use crate::error::NormalizeError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// Host every canonical URL is rooted at
pub const PRIMARY_HOST: &str = "vk.com";

/// Alternate video-hosting domain that is rewritten onto [`PRIMARY_HOST`]
pub const ALTERNATE_HOST: &str = "vkvideo.ru";

const CANONICAL_BASE: &str = "https://vk.com/";

#[allow(clippy::expect_used)]
static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("static pattern compiles")
});

#[allow(clippy::expect_used)]
static OWNER_VIDEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^video(-?\d+)_(\d+)").expect("static pattern compiles"));

/// Shape of a canonical URL's path
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    /// `https://vk.com/video...`
    Video,
    /// `https://vk.com/clip-...`
    Clip,
    /// A passed-through URL on some other host or path
    Other,
}

/// A normalized request URL
///
/// Only [`normalize`] (or [`str::parse`]) constructs one, so holding a
/// `CanonicalUrl` means the input was accepted and parses as an absolute URL.
/// The string is stored as produced: a passed-through link keeps the exact
/// text the user gave, without percent-encoding or other `url` crate
/// serialization applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    /// The URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Classify the canonical path
    pub fn kind(&self) -> UrlKind {
        match self.0.strip_prefix(CANONICAL_BASE) {
            Some(path) if path.starts_with("clip-") => UrlKind::Clip,
            Some(path) if path.starts_with("video") => UrlKind::Video,
            _ => UrlKind::Other,
        }
    }

    /// Consume and return the inner string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for CanonicalUrl {
    type Err = NormalizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

/// Normalize raw user input into a [`CanonicalUrl`]
///
/// Normalization is pure: it performs no I/O and depends only on `raw`.
///
/// # Errors
///
/// - [`NormalizeError::EmptyInput`] if `raw` is empty or whitespace-only
/// - [`NormalizeError::MalformedIdentifier`] if `raw` looks like a link or
///   identifier but cannot be split into its parts
///
/// # Examples
///
/// ```
/// use vkvideo_dl::normalize::normalize;
///
/// let from_link = normalize("https://vkvideo.ru/video-12345_67890").unwrap();
/// let from_id = normalize("-12345_67890").unwrap();
/// assert_eq!(from_link, from_id);
/// assert_eq!(from_id.as_str(), "https://vk.com/video-12345_67890");
/// ```
pub fn normalize(raw: &str) -> Result<CanonicalUrl, NormalizeError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(NormalizeError::EmptyInput);
    }

    let candidate = if input.contains(ALTERNATE_HOST) && url_path(input)?.starts_with("video") {
        from_alternate_host(input)?
    } else if input.contains(PRIMARY_HOST) && url_path(input)?.starts_with("clip-") {
        format!("{CANONICAL_BASE}{}", url_path(input)?)
    } else if input.contains(PRIMARY_HOST) && url_path(input)?.contains("video") {
        let path = url_path(input)?;
        if path.starts_with("video") {
            format!("{CANONICAL_BASE}{path}")
        } else {
            let rest = path.split_once("video").map_or("", |(_, rest)| rest);
            format!("{CANONICAL_BASE}video{rest}")
        }
    } else if let Some(start) = input.find("clip-") {
        let clip = strip_query(&input[start..]).trim_end_matches('/');
        format!("{CANONICAL_BASE}{clip}")
    } else if !SCHEME.is_match(input) {
        if input.contains(char::is_whitespace) || input.contains('/') {
            return Err(NormalizeError::malformed(
                input,
                "bare identifiers may not contain spaces or slashes",
            ));
        }
        format!("{CANONICAL_BASE}video{input}")
    } else {
        input.to_string()
    };

    finish(input, candidate)
}

/// Rule 1: `vkvideo.ru/video{owner}_{id}` onto the primary host
fn from_alternate_host(input: &str) -> Result<String, NormalizeError> {
    let path = url_path(input)?;
    let captures = OWNER_VIDEO.captures(&path).ok_or_else(|| {
        NormalizeError::malformed(input, "expected video{owner}_{id} after the domain")
    })?;
    let owner = &captures[1];
    let video = &captures[2];
    Ok(format!("{CANONICAL_BASE}video{owner}_{video}"))
}

/// Path component of a link, without surrounding slashes
///
/// Scheme-less links such as `vk.com/video-1_2` are read as `https://` links
/// so their host is not mistaken for part of the path.
fn url_path(input: &str) -> Result<String, NormalizeError> {
    let parsed = if SCHEME.is_match(input) {
        Url::parse(input)
    } else {
        Url::parse(&format!("https://{input}"))
    }
    .map_err(|e| NormalizeError::malformed(input, format!("not a valid link: {e}")))?;

    Ok(parsed.path().trim_matches('/').to_string())
}

fn strip_query(s: &str) -> &str {
    s.split(['?', '#']).next().unwrap_or(s)
}

/// Final guard: whatever a rule produced must be an absolute URL
fn finish(input: &str, candidate: String) -> Result<CanonicalUrl, NormalizeError> {
    match Url::parse(&candidate) {
        Ok(parsed) if parsed.has_host() => Ok(CanonicalUrl(candidate)),
        Ok(_) => Err(NormalizeError::malformed(input, "link has no host")),
        Err(e) => Err(NormalizeError::malformed(
            input,
            format!("could not build a valid link: {e}"),
        )),
    }
}
