//! Removal of terminal escape sequences from human-readable text
//!
//! yt-dlp colors its percentages and log lines with ANSI sequences when it
//! believes it is talking to a terminal. Every string forwarded to a caller
//! passes through [`strip_control_sequences`] first.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

/// OSC sequences (`ESC ] ... BEL` or `ESC ] ... ESC \`), e.g. terminal titles
#[allow(clippy::expect_used)]
static OSC_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B\][^\x07\x1B]*(?:\x07|\x1B\\)")
        .expect("static pattern compiles")
});

/// CSI sequences (`ESC [ params final`) and two-byte Fe escapes
#[allow(clippy::expect_used)]
static ESCAPE_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B(?:[@-Z\\\]^_]|\[[0-?]*[ -/]*[@-~])")
        .expect("static pattern compiles")
});

/// Strip terminal color/control escape sequences from `text`
///
/// Visible characters are left untouched. Any stray `ESC` byte that is not
/// part of a recognized sequence is dropped as well, so the result never
/// contains `\x1B`.
///
/// # Examples
///
/// ```
/// use vkvideo_dl::sanitize::strip_control_sequences;
///
/// assert_eq!(strip_control_sequences("\x1b[0;94m 42.0%\x1b[0m"), " 42.0%");
/// assert_eq!(strip_control_sequences("plain"), "plain");
/// ```
#[must_use]
pub fn strip_control_sequences(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1B') {
        return Cow::Borrowed(text);
    }

    let without_osc = OSC_SEQUENCE.replace_all(text, "");
    let without_csi = ESCAPE_SEQUENCE.replace_all(&without_osc, "");
    Cow::Owned(without_csi.replace('\x1B', ""))
}

/// Owned convenience wrapper around [`strip_control_sequences`]
pub(crate) fn clean(text: &str) -> String {
    strip_control_sequences(text).into_owned()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_borrowed_unchanged() {
        let result = strip_control_sequences("[download] Destination: clip.mp4");
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, "[download] Destination: clip.mp4");
    }

    #[test]
    fn test_color_codes_are_removed() {
        let colored = "\x1b[0;94m  50.0%\x1b[0m of 10.00MiB at \x1b[0;32m1.00MiB/s\x1b[0m";
        assert_eq!(
            strip_control_sequences(colored),
            "  50.0% of 10.00MiB at 1.00MiB/s"
        );
    }

    #[test]
    fn test_cursor_movement_and_erase_are_removed() {
        let line = "\x1b[K\x1b[2A[download]  10.0%";
        assert_eq!(strip_control_sequences(line), "[download]  10.0%");
    }

    #[test]
    fn test_osc_title_sequences_are_removed() {
        let line = "\x1b]0;yt-dlp 12%\x07[download] 12%";
        assert_eq!(strip_control_sequences(line), "[download] 12%");

        let st_terminated = "\x1b]2;title\x1b\\done";
        assert_eq!(strip_control_sequences(st_terminated), "done");
    }

    #[test]
    fn test_two_byte_escapes_are_removed() {
        // ESC M (reverse index) and ESC _ (APC introducer)
        assert_eq!(strip_control_sequences("a\x1bMb\x1b_c"), "abc");
    }

    #[test]
    fn test_no_escape_bytes_survive() {
        let messy = "x\x1b[31mred\x1b[0m\x1b";
        let cleaned = strip_control_sequences(messy);
        assert!(!cleaned.contains('\x1b'));
        assert_eq!(cleaned, "xred");
    }

    #[test]
    fn test_unicode_text_is_preserved() {
        let line = "\x1b[1mВидео успешно скачано\x1b[0m: клип.mp4";
        assert_eq!(
            strip_control_sequences(line),
            "Видео успешно скачано: клип.mp4"
        );
    }
}
