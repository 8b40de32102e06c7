pub mod captions;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metadata;
pub mod models;
pub mod output;
pub mod patterns;
pub mod service;
pub mod store;
pub mod transcripts;
pub mod youtube;

use std::sync::LazyLock;

use regex::Regex;

pub use error::{Error, Result};
pub use models::{Transcript, TranscriptSegment, Video, VideoStatus, Visibility};

/// Recognized URL shapes, tried in order. Matched against `host/path?query`.
static VIDEO_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // youtube.com/watch?v=ID, v may follow other parameters
        r"^(?:[\w-]+\.)*youtube\.com/watch\?(?:[^#]*&)?v=([^&?/#]+)",
        // youtu.be/ID
        r"^youtu\.be/([^&?/#]+)",
        // youtube.com/embed/ID
        r"^(?:[\w-]+\.)*youtube(?:-nocookie)?\.com/embed/([^&?/#]+)",
        // youtube.com/v/ID
        r"^(?:[\w-]+\.)*youtube\.com/v/([^&?/#]+)",
        // youtube.com/shorts/ID
        r"^(?:[\w-]+\.)*youtube\.com/shorts/([^&?/#]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Extract the canonical video ID from a YouTube URL.
///
/// The input must be an absolute URL with a host; anything else, or a URL
/// in none of the known shapes, is `InvalidUrl`.
pub fn extract_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    let url = url::Url::parse(input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| Error::InvalidUrl(format!("{input}: missing host")))?;

    let target = match url.query() {
        Some(q) => format!("{host}{}?{q}", url.path()),
        None => format!("{host}{}", url.path()),
    };

    VIDEO_URL_PATTERNS
        .iter()
        .find_map(|re| re.captures(&target).map(|caps| caps[1].to_string()))
        .ok_or_else(|| Error::InvalidUrl(format!("could not extract YouTube video ID from {input}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(url: &str) -> String {
        extract_video_id(url).unwrap()
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_watch_url_with_extra_params() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=120"), "dQw4w9WgXcQ");
        assert_eq!(id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_mobile_and_bare_host() {
        assert_eq!(id("https://m.youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(id("http://youtube.com/watch?v=dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_short_url() {
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(id("https://youtu.be/dQw4w9WgXcQ?t=42"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(id("https://www.youtube.com/embed/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(id("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?rel=0"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_legacy_v_url() {
        assert_eq!(id("https://www.youtube.com/v/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_shorts_url() {
        assert_eq!(id("https://www.youtube.com/shorts/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_whitespace_trimming() {
        assert_eq!(id("  https://youtu.be/dQw4w9WgXcQ \n"), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_not_a_url() {
        assert!(matches!(extract_video_id("not-a-valid-url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(extract_video_id("dQw4w9WgXcQ"), Err(Error::InvalidUrl(_))));
        assert!(matches!(extract_video_id(""), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_unsupported_urls() {
        for url in [
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?list=PL123",
            "https://www.youtube.com/channel/UCuAXFkgsw1L7xaCfnd5JJOw",
            "https://evil.example/?next=youtube.com/watch?v=dQw4w9WgXcQ",
            "mailto:someone@youtube.com",
        ] {
            assert!(matches!(extract_video_id(url), Err(Error::InvalidUrl(_))), "{url}");
        }
    }

    #[test]
    fn test_id_runs_to_delimiter() {
        assert_eq!(id("https://www.youtube.com/watch?v=abc.DEF~1&t=5"), "abc.DEF~1");
        assert_eq!(id("https://youtu.be/abc.DEF~1?si=x"), "abc.DEF~1");
        assert_eq!(id("https://www.youtube.com/shorts/abc.DEF~1/"), "abc.DEF~1");
    }

    #[test]
    fn test_fragment_ignored() {
        assert_eq!(id("https://www.youtube.com/watch?v=dQw4w9WgXcQ#comments"), "dQw4w9WgXcQ");
    }
}
