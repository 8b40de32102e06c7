use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

use crate::patterns::{Capture, Decode, Matcher, first_match};

/// Title used when no pattern recovers one
pub const DEFAULT_TITLE: &str = "YouTube Video";

const TITLE_SUFFIX: &str = " - YouTube";

/// Metadata scraped from a watch page
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub channel: String,
    pub channel_id: String,
    pub view_count: u64,
    pub duration_secs: u64,
    pub thumbnail_url: String,
    pub language: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Set when the title fell back to the default
    pub degraded: bool,
}

impl VideoMetadata {
    /// Placeholder metadata for a page that could not be fetched at all
    pub fn fallback(source_id: &str) -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            thumbnail_url: default_thumbnail(source_id),
            degraded: true,
            ..Default::default()
        }
    }
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

fn html(pattern: &str) -> Box<dyn Matcher> {
    Box::new(Capture::new(re(pattern), Decode::Html))
}

fn json(pattern: &str) -> Box<dyn Matcher> {
    Box::new(Capture::new(re(pattern), Decode::Json))
}

fn raw(pattern: &str) -> Box<dyn Matcher> {
    Box::new(Capture::new(re(pattern), Decode::Raw))
}

static TITLE: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    vec![
        html(r#"<meta\s+property="og:title"\s+content="([^"]*)""#),
        Box::new(Capture::new(re(r"(?s)<title>(.*?)</title>"), Decode::Html).strip_suffix(TITLE_SUFFIX)),
        json(r#""videoDetails":\{[^{}]*?"title":"((?:[^"\\]|\\.)*)""#),
    ]
});

static DESCRIPTION: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    vec![
        html(r#"<meta\s+property="og:description"\s+content="([^"]*)""#),
        html(r#"<meta\s+name="description"\s+content="([^"]*)""#),
        json(r#""shortDescription":"((?:[^"\\]|\\.)*)""#),
    ]
});

static CHANNEL: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    vec![
        json(r#""ownerChannelName":"((?:[^"\\]|\\.)*)""#),
        json(r#""author":"((?:[^"\\]|\\.)*)""#),
        html(r#"<span\s+itemprop="author"[^>]*>\s*<link\s+itemprop="url"[^>]*>\s*<link\s+itemprop="name"\s+content="([^"]*)""#),
    ]
});

static CHANNEL_ID: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    vec![
        raw(r#""channelId":"([A-Za-z0-9_-]+)""#),
        html(r#"<meta\s+itemprop="channelId"\s+content="([^"]*)""#),
    ]
});

static VIEW_COUNT: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    vec![
        raw(r#""viewCount":"(\d+)""#),
        raw(r#"<meta\s+itemprop="interactionCount"\s+content="(\d+)""#),
    ]
});

static DURATION: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| vec![raw(r#""lengthSeconds":"(\d+)""#)]);

static THUMBNAIL: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    vec![
        html(r#"<meta\s+property="og:image"\s+content="([^"]*)""#),
        html(r#"<link\s+itemprop="thumbnailUrl"\s+href="([^"]*)""#),
    ]
});

static PUBLISHED: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    vec![
        raw(r#""publishDate":"([^"]+)""#),
        raw(r#"<meta\s+itemprop="datePublished"\s+content="([^"]+)""#),
    ]
});

static LANGUAGE: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| vec![raw(r#"<html[^>]*\slang="([A-Za-z-]+)""#)]);

/// Pull metadata out of a watch page. Never fails; unmatched fields stay empty.
pub fn extract_metadata(page: &str, source_id: &str) -> VideoMetadata {
    let title = first_match(&TITLE, page);
    let degraded = title.is_none();

    VideoMetadata {
        title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: first_match(&DESCRIPTION, page).unwrap_or_default(),
        channel: first_match(&CHANNEL, page).unwrap_or_default(),
        channel_id: first_match(&CHANNEL_ID, page).unwrap_or_default(),
        view_count: parse_count(first_match(&VIEW_COUNT, page).as_deref()),
        duration_secs: parse_count(first_match(&DURATION, page).as_deref()),
        thumbnail_url: first_match(&THUMBNAIL, page).unwrap_or_else(|| default_thumbnail(source_id)),
        language: first_match(&LANGUAGE, page)
            .map(|l| primary_language(&l))
            .unwrap_or_default(),
        published_at: first_match(&PUBLISHED, page).and_then(|d| parse_published(&d)),
        degraded,
    }
}

/// Overflow-safe count parse, zero on anything unparsable
fn parse_count(value: Option<&str>) -> u64 {
    value
        .map(|v| v.replace(',', ""))
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    // Date-only form, optionally followed by a time part we cannot parse
    let date = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `en-US` → `en`
fn primary_language(tag: &str) -> String {
    tag.split('-').next().unwrap_or(tag).to_lowercase()
}

fn default_thumbnail(source_id: &str) -> String {
    format!("https://img.youtube.com/vi/{source_id}/maxresdefault.jpg")
}
