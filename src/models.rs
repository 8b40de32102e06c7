use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Provenance tag for transcripts built from scraped captions
pub const SCRAPER_SOURCE: &str = "scraper";

/// Processing state of a video record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoStatus::Pending => write!(f, "pending"),
            VideoStatus::Processing => write!(f, "processing"),
            VideoStatus::Completed => write!(f, "completed"),
            VideoStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A submitted video and everything the pipeline learned about it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub source_id: String,
    pub url: String,
    pub status: VideoStatus,
    pub visibility: Visibility,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub duration_secs: u64,
    pub language: String,
    pub channel: String,
    pub channel_id: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub published_at: Option<DateTime<Utc>>,
    pub transcript_id: Option<String>,
    pub summary_id: Option<String>,
    pub error_message: Option<String>,
    pub created_by: String,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// New record in the `pending` state, placeholder title until metadata lands
    pub fn new(source_id: &str, url: &str, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: source_id.to_string(),
            url: url.to_string(),
            status: VideoStatus::Pending,
            visibility: Visibility::Public,
            title: "Pending Processing".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            duration_secs: 0,
            language: String::new(),
            channel: String::new(),
            channel_id: String::new(),
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            published_at: None,
            transcript_id: None,
            summary_id: None,
            error_message: None,
            created_by: created_by.to_string(),
            processed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single captioned segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub speaker: String,
    pub confidence: f64,
}

impl TranscriptSegment {
    /// Segment as produced from captions: no speaker, full confidence
    pub fn caption(index: usize, start: f64, end: f64, text: String) -> Self {
        Self {
            index,
            start,
            end,
            text,
            speaker: String::new(),
            confidence: 1.0,
        }
    }
}

/// Complete transcript for a video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: String,
    pub video_id: String,
    pub language: String,
    pub segments: Vec<TranscriptSegment>,
    pub raw_text: String,
    pub source: String,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transcript {
    /// Package parsed segments into a fresh transcript record.
    ///
    /// `video_id` is whatever key the caller files transcripts under.
    pub fn assemble(video_id: &str, language: &str, segments: Vec<TranscriptSegment>) -> Self {
        let now = Utc::now();
        let raw_text = raw_text(&segments);
        Self {
            id: Uuid::new_v4().to_string(),
            video_id: video_id.to_string(),
            language: language.to_string(),
            segments,
            raw_text,
            source: SCRAPER_SOURCE.to_string(),
            processed_at: now,
            created_at: now,
        }
    }

    /// Copy another extraction's content into this record, keeping identity
    pub fn replace_content(&mut self, other: Transcript) {
        self.language = other.language;
        self.segments = other.segments;
        self.raw_text = other.raw_text;
        self.source = other.source;
        self.processed_at = other.processed_at;
    }
}

/// Join segment texts with single spaces
pub fn raw_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
