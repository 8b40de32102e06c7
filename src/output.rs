use serde::Serialize;

use crate::models::{Transcript, Video};

/// Everything the CLI knows about one processed video
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub video: &'a Video,
    pub transcript: Option<&'a Transcript>,
}

/// Render transcript as plain text (one segment per line, no timestamps)
pub fn render_text(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_json(report: &Report<'_>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Render transcript as SubRip subtitles
pub fn render_srt(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .enumerate()
        .map(|(i, s)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                srt_timestamp(s.start),
                srt_timestamp(s.end),
                s.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line summary of a video record
pub fn render_header(video: &Video) -> String {
    let mut line = format!("{} [{}] {}", video.source_id, video.status, video.title);
    if !video.channel.is_empty() {
        line.push_str(&format!(" ({})", video.channel));
    }
    if let Some(err) = &video.error_message {
        line.push_str(&format!(" error: {err}"));
    }
    line
}

fn srt_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let (h, rem) = (total_ms / 3_600_000, total_ms % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    let (s, ms) = (rem / 1000, rem % 1000);
    format!("{h:02}:{m:02}:{s:02},{ms:03}")
}
