//! Caption discovery, track selection and timed-text parsing.

use std::sync::LazyLock;

use log::{debug, warn};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::TranscriptSegment;
use crate::patterns::{JsonObject, JsonString, Matcher};
use crate::{Error, Result};

/// `kind` value marking an auto-generated (speech recognition) track
pub const AUTO_GENERATED_KIND: &str = "asr";

/// One available caption stream for a video
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    pub name: String,
    pub kind: String,
    pub is_translatable: bool,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind == AUTO_GENERATED_KIND
    }

    fn has_language(&self, prefix: &str) -> bool {
        self.language_code.starts_with(prefix)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    #[serde(default)]
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionsData {
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<RawCaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    name: Option<TrackName>,
    #[serde(default)]
    kind: String,
    #[serde(default)]
    is_translatable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Deserialize)]
struct TextRun {
    text: String,
}

impl From<RawCaptionTrack> for CaptionTrack {
    fn from(raw: RawCaptionTrack) -> Self {
        let name = raw
            .name
            .map(|n| {
                n.simple_text
                    .unwrap_or_else(|| n.runs.into_iter().map(|r| r.text).collect::<String>())
            })
            .unwrap_or_default();
        Self {
            base_url: raw.base_url,
            language_code: raw.language_code,
            name,
            kind: raw.kind,
            is_translatable: raw.is_translatable,
        }
    }
}

impl PlayerResponse {
    pub fn caption_tracks(self) -> Vec<CaptionTrack> {
        self.captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .map(|r| r.caption_tracks.into_iter().map(CaptionTrack::from).collect())
            .unwrap_or_default()
    }
}

/// Historical shapes of the embedded player configuration, newest first
static PLAYER_RESPONSE: LazyLock<Vec<Box<dyn Matcher>>> = LazyLock::new(|| {
    let object = |p: &str| -> Box<dyn Matcher> { Box::new(JsonObject::new(Regex::new(p).unwrap())) };
    vec![
        object(r"ytplayer\.config\.args\.raw_player_response\s*=\s*\{"),
        object(r"var ytInitialPlayerResponse\s*=\s*\{"),
        object(r#"window\["ytInitialPlayerResponse"\]\s*=\s*\{"#),
        object(r#"ytInitialPlayerResponse"\s*:\s*\{"#),
        Box::new(JsonString::new(Regex::new(r#""playerResponse"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap())),
        object(r"ytplayer\.config\s*=\s*\{"),
    ]
});

/// Find and decode the embedded player response.
///
/// Candidates that do not decode are skipped; the next pattern is tried.
pub fn locate_player_response(page: &str) -> Result<PlayerResponse> {
    for (i, matcher) in PLAYER_RESPONSE.iter().enumerate() {
        let Some(candidate) = matcher.find(page) else {
            continue;
        };
        match serde_json::from_str::<PlayerResponse>(&candidate) {
            Ok(resp) => {
                debug!("Player response found with pattern #{i}");
                return Ok(resp);
            }
            Err(e) => debug!("Pattern #{i} matched but did not decode: {e}"),
        }
    }
    Err(Error::NotFound("could not find player response in page content".to_string()))
}

/// Caption tracks listed in a watch page. Zero tracks is `NotFound`.
pub fn locate_caption_tracks(page: &str) -> Result<Vec<CaptionTrack>> {
    let tracks = locate_player_response(page)?.caption_tracks();
    if tracks.is_empty() {
        return Err(Error::NotFound("no captions available for this video".to_string()));
    }
    Ok(tracks)
}

/// Pick the best track.
///
/// Preference: manual in `language`, any manual, auto-generated in
/// `language`, any auto-generated, then the first track. Among manual tracks
/// in `language` the last one listed wins; every other tier takes the first.
/// `None` only for an empty list.
pub fn select_track<'a>(tracks: &'a [CaptionTrack], language: &str) -> Option<&'a CaptionTrack> {
    let manual = |t: &&CaptionTrack| !t.is_auto_generated();
    let auto = |t: &&CaptionTrack| t.is_auto_generated();

    tracks
        .iter()
        .filter(manual)
        .rfind(|t| t.has_language(language))
        .or_else(|| tracks.iter().find(manual))
        .or_else(|| tracks.iter().filter(auto).find(|t| t.has_language(language)))
        .or_else(|| tracks.iter().find(auto))
        .or_else(|| tracks.first())
}

/// Caption URL with the timed-text format parameter set
pub fn caption_url(base_url: &str, format: &str) -> Result<String> {
    let mut url = url::Url::parse(base_url).map_err(|e| Error::ExternalService(format!("bad caption URL {base_url}: {e}")))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "fmt")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut().clear().extend_pairs(kept).append_pair("fmt", format);
    Ok(url.into())
}

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Timed-text payloads escape entities twice (`&amp;#39;`), occasionally more
const MAX_DECODE_PASSES: usize = 4;

/// Decode entities until stable, flatten newlines, collapse whitespace, trim
pub fn clean_text(text: &str) -> String {
    let mut decoded = text.to_string();
    for _ in 0..MAX_DECODE_PASSES {
        let next = html_escape::decode_html_entities(&decoded);
        if *next == *decoded {
            break;
        }
        decoded = next.into_owned();
    }
    let flat = decoded.replace('\n', " ");
    WHITESPACE.replace_all(&flat, " ").trim().to_string()
}

struct PendingCue {
    start: Option<f64>,
    dur: Option<f64>,
    text: String,
}

impl PendingCue {
    fn from_element(e: &BytesStart) -> Self {
        let mut cue = PendingCue {
            start: None,
            dur: None,
            text: String::new(),
        };
        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value);
            match attr.key.as_ref() {
                b"start" => cue.start = parse_seconds(&value),
                b"dur" => cue.dur = parse_seconds(&value),
                _ => {}
            }
        }
        cue
    }

    fn into_segment(self, index: usize) -> Option<TranscriptSegment> {
        let (start, dur) = (self.start?, self.dur?);
        if dur < 0.0 {
            return None;
        }
        let text = clean_text(&self.text);
        if text.is_empty() {
            return None;
        }
        Some(TranscriptSegment::caption(index, start, start + dur, text))
    }
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a timed-text payload of `<text start=".." dur="..">..</text>` elements.
///
/// Elements with bad timing or no text are dropped, indexes stay dense and
/// follow payload order. Malformed markup ends parsing with what was read.
pub fn parse_timed_text(xml: &str) -> Result<Vec<TranscriptSegment>> {
    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<PendingCue> = None;
    let mut seen = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                seen += 1;
                current = Some(PendingCue::from_element(e));
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"text" => {
                // Self-closing <text .../> carries no words
                seen += 1;
            }
            Ok(Event::Text(e)) => {
                if let Some(cue) = current.as_mut() {
                    cue.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(cue) = current.as_mut() {
                    cue.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"text" => {
                if let Some(segment) = current.take().and_then(|cue| cue.into_segment(segments.len())) {
                    segments.push(segment);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Caption payload malformed at byte {}: {e}", reader.buffer_position());
                break;
            }
            _ => {}
        }
    }

    let dropped = seen - segments.len();
    if dropped > 0 {
        debug!("Dropped {dropped} of {seen} caption elements");
        if dropped * 2 > seen {
            warn!("More than half of the caption elements were dropped ({dropped}/{seen})");
        }
    }

    if segments.is_empty() {
        return Err(Error::NotFound("no valid caption segments found".to_string()));
    }
    Ok(segments)
}
