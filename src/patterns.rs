//! Pure pattern matchers used to pull values out of watch pages.
//!
//! The page layout is an unversioned external contract, so every extraction
//! is an ordered list of matchers tried until one yields a non-empty value.
//! Adding a new page shape means appending a matcher to a list.

use log::debug;
use regex::Regex;

/// Something that can pull a single value out of page text
pub trait Matcher: Send + Sync {
    fn find(&self, text: &str) -> Option<String>;
}

/// How a captured group is post-processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
    Raw,
    /// HTML attribute or element text, entities decoded
    Html,
    /// Body of a JSON string literal, escapes decoded
    Json,
}

/// First capture group of a regex, decoded
pub struct Capture {
    re: Regex,
    decode: Decode,
    strip_suffix: Option<&'static str>,
}

impl Capture {
    pub fn new(re: Regex, decode: Decode) -> Self {
        Self {
            re,
            decode,
            strip_suffix: None,
        }
    }

    /// Drop a trailing site suffix such as `" - YouTube"`
    pub fn strip_suffix(mut self, suffix: &'static str) -> Self {
        self.strip_suffix = Some(suffix);
        self
    }
}

impl Matcher for Capture {
    fn find(&self, text: &str) -> Option<String> {
        let raw = self.re.captures(text)?.get(1)?.as_str();
        let decoded = match self.decode {
            Decode::Raw => raw.to_string(),
            Decode::Html => html_escape::decode_html_entities(raw).to_string(),
            Decode::Json => unescape_json(raw),
        };
        let value = match self.strip_suffix {
            Some(suffix) => decoded.strip_suffix(suffix).unwrap_or(&decoded).to_string(),
            None => decoded,
        };
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// A JSON object literal following an anchor.
///
/// The anchor regex must end on the opening `{`; the object is cut at its
/// balanced closing brace, so `};` sequences inside strings do not truncate it.
pub struct JsonObject {
    anchor: Regex,
}

impl JsonObject {
    pub fn new(anchor: Regex) -> Self {
        Self { anchor }
    }
}

impl Matcher for JsonObject {
    fn find(&self, text: &str) -> Option<String> {
        let m = self.anchor.find(text)?;
        let open = m.end().checked_sub(1)?;
        if text.as_bytes().get(open) != Some(&b'{') {
            debug!("anchor {} did not end on an opening brace", self.anchor.as_str());
            return None;
        }
        balanced_object(&text[open..]).map(str::to_string)
    }
}

/// A JSON document embedded as an escaped string literal, e.g. `"playerResponse":"{\"a\":1}"`
pub struct JsonString {
    re: Regex,
}

impl JsonString {
    /// `re` must capture the literal's body (without the surrounding quotes)
    pub fn new(re: Regex) -> Self {
        Self { re }
    }
}

impl Matcher for JsonString {
    fn find(&self, text: &str) -> Option<String> {
        let body = self.re.captures(text)?.get(1)?.as_str();
        let decoded: String = serde_json::from_str(&format!("\"{body}\"")).ok()?;
        let decoded = decoded.trim();
        decoded.starts_with('{').then(|| decoded.to_string())
    }
}

/// Run matchers in order, returning the first non-empty value
pub fn first_match(matchers: &[Box<dyn Matcher>], text: &str) -> Option<String> {
    matchers.iter().find_map(|m| m.find(text))
}

/// Slice of `s` holding the JSON object that starts at `s[0]`
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, b) in s.bytes().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match b {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Decode the body of a JSON string literal, keeping the input on malformed escapes
pub fn unescape_json(s: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{s}\"")).unwrap_or_else(|_| s.to_string())
}
