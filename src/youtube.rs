use async_trait::async_trait;
use log::{debug, info};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};

use crate::captions::{self, CaptionTrack};
use crate::config::Config;
use crate::models::TranscriptSegment;
use crate::{Error, Result};

const WATCH_BASE: &str = "https://www.youtube.com";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Captions pulled for one video, ready to be assembled into a transcript
#[derive(Debug, Clone)]
pub struct Captions {
    pub language: String,
    pub track_name: String,
    pub segments: Vec<TranscriptSegment>,
}

/// The scraping side of the pipeline.
///
/// Split in two so a single page fetch feeds both metadata and caption
/// discovery.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Raw watch-page HTML for a canonical video id
    async fn watch_page(&self, source_id: &str) -> Result<String>;

    /// Locate, select, download and parse captions listed in `page`
    async fn captions(&self, source_id: &str, page: &str) -> Result<Captions>;
}

/// Build the process-wide HTTP client: browser-like headers, bounded timeout, pooled connections
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|e| Error::ExternalService(format!("bad accept_language header: {e}")))?,
    );
    headers.insert("dnt", HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(config.request_timeout())
        .pool_idle_timeout(config.pool_idle_timeout())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .build()?;
    Ok(client)
}

/// Scrapes watch pages and caption payloads with a shared client
#[derive(Debug, Clone)]
pub struct Scraper {
    client: reqwest::Client,
    base_url: String,
    caption_format: String,
    preferred_language: String,
}

impl Scraper {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: WATCH_BASE.to_string(),
            caption_format: config.caption_format.clone(),
            preferred_language: config.preferred_language.clone(),
        }
    }

    /// Point watch-page requests at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn watch_url(&self, source_id: &str) -> String {
        format!("{}/watch?v={source_id}", self.base_url.trim_end_matches('/'))
    }

    async fn get(&self, url: &str, what: &str) -> Result<reqwest::Response> {
        debug!("Fetching {what}: {url}");
        Ok(self.client.get(url).send().await?)
    }

    async fn get_text(&self, url: &str, what: &str) -> Result<String> {
        let resp = self.get(url, what).await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(Error::ExternalService(format!("{what} returned status {status}")));
        }
        Ok(resp.text().await?)
    }

    /// Download and parse the caption payload of one track
    pub async fn download_captions(&self, track: &CaptionTrack) -> Result<Vec<TranscriptSegment>> {
        let url = captions::caption_url(&track.base_url, &self.caption_format)?;
        let payload = self.get_text(&url, "caption download").await?;
        captions::parse_timed_text(&payload)
    }
}

#[async_trait]
impl Extractor for Scraper {
    async fn watch_page(&self, source_id: &str) -> Result<String> {
        let resp = self.get(&self.watch_url(source_id), "watch page").await?;
        match resp.status() {
            StatusCode::OK => Ok(resp.text().await?),
            status @ (StatusCode::NOT_FOUND | StatusCode::GONE) => Err(Error::VideoUnavailable(format!(
                "{source_id}: watch page returned status {status}"
            ))),
            status => Err(Error::ExternalService(format!("watch page returned status {status}"))),
        }
    }

    async fn captions(&self, source_id: &str, page: &str) -> Result<Captions> {
        let tracks = captions::locate_caption_tracks(page)?;
        let track = captions::select_track(&tracks, &self.preferred_language)
            .ok_or_else(|| Error::NotFound("no captions available for this video".to_string()))?;
        info!(
            "Selected caption track: source_id={source_id} language={} name={:?} auto={}",
            track.language_code,
            track.name,
            track.is_auto_generated()
        );

        let segments = self.download_captions(track).await?;
        Ok(Captions {
            language: track.language_code.clone(),
            track_name: track.name.clone(),
            segments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn scraper(server: &Server) -> Scraper {
        let config = Config::default();
        let client = build_client(&config).unwrap();
        Scraper::new(client, &config).with_base_url(server.url())
    }

    fn page_with_track(base_url: &str) -> String {
        format!(
            r#"<html><script>var ytInitialPlayerResponse = {{"captions":{{"playerCaptionsTracklistRenderer":{{"captionTracks":[{{"baseUrl":"{base_url}","name":{{"simpleText":"English"}},"languageCode":"en","isTranslatable":true}}]}}}}}};</script></html>"#
        )
    }

    #[test]
    fn test_watch_url() {
        let config = Config::default();
        let s = Scraper::new(build_client(&config).unwrap(), &config);
        assert_eq!(s.watch_url("dQw4w9WgXcQ"), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[tokio::test]
    async fn test_watch_page_sends_browser_headers() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/watch")
            .match_query(Matcher::UrlEncoded("v".into(), "abc123".into()))
            .match_header("user-agent", Matcher::Regex("Mozilla/5.0".into()))
            .match_header("accept-language", "en-US,en;q=0.5")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let page = scraper(&server).watch_page("abc123").await.unwrap();
        assert_eq!(page, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_watch_page_non_200_is_external_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/watch")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let err = scraper(&server).watch_page("abc123").await.unwrap_err();
        assert!(matches!(err, Error::ExternalService(ref m) if m.contains("429")));
    }

    #[tokio::test]
    async fn test_missing_watch_page_is_unavailable() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/watch")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let err = scraper(&server).watch_page("gone1234567").await.unwrap_err();
        assert!(matches!(err, Error::VideoUnavailable(ref m) if m.contains("gone1234567")));
    }

    #[tokio::test]
    async fn test_transport_failure_is_external_error() {
        let config = Config::default();
        let s = Scraper::new(build_client(&config).unwrap(), &config).with_base_url("http://127.0.0.1:9");
        assert!(matches!(s.watch_page("abc").await, Err(Error::ExternalService(_))));
    }

    #[tokio::test]
    async fn test_captions_end_to_end() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/timedtext")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("v".into(), "abc123".into()),
                Matcher::UrlEncoded("fmt".into(), "srv1".into()),
            ]))
            .with_status(200)
            .with_body(r#"<transcript><text start="0.5" dur="1.5">Hi &amp; welcome</text></transcript>"#)
            .create_async()
            .await;

        let base = format!("{}/api/timedtext?v=abc123&lang=en", server.url());
        let captions = scraper(&server)
            .captions("abc123", &page_with_track(&base))
            .await
            .unwrap();
        assert_eq!(captions.language, "en");
        assert_eq!(captions.track_name, "English");
        assert_eq!(captions.segments.len(), 1);
        assert_eq!(captions.segments[0].text, "Hi & welcome");
        assert!((captions.segments[0].end - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_captions_download_failure() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/api/timedtext")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let base = format!("{}/api/timedtext?v=abc123", server.url());
        let err = scraper(&server)
            .captions("abc123", &page_with_track(&base))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExternalService(_)));
    }

    #[tokio::test]
    async fn test_captions_page_without_player_is_not_found() {
        let server = Server::new_async().await;
        let err = scraper(&server).captions("abc123", "<html></html>").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
