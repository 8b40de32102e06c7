use std::sync::Arc;

use log::{error, info};

use crate::Result;
use crate::models::{Transcript, TranscriptSegment};
use crate::store::{StoreError, TranscriptStore, VideoStore};
use crate::youtube::Extractor;

/// Read, extract and refresh transcripts outside the submission pipeline
pub struct TranscriptService {
    videos: Arc<dyn VideoStore>,
    transcripts: Arc<dyn TranscriptStore>,
    extractor: Arc<dyn Extractor>,
}

impl TranscriptService {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        transcripts: Arc<dyn TranscriptStore>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            videos,
            transcripts,
            extractor,
        }
    }

    pub async fn get(&self, transcript_id: &str) -> Result<Transcript> {
        Ok(self.transcripts.get_by_id(transcript_id).await?)
    }

    /// Stored transcript for a video, extracting and saving one if none exists
    pub async fn get_by_video(&self, video_id: &str) -> Result<Transcript> {
        match self.transcripts.get_by_video_id(video_id).await {
            Ok(transcript) => {
                info!("Found existing transcript: video_id={video_id} transcript_id={}", transcript.id);
                Ok(transcript)
            }
            Err(StoreError::NotFound(_)) => {
                info!("No existing transcript, extracting: video_id={video_id}");
                self.extract_and_save(video_id).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Extract and store a new transcript even if one already exists
    pub async fn force_extract(&self, video_id: &str) -> Result<Transcript> {
        info!("Force extracting transcript: video_id={video_id}");
        self.extract_and_save(video_id).await
    }

    /// Re-extract, updating the current transcript in place or creating one
    pub async fn refresh(&self, video_id: &str) -> Result<Transcript> {
        info!("Refreshing transcript: video_id={video_id}");
        let fresh = self.extract(video_id).await?;

        match self.transcripts.get_by_video_id(video_id).await {
            Ok(mut existing) => {
                existing.replace_content(fresh);
                self.transcripts.update(&existing).await?;
                info!("Updated existing transcript: transcript_id={}", existing.id);
                Ok(existing)
            }
            Err(StoreError::NotFound(_)) => {
                self.transcripts.create(&fresh).await?;
                info!("Created new transcript: transcript_id={}", fresh.id);
                Ok(fresh)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn text(&self, video_id: &str) -> Result<String> {
        Ok(self.get_by_video(video_id).await?.raw_text)
    }

    /// Segments overlapping `[start, end]`; either bound may be open
    pub async fn segments_between(
        &self,
        video_id: &str,
        start: Option<f64>,
        end: Option<f64>,
    ) -> Result<Vec<TranscriptSegment>> {
        let transcript = self.get_by_video(video_id).await?;
        Ok(filter_segments(transcript.segments, start, end))
    }

    pub async fn exists(&self, video_id: &str) -> Result<bool> {
        match self.transcripts.get_by_video_id(video_id).await {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn extract(&self, video_id: &str) -> Result<Transcript> {
        let video = self.videos.get_by_id(video_id).await?;
        let page = self.extractor.watch_page(&video.source_id).await?;
        let captions = self.extractor.captions(&video.source_id, &page).await?;
        Ok(Transcript::assemble(&video.id, &captions.language, captions.segments))
    }

    async fn extract_and_save(&self, video_id: &str) -> Result<Transcript> {
        let transcript = self.extract(video_id).await.inspect_err(|e| {
            error!("Failed to extract transcript: video_id={video_id} error={e}");
        })?;
        self.transcripts.create(&transcript).await.inspect_err(|e| {
            error!("Failed to save transcript: video_id={video_id} error={e}");
        })?;
        info!(
            "Extracted and saved transcript: video_id={video_id} transcript_id={} language={} segments={}",
            transcript.id,
            transcript.language,
            transcript.segments.len()
        );
        Ok(transcript)
    }
}

fn filter_segments(segments: Vec<TranscriptSegment>, start: Option<f64>, end: Option<f64>) -> Vec<TranscriptSegment> {
    segments
        .into_iter()
        .filter(|s| start.is_none_or(|start| s.end >= start))
        .filter(|s| end.is_none_or(|end| s.start <= end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::Video;
    use crate::service::tests::FakeExtractor;
    use crate::store::MemoryStore;

    async fn setup(extractor: FakeExtractor) -> (TranscriptService, Arc<MemoryStore>, Video) {
        let store = Arc::new(MemoryStore::new());
        let video = Video::new("dQw4w9WgXcQ", "https://youtu.be/dQw4w9WgXcQ", "user-1");
        VideoStore::create(store.as_ref(), &video).await.unwrap();
        let svc = TranscriptService::new(store.clone(), store.clone(), Arc::new(extractor));
        (svc, store, video)
    }

    fn seg(index: usize, start: f64, end: f64) -> TranscriptSegment {
        TranscriptSegment::caption(index, start, end, format!("s{index}"))
    }

    #[tokio::test]
    async fn test_get_by_video_extracts_once() {
        let (svc, store, video) = setup(FakeExtractor::with_captions()).await;
        assert!(!svc.exists(&video.id).await.unwrap());

        let first = svc.get_by_video(&video.id).await.unwrap();
        assert_eq!(first.raw_text, "Hello world Bye");
        assert!(svc.exists(&video.id).await.unwrap());

        let second = svc.get_by_video(&video.id).await.unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(TranscriptStore::get_by_id(store.as_ref(), &first.id).await.unwrap().video_id, video.id);
    }

    #[tokio::test]
    async fn test_get_by_video_without_captions_is_not_found() {
        let (svc, _store, video) = setup(FakeExtractor::without_captions()).await;
        assert!(svc.get_by_video(&video.id).await.unwrap_err().is_not_found());
        assert!(!svc.exists(&video.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_video_is_not_found() {
        let (svc, _store, _video) = setup(FakeExtractor::with_captions()).await;
        assert!(svc.get_by_video("missing").await.unwrap_err().is_not_found());
        assert!(matches!(svc.get("missing").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_updates_in_place() {
        let (svc, _store, video) = setup(FakeExtractor::with_captions()).await;
        let created = svc.refresh(&video.id).await.unwrap();
        let refreshed = svc.refresh(&video.id).await.unwrap();
        assert_eq!(refreshed.id, created.id);
        assert_eq!(refreshed.raw_text, "Hello world Bye");
    }

    #[tokio::test]
    async fn test_force_extract_creates_new_record() {
        let (svc, _store, video) = setup(FakeExtractor::with_captions()).await;
        let a = svc.force_extract(&video.id).await.unwrap();
        let b = svc.force_extract(&video.id).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_text() {
        let (svc, _store, video) = setup(FakeExtractor::with_captions()).await;
        assert_eq!(svc.text(&video.id).await.unwrap(), "Hello world Bye");
    }

    #[tokio::test]
    async fn test_segments_between_service() {
        let (svc, _store, video) = setup(FakeExtractor::with_captions()).await;
        let segments = svc.segments_between(&video.id, Some(4.0), None).await.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Bye");
    }

    #[test]
    fn test_filter_segments_overlap() {
        let segments = vec![seg(0, 0.0, 2.0), seg(1, 2.0, 4.0), seg(2, 4.0, 6.0), seg(3, 6.0, 8.0)];

        let picked = filter_segments(segments.clone(), Some(3.0), Some(5.0));
        assert_eq!(picked.iter().map(|s| s.index).collect::<Vec<_>>(), vec![1, 2]);

        assert_eq!(filter_segments(segments.clone(), None, None).len(), 4);
        assert_eq!(filter_segments(segments.clone(), Some(7.0), None).len(), 1);
        assert_eq!(filter_segments(segments, None, Some(0.0)).len(), 1);
    }
}
