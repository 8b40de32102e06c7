//! Video submission and the processing state machine.
//!
//! `pending → processing → {completed, failed}`, with `failed → pending` on
//! resubmission. Scraping problems degrade the result; only persistence
//! failures send a video to `failed`.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::dispatch::{Dispatcher, ProcessingHandle};
use crate::metadata::{self, VideoMetadata};
use crate::models::{Transcript, Video, VideoStatus, Visibility};
use crate::store::{StoreError, TranscriptStore, VideoStore};
use crate::youtube::Extractor;
use crate::{Error, Result, extract_video_id};

/// Outcome of a submission: the record as of submission time and, when a
/// pipeline run is active, a handle to await it
#[derive(Debug)]
pub struct Submission {
    pub video: Video,
    pub handle: Option<ProcessingHandle>,
}

pub struct VideoService {
    pipeline: Pipeline,
    dispatcher: Dispatcher,
}

impl VideoService {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        transcripts: Arc<dyn TranscriptStore>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                videos,
                transcripts,
                extractor,
            },
            dispatcher: Dispatcher::new(),
        }
    }

    /// Accept a URL for processing.
    ///
    /// Returns once the record is `pending` (or already further along); the
    /// pipeline runs in the background. `InvalidUrl` is the only scraping-side
    /// error reported here.
    pub async fn submit(&self, url: &str, user_id: &str) -> Result<Submission> {
        let source_id = extract_video_id(url)?;
        let url = url.trim();

        let existing = match self.pipeline.videos.get_by_source_id(&source_id).await {
            Ok(video) => Some(video),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };

        let mut video = match existing {
            Some(video) => video,
            None => {
                let video = Video::new(&source_id, url, user_id);
                match self.pipeline.videos.create(&video).await {
                    Ok(()) => {
                        info!("Created video: id={} source_id={source_id} user_id={user_id}", video.id);
                        video
                    }
                    Err(e) => {
                        // Lost a creation race; carry on with the winner's record
                        warn!("Create failed, re-reading: source_id={source_id} error={e}");
                        self.pipeline.videos.get_by_source_id(&source_id).await?
                    }
                }
            }
        };

        let handle = self.advance(&mut video).await?;
        Ok(Submission { video, handle })
    }

    /// Process an existing record by id.
    ///
    /// Same rules as resubmission: `failed` is reset and rerun, `pending`
    /// starts, `processing` joins the running job, `completed` yields `None`.
    pub async fn process_by_id(&self, video_id: &str) -> Result<Option<ProcessingHandle>> {
        let mut video = self.pipeline.videos.get_by_id(video_id).await?;
        self.advance(&mut video).await
    }

    /// Fetch a video, hiding private ones from everyone but their creator
    pub async fn details(&self, video_id: &str, user_id: &str) -> Result<Video> {
        let video = self.pipeline.videos.get_by_id(video_id).await?;
        if video.visibility == Visibility::Private && video.created_by != user_id {
            return Err(Error::Forbidden("you don't have permission to access this video".to_string()));
        }
        Ok(video)
    }

    async fn advance(&self, video: &mut Video) -> Result<Option<ProcessingHandle>> {
        let handle = match video.status {
            VideoStatus::Failed => {
                info!("Resubmitting failed video: id={} source_id={}", video.id, video.source_id);
                self.pipeline
                    .videos
                    .update_status(&video.id, VideoStatus::Pending, None)
                    .await?;
                video.status = VideoStatus::Pending;
                video.error_message = None;
                Some(self.start(&video.id).await)
            }
            VideoStatus::Pending => Some(self.start(&video.id).await),
            VideoStatus::Processing => self.dispatcher.in_flight(&video.id).await,
            VideoStatus::Completed => None,
        };
        Ok(handle)
    }

    async fn start(&self, video_id: &str) -> ProcessingHandle {
        let pipeline = self.pipeline.clone();
        let id = video_id.to_string();
        self.dispatcher.dispatch(video_id, async move { pipeline.run(&id).await }).await
    }
}

#[derive(Clone)]
struct Pipeline {
    videos: Arc<dyn VideoStore>,
    transcripts: Arc<dyn TranscriptStore>,
    extractor: Arc<dyn Extractor>,
}

impl Pipeline {
    async fn run(&self, video_id: &str) -> VideoStatus {
        let mut video = match self.videos.get_by_id(video_id).await {
            Ok(video) => video,
            Err(e) => {
                error!("Failed to load video: video_id={video_id} error={e}");
                return self.fail(video_id, "Failed to load video record").await;
            }
        };

        // A caller may have read `pending` before an earlier run finished
        if video.status != VideoStatus::Pending {
            debug!("Video no longer pending, skipping: video_id={video_id} status={}", video.status);
            return video.status;
        }

        if let Err(e) = self
            .videos
            .update_status(video_id, VideoStatus::Processing, None)
            .await
        {
            error!("Failed to update video status to processing: video_id={video_id} error={e}");
            return self.fail(video_id, "Failed to start processing").await;
        }
        video.status = VideoStatus::Processing;

        let source_id = video.source_id.clone();
        info!("Processing video: video_id={video_id} source_id={source_id}");

        let page = match self.extractor.watch_page(&source_id).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Watch page fetch failed, using default metadata: video_id={video_id} source_id={source_id} stage=metadata error={e}");
                None
            }
        };

        let meta = page
            .as_deref()
            .map(|p| metadata::extract_metadata(p, &source_id))
            .unwrap_or_else(|| VideoMetadata::fallback(&source_id));
        if meta.degraded {
            warn!("Metadata degraded: video_id={video_id} source_id={source_id} stage=metadata");
        }
        apply_metadata(&mut video, meta);

        if let Err(e) = self.videos.update(&video).await {
            error!("Failed to update video metadata: video_id={video_id} error={e}");
            return self.fail(video_id, "Failed to update video metadata").await;
        }

        let transcript_id = match page {
            Some(page) => self.extract_transcript(&video, &page).await,
            None => {
                warn!("No watch page, continuing without transcript: video_id={video_id} source_id={source_id} stage=transcript");
                None
            }
        };

        if let Err(e) = self
            .videos
            .update_processing_results(video_id, transcript_id.as_deref(), None)
            .await
        {
            error!("Failed to update processing results: video_id={video_id} error={e}");
            return self.fail(video_id, "Failed to update processing results").await;
        }

        info!(
            "Successfully processed video: video_id={video_id} source_id={source_id} transcript={}",
            transcript_id.as_deref().unwrap_or("none")
        );
        VideoStatus::Completed
    }

    /// Best-effort transcript; any failure is logged and yields `None`
    async fn extract_transcript(&self, video: &Video, page: &str) -> Option<String> {
        let source_id = &video.source_id;
        let captions = match self.extractor.captions(source_id, page).await {
            Ok(captions) => captions,
            Err(Error::NotFound(reason)) => {
                info!("No captions ({reason}), continuing without transcript: video_id={} source_id={source_id}", video.id);
                return None;
            }
            Err(e) => {
                warn!("Transcript extraction failed, continuing without transcript: video_id={} source_id={source_id} stage=transcript error={e}", video.id);
                return None;
            }
        };

        let transcript = Transcript::assemble(&video.id, &captions.language, captions.segments);
        match self.transcripts.create(&transcript).await {
            Ok(()) => {
                debug!(
                    "Saved transcript: video_id={} transcript_id={} segments={}",
                    video.id,
                    transcript.id,
                    transcript.segments.len()
                );
                Some(transcript.id)
            }
            Err(e) => {
                warn!("Failed to save transcript, continuing without it: video_id={} error={e}", video.id);
                None
            }
        }
    }

    async fn fail(&self, video_id: &str, message: &str) -> VideoStatus {
        if let Err(e) = self
            .videos
            .update_status(video_id, VideoStatus::Failed, Some(message))
            .await
        {
            error!("Failed to mark video failed: video_id={video_id} error={e}");
        }
        VideoStatus::Failed
    }
}

fn apply_metadata(video: &mut Video, meta: VideoMetadata) {
    video.title = meta.title;
    video.description = meta.description;
    video.channel = meta.channel;
    video.channel_id = meta.channel_id;
    video.view_count = meta.view_count;
    video.duration_secs = meta.duration_secs;
    video.thumbnail_url = meta.thumbnail_url;
    video.language = meta.language;
    video.published_at = meta.published_at;
}
