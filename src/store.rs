//! Persistence boundary for videos and transcripts.
//!
//! The pipeline only talks to these traits. `MemoryStore` backs the CLI and
//! the tests; a database-backed store plugs in the same way.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::{Transcript, Video, VideoStatus};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create(&self, video: &Video) -> StoreResult<()>;
    async fn get_by_id(&self, id: &str) -> StoreResult<Video>;
    async fn get_by_source_id(&self, source_id: &str) -> StoreResult<Video>;
    /// Replace the whole record
    async fn update(&self, video: &Video) -> StoreResult<()>;
    async fn update_status(&self, id: &str, status: VideoStatus, error_message: Option<&str>) -> StoreResult<()>;
    /// Record produced artifacts and mark the video `completed` in one write
    async fn update_processing_results(
        &self,
        id: &str,
        transcript_id: Option<&str>,
        summary_id: Option<&str>,
    ) -> StoreResult<()>;
    /// Records in a given state, oldest update first
    async fn list_by_status(&self, status: VideoStatus, limit: usize) -> StoreResult<Vec<Video>>;
}

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn create(&self, transcript: &Transcript) -> StoreResult<()>;
    async fn get_by_id(&self, id: &str) -> StoreResult<Transcript>;
    /// Most recently created transcript for a video
    async fn get_by_video_id(&self, video_id: &str) -> StoreResult<Transcript>;
    async fn update(&self, transcript: &Transcript) -> StoreResult<()>;
}

/// In-process store keeping everything in hash maps
#[derive(Debug, Default)]
pub struct MemoryStore {
    videos: RwLock<HashMap<String, Video>>,
    transcripts: RwLock<HashMap<String, Transcript>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn create(&self, video: &Video) -> StoreResult<()> {
        let mut videos = self.videos.write().await;
        if videos.values().any(|v| v.source_id == video.source_id) {
            return Err(StoreError::Backend(format!("duplicate source id {}", video.source_id)));
        }
        videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Video> {
        self.videos
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("video {id}")))
    }

    async fn get_by_source_id(&self, source_id: &str) -> StoreResult<Video> {
        self.videos
            .read()
            .await
            .values()
            .find(|v| v.source_id == source_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("video with source id {source_id}")))
    }

    async fn update(&self, video: &Video) -> StoreResult<()> {
        let mut videos = self.videos.write().await;
        let slot = videos
            .get_mut(&video.id)
            .ok_or_else(|| StoreError::NotFound(format!("video {}", video.id)))?;
        *slot = video.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status(&self, id: &str, status: VideoStatus, error_message: Option<&str>) -> StoreResult<()> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("video {id}")))?;
        video.status = status;
        video.error_message = error_message.map(str::to_string);
        video.updated_at = Utc::now();
        Ok(())
    }

    async fn update_processing_results(
        &self,
        id: &str,
        transcript_id: Option<&str>,
        summary_id: Option<&str>,
    ) -> StoreResult<()> {
        let mut videos = self.videos.write().await;
        let video = videos
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("video {id}")))?;
        let now = Utc::now();
        video.transcript_id = transcript_id.map(str::to_string);
        video.summary_id = summary_id.map(str::to_string);
        video.status = VideoStatus::Completed;
        video.error_message = None;
        video.processed_at = Some(now);
        video.updated_at = now;
        Ok(())
    }

    async fn list_by_status(&self, status: VideoStatus, limit: usize) -> StoreResult<Vec<Video>> {
        let mut matching: Vec<Video> = self
            .videos
            .read()
            .await
            .values()
            .filter(|v| v.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|v| v.updated_at);
        matching.truncate(limit);
        Ok(matching)
    }
}

#[async_trait]
impl TranscriptStore for MemoryStore {
    async fn create(&self, transcript: &Transcript) -> StoreResult<()> {
        self.transcripts
            .write()
            .await
            .insert(transcript.id.clone(), transcript.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StoreResult<Transcript> {
        self.transcripts
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transcript {id}")))
    }

    async fn get_by_video_id(&self, video_id: &str) -> StoreResult<Transcript> {
        self.transcripts
            .read()
            .await
            .values()
            .filter(|t| t.video_id == video_id)
            .max_by_key(|t| t.created_at)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("transcript for video {video_id}")))
    }

    async fn update(&self, transcript: &Transcript) -> StoreResult<()> {
        let mut transcripts = self.transcripts.write().await;
        let slot = transcripts
            .get_mut(&transcript.id)
            .ok_or_else(|| StoreError::NotFound(format!("transcript {}", transcript.id)))?;
        *slot = transcript.clone();
        Ok(())
    }
}
