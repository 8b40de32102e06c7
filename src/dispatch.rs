//! Keyed task dispatch: at most one in-flight job per key.
//!
//! A second dispatch for a key that is still running joins the existing job
//! and receives a handle to the same completion.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use log::{debug, error};
use tokio::sync::{Mutex, watch};

use crate::models::VideoStatus;

/// How a dispatched job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished(VideoStatus),
    /// The job panicked or was torn down before reporting
    Aborted,
}

type Slot = watch::Receiver<Option<Completion>>;

/// Awaitable completion of a dispatched job. Dropping it does not cancel the job.
#[derive(Debug, Clone)]
pub struct ProcessingHandle {
    joined: bool,
    rx: Slot,
}

impl ProcessingHandle {
    /// True when this handle attached to a job that was already running
    pub fn joined(&self) -> bool {
        self.joined
    }

    pub async fn wait(mut self) -> Completion {
        match self.rx.wait_for(Option::is_some).await {
            Ok(done) => (*done).unwrap_or(Completion::Aborted),
            Err(_) => Completion::Aborted,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    inflight: Arc<Mutex<HashMap<String, Slot>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` for `key` unless one is already running, in which case join it
    pub async fn dispatch<F>(&self, key: &str, job: F) -> ProcessingHandle
    where
        F: Future<Output = VideoStatus> + Send + 'static,
    {
        let mut inflight = self.inflight.lock().await;
        if let Some(rx) = inflight.get(key) {
            debug!("Joining in-flight job: key={key}");
            return ProcessingHandle {
                joined: true,
                rx: rx.clone(),
            };
        }

        let (tx, rx) = watch::channel(None);
        inflight.insert(key.to_string(), rx.clone());
        drop(inflight);

        let map = Arc::clone(&self.inflight);
        let owned_key = key.to_string();
        tokio::spawn(async move {
            let completion = match tokio::spawn(job).await {
                Ok(status) => Completion::Finished(status),
                Err(e) => {
                    error!("Job aborted: key={owned_key} error={e}");
                    Completion::Aborted
                }
            };
            map.lock().await.remove(&owned_key);
            // Nobody may be listening, which is fine
            let _ = tx.send(Some(completion));
        });

        ProcessingHandle {
            joined: false,
            rx,
        }
    }

    /// Handle for a running job, if any
    pub async fn in_flight(&self, key: &str) -> Option<ProcessingHandle> {
        self.inflight.lock().await.get(key).map(|rx| ProcessingHandle {
            joined: true,
            rx: rx.clone(),
        })
    }
}
