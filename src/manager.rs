// Rangeload - manager.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use reqwest::{header, Client};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::fetcher::SegmentFetcher;
use crate::planner::{self, PlanError};
use crate::progress::{NoProgress, ProgressReporter};
use crate::segment::{Segment, SegmentState};
use crate::storage;

#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Plan(#[from] PlanError),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("could not derive a file name from {0}")]
    NoFileName(String),
    #[error("could not determine size of {url}: {reason}")]
    UnknownSize { url: String, reason: String },
}

/// Coordinates one multi-segment download: probes the size, pre-allocates the
/// destination file, plans the ranges and launches one fetch task per segment.
pub struct DownloadManager {
    destination: PathBuf,
    client: Client,
    progress: Arc<dyn ProgressReporter>,
}

impl DownloadManager {
    /// Manager writing into `destination` with progress reporting disabled.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        DownloadManager {
            destination: destination.into(),
            client: Client::new(),
            progress: Arc::new(NoProgress),
        }
    }

    /// Replaces the progress sink fetch tasks report into.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Probes the resource size with a head-only request.
    ///
    /// A non-success status or a missing/unparseable content length fails the
    /// whole job before any file is created.
    pub async fn probe_size(&self, url: &str) -> Result<u64, ManagerError> {
        let response = self.client.head(url).send().await?;
        if !response.status().is_success() {
            return Err(ManagerError::UnknownSize {
                url: url.to_string(),
                reason: format!("metadata probe returned {}", response.status()),
            });
        }
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|val| val.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| ManagerError::UnknownSize {
                url: url.to_string(),
                reason: "no usable content-length in probe response".to_string(),
            })
    }

    /// Starts a download split across `concurrency` segments and returns
    /// without waiting for the fetch tasks.
    ///
    /// The destination file name is `name` if given, otherwise the last path
    /// component of `url`, resolved inside this manager's destination
    /// directory. Per-segment failures stay local to their segment: siblings
    /// keep running and the outcome is inspectable on the returned job. On
    /// overall failure the file holds correct bytes for succeeded ranges and
    /// zero-fill for failed ones.
    pub async fn download(
        &self,
        url: &str,
        name: Option<&str>,
        concurrency: u64,
    ) -> Result<DownloadJob, ManagerError> {
        let total_size = self.probe_size(url).await?;

        let file_name = match name {
            Some(name) => name.to_string(),
            None => derive_file_name(url)?,
        };
        let path = self.destination.join(file_name);

        storage::preallocate(&path, total_size).await?;
        let ranges = planner::plan(total_size, concurrency)?;
        info!(url, path = %path.display(), total_size, segments = ranges.len(), "starting download");

        // Open every segment writer before launching anything, so a setup
        // failure on a later segment cannot leave earlier tasks running
        // detached after this returns Err.
        let mut segments = Vec::with_capacity(ranges.len());
        let mut writers = Vec::with_capacity(ranges.len());
        for (index, (start, end)) in ranges.into_iter().enumerate() {
            segments.push(Arc::new(Segment::new(index, start, end)));
            writers.push(storage::open_segment_writer(&path, start).await?);
        }

        let mut tasks = Vec::with_capacity(segments.len());
        for (segment, file) in segments.iter().zip(writers) {
            let fetcher = SegmentFetcher::new(self.client.clone(), url);
            let progress = Arc::clone(&self.progress);
            let task_segment = Arc::clone(segment);

            tasks.push(tokio::spawn(async move {
                if let Err(error) = fetcher.fetch(&task_segment, file, progress.as_ref()).await {
                    warn!(segment = task_segment.index(), %error, "segment failed");
                    progress.segment_finished(&task_segment.label());
                    task_segment.record_failure(error);
                }
            }));
        }

        Ok(DownloadJob {
            url: url.to_string(),
            path,
            total_size,
            segments,
            tasks,
        })
    }

    /// Convenience wrapper that awaits every fetch task before returning.
    pub async fn download_and_wait(
        &self,
        url: &str,
        name: Option<&str>,
        concurrency: u64,
    ) -> Result<DownloadJob, ManagerError> {
        let mut job = self.download(url, name, concurrency).await?;
        job.wait().await;
        Ok(job)
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

fn derive_file_name(url: &str) -> Result<String, ManagerError> {
    let parsed = url::Url::parse(url)?;
    Path::new(parsed.path())
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .ok_or_else(|| ManagerError::NoFileName(url.to_string()))
}

/// Handle to one in-flight multi-segment download. Discarded after
/// completion; nothing is persisted.
pub struct DownloadJob {
    url: String,
    path: PathBuf,
    total_size: u64,
    segments: Vec<Arc<Segment>>,
    tasks: Vec<JoinHandle<()>>,
}

impl DownloadJob {
    /// True while any fetch task is still running. Safe to call concurrently
    /// with the tasks; never blocks.
    pub fn is_active(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Awaits every remaining fetch task. Idempotent.
    pub async fn wait(&mut self) {
        for result in join_all(self.tasks.drain(..)).await {
            if let Err(error) = result {
                warn!(%error, "fetch task aborted");
            }
        }
    }

    pub fn segments(&self) -> &[Arc<Segment>] {
        &self.segments
    }

    /// Total bytes transferred across all segments so far.
    pub fn bytes_transferred(&self) -> u64 {
        self.segments.iter().map(|s| s.bytes_transferred()).sum()
    }

    /// True once every segment completed. A job with any failed segment is
    /// overall-failed even though its siblings finished.
    pub fn succeeded(&self) -> bool {
        self.segments
            .iter()
            .all(|s| s.state() == SegmentState::Completed)
    }

    /// Index and description of every failed segment.
    pub fn failures(&self) -> Vec<(usize, String)> {
        self.segments
            .iter()
            .filter(|s| s.state() == SegmentState::Failed)
            .map(|s| {
                let message = s
                    .error_message()
                    .unwrap_or_else(|| "unknown failure".to_string());
                (s.index(), message)
            })
            .collect()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }
}
