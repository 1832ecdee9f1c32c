// Rangeload - fetcher.rs

use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::progress::ProgressReporter;
use crate::segment::{Segment, SegmentState};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server did not return partial content, got {0}")]
    NotPartialContent(StatusCode),
    #[error("response length {declared:?} does not match requested segment length {expected}")]
    RangeMismatch { expected: u64, declared: Option<u64> },
    #[error("stream ended after {received} of {expected} bytes")]
    ShortRead { expected: u64, received: u64 },
    #[error("file write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Fetches a single byte-range segment and streams it into its slot of the
/// destination file.
pub struct SegmentFetcher {
    client: Client,
    url: String,
}

impl SegmentFetcher {
    pub fn new(client: Client, url: &str) -> Self {
        SegmentFetcher {
            client,
            url: url.to_string(),
        }
    }

    /// Downloads `[segment.start, segment.end)` and writes it through `file`,
    /// which must already be positioned at `segment.start`.
    ///
    /// Progress is reported chunk by chunk to `progress` under the segment's
    /// label. Mutates only this segment's bytes of the file; never touches
    /// other segments' state. No retries; a failed segment just fails.
    pub async fn fetch(
        &self,
        segment: &Segment,
        mut file: File,
        progress: &dyn ProgressReporter,
    ) -> Result<(), FetchError> {
        let expected = segment.len();
        segment.set_state(SegmentState::Running);
        progress.segment_started(&segment.label(), expected);

        // Zero-length segments exist when count > total_size; they complete
        // without issuing a request.
        if segment.is_empty() {
            segment.set_state(SegmentState::Completed);
            progress.segment_finished(&segment.label());
            return Ok(());
        }

        // The header uses inclusive offsets, the segment is half-open.
        let range_header = format!("bytes={}-{}", segment.start(), segment.end() - 1);
        let mut response = self
            .client
            .get(&self.url)
            .header(header::RANGE, range_header)
            .send()
            .await?;

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(FetchError::NotPartialContent(response.status()));
        }

        let declared = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|val| val.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        if declared != Some(expected) {
            return Err(FetchError::RangeMismatch { expected, declared });
        }

        let mut received: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            received += chunk.len() as u64;
            if received > expected {
                return Err(FetchError::RangeMismatch {
                    expected,
                    declared: Some(received),
                });
            }
            file.write_all(&chunk).await?;
            segment.add_bytes(chunk.len() as u64);
            progress.segment_advanced(&segment.label(), chunk.len() as u64);
        }
        file.flush().await?;

        if received < expected {
            return Err(FetchError::ShortRead { expected, received });
        }

        debug!(segment = segment.index(), bytes = received, "segment complete");
        segment.set_state(SegmentState::Completed);
        progress.segment_finished(&segment.label());
        Ok(())
    }
}
