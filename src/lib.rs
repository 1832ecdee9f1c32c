// Rangeload - lib.rs
//
// A concurrent range-download manager: one remote file, split into byte-range
// segments, each fetched by its own task and written at its final offset in a
// pre-allocated destination file.

pub mod discovery;
pub mod fetcher;
pub mod manager;
pub mod planner;
pub mod progress;
pub mod segment;
pub mod storage;

pub use fetcher::{FetchError, SegmentFetcher};
pub use manager::{DownloadJob, DownloadManager, ManagerError};
pub use planner::PlanError;
pub use progress::{ConsoleProgress, NoProgress, ProgressReporter};
pub use segment::{Segment, SegmentState};
