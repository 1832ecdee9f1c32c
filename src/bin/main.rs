// Rangeload - src/bin/main.rs
//
// CLI entry point: parses arguments and hands them to the DownloadManager.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;

use rangeload::{ConsoleProgress, DownloadManager, NoProgress, ProgressReporter};

/// Concurrent range downloader: fetches a file in parallel byte-range segments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the file to download.
    url: String,

    /// Optional output file name; defaults to the last URL path component.
    #[arg(short, long)]
    output: Option<String>,

    /// Directory to download into.
    #[arg(short, long, default_value = ".")]
    destination: String,

    /// Number of concurrent segments.
    #[arg(short, long, default_value_t = 4)]
    connections: u64,

    /// Disable the per-segment progress display.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let progress: Arc<dyn ProgressReporter> = if args.quiet {
        Arc::new(NoProgress)
    } else {
        Arc::new(ConsoleProgress::new())
    };

    let manager = DownloadManager::new(&args.destination).with_progress(progress);
    let job = match manager
        .download_and_wait(&args.url, args.output.as_deref(), args.connections)
        .await
    {
        Ok(job) => job,
        Err(error) => {
            eprintln!("download failed: {error}");
            return ExitCode::FAILURE;
        }
    };

    if job.succeeded() {
        println!(
            "downloaded {} ({} bytes) to {}",
            job.url(),
            job.total_size(),
            job.path().display()
        );
        ExitCode::SUCCESS
    } else {
        for (index, message) in job.failures() {
            eprintln!("segment {index} failed: {message}");
        }
        eprintln!(
            "{} holds the completed ranges; failed ranges remain zero-filled",
            job.path().display()
        );
        ExitCode::FAILURE
    }
}
