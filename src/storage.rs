use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncSeekExt;

/// Creates the destination file at its full final size before any segment
/// writes. With the file pre-sized, every positioned write is valid no matter
/// which segment finishes first.
pub async fn preallocate(path: &Path, total_size: u64) -> Result<(), std::io::Error> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await?;
    file.set_len(total_size).await?;
    file.sync_all().await?;
    Ok(())
}

/// Opens an independent write handle positioned at `offset`.
///
/// Each fetch task gets its own handle so no task depends on a shared file
/// cursor; segments write disjoint ranges.
pub async fn open_segment_writer(
    path: &Path,
    offset: u64,
) -> Result<tokio::fs::File, std::io::Error> {
    let mut file = OpenOptions::new().write(true).open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    Ok(file)
}
