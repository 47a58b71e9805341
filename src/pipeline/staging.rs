//! Filesystem lifecycle: per-job staging directories and the single
//! published asset.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// File name of the published asset inside the publish directory.
pub const PUBLISHED_NAME: &str = "temp.mp4";

/// Remove any previously published assets. Individual delete failures are
/// logged and skipped.
pub async fn clear_published(publish_dir: &Path) -> io::Result<()> {
    tokio::fs::create_dir_all(publish_dir).await?;

    let mut entries = tokio::fs::read_dir(publish_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("mp4")) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!(path = %path.display(), "removed published asset"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove asset"),
            }
        }
    }
    Ok(())
}

/// Publish `artifact` as the current asset: copy into the publish
/// directory under a scratch name, then atomically rename into place so a
/// concurrent poller never observes a missing or partial file.
pub async fn publish(artifact: &Path, publish_dir: &Path) -> io::Result<PathBuf> {
    clear_published(publish_dir).await?;

    let scratch = publish_dir.join(".incoming.mp4.partial");
    let target = publish_dir.join(PUBLISHED_NAME);

    tokio::fs::copy(artifact, &scratch).await?;
    tokio::fs::rename(&scratch, &target).await?;

    info!(from = %artifact.display(), to = %target.display(), "published video");
    Ok(target)
}

/// Delete a job's staging directory once an overall attempt resolves.
/// Best-effort: a leftover directory is not worth failing the job over.
pub async fn remove_job_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(dir = %dir.display(), "removed staging directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "failed to remove staging directory"),
    }
}
