use crate::session::SessionClient;
use chrono::{
    DateTime,
    Utc,
};
use eyre::{
    Context as _,
    Result,
};
use std::path::{
    Path,
    PathBuf,
};

const SNAPSHOT_EXTENSION: &str = "png";

/// Keeps the most recent screenshots taken on failures.
///
/// Files are named after their capture time in UTC (`2025-01-31_13-05-59.png`),
/// so sorting by name sorts chronologically even across daylight saving changes.
#[derive(Debug, Clone)]
pub struct PageSnapshotter {
    directory: PathBuf,
    max_history: usize,
}

impl PageSnapshotter {
    pub fn new(directory: impl Into<PathBuf>, max_history: usize) -> Self {
        Self {
            directory: directory.into(),
            max_history,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn capture(&self, client: &impl SessionClient) -> Result<PathBuf> {
        self.capture_at(client, Utc::now()).await
    }

    pub async fn capture_at(&self, client: &impl SessionClient, timestamp: DateTime<Utc>) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .wrap_err_with(|| format!("failed to create snapshot directory {:?}", self.directory))?;

        let image = client
            .capture_diagnostic()
            .await
            .context("failed to capture the page")?;

        let path = self.directory.join(format!(
            "{}.{SNAPSHOT_EXTENSION}",
            timestamp.format("%Y-%m-%d_%H-%M-%S")
        ));
        tokio::fs::write(&path, image)
            .await
            .wrap_err_with(|| format!("failed to write snapshot {path:?}"))?;

        self.evict().await?;

        Ok(path)
    }

    /// All snapshots currently on disk, oldest first.
    pub async fn snapshots(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .wrap_err_with(|| format!("failed to list {:?}", self.directory))?;

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == SNAPSHOT_EXTENSION) {
                snapshots.push(path);
            }
        }
        snapshots.sort();
        Ok(snapshots)
    }

    async fn evict(&self) -> Result<()> {
        let snapshots = self.snapshots().await?;
        let surplus = snapshots.len().saturating_sub(self.max_history);
        for old in &snapshots[..surplus] {
            debug!(path = ?old, "removing old snapshot");
            tokio::fs::remove_file(old)
                .await
                .wrap_err_with(|| format!("failed to remove old snapshot {old:?}"))?;
        }
        Ok(())
    }
}
