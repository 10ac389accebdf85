//! Local storage for fetched media.

use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use tokio::fs;
use tracing::trace;

/// Where fetched media is checked for and written to.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Reports whether a file exists at `path`.
    ///
    /// Absence is `Ok(false)`; any other failure to find out is an error.
    async fn exists(&self, path: &Path) -> std::io::Result<bool>;

    /// Writes `bytes` to `path`, replacing any previous content.
    async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()>;
}

/// [`MediaStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDisk;

#[async_trait]
impl MediaStore for LocalDisk {
    async fn exists(&self, path: &Path) -> std::io::Result<bool> {
        match fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, bytes).await?;
        trace!(path = %path.display(), bytes = bytes.len(), "media written");
        Ok(())
    }
}
