use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// A file written by `AudioStore::save`.
#[derive(Debug, Clone)]
pub struct StoredAudio {
    pub filename: String,
    pub path: PathBuf,
    pub size: i64,
    pub timestamp: String,
}

/// Generated audio kept on local disk.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub async fn save(
        &self,
        user_id: i64,
        voice: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredAudio, AppError> {
        self.ensure_dir().await?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let filename = format!(
            "tonecast_{}_{}_{}_{}.{}",
            user_id,
            sanitize(voice),
            timestamp,
            &suffix[..8],
            extension
        );
        let path = self.dir.join(&filename);

        tokio::fs::write(&path, bytes).await?;
        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());

        Ok(StoredAudio {
            filename,
            path,
            size: bytes.len() as i64,
            timestamp,
        })
    }

    /// Path of a stored file by bare name; names that could leave the directory are refused.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let is_bare = !filename.is_empty()
            && !filename.starts_with('.')
            && !filename.contains(['/', '\\'])
            && Path::new(filename).file_name() == Some(std::ffi::OsStr::new(filename));
        is_bare.then(|| self.dir.join(filename))
    }

    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, AppError> {
        match tokio::fs::read(path.as_ref()).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound("Audio file not found".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file; a file that is already gone counts as removed.
    pub async fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Total bytes of the files in the store.
    pub async fn usage_bytes(&self) -> Result<u64, AppError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                total += metadata.len();
            }
        }
        Ok(total)
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}
