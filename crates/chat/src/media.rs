//! Media store collaborator.
//!
//! Uploaded attachments are handed off as raw bytes with a declared MIME kind
//! and come back as a stable URL the message record can carry.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use campus_config::MediaConfig;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to persist media: {0}")]
    Io(#[from] std::io::Error),
}

/// External collaborator that resolves raw attachment bytes into a URL
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(&self, data: Bytes, mime: &str) -> Result<String, MediaError>;
}

/// Filesystem-backed media store serving files beneath a configured base URL
pub struct LocalMediaStore {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(&self, data: Bytes, mime: &str) -> Result<String, MediaError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = format!("{}.{}", cuid2::cuid(), extension_for(mime));
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, &data).await?;

        info!(path = %path.display(), mime = mime, size = data.len(), "stored media attachment");

        Ok(format!("{}/{}", self.base_url, file_name))
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "audio/wav" => "wav",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn stores_bytes_and_returns_url() {
        let dir = TempDir::new().unwrap();
        let config = MediaConfig {
            root_dir: dir.path().to_string_lossy().into_owned(),
            base_url: "/media/".to_string(),
        };

        let store = LocalMediaStore::new(&config);
        let url = store
            .store(Bytes::from_static(b"fake png bytes"), "image/png")
            .await
            .unwrap();

        assert!(url.starts_with("/media/"));
        assert!(url.ends_with(".png"));

        let file_name = url.rsplit('/').next().unwrap();
        let written = tokio::fs::read(dir.path().join(file_name)).await.unwrap();
        assert_eq!(written, b"fake png bytes");
    }

    #[test]
    fn unknown_mime_falls_back_to_bin() {
        assert_eq!(extension_for("application/octet-stream"), "bin");
        assert_eq!(extension_for("image/png"), "png");
    }
}
