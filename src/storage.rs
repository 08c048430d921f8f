// Subtitle storage - saves successful extractions under the bucket
//
// Two objects per save:
// - subtitles/<id>_<stamp>.txt   normalized text
// - metadata/<id>_<stamp>.json   SubtitleMetadata
//
// The local store maps the bucket onto a directory.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::subtitles::errors::ExtractError;
use crate::subtitles::models::SubtitleMetadata;

/// Where a saved subtitle ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredSubtitle {
    pub url: String,
    pub subtitle_key: String,
    pub metadata_key: String,
}

#[async_trait]
pub trait SubtitleStore: Send + Sync {
    async fn save(
        &self,
        video_id: &str,
        text: &str,
        metadata: &SubtitleMetadata,
    ) -> Result<StoredSubtitle, ExtractError>;
}

/// Object keys for one saved subtitle
pub fn object_keys(video_id: &str, stamp: &str) -> (String, String) {
    (
        format!("subtitles/{}_{}.txt", video_id, stamp),
        format!("metadata/{}_{}.json", video_id, stamp),
    )
}

pub struct LocalStore {
    bucket_dir: PathBuf,
}

impl LocalStore {
    pub fn new(bucket_dir: impl Into<PathBuf>) -> Self {
        Self {
            bucket_dir: bucket_dir.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.bucket_dir())
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    async fn put(&self, key: &str, body: &[u8]) -> Result<PathBuf, ExtractError> {
        let path = self.bucket_dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ExtractError::Storage(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| ExtractError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;
        Ok(path)
    }
}

#[async_trait]
impl SubtitleStore for LocalStore {
    async fn save(
        &self,
        video_id: &str,
        text: &str,
        metadata: &SubtitleMetadata,
    ) -> Result<StoredSubtitle, ExtractError> {
        let (subtitle_key, metadata_key) = object_keys(video_id, &crate::utc_stamp());

        let subtitle_path = self.put(&subtitle_key, text.as_bytes()).await?;
        let metadata_json = serde_json::to_vec_pretty(metadata)
            .map_err(|e| ExtractError::Storage(format!("Failed to encode metadata: {}", e)))?;
        self.put(&metadata_key, &metadata_json).await?;

        let url = format!("file://{}", subtitle_path.display());
        log::info!("[Storage] Saved {}", url);

        Ok(StoredSubtitle {
            url,
            subtitle_key,
            metadata_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::models::SubtitleFormat;

    fn metadata() -> SubtitleMetadata {
        SubtitleMetadata {
            video_id: "abc".to_string(),
            title: "Video_abc".to_string(),
            language: "Korean".to_string(),
            language_code: "ko".to_string(),
            format: SubtitleFormat::Vtt,
            method: "yt-dlp-listed".to_string(),
            success: true,
            saved_at: "2024-05-01T12:30:00Z".to_string(),
        }
    }

    #[test]
    fn test_object_keys() {
        let (sub, meta) = object_keys("abc", "20240501_123000");
        assert_eq!(sub, "subtitles/abc_20240501_123000.txt");
        assert_eq!(meta, "metadata/abc_20240501_123000.json");
    }

    #[tokio::test]
    async fn test_local_store_writes_both_objects() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("rubberdog-subtitles"));

        let stored = store.save("abc", "[0:00] hi", &metadata()).await.unwrap();
        assert!(stored.url.starts_with("file://"));

        let text = std::fs::read_to_string(store.bucket_dir().join(&stored.subtitle_key)).unwrap();
        assert_eq!(text, "[0:00] hi");

        let meta: serde_json::Value = serde_json::from_slice(
            &std::fs::read(store.bucket_dir().join(&stored.metadata_key)).unwrap(),
        )
        .unwrap();
        assert_eq!(meta["language_code"], "ko");
        assert_eq!(meta["format"], "vtt");
    }

    #[tokio::test]
    async fn test_unwritable_bucket_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // bucket path below a regular file cannot be created
        let store = LocalStore::new(blocker.join("bucket"));

        let err = store.save("abc", "text", &metadata()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Storage(_)));
    }
}
