//! Read-time resolution of stored video references.

use std::sync::Arc;
use tubely_core::models::{AccessMode, AccessUrl, ObjectReference, Video, VideoResponse};
use tubely_storage::{Storage, StorageResult};

/// Turns a persisted `(bucket, key)` into a URL according to the deployment's
/// single access mode. Presigned URLs are minted here on every read and never stored.
#[derive(Clone)]
pub struct VideoUrlResolver {
    storage: Arc<dyn Storage>,
    mode: AccessMode,
}

impl VideoUrlResolver {
    pub fn new(storage: Arc<dyn Storage>, mode: AccessMode) -> Self {
        Self { storage, mode }
    }

    pub fn mode(&self) -> &AccessMode {
        &self.mode
    }

    pub async fn resolve(&self, reference: &ObjectReference) -> StorageResult<AccessUrl> {
        match &self.mode {
            AccessMode::Presigned { ttl } => {
                self.storage
                    .presign(&reference.bucket, &reference.key, *ttl)
                    .await
            }
            AccessMode::Direct => Ok(AccessUrl::permanent(
                self.storage.public_url(&reference.bucket, &reference.key),
            )),
            AccessMode::Cdn { base_url } => Ok(AccessUrl::permanent(format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                reference.key
            ))),
        }
    }

    /// Render a record for clients. Records without a video get no URL.
    pub async fn to_response(&self, video: Video) -> StorageResult<VideoResponse> {
        let access = match &video.video {
            Some(reference) => Some(self.resolve(reference).await?),
            None => None,
        };
        Ok(VideoResponse::new(video, access))
    }
}
