//! Shared key generation for storage backends.
//!
//! Key format: `{orientation}/{random}.mp4`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use tubely_core::constants::{STORAGE_KEY_RANDOM_BYTES, VIDEO_EXTENSION};
use tubely_core::models::Orientation;

use crate::traits::{StorageError, StorageResult};

/// Random, collision-resistant object name: 32 bytes from the thread-local CSPRNG,
/// URL-safe base64 without padding.
pub fn random_object_name() -> String {
    let mut bytes = [0u8; STORAGE_KEY_RANDOM_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate the storage key for a video with the given orientation.
pub fn generate_video_key(orientation: Orientation) -> String {
    format!(
        "{}/{}.{}",
        orientation.as_str(),
        random_object_name(),
        VIDEO_EXTENSION
    )
}

/// Reject keys that could escape a bucket root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_object_name_is_url_safe() {
        let name = random_object_name();
        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(name.len(), 43);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_random_object_names_differ() {
        assert_ne!(random_object_name(), random_object_name());
    }

    #[test]
    fn test_generate_video_key_layout() {
        let key = generate_video_key(Orientation::Landscape);
        assert!(key.starts_with("landscape/"));
        assert!(key.ends_with(".mp4"));
        assert!(validate_key(&key).is_ok());

        assert!(generate_video_key(Orientation::Other).starts_with("other/"));
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs/key").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("portrait/ok.mp4").is_ok());
    }
}
