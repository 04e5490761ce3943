//! Access-URL policy for stored videos.
//!
//! The persisted reference is always a `(bucket, key)` pair. How that pair becomes a
//! URL is decided at read time by the single `AccessMode` active for the deployment,
//! so a presigned URL is never written to the metadata store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

/// How stored video references are turned into URLs for clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessMode {
    /// Time-limited signed GET URL minted on every read.
    Presigned { ttl: Duration },
    /// The store's own stable URL for the object.
    Direct,
    /// `{base_url}/{key}` behind a CDN distribution.
    Cdn { base_url: String },
}

impl AccessMode {
    pub fn name(&self) -> &'static str {
        match self {
            AccessMode::Presigned { .. } => "presigned",
            AccessMode::Direct => "direct",
            AccessMode::Cdn { .. } => "cdn",
        }
    }
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// A URL a client can dereference right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessUrl {
    pub url: String,
    /// Set only for presigned URLs.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessUrl {
    pub fn permanent(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires_at: None,
        }
    }

    pub fn expiring(url: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            expires_at: Some(expires_at),
        }
    }
}
