// Common data models for the upload pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::{Date, Duration, OffsetDateTime};

use super::errors::UploadError;

/// Category of content, keyed to its daily quota counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadKind {
    /// Regular long-form video (5-10 minutes)
    LongVideo,
    /// Vertical short-form video (under 60 seconds)
    Shorts,
}

impl UploadKind {
    /// Counter key as stored in the quota file
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongVideo => "long_videos",
            Self::Shorts => "shorts",
        }
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongVideo => write!(f, "long video"),
            Self::Shorts => write!(f, "short"),
        }
    }
}

/// Privacy setting accepted by the videos endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    Public,
    Private,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Unlisted => "unlisted",
        }
    }

    /// Parse a privacy string, substituting "public" for anything the
    /// platform would reject. Unknown values are logged, not fatal.
    pub fn parse_or_public(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "public" => Self::Public,
            "private" => Self::Private,
            "unlisted" => Self::Unlisted,
            other => {
                tracing::warn!(
                    target: "uploader::models",
                    "unknown privacy status {:?}, defaulting to public",
                    other
                );
                Self::Public
            }
        }
    }
}

/// Video metadata submitted ahead of the binary upload.
///
/// Constructed from whatever generated the content (CLI arguments here);
/// validated before any network call.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
    pub category_id: u32,
    pub privacy: PrivacyStatus,
}

impl VideoMetadata {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category_id: u32,
        privacy: PrivacyStatus,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            category_id,
            privacy,
        }
    }

    /// Field checks mirroring the platform's limits: title 1-100 chars,
    /// description up to 5000 chars, category identifier positive.
    pub fn validate(&self) -> Result<(), UploadError> {
        let title_len = self.title.chars().count();
        if title_len == 0 {
            return Err(UploadError::Validation("title is empty".to_string()));
        }
        if title_len > 100 {
            return Err(UploadError::Validation(format!(
                "title is {} chars, limit is 100",
                title_len
            )));
        }
        let description_len = self.description.chars().count();
        if description_len > 5000 {
            return Err(UploadError::Validation(format!(
                "description is {} chars, limit is 5000",
                description_len
            )));
        }
        if self.category_id == 0 {
            return Err(UploadError::Validation(
                "category id must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Append the #Shorts tag when missing, keeping the title within limits
    pub fn tag_for_shorts(&mut self) {
        if self.title.to_lowercase().contains("#shorts") {
            return;
        }
        let tagged = format!("{} #Shorts", self.title.trim());
        if tagged.chars().count() <= 100 {
            self.title = tagged;
        }
    }
}

/// Local video file ready for streaming. The orchestrator only opens it
/// for reading; it never deletes or moves the asset.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: String,
}

impl VideoAsset {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path)
            .map_err(|e| UploadError::Io(format!("{}: {}", path.display(), e)))?;
        if meta.len() == 0 {
            return Err(UploadError::Validation(format!(
                "{} is empty",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
            mime_type: "video/mp4".to_string(),
        })
    }
}

/// Short-lived bearer token from the OAuth refresh exchange
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl AccessToken {
    /// Whether the token is still usable at `now`, with a safety margin
    /// so it does not expire mid-request.
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.expires_at - now > Duration::seconds(60)
    }
}

/// Per-day upload counters. At most one record is authoritative at a time,
/// keyed by the current UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRecord {
    pub date: Date,
    pub long_videos: u32,
    pub shorts: u32,
}

impl QuotaRecord {
    pub fn fresh(date: Date) -> Self {
        Self {
            date,
            long_videos: 0,
            shorts: 0,
        }
    }

    pub fn count(&self, kind: UploadKind) -> u32 {
        match kind {
            UploadKind::LongVideo => self.long_videos,
            UploadKind::Shorts => self.shorts,
        }
    }

    pub fn increment(&mut self, kind: UploadKind) {
        match kind {
            UploadKind::LongVideo => self.long_videos += 1,
            UploadKind::Shorts => self.shorts += 1,
        }
    }
}

/// Transfer progress for one chunk of the resumable upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    pub fn percent(&self) -> f32 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.bytes_sent as f64 / self.total_bytes as f64 * 100.0) as f32
    }
}

/// Network configuration shared by every outbound client
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// SOCKS5/HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Timeout in seconds applied to every outbound call
    pub timeout: Option<u32>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Some(15),
        }
    }
}
