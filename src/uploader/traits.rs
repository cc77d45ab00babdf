// Capability traits for the pipeline stages
//
// The orchestrator only sees these seams, so any stage can be swapped or
// stubbed independently of the HTTP clients behind the real implementations.

use async_trait::async_trait;
use time::Date;

use super::errors::UploadError;
use super::models::{AccessToken, QuotaRecord, UploadKind, VideoAsset, VideoMetadata};

/// Source of short-lived bearer tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken, UploadError>;
}

/// Registers a video's metadata ahead of the binary upload.
///
/// `Ok(None)` means the platform rejected the submission; the rejection has
/// already been logged and the caller should skip the rest of the run.
#[async_trait]
pub trait SubmitMetadata: Send + Sync {
    async fn submit(&self, metadata: &VideoMetadata) -> Result<Option<String>, UploadError>;
}

/// Streams the binary payload via the resumable protocol.
///
/// `video_id` correlates the transfer with an already-created video
/// resource when the two-step protocol is in use.
#[async_trait]
pub trait TransferVideo: Send + Sync {
    async fn upload(
        &self,
        asset: &VideoAsset,
        video_id: Option<&str>,
    ) -> Result<String, UploadError>;
}

/// Persisted per-day upload counters. Callers pass the day they are acting
/// on so one run makes every decision against a single instant.
pub trait QuotaStore: Send + Sync {
    /// Record for `today`, rolling over stale dates to a zeroed record
    fn check_upload_limit(&self, today: Date) -> Result<QuotaRecord, UploadError>;

    /// Record one successful upload of `kind` and persist the full record
    fn log_upload(&self, kind: UploadKind, today: Date) -> Result<QuotaRecord, UploadError>;
}
