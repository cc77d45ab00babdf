// Upload orchestrator - decides whether now is an upload window, checks
// the daily quota, then sequences metadata submission, binary transfer,
// and quota logging. Failures in any stage end the run cleanly; nothing
// is retried until the scheduler starts the next run.

use time::OffsetDateTime;

use super::config::UploaderConfig;
use super::errors::UploadError;
use super::models::{UploadKind, VideoAsset, VideoMetadata};
use super::quota::UploadSlot;
use super::traits::{QuotaStore, SubmitMetadata, TransferVideo};

/// Terminal state of one orchestration run
#[derive(Debug)]
pub enum RunOutcome {
    /// Both phases succeeded and the quota was logged
    Uploaded { video_id: String, kind: UploadKind },
    /// Current hour is outside every upload window - not an error
    NoEligibleWindow,
    /// Today's cap for the eligible category is already reached - not an error
    QuotaExhausted(UploadKind),
    /// The platform rejected the metadata; the binary phase never ran
    MetadataRejected,
    /// A downstream stage failed; the run stopped there
    Aborted(UploadError),
}

impl RunOutcome {
    /// Skipped and completed runs exit zero; aborted runs exit nonzero
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Uploaded { .. } | Self::NoEligibleWindow | Self::QuotaExhausted(_) => 0,
            Self::MetadataRejected | Self::Aborted(_) => 1,
        }
    }
}

/// Category eligible for upload at the given UTC hour: 07-09 long-form,
/// 11-15 shorts, anything else no window.
pub fn upload_window(hour: u8) -> Option<UploadKind> {
    match hour {
        7..=9 => Some(UploadKind::LongVideo),
        11..=15 => Some(UploadKind::Shorts),
        _ => None,
    }
}

pub struct UploadOrchestrator {
    quota: Box<dyn QuotaStore>,
    metadata: Box<dyn SubmitMetadata>,
    transfer: Box<dyn TransferVideo>,
    config: UploaderConfig,
}

impl UploadOrchestrator {
    pub fn new(
        quota: Box<dyn QuotaStore>,
        metadata: Box<dyn SubmitMetadata>,
        transfer: Box<dyn TransferVideo>,
        config: UploaderConfig,
    ) -> Self {
        Self {
            quota,
            metadata,
            transfer,
            config,
        }
    }

    pub async fn run(&self, metadata: &VideoMetadata) -> RunOutcome {
        self.run_at(OffsetDateTime::now_utc(), metadata).await
    }

    /// One full decision tree at a fixed instant. Clock injection keeps the
    /// window and rollover logic testable.
    pub async fn run_at(&self, now: OffsetDateTime, metadata: &VideoMetadata) -> RunOutcome {
        let Some(kind) = upload_window(now.hour()) else {
            tracing::info!(
                target: "uploader::orchestrator",
                "hour {} UTC is outside every upload window, nothing to do",
                now.hour()
            );
            return RunOutcome::NoEligibleWindow;
        };

        // Serializes same-kind runs from the cap check through quota
        // logging; without it two overlapping runs would both see a free
        // slot and upload twice. Released when the guard drops at the end
        // of the run.
        let _slot = match UploadSlot::acquire(&self.config.quota_path, kind).await {
            Ok(slot) => slot,
            Err(e) => {
                tracing::error!(target: "uploader::orchestrator", "cannot lock upload slot: {}", e);
                return RunOutcome::Aborted(e);
            }
        };

        let record = match self.quota.check_upload_limit(now.date()) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(target: "uploader::orchestrator", "quota check failed: {}", e);
                return RunOutcome::Aborted(e);
            }
        };

        let max = self.config.max_for(kind);
        if record.count(kind) >= max {
            tracing::info!(
                target: "uploader::orchestrator",
                "daily limit reached for {} ({}/{}), skipping",
                kind.as_str(),
                record.count(kind),
                max
            );
            return RunOutcome::QuotaExhausted(kind);
        }

        let asset = match VideoAsset::from_path(self.config.asset_path(kind)) {
            Ok(asset) => asset,
            Err(e) => {
                tracing::error!(target: "uploader::orchestrator", "cannot read asset: {}", e);
                return RunOutcome::Aborted(e);
            }
        };

        let mut metadata = metadata.clone();
        if kind == UploadKind::Shorts {
            metadata.tag_for_shorts();
        }

        tracing::info!(
            target: "uploader::orchestrator",
            "uploading a {} ({:?})",
            kind,
            metadata.title
        );

        let video_id = match self.metadata.submit(&metadata).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::warn!(
                    target: "uploader::orchestrator",
                    "metadata rejected, skipping binary upload"
                );
                return RunOutcome::MetadataRejected;
            }
            Err(e) => {
                tracing::error!(target: "uploader::orchestrator", "metadata step failed: {}", e);
                return RunOutcome::Aborted(e);
            }
        };

        let video_id = match self.transfer.upload(&asset, Some(&video_id)).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(target: "uploader::orchestrator", "binary upload failed: {}", e);
                return RunOutcome::Aborted(e);
            }
        };

        // The video exists on the platform at this point, so a failure to
        // record it must not turn the run into a retry that uploads twice.
        if let Err(e) = self.quota.log_upload(kind, now.date()) {
            tracing::error!(
                target: "uploader::orchestrator",
                "upload succeeded but quota logging failed: {}",
                e
            );
        }

        tracing::info!(
            target: "uploader::orchestrator",
            "uploaded {} as video {}",
            kind,
            video_id
        );
        RunOutcome::Uploaded { video_id, kind }
    }
}
