// Uploader module - upload orchestration abstraction layer

pub mod auth;
pub mod config;
pub mod errors;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod quota;
pub mod traits;
pub mod upload;

pub use auth::TokenProvider;
pub use config::{Endpoints, OauthCredential, UploaderConfig};
pub use errors::UploadError;
pub use metadata::MetadataClient;
pub use models::{
    AccessToken, NetworkConfig, PrivacyStatus, QuotaRecord, UploadKind, UploadProgress,
    VideoAsset, VideoMetadata,
};
pub use orchestrator::{upload_window, RunOutcome, UploadOrchestrator};
pub use quota::{QuotaFile, UploadSlot};
pub use traits::{QuotaStore, SubmitMetadata, TokenSource, TransferVideo};
pub use upload::ResumableUploadClient;
