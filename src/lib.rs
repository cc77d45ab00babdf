pub mod cli;
pub mod uploader;

pub use uploader::{RunOutcome, UploadError, UploadOrchestrator, UploaderConfig};
