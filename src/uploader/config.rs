// Process-wide configuration, built once at startup and passed by reference

use std::path::PathBuf;
use std::time::Duration;

use super::errors::UploadError;
use super::models::{NetworkConfig, UploadKind};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const METADATA_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";

/// OAuth client credentials plus the long-lived refresh token.
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct OauthCredential {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// API endpoints, overridable for testing against a local server
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub token_url: String,
    pub metadata_url: String,
    pub upload_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_url: TOKEN_URL.to_string(),
            metadata_url: METADATA_URL.to_string(),
            upload_url: UPLOAD_URL.to_string(),
        }
    }
}

/// Configuration for one uploader run
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub credential: OauthCredential,
    pub endpoints: Endpoints,
    /// Persisted daily upload counters
    pub quota_path: PathBuf,
    /// Asset played during the long-form window
    pub long_video_file: PathBuf,
    /// Asset played during the shorts window
    pub shorts_file: PathBuf,
    pub max_long_uploads: u32,
    pub max_shorts_uploads: u32,
    pub network: NetworkConfig,
}

impl UploaderConfig {
    pub fn new(credential: OauthCredential) -> Self {
        Self {
            credential,
            endpoints: Endpoints::default(),
            quota_path: default_quota_path(),
            long_video_file: PathBuf::from("long_video.mp4"),
            shorts_file: PathBuf::from("short_video.mp4"),
            max_long_uploads: 1,
            max_shorts_uploads: 1,
            network: NetworkConfig::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_quota_path(mut self, path: PathBuf) -> Self {
        self.quota_path = path;
        self
    }

    pub fn with_long_video_file(mut self, path: PathBuf) -> Self {
        self.long_video_file = path;
        self
    }

    pub fn with_shorts_file(mut self, path: PathBuf) -> Self {
        self.shorts_file = path;
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    /// Daily cap for a category
    pub fn max_for(&self, kind: UploadKind) -> u32 {
        match kind {
            UploadKind::LongVideo => self.max_long_uploads,
            UploadKind::Shorts => self.max_shorts_uploads,
        }
    }

    /// Asset to stream for a category
    pub fn asset_path(&self, kind: UploadKind) -> &PathBuf {
        match kind {
            UploadKind::LongVideo => &self.long_video_file,
            UploadKind::Shorts => &self.shorts_file,
        }
    }

    /// Shared HTTP client with the uniform timeout and optional proxy
    pub fn http_client(&self) -> Result<reqwest::Client, UploadError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.network.timeout.unwrap_or(15) as u64));

        if let Some(proxy_url) = self.network.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| UploadError::Network(format!("invalid proxy {}: {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| UploadError::Network(format!("failed to build HTTP client: {}", e)))
    }
}

/// Default location for the quota file: the user data dir when available,
/// the working directory otherwise.
fn default_quota_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("youtube-uploader").join("upload_log.json"))
        .unwrap_or_else(|| PathBuf::from("upload_log.json"))
}
