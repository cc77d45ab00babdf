// Resumable upload client - two-phase binary transfer
//
// Phase 1 initializes a session (POST with uploadType=resumable) and gets
// the session URL from the Location header. Phase 2 PUTs the payload in
// fixed-size chunks with Content-Range headers; a 308 response acknowledges
// received bytes and the next chunk continues from the acknowledged offset.

use async_trait::async_trait;
use regex::Regex;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::errors::UploadError;
use super::models::{UploadProgress, VideoAsset};
use super::traits::{TokenSource, TransferVideo};

const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

#[derive(serde::Deserialize)]
struct UploadConfirmation {
    id: Option<String>,
}

pub struct ResumableUploadClient {
    client: reqwest::Client,
    endpoint: String,
    token: Arc<dyn TokenSource>,
    chunk_size: u64,
}

impl ResumableUploadClient {
    pub fn new(client: reqwest::Client, endpoint: String, token: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            endpoint,
            token,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Open the upload session. The session URL arrives in the Location
    /// header; without it there is nothing to resume, so the attempt fails.
    async fn initiate(&self, asset: &VideoAsset) -> Result<String, UploadError> {
        let access = self.token.access_token().await?;

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(&access.token)
            .header("X-Upload-Content-Type", &asset.mime_type)
            .header("X-Upload-Content-Length", asset.size.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::RemoteRejection {
                status: status.as_u16(),
                body,
            });
        }

        match response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
        {
            Some(url) => Ok(url.to_string()),
            None => Err(UploadError::Network(
                "upload session response carried no Location header".to_string(),
            )),
        }
    }

    /// Stream the payload to the session URL chunk by chunk. Intermediate
    /// chunks are acknowledged with 308; the final chunk returns the video
    /// resource JSON.
    async fn transfer(
        &self,
        session_url: &str,
        asset: &VideoAsset,
    ) -> Result<Option<String>, UploadError> {
        let mut file = File::open(&asset.path)
            .await
            .map_err(|e| UploadError::Io(format!("{}: {}", asset.path.display(), e)))?;

        let total = asset.size;
        let mut offset: u64 = 0;

        while offset < total {
            let end = (offset + self.chunk_size).min(total) - 1;
            let len = end - offset + 1;

            file.seek(std::io::SeekFrom::Start(offset)).await?;
            let mut chunk = vec![0u8; len as usize];
            file.read_exact(&mut chunk).await?;

            // Fetched per chunk: a transfer can outlive the token's
            // lifetime, and the source refreshes transparently near expiry.
            let access = self.token.access_token().await?;

            let response = self
                .client
                .put(session_url)
                .bearer_auth(&access.token)
                .header(reqwest::header::CONTENT_TYPE, &asset.mime_type)
                .header(
                    reqwest::header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", offset, end, total),
                )
                .body(chunk)
                .send()
                .await?;

            let status = response.status().as_u16();
            match status {
                // 308 Resume Incomplete: the Range header tells us how far
                // the server actually got; trust it over our own accounting.
                308 => {
                    let acked = response
                        .headers()
                        .get(reqwest::header::RANGE)
                        .and_then(|v| v.to_str().ok())
                        .and_then(acked_offset);
                    offset = match acked {
                        Some(last_byte) => last_byte + 1,
                        None => end + 1,
                    };
                    let progress = UploadProgress {
                        bytes_sent: offset,
                        total_bytes: total,
                    };
                    tracing::debug!(
                        target: "uploader::upload",
                        "chunk acknowledged, {}/{} bytes ({:.1}%)",
                        progress.bytes_sent,
                        progress.total_bytes,
                        progress.percent()
                    );
                }
                200 | 201 => {
                    let text = response.text().await?;
                    let confirmation: UploadConfirmation =
                        serde_json::from_str(&text).unwrap_or(UploadConfirmation { id: None });
                    tracing::info!(
                        target: "uploader::upload",
                        "transfer complete, {} bytes",
                        total
                    );
                    return Ok(confirmation.id);
                }
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(UploadError::RemoteRejection { status, body });
                }
            }
        }

        // Every byte acknowledged but no completion response seen
        Err(UploadError::Network(
            "upload session ended without a completion response".to_string(),
        ))
    }
}

#[async_trait]
impl TransferVideo for ResumableUploadClient {
    async fn upload(
        &self,
        asset: &VideoAsset,
        video_id: Option<&str>,
    ) -> Result<String, UploadError> {
        tracing::info!(
            target: "uploader::upload",
            "uploading {} ({} bytes)",
            asset.path.display(),
            asset.size
        );

        let session_url = self.initiate(asset).await?;
        let confirmed = self.transfer(&session_url, asset).await?;

        // The completion body normally carries the id; fall back to the
        // identifier from the metadata phase when it does not.
        confirmed
            .or_else(|| video_id.map(str::to_string))
            .ok_or_else(|| {
                UploadError::Network("upload confirmed without a video id".to_string())
            })
    }
}

lazy_static::lazy_static! {
    static ref ACKED_RANGE_RE: Regex = Regex::new(r"bytes=\d+-(\d+)").unwrap();
}

/// Last acknowledged byte from a "bytes=0-12345" Range header
fn acked_offset(range: &str) -> Option<u64> {
    ACKED_RANGE_RE.captures(range)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uploader::models::AccessToken;
    use std::io::Write;
    use time::{Duration, OffsetDateTime};

    struct StaticToken;

    #[async_trait]
    impl TokenSource for StaticToken {
        async fn access_token(&self) -> Result<AccessToken, UploadError> {
            Ok(AccessToken {
                token: "test-token".to_string(),
                expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
            })
        }
    }

    fn asset_with_bytes(dir: &tempfile::TempDir, bytes: &[u8]) -> VideoAsset {
        let path = dir.path().join("clip.mp4");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(bytes).unwrap();
        VideoAsset::from_path(&path).unwrap()
    }

    fn client_for(server: &mockito::Server) -> ResumableUploadClient {
        ResumableUploadClient::new(
            reqwest::Client::new(),
            format!("{}/upload/videos", server.url()),
            Arc::new(StaticToken),
        )
    }

    #[test]
    fn test_acked_offset_parsing() {
        assert_eq!(acked_offset("bytes=0-12345"), Some(12345));
        assert_eq!(acked_offset("bytes=1024-2047"), Some(2047));
        assert_eq!(acked_offset("garbage"), None);
        assert_eq!(acked_offset(""), None);
    }

    #[tokio::test]
    async fn test_single_chunk_upload() {
        let dir = tempfile::tempdir().unwrap();
        let asset = asset_with_bytes(&dir, b"abcdef");

        let mut server = mockito::Server::new_async().await;
        let init = server
            .mock("POST", "/upload/videos")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("uploadType".into(), "resumable".into()),
                mockito::Matcher::UrlEncoded("part".into(), "snippet,status".into()),
            ]))
            .match_header("x-upload-content-type", "video/mp4")
            .match_header("x-upload-content-length", "6")
            .with_status(200)
            .with_header("Location", &format!("{}/session/1", server.url()))
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/session/1")
            .match_header("content-range", "bytes 0-5/6")
            .with_status(200)
            .with_body(r#"{"id":"vid42"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let id = client.upload(&asset, None).await.unwrap();
        assert_eq!(id, "vid42");
        init.assert_async().await;
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_chunked_upload_follows_acknowledged_offset() {
        let dir = tempfile::tempdir().unwrap();
        let asset = asset_with_bytes(&dir, b"abcdef");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/videos")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("Location", &format!("{}/session/2", server.url()))
            .create_async()
            .await;
        let first = server
            .mock("PUT", "/session/2")
            .match_header("content-range", "bytes 0-2/6")
            .with_status(308)
            .with_header("Range", "bytes=0-2")
            .create_async()
            .await;
        let second = server
            .mock("PUT", "/session/2")
            .match_header("content-range", "bytes 3-5/6")
            .with_status(200)
            .with_body(r#"{"id":"vid43"}"#)
            .create_async()
            .await;

        let client = client_for(&server).with_chunk_size(3);
        let id = client.upload(&asset, None).await.unwrap();
        assert_eq!(id, "vid43");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_each_chunk_fetches_a_current_token() {
        // A long transfer can cross the token's expiry, so every chunk
        // asks the source again instead of reusing the initial token.
        struct RotatingToken {
            calls: std::sync::atomic::AtomicU32,
        }

        #[async_trait]
        impl TokenSource for RotatingToken {
            async fn access_token(&self) -> Result<AccessToken, UploadError> {
                let n = self
                    .calls
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                    + 1;
                Ok(AccessToken {
                    token: format!("token-{}", n),
                    expires_at: OffsetDateTime::now_utc() + Duration::hours(1),
                })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let asset = asset_with_bytes(&dir, b"abcdef");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/videos")
            .match_query(mockito::Matcher::Any)
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_header("Location", &format!("{}/session/4", server.url()))
            .create_async()
            .await;
        let first = server
            .mock("PUT", "/session/4")
            .match_header("authorization", "Bearer token-2")
            .match_header("content-range", "bytes 0-2/6")
            .with_status(308)
            .with_header("Range", "bytes=0-2")
            .create_async()
            .await;
        let second = server
            .mock("PUT", "/session/4")
            .match_header("authorization", "Bearer token-3")
            .match_header("content-range", "bytes 3-5/6")
            .with_status(200)
            .with_body(r#"{"id":"vid44"}"#)
            .create_async()
            .await;

        let client = ResumableUploadClient::new(
            reqwest::Client::new(),
            format!("{}/upload/videos", server.url()),
            Arc::new(RotatingToken {
                calls: std::sync::atomic::AtomicU32::new(0),
            }),
        )
        .with_chunk_size(3);

        let id = client.upload(&asset, None).await.unwrap();
        assert_eq!(id, "vid44");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_location_header_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let asset = asset_with_bytes(&dir, b"abc");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/videos")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.upload(&asset, None).await,
            Err(UploadError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_init_rejection_carries_status_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let asset = asset_with_bytes(&dir, b"abc");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/videos")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = client_for(&server);
        match client.upload(&asset, None).await {
            Err(UploadError::RemoteRejection { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("expected RemoteRejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_completion_without_id_falls_back_to_metadata_id() {
        let dir = tempfile::tempdir().unwrap();
        let asset = asset_with_bytes(&dir, b"abc");

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/videos")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("Location", &format!("{}/session/3", server.url()))
            .create_async()
            .await;
        server
            .mock("PUT", "/session/3")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = client_for(&server);
        let id = client.upload(&asset, Some("meta-id")).await.unwrap();
        assert_eq!(id, "meta-id");
    }
}
