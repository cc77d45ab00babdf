// Metadata submitter - registers title/description/category/privacy
// and receives the platform-assigned video identifier

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::UploadError;
use super::models::VideoMetadata;
use super::traits::{SubmitMetadata, TokenSource};

#[derive(Serialize)]
struct Snippet<'a> {
    title: &'a str,
    description: &'a str,
    // The API wants the category as a string even though it is numeric
    #[serde(rename = "categoryId")]
    category_id: String,
}

#[derive(Serialize)]
struct Status<'a> {
    #[serde(rename = "privacyStatus")]
    privacy_status: &'a str,
}

#[derive(Serialize)]
struct VideoResource<'a> {
    snippet: Snippet<'a>,
    status: Status<'a>,
}

#[derive(Deserialize)]
struct CreatedVideo {
    id: Option<String>,
}

pub struct MetadataClient {
    client: reqwest::Client,
    endpoint: String,
    token: Arc<dyn TokenSource>,
}

impl MetadataClient {
    pub fn new(client: reqwest::Client, endpoint: String, token: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl SubmitMetadata for MetadataClient {
    async fn submit(&self, metadata: &VideoMetadata) -> Result<Option<String>, UploadError> {
        metadata.validate()?;

        let access = self.token.access_token().await?;
        let body = VideoResource {
            snippet: Snippet {
                title: &metadata.title,
                description: &metadata.description,
                category_id: metadata.category_id.to_string(),
            },
            status: Status {
                privacy_status: metadata.privacy.as_str(),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("part", "snippet,status")])
            .bearer_auth(&access.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            // Recoverable for the caller: skip the rest of the run cleanly
            tracing::warn!(
                target: "uploader::metadata",
                "metadata submission rejected (HTTP {}): {}",
                status.as_u16(),
                text
            );
            return Ok(None);
        }

        let created: CreatedVideo = serde_json::from_str(&text).unwrap_or(CreatedVideo { id: None });
        match created.id {
            Some(id) => {
                tracing::info!(target: "uploader::metadata", "metadata accepted, video id {}", id);
                Ok(Some(id))
            }
            None => {
                tracing::warn!(
                    target: "uploader::metadata",
                    "metadata response carried no video id: {}",
                    text
                );
                Ok(None)
            }
        }
    }
}
