// Credential provider - exchanges the refresh token for a bearer token

use async_trait::async_trait;
use serde::Deserialize;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;

use super::config::OauthCredential;
use super::errors::UploadError;
use super::models::AccessToken;
use super::traits::TokenSource;

// Assumed when the token endpoint omits expires_in
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Refreshes the access token on demand and caches it until near expiry,
/// so one orchestration run performs at most one refresh.
pub struct TokenProvider {
    credential: OauthCredential,
    token_url: String,
    client: reqwest::Client,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenProvider {
    pub fn new(credential: OauthCredential, token_url: String, client: reqwest::Client) -> Self {
        Self {
            credential,
            token_url,
            client,
            cached: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Result<AccessToken, UploadError> {
        let params = [
            ("client_id", self.credential.client_id.as_str()),
            ("client_secret", self.credential.client_secret.as_str()),
            ("refresh_token", self.credential.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(UploadError::Auth(body));
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|_| UploadError::Auth(body.clone()))?;

        // Surface the raw body on failure so the caller can see the
        // provider's error payload verbatim.
        let token = match parsed.access_token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(UploadError::Auth(body)),
        };

        let lifetime = parsed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        Ok(AccessToken {
            token,
            expires_at: OffsetDateTime::now_utc() + Duration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl TokenSource for TokenProvider {
    async fn access_token(&self) -> Result<AccessToken, UploadError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(OffsetDateTime::now_utc()) {
                return Ok(token.clone());
            }
            tracing::debug!(target: "uploader::auth", "cached token near expiry, refreshing");
        }

        let token = self.refresh().await?;
        tracing::debug!(target: "uploader::auth", "access token refreshed");
        *cached = Some(token.clone());
        Ok(token)
    }
}
