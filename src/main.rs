use clap::Parser;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use youtube_uploader::cli::Cli;
use youtube_uploader::uploader::{
    upload_window, MetadataClient, NetworkConfig, OauthCredential, PrivacyStatus, QuotaFile,
    QuotaStore, ResumableUploadClient, RunOutcome, TokenProvider, UploadOrchestrator,
    UploaderConfig, VideoMetadata,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = UploaderConfig::new(OauthCredential {
        client_id: cli.client_id,
        client_secret: cli.client_secret,
        refresh_token: cli.refresh_token,
    })
    .with_long_video_file(cli.long_video)
    .with_shorts_file(cli.shorts)
    .with_network(NetworkConfig {
        proxy: cli.proxy,
        timeout: Some(cli.timeout),
    });
    if let Some(path) = cli.quota_file {
        config = config.with_quota_path(path);
    }

    let metadata = VideoMetadata::new(
        cli.title,
        cli.description,
        cli.category_id,
        PrivacyStatus::parse_or_public(&cli.privacy),
    );

    if cli.dry_run {
        std::process::exit(dry_run(&config));
    }

    let client = match config.http_client() {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let token = Arc::new(TokenProvider::new(
        config.credential.clone(),
        config.endpoints.token_url.clone(),
        client.clone(),
    ));
    let orchestrator = UploadOrchestrator::new(
        Box::new(QuotaFile::new(config.quota_path.clone())),
        Box::new(MetadataClient::new(
            client.clone(),
            config.endpoints.metadata_url.clone(),
            token.clone(),
        )),
        Box::new(ResumableUploadClient::new(
            client,
            config.endpoints.upload_url.clone(),
            token,
        )),
        config,
    );

    let outcome = orchestrator.run(&metadata).await;
    match &outcome {
        RunOutcome::Uploaded { video_id, .. } => {
            println!("https://www.youtube.com/watch?v={}", video_id);
        }
        RunOutcome::NoEligibleWindow | RunOutcome::QuotaExhausted(_) => {}
        RunOutcome::MetadataRejected => {
            tracing::error!("run ended: metadata was rejected by the platform");
        }
        RunOutcome::Aborted(e) => {
            tracing::error!("run aborted: {}", e);
        }
    }
    std::process::exit(outcome.exit_code());
}

/// Print the window and quota decision without touching the network
fn dry_run(config: &UploaderConfig) -> i32 {
    let now = OffsetDateTime::now_utc();
    let Some(kind) = upload_window(now.hour()) else {
        println!("hour {} UTC: no eligible upload window", now.hour());
        return 0;
    };

    let quota = QuotaFile::new(config.quota_path.clone());
    match quota.check_upload_limit(now.date()) {
        Ok(record) => {
            let max = config.max_for(kind);
            println!(
                "hour {} UTC: {} window, {}/{} uploaded today -> {}",
                now.hour(),
                kind.as_str(),
                record.count(kind),
                max,
                if record.count(kind) < max {
                    "would upload"
                } else {
                    "limit reached"
                }
            );
            0
        }
        Err(e) => {
            tracing::error!("quota check failed: {}", e);
            1
        }
    }
}
