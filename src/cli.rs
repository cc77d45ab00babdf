use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "youtube-uploader")]
#[command(about = "Scheduled YouTube upload automation")]
#[command(version)]
pub struct Cli {
    /// Video title (1-100 characters)
    #[arg(short, long)]
    pub title: String,

    /// Video description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Numeric category identifier (20 = Gaming)
    #[arg(long, default_value_t = 20)]
    pub category_id: u32,

    /// Privacy status: public, private, or unlisted
    #[arg(long, default_value = "public")]
    pub privacy: String,

    /// Long-form video to upload during the morning window
    #[arg(long, default_value = "long_video.mp4")]
    pub long_video: PathBuf,

    /// Short-form video to upload during the midday window
    #[arg(long, default_value = "short_video.mp4")]
    pub shorts: PathBuf,

    /// Quota file location (defaults to the user data directory)
    #[arg(long)]
    pub quota_file: Option<PathBuf>,

    /// SOCKS5/HTTP proxy URL for all outbound calls
    #[arg(long)]
    pub proxy: Option<String>,

    /// Timeout in seconds for every outbound call
    #[arg(long, default_value_t = 15)]
    pub timeout: u32,

    /// Show the window/quota decision without uploading
    #[arg(long)]
    pub dry_run: bool,

    /// OAuth client identifier
    #[arg(long, env = "CLIENT_ID", hide_env_values = true)]
    pub client_id: String,

    /// OAuth client secret
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Long-lived OAuth refresh token
    #[arg(long, env = "REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: String,
}
