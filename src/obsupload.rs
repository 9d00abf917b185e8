use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use obs_uploader::{
    Config, MemorySessionStore, ProgressSink, UploadResult, Uploader, normalize_upload_url,
};
use reqwest::Url;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "obsupload",
    version = env!("CARGO_PKG_VERSION"),
    about = "Upload recorded OpenBikeSensor tracks to an OBS portal",
    long_about = "Uploads a track file to an OBS portal. The portal session cookie is tried first; \
                  if the portal answers 401 and an API key is configured, the upload is repeated \
                  with the API key. Configure via flags or a .env file.",
    after_help = "Examples:\n  \
                  obsupload ./track.bin --url https://portal.example.org      # Upload with session cookie only\n  \
                  obsupload ./track.bin --api-key 1a2b3c                     # Use OBS_URL from .env\n  \
                  obsupload ./track.bin --json                               # Print the result as JSON\n\n\
                  Configuration (.env):\n  \
                  OBS_URL=https://portal.openbikesensor.org\n  \
                  OBS_API_KEY=your-api-key\n  \
                  OBS_SESSION_COOKIE=session=...\n"
)]
struct Cli {
    /// Track file to upload
    file: PathBuf,

    /// Portal base URL (overrides OBS_URL)
    #[arg(long, short = 'u')]
    url: Option<String>,

    /// API key used when the session is rejected (overrides OBS_API_KEY)
    #[arg(long, short = 'k')]
    api_key: Option<String>,

    /// Session cookie header, e.g. "session=abc" (overrides OBS_SESSION_COOKIE)
    #[arg(long)]
    cookie: Option<String>,

    /// Print the upload result as JSON
    #[arg(long)]
    json: bool,

    /// Don't show a progress bar
    #[arg(long, short = 'q')]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file early to get LOG_LEVEL
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL")
        .ok()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("OBS Upload Tool v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(cli.url.clone(), cli.api_key.clone(), cli.cookie.clone())?;
    let endpoint = normalize_upload_url(&config.base_url);

    let mut sessions = MemorySessionStore::new();
    if let Some(cookie) = &config.session_cookie {
        let origin = Url::parse(&endpoint)
            .with_context(|| format!("Invalid portal URL: {}", endpoint))?
            .origin()
            .ascii_serialization();
        sessions = sessions.with_cookie_header(&origin, cookie);
    }

    let uploader = Uploader::with_sessions(Arc::new(sessions))
        .context("Failed to create HTTP client")?;

    if !cli.json {
        println!(
            "{}",
            style(format!("📦 Target: {}", endpoint)).cyan().bold()
        );
        if !config.has_api_key() {
            println!(
                "{}",
                style("No API key configured, relying on session cookie only").dim()
            );
        }
    }

    let show_progress = !cli.quiet && !cli.json;
    let outcome = if show_progress {
        let size = tokio::fs::metadata(&cli.file)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        let pb = ProgressBar::new(size);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb.set_message(display_name(&cli.file));

        let sink: Arc<dyn ProgressSink> = Arc::new(pb.clone());
        let outcome = uploader
            .upload_track_with_progress(&cli.file, &config.base_url, config.api_key.as_deref(), sink)
            .await;
        pb.finish_and_clear();
        outcome
    } else {
        uploader
            .upload_track(&cli.file, &config.base_url, config.api_key.as_deref())
            .await
    };

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!("Upload failed for {}: {}", cli.file.display(), e);
            anyhow::bail!(e.user_message());
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&cli.file, &result);
    }

    if !result.is_successful() {
        anyhow::bail!(
            "Upload of {} failed with status {}",
            display_name(&cli.file),
            result.status_code
        );
    }

    Ok(())
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_result(file: &std::path::Path, result: &UploadResult) {
    let name = display_name(file);

    if result.is_successful() {
        println!(
            "{} {} {}",
            style("✓").green(),
            style(&name).green(),
            style(format!("(uploaded, {})", result.status_code)).dim()
        );
    } else if !result.was_sent() {
        println!("{} {}", style("✗").red(), style(&result.response_body).red());
        return;
    } else {
        println!(
            "{} {} {}",
            style("✗").red(),
            style(&name).red(),
            style(format!("(failed, {})", result.status_code)).red()
        );
    }

    if !result.response_body.is_empty() {
        println!("  {}", style(&result.response_body).dim());
    }
}
