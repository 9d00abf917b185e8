use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::endpoint::normalize_upload_url;
use super::error::Result;
use super::multipart::TrackFile;
use super::progress::ProgressSink;
use super::session::{MemorySessionStore, SessionStore};
use super::transport::{AuthMode, HttpTransport, Transport, UploadRequest};

/// Status code of a result that never reached the network
pub const NOT_SENT: u16 = 0;

/// What the portal answered, or the local reason nothing was sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    pub status_code: u16,
    pub response_body: String,
}

impl UploadResult {
    pub fn new(status_code: u16, response_body: impl Into<String>) -> Self {
        Self {
            status_code,
            response_body: response_body.into(),
        }
    }

    /// Result for a track file that is missing or unreadable
    pub fn file_not_found(path: &Path) -> Self {
        Self::new(
            NOT_SENT,
            format!("File does not exist: {}", path.display()),
        )
    }

    /// `true` only for 2xx; [`NOT_SENT`] is always a failure
    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn was_sent(&self) -> bool {
        self.status_code != NOT_SENT
    }
}

/// Uploads track files, falling back from the session to the API key
///
/// The session attempt goes first. Only a `401` answer with a non-empty API
/// key triggers the second attempt, and whatever that one returns is final.
pub struct Uploader<T = HttpTransport<MemorySessionStore>> {
    transport: T,
}

impl Uploader<HttpTransport<MemorySessionStore>> {
    /// Uploader with a fresh in-memory session store
    pub fn new() -> Result<Self> {
        Self::with_sessions(Arc::new(MemorySessionStore::new()))
    }
}

impl<S: SessionStore> Uploader<HttpTransport<S>> {
    pub fn with_sessions(sessions: Arc<S>) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(sessions)?))
    }
}

impl<T: Transport> Uploader<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload `file` to the portal at `base_url`
    ///
    /// # Errors
    ///
    /// Returns an error only when no response could be obtained (network,
    /// invalid URL, unreadable file mid-stream). HTTP error statuses and a
    /// missing file come back as an [`UploadResult`].
    pub async fn upload_track(
        &self,
        file: &Path,
        base_url: &str,
        api_key: Option<&str>,
    ) -> Result<UploadResult> {
        self.run(file, base_url, api_key, None).await
    }

    /// Same as [`upload_track`](Self::upload_track), reporting progress
    ///
    /// Each attempt reports from `0` up to `1.0`, so a fallback upload runs
    /// through the range twice.
    pub async fn upload_track_with_progress(
        &self,
        file: &Path,
        base_url: &str,
        api_key: Option<&str>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<UploadResult> {
        self.run(file, base_url, api_key, Some(progress)).await
    }

    async fn run(
        &self,
        file: &Path,
        base_url: &str,
        api_key: Option<&str>,
        progress: Option<Arc<dyn ProgressSink>>,
    ) -> Result<UploadResult> {
        let endpoint = normalize_upload_url(base_url);

        let Some(track) = TrackFile::probe(file).await else {
            warn!("Track file does not exist: {}", file.display());
            return Ok(UploadResult::file_not_found(file));
        };

        debug!(
            "Uploading {} ({} bytes) to {}",
            track.path().display(),
            track.len(),
            endpoint
        );

        let first = self
            .transport
            .send(UploadRequest {
                track: track.clone(),
                endpoint: endpoint.clone(),
                auth: AuthMode::Session,
                progress: progress.clone(),
            })
            .await?;

        match (first.status_code, api_key) {
            (401, Some(key)) if !key.is_empty() => {
                info!("Session rejected with 401, retrying with API key");
                self.transport
                    .send(UploadRequest {
                        track,
                        endpoint,
                        auth: AuthMode::ApiKey(key.to_string()),
                        progress,
                    })
                    .await
            }
            _ => Ok(first),
        }
    }
}
