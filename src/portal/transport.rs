use reqwest::header::{AUTHORIZATION, COOKIE, HeaderValue, SET_COOKIE};
use reqwest::{Client, Url};
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

use super::error::{Result, UploadError};
use super::multipart::{TrackFile, encode_track};
use super::progress::ProgressSink;
use super::session::{MemorySessionStore, SessionStore};
use super::upload::UploadResult;

/// Scheme token of the portal's API-key `Authorization` header
pub const API_KEY_SCHEME: &str = "OBSUserId";

/// How a single attempt authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Rely on the ambient session cookies for the endpoint's origin
    Session,
    /// Send `Authorization: OBSUserId <key>`
    ApiKey(String),
}

impl AuthMode {
    /// Value of the `Authorization` header, if this mode sends one
    pub fn authorization(&self) -> Option<String> {
        match self {
            Self::Session => None,
            Self::ApiKey(key) => Some(format!("{} {}", API_KEY_SCHEME, key)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::ApiKey(_) => "api-key",
        }
    }
}

/// One upload attempt, built fresh for every request
#[derive(Clone)]
pub struct UploadRequest {
    pub track: TrackFile,
    pub endpoint: String,
    pub auth: AuthMode,
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadRequest")
            .field("track", &self.track)
            .field("endpoint", &self.endpoint)
            .field("auth", &self.auth.label())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Sends one upload attempt and reports what the server answered
///
/// Any HTTP status is a successful send. Only failures to get a response at
/// all are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: UploadRequest) -> impl Future<Output = Result<UploadResult>> + Send;
}

/// reqwest-backed transport with an ambient session store
pub struct HttpTransport<S = MemorySessionStore> {
    client: Client,
    sessions: Arc<S>,
}

impl<S> Clone for HttpTransport<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl<S: SessionStore> HttpTransport<S> {
    pub fn new(sessions: Arc<S>) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(concat!("obs-uploader/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, sessions })
    }
}

impl<S: SessionStore> Transport for HttpTransport<S> {
    async fn send(&self, request: UploadRequest) -> Result<UploadResult> {
        let url = Url::parse(&request.endpoint).map_err(|e| UploadError::InvalidUrl {
            url: request.endpoint.clone(),
            message: e.to_string(),
        })?;
        let origin = url.origin().ascii_serialization();

        let form = encode_track(&request.track, request.progress.clone()).await?;
        let mut builder = self.client.post(url).multipart(form);

        match &request.auth {
            AuthMode::Session => {
                if let Some(cookie) = self.sessions.credentials_for(&origin) {
                    debug!("Attaching session cookies for {}", origin);
                    builder = builder.header(COOKIE, cookie);
                }
            }
            AuthMode::ApiKey(_) => {
                if let Some(value) = request.auth.authorization() {
                    let value =
                        HeaderValue::from_str(&value).map_err(|_| UploadError::InvalidApiKey)?;
                    builder = builder.header(AUTHORIZATION, value);
                }
            }
        }

        debug!(
            "POST {} ({} auth, {} bytes)",
            request.endpoint,
            request.auth.label(),
            request.track.len()
        );

        let response = builder.send().await?;
        let status_code = response.status().as_u16();

        let set_cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();
        if !set_cookies.is_empty() {
            debug!("Recording {} cookie(s) for {}", set_cookies.len(), origin);
            self.sessions.record_credentials(&origin, &set_cookies);
        }

        let response_body = response.text().await?;
        debug!("Response {} ({} bytes)", status_code, response_body.len());

        Ok(UploadResult::new(status_code, response_body))
    }
}
