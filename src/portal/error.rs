use thiserror::Error;

/// Errors that prevent an upload from reaching a server response
///
/// Anything the server answers with, including 4xx and 5xx, is reported
/// as an [`UploadResult`](super::UploadResult) instead.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Endpoint is not an absolute URL the HTTP layer can talk to
    #[error("Invalid upload URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// API key cannot be carried in an HTTP header
    #[error("API key contains characters that are not allowed in an HTTP header")]
    InvalidApiKey,

    /// Connection, TLS, timeout or malformed response
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// IO error while streaming the track file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl { url, message } => {
                format!(
                    "Invalid upload URL '{}': {}\n\nPossible solutions:\n  \
                     1. Include the scheme, e.g. https://portal.openbikesensor.org\n  \
                     2. Check OBS_URL in .env or the --url flag",
                    url, message
                )
            }
            Self::InvalidApiKey => "API key contains invalid characters\n\nPossible solutions:\n  \
                 1. Copy the key again from the portal settings page\n  \
                 2. Make sure it has no line breaks or control characters"
                .to_string(),
            Self::Network(e) => {
                format!(
                    "Network error: {}\n\nPossible solutions:\n  \
                     1. Check your internet connection\n  \
                     2. Verify the portal URL is reachable in a browser\n  \
                     3. Check if you're behind a proxy/firewall",
                    e
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for portal upload operations
pub type Result<T> = std::result::Result<T, UploadError>;
