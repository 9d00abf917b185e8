use anyhow::{Context, Result};
use std::env;

/// Configuration for portal uploads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub api_key: Option<String>,
    pub session_cookie: Option<String>,
}

impl Config {
    /// Load configuration, preferring explicit values over environment
    /// variables and the .env file
    ///
    /// Each `None` falls back to `OBS_URL`, `OBS_API_KEY` and
    /// `OBS_SESSION_COOKIE` respectively.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is available or it is invalid
    pub fn load(
        base_url: Option<String>,
        api_key: Option<String>,
        session_cookie: Option<String>,
    ) -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if it exists

        let base_url = base_url
            .or_else(|| env::var("OBS_URL").ok())
            .context("OBS_URL not found in environment. Pass --url or set it in .env file")?;

        Self::new(
            base_url,
            api_key.or_else(|| env::var("OBS_API_KEY").ok()),
            session_cookie.or_else(|| env::var("OBS_SESSION_COOKIE").ok()),
        )
    }

    /// Build a validated configuration from explicit values
    ///
    /// Values are trimmed; an empty API key or cookie counts as absent.
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        session_cookie: Option<String>,
    ) -> Result<Self> {
        let base_url = base_url.trim().to_string();
        Self::validate_base_url(&base_url)?;

        Ok(Self {
            base_url,
            api_key: non_empty(api_key),
            session_cookie: non_empty(session_cookie),
        })
    }

    /// Validate portal base URL
    fn validate_base_url(url: &str) -> Result<()> {
        if url.is_empty() {
            anyhow::bail!("OBS_URL cannot be empty");
        }

        if url.chars().any(char::is_whitespace) {
            anyhow::bail!("OBS_URL '{}' contains whitespace", url);
        }

        let Some((scheme, rest)) = url.split_once("://") else {
            anyhow::bail!(
                "OBS_URL '{}' must start with http:// or https:// (e.g., https://portal.openbikesensor.org)",
                url
            );
        };

        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            anyhow::bail!(
                "OBS_URL '{}' uses unsupported scheme '{}' (use http or https)",
                url,
                scheme
            );
        }

        if rest.is_empty() || rest.starts_with('/') {
            anyhow::bail!("OBS_URL '{}' has no host", url);
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_validation() {
        // Valid URLs
        assert!(Config::validate_base_url("https://portal.openbikesensor.org").is_ok());
        assert!(Config::validate_base_url("http://localhost:3000/").is_ok());
        assert!(Config::validate_base_url("https://host/api/tracks").is_ok());
        assert!(Config::validate_base_url("HTTPS://host").is_ok());

        // Invalid URLs
        assert!(Config::validate_base_url("").is_err()); // Empty
        assert!(Config::validate_base_url("portal.example.org").is_err()); // No scheme
        assert!(Config::validate_base_url("ftp://host").is_err()); // Wrong scheme
        assert!(Config::validate_base_url("https://").is_err()); // No host
        assert!(Config::validate_base_url("https:///api").is_err()); // No host
        assert!(Config::validate_base_url("https://my host").is_err()); // Whitespace
    }

    #[test]
    fn test_values_are_trimmed() {
        let config = Config::new(
            "  https://host/ ".to_string(),
            Some(" key ".to_string()),
            Some("session=abc\n".to_string()),
        )
        .unwrap();

        assert_eq!(config.base_url, "https://host/");
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.session_cookie.as_deref(), Some("session=abc"));
        assert!(config.has_api_key());
    }

    #[test]
    fn test_blank_optional_values_are_absent() {
        let config = Config::new(
            "https://host".to_string(),
            Some("   ".to_string()),
            Some(String::new()),
        )
        .unwrap();

        assert_eq!(config.api_key, None);
        assert_eq!(config.session_cookie, None);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_explicit_url_wins_over_environment() {
        let config = Config::load(Some("https://explicit.example.org".to_string()), None, None)
            .unwrap();
        assert_eq!(config.base_url, "https://explicit.example.org");
    }
}
