/// Route every portal accepts track uploads on
pub const UPLOAD_PATH: &str = "/api/tracks";

/// Rewrite a user-supplied portal URL into the track upload endpoint
///
/// URLs that already end in `/api/tracks` (with or without a trailing slash)
/// are returned unchanged. Anything else gets the route appended with exactly
/// one separating slash. No validation happens here; a malformed URL is
/// rejected later by the HTTP layer.
///
/// # Examples
///
/// ```
/// use obs_uploader::normalize_upload_url;
///
/// assert_eq!(normalize_upload_url("https://host"), "https://host/api/tracks");
/// assert_eq!(normalize_upload_url("https://host/"), "https://host/api/tracks");
/// assert_eq!(normalize_upload_url("https://host/api/tracks/"), "https://host/api/tracks/");
/// ```
pub fn normalize_upload_url(base_url: &str) -> String {
    let with_slash = format!("{}/", UPLOAD_PATH);
    if base_url.ends_with(UPLOAD_PATH) || base_url.ends_with(&with_slash) {
        return base_url.to_string();
    }

    if base_url.ends_with('/') {
        format!("{}{}", base_url, UPLOAD_PATH.trim_start_matches('/'))
    } else {
        format!("{}{}", base_url, UPLOAD_PATH)
    }
}
