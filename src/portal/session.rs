use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Ambient session credentials, keyed by origin (`scheme://host[:port]`)
///
/// The portal login lives outside this crate (a browser, a web view, a
/// cookie file). The transport only asks for the `Cookie` header to send and
/// hands back every `Set-Cookie` header it receives.
pub trait SessionStore: Send + Sync {
    /// `Cookie` header value to attach for `origin`, if any
    fn credentials_for(&self, origin: &str) -> Option<String>;

    /// Apply `Set-Cookie` header values received from `origin`
    fn record_credentials(&self, origin: &str, set_cookie_headers: &[String]);
}

/// Store that never has a session
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSession;

impl SessionStore for NoSession {
    fn credentials_for(&self, _origin: &str) -> Option<String> {
        None
    }

    fn record_credentials(&self, _origin: &str, _set_cookie_headers: &[String]) {}
}

/// In-process cookie jar
///
/// Only `name=value` pairs are kept. Attributes such as `Path` or `Expires`
/// are ignored, except that `Max-Age=0` or an empty value removes the cookie.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    cookies: RwLock<HashMap<String, BTreeMap<String, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `origin` from a raw `Cookie` header such as `a=1; b=2`
    pub fn with_cookie_header(self, origin: &str, header: &str) -> Self {
        {
            let mut cookies = self.cookies.write().unwrap_or_else(|e| e.into_inner());
            let jar = cookies.entry(origin.to_string()).or_default();
            for (name, value) in header.split(';').filter_map(parse_pair) {
                jar.insert(name, value);
            }
        }
        self
    }
}

impl SessionStore for MemorySessionStore {
    fn credentials_for(&self, origin: &str) -> Option<String> {
        let cookies = self.cookies.read().unwrap_or_else(|e| e.into_inner());
        let jar = cookies.get(origin)?;
        if jar.is_empty() {
            return None;
        }

        Some(
            jar.iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn record_credentials(&self, origin: &str, set_cookie_headers: &[String]) {
        if set_cookie_headers.is_empty() {
            return;
        }

        let mut cookies = self.cookies.write().unwrap_or_else(|e| e.into_inner());
        let jar = cookies.entry(origin.to_string()).or_default();

        for header in set_cookie_headers {
            let mut segments = header.split(';');
            let Some(pair) = segments.next() else {
                continue;
            };
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }

            let value = value.trim();
            let expired = segments.any(|attr| {
                attr.split_once('=').is_some_and(|(k, v)| {
                    k.trim().eq_ignore_ascii_case("max-age") && v.trim() == "0"
                })
            });

            if expired || value.is_empty() {
                jar.remove(name);
            } else {
                jar.insert(name.to_string(), value.to_string());
            }
        }
    }
}

fn parse_pair(pair: &str) -> Option<(String, String)> {
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
