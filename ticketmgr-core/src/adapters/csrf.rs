//! CSRF token holder
//!
//! One holder per transport. The token starts unset, is fetched on first use
//! and refetched once expired. The refresh runs while the slot is locked, so
//! callers arriving during a refresh wait and reuse its token.

use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::result::TransportError;

/// Name of the cookie the backend issues the token in
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header the backend expects the token in
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// A token and its expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CsrfToken {
    /// `ttl = None` means the token never expires
    pub fn new(value: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            value: value.into(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Instant::now() >= expires_at)
    }
}

/// Shared slot for the current token
#[derive(Debug, Default)]
pub struct CsrfTokenHolder {
    slot: Mutex<Option<CsrfToken>>,
}

impl CsrfTokenHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token value, if set and not expired
    pub async fn current(&self) -> Option<String> {
        let slot = self.slot.lock().await;
        slot.as_ref()
            .filter(|token| !token.is_expired())
            .map(|token| token.value.clone())
    }

    /// Return the valid token, running `refresh` first when unset or expired
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, TransportError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CsrfToken, TransportError>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(token) = slot.as_ref().filter(|token| !token.is_expired()) {
            return Ok(token.value.clone());
        }

        let token = refresh().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Replace the token (the backend rotated it)
    pub async fn store(&self, token: CsrfToken) {
        *self.slot.lock().await = Some(token);
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }
}

/// Extract the CSRF token and its Max-Age from one `Set-Cookie` header value
///
/// Returns `None` when the header sets a different cookie or an empty value.
pub fn parse_csrf_cookie(header: &str) -> Option<(String, Option<Duration>)> {
    let mut parts = header.split(';').map(str::trim);
    let (name, value) = parts.next()?.split_once('=')?;
    if name != CSRF_COOKIE || value.is_empty() {
        return None;
    }

    let max_age = parts
        .filter_map(|attr| attr.split_once('='))
        .find(|(key, _)| key.eq_ignore_ascii_case("max-age"))
        .and_then(|(_, secs)| secs.parse::<u64>().ok())
        .map(Duration::from_secs);

    Some((value.trim_matches('"').to_string(), max_age))
}
