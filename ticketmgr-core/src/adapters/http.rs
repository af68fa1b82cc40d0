//! HTTP transport for the ticketing backend
//!
//! Wraps `reqwest`: resolves paths against the API base URI, keeps session
//! and CSRF cookies, and injects the CSRF header on every request.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::Client;
use url::Url;

use super::csrf::{parse_csrf_cookie, CsrfToken, CsrfTokenHolder, CSRF_HEADER};
use crate::config::ApiSettings;
use crate::domain::result::TransportError;
use crate::ports::{RawResponse, RequestOptions, Transport};

/// reqwest-backed implementation of the `Transport` port
#[derive(Debug)]
pub struct HttpTransport {
    /// Cookie-keeping client (session + CSRF cookies)
    client: Client,
    /// Client for requests made without credentials
    anonymous: Client,
    base_url: Url,
    csrf_path: String,
    csrf_ttl: Duration,
    csrf: Arc<CsrfTokenHolder>,
}

impl HttpTransport {
    /// Create a transport from API settings with its own CSRF holder
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        Self::with_holder(settings, Arc::new(CsrfTokenHolder::new()))
    }

    /// Create a transport sharing an existing CSRF holder
    pub fn with_holder(settings: &ApiSettings, csrf: Arc<CsrfTokenHolder>) -> Result<Self> {
        let base_url = normalize_base(&settings.base_uri)?;
        let timeout = Duration::from_secs(settings.timeout_secs);

        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;
        let anonymous = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            anonymous,
            base_url,
            csrf_path: settings.csrf_path.trim_start_matches('/').to_string(),
            csrf_ttl: Duration::from_secs(settings.csrf_ttl_secs),
            csrf,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn csrf(&self) -> &Arc<CsrfTokenHolder> {
        &self.csrf
    }

    /// Base URI + path
    pub fn resolve(&self, path: &str) -> std::result::Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", path, e)))
    }

    /// Fetch a fresh CSRF token from the backend
    ///
    /// The token is taken from the `csrftoken` cookie of the response, or
    /// from a `csrfToken` field of a JSON body when no cookie is set.
    pub async fn grab_csrf(&self) -> std::result::Result<CsrfToken, TransportError> {
        let url = self.resolve(&self.csrf_path)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Csrf(format!("HTTP {}", status.as_u16())));
        }

        if let Some((value, max_age)) = csrf_from_headers(response.headers()) {
            return Ok(CsrfToken::new(value, Some(max_age.unwrap_or(self.csrf_ttl))));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|_| TransportError::Csrf("response carried no token".to_string()))?;
        ["csrfToken", "csrftoken", "token"]
            .iter()
            .find_map(|key| body.get(*key).and_then(|v| v.as_str()))
            .filter(|value| !value.is_empty())
            .map(|value| CsrfToken::new(value, Some(self.csrf_ttl)))
            .ok_or_else(|| TransportError::Csrf("response carried no token".to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> std::result::Result<RawResponse, TransportError> {
        let url = self.resolve(path)?;
        let token = self.csrf.get_or_refresh(|| self.grab_csrf()).await?;

        let client = if options.include_credentials {
            &self.client
        } else {
            &self.anonymous
        };

        let mut request = client
            .request(options.method, url)
            .header(reqwest::header::REFERER, self.base_url.as_str());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request = request.header(CSRF_HEADER, token);
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();

        // the backend rotates the token on login
        let rotated = csrf_from_headers(response.headers());
        let was_rotated = rotated.is_some();
        if let Some((value, max_age)) = rotated {
            self.csrf
                .store(CsrfToken::new(value, Some(max_age.unwrap_or(self.csrf_ttl))))
                .await;
        }

        let body = response.bytes().await?;
        if status == 403 && !was_rotated && is_csrf_rejection(&body) {
            // the held token went stale server-side; fetch a new one next call
            self.csrf.clear().await;
        }
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

/// Base URI with a trailing slash, so relative joins append
fn normalize_base(base_uri: &str) -> Result<Url> {
    let mut base = base_uri.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).with_context(|| format!("Invalid API base URI: {}", base_uri))
}

/// Django's 403 body for a missing or mismatched token
fn is_csrf_rejection(body: &[u8]) -> bool {
    const MARKER: &[u8] = b"CSRF Failed";
    body.windows(MARKER.len()).any(|window| window == MARKER)
}

fn csrf_from_headers(headers: &HeaderMap) -> Option<(String, Option<Duration>)> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_csrf_cookie)
}
