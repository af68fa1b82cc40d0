//! Transport port - HTTP access to the ticketing backend
//!
//! The facade builds requests against paths relative to the API base and
//! receives undecoded responses. Interpretation of status codes and bodies
//! happens in the service layer.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as JsonValue;

use crate::domain::result::TransportError;

/// Options recognized by the transport; anything else is out of scope
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    /// JSON request body
    pub body: Option<JsonValue>,
    /// Extra request headers, forwarded unchanged
    pub headers: Vec<(String, String)>,
    /// Send and store cookies (session + CSRF)
    pub include_credentials: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: None,
            headers: Vec::new(),
            include_credentials: true,
        }
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post() -> Self {
        Self {
            method: Method::POST,
            ..Self::default()
        }
    }

    /// Attach a JSON body
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn omit_credentials(mut self) -> Self {
        self.include_credentials = false;
        self
    }
}

/// Response as received, body not yet decoded
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed as JSON; `None` when empty or malformed
    pub fn json(&self) -> Option<JsonValue> {
        serde_json::from_slice(&self.body).ok()
    }
}

/// Issues requests against the backend API
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `options` to `path` (relative to the API base URI)
    ///
    /// Fails only when no response was obtained; HTTP error statuses are
    /// returned as ordinary responses.
    async fn call(&self, path: &str, options: RequestOptions)
        -> Result<RawResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_options_builders() {
        let opts = RequestOptions::post()
            .json(json!({"username": "u"}))
            .header("Accept", "application/json")
            .omit_credentials();

        assert_eq!(opts.method, Method::POST);
        assert_eq!(opts.body, Some(json!({"username": "u"})));
        assert_eq!(opts.headers.len(), 1);
        assert!(!opts.include_credentials);
        assert!(RequestOptions::get().include_credentials);
    }

    #[test]
    fn test_raw_response_json() {
        assert_eq!(
            RawResponse::new(200, r#"{"a":1}"#).json(),
            Some(json!({"a": 1}))
        );
        assert_eq!(RawResponse::new(500, "").json(), None);
        assert_eq!(RawResponse::new(500, "[object Object]").json(), None);
    }

    #[test]
    fn test_raw_response_success_range() {
        assert!(RawResponse::new(201, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(302, "").is_success());
        assert!(!RawResponse::new(409, "").is_success());
    }
}
