//! Mock ticketing backend for testing
//!
//! Serves the CSRF endpoint at `/api/csrf` (cookie `csrftoken` plus a
//! `{"csrfToken": ...}` body) and whatever routes a test registers with
//! [`MockBackendServer::respond`]. Every request is recorded so tests can
//! assert on paths, headers and bodies.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const CSRF_PATH: &str = "/api/csrf";

/// Mock backend server for testing
pub struct MockBackendServer {
    port: u16,
    state: Arc<MockState>,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Behaviour of the mock backend
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Token handed out by the CSRF endpoint
    pub csrf_token: String,
    /// Max-Age attribute of the CSRF cookie
    pub csrf_max_age: Option<u64>,
    /// Status of the CSRF endpoint
    pub csrf_status: u16,
    /// Issue the token as a cookie (otherwise only in the body)
    pub csrf_cookie: bool,
    /// Reject requests without an `X-CSRFToken` header
    pub require_csrf: bool,
    /// Delay in milliseconds before responding
    pub delay_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            csrf_token: "mocktoken0123456789".to_string(),
            csrf_max_age: Some(31449600),
            csrf_status: 200,
            csrf_cookie: true,
            require_csrf: true,
            delay_ms: 0,
        }
    }
}

/// A request as received by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.clone())
    }

    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[derive(Debug, Clone)]
struct MockRoute {
    status: u16,
    body: String,
    set_cookie: Option<String>,
}

struct MockState {
    config: MockConfig,
    routes: Mutex<HashMap<(String, String), MockRoute>>,
    requests: Mutex<Vec<RecordedRequest>>,
    csrf_fetches: AtomicUsize,
}

impl MockBackendServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let state = Arc::new(MockState {
            config,
            routes: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            csrf_fetches: AtomicUsize::new(0),
        });
        let state_clone = state.clone();

        // Non-blocking so the accept loop notices shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            state,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// API base URL, `http://127.0.0.1:<port>/api/`
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api/", self.port)
    }

    /// Register a canned response for `method path`
    pub fn respond(&self, method: &str, path: &str, status: u16, body: &str) {
        self.add_route(method, path, status, body, None);
    }

    /// Register a canned response that also sets a cookie
    pub fn respond_with_cookie(
        &self,
        method: &str,
        path: &str,
        status: u16,
        body: &str,
        set_cookie: &str,
    ) {
        self.add_route(method, path, status, body, Some(set_cookie.to_string()));
    }

    fn add_route(&self, method: &str, path: &str, status: u16, body: &str, set_cookie: Option<String>) {
        let route = MockRoute {
            status,
            body: body.to_string(),
            set_cookie,
        };
        self.state
            .routes
            .lock()
            .unwrap()
            .insert((method.to_uppercase(), path.to_string()), route);
    }

    /// Number of requests served by the CSRF endpoint
    pub fn csrf_fetches(&self) -> usize {
        self.state.csrf_fetches.load(Ordering::SeqCst)
    }

    /// All requests except CSRF fetches, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    pub fn last_request(&self, path: &str) -> Option<RecordedRequest> {
        self.requests_to(path).pop()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockBackendServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(mut stream: TcpStream, state: &MockState) {
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, 400, r#"{"detail": "Bad request"}"#, None);
        return;
    };

    let config = &state.config;
    if config.delay_ms > 0 {
        thread::sleep(Duration::from_millis(config.delay_ms));
    }

    if request.method == "GET" && request.path == CSRF_PATH {
        state.csrf_fetches.fetch_add(1, Ordering::SeqCst);
        if !(200..300).contains(&config.csrf_status) {
            send_response(&mut stream, config.csrf_status, "", None);
            return;
        }
        let cookie = config.csrf_cookie.then(|| match config.csrf_max_age {
            Some(max_age) => format!("csrftoken={}; Max-Age={}; Path=/; SameSite=Lax", config.csrf_token, max_age),
            None => format!("csrftoken={}; Path=/; SameSite=Lax", config.csrf_token),
        });
        let body = serde_json::json!({ "csrfToken": config.csrf_token }).to_string();
        send_response(&mut stream, 200, &body, cookie.as_deref());
        return;
    }

    let has_token = request
        .header("x-csrftoken")
        .is_some_and(|token| !token.is_empty());
    let key = (request.method.clone(), request.path.clone());
    state.requests.lock().unwrap().push(request);

    if config.require_csrf && !has_token {
        send_response(
            &mut stream,
            403,
            r#"{"detail": "CSRF Failed: CSRF token missing."}"#,
            None,
        );
        return;
    }

    let route = state.routes.lock().unwrap().get(&key).cloned();
    match route {
        Some(route) => send_response(&mut stream, route.status, &route.body, route.set_cookie.as_deref()),
        None => send_response(&mut stream, 404, r#"{"detail": "Not found."}"#, None),
    }
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buffer = [0; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?;
    let path = target.split('?').next().unwrap_or(target).to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_lowercase(), value.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = data[header_end..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body,
    })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "Unknown",
    }
}

fn send_response(stream: &mut TcpStream, status: u16, body: &str, set_cookie: Option<&str>) {
    let cookie_line = set_cookie
        .map(|cookie| format!("Set-Cookie: {}\r\n", cookie))
        .unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n{}",
        status,
        status_text(status),
        body.len(),
        cookie_line,
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_request(port: u16, request: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream.write_all(request.as_bytes()).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_mock_server_starts() {
        let server = MockBackendServer::start(MockConfig::default()).unwrap();
        assert!(server.port() > 0);
        assert!(server.base_url().ends_with("/api/"));
    }

    #[test]
    fn test_csrf_endpoint_sets_cookie() {
        let server = MockBackendServer::start(MockConfig::default()).unwrap();
        let response = raw_request(server.port(), "GET /api/csrf HTTP/1.1\r\nHost: x\r\n\r\n");

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("Set-Cookie: csrftoken=mocktoken0123456789; Max-Age=31449600"));
        assert!(response.contains(r#""csrfToken":"mocktoken0123456789""#));
        assert_eq!(server.csrf_fetches(), 1);
        assert!(server.requests().is_empty());
    }

    #[test]
    fn test_missing_token_is_forbidden() {
        let server = MockBackendServer::start(MockConfig::default()).unwrap();
        server.respond("GET", "/api/event", 200, "[]");

        let response = raw_request(server.port(), "GET /api/event HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(response.starts_with("HTTP/1.1 403"));
        assert_eq!(server.requests_to("/api/event").len(), 1);
    }

    #[test]
    fn test_records_body_and_headers() {
        let server = MockBackendServer::start(MockConfig::default()).unwrap();
        server.respond("POST", "/api/user", 201, "{}");

        let body = r#"{"username":"u"}"#;
        let response = raw_request(
            server.port(),
            &format!(
                "POST /api/user?x=1 HTTP/1.1\r\nHost: x\r\nX-CSRFToken: t\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            ),
        );
        assert!(response.starts_with("HTTP/1.1 201"));

        let request = server.last_request("/api/user").unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.header("X-CSRFToken").as_deref(), Some("t"));
        assert_eq!(request.body_json(), Some(serde_json::json!({"username": "u"})));
    }

    #[test]
    fn test_unknown_route_is_not_found() {
        let server = MockBackendServer::start(MockConfig::default()).unwrap();
        let response = raw_request(
            server.port(),
            "GET /api/nowhere HTTP/1.1\r\nHost: x\r\nX-CSRFToken: t\r\n\r\n",
        );
        assert!(response.starts_with("HTTP/1.1 404"));
    }
}
