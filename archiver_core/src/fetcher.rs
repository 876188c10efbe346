// archiver_core/src/fetcher.rs

//! Remote record fetching.
//! Defines the per-key failure taxonomy, the `RecordFetcher` seam used by the
//! controller and the HTTP transport the concrete sources run on.

use std::collections::HashMap;
use std::sync::Mutex;

/// Category of a failed fetch. The controller's horizon policy is expressed
/// in terms of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FetchErrorKind {
    #[serde(rename = "transient")]
    Transient,
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "validation")]
    Validation,
}

/// Failure to produce a record for one key.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network failure, timeout or server-side error. Eligible for a re-run.
    #[error("transient failure for {url}: {reason}")]
    Transient { url: String, reason: String },
    /// The record does not exist (yet).
    #[error("no record at {url}: {reason}")]
    NotFound { url: String, reason: String },
    /// The response was received but its content is not what the source promises.
    #[error("invalid payload from {url}: {reason}")]
    Validation { url: String, reason: String },
}

impl FetchError {
    pub fn transient(url: &str, reason: impl std::fmt::Display) -> Self {
        FetchError::Transient { url: url.to_string(), reason: reason.to_string() }
    }

    pub fn not_found(url: &str, reason: impl std::fmt::Display) -> Self {
        FetchError::NotFound { url: url.to_string(), reason: reason.to_string() }
    }

    pub fn validation(url: &str, reason: impl std::fmt::Display) -> Self {
        FetchError::Validation { url: url.to_string(), reason: reason.to_string() }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transient { .. } => FetchErrorKind::Transient,
            FetchError::NotFound { .. } => FetchErrorKind::NotFound,
            FetchError::Validation { .. } => FetchErrorKind::Validation,
        }
    }

    /// Classifies a non-success HTTP status.
    pub fn from_status(url: &str, status: u16) -> Self {
        match status {
            404 | 410 => FetchError::not_found(url, format!("HTTP {status}")),
            408 | 429 | 500..=599 => FetchError::transient(url, format!("HTTP {status}")),
            _ => FetchError::validation(url, format!("HTTP {status}")),
        }
    }
}

/// Produces the record stored under one key.
pub trait RecordFetcher: Send + Sync {
    type Key;
    type Record;

    fn fetch(&self, key: &Self::Key) -> Result<Self::Record, FetchError>;
}

/// Plain GET returning the response body of a successful request.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking HTTP transport with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    /// Builds a client.
    /// # Arguments
    /// * `timeout` - Upper bound for a whole request, connect included.
    /// * `user_agent` - Value of the `User-Agent` header.
    pub fn new(timeout: std::time::Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        anyhow::Ok(Self { client })
    }
}

impl Transport for HttpClient {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!(url, "GET");
        let response = self.client
            .get(url)
            .send()
            .map_err(|e| classify_request_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(url, status.as_u16()));
        }

        response
            .text()
            .map_err(|e| classify_request_error(url, &e))
    }
}

fn classify_request_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_decode() {
        FetchError::validation(url, error)
    } else {
        FetchError::transient(url, error)
    }
}

/// Test double for `Transport`: serves canned bodies from memory, answers 404
/// for unknown URLs and records every requested URL. Public so integration
/// tests and downstream crates can drive fetchers offline; the binary never
/// constructs it.
#[derive(Debug, Default)]
pub struct StaticTransport {
    responses: HashMap<String, Result<String, u16>>,
    requests: Mutex<Vec<String>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Err(status));
        self
    }

    pub fn get_requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Transport for StaticTransport {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::from_status(url, *status)),
            None => Err(FetchError::from_status(url, 404)),
        }
    }
}

/// Fills `{name}` placeholders of a URL template.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut url = template.to_string();
    for (name, value) in values {
        url = url.replace(&format!("{{{}}}", name), value);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(FetchError::from_status("u", 404).kind(), FetchErrorKind::NotFound);
        assert_eq!(FetchError::from_status("u", 503).kind(), FetchErrorKind::Transient);
        assert_eq!(FetchError::from_status("u", 429).kind(), FetchErrorKind::Transient);
        assert_eq!(FetchError::from_status("u", 403).kind(), FetchErrorKind::Validation);
    }

    #[test]
    fn templates_fill_every_placeholder() {
        let url = fill_template(
            "https://host/{solution}/guesses-by-round-{mode}.json?d={date}",
            &[("solution", "crane"), ("mode", "hard"), ("date", "2024-01-01")],
        );
        assert_eq!(url, "https://host/crane/guesses-by-round-hard.json?d=2024-01-01");
    }

    /// Serves one connection on a local port with `respond`, returns the base URL.
    fn serve_once<H>(respond: H) -> String
    where
        H: FnOnce(std::net::TcpStream) + Send + 'static,
    {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((stream, _)) = listener.accept() {
                respond(stream);
            }
        });
        format!("http://{}", addr)
    }

    fn read_request(stream: &mut std::net::TcpStream) {
        use std::io::Read;
        let mut seen = Vec::new();
        let mut buf = [0u8; 512];
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => seen.extend_from_slice(&buf[..n]),
            }
        }
    }

    fn reply(status_line: &str, body: &str) -> impl FnOnce(std::net::TcpStream) + Send + 'static {
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body,
        );
        move |mut stream| {
            use std::io::Write;
            read_request(&mut stream);
            let _ = stream.write_all(response.as_bytes());
        }
    }

    fn client(timeout_ms: u64) -> HttpClient {
        HttpClient::new(std::time::Duration::from_millis(timeout_ms), "archiver-tests").unwrap()
    }

    #[test]
    fn http_timeout_is_transient() {
        let url = serve_once(|stream| {
            // hold the connection open without answering
            std::thread::sleep(std::time::Duration::from_secs(3));
            drop(stream);
        });
        let error = client(200).get(&format!("{}/2024-01-01.json", url)).unwrap_err();
        assert_eq!(error.kind(), FetchErrorKind::Transient, "{error}");
    }

    #[test]
    fn http_404_is_not_found() {
        let url = serve_once(reply("404 Not Found", ""));
        let error = client(5_000).get(&format!("{}/2030-01-01.json", url)).unwrap_err();
        assert_eq!(error.kind(), FetchErrorKind::NotFound, "{error}");
    }

    #[test]
    fn http_server_error_is_transient_and_ok_returns_body() {
        let url = serve_once(reply("503 Service Unavailable", "busy"));
        assert_eq!(client(5_000).get(&url).unwrap_err().kind(), FetchErrorKind::Transient);

        let url = serve_once(reply("200 OK", "{\"solution\":\"crane\"}"));
        assert_eq!(client(5_000).get(&url).unwrap(), "{\"solution\":\"crane\"}");
    }

    #[test]
    fn refused_connection_is_transient() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let error = client(1_000).get(&format!("http://{}/x.json", addr)).unwrap_err();
        assert_eq!(error.kind(), FetchErrorKind::Transient);
    }

    #[test]
    fn static_transport_serves_and_records() {
        let transport = StaticTransport::new()
            .with_body("a", "{}")
            .with_status("b", 500);
        assert_eq!(transport.get("a").unwrap(), "{}");
        assert_eq!(transport.get("b").unwrap_err().kind(), FetchErrorKind::Transient);
        assert_eq!(transport.get("c").unwrap_err().kind(), FetchErrorKind::NotFound);
        assert_eq!(transport.get_requests(), vec!["a", "b", "c"]);
    }
}
