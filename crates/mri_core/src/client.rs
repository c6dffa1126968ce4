//! Remote classifier client.
//!
//! One multipart POST per upload, no retries. Anything short of a JSON
//! object carrying a non-empty `data` array is a [`TransportError`]; the
//! shape of the first `data` element is checked later by the normalizer.

use crate::config::ClientConfig;
use crate::file::CandidateFile;
use crate::validate::MAX_UPLOAD_BYTES;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::Value;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("could not read upload {name}: {source}")]
    ReadFile {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("upload {name} grew to {size} bytes, the limit is {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("prediction service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response envelope: {0}")]
    Envelope(String),
}

impl TransportError {
    /// True when the upload itself could not be sent rather than the
    /// service being unreachable or misbehaving.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            TransportError::ReadFile { .. } | TransportError::TooLarge { .. }
        )
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    data: Vec<Value>,
}

/// Body of a successful response: the `data` array, guaranteed non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    data: Vec<Value>,
}

impl RawResponse {
    pub fn from_json_str(body: &str) -> Result<Self, TransportError> {
        let envelope: Envelope =
            serde_json::from_str(body).map_err(|e| TransportError::Envelope(e.to_string()))?;
        Self::from_data(envelope.data)
    }

    pub fn from_value(value: Value) -> Result<Self, TransportError> {
        let envelope: Envelope =
            serde_json::from_value(value).map_err(|e| TransportError::Envelope(e.to_string()))?;
        Self::from_data(envelope.data)
    }

    fn from_data(data: Vec<Value>) -> Result<Self, TransportError> {
        if data.is_empty() {
            return Err(TransportError::Envelope("`data` is empty".to_string()));
        }
        Ok(Self { data })
    }

    /// The prediction payload the normalizer reads.
    pub fn predictions(&self) -> &Value {
        &self.data[0]
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }
}

/// Anything that can turn an upload into a raw classifier response.
pub trait PredictionService: Send + Sync {
    fn submit(&self, file: &CandidateFile) -> Result<RawResponse, TransportError>;
}

/// [`PredictionService`] over HTTP.
pub struct HttpPredictionClient {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpPredictionClient {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::blocking::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(TransportError::Client)?;
        Ok(Self::with_http_client(config, http))
    }

    /// Use an already configured HTTP client, e.g. one without proxies.
    pub fn with_http_client(config: &ClientConfig, http: reqwest::blocking::Client) -> Self {
        Self {
            http,
            endpoint: config.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_error(&self, source: reqwest::Error) -> TransportError {
        TransportError::Request {
            url: self.endpoint.clone(),
            source,
        }
    }
}

impl PredictionService for HttpPredictionClient {
    fn submit(&self, file: &CandidateFile) -> Result<RawResponse, TransportError> {
        let bytes = file.read_bytes().map_err(|source| TransportError::ReadFile {
            name: file.name().to_string(),
            source,
        })?;
        // checked on the bytes actually read, not the size seen at selection
        let size = bytes.len() as u64;
        if size > MAX_UPLOAD_BYTES {
            return Err(TransportError::TooLarge {
                name: file.name().to_string(),
                size,
                limit: MAX_UPLOAD_BYTES,
            });
        }
        tracing::debug!(
            endpoint = %self.endpoint,
            file = file.name(),
            bytes = bytes.len(),
            "Submitting image for classification"
        );

        let part = Part::bytes(bytes.to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.content_type())
            .map_err(|e| self.request_error(e))?;
        let form = Form::new().part("data", part);

        let response = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .map_err(|e| {
                tracing::warn!("Prediction request failed: {e}");
                self.request_error(e)
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| self.request_error(e))?;
        tracing::debug!(status = status.as_u16(), "Prediction service responded");

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        RawResponse::from_json_str(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(header_end) = find(&buf, b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            match content_length {
                Some(len) if buf.len() >= header_end + 4 + len => break,
                Some(_) => {}
                None if headers.contains("transfer-encoding: chunked") => {
                    if buf.ends_with(b"0\r\n\r\n") {
                        break;
                    }
                }
                None => break,
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Answers exactly one request and hands back what it received.
    fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });
        (format!("http://{addr}"), handle)
    }

    fn client_for(base_url: &str) -> HttpPredictionClient {
        let http = reqwest::blocking::Client::builder()
            .no_proxy()
            .build()
            .unwrap();
        HttpPredictionClient::with_http_client(&ClientConfig::new(base_url), http)
    }

    fn scan() -> CandidateFile {
        CandidateFile::from_bytes("scan.png", None, b"\x89PNG fake".to_vec())
    }

    #[test]
    fn posts_multipart_image_and_parses_data() {
        let body = json!({ "data": [[0.7, 0.1, 0.15, 0.05]] }).to_string();
        let (url, server) = serve_once("200 OK", body);

        let raw = client_for(&url).submit(&scan()).unwrap();
        assert_eq!(raw.predictions(), &json!([0.7, 0.1, 0.15, 0.05]));

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /api/predict HTTP/1.1"));
        let lower = request.to_ascii_lowercase();
        assert!(lower.contains("accept: application/json"));
        assert!(lower.contains("content-type: multipart/form-data"));
        assert!(request.contains("name=\"data\""));
        assert!(request.contains("filename=\"scan.png\""));
        assert!(lower.contains("content-type: image/png"));
    }

    #[test]
    fn non_success_status_is_a_transport_error() {
        let (url, server) = serve_once("503 Service Unavailable", "{\"error\":\"busy\"}".into());
        let err = client_for(&url).submit(&scan()).unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 503, ref body } if body.contains("busy")));
        server.join().unwrap();
    }

    #[test]
    fn body_without_data_is_a_transport_error() {
        let (url, server) = serve_once("200 OK", "{\"result\": \"ok\"}".into());
        let err = client_for(&url).submit(&scan()).unwrap_err();
        assert!(matches!(err, TransportError::Envelope(_)));
        server.join().unwrap();
    }

    #[test]
    fn unreachable_service_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(&format!("http://{addr}")).submit(&scan()).unwrap_err();
        assert!(matches!(err, TransportError::Request { .. }));
        assert!(!err.is_local());
    }

    #[test]
    fn unreadable_file_fails_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vanished.png");
        std::fs::write(&path, b"x").unwrap();
        let file = CandidateFile::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = client_for("http://127.0.0.1:9").submit(&file).unwrap_err();
        assert!(err.is_local());
    }

    #[test]
    fn oversized_body_fails_before_any_request() {
        let big = vec![0u8; MAX_UPLOAD_BYTES as usize + 1];
        let file = CandidateFile::from_bytes("huge.png", None, big);

        let err = client_for("http://127.0.0.1:9").submit(&file).unwrap_err();
        assert!(matches!(
            err,
            TransportError::TooLarge { size, limit, .. } if size == limit + 1
        ));
        assert!(err.is_local());
    }

    #[test]
    fn envelope_requires_non_empty_data_array() {
        assert!(RawResponse::from_json_str("{\"data\": []}").is_err());
        assert!(RawResponse::from_json_str("{\"data\": {\"a\": 1}}").is_err());
        assert!(RawResponse::from_json_str("[1, 2, 3]").is_err());
        assert!(RawResponse::from_json_str("not json").is_err());

        let raw = RawResponse::from_value(json!({ "data": [{ "no_tumor": 1.0 }, "extra"] })).unwrap();
        assert_eq!(raw.data().len(), 2);
        assert_eq!(raw.predictions(), &json!({ "no_tumor": 1.0 }));
    }
}
