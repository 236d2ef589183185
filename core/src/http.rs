//! HTTP wire types and the transport seam.
//!
//! # Design
//! Requests and responses are described as plain data. `GorseClient` builds
//! an `HttpRequest`, hands it to a `Transport` for the single network round
//! trip, and parses the returned `HttpResponse`. Swapping the transport (a
//! recording fake in tests, `UreqTransport` in production) never changes how
//! requests are built or responses interpreted.
//!
//! A transport reports non-2xx responses as data. Only failures where no
//! response was obtained become `ApiError::Transport`.

use crate::config::ClientConfig;
use crate::error::ApiError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute: endpoint, path and encoded query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// `body` holds the raw bytes; nothing assumes they are UTF-8.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, with invalid UTF-8 replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes exactly one HTTP round trip per call.
///
/// Implementations must be safe to share across threads; the client calls
/// `execute` concurrently when it is shared.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by one long-lived `ureq::Agent`.
///
/// The agent pools connections and is reused by every call of the owning
/// client. Status codes are never turned into errors here.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    max_response_bytes: u64,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .new_agent();
        Self {
            agent,
            max_response_bytes: config.max_response_bytes,
        }
    }
}

fn apply_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let headers = request.headers.as_slice();
        let body = request.body.as_deref().map(str::as_bytes);

        let result = match (request.method, body) {
            (HttpMethod::Get, Some(body)) => apply_headers(self.agent.get(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Get, None) => apply_headers(self.agent.get(url), headers).call(),
            (HttpMethod::Delete, Some(body)) => apply_headers(self.agent.delete(url), headers)
                .force_send_body()
                .send(body),
            (HttpMethod::Delete, None) => apply_headers(self.agent.delete(url), headers).call(),
            (HttpMethod::Post, Some(body)) => apply_headers(self.agent.post(url), headers).send(body),
            (HttpMethod::Post, None) => apply_headers(self.agent.post(url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => apply_headers(self.agent.put(url), headers).send(body),
            (HttpMethod::Put, None) => apply_headers(self.agent.put(url), headers).send_empty(),
            (HttpMethod::Patch, Some(body)) => apply_headers(self.agent.patch(url), headers).send(body),
            (HttpMethod::Patch, None) => apply_headers(self.agent.patch(url), headers).send_empty(),
        };
        let mut response = result?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = match response
            .body_mut()
            .with_config()
            .limit(self.max_response_bytes)
            .read_to_vec()
        {
            Ok(body) => body,
            // The server answered with an error status; keep it and report the
            // read failure as the body text.
            Err(err) if !(200..300).contains(&status) => err.to_string().into_bytes(),
            Err(err) => return Err(err.into()),
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
