//! Request dispatch for the Gorse API.
//!
//! # Design
//! Every operation goes through `send`: `build_request` turns method, path,
//! body and query into an `HttpRequest`, the transport executes it exactly
//! once, and `parse_response` turns the `HttpResponse` into a JSON value or
//! an `ApiError`. Building and parsing are pure and public so they can be
//! checked without a network.
//!
//! The client holds only its immutable `ClientConfig` and the transport, so a
//! shared `&GorseClient` can be used from several threads at once.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
use crate::query::{encode_query, QueryValue};

pub const API_KEY_HEADER: &str = "X-API-Key";

/// Body argument for requests that carry no payload.
pub const NO_BODY: Option<&'static ()> = None;

/// Client for a Gorse recommender server.
#[derive(Debug, Clone)]
pub struct GorseClient<T: Transport = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl GorseClient<UreqTransport> {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::new(endpoint, api_key))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(&config);
        Self::with_transport(config, transport)
    }

    /// Build a client from `GORSE_ENDPOINT` / `GORSE_API_KEY` / `GORSE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::with_config(ClientConfig::from_env()?)
    }
}

impl<T: Transport> GorseClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Describe one request without sending it.
    ///
    /// The URL is the endpoint, then `path`, then `?` and the encoded query
    /// when `query` is non-empty. `X-API-Key` is always set; the JSON content
    /// type only when a body is present.
    pub fn build_request<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        query: &[(&str, QueryValue)],
    ) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut url = format!("{}{path}", self.config.endpoint);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&encode_query(query)?);
        }

        let mut headers = vec![(API_KEY_HEADER.to_string(), self.config.api_key.clone())];
        let body = match body {
            Some(body) => {
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(serde_json::to_string(body).map_err(ApiError::SerializationError)?)
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Map a non-2xx status to `HttpError`, otherwise decode the body as JSON.
    pub fn parse_response(&self, response: HttpResponse) -> Result<Value, ApiError> {
        check_status(&response)?;
        serde_json::from_slice(&response.body).map_err(ApiError::DeserializationError)
    }

    /// Build, execute once, and decode.
    pub fn send<B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        query: &[(&str, QueryValue)],
    ) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.build_request(method, path, body, query)?;
        tracing::debug!(%method, path, query_params = query.len(), "sending gorse request");

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%method, path, error = %err, "gorse request failed");
                return Err(err);
            }
        };
        tracing::debug!(%method, path, status = response.status, "gorse response received");

        self.parse_response(response)
    }

    /// `send`, then convert the decoded value into `R`.
    pub fn send_typed<R, B>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
        query: &[(&str, QueryValue)],
    ) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.send(method, path, body, query)?;
        serde_json::from_value(value).map_err(ApiError::DeserializationError)
    }
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body_text(),
    })
}
