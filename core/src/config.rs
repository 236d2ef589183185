//! Client configuration.
//!
//! `endpoint` and `api_key` are required and have no defaults. The timeout
//! is handed to the transport unchanged; the client itself never times out
//! or retries.

use std::time::Duration;

use crate::error::ApiError;

/// Default User-Agent string sent by `UreqTransport`.
pub const DEFAULT_USER_AGENT: &str = concat!("gorse-client/", env!("CARGO_PKG_VERSION"));

pub const ENV_ENDPOINT: &str = "GORSE_ENDPOINT";
pub const ENV_API_KEY: &str = "GORSE_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "GORSE_TIMEOUT_SECS";

/// Largest response body `UreqTransport` reads before giving up.
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Immutable connection settings shared by every call of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the Gorse server, without trailing `/`.
    pub endpoint: String,
    /// Sent verbatim in the `X-API-Key` header.
    pub api_key: String,
    /// Whole-request timeout passed to the transport. `None` waits forever.
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// Response bodies past this size fail. On a 2xx that is a transport
    /// error; on any other status the status is still reported.
    pub max_response_bytes: u64,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Read `GORSE_ENDPOINT`, `GORSE_API_KEY` and optionally `GORSE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let endpoint = lookup(ENV_ENDPOINT)
            .ok_or_else(|| ApiError::Config(format!("{ENV_ENDPOINT} is not set")))?;
        let api_key = lookup(ENV_API_KEY)
            .ok_or_else(|| ApiError::Config(format!("{ENV_API_KEY} is not set")))?;

        let mut config = Self::new(endpoint, api_key);
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("{ENV_TIMEOUT_SECS} must be whole seconds, got {raw:?}"))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.endpoint.is_empty() {
            return Err(ApiError::Config("endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let config = ClientConfig::new("http://localhost:8087//", "key");
        assert_eq!(config.endpoint, "http://localhost:8087");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.timeout, None);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.max_response_bytes, DEFAULT_MAX_RESPONSE_BYTES);
    }

    #[test]
    fn builder_setters_apply() {
        let config = ClientConfig::new("http://gorse", "key")
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent")
            .with_max_response_bytes(1024);
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.max_response_bytes, 1024);
    }

    #[test]
    fn empty_endpoint_fails_validation() {
        let err = ClientConfig::new("/", "key").validate().unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn env_lookup_reads_all_fields() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_ENDPOINT, "http://gorse:8087/"),
            (ENV_API_KEY, "zhenghaoz"),
            (ENV_TIMEOUT_SECS, "15"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "http://gorse:8087");
        assert_eq!(config.api_key, "zhenghaoz");
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn env_lookup_requires_api_key() {
        let err = ClientConfig::from_lookup(lookup_from(&[(ENV_ENDPOINT, "http://gorse")])).unwrap_err();
        assert!(err.to_string().contains(ENV_API_KEY));
    }

    #[test]
    fn env_lookup_rejects_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup_from(&[
            (ENV_ENDPOINT, "http://gorse"),
            (ENV_API_KEY, "key"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
