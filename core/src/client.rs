//! Blocking client for the Conekta REST API.
//!
//! # Design
//! `Client` holds its credentials, flags and a shared `ureq::Agent`; it
//! carries no mutable state between calls and can be cloned or shared across
//! threads. Every operation is a thin wrapper over `Client::bind`.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bind::{build_request, parse_response};
use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Customer, CustomerRequest, Order, OrderRequest};

/// Production API host.
pub const HOST: &str = "https://api.conekta.io";

pub const ORDER_URI: &str = "/orders";

pub const CUSTOMER_URI: &str = "/customers";

/// Upper bound for a whole exchange, connect through body read.
pub const TIMEOUT: Duration = Duration::from_secs(60);

/// Largest response body read before giving up with `Error::BodyTooLarge`.
pub const MAX_BODY: u64 = 10 * 1024 * 1024;

/// Construction options for `Client`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Public key. Accepted for completeness; never sent with requests.
    pub api_key: String,
    pub secret_key: String,
    /// Test vs. production account. Informational only.
    pub sandbox: bool,
    /// Log outgoing requests and raw error bodies.
    pub debug: bool,
    pub host: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            sandbox: false,
            debug: false,
            host: HOST.to_string(),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("sandbox", &self.sandbox)
            .field("debug", &self.debug)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

/// Client for the Conekta API.
#[derive(Clone)]
pub struct Client {
    agent: ureq::Agent,
    // Reserved: the API authenticates with the secret key alone.
    api_key: String,
    secret_key: String,
    sandbox: bool,
    debug: bool,
    host: String,
}

impl Client {
    /// Client against the production host. Use `sandbox = false` for
    /// production accounts.
    pub fn new(api_key: &str, secret_key: &str, sandbox: bool) -> Self {
        Self::from_config(ClientConfig {
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
            sandbox,
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(TIMEOUT))
            .build()
            .new_agent();
        Self {
            agent,
            api_key: config.api_key,
            secret_key: config.secret_key,
            sandbox: config.sandbox,
            debug: config.debug,
            host: config.host.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Point the client at another base URL, e.g. a local mock server.
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.trim_end_matches('/').to_string();
        self
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `POST /orders`.
    pub fn create_order(&self, request: &OrderRequest) -> Result<Order, Error> {
        self.bind(HttpMethod::Post, &self.endpoint(ORDER_URI), request)
    }

    /// `POST /customers`.
    pub fn create_customer(&self, request: &CustomerRequest) -> Result<Customer, Error> {
        self.bind(HttpMethod::Post, &self.endpoint(CUSTOMER_URI), request)
    }

    /// Send `source` to `uri` and decode the answer.
    ///
    /// Returns the decoded body on HTTP 200, `Error::Remote` when any other
    /// status carries a well-formed failure body, and the underlying error
    /// for encoding, transport and decoding problems.
    pub fn bind<S, T>(&self, method: HttpMethod, uri: &str, source: &S) -> Result<T, Error>
    where
        S: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = build_request(&self.secret_key, method, uri, source)?;
        if self.debug {
            debug!(method = %request.method, uri = %request.uri, body = %request.body, "conekta request");
        }

        let response = self.execute(request)?;
        if self.debug && response.status != 200 {
            debug!(status = response.status, body = %response.body, "conekta error response");
        }

        parse_response(&response)?.into_result()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    /// Run the round trip. The response body is fully read, up to
    /// `MAX_BODY` bytes, and released before returning.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method.as_str())
            .uri(request.uri.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let outgoing = builder.body(request.body)?;

        let mut response = self.agent.run(outgoing)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY)
            .read_to_string()
            .map_err(|e| match e {
                ureq::Error::BodyExceedsLimit(limit) => Error::BodyTooLarge(limit),
                e => Error::Transport(e),
            })?;
        Ok(HttpResponse { status, body })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("sandbox", &self.sandbox)
            .field("debug", &self.debug)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_targets_production_host() {
        let client = Client::new("", "key_abc", false);
        assert_eq!(client.host(), HOST);
        assert_eq!(client.endpoint(ORDER_URI), "https://api.conekta.io/orders");
        assert_eq!(client.endpoint(CUSTOMER_URI), "https://api.conekta.io/customers");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = Client::new("", "key_abc", true).with_host("http://localhost:3000/");
        assert_eq!(client.endpoint(ORDER_URI), "http://localhost:3000/orders");
    }

    #[test]
    fn sandbox_and_api_key_are_kept() {
        let client = Client::new("key_pub", "key_abc", true);
        assert!(client.is_sandbox());
        assert_eq!(client.api_key(), "key_pub");
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"secret_key":"key_abc","debug":true}"#).unwrap();
        assert_eq!(config.host, HOST);
        assert!(config.debug);
        assert!(!config.sandbox);

        let client = Client::from_config(config);
        assert_eq!(client.host(), HOST);
    }

    #[test]
    fn debug_output_hides_credentials() {
        let client = Client::new("key_pub", "key_secret", false);
        let shown = format!("{client:?}");
        assert!(!shown.contains("key_secret"));
        assert!(!shown.contains("key_pub"));

        let shown = format!("{:?}", ClientConfig {
            secret_key: "key_secret".to_string(),
            ..ClientConfig::default()
        });
        assert!(!shown.contains("key_secret"));
    }

    #[test]
    fn agent_uses_global_timeout() {
        let client = Client::new("", "key_abc", false);
        assert_eq!(client.agent.config().timeouts().global, Some(TIMEOUT));
        assert_eq!(TIMEOUT, Duration::from_secs(60));
    }

    #[test]
    fn bad_uri_is_a_request_error() {
        let client = Client::new("", "key_abc", false);
        let err = client
            .bind::<_, Order>(HttpMethod::Post, "not a uri", &OrderRequest::default())
            .unwrap_err();
        assert!(matches!(err, Error::Request(_)));
    }
}
