//! The serialize, call, deserialize routine shared by every operation.
//!
//! # Design
//! Binding is split in two pure halves around the network call:
//! `build_request` turns any serializable value into an authenticated
//! `HttpRequest`, and `parse_response` turns an `HttpResponse` into a
//! `Reply`, choosing the success or failure schema by status code.
//! `Client::bind` runs the round trip between them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Failure};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Versioned media type the API expects in `Accept`.
pub const ACCEPT: &str = "application/vnd.conekta-v2.0.0+json";

pub const CONTENT_TYPE: &str = "application/json";

/// Decoded outcome of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// HTTP 200, body decoded as the destination type.
    Success(T),
    /// Any other status, body decoded as a `Failure`.
    Failure(Failure),
}

impl<T> Reply<T> {
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Reply::Success(value) => Ok(value),
            Reply::Failure(failure) => Err(Error::Remote(failure)),
        }
    }
}

/// `Authorization` value for the API's scheme: the secret key as the Basic
/// username and an empty password.
pub fn basic_auth(secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{secret}:")))
}

/// Encode `source` as indented JSON and wrap it in an authenticated request.
pub fn build_request<S>(
    secret: &str,
    method: HttpMethod,
    uri: &str,
    source: &S,
) -> Result<HttpRequest, Error>
where
    S: Serialize + ?Sized,
{
    let body = serde_json::to_string_pretty(source).map_err(Error::Serialization)?;
    Ok(HttpRequest {
        method,
        uri: uri.to_string(),
        headers: vec![
            ("Accept".to_string(), ACCEPT.to_string()),
            ("Content-Type".to_string(), CONTENT_TYPE.to_string()),
            ("Authorization".to_string(), basic_auth(secret)),
        ],
        body,
    })
}

/// Decode a response body as `T` on 200, or as a `Failure` otherwise.
pub fn parse_response<T>(response: &HttpResponse) -> Result<Reply<T>, Error>
where
    T: DeserializeOwned,
{
    if response.status == 200 {
        serde_json::from_str(&response.body)
            .map(Reply::Success)
            .map_err(Error::Deserialization)
    } else {
        // A `null` error body still counts as a failure, with every field empty.
        serde_json::from_str::<Option<Failure>>(&response.body)
            .map(|failure| Reply::Failure(failure.unwrap_or_default()))
            .map_err(Error::Deserialization)
    }
}
