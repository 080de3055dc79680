//! Error types for the Conekta client.
//!
//! # Design
//! A non-200 answer from the API carrying a well-formed body is not an
//! exceptional condition: it decodes into a `Failure` and surfaces as
//! `Error::Remote`. Everything else that can go wrong during a call (encoding
//! the request, reaching the server, decoding a body) has its own variant and
//! wraps the underlying error unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::null_as_default;

/// One entry of a `Failure`'s `details` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Detail {
    #[serde(deserialize_with = "null_as_default")]
    pub debug_message: String,
    /// Message meant to be shown to the end user.
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(deserialize_with = "null_as_default")]
    pub code: String,
    /// Request parameter the detail refers to, if any.
    pub param: Option<String>,
}

/// Structured error payload returned by the API on any non-200 status.
///
/// Displays as its `type` field. Missing or `null` fields decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{error_type}")]
#[serde(default)]
pub struct Failure {
    #[serde(deserialize_with = "null_as_default")]
    pub details: Vec<Detail>,
    #[serde(deserialize_with = "null_as_default")]
    pub object: String,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub error_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub log_id: String,
}

/// Errors returned by `Client` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request value could not be encoded as JSON. Nothing was sent.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The HTTP request could not be assembled, e.g. a malformed URI.
    #[error("invalid request: {0}")]
    Request(#[from] ureq::http::Error),

    /// DNS, connection, timeout or body read failure.
    #[error(transparent)]
    Transport(#[from] ureq::Error),

    /// The API answered with a non-200 status and a `Failure` body.
    #[error(transparent)]
    Remote(#[from] Failure),

    /// The response body was larger than the read limit, in bytes.
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(u64),

    /// A success or failure body did not match the expected schema.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl Error {
    /// The decoded API failure, when the server rejected the call.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Error::Remote(failure) => Some(failure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "details": [{
            "debug_message": "The card was declined.",
            "message": "La tarjeta fue declinada.",
            "code": "conekta.errors.processing.charge.declined",
            "param": "payment_sources.0.token_id"
        }],
        "object": "error",
        "type": "invalid_payment",
        "log_id": "641b1f2de9a0a8001b2c3d4e"
    }"#;

    #[test]
    fn failure_decodes_api_error_body() {
        let failure: Failure = serde_json::from_str(BODY).unwrap();
        assert_eq!(failure.error_type, "invalid_payment");
        assert_eq!(failure.object, "error");
        assert_eq!(failure.log_id, "641b1f2de9a0a8001b2c3d4e");
        assert_eq!(failure.details.len(), 1);
        assert_eq!(failure.details[0].code, "conekta.errors.processing.charge.declined");
        assert_eq!(failure.details[0].param.as_deref(), Some("payment_sources.0.token_id"));
    }

    #[test]
    fn failure_displays_its_type() {
        let failure: Failure = serde_json::from_str(BODY).unwrap();
        assert_eq!(failure.to_string(), "invalid_payment");
        assert_eq!(Error::Remote(failure).to_string(), "invalid_payment");
    }

    #[test]
    fn failure_without_type_decodes_empty() {
        let failure: Failure = serde_json::from_str(r#"{"object":"error","log_id":"l1"}"#).unwrap();
        assert_eq!(failure.error_type, "");
        assert_eq!(failure.log_id, "l1");
        assert_eq!(failure.to_string(), "");
    }

    #[test]
    fn failure_null_fields_decode_empty() {
        let failure: Failure =
            serde_json::from_str(r#"{"details":null,"object":null,"type":"x","log_id":null}"#)
                .unwrap();
        assert!(failure.details.is_empty());
        assert!(failure.object.is_empty());
        assert!(failure.log_id.is_empty());
        assert_eq!(failure.error_type, "x");

        let detail: Detail =
            serde_json::from_str(r#"{"debug_message":null,"message":null,"code":null,"param":null}"#)
                .unwrap();
        assert_eq!(detail, Detail::default());
    }

    #[test]
    fn detail_tolerates_missing_fields() {
        let detail: Detail = serde_json::from_str(r#"{"code":"x"}"#).unwrap();
        assert_eq!(detail.code, "x");
        assert!(detail.param.is_none());
        assert!(detail.message.is_empty());
    }

    #[test]
    fn failure_accessor_only_matches_remote() {
        let err = Error::Remote(Failure {
            error_type: "processing_error".to_string(),
            ..Failure::default()
        });
        assert_eq!(err.failure().map(|f| f.error_type.as_str()), Some("processing_error"));

        let err = Error::Deserialization(serde_json::from_str::<Failure>("nope").unwrap_err());
        assert!(err.failure().is_none());
    }
}
