//! Response types

use courier_common::HttpStatus;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Transport metadata for one response
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMeta {
    /// HTTP status code
    pub status_code: u16,

    /// URL the request was sent to
    pub request_uri: String,

    /// Response headers (lower-cased names)
    pub headers: HashMap<String, String>,

    /// Peer address, when the transport exposes it
    pub remote_address: Option<String>,

    /// Elapsed time, recorded only when timing is enabled
    pub elapsed: Option<Duration>,
}

impl ResponseMeta {
    pub fn status(&self) -> HttpStatus {
        HttpStatus(self.status_code)
    }

    /// Get a header value (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .map(|s| s.as_str())
    }
}

/// Response body, parsed as JSON when possible
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(String),
}

impl ResponseBody {
    /// Parse raw text, keeping it as-is when it is not JSON
    pub fn parse(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Raw(text),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Raw(_) => None,
        }
    }

    /// Body rendered as text: raw bodies verbatim, JSON re-serialized
    pub fn to_text(&self) -> String {
        match self {
            ResponseBody::Json(value) => value.to_string(),
            ResponseBody::Raw(text) => text.clone(),
        }
    }
}

/// Validated result of one call
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    pub response: ResponseMeta,
    pub response_body: ResponseBody,
}

/// Typed view of a body that satisfied the envelope contract
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope<'a> {
    /// `200 OK` with `{"data": ...}`
    Data(&'a Value),
    /// Any other status with `{"error": {"code", "message"}}`
    Error { code: u64, message: &'a str },
}

impl RequestResult {
    pub fn status_code(&self) -> u16 {
        self.response.status_code
    }

    /// The `data` field of a `200 OK` response
    pub fn data(&self) -> Option<&Value> {
        match self.envelope()? {
            Envelope::Data(data) => Some(data),
            Envelope::Error { .. } => None,
        }
    }

    /// Typed view of the envelope. `None` only for results that were never
    /// validated.
    pub fn envelope(&self) -> Option<Envelope<'_>> {
        let body = self.response_body.as_json()?;
        if self.response.status().is_ok() {
            return body.get("data").map(Envelope::Data);
        }
        let error = body.get("error")?;
        let code = crate::validate::as_safe_integer(error.get("code")?)?;
        let message = error.get("message")?.as_str()?;
        Some(Envelope::Error { code, message })
    }

    /// Deserialize the `data` field into a typed value
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> Option<serde_json::Result<T>> {
        self.data().map(|data| T::deserialize(data))
    }
}
