//! Transport collaborator
//!
//! The request helpers never touch sockets themselves. They hand a
//! [`RequestDescriptor`] to a [`Transport`] and get back a status code and a
//! raw body, or a [`TransportFailure`]. [`ReqwestTransport`] is the default
//! implementation and sends through the descriptor's pooled agent.

use crate::error::TransportErrorKind;
use crate::request::{encode_pairs, RequestBody, RequestDescriptor};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error as StdError;
use url::Url;

/// Raw response as returned by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status_code: u16,
    /// URL the request was sent to
    pub url: String,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub body: String,
    pub remote_address: Option<String>,
}

impl RawResponse {
    pub fn new(status_code: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status_code,
            url: url.into(),
            headers: HashMap::new(),
            body: body.into(),
            remote_address: None,
        }
    }
}

/// Failure reported by a transport before a complete response was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub message: String,
    pub kind: TransportErrorKind,
    /// Peer address, if it was resolved before the failure
    pub remote_address: Option<String>,
}

impl TransportFailure {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            remote_address: None,
        }
    }
}

/// Performs one HTTP call described by a [`RequestDescriptor`]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: RequestDescriptor) -> Result<RawResponse, TransportFailure>;
}

/// Default transport backed by the agent's `reqwest::Client`
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn perform(&self, request: RequestDescriptor) -> Result<RawResponse, TransportFailure> {
        let url = Url::parse(&request.url).map_err(|e| {
            TransportFailure::new(
                TransportErrorKind::Other,
                format!("Invalid URI \"{}\": {}", request.url, e),
            )
        })?;

        // Held until the body is read so max_sockets bounds whole exchanges
        let _permit = request.agent.acquire().await;

        let mut builder = request
            .agent
            .client()
            .request(request.method.into(), url)
            .header(reqwest::header::ACCEPT, "application/json");

        let query = request.query_pairs();
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(map) => builder.form(&encode_pairs(map)),
        };

        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(from_reqwest_error)?;

        let status_code = response.status().as_u16();
        let url = response.url().to_string();
        let remote_address = response.remote_addr().map(|addr| addr.ip().to_string());

        let mut headers = HashMap::new();
        for (name, value) in response.headers().iter() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_lowercase(), v.to_string());
            }
        }

        let body = response.text().await.map_err(|e| {
            let mut failure = from_reqwest_error(e);
            failure.remote_address = remote_address.clone();
            failure
        })?;

        Ok(RawResponse {
            status_code,
            url,
            headers,
            body,
            remote_address,
        })
    }
}

fn from_reqwest_error(err: reqwest::Error) -> TransportFailure {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };

    // reqwest keeps the useful part ("operation timed out", "connection
    // refused") in the source chain
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    TransportFailure::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentPool;
    use crate::config::AgentOptions;
    use courier_common::HttpMethod;

    fn descriptor(url: &str) -> RequestDescriptor {
        let pool = AgentPool::new(AgentOptions::default());
        RequestDescriptor {
            method: HttpMethod::Get,
            url: url.to_string(),
            timeout: None,
            agent: pool.get_agent(url).unwrap(),
            timing: false,
            query: None,
            body: RequestBody::None,
        }
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_transport_failure() {
        let failure = ReqwestTransport::new()
            .perform(descriptor("not a url"))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, TransportErrorKind::Other);
        assert!(failure.message.starts_with("Invalid URI \"not a url\""));
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_transport_failure() {
        // Port 1 is reserved and nothing listens on it in test environments
        let failure = ReqwestTransport::new()
            .perform(descriptor("http://127.0.0.1:1/"))
            .await
            .unwrap_err();
        assert_eq!(failure.kind, TransportErrorKind::Connect);
        assert!(!failure.message.is_empty());
    }
}
