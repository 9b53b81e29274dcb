//! Request orchestration
//!
//! [`Requester`] owns a [`RequestConfig`], the per-scheme connection agents and
//! a [`Transport`]. Every operation follows the same steps: resolve and check
//! the timeout, check the caller's parameters, build a [`RequestDescriptor`],
//! hand it to the transport and run the result through the envelope
//! contract. Nothing is retried.

use crate::agent::AgentPool;
use crate::config::{AgentOptions, RequestConfig};
use crate::contract::assert_response;
use crate::error::{CourierError, CourierResult, RequestMeta};
use crate::request::{object_params, required_body, RequestBody, RequestDescriptor};
use crate::response::{RequestResult, ResponseBody, ResponseMeta};
use crate::transport::{ReqwestTransport, Transport};
use crate::validate::check_safe_integer;
use courier_common::HttpMethod;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Request helper bound to one configuration
///
/// # Example
///
/// ```ignore
/// use courier::{Requester, RequestConfig};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let requester = Requester::new(RequestConfig::new().timeout_msecs(5_000))?;
///
///     let result = requester
///         .get("http://users.internal/v1/user", Some(json!({"id": "42"})), None)
///         .await?;
///     println!("{:?}", result.data());
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Requester {
    inner: Arc<RequesterInner>,
}

struct RequesterInner {
    config: RequestConfig,
    agents: AgentPool,
    transport: Arc<dyn Transport>,
}

impl Requester {
    /// Create a requester sending through reqwest
    pub fn new(config: RequestConfig) -> CourierResult<Self> {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    /// Create a requester with a custom transport
    pub fn with_transport(
        config: RequestConfig,
        transport: Arc<dyn Transport>,
    ) -> CourierResult<Self> {
        config.validate()?;
        let agents = AgentPool::new(config.agent_options.clone());

        Ok(Self {
            inner: Arc::new(RequesterInner {
                config,
                agents,
                transport,
            }),
        })
    }

    /// Create a requester from a dynamic JSON config
    pub fn from_value(config: &Value) -> CourierResult<Self> {
        Self::new(RequestConfig::from_value(config)?)
    }

    /// Create a requester with default configuration
    pub fn default_requester() -> CourierResult<Self> {
        Self::new(RequestConfig::default())
    }

    pub fn config(&self) -> &RequestConfig {
        &self.inner.config
    }

    pub fn timeout_msecs(&self) -> u64 {
        self.inner.config.timeout_msecs
    }

    pub fn timing(&self) -> bool {
        self.inner.config.timing
    }

    pub fn agent_options(&self) -> &AgentOptions {
        &self.inner.config.agent_options
    }

    /// Connection agents owned by this requester
    pub fn agents(&self) -> &AgentPool {
        &self.inner.agents
    }

    /// Per-call override when present and non-zero, else the configured default
    fn effective_timeout(&self, timeout_msecs: Option<u64>) -> CourierResult<Option<Duration>> {
        let msecs = match timeout_msecs {
            Some(t) if t > 0 => t,
            _ => self.inner.config.timeout_msecs,
        };
        let msecs = check_safe_integer(msecs, "timeoutMsecs")?;
        Ok((msecs > 0).then(|| Duration::from_millis(msecs)))
    }

    fn descriptor(
        &self,
        method: HttpMethod,
        url: &str,
        timeout: Option<Duration>,
        query: Option<Map<String, Value>>,
        body: RequestBody,
    ) -> CourierResult<RequestDescriptor> {
        Ok(RequestDescriptor {
            method,
            url: url.to_string(),
            timeout,
            agent: self.inner.agents.get_agent(url)?,
            timing: self.inner.config.timing,
            query,
            body,
        })
    }

    async fn execute(&self, descriptor: RequestDescriptor) -> CourierResult<RequestResult> {
        let url = descriptor.url.clone();
        let timing = descriptor.timing;

        debug!(
            method = %descriptor.method,
            url = %url,
            timeout_ms = descriptor.timeout.map(|t| t.as_millis() as u64),
            "Sending request"
        );

        let start = Instant::now();
        let raw = self
            .inner
            .transport
            .perform(descriptor)
            .await
            .map_err(|failure| {
                let err = CourierError::transport(
                    failure.message,
                    failure.kind,
                    RequestMeta {
                        url: url.clone(),
                        remote_address: failure.remote_address,
                    },
                );
                warn!(error = %err.sanitized_message(), "Request failed");
                err
            })?;
        let elapsed = timing.then(|| start.elapsed());

        let result = RequestResult {
            response: ResponseMeta {
                status_code: raw.status_code,
                request_uri: raw.url,
                headers: raw.headers,
                remote_address: raw.remote_address,
                elapsed,
            },
            response_body: ResponseBody::parse(raw.body),
        };

        assert_response(&result)?;
        Ok(result)
    }

    /// GET with optional query parameters
    pub async fn get(
        &self,
        url: &str,
        params: Option<Value>,
        timeout_msecs: Option<u64>,
    ) -> CourierResult<RequestResult> {
        let timeout = self.effective_timeout(timeout_msecs)?;
        let query = object_params(params)?;
        let descriptor = self.descriptor(HttpMethod::Get, url, timeout, query, RequestBody::None)?;
        self.execute(descriptor).await
    }

    /// POST with an `application/x-www-form-urlencoded` body
    pub async fn post_form_urlencoded(
        &self,
        url: &str,
        params: Option<Value>,
        timeout_msecs: Option<u64>,
    ) -> CourierResult<RequestResult> {
        let timeout = self.effective_timeout(timeout_msecs)?;
        let body = match object_params(params)? {
            Some(form) => RequestBody::Form(form),
            None => RequestBody::None,
        };
        let descriptor = self.descriptor(HttpMethod::Post, url, timeout, None, body)?;
        self.execute(descriptor).await
    }

    /// POST with a JSON body. The body is required; `Some(Value::Null)` sends `null`.
    pub async fn post_json(
        &self,
        url: &str,
        body: Option<Value>,
        timeout_msecs: Option<u64>,
    ) -> CourierResult<RequestResult> {
        let timeout = self.effective_timeout(timeout_msecs)?;
        let body = required_body(body)?;
        let descriptor =
            self.descriptor(HttpMethod::Post, url, timeout, None, RequestBody::Json(body))?;
        self.execute(descriptor).await
    }

    /// DELETE with optional query parameters and optional JSON body
    pub async fn delete(
        &self,
        url: &str,
        params: Option<Value>,
        body: Option<Value>,
        timeout_msecs: Option<u64>,
    ) -> CourierResult<RequestResult> {
        let timeout = self.effective_timeout(timeout_msecs)?;
        let query = object_params(params)?;
        let body = body.map(RequestBody::Json).unwrap_or(RequestBody::None);
        let descriptor = self.descriptor(HttpMethod::Delete, url, timeout, query, body)?;
        self.execute(descriptor).await
    }
}

impl std::fmt::Debug for Requester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requester")
            .field("timeout_msecs", &self.inner.config.timeout_msecs)
            .field("timing", &self.inner.config.timing)
            .finish()
    }
}
