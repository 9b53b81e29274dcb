//! courier: async HTTP request helpers for service-to-service calls
//!
//! Wraps an HTTP transport with four operations (GET, POST form, POST JSON,
//! DELETE) that share timeout handling, per-scheme connection pooling and a
//! strict check of the response envelope returned by the remote service.
//!
//! # Architecture
//!
//! - `Requester`: orchestrates one call from parameter checks to the
//!   validated result
//! - `AgentPool`: one pooled connection agent per scheme, created lazily
//! - `Transport`: the HTTP collaborator (`ReqwestTransport` by default)
//! - `contract::assert_response`: the envelope check every response passes
//! - `global`: process-wide defaults and a shared requester

pub mod agent;
pub mod config;
pub mod contract;
pub mod error;
pub mod global;
pub mod request;
pub mod requester;
pub mod response;
pub mod transport;
pub mod validate;

pub use agent::{AgentPool, ConnectionAgent, Scheme};
pub use config::{AgentOptions, MaxSockets, RequestConfig};
pub use contract::assert_response;
pub use error::{CourierError, CourierResult, InvalidResponseDetails, RequestMeta, TransportErrorKind};
pub use request::{to_serializable, RequestBody, RequestDescriptor};
pub use requester::Requester;
pub use response::{Envelope, RequestResult, ResponseBody, ResponseMeta};
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportFailure};

// Re-export shared HTTP types from courier-common
pub use courier_common::{HttpMethod, HttpStatus};
