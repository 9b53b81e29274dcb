//! Common HTTP vocabulary for courier
//!
//! This crate holds the small set of types shared between the request
//! helpers and anything that implements a transport for them.

pub mod http;

pub use http::{HttpMethod, HttpStatus};
