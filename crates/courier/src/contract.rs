//! Response envelope contract
//!
//! Every response must be a JSON object (or array) shaped as
//!
//! - `200 OK`: `{"data": <any>}`
//! - anything else: `{"error": {"code": <non-negative int>, "message": <string>}}`
//!
//! [`assert_response`] rejects anything else with
//! [`CourierError::InvalidResponseFormat`].

use crate::error::{CourierError, CourierResult, InvalidResponseDetails};
use crate::response::RequestResult;
use crate::validate::as_safe_integer;
use serde_json::Value;
use tracing::warn;

pub const NOT_JSON: &str = "Response body is not a json";
pub const MISSING_DATA: &str = "200 OK response must contain \"data\" field";
pub const MISSING_ERROR_FIELDS: &str =
    "Not 200 OK response must contain both \"error.code\" and \"error.message\" fields";
pub const INVALID_ERROR_CODE: &str =
    "Not 200 OK response must contain positive int as an \"error.code\"";
pub const INVALID_ERROR_MESSAGE: &str =
    "Not 200 OK response must contain string as an \"error.message\"";

fn violation(message: &str, result: &RequestResult) -> CourierError {
    warn!(
        status = result.response.status_code,
        uri = %result.response.request_uri,
        "{}",
        message
    );
    CourierError::invalid_response(
        message,
        InvalidResponseDetails::new(
            result.response.status_code,
            result.response.request_uri.clone(),
            &result.response_body.to_text(),
        ),
    )
}

/// Validate a response against the envelope contract.
///
/// Leaves the result untouched on success.
pub fn assert_response(result: &RequestResult) -> CourierResult<()> {
    let body = match result.response_body.as_json() {
        Some(value @ (Value::Object(_) | Value::Array(_))) => value,
        _ => return Err(violation(NOT_JSON, result)),
    };

    if result.response.status().is_ok() {
        return match body.get("data") {
            Some(_) => Ok(()),
            None => Err(violation(MISSING_DATA, result)),
        };
    }

    let error = body.get("error");
    let code = error.and_then(|e| e.get("code"));
    let message = error.and_then(|e| e.get("message"));

    let (code, message) = match (code, message) {
        (Some(code), Some(message)) => (code, message),
        _ => return Err(violation(MISSING_ERROR_FIELDS, result)),
    };

    if as_safe_integer(code).is_none() {
        return Err(violation(INVALID_ERROR_CODE, result));
    }

    if !message.is_string() {
        return Err(violation(INVALID_ERROR_MESSAGE, result));
    }

    Ok(())
}
