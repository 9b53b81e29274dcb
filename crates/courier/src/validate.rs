//! Configuration validation
//!
//! Everything supplied from outside (constructor config, process-wide
//! settings, per-call timeouts) passes through these checks before it is
//! trusted. The checks are pure: they either hand back the normalized value
//! or fail with [`CourierError::Config`].

use crate::config::{AgentOptions, MaxSockets};
use crate::error::{CourierError, CourierResult};
use serde_json::{Map, Value};

/// Largest integer representable without loss in an IEEE-754 double (2^53 - 1).
///
/// Timeouts and socket counts frequently come from JSON produced by other
/// runtimes, so the same bound is kept on the Rust side.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Sentinel accepted for an unbounded `maxSockets`
pub const UNBOUNDED_SENTINEL: &str = "Infinity";

fn positive_integer_error(label: &str) -> CourierError {
    CourierError::Config(format!("{} must be a positive integer", label))
}

/// Interpret a JSON value as a non-negative safe integer.
///
/// Integral floats (`30000.0`) are accepted, matching how JSON numbers are
/// read by most producers.
pub fn as_safe_integer(value: &Value) -> Option<u64> {
    let number = match value {
        Value::Number(number) => number,
        _ => return None,
    };
    if let Some(n) = number.as_u64() {
        return (n <= MAX_SAFE_INTEGER).then_some(n);
    }
    if number.is_i64() {
        return None;
    }
    let f = number.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= 0.0 && f <= MAX_SAFE_INTEGER as f64 {
        Some(f as u64)
    } else {
        None
    }
}

/// Range check for an already-typed timeout or counter.
pub fn check_safe_integer(value: u64, label: &str) -> CourierResult<u64> {
    if value > MAX_SAFE_INTEGER {
        return Err(positive_integer_error(label));
    }
    Ok(value)
}

/// Validate an optional timeout-like value. Absent is fine; `0` is valid.
pub fn validate_timeout(value: Option<&Value>, label: &str) -> CourierResult<Option<u64>> {
    match value {
        None => Ok(None),
        Some(v) => as_safe_integer(v)
            .map(Some)
            .ok_or_else(|| positive_integer_error(label)),
    }
}

/// Validate the timing flag.
pub fn validate_timing(value: Option<&Value>) -> CourierResult<Option<bool>> {
    match value {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(CourierError::Config(
            "config.timing must be a boolean".to_string(),
        )),
    }
}

fn validate_max_sockets(value: &Value) -> CourierResult<MaxSockets> {
    let invalid = || {
        CourierError::Config(
            "config.agentOptions.maxSockets must be a positive integer or Infinity".to_string(),
        )
    };

    match value {
        Value::String(s) if s.eq_ignore_ascii_case(UNBOUNDED_SENTINEL) => Ok(MaxSockets::Unbounded),
        Value::Number(_) => as_safe_integer(value)
            .map(MaxSockets::Limited)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}

/// Validate connection agent options supplied as a JSON mapping.
///
/// Each known field is checked only when present; unknown fields are kept
/// untouched in [`AgentOptions::extra`].
pub fn validate_agent_options(value: Option<&Value>) -> CourierResult<AgentOptions> {
    let map = match value {
        None => return Ok(AgentOptions::default()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(CourierError::Config(
                "config.agentOptions must be a plain object".to_string(),
            ))
        }
    };

    let mut options = AgentOptions::default();
    let mut extra = Map::new();

    for (key, field) in map {
        match key.as_str() {
            "keepAlive" => match field {
                Value::Bool(b) => options.keep_alive = Some(*b),
                _ => {
                    return Err(CourierError::Config(
                        "config.agentOptions.keepAlive must be a boolean".to_string(),
                    ))
                }
            },
            "keepAliveMsecs" => {
                options.keep_alive_msecs =
                    validate_timeout(Some(field), "config.agentOptions.keepAliveMsecs")?;
            }
            "maxSockets" => options.max_sockets = Some(validate_max_sockets(field)?),
            "maxFreeSockets" => {
                options.max_free_sockets =
                    validate_timeout(Some(field), "config.agentOptions.maxFreeSockets")?;
            }
            "timeout" => {
                options.timeout = validate_timeout(Some(field), "config.agentOptions.timeout")?;
            }
            _ => {
                extra.insert(key.clone(), field.clone());
            }
        }
    }

    options.extra = extra;
    Ok(options)
}

/// Range checks for options built through the typed API.
pub(crate) fn check_agent_options(options: &AgentOptions) -> CourierResult<()> {
    if let Some(v) = options.keep_alive_msecs {
        check_safe_integer(v, "config.agentOptions.keepAliveMsecs")?;
    }
    if let Some(MaxSockets::Limited(v)) = options.max_sockets {
        if v > MAX_SAFE_INTEGER {
            return Err(CourierError::Config(
                "config.agentOptions.maxSockets must be a positive integer or Infinity"
                    .to_string(),
            ));
        }
    }
    if let Some(v) = options.max_free_sockets {
        check_safe_integer(v, "config.agentOptions.maxFreeSockets")?;
    }
    if let Some(v) = options.timeout {
        check_safe_integer(v, "config.agentOptions.timeout")?;
    }
    Ok(())
}
