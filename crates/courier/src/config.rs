//! Request helper configuration

use crate::error::{CourierError, CourierResult};
use crate::validate;
use serde_json::{Map, Value};
use std::time::Duration;

/// Timeout applied when neither the config nor the call supplies one
pub const DEFAULT_TIMEOUT_MSECS: u64 = 30_000;

/// Upper bound on concurrently open sockets per connection agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxSockets {
    Limited(u64),
    Unbounded,
}

/// Pooling options shared by the plain and encrypted connection agents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOptions {
    /// Keep idle connections open for reuse
    pub keep_alive: Option<bool>,

    /// TCP keep-alive probe interval
    pub keep_alive_msecs: Option<u64>,

    /// Maximum concurrent requests in flight through one agent
    pub max_sockets: Option<MaxSockets>,

    /// Maximum idle connections kept per host
    pub max_free_sockets: Option<u64>,

    /// Idle socket timeout
    pub timeout: Option<u64>,

    /// Unrecognised options, carried through unvalidated
    pub extra: Map<String, Value>,
}

impl AgentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = Some(enabled);
        self
    }

    pub fn keep_alive_msecs(mut self, msecs: u64) -> Self {
        self.keep_alive_msecs = Some(msecs);
        self
    }

    pub fn max_sockets(mut self, max: MaxSockets) -> Self {
        self.max_sockets = Some(max);
        self
    }

    pub fn max_free_sockets(mut self, max: u64) -> Self {
        self.max_free_sockets = Some(max);
        self
    }

    pub fn timeout(mut self, msecs: u64) -> Self {
        self.timeout = Some(msecs);
        self
    }

    /// Returns true when idle connections should be pooled. Off unless
    /// `keep_alive` is set.
    pub fn keeps_alive(&self) -> bool {
        self.keep_alive.unwrap_or(false)
    }

    /// In-flight limit per agent, if any. A limit of `0` means unbounded.
    pub fn socket_limit(&self) -> Option<u64> {
        match self.max_sockets {
            Some(MaxSockets::Limited(0)) => None,
            Some(MaxSockets::Limited(n)) => Some(n),
            Some(MaxSockets::Unbounded) | None => None,
        }
    }
}

/// Configuration owned by one [`Requester`](crate::Requester)
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    /// Default per-call timeout; `0` disables the timeout
    pub timeout_msecs: u64,

    /// Record elapsed time on every response
    pub timing: bool,

    /// Options for the connection agents
    pub agent_options: AgentOptions,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_msecs: DEFAULT_TIMEOUT_MSECS,
            timing: false,
            agent_options: AgentOptions::default(),
        }
    }
}

impl RequestConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default timeout in milliseconds
    pub fn timeout_msecs(mut self, msecs: u64) -> Self {
        self.timeout_msecs = msecs;
        self
    }

    /// Enable or disable response timing
    pub fn timing(mut self, enabled: bool) -> Self {
        self.timing = enabled;
        self
    }

    /// Set the connection agent options
    pub fn agent_options(mut self, options: AgentOptions) -> Self {
        self.agent_options = options;
        self
    }

    /// Default timeout as a `Duration`; `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_msecs > 0).then(|| Duration::from_millis(self.timeout_msecs))
    }

    /// Range-check a config built through the typed API
    pub fn validate(&self) -> CourierResult<()> {
        validate::check_safe_integer(self.timeout_msecs, "config.timeoutMsecs")?;
        validate::check_agent_options(&self.agent_options)
    }

    /// Build a config from a dynamic JSON mapping
    ///
    /// Recognised keys are `timeoutMsecs`, `timing` and `agentOptions`.
    pub fn from_value(value: &Value) -> CourierResult<Self> {
        let map = match value {
            Value::Object(map) => map,
            _ => {
                return Err(CourierError::Config(
                    "config must be a plain object".to_string(),
                ))
            }
        };

        let timeout_msecs =
            validate::validate_timeout(map.get("timeoutMsecs"), "config.timeoutMsecs")?;
        let timing = validate::validate_timing(map.get("timing"))?;
        let agent_options = validate::validate_agent_options(map.get("agentOptions"))?;

        Ok(Self {
            timeout_msecs: timeout_msecs.unwrap_or(DEFAULT_TIMEOUT_MSECS),
            timing: timing.unwrap_or(false),
            agent_options,
        })
    }

    /// Create configuration from environment variables.
    ///
    /// - `COURIER_TIMEOUT_MSECS`, `COURIER_TIMING`
    /// - `COURIER_KEEP_ALIVE`, `COURIER_KEEP_ALIVE_MSECS`
    /// - `COURIER_MAX_SOCKETS` (integer or `Infinity`), `COURIER_MAX_FREE_SOCKETS`
    /// - `COURIER_AGENT_TIMEOUT`
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> CourierResult<Self> {
        let mut config = Self::default();

        if let Some(v) = env_u64("COURIER_TIMEOUT_MSECS")? {
            config.timeout_msecs = v;
        }
        if let Some(v) = env_bool("COURIER_TIMING")? {
            config.timing = v;
        }

        let options = &mut config.agent_options;
        options.keep_alive = env_bool("COURIER_KEEP_ALIVE")?;
        options.keep_alive_msecs = env_u64("COURIER_KEEP_ALIVE_MSECS")?;
        options.max_free_sockets = env_u64("COURIER_MAX_FREE_SOCKETS")?;
        options.timeout = env_u64("COURIER_AGENT_TIMEOUT")?;
        options.max_sockets = match std::env::var("COURIER_MAX_SOCKETS") {
            Ok(raw) if raw.trim().eq_ignore_ascii_case(validate::UNBOUNDED_SENTINEL) => {
                Some(MaxSockets::Unbounded)
            }
            Ok(raw) => Some(MaxSockets::Limited(parse_env_u64("COURIER_MAX_SOCKETS", &raw)?)),
            Err(_) => None,
        };

        config.validate()?;
        Ok(config)
    }
}

fn parse_env_u64(name: &str, raw: &str) -> CourierResult<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        CourierError::Config(format!("{} must be a positive integer, got '{}'", name, raw))
    })
}

fn env_u64(name: &str) -> CourierResult<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => parse_env_u64(name, &raw).map(Some),
        Err(_) => Ok(None),
    }
}

fn env_bool(name: &str) -> CourierResult<Option<bool>> {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(CourierError::Config(format!(
                "{} must be a boolean, got '{}'",
                name, raw
            ))),
        },
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = RequestConfig::default();
        assert_eq!(config.timeout_msecs, 30_000);
        assert!(!config.timing);
        assert_eq!(config.agent_options, AgentOptions::default());
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_keep_alive_is_opt_in() {
        assert!(!AgentOptions::default().keeps_alive());
        assert!(AgentOptions::new().keep_alive(true).keeps_alive());
        assert!(!AgentOptions::new().keep_alive(false).keeps_alive());
    }

    #[test]
    fn test_builder_pattern() {
        let config = RequestConfig::new()
            .timeout_msecs(1_500)
            .timing(true)
            .agent_options(AgentOptions::new().keep_alive(true).max_sockets(MaxSockets::Limited(4)));

        assert_eq!(config.timeout_msecs, 1_500);
        assert!(config.timing);
        assert_eq!(config.agent_options.socket_limit(), Some(4));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables_timeout() {
        let config = RequestConfig::new().timeout_msecs(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_validate_rejects_unsafe_timeout() {
        let config = RequestConfig::new().timeout_msecs(u64::MAX);
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "config.timeoutMsecs must be a positive integer");
    }

    #[test]
    fn test_from_value() {
        let config = RequestConfig::from_value(&json!({
            "timeoutMsecs": 2000,
            "timing": true,
            "agentOptions": {"keepAlive": false, "maxSockets": "Infinity"}
        }))
        .unwrap();

        assert_eq!(config.timeout_msecs, 2000);
        assert!(config.timing);
        assert!(!config.agent_options.keeps_alive());
        assert_eq!(config.agent_options.max_sockets, Some(MaxSockets::Unbounded));
    }

    #[test]
    fn test_from_value_defaults() {
        let config = RequestConfig::from_value(&json!({})).unwrap();
        assert_eq!(config, RequestConfig::default());
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        for bad in [json!([]), json!(null), json!("config"), json!(30000)] {
            let err = RequestConfig::from_value(&bad).unwrap_err();
            assert_eq!(err.to_string(), "config must be a plain object");
        }
    }

    #[test]
    fn test_from_value_rejects_bad_fields() {
        let err = RequestConfig::from_value(&json!({"timeoutMsecs": -1})).unwrap_err();
        assert_eq!(err.to_string(), "config.timeoutMsecs must be a positive integer");

        let err = RequestConfig::from_value(&json!({"timing": "yes"})).unwrap_err();
        assert_eq!(err.to_string(), "config.timing must be a boolean");

        let err = RequestConfig::from_value(&json!({"agentOptions": []})).unwrap_err();
        assert_eq!(err.to_string(), "config.agentOptions must be a plain object");
    }

    // Single test touching the environment to avoid interleaving with parallel tests
    #[test]
    fn test_from_env() {
        let names = [
            "COURIER_TIMEOUT_MSECS",
            "COURIER_TIMING",
            "COURIER_MAX_SOCKETS",
            "COURIER_KEEP_ALIVE",
        ];
        let originals: Vec<_> = names.iter().map(|n| std::env::var(n).ok()).collect();

        std::env::set_var("COURIER_TIMEOUT_MSECS", "2500");
        std::env::set_var("COURIER_TIMING", "true");
        std::env::set_var("COURIER_MAX_SOCKETS", "Infinity");
        std::env::set_var("COURIER_KEEP_ALIVE", "off");

        let config = RequestConfig::from_env().unwrap();
        assert_eq!(config.timeout_msecs, 2500);
        assert!(config.timing);
        assert_eq!(config.agent_options.max_sockets, Some(MaxSockets::Unbounded));
        assert_eq!(config.agent_options.keep_alive, Some(false));

        std::env::set_var("COURIER_TIMEOUT_MSECS", "-3");
        assert!(matches!(
            RequestConfig::from_env(),
            Err(CourierError::Config(_))
        ));

        for (name, original) in names.iter().zip(originals) {
            match original {
                Some(val) => std::env::set_var(name, val),
                None => std::env::remove_var(name),
            }
        }
    }
}
