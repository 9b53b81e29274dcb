//! Connection agents
//!
//! A [`ConnectionAgent`] is a pooled client for one transport scheme. Each
//! [`AgentPool`] owns at most one agent per scheme, created on first use from
//! the pool's [`AgentOptions`] and reused until the pool is dropped.

use crate::config::AgentOptions;
use crate::error::{CourierError, CourierResult};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Transport scheme an agent serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Plain `http`
    Plain,
    /// Encrypted `https`
    Encrypted,
}

impl Scheme {
    /// Classify a URL by its prefix. Anything not starting with `https`
    /// goes through the plain agent.
    pub fn of(url: &str) -> Self {
        let is_https = url
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("https"));
        if is_https {
            Scheme::Encrypted
        } else {
            Scheme::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Plain => "http",
            Scheme::Encrypted => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pooled connection manager for one scheme
pub struct ConnectionAgent {
    scheme: Scheme,
    client: reqwest::Client,
    slots: Option<Arc<Semaphore>>,
    options: AgentOptions,
}

impl ConnectionAgent {
    /// Build an agent from validated options
    pub fn new(scheme: Scheme, options: &AgentOptions) -> CourierResult<Self> {
        let mut builder = reqwest::Client::builder();

        if options.keeps_alive() {
            let idle = options
                .max_free_sockets
                .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
                .unwrap_or(usize::MAX);
            builder = builder
                .pool_max_idle_per_host(idle)
                .tcp_keepalive(options.keep_alive_msecs.map(Duration::from_millis));
        } else {
            builder = builder.pool_max_idle_per_host(0);
        }

        if let Some(idle_timeout) = options.timeout {
            builder = builder.pool_idle_timeout(Duration::from_millis(idle_timeout));
        }

        let client = builder.build().map_err(|e| {
            CourierError::Config(format!("failed to create {} agent: {}", scheme, e))
        })?;

        let slots = options.socket_limit().map(|limit| {
            let permits = usize::try_from(limit)
                .unwrap_or(usize::MAX)
                .min(Semaphore::MAX_PERMITS);
            Arc::new(Semaphore::new(permits))
        });

        Ok(Self {
            scheme,
            client,
            slots,
            options: options.clone(),
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The pooled client requests are sent through
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Wait for an in-flight slot when `max_sockets` is limited.
    ///
    /// The permit must be held until the response body has been read.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.slots {
            // The semaphore is never closed while the agent is alive
            Some(slots) => slots.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    /// Free in-flight slots, `None` when unbounded
    pub fn available_slots(&self) -> Option<usize> {
        self.slots.as_ref().map(|s| s.available_permits())
    }
}

impl fmt::Debug for ConnectionAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionAgent")
            .field("scheme", &self.scheme)
            .field("options", &self.options)
            .finish()
    }
}

/// Lazily created agents, one slot per scheme
#[derive(Debug)]
pub struct AgentPool {
    options: AgentOptions,
    plain: OnceCell<Arc<ConnectionAgent>>,
    encrypted: OnceCell<Arc<ConnectionAgent>>,
}

impl AgentPool {
    pub fn new(options: AgentOptions) -> Self {
        Self {
            options,
            plain: OnceCell::new(),
            encrypted: OnceCell::new(),
        }
    }

    fn slot(&self, scheme: Scheme) -> &OnceCell<Arc<ConnectionAgent>> {
        match scheme {
            Scheme::Plain => &self.plain,
            Scheme::Encrypted => &self.encrypted,
        }
    }

    /// Agent for the URL's scheme, created on first request
    pub fn get_agent(&self, url: &str) -> CourierResult<Arc<ConnectionAgent>> {
        let scheme = Scheme::of(url);
        self.slot(scheme)
            .get_or_try_init(|| {
                debug!(scheme = %scheme, "Creating connection agent");
                ConnectionAgent::new(scheme, &self.options).map(Arc::new)
            })
            .cloned()
    }

    /// Returns true once the agent for `scheme` exists
    pub fn is_created(&self, scheme: Scheme) -> bool {
        self.slot(scheme).get().is_some()
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }
}
