//! Process-wide defaults
//!
//! Convenience layer for callers that do not want to carry a [`Requester`]
//! around. Settings live in one process-wide [`RequestConfig`]; the shared
//! requester is built from it on first use and rebuilt after any setter
//! runs, so new calls always see the latest settings. Calls already in
//! flight keep the requester they started with.

use crate::config::{AgentOptions, RequestConfig};
use crate::error::CourierResult;
use crate::requester::Requester;
use crate::response::RequestResult;
use crate::validate::{check_agent_options, check_safe_integer};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;

#[derive(Default)]
struct GlobalSettings {
    config: RequestConfig,
    requester: Option<Requester>,
}

static GLOBAL_SETTINGS: Lazy<RwLock<GlobalSettings>> =
    Lazy::new(|| RwLock::new(GlobalSettings::default()));

fn update(apply: impl FnOnce(&mut RequestConfig)) {
    let mut settings = GLOBAL_SETTINGS.write();
    apply(&mut settings.config);
    settings.requester = None;
}

/// Default timeout in milliseconds
pub fn get_timeout() -> u64 {
    GLOBAL_SETTINGS.read().config.timeout_msecs
}

/// Set the default timeout; `0` disables it
pub fn set_timeout(timeout_msecs: u64) -> CourierResult<()> {
    check_safe_integer(timeout_msecs, "timeoutMsec")?;
    update(|config| config.timeout_msecs = timeout_msecs);
    Ok(())
}

pub fn get_timing() -> bool {
    GLOBAL_SETTINGS.read().config.timing
}

pub fn set_timing(timing: bool) {
    update(|config| config.timing = timing);
}

pub fn get_agent_options() -> AgentOptions {
    GLOBAL_SETTINGS.read().config.agent_options.clone()
}

/// Replace the agent options. Agents created from the old options are
/// released together with the previous shared requester.
pub fn set_agent_options(options: AgentOptions) -> CourierResult<()> {
    check_agent_options(&options)?;
    update(|config| config.agent_options = options);
    Ok(())
}

/// Snapshot of the current process-wide configuration
pub fn config() -> RequestConfig {
    GLOBAL_SETTINGS.read().config.clone()
}

/// Shared requester built from the current settings
pub fn shared_requester() -> CourierResult<Requester> {
    if let Some(requester) = &GLOBAL_SETTINGS.read().requester {
        return Ok(requester.clone());
    }

    let mut settings = GLOBAL_SETTINGS.write();
    if let Some(requester) = &settings.requester {
        return Ok(requester.clone());
    }
    let requester = Requester::new(settings.config.clone())?;
    settings.requester = Some(requester.clone());
    Ok(requester)
}

/// [`Requester::get`] on the shared requester
pub async fn get(
    url: &str,
    params: Option<Value>,
    timeout_msecs: Option<u64>,
) -> CourierResult<RequestResult> {
    shared_requester()?.get(url, params, timeout_msecs).await
}

/// [`Requester::post_form_urlencoded`] on the shared requester
pub async fn post_form_urlencoded(
    url: &str,
    params: Option<Value>,
    timeout_msecs: Option<u64>,
) -> CourierResult<RequestResult> {
    shared_requester()?
        .post_form_urlencoded(url, params, timeout_msecs)
        .await
}

/// [`Requester::post_json`] on the shared requester
pub async fn post_json(
    url: &str,
    body: Option<Value>,
    timeout_msecs: Option<u64>,
) -> CourierResult<RequestResult> {
    shared_requester()?.post_json(url, body, timeout_msecs).await
}

/// [`Requester::delete`] on the shared requester
pub async fn delete(
    url: &str,
    params: Option<Value>,
    body: Option<Value>,
    timeout_msecs: Option<u64>,
) -> CourierResult<RequestResult> {
    shared_requester()?
        .delete(url, params, body, timeout_msecs)
        .await
}
