//! Configuration resolution: explicit flag, then `CASELOOKUP_*` environment
//! variable, then the library default.

use anyhow::{Context, Result};
use caselookup::acquisition::RetryPolicy;
use caselookup::LookupConfig;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CASELOOKUP_";

/// Resolve the lookup configuration from the process environment.
pub fn resolve_config(api_key: Option<&str>) -> Result<LookupConfig> {
    resolve_config_with(api_key, |name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
}

/// Same as [`resolve_config`], reading variables (without prefix) through
/// `env`.
pub fn resolve_config_with<F>(api_key: Option<&str>, env: F) -> Result<LookupConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
    let mut config = LookupConfig::default();

    if let Some(url) = env("DATAJUD_URL") {
        config.datajud.base_url = url;
    }
    if let Some(key) = api_key.map(str::to_string).or_else(|| env("DATAJUD_API_KEY")) {
        config.datajud.api_key = key;
    }
    apply_retry(&mut config.datajud.retry, "API", &env)?;

    if let Some(url) = env("ESAJ_G1_URL") {
        config.esaj.first_instance = url;
    }
    if let Some(url) = env("ESAJ_G2_URL") {
        config.esaj.second_instance = url;
    }
    if let Some(url) = env("EPROC_G1_URL") {
        config.eproc.first_instance = url;
    }
    if let Some(url) = env("EPROC_G2_URL") {
        config.eproc.second_instance = url;
    }

    let mut portal = config.esaj.retry;
    apply_retry(&mut portal, "PORTAL", &env)?;
    config.esaj.retry = portal;
    config.eproc.retry = portal;

    Ok(config)
}

fn apply_retry<F>(policy: &mut RetryPolicy, scope: &str, env: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = env(&format!("{scope}_RETRIES")) {
        policy.max_retries = raw
            .trim()
            .parse()
            .with_context(|| format!("{ENV_PREFIX}{scope}_RETRIES is not a number: {raw:?}"))?;
    }
    if let Some(raw) = env(&format!("{scope}_TIMEOUT_MS")) {
        let millis: u64 = raw
            .trim()
            .parse()
            .with_context(|| format!("{ENV_PREFIX}{scope}_TIMEOUT_MS is not a number: {raw:?}"))?;
        policy.timeout = Duration::from_millis(millis);
    }
    Ok(())
}
