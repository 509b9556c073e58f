use anyhow::{bail, Result};
use rowport::{ApiClient, Session};

use crate::args::BaseArgs;
use crate::config::{self, Config};

/// Resolve the session from flags/env first, then the global config file.
pub fn resolve_session(base: &BaseArgs) -> Result<Session> {
    let config = config::load_global()?;
    session_from(base, &config)
}

pub fn connect(base: &BaseArgs) -> Result<ApiClient> {
    let session = resolve_session(base)?;
    Ok(ApiClient::new(&session)?)
}

fn session_from(base: &BaseArgs, config: &Config) -> Result<Session> {
    let Some(base_url) = non_empty(base.base_url.as_deref())
        .or_else(|| non_empty(config.base_url.as_deref()))
    else {
        bail!("--base-url required (or set ROWPORT_BASE_URL)");
    };
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        bail!("base URL must start with http:// or https://, got '{base_url}'");
    }
    let Some(token) =
        non_empty(base.token.as_deref()).or_else(|| non_empty(config.token.as_deref()))
    else {
        bail!("--token required (or set ROWPORT_TOKEN)");
    };
    Ok(Session::new(base_url, token))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
