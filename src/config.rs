use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::access::AccessCodes;

/// Bundled config for builds without a usable working directory (mobile, web)
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_AUTH_URL: &str = "http://127.0.0.1:3000/api/auth";
pub const DEFAULT_WEBHOOK_URL: &str = "https://n8n.pankstr.com/webhook/fifi-chat";
pub const DEFAULT_DAILY_LIMIT: u32 = 50;
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 10_000;
pub const READY_DELAY: Duration = Duration::from_millis(100);

#[cfg(not(target_arch = "wasm32"))]
pub fn load_dotenv() {
    // First try to load from .env file (desktop dev)
    if dotenvy::dotenv().is_ok() {
        return;
    }

    // Fall back to bundled config (mobile builds)
    load_bundled_config();
}

#[cfg(target_arch = "wasm32")]
pub fn load_dotenv() {
    load_bundled_config();
}

fn load_bundled_config() {
    for (key, value) in parse_env_lines(BUNDLED_CONFIG) {
        // Only set if not already set (allow env override)
        if env::var(key).is_err() {
            // SAFETY: We're setting env vars at startup before any threads are spawned
            unsafe {
                env::set_var(key, value);
            }
        }
    }
}

/// `KEY=VALUE` pairs, skipping comments and blank lines.
fn parse_env_lines(source: &str) -> impl Iterator<Item = (&str, &str)> {
    source.lines().filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (key, value) = line.split_once('=')?;
        Some((key.trim(), value.trim()))
    })
}

/// Settings for the chat widget and the webhook relay.
#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    pub webhook_url: String,
    pub daily_limit: u32,
    pub load_timeout: Duration,
    pub ready_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            daily_limit: DEFAULT_DAILY_LIMIT,
            load_timeout: Duration::from_millis(DEFAULT_LOAD_TIMEOUT_MS),
            ready_delay: READY_DELAY,
        }
    }
}

impl RelayConfig {
    pub fn from_env() -> Self {
        Self {
            webhook_url: string_or("AICHAT_WEBHOOK_URL", DEFAULT_WEBHOOK_URL),
            daily_limit: try_load("AICHAT_DAILY_LIMIT", DEFAULT_DAILY_LIMIT),
            load_timeout: Duration::from_millis(try_load(
                "AICHAT_LOAD_TIMEOUT_MS",
                DEFAULT_LOAD_TIMEOUT_MS,
            )),
            ready_delay: READY_DELAY,
        }
    }
}

/// Client-side settings.
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub auth_url: String,
    pub relay: RelayConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            auth_url: string_or("AICHAT_AUTH_URL", DEFAULT_AUTH_URL),
            relay: RelayConfig::from_env(),
        }
    }
}

/// Settings for the `/api/auth` service.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub access_codes: AccessCodes,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: try_load("AICHAT_PORT", DEFAULT_PORT),
            access_codes: AccessCodes::from_env_value(env::var("ACCESS_CODES").ok().as_deref()),
        }
    }
}

fn string_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    parse_or_default(key, env::var(key).ok().as_deref(), default)
}

fn parse_or_default<T>(key: &str, raw: Option<&str>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Some(raw) = raw else {
        info!("{key} not set, using default: {default}");
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }
    }
}
