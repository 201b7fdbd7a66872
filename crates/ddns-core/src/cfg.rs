//! Parse the optional `update-alidns.toml` plus `DDNS_*` env vars into `AppConfig`

use crate::error::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, File};
use ddns_provider::RecordType;
use serde::Deserialize;
use std::{env, path::Path};
use tracing::info;
use validator::Validate;

/// Some IP echo services refuse requests without a browser-like agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36 Edg/137.0.0.0";

/*──────── Detect ────────*/
#[derive(Debug, Clone, Deserialize)]
pub struct DetectCfg {
    /// returns the bare address as text
    #[serde(default = "default_ipv4_primary")]
    pub ipv4_primary: String,
    /// returns `{"ip": "..."}`
    #[serde(default = "default_ipv4_fallback")]
    pub ipv4_fallback: String,
    #[serde(default = "default_ipv6_primary")]
    pub ipv6_primary: String,
    #[serde(default = "default_ipv6_fallback")]
    pub ipv6_fallback: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_dial_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_dial_secs")]
    pub keepalive_secs: u64,
    /// whole-request deadline, also applied to provider calls
    #[serde(default = "default_request_secs")]
    pub request_timeout_secs: u64,
}
fn default_ipv4_primary() -> String {
    "https://4.ipw.cn".into()
}
fn default_ipv4_fallback() -> String {
    "https://ipv4.jsonip.com".into()
}
fn default_ipv6_primary() -> String {
    "https://6.ipw.cn".into()
}
fn default_ipv6_fallback() -> String {
    "https://ipv6.jsonip.com".into()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_dial_secs() -> u64 {
    30
}
fn default_request_secs() -> u64 {
    60
}

impl Default for DetectCfg {
    fn default() -> Self {
        Self {
            ipv4_primary: default_ipv4_primary(),
            ipv4_fallback: default_ipv4_fallback(),
            ipv6_primary: default_ipv6_primary(),
            ipv6_fallback: default_ipv6_fallback(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_dial_secs(),
            keepalive_secs: default_dial_secs(),
            request_timeout_secs: default_request_secs(),
        }
    }
}

/*──────── Provider ────────*/
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProviderCfg {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "no AK"))]
    pub access_key: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "no SK"))]
    pub access_secret: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "no DomainName"))]
    pub domain: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "no RR"))]
    pub rr: String,
    #[serde(default = "default_record_type")]
    pub record_type: String,
    /// explicit record value; empty means "resolve my public IP"
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 86400))]
    pub ttl: Option<u32>,
    /// API root override, e.g. a VPC endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
}
fn default_region() -> String {
    "cn-hangzhou".into()
}
fn default_record_type() -> String {
    "A".into()
}

impl Default for ProviderCfg {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key: String::new(),
            access_secret: String::new(),
            domain: String::new(),
            rr: String::new(),
            record_type: default_record_type(),
            value: None,
            ttl: None,
            endpoint: None,
        }
    }
}

impl ProviderCfg {
    pub fn rtype(&self) -> Result<RecordType, ConfigError> {
        if self.record_type.trim().is_empty() {
            return Err(ConfigError::Invalid("no Type".into()));
        }
        self.record_type.trim().parse().map_err(ConfigError::Invalid)
    }

    pub fn explicit_value(&self) -> Option<&str> {
        self.value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/*──────── Root & AppConfig ────────*/
#[derive(Debug, Deserialize)]
struct Root {
    #[serde(default)]
    detect: Option<DetectCfg>,
    #[serde(default)]
    provider: Option<ProviderCfg>,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub detect: DetectCfg,
    pub provider: ProviderCfg,
}

/// Inject `DDNS_<SECTION>_<FIELD>` variables into a `ConfigBuilder`.
///
/// Only the first `_` after the prefix separates section from field, so
/// `DDNS_PROVIDER_ACCESS_KEY` → `provider.access_key`. Values stay strings;
/// numeric fields are converted on deserialization, and an RR such as `007`
/// keeps its leading zeros.
fn add_scalar_env<I>(
    mut b: ConfigBuilder<DefaultState>,
    prefix: &str,
    vars: I,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    for (k, v) in vars {
        let Some(key) = k.strip_prefix(prefix) else {
            continue;
        };
        let Some((section, field)) = key.split_once('_') else {
            continue; // e.g. DDNS_CONFIG
        };
        let section = section.to_ascii_lowercase();
        if section != "detect" && section != "provider" {
            continue;
        }
        let path = format!("{section}.{}", field.to_ascii_lowercase());
        b = b.set_override(path, v)?;
    }
    Ok(b)
}

fn build<I>(builder: ConfigBuilder<DefaultState>, vars: I) -> Result<AppConfig, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let builder = add_scalar_env(builder, "DDNS_", vars)?;
    let root: Root = builder.build()?.try_deserialize()?;
    Ok(AppConfig {
        detect: root.detect.unwrap_or_default(),
        provider: root.provider.unwrap_or_default(),
    })
}

/// Load configuration from an optional TOML file **and** environment variables.
///
/// Priority (high → low):
/// 1. Environment scalars (`DDNS_PROVIDER_DOMAIN`, `DDNS_DETECT_USER_AGENT`, …)
/// 2. Values in the file (if given and present)
/// 3. Built-in defaults
///
/// Command-line flags are applied on top by the binary. `AK` / `SK` feed the
/// `--ak` / `--sk` flags, so they rank at flag level, above `DDNS_PROVIDER_ACCESS_*`.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    match path {
        Some(p) if Path::new(p).exists() => {
            builder = builder.add_source(File::with_name(p).required(true));
        }
        Some(p) => info!("config file `{p}` not found; flags and environment only"),
        None => {}
    }
    build(builder, env::vars())
}
