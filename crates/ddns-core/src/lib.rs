//! ddns-core – resolve the public IP and converge one Alidns record on it

pub mod cfg;
pub mod error;
pub mod reconciler;
pub mod resolver;

use cfg::{AppConfig, ProviderCfg};
use ddns_provider::{DesiredRecord, DnsProvider};
use error::{ConfigError, CoreError};
use reconciler::{Outcome, reconcile};
use resolver::Resolver;
use tracing::info;
use validator::Validate;

pub use cfg::load_config;

/// What a sync run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub record: DesiredRecord,
    pub outcome: Outcome,
}

/// Resolves the public address matching the configured record type.
pub async fn show_ip(cfg: &AppConfig) -> Result<String, CoreError> {
    let rtype = cfg.provider.rtype()?;
    info!("Type: {rtype}");
    Resolver::new(&cfg.detect)?.resolve(rtype.into()).await
}

/// Full run against the configured provider.
pub async fn sync(cfg: &AppConfig) -> Result<SyncReport, CoreError> {
    let provider = build_provider(cfg)?;
    let resolver = Resolver::new(&cfg.detect)?;
    sync_with(provider.as_ref(), &resolver, &cfg.provider).await
}

/// Validates `p`, fills in the value from `resolver` when none is given,
/// then reconciles. No request is made before validation passes.
pub async fn sync_with(
    provider: &dyn DnsProvider,
    resolver: &Resolver,
    p: &ProviderCfg,
) -> Result<SyncReport, CoreError> {
    let rtype = p.rtype()?;
    info!("Type: {rtype}");
    p.validate().map_err(ConfigError::from)?;
    info!("DomainName: {}", p.domain);
    info!("RR: {}", p.rr);

    let value = match p.explicit_value() {
        Some(v) => v.to_owned(),
        None => resolver.resolve(rtype.into()).await?,
    };
    info!("Value: {value}");

    let record = DesiredRecord {
        domain: p.domain.clone(),
        rr: p.rr.clone(),
        rtype,
        value,
        ttl: p.ttl,
    };
    let outcome = reconcile(provider, &record).await?;
    info!("{}: {outcome}", provider.name());
    Ok(SyncReport { record, outcome })
}

#[cfg(feature = "ddns-provider-aliyun")]
fn build_provider(cfg: &AppConfig) -> Result<Box<dyn DnsProvider>, CoreError> {
    use std::time::Duration;

    let p = &cfg.provider;
    let mut ali = ddns_provider_aliyun::AliProvider::new(
        &p.access_key,
        &p.access_secret,
        &p.region,
        Duration::from_secs(cfg.detect.request_timeout_secs),
    )?;
    if let Some(ep) = p.endpoint.as_deref() {
        ali = ali.with_endpoint(ep);
    }
    Ok(Box::new(ali))
}

#[cfg(not(feature = "ddns-provider-aliyun"))]
fn build_provider(_cfg: &AppConfig) -> Result<Box<dyn DnsProvider>, CoreError> {
    Err(anyhow::anyhow!("built without the `ddns-provider-aliyun` feature").into())
}
