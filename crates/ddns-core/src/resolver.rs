//! Public-IP resolver
//!
//! Each address family has two echo services: a *primary* that answers with
//! the bare address as text, and a *fallback* that answers `{"ip": "..."}`.
//! The fallback is only asked when the primary fails for any reason.

use crate::{cfg::DetectCfg, error::CoreError};
use ddns_provider::RecordType;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::{fmt, time::Duration};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl From<RecordType> for AddressFamily {
    fn from(t: RecordType) -> Self {
        if t.is_v6() {
            AddressFamily::V6
        } else {
            AddressFamily::V4
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AddressFamily::V4 => "IPv4",
            AddressFamily::V6 => "IPv6",
        })
    }
}

#[derive(Deserialize)]
struct Address {
    ip: String,
}

pub struct Resolver {
    client: Client,
    ipv4: (String, String),
    ipv6: (String, String),
}

impl Resolver {
    pub fn new(cfg: &DetectCfg) -> Result<Self, CoreError> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .tcp_keepalive(Duration::from_secs(cfg.keepalive_secs))
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(anyhow::Error::from)?;
        Ok(Self {
            client,
            ipv4: (cfg.ipv4_primary.clone(), cfg.ipv4_fallback.clone()),
            ipv6: (cfg.ipv6_primary.clone(), cfg.ipv6_fallback.clone()),
        })
    }

    /// Current public address of `family`, as text.
    pub async fn resolve(&self, family: AddressFamily) -> Result<String, CoreError> {
        let (primary, fallback) = match family {
            AddressFamily::V4 => &self.ipv4,
            AddressFamily::V6 => &self.ipv6,
        };

        match self.fetch_plain(primary).await {
            Ok(ip) => {
                info!("resolve/{family} {primary} -> {ip}");
                return Ok(ip);
            }
            Err(e) => warn!("{e}"),
        }

        let ip = self.fetch_json(fallback).await?;
        info!("resolve/{family} {fallback} -> {ip}");
        Ok(ip)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, CoreError> {
        info!("requesting {url}");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CoreError::Transport {
                url: url.to_owned(),
                source,
            })?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(CoreError::HttpStatus {
                url: url.to_owned(),
                status,
            });
        }
        Ok(resp)
    }

    async fn fetch_plain(&self, url: &str) -> Result<String, CoreError> {
        let body = self
            .get(url)
            .await?
            .text()
            .await
            .map_err(|e| decode_err(url, e))?;
        Ok(body.trim().to_owned())
    }

    async fn fetch_json(&self, url: &str) -> Result<String, CoreError> {
        let body = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| decode_err(url, e))?;
        let addr: Address = serde_json::from_slice(&body).map_err(|e| decode_err(url, e))?;
        Ok(addr.ip)
    }
}

fn decode_err(url: &str, e: impl fmt::Display) -> CoreError {
    CoreError::Decode {
        url: url.to_owned(),
        reason: e.to_string(),
    }
}
