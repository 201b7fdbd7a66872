//! Aliyun DNS (Alidns) provider
//!
//! * Lists records under a domain with an *exact* RR search (`DescribeDomainRecords`).
//! * Creates (`AddDomainRecord`) and updates (`UpdateDomainRecord`) `A` / `AAAA` records.
//! * Auth via **AccessKey / AccessSecret** – a RAM sub-account with “Read / Write DNS” is enough.
//! * All API errors are mapped to [`ddns_provider::ProviderError`].
//! * Nothing is cached: every call goes to the API.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::Utc;
use ddns_provider::{DesiredRecord, DnsProvider, DomainRecord, ProviderError};
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use sha1::Sha1;
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, info};

type HmacSha1 = Hmac<Sha1>;

const API_VERSION: &str = "2015-01-09";
/// Upper bound accepted by `DescribeDomainRecords`.
const PAGE_SIZE: &str = "500";

/// Everything except RFC 3986 unreserved characters gets escaped.
const SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode(v: &str) -> String {
    percent_encode(v.as_bytes(), SAFE).to_string()
}

/// `k=v` pairs joined by `&`, both sides encoded, in key order.
fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Base64 HMAC-SHA1 over `GET&%2F&<encoded canonical query>`, keyed with `<secret>&`.
fn sign(secret: &str, canon_query: &str) -> Result<String, ProviderError> {
    let string_to_sign = format!("GET&%2F&{}", encode(canon_query));
    let mut mac = HmacSha1::new_from_slice(format!("{secret}&").as_bytes())
        .map_err(|e| ProviderError::Api(format!("signing key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    Ok(B64.encode(mac.finalize().into_bytes()))
}

/*──────── wire types ────────*/

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeResp {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    domain_records: RecordList,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
struct RecordList {
    #[serde(default)]
    record: Vec<RawRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawRecord {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    rtype: String,
    value: String,
    #[serde(rename = "TTL", default)]
    ttl: Option<u32>,
}

impl From<RawRecord> for DomainRecord {
    fn from(r: RawRecord) -> Self {
        DomainRecord {
            record_id: r.record_id,
            rr: r.rr,
            rtype: r.rtype,
            value: r.value,
            ttl: r.ttl,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordIdResp {
    record_id: String,
}

/*──────── provider struct ────────*/

pub struct AliProvider {
    ak: String,
    sk: String,
    endpoint: String,
    client: Client,
}

impl AliProvider {
    /// `timeout` bounds every API call end to end.
    pub fn new(
        access_key: &str,
        access_sec: &str,
        region: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            ak: access_key.to_owned(),
            sk: access_sec.to_owned(),
            endpoint: format!("https://alidns.{region}.aliyuncs.com/"),
            client: Client::builder()
                .user_agent(concat!("update-alidns/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()?,
        })
    }

    /// Points the provider at another API root (private endpoint, test server).
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_owned();
        self
    }

    /*──────── signed request helper ────────*/

    async fn call<T: DeserializeOwned>(
        &self,
        mut params: BTreeMap<String, String>,
    ) -> Result<T, ProviderError> {
        let action = params.get("Action").cloned().unwrap_or_default();

        // common params
        params.insert("Format".into(), "JSON".into());
        params.insert("Version".into(), API_VERSION.into());
        params.insert("AccessKeyId".into(), self.ak.clone());
        params.insert(
            "Timestamp".into(),
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        params.insert("SignatureMethod".into(), "HMAC-SHA1".into());
        params.insert("SignatureVersion".into(), "1.0".into());
        params.insert("SignatureNonce".into(), uuid::Uuid::new_v4().to_string());

        let canon_query = canonical_query(&params);
        let signature = sign(&self.sk, &canon_query)?;
        let url = format!(
            "{}?Signature={}&{}",
            self.endpoint,
            encode(&signature),
            canon_query
        );

        debug!("alidns {action}");
        let resp: Response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.scrub(e))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.scrub(e))?;
        let v: Option<Value> = serde_json::from_str(&body).ok();

        if status != StatusCode::OK {
            let msg = match &v {
                Some(v) => format!(
                    "{}: {}",
                    v["Code"].as_str().unwrap_or("Unknown"),
                    v["Message"].as_str().unwrap_or("Aliyun error")
                ),
                None => format!("HTTP {status}"),
            };
            return Err(ProviderError::Api(msg));
        }
        let v = v.ok_or_else(|| ProviderError::Api(format!("{action}: response is not JSON")))?;
        serde_json::from_value(v)
            .map_err(|e| ProviderError::Api(format!("{action}: unexpected response: {e}")))
    }

    /// The signed URL carries `AccessKeyId` and `Signature`; errors keep only the endpoint.
    fn scrub(&self, e: reqwest::Error) -> ProviderError {
        match reqwest::Url::parse(&self.endpoint) {
            Ok(u) => ProviderError::Http(e.with_url(u)),
            Err(_) => ProviderError::Http(e.without_url()),
        }
    }

    fn record_params(action: &str, rec: &DesiredRecord) -> BTreeMap<String, String> {
        let mut p = BTreeMap::new();
        p.insert("Action".into(), action.into());
        p.insert("RR".into(), rec.rr.clone());
        p.insert("Type".into(), rec.rtype.as_str().into());
        p.insert("Value".into(), rec.value.clone());
        if let Some(ttl) = rec.ttl {
            p.insert("TTL".into(), ttl.to_string());
        }
        p
    }
}

/*──────── DnsProvider impl ────────*/

#[async_trait]
impl DnsProvider for AliProvider {
    fn name(&self) -> &'static str {
        "Aliyun"
    }

    async fn list_records(
        &self,
        domain: &str,
        rr: &str,
    ) -> Result<Vec<DomainRecord>, ProviderError> {
        let mut p = BTreeMap::new();
        p.insert("Action".into(), "DescribeDomainRecords".into());
        p.insert("DomainName".into(), domain.to_owned());
        p.insert("KeyWord".into(), rr.to_owned());
        p.insert("SearchMode".into(), "EXACT".into());
        p.insert("PageSize".into(), PAGE_SIZE.into());

        let resp: DescribeResp = self.call(p).await?;
        debug!("Aliyun {domain}: {} record(s) match RR `{rr}`", resp.total_count);
        Ok(resp
            .domain_records
            .record
            .into_iter()
            .map(DomainRecord::from)
            .collect())
    }

    async fn add_record(&self, rec: &DesiredRecord) -> Result<String, ProviderError> {
        let mut p = Self::record_params("AddDomainRecord", rec);
        p.insert("DomainName".into(), rec.domain.clone());

        let resp: RecordIdResp = self.call(p).await?;
        info!("Aliyun created record id={}", resp.record_id);
        Ok(resp.record_id)
    }

    async fn update_record(
        &self,
        record_id: &str,
        rec: &DesiredRecord,
    ) -> Result<(), ProviderError> {
        let mut p = Self::record_params("UpdateDomainRecord", rec);
        p.insert("RecordId".into(), record_id.to_owned());

        let _: RecordIdResp = self.call(p).await?;
        info!("Aliyun updated record id={record_id}");
        Ok(())
    }
}
