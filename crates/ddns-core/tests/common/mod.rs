//! Test doubles shared by the integration tests

use async_trait::async_trait;
use axum::{Json, Router, http::StatusCode, routing::get};
use ddns_core::cfg::DetectCfg;
use ddns_provider::{DesiredRecord, DnsProvider, DomainRecord, ProviderError};
use serde_json::json;
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}")
}

/// A URL whose port was free a moment ago, so connecting is refused.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// Echo services: `/v4` plain text, `/v6.json` JSON envelope, `/down` 503.
/// Counts hits on the JSON route.
pub fn echo_app(json_hits: &'static AtomicUsize) -> Router {
    Router::new()
        .route("/v4", get(|| async { "198.51.100.20" }))
        .route(
            "/v6.json",
            get(move || async move {
                json_hits.fetch_add(1, Ordering::SeqCst);
                Json(json!({ "ip": "::1" }))
            }),
        )
        .route(
            "/down",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
        )
}

pub fn detect_cfg(v4: (&str, &str), v6: (&str, &str)) -> DetectCfg {
    DetectCfg {
        ipv4_primary: v4.0.into(),
        ipv4_fallback: v4.1.into(),
        ipv6_primary: v6.0.into(),
        ipv6_fallback: v6.1.into(),
        request_timeout_secs: 5,
        ..Default::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add(DesiredRecord),
    Update(String, DesiredRecord),
}

/// Provider holding a fixed listing and recording every call.
#[derive(Default)]
pub struct FakeProvider {
    pub records: Vec<DomainRecord>,
    pub lists: AtomicUsize,
    pub mutations: Mutex<Vec<Mutation>>,
}

impl FakeProvider {
    pub fn with(records: Vec<DomainRecord>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn list_records(
        &self,
        _domain: &str,
        _rr: &str,
    ) -> Result<Vec<DomainRecord>, ProviderError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    async fn add_record(&self, rec: &DesiredRecord) -> Result<String, ProviderError> {
        self.mutations
            .lock()
            .unwrap()
            .push(Mutation::Add(rec.clone()));
        Ok("rec-new".into())
    }

    async fn update_record(&self, record_id: &str, rec: &DesiredRecord) -> Result<(), ProviderError> {
        self.mutations
            .lock()
            .unwrap()
            .push(Mutation::Update(record_id.into(), rec.clone()));
        Ok(())
    }
}

pub fn record(id: &str, rr: &str, rtype: &str, value: &str) -> DomainRecord {
    DomainRecord {
        record_id: id.into(),
        rr: rr.into(),
        rtype: rtype.into(),
        value: value.into(),
        ttl: Some(600),
    }
}
