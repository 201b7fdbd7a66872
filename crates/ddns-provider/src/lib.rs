use async_trait::async_trait;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordType {
    A,
    AAAA,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
        }
    }

    pub fn is_v6(&self) -> bool {
        matches!(self, RecordType::AAAA)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("A") {
            Ok(RecordType::A)
        } else if s.eq_ignore_ascii_case("AAAA") {
            Ok(RecordType::AAAA)
        } else {
            Err(format!("bad record type `{s}` (expected A or AAAA)"))
        }
    }
}

/// A record as currently stored by the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainRecord {
    pub record_id: String,
    pub rr: String,
    /// Kept as text: the provider may list CNAME, TXT, MX ... under the same RR.
    pub rtype: String,
    pub value: String,
    pub ttl: Option<u32>,
}

/// The record state a run wants to converge on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredRecord {
    pub domain: String,
    pub rr: String,
    pub rtype: RecordType,
    pub value: String,
    pub ttl: Option<u32>,
}

impl fmt::Display for DesiredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {} {}", self.rr, self.domain, self.rtype, self.value)
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Records under `domain` whose RR equals `rr` exactly, in provider order.
    async fn list_records(&self, domain: &str, rr: &str)
    -> Result<Vec<DomainRecord>, ProviderError>;

    /// Creates `rec` and returns the new record id.
    async fn add_record(&self, rec: &DesiredRecord) -> Result<String, ProviderError>;

    async fn update_record(&self, record_id: &str, rec: &DesiredRecord)
    -> Result<(), ProviderError>;
}
