//! Converge one remote record on the desired state with at most one mutation.

use crate::error::CoreError;
use ddns_provider::{DesiredRecord, DnsProvider, DomainRecord};
use std::{fmt, net::IpAddr};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Created { record_id: String },
    Updated { record_id: String },
    Unchanged { record_id: String },
}

impl Outcome {
    pub fn record_id(&self) -> &str {
        match self {
            Outcome::Created { record_id }
            | Outcome::Updated { record_id }
            | Outcome::Unchanged { record_id } => record_id,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created { record_id } => write!(f, "created record {record_id}"),
            Outcome::Updated { record_id } => write!(f, "updated record {record_id}"),
            Outcome::Unchanged { record_id } => write!(f, "record {record_id} unchanged"),
        }
    }
}

/// Textual compare, except that two parseable addresses compare as addresses
/// (`2001:DB8::1` == `2001:db8:0::1`).
fn same_value(a: &str, b: &str) -> bool {
    match (a.parse::<IpAddr>(), b.parse::<IpAddr>()) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

fn up_to_date(cur: &DomainRecord, want: &DesiredRecord) -> bool {
    same_value(&cur.value, &want.value) && want.ttl.is_none_or(|t| cur.ttl == Some(t))
}

async fn create(provider: &dyn DnsProvider, desired: &DesiredRecord) -> Result<Outcome, CoreError> {
    let record_id = provider.add_record(desired).await?;
    Ok(Outcome::Created { record_id })
}

/// Lists records with the desired RR, then creates, updates or leaves alone.
///
/// Among listed records only those matching both RR and type are candidates;
/// the first candidate in provider order wins. A host that already carries
/// an `A` record gets a separate `AAAA` record instead of having its `A`
/// record rewritten.
pub async fn reconcile(
    provider: &dyn DnsProvider,
    desired: &DesiredRecord,
) -> Result<Outcome, CoreError> {
    let existing = provider
        .list_records(&desired.domain, &desired.rr)
        .await?;
    debug!(
        "{}: {} record(s) listed for {}.{}",
        provider.name(),
        existing.len(),
        desired.rr,
        desired.domain
    );

    if existing.is_empty() {
        return create(provider, desired).await;
    }

    let same_rr: Vec<&DomainRecord> = existing.iter().filter(|r| r.rr == desired.rr).collect();
    if same_rr.is_empty() {
        return Err(CoreError::NotFound(desired.rr.clone()));
    }

    let candidate = same_rr
        .into_iter()
        .find(|r| r.rtype.eq_ignore_ascii_case(desired.rtype.as_str()));

    match candidate {
        Some(cur) if up_to_date(cur, desired) => {
            info!("no change: {desired}");
            Ok(Outcome::Unchanged {
                record_id: cur.record_id.clone(),
            })
        }
        Some(cur) => {
            info!("{} {} -> {}", cur.record_id, cur.value, desired.value);
            provider.update_record(&cur.record_id, desired).await?;
            Ok(Outcome::Updated {
                record_id: cur.record_id.clone(),
            })
        }
        None => {
            info!("no {} record under RR `{}` yet", desired.rtype, desired.rr);
            create(provider, desired).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ddns_provider::{ProviderError, RecordType};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List(String, String),
        Add(DesiredRecord),
        Update(String, DesiredRecord),
    }

    /// In-memory provider that records every call.
    #[derive(Default)]
    struct Recorder {
        records: Vec<DomainRecord>,
        fail_mutations: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn with(records: Vec<DomainRecord>) -> Self {
            Self {
                records,
                ..Default::default()
            }
        }

        fn mutations(&self) -> Vec<Call> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| !matches!(c, Call::List(..)))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl DnsProvider for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn list_records(
            &self,
            domain: &str,
            rr: &str,
        ) -> Result<Vec<DomainRecord>, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::List(domain.into(), rr.into()));
            Ok(self.records.clone())
        }

        async fn add_record(&self, rec: &DesiredRecord) -> Result<String, ProviderError> {
            self.calls.lock().unwrap().push(Call::Add(rec.clone()));
            if self.fail_mutations {
                return Err(ProviderError::Api("QuotaExceeded: too many records".into()));
            }
            Ok("new-1".into())
        }

        async fn update_record(
            &self,
            record_id: &str,
            rec: &DesiredRecord,
        ) -> Result<(), ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Update(record_id.into(), rec.clone()));
            if self.fail_mutations {
                return Err(ProviderError::Api("DomainRecordLocked: locked".into()));
            }
            Ok(())
        }
    }

    fn existing(id: &str, rr: &str, rtype: &str, value: &str) -> DomainRecord {
        DomainRecord {
            record_id: id.into(),
            rr: rr.into(),
            rtype: rtype.into(),
            value: value.into(),
            ttl: Some(600),
        }
    }

    fn desired(rtype: RecordType, value: &str) -> DesiredRecord {
        DesiredRecord {
            domain: "example.com".into(),
            rr: "host".into(),
            rtype,
            value: value.into(),
            ttl: None,
        }
    }

    #[tokio::test]
    async fn empty_listing_creates_once() {
        let p = Recorder::default();
        let want = desired(RecordType::A, "1.2.3.4");

        let out = reconcile(&p, &want).await.unwrap();

        assert_eq!(out, Outcome::Created { record_id: "new-1".into() });
        assert_eq!(p.mutations(), vec![Call::Add(want)]);
        assert_eq!(
            p.calls.lock().unwrap()[0],
            Call::List("example.com".into(), "host".into())
        );
    }

    #[tokio::test]
    async fn identical_record_is_left_alone() {
        let p = Recorder::with(vec![existing("42", "host", "A", "1.2.3.4")]);

        let out = reconcile(&p, &desired(RecordType::A, "1.2.3.4")).await.unwrap();

        assert_eq!(out, Outcome::Unchanged { record_id: "42".into() });
        assert!(p.mutations().is_empty());
    }

    #[tokio::test]
    async fn changed_value_updates_by_id() {
        let p = Recorder::with(vec![existing("42", "host", "A", "1.2.3.4")]);
        let want = desired(RecordType::A, "1.2.3.5");

        let out = reconcile(&p, &want).await.unwrap();

        assert_eq!(out, Outcome::Updated { record_id: "42".into() });
        assert_eq!(p.mutations(), vec![Call::Update("42".into(), want)]);
    }

    #[tokio::test]
    async fn other_type_on_same_rr_is_not_touched() {
        let p = Recorder::with(vec![existing("42", "host", "A", "1.2.3.4")]);
        let want = desired(RecordType::AAAA, "2001:db8::1");

        let out = reconcile(&p, &want).await.unwrap();

        assert_eq!(out, Outcome::Created { record_id: "new-1".into() });
        assert_eq!(p.mutations(), vec![Call::Add(want)]);
    }

    #[tokio::test]
    async fn first_matching_type_wins() {
        let p = Recorder::with(vec![
            existing("41", "host", "A", "9.9.9.9"),
            existing("42", "host", "AAAA", "2001:db8::1"),
            existing("43", "host", "AAAA", "2001:db8::2"),
        ]);
        let want = desired(RecordType::AAAA, "2001:db8::3");

        let out = reconcile(&p, &want).await.unwrap();

        assert_eq!(out.record_id(), "42");
        assert_eq!(p.mutations(), vec![Call::Update("42".into(), want)]);
    }

    #[tokio::test]
    async fn ipv6_values_compare_as_addresses() {
        let p = Recorder::with(vec![existing("42", "host", "aaaa", "2001:DB8:0::1")]);

        let out = reconcile(&p, &desired(RecordType::AAAA, "2001:db8::1"))
            .await
            .unwrap();

        assert!(matches!(out, Outcome::Unchanged { .. }));
        assert!(p.mutations().is_empty());
    }

    #[tokio::test]
    async fn configured_ttl_drift_triggers_update() {
        let p = Recorder::with(vec![existing("42", "host", "A", "1.2.3.4")]);
        let mut want = desired(RecordType::A, "1.2.3.4");
        want.ttl = Some(60);

        let out = reconcile(&p, &want).await.unwrap();

        assert_eq!(out, Outcome::Updated { record_id: "42".into() });
    }

    #[tokio::test]
    async fn listing_without_matching_rr_is_not_found() {
        let p = Recorder::with(vec![existing("42", "other", "A", "1.2.3.4")]);

        let err = reconcile(&p, &desired(RecordType::A, "1.2.3.4"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::NotFound(ref rr) if rr == "host"));
        assert_eq!(err.to_string(), "host not found");
        assert!(p.mutations().is_empty());
    }

    #[tokio::test]
    async fn provider_rejection_surfaces_message() {
        let p = Recorder {
            records: vec![existing("42", "host", "A", "1.2.3.4")],
            fail_mutations: true,
            ..Default::default()
        };

        let err = reconcile(&p, &desired(RecordType::A, "1.2.3.5"))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Provider(_)));
        assert!(err.to_string().contains("DomainRecordLocked"));
    }

    #[tokio::test]
    async fn failed_create_surfaces_message() {
        let p = Recorder {
            fail_mutations: true,
            ..Default::default()
        };
        let want = desired(RecordType::A, "1.2.3.4");

        let err = reconcile(&p, &want).await.unwrap_err();

        assert!(matches!(err, CoreError::Provider(_)));
        assert!(err.to_string().contains("QuotaExceeded: too many records"));
        assert_eq!(p.mutations(), vec![Call::Add(want)]);
    }

    #[test]
    fn non_address_values_compare_as_text() {
        assert!(same_value("foo", "foo"));
        assert!(!same_value("1.2.3.4", "1.2.3.4 "));
        assert!(!same_value("::1", "1.2.3.4"));
    }
}
