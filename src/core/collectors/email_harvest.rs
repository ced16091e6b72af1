// src/core/collectors/email_harvest.rs

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{CollectOptions, Collector, CollectorError, configured, fetch_json};
use crate::core::models::{EmailHarvestFragment, Fragment, FragmentKind, HarvestedEmail};

const HUNTER_URL: &str = "https://api.hunter.io/v2/domain-search";
const HARVEST_LIMIT: &str = "25";

/// Hunter domain search for publicly listed addresses.
pub struct EmailHarvestCollector {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DomainSearch {
    pub data: DomainSearchData,
}

#[derive(Debug, Default, Deserialize)]
pub struct DomainSearchData {
    pub pattern: Option<String>,
    #[serde(default)]
    pub emails: Vec<HunterEmail>,
}

#[derive(Debug, Deserialize)]
pub struct HunterEmail {
    pub value: String,
    pub position: Option<String>,
    #[serde(default)]
    pub confidence: u8,
}

impl EmailHarvestCollector {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Collector for EmailHarvestCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::EmailHarvest
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let Some(key) = configured(&self.api_key) else {
            return Ok(None);
        };
        info!(target, "Starting email harvest.");

        let request = self.client.get(HUNTER_URL).query(&[
            ("domain", target),
            ("api_key", key),
            ("limit", HARVEST_LIMIT),
        ]);
        let response: DomainSearch = fetch_json("Hunter", request).await?;

        let fragment = to_fragment(target, response.data);
        info!(emails = fragment.emails.len(), "Email harvest finished.");
        Ok(Some(Fragment::EmailHarvest(fragment)))
    }
}

/// Addresses sorted by confidence, most certain first.
pub fn to_fragment(domain: &str, data: DomainSearchData) -> EmailHarvestFragment {
    let mut emails: Vec<HarvestedEmail> = data
        .emails
        .into_iter()
        .map(|e| HarvestedEmail {
            address: e.value.to_lowercase(),
            position: e.position.filter(|p| !p.is_empty()),
            confidence: e.confidence.min(100),
        })
        .collect();
    emails.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    let mut seen = HashSet::new();
    emails.retain(|e| seen.insert(e.address.clone()));

    EmailHarvestFragment {
        domain: domain.to_string(),
        pattern: data.pattern.filter(|p| !p.is_empty()),
        emails,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_sorted_by_confidence() {
        let response: DomainSearch = serde_json::from_str(
            r#"{"data":{"pattern":"{first}.{last}","emails":[
                {"value":"ops@acme.io","position":"","confidence":60},
                {"value":"Jane.Doe@acme.io","position":"CTO","confidence":97}]}}"#,
        )
        .unwrap();
        let fragment = to_fragment("acme.io", response.data);
        assert_eq!(fragment.pattern.as_deref(), Some("{first}.{last}"));
        assert_eq!(fragment.emails[0].address, "jane.doe@acme.io");
        assert_eq!(fragment.emails[0].position.as_deref(), Some("CTO"));
        assert_eq!(fragment.emails[1].position, None);
    }

    #[tokio::test]
    async fn no_key_no_request() {
        let collector = EmailHarvestCollector::new(reqwest::Client::new(), None);
        let outcome = collector.collect("acme.io", &CollectOptions::default()).await.unwrap();
        assert!(outcome.is_none());
    }
}
