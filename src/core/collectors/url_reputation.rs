// src/core/collectors/url_reputation.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{CollectOptions, Collector, CollectorError, configured, fetch_json};
use crate::core::models::{Fragment, FragmentKind, UrlReputationFragment};

const SAFE_BROWSING_URL: &str = "https://safebrowsing.googleapis.com/v4/threatMatches:find";
const THREAT_TYPES: &[&str] = &[
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "UNWANTED_SOFTWARE",
    "POTENTIALLY_HARMFUL_APPLICATION",
];

/// Google Safe Browsing lookup of the target's landing URL.
pub struct UrlReputationCollector {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThreatMatches {
    #[serde(default)]
    pub matches: Vec<ThreatMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatMatch {
    pub threat_type: String,
}

impl UrlReputationCollector {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Collector for UrlReputationCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::UrlReputation
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let Some(key) = configured(&self.api_key) else {
            return Ok(None);
        };
        let url = landing_url(target);
        info!(url = %url, "Checking URL reputation.");

        let body = json!({
            "client": { "clientId": env!("CARGO_PKG_NAME"), "clientVersion": env!("CARGO_PKG_VERSION") },
            "threatInfo": {
                "threatTypes": THREAT_TYPES,
                "platformTypes": ["ANY_PLATFORM"],
                "threatEntryTypes": ["URL"],
                "threatEntries": [{ "url": url }],
            }
        });
        let request = self.client.post(SAFE_BROWSING_URL).query(&[("key", key)]).json(&body);
        let response: ThreatMatches = fetch_json("Safe Browsing", request).await?;

        let fragment = to_fragment(url, response);
        info!(safe = fragment.is_safe, "URL reputation check finished.");
        Ok(Some(Fragment::UrlReputation(fragment)))
    }
}

pub fn landing_url(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("https://{}/", target)
    }
}

pub fn to_fragment(url: String, response: ThreatMatches) -> UrlReputationFragment {
    let mut threats: Vec<String> = response.matches.into_iter().map(|m| m.threat_type).collect();
    threats.sort();
    threats.dedup();
    UrlReputationFragment { url, is_safe: threats.is_empty(), threats }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_response_is_safe() {
        let response: ThreatMatches = serde_json::from_str("{}").unwrap();
        let fragment = to_fragment(landing_url("acme.io"), response);
        assert!(fragment.is_safe);
        assert_eq!(fragment.url, "https://acme.io/");
    }

    #[test]
    fn matches_are_deduplicated_threat_types() {
        let response: ThreatMatches = serde_json::from_str(
            r#"{"matches":[{"threatType":"MALWARE"},{"threatType":"SOCIAL_ENGINEERING"},{"threatType":"MALWARE"}]}"#,
        )
        .unwrap();
        let fragment = to_fragment("https://evil.example/".into(), response);
        assert!(!fragment.is_safe);
        assert_eq!(fragment.threats, vec!["MALWARE", "SOCIAL_ENGINEERING"]);
    }
}
