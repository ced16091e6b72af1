// src/core/collectors/threat_intel.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{CollectOptions, Collector, CollectorError, configured, fetch_json};
use crate::core::models::{Fragment, FragmentKind, ThreatIntelFragment};

const VIRUSTOTAL_API: &str = "https://www.virustotal.com/api/v3/domains/";
const MAX_CATEGORIES: usize = 5;

/// VirusTotal domain reputation.
pub struct ThreatIntelCollector {
    client: reqwest::Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DomainReport {
    pub data: ReportData,
}

#[derive(Debug, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub attributes: ReportAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportAttributes {
    #[serde(default)]
    pub reputation: i64,
    #[serde(default)]
    pub last_analysis_stats: BTreeMap<String, u32>,
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
}

impl ThreatIntelCollector {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl Collector for ThreatIntelCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::ThreatIntel
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let Some(key) = configured(&self.api_key) else {
            return Ok(None);
        };
        info!(target, "Starting threat intelligence lookup.");

        let request = self
            .client
            .get(format!("{}{}", VIRUSTOTAL_API, target))
            .header("x-apikey", key);
        let report: DomainReport = match fetch_json("VirusTotal", request).await {
            Ok(report) => report,
            Err(CollectorError::Status { status: 404, .. }) => {
                debug!(target, "Domain unknown to VirusTotal.");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let fragment = to_fragment(target, report.data.attributes);
        info!(verdict = %fragment.verdict(), "Threat intelligence lookup finished.");
        Ok(Some(Fragment::ThreatIntel(fragment)))
    }
}

/// `total_engines` is the sum over every verdict bucket the provider reports.
pub fn to_fragment(target: &str, attributes: ReportAttributes) -> ThreatIntelFragment {
    let stat = |name: &str| attributes.last_analysis_stats.get(name).copied().unwrap_or(0);

    ThreatIntelFragment {
        target: target.to_string(),
        reputation: attributes.reputation,
        malicious_count: stat("malicious"),
        suspicious_count: stat("suspicious"),
        harmless_count: stat("harmless"),
        total_engines: attributes.last_analysis_stats.values().sum(),
        categories: attributes
            .categories
            .into_values()
            .take(MAX_CATEGORIES)
            .collect(),
        permalink: format!("https://www.virustotal.com/gui/domain/{}", target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::ThreatVerdict;

    #[test]
    fn report_counts_every_engine() {
        let report: DomainReport = serde_json::from_str(
            r#"{"data":{"attributes":{"reputation":-12,
                "last_analysis_stats":{"malicious":3,"suspicious":1,"harmless":60,"undetected":30,"timeout":0},
                "categories":{"Forcepoint":"phishing","Sophos":"malware"}}}}"#,
        )
        .unwrap();
        let fragment = to_fragment("evil.example", report.data.attributes);
        assert_eq!(fragment.total_engines, 94);
        assert_eq!(fragment.malicious_count, 3);
        assert_eq!(fragment.reputation, -12);
        assert_eq!(fragment.categories.len(), 2);
        assert_eq!(fragment.verdict(), ThreatVerdict::Malicious);
    }

    #[test]
    fn missing_attributes_are_clean() {
        let report: DomainReport = serde_json::from_str(r#"{"data":{}}"#).unwrap();
        let fragment = to_fragment("acme.io", report.data.attributes);
        assert_eq!(fragment.total_engines, 0);
        assert_eq!(fragment.verdict(), ThreatVerdict::Clean);
    }
}
