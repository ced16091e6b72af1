// src/core/collectors/infrastructure.rs

use std::net::IpAddr;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use serde::Deserialize;
use tracing::{debug, info};

use super::{CollectOptions, Collector, CollectorError, configured, fetch_json};
use crate::core::models::{Fragment, FragmentKind, InfrastructureFragment};

const SHODAN_HOST_URL: &str = "https://api.shodan.io/shodan/host/";

/// Shodan host lookup for the target's first resolved address.
pub struct InfrastructureCollector {
    client: reqwest::Client,
    resolver: TokioAsyncResolver,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShodanHost {
    pub ip_str: Option<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub vulns: Vec<String>,
    pub os: Option<String>,
    pub isp: Option<String>,
    pub country_name: Option<String>,
}

impl InfrastructureCollector {
    pub fn new(client: reqwest::Client, resolver: TokioAsyncResolver, api_key: Option<String>) -> Self {
        Self { client, resolver, api_key }
    }

    async fn resolve(&self, target: &str) -> Result<Option<IpAddr>, CollectorError> {
        if let Ok(ip) = target.parse::<IpAddr>() {
            return Ok(Some(ip));
        }
        match self.resolver.lookup_ip(target).await {
            Ok(lookup) => Ok(lookup.iter().next()),
            Err(e) if matches!(e.kind(), hickory_resolver::error::ResolveErrorKind::NoRecordsFound { .. }) => {
                Ok(None)
            }
            Err(e) => Err(CollectorError::Dns(e.to_string())),
        }
    }
}

#[async_trait]
impl Collector for InfrastructureCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::Infrastructure
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let Some(key) = configured(&self.api_key) else {
            return Ok(None);
        };
        let Some(ip) = self.resolve(target).await? else {
            debug!(target, "Target does not resolve, skipping Shodan lookup.");
            return Ok(None);
        };
        info!(target, %ip, "Starting infrastructure scan.");

        let request = self
            .client
            .get(format!("{}{}", SHODAN_HOST_URL, ip))
            .query(&[("key", key)]);
        let host: ShodanHost = match fetch_json("Shodan", request).await {
            Ok(host) => host,
            Err(CollectorError::Status { status: 404, .. }) => {
                debug!(%ip, "Host not indexed by Shodan.");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let fragment = to_fragment(&ip.to_string(), host);
        info!(
            ports = fragment.ports.len(),
            vulnerabilities = fragment.vulnerabilities.len(),
            "Infrastructure scan finished."
        );
        Ok(Some(Fragment::Infrastructure(fragment)))
    }
}

pub fn to_fragment(ip: &str, host: ShodanHost) -> InfrastructureFragment {
    let mut ports = host.ports;
    ports.sort_unstable();
    ports.dedup();
    let mut vulnerabilities = host.vulns;
    vulnerabilities.sort();

    InfrastructureFragment {
        ip: host.ip_str.unwrap_or_else(|| ip.to_string()),
        ports,
        hostnames: host.hostnames,
        tags: host.tags,
        vulnerabilities,
        os: host.os,
        isp: host.isp,
        country: host.country_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shodan_host_maps_to_fragment() {
        let host: ShodanHost = serde_json::from_str(
            r#"{"ports":[443,22,80,22],"vulns":["CVE-2023-0002","CVE-2021-0001"],
                "hostnames":["web.acme.io"],"isp":"Acme Hosting","country_name":"Germany"}"#,
        )
        .unwrap();
        let fragment = to_fragment("203.0.113.7", host);
        assert_eq!(fragment.ip, "203.0.113.7");
        assert_eq!(fragment.ports, vec![22, 80, 443]);
        assert_eq!(fragment.vulnerabilities[0], "CVE-2021-0001");
        assert_eq!(fragment.country.as_deref(), Some("Germany"));
    }
}
