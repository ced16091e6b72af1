// src/core/collectors/domain.rs

use std::collections::HashSet;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hickory_resolver::TokioAsyncResolver;
use native_tls::TlsConnector;
use serde::Deserialize;
use serde_json::Value;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};
use x509_parser::prelude::*;

use super::{CollectOptions, Collector, CollectorError, fetch_json};
use crate::core::models::{
    CertificateInfo, DnsData, DomainFragment, Fragment, FragmentKind, MxRecord, RegistrationData,
    Subdomain,
};

const CRT_SH_URL: &str = "https://crt.sh/";
const RDAP_URL: &str = "https://rdap.org/domain/";
const TLS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Registration data (RDAP), DNS records, Certificate Transparency
/// subdomains and, for deep scans, the served TLS certificate.
pub struct DomainCollector {
    client: reqwest::Client,
    resolver: TokioAsyncResolver,
    max_subdomains: usize,
}

impl DomainCollector {
    pub fn new(client: reqwest::Client, resolver: TokioAsyncResolver, max_subdomains: usize) -> Self {
        Self { client, resolver, max_subdomains }
    }

    async fn registration(&self, domain: &str) -> Option<RegistrationData> {
        let request = self.client.get(format!("{}{}", RDAP_URL, domain));
        match fetch_json::<Value>("RDAP", request).await {
            Ok(body) => Some(parse_rdap(&body, Utc::now())),
            Err(e) => {
                warn!(domain, error = %e, "RDAP lookup failed.");
                None
            }
        }
    }

    async fn subdomains(&self, domain: &str) -> Vec<Subdomain> {
        let request = self
            .client
            .get(CRT_SH_URL)
            .query(&[("q", format!("%.{}", domain)), ("output", "json".to_string())]);
        match fetch_json::<Vec<CrtShEntry>>("crt.sh", request).await {
            Ok(entries) => {
                debug!(domain, entries = entries.len(), "Certificate Transparency entries fetched.");
                parse_crtsh(&entries, domain, self.max_subdomains)
            }
            Err(e) => {
                warn!(domain, error = %e, "Subdomain discovery failed.");
                Vec::new()
            }
        }
    }

    async fn dns(&self, domain: &str) -> DnsData {
        let dmarc_name = format!("_dmarc.{}", domain);
        let (a, aaaa, mx, ns, txt, dmarc) = tokio::join!(
            self.resolver.ipv4_lookup(domain),
            self.resolver.ipv6_lookup(domain),
            self.resolver.mx_lookup(domain),
            self.resolver.ns_lookup(domain),
            self.resolver.txt_lookup(domain),
            self.resolver.txt_lookup(dmarc_name.as_str()),
        );

        let txt: Vec<String> = txt
            .map(|l| l.iter().map(|r| r.to_string()).collect())
            .unwrap_or_default();
        let spf = txt.iter().find(|r| r.starts_with("v=spf1")).cloned();
        let dmarc = dmarc
            .ok()
            .and_then(|l| l.iter().map(|r| r.to_string()).find(|r| r.starts_with("v=DMARC1")));

        let mut mx: Vec<MxRecord> = mx
            .map(|l| {
                l.iter()
                    .map(|r| MxRecord {
                        preference: r.preference(),
                        exchange: r.exchange().to_string().trim_end_matches('.').to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        mx.sort_by_key(|r| r.preference);

        DnsData {
            a: a.map(|l| l.iter().map(|r| r.to_string()).collect()).unwrap_or_default(),
            aaaa: aaaa.map(|l| l.iter().map(|r| r.to_string()).collect()).unwrap_or_default(),
            mx,
            ns: ns
                .map(|l| l.iter().map(|r| r.to_string().trim_end_matches('.').to_string()).collect())
                .unwrap_or_default(),
            txt,
            spf,
            dmarc,
        }
    }
}

#[async_trait]
impl Collector for DomainCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::Domain
    }

    async fn collect(
        &self,
        target: &str,
        options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let domain = target.strip_prefix("www.").unwrap_or(target).to_string();
        info!(target = %domain, deep = options.deep_scan, "Starting domain scan.");

        let certificate = async {
            if !options.deep_scan {
                return None;
            }
            let host = domain.clone();
            match spawn_blocking(move || fetch_certificate(&host)).await {
                Ok(Ok(cert)) => Some(cert),
                Ok(Err(e)) => {
                    warn!(error = %e, "TLS certificate probe failed.");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "TLS certificate task panicked.");
                    None
                }
            }
        };

        let (registration, dns, subdomains, certificate) = tokio::join!(
            self.registration(&domain),
            self.dns(&domain),
            self.subdomains(&domain),
            certificate,
        );

        if registration.is_none() && dns.a.is_empty() && dns.aaaa.is_empty() && subdomains.is_empty()
        {
            // Nothing resolved and nothing registered: the domain does not exist
            // as far as public sources can tell.
            info!(target = %domain, "Domain scan found nothing.");
            return Ok(None);
        }

        let mut fragment = DomainFragment {
            ip_addresses: dns.a.clone(),
            subdomain_count: subdomains.len(),
            domain,
            registration,
            dns,
            subdomains,
            certificate,
            insights: Vec::new(),
        };
        fragment.insights = insights(&fragment);

        info!(subdomains = fragment.subdomain_count, "Domain scan finished.");
        Ok(Some(Fragment::Domain(fragment)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CrtShEntry {
    #[serde(default)]
    pub name_value: String,
    pub entry_timestamp: Option<String>,
}

/// Extracts unique subdomains of `domain` from crt.sh entries. Wildcards are
/// stripped, the apex itself is skipped, and at most `max` are kept.
pub fn parse_crtsh(entries: &[CrtShEntry], domain: &str, max: usize) -> Vec<Subdomain> {
    let suffix = format!(".{}", domain);
    let mut seen = HashSet::new();
    let mut subdomains = Vec::new();

    for entry in entries {
        for name in entry.name_value.split('\n') {
            let name = name.trim().to_lowercase();
            let name = name.trim_start_matches("*.");
            if !name.ends_with(&suffix) || !seen.insert(name.to_string()) {
                continue;
            }
            subdomains.push(Subdomain {
                name: name.to_string(),
                source: "crt.sh".to_string(),
                first_seen: entry.entry_timestamp.clone(),
            });
            if subdomains.len() >= max {
                return subdomains;
            }
        }
    }
    subdomains
}

/// Reads registrar and registration/expiration events from an RDAP response.
pub fn parse_rdap(body: &Value, now: DateTime<Utc>) -> RegistrationData {
    let event = |action: &str| -> Option<DateTime<Utc>> {
        body.get("events")?
            .as_array()?
            .iter()
            .find(|e| e.get("eventAction").and_then(Value::as_str) == Some(action))?
            .get("eventDate")?
            .as_str()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc))
    };

    let registrar = body
        .get("entities")
        .and_then(Value::as_array)
        .and_then(|entities| {
            entities.iter().find(|e| {
                e.get("roles")
                    .and_then(Value::as_array)
                    .is_some_and(|roles| roles.iter().any(|r| r.as_str() == Some("registrar")))
            })
        })
        .and_then(vcard_name);

    let created = event("registration");
    RegistrationData {
        registrar,
        created,
        expires: event("expiration"),
        age_days: created.map(|c| (now - c).num_days()),
    }
}

/// The `fn` property of an entity's jCard.
fn vcard_name(entity: &Value) -> Option<String> {
    entity
        .get("vcardArray")?
        .get(1)?
        .as_array()?
        .iter()
        .find(|prop| prop.get(0).and_then(Value::as_str) == Some("fn"))?
        .get(3)?
        .as_str()
        .map(String::from)
}

fn fetch_certificate(host: &str) -> Result<CertificateInfo, CollectorError> {
    debug!(host, "Performing TLS connection and handshake.");
    let connector = TlsConnector::new().map_err(|e| CollectorError::Task(format!("TlsConnector Error: {}", e)))?;

    let addr = (host, 443)
        .to_socket_addrs()
        .map_err(|e| CollectorError::Dns(e.to_string()))?
        .next()
        .ok_or_else(|| CollectorError::Dns(format!("no address for {}", host)))?;
    let stream = TcpStream::connect_timeout(&addr, TLS_CONNECT_TIMEOUT)
        .map_err(|e| CollectorError::Task(format!("TCP Connection Error: {}", e)))?;
    stream
        .set_read_timeout(Some(TLS_CONNECT_TIMEOUT))
        .map_err(|e| CollectorError::Task(e.to_string()))?;

    let stream = connector
        .connect(host, stream)
        .map_err(|e| CollectorError::Task(format!("TLS Handshake Error: {}", e)))?;
    let cert = stream
        .peer_certificate()
        .map_err(|e| CollectorError::Task(format!("Could not get peer certificate: {}", e)))?
        .ok_or_else(|| CollectorError::Decode("TLS session without peer certificate".into()))?;
    let der = cert
        .to_der()
        .map_err(|e| CollectorError::Decode(format!("certificate DER: {}", e)))?;
    let (_, x509) = parse_x509_certificate(&der)
        .map_err(|e| CollectorError::Decode(format!("X.509 certificate: {}", e)))?;

    let validity = x509.validity();
    let not_before = asn1_to_utc(&validity.not_before);
    let not_after = asn1_to_utc(&validity.not_after);
    let now = Utc::now();
    debug!(subject = %x509.subject(), issuer = %x509.issuer(), "Parsed peer certificate.");

    Ok(CertificateInfo {
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        not_before,
        not_after,
        days_until_expiry: not_after.signed_duration_since(now).num_days(),
        is_valid: now > not_before && now < not_after,
    })
}

fn asn1_to_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}

fn insights(fragment: &DomainFragment) -> Vec<String> {
    let mut lines = Vec::new();

    match &fragment.certificate {
        Some(cert) if cert.is_valid => lines.push(format!(
            "TLS certificate valid, expires in {} days",
            cert.days_until_expiry
        )),
        Some(_) => lines.push("TLS certificate is expired or not yet valid".to_string()),
        None => {}
    }

    lines.push(match fragment.dns.spf {
        Some(_) => "SPF record configured".to_string(),
        None => "No SPF record found (email spoofing risk)".to_string(),
    });
    lines.push(match fragment.dns.dmarc {
        Some(_) => "DMARC record configured".to_string(),
        None => "No DMARC record found".to_string(),
    });

    if let Some(days) = fragment.age_days().filter(|d| *d > 0) {
        let years = days as f64 / 365.0;
        if years < 1.0 {
            lines.push(format!("Domain is relatively new ({:.1} years old)", years));
        } else {
            lines.push(format!("Domain is {:.1} years old (established)", years));
        }
    }

    match fragment.subdomain_count {
        0 => {}
        n if n > 20 => lines.push(format!("Large attack surface: {} subdomains discovered", n)),
        n => lines.push(format!("{} subdomains found via Certificate Transparency", n)),
    }

    lines
}
