// src/core/collectors/email.rs

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{CollectOptions, Collector, CollectorError, configured};
use crate::core::models::{EmailFragment, EmailRisk, Fragment, FragmentKind};
use crate::core::target::{is_well_formed_email, mail_domain};

const HIBP_URL: &str = "https://haveibeenpwned.com/api/v3/breachedaccount/";

const DISPOSABLE_DOMAINS: &[&str] = &[
    "tempmail.com",
    "guerrillamail.com",
    "10minutemail.com",
    "mailinator.com",
    "trash-mail.com",
    "throwaway.email",
    "temp-mail.org",
    "getnada.com",
    "maildrop.cc",
    "yopmail.com",
    "fakeinbox.com",
];

static LOCAL_PART_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"^[a-z]{2,}\.[a-z]{2,}$", "firstname.lastname"),
        (r"^[a-z]\.[a-z]+$", "f.lastname"),
        (r"^[a-z]+\.[a-z]$", "firstname.l"),
        (r"^[a-z]+_[a-z]+$", "firstname_lastname"),
        (r"^[a-z]+$", "firstnamelastname"),
    ]
    .into_iter()
    .map(|(re, name)| (Regex::new(re).unwrap(), name))
    .collect()
});

/// Format, MX, disposable-provider and breach checks for one address.
pub struct EmailCollector {
    client: reqwest::Client,
    resolver: TokioAsyncResolver,
    hibp_key: Option<String>,
}

impl EmailCollector {
    pub fn new(client: reqwest::Client, resolver: TokioAsyncResolver, hibp_key: Option<String>) -> Self {
        Self { client, resolver, hibp_key }
    }

    async fn mx_records(&self, domain: &str) -> Vec<String> {
        match self.resolver.mx_lookup(domain).await {
            Ok(lookup) => {
                let mut records: Vec<_> = lookup.iter().collect();
                records.sort_by_key(|r| r.preference());
                records
                    .into_iter()
                    .map(|r| r.exchange().to_string().trim_end_matches('.').to_string())
                    .collect()
            }
            Err(e) => {
                debug!(domain, error = %e, "MX lookup failed.");
                Vec::new()
            }
        }
    }

    /// Number of known breaches, or `None` when the check could not run.
    async fn breach_count(&self, email: &str) -> Option<usize> {
        let key = configured(&self.hibp_key)?;
        let response = self
            .client
            .get(format!("{}{}", HIBP_URL, email))
            .query(&[("truncateResponse", "true")])
            .header("hibp-api-key", key)
            .send()
            .await;

        match response {
            Ok(r) if r.status() == reqwest::StatusCode::NOT_FOUND => Some(0),
            Ok(r) if r.status().is_success() => match r.json::<Vec<Value>>().await {
                Ok(breaches) => Some(breaches.len()),
                Err(e) => {
                    warn!(error = %e, "Could not decode breach response.");
                    None
                }
            },
            Ok(r) => {
                warn!(status = %r.status(), "Breach lookup rejected.");
                None
            }
            Err(e) => {
                warn!(error = %e, "Breach lookup failed.");
                None
            }
        }
    }
}

#[async_trait]
impl Collector for EmailCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::Email
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let email = target.trim().to_lowercase();
        info!(target = %email, "Starting email scan.");

        let domain = match mail_domain(&email) {
            Some(domain) if is_well_formed_email(&email) => domain.to_string(),
            _ => {
                info!("Email address is malformed.");
                return Ok(Some(Fragment::Email(EmailFragment {
                    email,
                    risk: EmailRisk::High,
                    ..Default::default()
                })));
            }
        };

        let (mx_records, breaches) =
            tokio::join!(self.mx_records(&domain), self.breach_count(&email));

        let mut fragment = EmailFragment {
            valid_format: true,
            mx_valid: !mx_records.is_empty(),
            mx_records,
            disposable: is_disposable(&domain),
            pattern: local_part_pattern(&email).map(String::from),
            breach_found: breaches.is_some_and(|n| n > 0),
            breach_count: breaches.unwrap_or(0),
            email,
            risk: EmailRisk::Unknown,
        };
        fragment.risk = assess_risk(&fragment);

        info!(risk = %fragment.risk, breaches = fragment.breach_count, "Email scan finished.");
        Ok(Some(Fragment::Email(fragment)))
    }
}

pub fn is_disposable(domain: &str) -> bool {
    DISPOSABLE_DOMAINS.contains(&domain.to_lowercase().as_str())
}

/// Naming convention of the local part, if it follows a common one.
pub fn local_part_pattern(email: &str) -> Option<&'static str> {
    let local = email.split('@').next()?.to_lowercase();
    LOCAL_PART_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(&local))
        .map(|(_, name)| *name)
}

/// Malformed addresses are high risk outright. Otherwise each of missing MX,
/// disposable provider and breach exposure counts as one factor.
pub fn assess_risk(fragment: &EmailFragment) -> EmailRisk {
    if !fragment.valid_format {
        return EmailRisk::High;
    }
    let factors = [!fragment.mx_valid, fragment.disposable, fragment.breach_found]
        .iter()
        .filter(|f| **f)
        .count();
    match factors {
        0 => EmailRisk::Low,
        1 => EmailRisk::Medium,
        _ => EmailRisk::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_describe_common_conventions() {
        assert_eq!(local_part_pattern("jane.doe@acme.io"), Some("firstname.lastname"));
        assert_eq!(local_part_pattern("j.doe@acme.io"), Some("f.lastname"));
        assert_eq!(local_part_pattern("jane.d@acme.io"), Some("firstname.l"));
        assert_eq!(local_part_pattern("jdoe@acme.io"), Some("firstnamelastname"));
        assert_eq!(local_part_pattern("jd1987@acme.io"), None);
    }

    #[test]
    fn initials_are_not_mistaken_for_full_names() {
        assert_eq!(local_part_pattern("a.b@acme.io"), Some("f.lastname"));
        assert_eq!(local_part_pattern("j.smith@acme.io"), Some("f.lastname"));
        assert_eq!(local_part_pattern("john.s@acme.io"), Some("firstname.l"));
        assert_eq!(local_part_pattern("john_smith@acme.io"), Some("firstname_lastname"));
    }

    #[test]
    fn disposable_providers_are_recognized() {
        assert!(is_disposable("Mailinator.com"));
        assert!(!is_disposable("acme.io"));
    }

    #[test]
    fn risk_counts_factors() {
        let mut fragment = EmailFragment { valid_format: true, mx_valid: true, ..Default::default() };
        assert_eq!(assess_risk(&fragment), EmailRisk::Low);
        fragment.breach_found = true;
        assert_eq!(assess_risk(&fragment), EmailRisk::Medium);
        fragment.disposable = true;
        assert_eq!(assess_risk(&fragment), EmailRisk::High);
        assert_eq!(assess_risk(&EmailFragment::default()), EmailRisk::High);
    }
}
