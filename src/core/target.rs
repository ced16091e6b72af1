// src/core/target.rs

//! Target normalization, classification and the default safety policy.
//!
//! Validation (`validate_request`) catches malformed input before a scan
//! record exists. The safety policy is a separate seam: it decides whether a
//! well-formed target may be scanned at all.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::core::error::ScanError;
use crate::core::models::{ScanCategory, ScanRequest};

const MAX_TARGET_LEN: usize = 255;
const FORBIDDEN_CHARS: &[char] = &['<', '>', '"', '\'', ';', '&', '|', '`'];

static RE_DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$").unwrap()
});
static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());
static RE_USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{3,30}$").unwrap());
static RE_PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9 ()-]{7,20}$").unwrap());

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "::1"];
const PRIVATE_PREFIXES: &[&str] = &[
    "10.", "172.16.", "172.17.", "172.18.", "172.19.", "172.20.", "172.21.", "172.22.",
    "172.23.", "172.24.", "172.25.", "172.26.", "172.27.", "172.28.", "172.29.", "172.30.",
    "172.31.", "192.168.",
];
const SENSITIVE_SUFFIXES: &[&str] = &[".gov", ".mil", ".edu"];

/// Checks and normalizes a scan request.
///
/// Domain-like targets lose any scheme, path or port; every target except a
/// phone number is lowercased.
pub fn validate_request(request: &ScanRequest) -> Result<ScanRequest, ScanError> {
    let raw = request.target.trim();
    if raw.is_empty() {
        return Err(ScanError::Validation("Target cannot be empty".into()));
    }
    if raw.len() > MAX_TARGET_LEN {
        return Err(ScanError::Validation("Target too long".into()));
    }
    if raw.contains(FORBIDDEN_CHARS) {
        return Err(ScanError::Validation("Invalid characters in target".into()));
    }

    let target = match request.category {
        ScanCategory::Domain | ScanCategory::Full => host_of(raw).to_lowercase(),
        ScanCategory::Email | ScanCategory::Username => raw.to_lowercase(),
        ScanCategory::Phone => raw.to_string(),
    };

    Ok(ScanRequest { target, category: request.category, deep_scan: request.deep_scan })
}

/// Extracts the host part of something that may be a bare domain or a URL.
pub fn host_of(input: &str) -> String {
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    Url::parse(&with_scheme)
        .ok()
        .and_then(|url| url.host_str().map(String::from))
        .unwrap_or_else(|| input.to_string())
}

/// The domain portion of an email address.
pub fn mail_domain(email: &str) -> Option<&str> {
    email.split_once('@').map(|(_, domain)| domain).filter(|d| !d.is_empty())
}

pub fn is_well_formed_email(raw: &str) -> bool {
    RE_EMAIL.is_match(raw)
}

/// Best-effort guess of the category a raw target belongs to. Never returns
/// `Full`, which is only ever an explicit choice.
pub fn classify(raw: &str) -> ScanCategory {
    let raw = raw.trim();
    if raw.contains('@') {
        ScanCategory::Email
    } else if RE_PHONE.is_match(raw) && raw.chars().filter(char::is_ascii_digit).count() >= 7 {
        ScanCategory::Phone
    } else if raw.contains('.') {
        ScanCategory::Domain
    } else {
        ScanCategory::Username
    }
}

/// Authorization seam consulted before a scan record is created. A denial
/// is a request-level error, never a scan failure.
pub trait TargetPolicy: Send + Sync {
    fn check(&self, target: &str, category: ScanCategory) -> Result<(), String>;
}

/// Refuses local and private addresses, government/military/education
/// domains, configured block-list entries, and targets whose format does not
/// match their category.
#[derive(Debug, Clone)]
pub struct DefaultTargetPolicy {
    blocked_targets: Vec<String>,
}

impl DefaultTargetPolicy {
    pub fn new(blocked_targets: Vec<String>) -> Self {
        Self { blocked_targets: blocked_targets.into_iter().map(|b| b.to_lowercase()).collect() }
    }

    fn is_blocked(&self, host: &str) -> bool {
        self.blocked_targets.iter().any(|blocked| match blocked.strip_prefix('*') {
            Some(suffix) => host.ends_with(suffix),
            None => host == blocked,
        })
    }
}

impl TargetPolicy for DefaultTargetPolicy {
    fn check(&self, target: &str, category: ScanCategory) -> Result<(), String> {
        let target = target.trim().to_lowercase();

        let host = match category {
            ScanCategory::Domain | ScanCategory::Full => Some(target.as_str()),
            ScanCategory::Email => mail_domain(&target),
            ScanCategory::Username | ScanCategory::Phone => None,
        };

        if let Some(host) = host {
            if LOCAL_HOSTS.contains(&host)
                || host.ends_with(".localhost")
                || PRIVATE_PREFIXES.iter().any(|p| host.starts_with(p))
            {
                return Err("Cannot scan local or internal targets".into());
            }
            if let Some(suffix) = SENSITIVE_SUFFIXES.iter().find(|s| host.ends_with(*s)) {
                return Err(format!("Scanning {} domains is not permitted", suffix));
            }
            if self.is_blocked(host) {
                return Err(format!("Target '{}' is on the block list", host));
            }
        }

        let well_formed = match category {
            ScanCategory::Domain | ScanCategory::Full => RE_DOMAIN.is_match(&target),
            ScanCategory::Email => RE_EMAIL.is_match(&target),
            ScanCategory::Username => RE_USERNAME.is_match(&target),
            ScanCategory::Phone => RE_PHONE.is_match(&target),
        };
        if !well_formed {
            debug!(target = %target, category = %category, "Target failed format check.");
            return Err(format!("Invalid {} format", category));
        }

        Ok(())
    }
}
