// src/core/knowledge_base.rs

//! Static, read-only explanations for every kind of attack-surface item.
//! The UI detail pane looks items up here; the correlation engine never does.

use std::fmt;

use crate::core::models::{AttackSurfaceItem, SurfaceKind};

/// Coarse grouping used for the detail pane heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SurfaceCategory {
    /// Hosts, services and software reachable from the internet.
    Infrastructure,
    /// Data that leaked into public code, search indexes or directories.
    Exposure,
    /// Third-party verdicts about the target.
    Reputation,
    /// Facts about people and phone lines tied to the target.
    Identity,
}

impl fmt::Display for SurfaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceCategory::Infrastructure => write!(f, "Infrastructure"),
            SurfaceCategory::Exposure => write!(f, "Data Exposure"),
            SurfaceCategory::Reputation => write!(f, "Reputation"),
            SurfaceCategory::Identity => write!(f, "Identity"),
        }
    }
}

pub struct SurfaceDetail {
    pub kind: SurfaceKind,
    pub title: &'static str,
    pub category: SurfaceCategory,
    pub description: &'static str,
    pub remediation: &'static str,
}

static DETAILS: &[SurfaceDetail] = &[
    SurfaceDetail {
        kind: SurfaceKind::Subdomain,
        title: "Publicly Logged Subdomain",
        category: SurfaceCategory::Infrastructure,
        description: "This hostname appears in Certificate Transparency logs. Anyone can enumerate it, and forgotten staging or admin hosts are a common entry point.",
        remediation: "Confirm the host is still needed and maintained. Decommission unused subdomains and remove their DNS records to avoid takeover.",
    },
    SurfaceDetail {
        kind: SurfaceKind::Technology,
        title: "Fingerprinted Technology",
        category: SurfaceCategory::Infrastructure,
        description: "The response reveals a product or version. Version disclosure lets an attacker match the site against known vulnerabilities without probing further.",
        remediation: "Suppress version banners in server and framework configuration, and keep the component patched.",
    },
    SurfaceDetail {
        kind: SurfaceKind::SecurityHeader,
        title: "Security Header Missing",
        category: SurfaceCategory::Infrastructure,
        description: "Browsers rely on response headers to enable protections such as HTTPS pinning, script restrictions and framing rules. Without them those protections stay off.",
        remediation: "Add the header at the web server or CDN layer so that every response carries it.",
    },
    SurfaceDetail {
        kind: SurfaceKind::ExposedFile,
        title: "Sensitive File in Public Code",
        category: SurfaceCategory::Exposure,
        description: "A public repository contains a file that references this target and looks like configuration, credentials or internal endpoints.",
        remediation: "Rotate any credential that appears in the file, remove it from the repository history, and add pre-commit secret scanning.",
    },
    SurfaceDetail {
        kind: SurfaceKind::OpenPort,
        title: "Open Network Port",
        category: SurfaceCategory::Infrastructure,
        description: "An internet-wide scanner observed this port accepting connections. Services other than HTTP and HTTPS are rarely meant to be public.",
        remediation: "Restrict the port with a firewall or security group, or bind the service to a private interface.",
    },
    SurfaceDetail {
        kind: SurfaceKind::Vulnerability,
        title: "Known Vulnerability",
        category: SurfaceCategory::Infrastructure,
        description: "A service banner on this host matches a published CVE. Exploits for listed CVEs are often automated.",
        remediation: "Upgrade the affected service to a fixed release, or apply the vendor mitigation until an upgrade is possible.",
    },
    SurfaceDetail {
        kind: SurfaceKind::ThreatIntel,
        title: "Negative Threat-Intelligence Verdict",
        category: SurfaceCategory::Reputation,
        description: "Security vendors flag this target. Users and mail gateways that consult these feeds may block it.",
        remediation: "Check the host for compromise or malicious content, clean it, then request re-evaluation from the flagging vendors.",
    },
    SurfaceDetail {
        kind: SurfaceKind::UnsafeUrl,
        title: "URL Listed as Unsafe",
        category: SurfaceCategory::Reputation,
        description: "The URL is on a browser safe-browsing list. Major browsers show an interstitial warning to every visitor.",
        remediation: "Remove the malware or phishing content, then request a review through the search console of the listing provider.",
    },
    SurfaceDetail {
        kind: SurfaceKind::SearchExposure,
        title: "Sensitive Search Result",
        category: SurfaceCategory::Exposure,
        description: "A search engine indexed a page or file that matches a sensitive query, such as a directory listing, log or configuration file.",
        remediation: "Remove the file from the web root, deny access at the server, and request removal from the search index.",
    },
    SurfaceDetail {
        kind: SurfaceKind::HarvestedEmail,
        title: "Harvestable Email Address",
        category: SurfaceCategory::Identity,
        description: "This address is publicly associated with the domain. Listed addresses are the first targets of phishing and password-spraying campaigns.",
        remediation: "Train listed staff on phishing, enforce multi-factor authentication, and prefer role addresses for public contact points.",
    },
    SurfaceDetail {
        kind: SurfaceKind::PhoneLine,
        title: "Phone Line Observation",
        category: SurfaceCategory::Identity,
        description: "The number is invalid or is a VOIP line. VOIP numbers are cheap to obtain and are common in fraud and account-recovery abuse.",
        remediation: "Do not rely on this number for identity verification or account recovery.",
    },
];

/// Header-specific remediation, used in place of the generic header advice.
static HEADER_REMEDIATION: &[(&str, &str)] = &[
    ("Strict-Transport-Security", "Send 'Strict-Transport-Security: max-age=31536000; includeSubDomains; preload'."),
    ("Content-Security-Policy", "Define trusted sources for scripts, styles and other assets. Start restrictive and open up as needed."),
    ("X-Frame-Options", "Set 'X-Frame-Options' to 'DENY', or 'SAMEORIGIN' if the site frames itself."),
    ("X-Content-Type-Options", "Set 'X-Content-Type-Options: nosniff'."),
    ("X-XSS-Protection", "Set 'X-XSS-Protection: 0' and rely on a Content-Security-Policy instead."),
    ("Referrer-Policy", "Set 'Referrer-Policy: strict-origin-when-cross-origin' or stricter."),
    ("Permissions-Policy", "Disable browser features the site does not use, e.g. 'camera=(), microphone=(), geolocation=()'."),
];

/// Retrieves the static detail for an item type.
///
/// # Arguments
///
/// * `kind` - The attack-surface item type.
pub fn detail_for(kind: SurfaceKind) -> Option<&'static SurfaceDetail> {
    DETAILS.iter().find(|d| d.kind == kind)
}

/// Remediation text for a concrete item. Missing-header items get advice for
/// their specific header when one is known.
pub fn remediation_for(item: &AttackSurfaceItem) -> Option<&'static str> {
    if item.item_type == SurfaceKind::SecurityHeader {
        let header = item.name.trim_start_matches("Missing ");
        if let Some((_, text)) = HEADER_REMEDIATION.iter().find(|(name, _)| *name == header) {
            return Some(text);
        }
    }
    detail_for(item.item_type).map(|d| d.remediation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{FragmentKind, RiskLevel};
    use strum::IntoEnumIterator;

    #[test]
    fn every_surface_kind_is_documented() {
        for kind in SurfaceKind::iter() {
            assert!(detail_for(kind).is_some(), "missing detail for {kind}");
        }
    }

    #[test]
    fn header_items_get_specific_remediation() {
        let item = AttackSurfaceItem::new(
            SurfaceKind::SecurityHeader,
            "Missing X-Content-Type-Options",
            RiskLevel::Medium,
            "",
            FragmentKind::TechStack,
        );
        assert_eq!(remediation_for(&item), Some("Set 'X-Content-Type-Options: nosniff'."));
    }
}
