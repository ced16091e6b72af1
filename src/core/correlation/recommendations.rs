// src/core/correlation/recommendations.rs

//! Stage 4: remediation guidance keyed on the risk level and on which item
//! categories are present in the attack surface.

use std::collections::HashSet;

use crate::core::models::{AttackSurfaceItem, RiskLevel, SurfaceKind};

const PRIORITY: &[&str] = &[
    "PRIORITY: Immediate security review required",
    "→ Review all high-risk findings and remediate critical exposures",
];

const EXPOSED_FILES: &[&str] = &[
    "Review public code repositories for sensitive data exposure",
    "→ Remove or rotate any exposed credentials immediately",
    "→ Implement pre-commit hooks to prevent future leaks",
];

const SECURITY_HEADERS: &[&str] = &[
    "Implement missing security headers:",
    "   - Content-Security-Policy (CSP)",
    "   - X-Frame-Options (clickjacking protection)",
    "   - Strict-Transport-Security (HSTS)",
];

const SUBDOMAINS: &[&str] = &[
    "Large subdomain attack surface detected:",
    "→ Audit all subdomains for necessity",
    "→ Decommission unused subdomains",
    "→ Ensure all subdomains have same security posture as main domain",
];

const EXPOSED_SERVICES: &[&str] = &[
    "Exposed network services detected:",
    "→ Close or firewall ports that do not need public access",
    "→ Patch services with reported vulnerabilities",
];

const REPUTATION: &[&str] = &[
    "Target has a negative reputation with threat-intelligence providers:",
    "→ Investigate for compromise or malicious hosting",
    "→ Request delisting once the root cause is remediated",
];

pub const ALWAYS: &[&str] = &[
    "Regular OSINT audits recommended (quarterly)",
    "Implement continuous monitoring for new exposures",
];

pub fn recommendations(risk_level: RiskLevel, surface: &[AttackSurfaceItem]) -> Vec<String> {
    let present: HashSet<SurfaceKind> = surface.iter().map(|item| item.item_type).collect();
    let has = |kinds: &[SurfaceKind]| kinds.iter().any(|k| present.contains(k));

    let blocks = [
        (risk_level >= RiskLevel::High, PRIORITY),
        (has(&[SurfaceKind::ExposedFile]), EXPOSED_FILES),
        (has(&[SurfaceKind::SecurityHeader]), SECURITY_HEADERS),
        (has(&[SurfaceKind::Subdomain]), SUBDOMAINS),
        (has(&[SurfaceKind::OpenPort, SurfaceKind::Vulnerability]), EXPOSED_SERVICES),
        (has(&[SurfaceKind::ThreatIntel, SurfaceKind::UnsafeUrl]), REPUTATION),
        (true, ALWAYS),
    ];

    blocks
        .into_iter()
        .filter(|(applies, _)| *applies)
        .flat_map(|(_, lines)| lines.iter().map(|line| line.to_string()))
        .collect()
}
