// src/core/correlation/scoring.rs

//! Stage 1: risk scoring. Every fragment contributes an independent, capped
//! point total; the sum is clamped to 100.

use crate::core::models::{
    CodeExposureFragment, DomainFragment, EmailFragment, EmailHarvestFragment, EmailRisk,
    Fragment, FragmentSet, InfrastructureFragment, PhoneFragment, SearchExposureFragment,
    TechnologyFragment, ThreatIntelFragment, ThreatVerdict, UrlReputationFragment,
    UsernameFragment,
};

pub const MAX_SCORE: u32 = 100;

/// Sums the per-fragment contributions. Addition commutes, so the result is
/// independent of the order fragments were collected in.
pub fn risk_score(fragments: &FragmentSet) -> u8 {
    let total = fragments
        .iter()
        .map(fragment_points)
        .fold(0u32, u32::saturating_add);
    total.min(MAX_SCORE) as u8
}

pub fn fragment_points(fragment: &Fragment) -> u32 {
    match fragment {
        Fragment::Domain(f) => domain_points(f),
        Fragment::TechStack(f) => tech_points(f),
        Fragment::CodeExposure(f) => code_points(f),
        Fragment::Email(f) => email_points(f),
        Fragment::Username(f) => username_points(f),
        Fragment::Phone(f) => phone_points(f),
        Fragment::Infrastructure(f) => infrastructure_points(f),
        Fragment::ThreatIntel(f) => threat_points(f),
        Fragment::UrlReputation(f) => url_points(f),
        Fragment::SearchExposure(f) => search_points(f),
        Fragment::EmailHarvest(f) => harvest_points(f),
    }
}

/// `count * per_item`, capped.
fn capped(count: usize, per_item: u32, cap: u32) -> u32 {
    uncapped(count, per_item).min(cap)
}

fn uncapped(count: usize, per_item: u32) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX).saturating_mul(per_item)
}

fn domain_points(f: &DomainFragment) -> u32 {
    let age = match f.age_days() {
        Some(days) if days > 0 && days < 365 => 15,
        Some(days) if days > 0 && days < 730 => 8,
        _ => 0,
    };
    let subdomains = match f.subdomain_count {
        n if n > 50 => 15,
        n if n > 20 => 10,
        n if n > 10 => 5,
        _ => 0,
    };
    age + subdomains
}

fn tech_points(f: &TechnologyFragment) -> u32 {
    let missing = f.missing_headers().count();
    let versioned = f.technologies.iter().filter(|t| t.version.is_some()).count();
    let no_cdn = if f.cdn.is_none() { 5 } else { 0 };
    capped(missing, 3, 12) + capped(versioned, 2, 8) + no_cdn
}

fn code_points(f: &CodeExposureFragment) -> u32 {
    let any_findings = if f.findings.is_empty() { 0 } else { 5 };
    let many_repos = if f.total_repos_found > 5 { 5 } else { 0 };
    capped(f.high_risk_findings, 10, 20) + any_findings + many_repos
}

fn email_points(f: &EmailFragment) -> u32 {
    let assessment = match f.risk {
        EmailRisk::High => 10,
        EmailRisk::Medium => 5,
        EmailRisk::Low | EmailRisk::Unknown => 0,
    };
    let breached = if f.breach_found { 5 } else { 0 };
    assessment + breached
}

fn username_points(f: &UsernameFragment) -> u32 {
    let spread = if f.total_platforms > 5 { 3 } else { 0 };
    let code_host = if f.github_profile.is_some() { 2 } else { 0 };
    spread + code_host
}

fn phone_points(f: &PhoneFragment) -> u32 {
    let invalid = if f.valid { 0 } else { 5 };
    let voip = if f.is_voip() { 3 } else { 0 };
    invalid + voip
}

fn infrastructure_points(f: &InfrastructureFragment) -> u32 {
    capped(f.ports.len(), 2, 10).saturating_add(uncapped(f.vulnerabilities.len(), 5))
}

fn threat_points(f: &ThreatIntelFragment) -> u32 {
    match f.verdict() {
        ThreatVerdict::Malicious => 20,
        ThreatVerdict::Suspicious => 10,
        ThreatVerdict::Clean => 0,
    }
}

fn url_points(f: &UrlReputationFragment) -> u32 {
    if f.is_safe { 0 } else { 30 }
}

fn search_points(f: &SearchExposureFragment) -> u32 {
    capped(f.sensitive_hits().count(), 5, 20)
}

fn harvest_points(f: &EmailHarvestFragment) -> u32 {
    capped(f.emails.len(), 1, 10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{HarvestedEmail, HeaderCheck, RegistrationData, Technology};

    fn domain(age_days: Option<i64>, subdomain_count: usize) -> DomainFragment {
        DomainFragment {
            domain: "example.com".into(),
            registration: Some(RegistrationData { age_days, ..Default::default() }),
            subdomain_count,
            ..Default::default()
        }
    }

    #[test]
    fn domain_age_and_subdomain_tiers() {
        assert_eq!(domain_points(&domain(Some(100), 0)), 15);
        assert_eq!(domain_points(&domain(Some(364), 0)), 15);
        assert_eq!(domain_points(&domain(Some(365), 0)), 8);
        assert_eq!(domain_points(&domain(Some(730), 0)), 0);
        assert_eq!(domain_points(&domain(None, 11)), 5);
        assert_eq!(domain_points(&domain(None, 21)), 10);
        assert_eq!(domain_points(&domain(None, 51)), 15);
        assert_eq!(domain_points(&domain(None, 10)), 0);
    }

    #[test]
    fn unknown_or_zero_age_scores_nothing() {
        assert_eq!(domain_points(&domain(Some(0), 0)), 0);
        assert_eq!(domain_points(&DomainFragment::default()), 0);
    }

    #[test]
    fn technology_contributions_are_capped() {
        let fragment = TechnologyFragment {
            cdn: Some("Cloudflare".into()),
            security_headers: (0..7)
                .map(|i| HeaderCheck { name: format!("H{i}"), present: false })
                .collect(),
            technologies: (0..6)
                .map(|i| Technology {
                    name: format!("T{i}"),
                    category: "Library".into(),
                    version: Some("1.0".into()),
                    security_note: None,
                })
                .collect(),
            ..Default::default()
        };
        assert_eq!(tech_points(&fragment), 12 + 8);
    }

    #[test]
    fn vulnerabilities_are_uncapped_but_ports_are_not() {
        let fragment = InfrastructureFragment {
            ports: (1..=20).collect(),
            vulnerabilities: (0..7).map(|i| format!("CVE-2024-000{i}")).collect(),
            ..Default::default()
        };
        assert_eq!(infrastructure_points(&fragment), 10 + 35);
    }

    #[test]
    fn harvested_emails_cap_at_ten() {
        let fragment = EmailHarvestFragment {
            emails: (0..25)
                .map(|i| HarvestedEmail {
                    address: format!("user{i}@example.com"),
                    position: None,
                    confidence: 90,
                })
                .collect(),
            ..Default::default()
        };
        assert_eq!(harvest_points(&fragment), 10);
    }

    #[test]
    fn total_is_clamped_to_one_hundred() {
        let fragments: FragmentSet = [
            Fragment::UrlReputation(UrlReputationFragment { is_safe: false, ..Default::default() }),
            Fragment::ThreatIntel(ThreatIntelFragment { malicious_count: 3, ..Default::default() }),
            Fragment::Infrastructure(InfrastructureFragment {
                vulnerabilities: (0..20).map(|i| format!("CVE-{i}")).collect(),
                ..Default::default()
            }),
        ]
        .into_iter()
        .collect();
        assert_eq!(risk_score(&fragments), 100);
    }
}
