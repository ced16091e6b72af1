// src/core/correlation/findings.rs

//! Stage 3: the short, human-readable findings summary.

use crate::core::models::{
    CodeExposureFragment, DomainFragment, EmailFragment, EmailHarvestFragment, Fragment,
    FragmentKind, FragmentSet, InfrastructureFragment, PhoneFragment, SearchExposureFragment,
    TechnologyFragment, ThreatIntelFragment, ThreatVerdict, UrlReputationFragment,
    UsernameFragment,
};

const FINDINGS_ORDER: [FragmentKind; 11] = [
    FragmentKind::Domain,
    FragmentKind::TechStack,
    FragmentKind::CodeExposure,
    FragmentKind::Email,
    FragmentKind::Username,
    FragmentKind::Phone,
    FragmentKind::Infrastructure,
    FragmentKind::ThreatIntel,
    FragmentKind::UrlReputation,
    FragmentKind::SearchExposure,
    FragmentKind::EmailHarvest,
];

pub fn key_findings(fragments: &FragmentSet) -> Vec<String> {
    FINDINGS_ORDER
        .iter()
        .filter_map(|kind| fragments.get(*kind))
        .flat_map(fragment_findings)
        .collect()
}

fn fragment_findings(fragment: &Fragment) -> Vec<String> {
    match fragment {
        Fragment::Domain(f) => domain_findings(f),
        Fragment::TechStack(f) => tech_findings(f),
        Fragment::CodeExposure(f) => code_findings(f),
        Fragment::Email(f) => email_findings(f),
        Fragment::Username(f) => username_findings(f),
        Fragment::Phone(f) => phone_findings(f),
        Fragment::Infrastructure(f) => infrastructure_findings(f),
        Fragment::ThreatIntel(f) => threat_findings(f),
        Fragment::UrlReputation(f) => url_findings(f),
        Fragment::SearchExposure(f) => search_findings(f),
        Fragment::EmailHarvest(f) => harvest_findings(f),
    }
}

fn domain_findings(f: &DomainFragment) -> Vec<String> {
    let mut lines = Vec::new();
    if f.subdomain_count > 0 {
        lines.push(format!(
            "Discovered {} subdomains via Certificate Transparency",
            f.subdomain_count
        ));
    }
    if let Some(days) = f.age_days().filter(|d| *d > 0) {
        lines.push(format!("Domain age: {:.1} years", days as f64 / 365.0));
    }
    lines
}

fn tech_findings(f: &TechnologyFragment) -> Vec<String> {
    let mut lines = vec![format!("Identified {} technologies", f.technologies.len())];
    let missing = f.missing_headers().count();
    if missing > 0 {
        lines.push(format!("{} security headers missing", missing));
    }
    lines
}

fn code_findings(f: &CodeExposureFragment) -> Vec<String> {
    let mut lines = Vec::new();
    if f.high_risk_findings > 0 {
        lines.push(format!(
            "{} high-risk findings in public code repositories",
            f.high_risk_findings
        ));
    }
    if f.total_repos_found > 0 {
        lines.push(format!(
            "{} public repositories reference this target",
            f.total_repos_found
        ));
    }
    lines
}

fn email_findings(f: &EmailFragment) -> Vec<String> {
    if !f.valid_format {
        return Vec::new();
    }
    let line = if f.breach_found {
        format!("Email found in {} data breaches", f.breach_count)
    } else {
        "Email not found in known breaches".to_string()
    };
    vec![line]
}

fn username_findings(f: &UsernameFragment) -> Vec<String> {
    if f.total_platforms == 0 {
        return Vec::new();
    }
    vec![format!("Username found on {} platforms", f.total_platforms)]
}

fn phone_findings(f: &PhoneFragment) -> Vec<String> {
    if !f.valid {
        return vec!["Phone number reported as invalid".to_string()];
    }
    let line_type = f.line_type.as_deref().unwrap_or("unknown");
    let mut lines = vec![match &f.country {
        Some(country) => format!("Valid {} phone number registered in {}", line_type, country),
        None => format!("Valid {} phone number", line_type),
    }];
    if let Some(carrier) = &f.carrier {
        lines.push(format!("Carrier: {}", carrier));
    }
    lines
}

fn infrastructure_findings(f: &InfrastructureFragment) -> Vec<String> {
    let mut lines = Vec::new();
    if !f.ports.is_empty() {
        lines.push(format!("{} open ports exposed on {}", f.ports.len(), f.ip));
    }
    if !f.vulnerabilities.is_empty() {
        lines.push(format!(
            "{} known vulnerabilities reported for {}",
            f.vulnerabilities.len(),
            f.ip
        ));
    }
    lines
}

fn threat_findings(f: &ThreatIntelFragment) -> Vec<String> {
    match f.verdict() {
        ThreatVerdict::Malicious => vec![format!(
            "Flagged as malicious by {} of {} security engines",
            f.malicious_count, f.total_engines
        )],
        ThreatVerdict::Suspicious => vec![format!(
            "Flagged as suspicious by {} of {} security engines",
            f.suspicious_count, f.total_engines
        )],
        ThreatVerdict::Clean => Vec::new(),
    }
}

fn url_findings(f: &UrlReputationFragment) -> Vec<String> {
    if f.is_safe {
        Vec::new()
    } else {
        vec!["Target URL listed as unsafe by Safe Browsing".to_string()]
    }
}

fn search_findings(f: &SearchExposureFragment) -> Vec<String> {
    match f.sensitive_hits().count() {
        0 => Vec::new(),
        n => vec![format!("{} sensitive search engine results exposed", n)],
    }
}

fn harvest_findings(f: &EmailHarvestFragment) -> Vec<String> {
    if f.emails.is_empty() {
        return Vec::new();
    }
    vec![format!(
        "{} corporate email addresses publicly harvestable",
        f.emails.len()
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{HeaderCheck, RegistrationData};

    #[test]
    fn findings_follow_fragment_precedence() {
        let fragments: FragmentSet = [
            Fragment::Username(UsernameFragment { total_platforms: 4, ..Default::default() }),
            Fragment::Domain(DomainFragment {
                registration: Some(RegistrationData { age_days: Some(730), ..Default::default() }),
                subdomain_count: 12,
                ..Default::default()
            }),
        ]
        .into_iter()
        .collect();

        assert_eq!(
            key_findings(&fragments),
            vec![
                "Discovered 12 subdomains via Certificate Transparency".to_string(),
                "Domain age: 2.0 years".to_string(),
                "Username found on 4 platforms".to_string(),
            ]
        );
    }

    #[test]
    fn technology_count_is_reported_even_when_nothing_was_identified() {
        let fragment = TechnologyFragment {
            security_headers: vec![
                HeaderCheck { name: "Content-Security-Policy".into(), present: false },
                HeaderCheck { name: "X-Frame-Options".into(), present: true },
            ],
            ..Default::default()
        };
        assert_eq!(
            tech_findings(&fragment),
            vec!["Identified 0 technologies", "1 security headers missing"]
        );
    }

    #[test]
    fn malformed_email_reports_no_breach_line() {
        let invalid = EmailFragment { email: "nope".into(), ..Default::default() };
        assert!(email_findings(&invalid).is_empty());

        let clean = EmailFragment { valid_format: true, ..Default::default() };
        assert_eq!(email_findings(&clean), vec!["Email not found in known breaches"]);
    }

    #[test]
    fn phone_lines_include_carrier() {
        let fragment = PhoneFragment {
            valid: true,
            line_type: Some("mobile".into()),
            country: Some("United Kingdom".into()),
            carrier: Some("Vodafone".into()),
            ..Default::default()
        };
        assert_eq!(
            phone_findings(&fragment),
            vec!["Valid mobile phone number registered in United Kingdom", "Carrier: Vodafone"]
        );
    }
}
