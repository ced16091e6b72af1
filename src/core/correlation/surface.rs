// src/core/correlation/surface.rs

//! Stage 2: attack-surface assembly.

use crate::core::models::{
    AttackSurfaceItem, CodeExposureFragment, DomainFragment, EmailHarvestFragment, Fragment,
    FragmentKind, FragmentSet, InfrastructureFragment, PhoneFragment, RiskLevel,
    SearchExposureFragment, SurfaceKind, TechnologyFragment, ThreatIntelFragment, ThreatVerdict,
    UrlReputationFragment,
};

const MAX_SUBDOMAIN_ITEMS: usize = 20;
const MAX_CODE_ITEMS: usize = 15;
const MAX_SEARCH_ITEMS: usize = 10;
const MAX_HARVEST_ITEMS: usize = 10;

/// Fragment precedence for projection. Ties in the final sort keep this order.
const PROJECTION_ORDER: [FragmentKind; 9] = [
    FragmentKind::Domain,
    FragmentKind::TechStack,
    FragmentKind::CodeExposure,
    FragmentKind::Infrastructure,
    FragmentKind::ThreatIntel,
    FragmentKind::UrlReputation,
    FragmentKind::SearchExposure,
    FragmentKind::EmailHarvest,
    FragmentKind::Phone,
];

/// Projects every present fragment, then sorts by risk level descending.
/// `sort_by` is stable, so equal levels stay in projection order.
pub fn attack_surface(fragments: &FragmentSet) -> Vec<AttackSurfaceItem> {
    let mut items: Vec<AttackSurfaceItem> = PROJECTION_ORDER
        .iter()
        .filter_map(|kind| fragments.get(*kind))
        .flat_map(project)
        .collect();
    items.sort_by(|a, b| b.risk_level.cmp(&a.risk_level));
    items
}

fn project(fragment: &Fragment) -> Vec<AttackSurfaceItem> {
    match fragment {
        Fragment::Domain(f) => domain_items(f),
        Fragment::TechStack(f) => tech_items(f),
        Fragment::CodeExposure(f) => code_items(f),
        Fragment::Infrastructure(f) => infrastructure_items(f),
        Fragment::ThreatIntel(f) => threat_items(f),
        Fragment::UrlReputation(f) => url_items(f),
        Fragment::SearchExposure(f) => search_items(f),
        Fragment::EmailHarvest(f) => harvest_items(f),
        Fragment::Phone(f) => phone_items(f),
        // Identity fragments feed the score and the findings, not the surface.
        Fragment::Email(_) | Fragment::Username(_) => Vec::new(),
    }
}

fn domain_items(f: &DomainFragment) -> Vec<AttackSurfaceItem> {
    f.subdomains
        .iter()
        .take(MAX_SUBDOMAIN_ITEMS)
        .map(|sub| {
            AttackSurfaceItem::new(
                SurfaceKind::Subdomain,
                &sub.name,
                RiskLevel::Medium,
                format!("Subdomain discovered via {}", sub.source),
                FragmentKind::Domain,
            )
        })
        .collect()
}

fn tech_items(f: &TechnologyFragment) -> Vec<AttackSurfaceItem> {
    let flagged = f.technologies.iter().filter_map(|tech| {
        let note = tech.security_note.as_ref()?;
        let risk = if note.to_lowercase().contains("exposed") {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        let name = match &tech.version {
            Some(version) => format!("{} {}", tech.name, version),
            None => tech.name.clone(),
        };
        Some(AttackSurfaceItem::new(
            SurfaceKind::Technology,
            name,
            risk,
            note,
            FragmentKind::TechStack,
        ))
    });

    let headers = f.missing_headers().map(|header| {
        AttackSurfaceItem::new(
            SurfaceKind::SecurityHeader,
            format!("Missing {}", header.name),
            RiskLevel::Medium,
            format!("Security header '{}' not implemented", header.name),
            FragmentKind::TechStack,
        )
    });

    flagged.chain(headers).collect()
}

fn code_items(f: &CodeExposureFragment) -> Vec<AttackSurfaceItem> {
    f.findings
        .iter()
        .take(MAX_CODE_ITEMS)
        .map(|finding| {
            AttackSurfaceItem::new(
                SurfaceKind::ExposedFile,
                &finding.file_path,
                finding.risk_level,
                format!(
                    "{} found in {}",
                    finding.finding_type.to_uppercase(),
                    finding.repository
                ),
                FragmentKind::CodeExposure,
            )
        })
        .collect()
}

fn infrastructure_items(f: &InfrastructureFragment) -> Vec<AttackSurfaceItem> {
    let ports = f.ports.iter().map(|port| {
        let risk = if matches!(*port, 80 | 443) { RiskLevel::Medium } else { RiskLevel::High };
        AttackSurfaceItem::new(
            SurfaceKind::OpenPort,
            format!("{}:{}", f.ip, port),
            risk,
            format!("Port {} open on {}", port, f.ip),
            FragmentKind::Infrastructure,
        )
    });

    let vulns = f.vulnerabilities.iter().map(|cve| {
        AttackSurfaceItem::new(
            SurfaceKind::Vulnerability,
            cve,
            RiskLevel::Critical,
            format!("{} reported for {}", cve, f.ip),
            FragmentKind::Infrastructure,
        )
    });

    ports.chain(vulns).collect()
}

fn threat_items(f: &ThreatIntelFragment) -> Vec<AttackSurfaceItem> {
    let (risk, label, count) = match f.verdict() {
        ThreatVerdict::Malicious => (RiskLevel::Critical, "malicious", f.malicious_count),
        ThreatVerdict::Suspicious => (RiskLevel::High, "suspicious", f.suspicious_count),
        ThreatVerdict::Clean => return Vec::new(),
    };
    vec![AttackSurfaceItem::new(
        SurfaceKind::ThreatIntel,
        &f.target,
        risk,
        format!("{}/{} engines flag {} as {}", count, f.total_engines, f.target, label),
        FragmentKind::ThreatIntel,
    )]
}

fn url_items(f: &UrlReputationFragment) -> Vec<AttackSurfaceItem> {
    if f.is_safe {
        return Vec::new();
    }
    let threats = if f.threats.is_empty() {
        "unspecified threat".to_string()
    } else {
        f.threats.join(", ")
    };
    vec![AttackSurfaceItem::new(
        SurfaceKind::UnsafeUrl,
        &f.url,
        RiskLevel::Critical,
        format!("Flagged by Safe Browsing: {}", threats),
        FragmentKind::UrlReputation,
    )]
}

fn search_items(f: &SearchExposureFragment) -> Vec<AttackSurfaceItem> {
    f.sensitive_hits()
        .take(MAX_SEARCH_ITEMS)
        .map(|hit| {
            AttackSurfaceItem::new(
                SurfaceKind::SearchExposure,
                &hit.link,
                RiskLevel::High,
                format!("Indexed by `{}`: {}", hit.dork, hit.title),
                FragmentKind::SearchExposure,
            )
        })
        .collect()
}

fn harvest_items(f: &EmailHarvestFragment) -> Vec<AttackSurfaceItem> {
    f.emails
        .iter()
        .take(MAX_HARVEST_ITEMS)
        .map(|email| {
            let description = match &email.position {
                Some(position) => format!("Publicly listed address ({})", position),
                None => "Publicly listed address".to_string(),
            };
            AttackSurfaceItem::new(
                SurfaceKind::HarvestedEmail,
                &email.address,
                RiskLevel::Low,
                description,
                FragmentKind::EmailHarvest,
            )
        })
        .collect()
}

fn phone_items(f: &PhoneFragment) -> Vec<AttackSurfaceItem> {
    let mut items = Vec::new();
    if !f.valid {
        items.push(AttackSurfaceItem::new(
            SurfaceKind::PhoneLine,
            &f.phone,
            RiskLevel::Medium,
            "Number reported as invalid",
            FragmentKind::Phone,
        ));
    }
    if f.is_voip() {
        let carrier = f.carrier.as_deref().unwrap_or("unknown carrier");
        items.push(AttackSurfaceItem::new(
            SurfaceKind::PhoneLine,
            &f.phone,
            RiskLevel::Low,
            format!("VOIP line ({})", carrier),
            FragmentKind::Phone,
        ));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{CodeFinding, HeaderCheck, Subdomain, Technology};

    fn finding(path: &str, risk: RiskLevel) -> CodeFinding {
        CodeFinding {
            repository: "acme/site".into(),
            file_path: path.into(),
            snippet: String::new(),
            finding_type: "config".into(),
            risk_level: risk,
            url: String::new(),
        }
    }

    #[test]
    fn subdomains_are_limited_to_twenty() {
        let fragment = DomainFragment {
            subdomains: (0..30)
                .map(|i| Subdomain {
                    name: format!("s{i}.example.com"),
                    source: "crt.sh".into(),
                    first_seen: None,
                })
                .collect(),
            subdomain_count: 30,
            ..Default::default()
        };
        let items = domain_items(&fragment);
        assert_eq!(items.len(), 20);
        assert_eq!(items[0].description, "Subdomain discovered via crt.sh");
        assert_eq!(items[0].source_modules, vec!["domain".to_string()]);
    }

    #[test]
    fn flagged_technologies_precede_missing_headers() {
        let fragment = TechnologyFragment {
            technologies: vec![
                Technology {
                    name: "PHP".into(),
                    category: "Language".into(),
                    version: Some("7.4".into()),
                    security_note: Some("Version exposed in headers".into()),
                },
                Technology {
                    name: "React".into(),
                    category: "Framework".into(),
                    version: None,
                    security_note: None,
                },
            ],
            security_headers: vec![
                HeaderCheck { name: "Strict-Transport-Security".into(), present: true },
                HeaderCheck { name: "Content-Security-Policy".into(), present: false },
            ],
            ..Default::default()
        };
        let items = tech_items(&fragment);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_type, SurfaceKind::Technology);
        assert_eq!(items[0].name, "PHP 7.4");
        assert_eq!(items[0].risk_level, RiskLevel::Medium);
        assert_eq!(items[1].name, "Missing Content-Security-Policy");
    }

    #[test]
    fn web_ports_are_medium_others_high() {
        let fragment = InfrastructureFragment {
            ip: "203.0.113.7".into(),
            ports: vec![22, 443],
            vulnerabilities: vec!["CVE-2021-44228".into()],
            ..Default::default()
        };
        let items = infrastructure_items(&fragment);
        assert_eq!(items[0].risk_level, RiskLevel::High);
        assert_eq!(items[1].risk_level, RiskLevel::Medium);
        assert_eq!(items[2].item_type, SurfaceKind::Vulnerability);
        assert_eq!(items[2].risk_level, RiskLevel::Critical);
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let fragments: FragmentSet = [
            Fragment::CodeExposure(CodeExposureFragment::new(
                "acme",
                Vec::new(),
                vec![
                    finding("a.env", RiskLevel::High),
                    finding("b.yml", RiskLevel::Medium),
                    finding("c.env", RiskLevel::High),
                ],
            )),
            Fragment::Domain(DomainFragment {
                subdomains: vec![Subdomain {
                    name: "dev.acme.io".into(),
                    source: "crt.sh".into(),
                    first_seen: None,
                }],
                subdomain_count: 1,
                ..Default::default()
            }),
        ]
        .into_iter()
        .collect();

        let names: Vec<_> = attack_surface(&fragments).into_iter().map(|i| i.name).collect();
        // Domain projects before code exposure, so its medium item leads the medium tier.
        assert_eq!(names, vec!["a.env", "c.env", "dev.acme.io", "b.yml"]);
    }

    #[test]
    fn clean_reputation_projects_nothing() {
        assert!(threat_items(&ThreatIntelFragment::default()).is_empty());
        let safe = UrlReputationFragment { url: "https://a.io".into(), is_safe: true, threats: vec![] };
        assert!(url_items(&safe).is_empty());
    }
}
