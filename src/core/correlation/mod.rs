// src/core/correlation/mod.rs

//! The correlation engine: a pure function from the fragments a scan managed
//! to collect to a single assessment.
//!
//! The pipeline has four stages, each in its own module:
//!
//! 1. [`scoring`]: capped per-fragment points, clamped to 0..=100.
//! 2. [`surface`]: attack-surface projection, stably sorted by risk level.
//! 3. [`findings`]: a short human-readable summary.
//! 4. [`recommendations`]: guidance keyed on the level and the item types.
//!
//! Only fragments present in the [`FragmentSet`] are visited. The engine
//! performs no I/O and has no failure path.

pub mod findings;
pub mod recommendations;
pub mod scoring;
pub mod surface;

use crate::core::models::{CorrelatedIntelligence, FragmentSet, RiskLevel};

/// Runs all four stages over the fragment set.
///
/// # Arguments
///
/// * `target` - The normalized scan target, echoed into the result.
/// * `fragments` - Whatever the dispatched collectors returned; may be empty.
pub fn correlate(target: &str, fragments: &FragmentSet) -> CorrelatedIntelligence {
    let risk_score = scoring::risk_score(fragments);
    let risk_level = RiskLevel::from_score(risk_score);
    let attack_surface = surface::attack_surface(fragments);
    let key_findings = findings::key_findings(fragments);
    let recommendations = recommendations::recommendations(risk_level, &attack_surface);

    CorrelatedIntelligence {
        target: target.to_string(),
        attack_surface,
        risk_score,
        risk_level,
        key_findings,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{
        CodeExposureFragment, CodeFinding, DomainFragment, Fragment, HeaderCheck,
        RegistrationData, Subdomain, SurfaceKind, TechnologyFragment, UrlReputationFragment,
        UsernameFragment,
    };

    fn finding(path: &str, risk: RiskLevel) -> CodeFinding {
        CodeFinding {
            repository: "acme/infra".into(),
            file_path: path.into(),
            snippet: "...".into(),
            finding_type: "api_key".into(),
            risk_level: risk,
            url: format!("https://github.com/acme/infra/blob/main/{path}"),
        }
    }

    fn young_domain_with_subdomains() -> Fragment {
        Fragment::Domain(DomainFragment {
            domain: "acme.io".into(),
            registration: Some(RegistrationData { age_days: Some(200), ..Default::default() }),
            subdomains: (0..60)
                .map(|i| Subdomain {
                    name: format!("host{i}.acme.io"),
                    source: "crt.sh".into(),
                    first_seen: None,
                })
                .collect(),
            subdomain_count: 60,
            ..Default::default()
        })
    }

    fn tech_missing_three_headers() -> Fragment {
        let headers = [
            ("Strict-Transport-Security", false),
            ("Content-Security-Policy", false),
            ("X-Frame-Options", false),
            ("X-Content-Type-Options", true),
        ];
        Fragment::TechStack(TechnologyFragment {
            domain: "acme.io".into(),
            security_headers: headers
                .iter()
                .map(|(name, present)| HeaderCheck { name: name.to_string(), present: *present })
                .collect(),
            ..Default::default()
        })
    }

    #[test]
    fn empty_fragment_set_is_low_risk_with_general_advice() {
        let result = correlate("acme.io", &FragmentSet::new());
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.attack_surface.is_empty());
        assert!(result.key_findings.is_empty());
        assert_eq!(result.recommendations, recommendations::ALWAYS);
    }

    #[test]
    fn code_exposure_alone_stays_below_medium() {
        let fragments: FragmentSet = [Fragment::CodeExposure(CodeExposureFragment::new(
            "acme.io",
            Vec::new(),
            vec![
                finding("deploy/.env", RiskLevel::High),
                finding("docs/readme.md", RiskLevel::Low),
                finding("config/prod.env", RiskLevel::High),
                finding("secrets.yml", RiskLevel::Critical),
            ],
        ))]
        .into_iter()
        .collect();

        let result = correlate("acme.io", &fragments);
        assert_eq!(result.risk_score, 25);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.attack_surface.len(), 4);
        assert!(result.attack_surface[..3].iter().all(|i| i.risk_level >= RiskLevel::High));
        assert_eq!(result.attack_surface[3].risk_level, RiskLevel::Low);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r == "→ Remove or rotate any exposed credentials immediately"));
    }

    #[test]
    fn young_domain_with_weak_headers_is_medium() {
        let fragments: FragmentSet =
            [young_domain_with_subdomains(), tech_missing_three_headers()].into_iter().collect();

        let result = correlate("acme.io", &fragments);
        assert_eq!(result.risk_score, 15 + 15 + 9 + 5);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        // 20 subdomains plus 3 headers, all medium.
        assert_eq!(result.attack_surface.len(), 23);
        assert_eq!(result.attack_surface[0].item_type, SurfaceKind::Subdomain);
        assert_eq!(result.attack_surface[22].item_type, SurfaceKind::SecurityHeader);
    }

    #[test]
    fn unsafe_url_alone_hits_the_medium_boundary() {
        let fragments: FragmentSet = [Fragment::UrlReputation(UrlReputationFragment {
            url: "https://acme.io".into(),
            is_safe: false,
            threats: vec!["MALWARE".into()],
        })]
        .into_iter()
        .collect();

        let result = correlate("acme.io", &fragments);
        assert_eq!(result.risk_score, 30);
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.attack_surface[0].risk_level, RiskLevel::Critical);
    }

    #[test]
    fn output_ignores_insertion_order() {
        let username = Fragment::Username(UsernameFragment {
            username: "acme".into(),
            total_platforms: 7,
            github_profile: Some("https://github.com/acme".into()),
            ..Default::default()
        });
        let forward: FragmentSet = [
            young_domain_with_subdomains(),
            tech_missing_three_headers(),
            username.clone(),
        ]
        .into_iter()
        .collect();
        let reverse: FragmentSet = [
            username,
            tech_missing_three_headers(),
            young_domain_with_subdomains(),
        ]
        .into_iter()
        .collect();

        assert_eq!(correlate("acme.io", &forward), correlate("acme.io", &reverse));
    }

    #[test]
    fn repeated_runs_serialize_identically() {
        let fragments: FragmentSet =
            [young_domain_with_subdomains(), tech_missing_three_headers()].into_iter().collect();
        let first = serde_json::to_string(&correlate("acme.io", &fragments)).unwrap();
        let second = serde_json::to_string(&correlate("acme.io", &fragments)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn surface_is_always_sorted_descending() {
        let fragments: FragmentSet = [
            young_domain_with_subdomains(),
            tech_missing_three_headers(),
            Fragment::CodeExposure(CodeExposureFragment::new(
                "acme.io",
                Vec::new(),
                vec![finding("a.env", RiskLevel::Low), finding("b.env", RiskLevel::Critical)],
            )),
        ]
        .into_iter()
        .collect();

        let result = correlate("acme.io", &fragments);
        assert!(result
            .attack_surface
            .windows(2)
            .all(|pair| pair[0].risk_level >= pair[1].risk_level));
    }
}
