// src/core/collectors/code_exposure.rs

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{CollectOptions, Collector, CollectorError, configured, fetch_json};
use crate::core::models::{
    CodeExposureFragment, CodeFinding, Fragment, FragmentKind, Repository, RiskLevel,
};

const GITHUB_API: &str = "https://api.github.com";
const MAX_REPOSITORIES: usize = 20;
const RESULTS_PER_QUERY: usize = 10;
const QUICK_QUERY_COUNT: usize = 5;
const QUERY_DELAY: Duration = Duration::from_millis(500);
const SNIPPET_LIMIT: usize = 200;

/// Keyword, finding type, risk. Checked in order against path and snippet.
const SENSITIVE_KEYWORDS: &[(&str, &str, RiskLevel)] = &[
    ("api_key", "api_key", RiskLevel::High),
    ("apikey", "api_key", RiskLevel::High),
    ("password", "leak", RiskLevel::Critical),
    ("secret", "leak", RiskLevel::High),
    ("token", "leak", RiskLevel::High),
    ("credentials", "leak", RiskLevel::High),
];

/// Searches public GitHub repositories and code for references to the target.
/// Repository search works anonymously; code search needs a token and is
/// skipped without one.
pub struct CodeExposureCollector {
    client: reqwest::Client,
    token: Option<String>,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RepoItem {
    name: String,
    full_name: String,
    html_url: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CodeItem {
    pub path: String,
    pub html_url: String,
    pub repository: CodeRepo,
    #[serde(default)]
    pub text_matches: Vec<TextMatch>,
}

#[derive(Debug, Deserialize)]
pub struct CodeRepo {
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct TextMatch {
    #[serde(default)]
    pub fragment: String,
}

impl CodeExposureCollector {
    pub fn new(client: reqwest::Client, token: Option<String>, max_results: usize) -> Self {
        Self { client, token, max_results }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(format!("{}{}", GITHUB_API, path))
            .header("Accept", "application/vnd.github.v3.text-match+json");
        match configured(&self.token) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn repositories(&self, target: &str) -> Result<Vec<Repository>, CollectorError> {
        let request = self.request("/search/repositories").query(&[
            ("q", target.to_string()),
            ("per_page", MAX_REPOSITORIES.to_string()),
            ("sort", "updated".to_string()),
        ]);
        let response: SearchResponse<RepoItem> = fetch_json("GitHub", request).await?;
        Ok(response
            .items
            .into_iter()
            .take(MAX_REPOSITORIES)
            .map(|r| Repository {
                name: r.name,
                full_name: r.full_name,
                url: r.html_url,
                description: r.description,
                stars: r.stargazers_count,
                language: r.language,
            })
            .collect())
    }

    async fn code_findings(&self, target: &str, deep_scan: bool) -> Vec<CodeFinding> {
        let queries = search_queries(target, deep_scan);
        let mut findings = Vec::new();
        let mut seen = HashSet::new();
        let per_page = RESULTS_PER_QUERY.to_string();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(QUERY_DELAY).await;
            }
            let request = self.request("/search/code").query(&[
                ("q", query.as_str()),
                ("per_page", per_page.as_str()),
            ]);
            let items = match fetch_json::<SearchResponse<CodeItem>>("GitHub", request).await {
                Ok(response) => response.items,
                Err(CollectorError::Status { status: 403, .. }) => {
                    warn!("GitHub API rate limit reached, stopping code search.");
                    break;
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "GitHub code search failed.");
                    continue;
                }
            };
            debug!(query = %query, results = items.len(), "Code search page fetched.");

            for item in &items {
                if let Some(finding) = classify(item) {
                    if seen.insert(finding.url.clone()) {
                        findings.push(finding);
                    }
                }
            }
            if findings.len() >= self.max_results {
                findings.truncate(self.max_results);
                break;
            }
        }
        findings
    }
}

#[async_trait]
impl Collector for CodeExposureCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::CodeExposure
    }

    async fn collect(
        &self,
        target: &str,
        options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        info!(target, deep = options.deep_scan, "Starting code exposure scan.");
        let repositories = self.repositories(target).await?;

        let findings = if configured(&self.token).is_some() {
            self.code_findings(target, options.deep_scan).await
        } else {
            debug!("No GitHub token configured, skipping code search.");
            Vec::new()
        };

        let fragment = CodeExposureFragment::new(target, repositories, findings);
        info!(
            repositories = fragment.total_repos_found,
            findings = fragment.findings.len(),
            high_risk = fragment.high_risk_findings,
            "Code exposure scan finished."
        );
        Ok(Some(Fragment::CodeExposure(fragment)))
    }
}

/// Code-search queries; quick scans only run the first few.
pub fn search_queries(target: &str, deep_scan: bool) -> Vec<String> {
    let mut queries = vec![
        format!("\"{}\"", target),
        format!("{} filename:.env", target),
        format!("{} filename:config", target),
        format!("{} extension:json", target),
        format!("{} extension:yaml", target),
        format!("\"@{}\"", target),
    ];
    if deep_scan {
        queries.extend(
            ["api_key", "password", "secret", "token"]
                .iter()
                .map(|k| format!("{} {}", target, k)),
        );
    } else {
        queries.truncate(QUICK_QUERY_COUNT);
    }
    queries
}

/// Decides whether a code-search hit is worth reporting, and how risky it is.
pub fn classify(item: &CodeItem) -> Option<CodeFinding> {
    let path = item.path.to_lowercase();
    let snippet = item
        .text_matches
        .first()
        .map(|m| m.fragment.as_str())
        .unwrap_or_default();

    let finding = |snippet: String, finding_type: &str, risk_level: RiskLevel| CodeFinding {
        repository: item.repository.full_name.clone(),
        file_path: item.path.clone(),
        snippet,
        finding_type: finding_type.to_string(),
        risk_level,
        url: item.html_url.clone(),
    };

    if path.contains(".env") {
        return Some(finding("Environment configuration file".into(), "config", RiskLevel::High));
    }
    if path.contains("config") && [".json", ".yaml", ".yml", ".xml"].iter().any(|e| path.contains(e)) {
        return Some(finding("Configuration file".into(), "config", RiskLevel::Medium));
    }
    if path.contains("api") || path.contains("endpoint") {
        return Some(finding("API endpoint definition".into(), "endpoint", RiskLevel::Medium));
    }

    let snippet_lower = snippet.to_lowercase();
    SENSITIVE_KEYWORDS
        .iter()
        .find(|(keyword, _, _)| path.contains(keyword) || snippet_lower.contains(keyword))
        .map(|(keyword, finding_type, risk)| {
            let text = if snippet.is_empty() {
                format!("Potential {} exposure", keyword)
            } else {
                snippet.chars().take(SNIPPET_LIMIT).collect()
            };
            finding(text, *finding_type, *risk)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, fragment: &str) -> CodeItem {
        CodeItem {
            path: path.into(),
            html_url: format!("https://github.com/acme/app/blob/main/{path}"),
            repository: CodeRepo { full_name: "acme/app".into() },
            text_matches: if fragment.is_empty() {
                Vec::new()
            } else {
                vec![TextMatch { fragment: fragment.into() }]
            },
        }
    }

    #[test]
    fn env_files_are_high_risk_config() {
        let finding = classify(&item("deploy/.env.production", "")).unwrap();
        assert_eq!(finding.finding_type, "config");
        assert_eq!(finding.risk_level, RiskLevel::High);
    }

    #[test]
    fn path_rules_take_precedence_over_keywords() {
        let finding = classify(&item("config/settings.yaml", "password: hunter2")).unwrap();
        assert_eq!(finding.risk_level, RiskLevel::Medium);
        assert_eq!(finding.snippet, "Configuration file");
    }

    #[test]
    fn snippet_keywords_classify_leaks() {
        let finding = classify(&item("src/db.py", "DB_PASSWORD = 'x'")).unwrap();
        assert_eq!(finding.finding_type, "leak");
        assert_eq!(finding.risk_level, RiskLevel::Critical);
        assert_eq!(finding.snippet, "DB_PASSWORD = 'x'");

        assert!(classify(&item("README.md", "see docs")).is_none());
    }

    #[test]
    fn quick_scans_run_fewer_queries() {
        assert_eq!(search_queries("acme.io", false).len(), 5);
        let deep = search_queries("acme.io", true);
        assert_eq!(deep.len(), 10);
        assert!(deep.contains(&"acme.io password".to_string()));
    }
}
