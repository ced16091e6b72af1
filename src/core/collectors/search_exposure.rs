// src/core/collectors/search_exposure.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{CollectOptions, Collector, CollectorError, configured, fetch_json};
use crate::core::models::{Fragment, FragmentKind, SearchExposureFragment, SearchHit};

const CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";
const RESULTS_PER_DORK: &str = "5";
const QUICK_DORK_LIMIT: usize = 3;
const DORK_DELAY: Duration = Duration::from_millis(500);

/// Dork suffix and whether its hits count as sensitive exposure.
const DORKS: &[(&str, bool)] = &[
    ("filetype:env", true),
    ("filetype:log", true),
    ("\"index of /\"", true),
    ("inurl:config", true),
    ("\"api_key\"", true),
    ("\"password\"", true),
];
const DEEP_DORKS: &[(&str, bool)] = &[
    ("filetype:sql", true),
    ("filetype:bak", true),
    ("intitle:\"Dashboard\"", false),
    ("intext:\"connectionstring\"", true),
];

/// Google Programmable Search dorks scoped to the target site.
pub struct SearchExposureCollector {
    client: reqwest::Client,
    api_key: Option<String>,
    engine_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    pub snippet: Option<String>,
}

impl SearchExposureCollector {
    pub fn new(client: reqwest::Client, api_key: Option<String>, engine_id: Option<String>) -> Self {
        Self { client, api_key, engine_id }
    }
}

#[async_trait]
impl Collector for SearchExposureCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::SearchExposure
    }

    async fn collect(
        &self,
        target: &str,
        options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let (Some(key), Some(cx)) = (configured(&self.api_key), configured(&self.engine_id)) else {
            return Ok(None);
        };
        info!(target, deep = options.deep_scan, "Starting search exposure scan.");

        let mut fragment = SearchExposureFragment { target: target.to_string(), ..Default::default() };

        for (i, (query, sensitive)) in dorks(target, options.deep_scan).into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(DORK_DELAY).await;
            }
            let request = self.client.get(CUSTOM_SEARCH_URL).query(&[
                ("key", key),
                ("cx", cx),
                ("q", query.as_str()),
                ("num", RESULTS_PER_DORK),
            ]);
            match fetch_json::<SearchResults>("Custom Search", request).await {
                Ok(results) => {
                    debug!(dork = %query, results = results.items.len(), "Dork applied.");
                    fragment.hits.extend(to_hits(&query, sensitive, results));
                    fragment.dorks_applied.push(query);
                }
                Err(e) => warn!(dork = %query, error = %e, "Dork failed."),
            }
            if !options.deep_scan && fragment.dorks_applied.len() >= QUICK_DORK_LIMIT {
                break;
            }
        }

        info!(
            hits = fragment.hits.len(),
            sensitive = fragment.sensitive_hits().count(),
            "Search exposure scan finished."
        );
        Ok(Some(Fragment::SearchExposure(fragment)))
    }
}

/// Site-scoped queries with their sensitivity flag.
pub fn dorks(target: &str, deep_scan: bool) -> Vec<(String, bool)> {
    let extra: &[(&str, bool)] = if deep_scan { DEEP_DORKS } else { &[] };
    DORKS
        .iter()
        .chain(extra)
        .map(|(dork, sensitive)| (format!("site:{} {}", target, dork), *sensitive))
        .collect()
}

pub fn to_hits(dork: &str, sensitive: bool, results: SearchResults) -> Vec<SearchHit> {
    results
        .items
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .map(|item| SearchHit {
            title: if item.title.is_empty() { "Unknown".into() } else { item.title },
            link: item.link,
            snippet: item.snippet,
            dork: dork.to_string(),
            sensitive,
        })
        .collect()
}
