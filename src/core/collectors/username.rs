// src/core/collectors/username.rs

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{CollectOptions, Collector, CollectorError, fetch_json};
use crate::core::models::{Fragment, FragmentKind, PlatformPresence, UsernameFragment};

const PROFILE_TIMEOUT: Duration = Duration::from_secs(8);

/// Platform name and profile URL template, checked in this order.
pub const PLATFORMS: &[(&str, &str)] = &[
    ("GitHub", "https://github.com/{}"),
    ("GitLab", "https://gitlab.com/{}"),
    ("Reddit", "https://reddit.com/user/{}"),
    ("Twitter", "https://twitter.com/{}"),
    ("Stack Overflow", "https://stackoverflow.com/users/{}"),
    ("Dev.to", "https://dev.to/{}"),
    ("Medium", "https://medium.com/@{}"),
    ("Hacker News", "https://news.ycombinator.com/user?id={}"),
    ("Replit", "https://replit.com/@{}"),
    ("CodePen", "https://codepen.io/{}"),
    ("npm", "https://npmjs.com/~{}"),
    ("PyPI", "https://pypi.org/user/{}/"),
];

const DEV_PLATFORMS: &[&str] = &["GitHub", "GitLab", "Stack Overflow", "Dev.to", "CodePen", "Replit"];

/// Public GitHub account details used for the activity insight.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubAccount {
    pub html_url: String,
    #[serde(default)]
    pub public_repos: u32,
    #[serde(default)]
    pub followers: u32,
}

/// Checks where a handle has a public profile.
pub struct UsernameCollector {
    client: reqwest::Client,
}

impl UsernameCollector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn check_platforms(&self, username: &str) -> Vec<PlatformPresence> {
        let mut set = JoinSet::new();
        for (index, (platform, template)) in PLATFORMS.iter().enumerate() {
            let client = self.client.clone();
            let url = template.replace("{}", username);
            set.spawn(async move {
                let found = match client.get(&url).timeout(PROFILE_TIMEOUT).send().await {
                    Ok(response) => response.status() == reqwest::StatusCode::OK,
                    Err(e) => {
                        debug!(platform, error = %e, "Profile check failed.");
                        false
                    }
                };
                (index, PlatformPresence { platform: platform.to_string(), url, found })
            });
        }

        let mut checked = Vec::with_capacity(PLATFORMS.len());
        while let Some(result) = set.join_next().await {
            match result {
                Ok(entry) => checked.push(entry),
                Err(e) => warn!(error = %e, "Profile check task failed."),
            }
        }
        checked.sort_by_key(|(index, _)| *index);
        checked.into_iter().map(|(_, presence)| presence).collect()
    }

    async fn github_account(&self, username: &str) -> Option<GithubAccount> {
        let request = self.client.get(format!("https://api.github.com/users/{}", username));
        match fetch_json::<GithubAccount>("GitHub", request).await {
            Ok(account) => Some(account),
            Err(e) => {
                debug!(error = %e, "GitHub profile lookup failed.");
                None
            }
        }
    }
}

#[async_trait]
impl Collector for UsernameCollector {
    fn kind(&self) -> FragmentKind {
        FragmentKind::Username
    }

    async fn collect(
        &self,
        target: &str,
        _options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError> {
        let username = target.trim().to_lowercase();
        info!(target = %username, "Starting username scan.");

        let platforms = self.check_platforms(&username).await;
        let on_github = platforms.iter().any(|p| p.found && p.platform == "GitHub");
        let github = if on_github { self.github_account(&username).await } else { None };

        let fragment = UsernameFragment {
            total_platforms: platforms.iter().filter(|p| p.found).count(),
            github_profile: github.as_ref().map(|g| g.html_url.clone()),
            insights: insights(&platforms, github.as_ref()),
            platforms,
            username,
        };

        info!(found = fragment.total_platforms, "Username scan finished.");
        Ok(Some(Fragment::Username(fragment)))
    }
}

pub fn insights(platforms: &[PlatformPresence], github: Option<&GithubAccount>) -> Vec<String> {
    let mut insights = Vec::new();
    let found = platforms.iter().filter(|p| p.found).count();

    insights.push(match found {
        0 => "Username not found on any tracked platforms".to_string(),
        1 => "Username found on 1 platform, limited digital footprint".to_string(),
        2..=3 => format!("Username found on {} platforms, moderate digital footprint", found),
        _ => format!("Username found on {} platforms, significant digital footprint", found),
    });

    if let Some(account) = github {
        insights.push(format!(
            "Active GitHub profile ({} repos, {} followers)",
            account.public_repos, account.followers
        ));
        if account.public_repos > 50 {
            insights.push("Highly active developer: review public repos for data leaks".into());
        } else if account.public_repos > 10 {
            insights.push("Active developer: check repos for exposed configs".into());
        }
    }

    let dev_count = platforms
        .iter()
        .filter(|p| p.found && DEV_PLATFORMS.contains(&p.platform.as_str()))
        .count();
    if dev_count >= 3 {
        insights.push("Present on multiple coding platforms: check for accidental leaks".into());
    }

    insights
}
