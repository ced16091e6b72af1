// src/core/collectors/mod.rs

//! Intelligence collectors.
//!
//! A collector turns one target into at most one [`Fragment`]. Collectors
//! report "nothing to say" as `Ok(None)` and anything else that goes wrong as
//! a [`CollectorError`]; the orchestrator treats both the same way (the slot
//! stays empty) but records which one happened.
//!
//! Enrichment collectors need third-party API keys. Without a key they return
//! `Ok(None)` before doing any I/O.

pub mod code_exposure;
pub mod domain;
pub mod email;
pub mod email_harvest;
pub mod infrastructure;
pub mod phone;
pub mod search_exposure;
pub mod tech_stack;
pub mod threat_intel;
pub mod url_reputation;
pub mod username;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::Settings;
use crate::core::models::{Fragment, FragmentKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectOptions {
    pub deep_scan: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("DNS Error: {0}")]
    Dns(String),
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },
    #[error("Could not decode {0}")]
    Decode(String),
    #[error("Task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait Collector: Send + Sync {
    /// The fragment slot this collector fills.
    fn kind(&self) -> FragmentKind;

    /// Gathers intelligence about one target.
    ///
    /// # Arguments
    ///
    /// * `target` - The validated, normalized target.
    /// * `options` - Per-scan options such as `deep_scan`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when there is nothing to report or the required API key is
    /// missing; `Err` for transport or decoding failures. The orchestrator
    /// records both as absent fragments.
    async fn collect(
        &self,
        target: &str,
        options: &CollectOptions,
    ) -> Result<Option<Fragment>, CollectorError>;
}

/// The collectors available to the orchestrator, at most one per kind.
#[derive(Default, Clone)]
pub struct CollectorRegistry {
    collectors: HashMap<FragmentKind, Arc<dyn Collector>>,
}

impl CollectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collector, replacing any previous one of the same kind.
    pub fn register(&mut self, collector: Arc<dyn Collector>) -> &mut Self {
        self.collectors.insert(collector.kind(), collector);
        self
    }

    /// The collector registered for `kind`, if any.
    pub fn get(&self, kind: FragmentKind) -> Option<Arc<dyn Collector>> {
        self.collectors.get(&kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Builds the bundled collectors from the settings, sharing one HTTP
    /// client and one DNS resolver between them.
    pub fn with_defaults(settings: &Settings) -> Result<Self, CollectorError> {
        let client = http_client(&settings.user_agent, settings.collector_timeout())?;
        let resolver = dns_resolver();
        let keys = &settings.api_keys;

        let mut registry = Self::new();
        registry
            .register(Arc::new(domain::DomainCollector::new(
                client.clone(),
                resolver.clone(),
                settings.max_subdomains,
            )))
            .register(Arc::new(tech_stack::TechStackCollector::new(client.clone())))
            .register(Arc::new(code_exposure::CodeExposureCollector::new(
                client.clone(),
                keys.github_token.clone(),
                settings.max_code_results,
            )))
            .register(Arc::new(email::EmailCollector::new(
                client.clone(),
                resolver.clone(),
                keys.hibp.clone(),
            )))
            .register(Arc::new(username::UsernameCollector::new(client.clone())))
            .register(Arc::new(phone::PhoneCollector::new(client.clone(), keys.veriphone.clone())))
            .register(Arc::new(infrastructure::InfrastructureCollector::new(
                client.clone(),
                resolver,
                keys.shodan.clone(),
            )))
            .register(Arc::new(threat_intel::ThreatIntelCollector::new(
                client.clone(),
                keys.virustotal.clone(),
            )))
            .register(Arc::new(url_reputation::UrlReputationCollector::new(
                client.clone(),
                keys.safe_browsing.clone(),
            )))
            .register(Arc::new(search_exposure::SearchExposureCollector::new(
                client.clone(),
                keys.google_search.clone(),
                keys.google_search_cx.clone(),
            )))
            .register(Arc::new(email_harvest::EmailHarvestCollector::new(
                client,
                keys.hunter.clone(),
            )));

        debug!(collectors = registry.len(), "Collector registry built.");
        Ok(registry)
    }
}

/// Builds the HTTP client shared by every collector.
///
/// # Arguments
///
/// * `user_agent` - Sent with every request.
/// * `timeout` - Per-request timeout, independent of the collector timeout.
///
/// # Returns
///
/// The client, or `CollectorError::Http` if the TLS backend cannot be set up.
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, CollectorError> {
    Ok(reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?)
}

/// A resolver using hickory's default upstream servers rather than the
/// host's resolv.conf. Must be created inside a Tokio runtime.
pub fn dns_resolver() -> TokioAsyncResolver {
    TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
}

/// Sends a prepared request and decodes a JSON body, mapping non-success
/// statuses to [`CollectorError::Status`].
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, CollectorError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CollectorError::Status { service, status: status.as_u16() });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| CollectorError::Decode(format!("{} response: {}", service, e)))
}

/// Treats an absent or blank API key as "not configured".
pub(crate) fn configured(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}
