// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::core::error::ScanError;

// --- Identifiers & Enumerations ---

/// Opaque identifier handed out by the orchestrator when a scan is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(String);

impl ScanId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScanId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered severity classification. The derived `Ord` follows declaration
/// order, so `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Maps a clamped risk score to its level. Thresholds are inclusive upward.
    pub fn from_score(score: u8) -> Self {
        match score {
            70.. => RiskLevel::Critical,
            50..=69 => RiskLevel::High,
            30..=49 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// The requested target type; selects the dispatch set.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ScanCategory {
    Domain,
    Email,
    Username,
    Phone,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }
}

/// One tag per collector type. The variant name (snake_case) doubles as the
/// collector name recorded in `modules_executed`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FragmentKind {
    Domain,
    TechStack,
    CodeExposure,
    Email,
    Username,
    Phone,
    Infrastructure,
    ThreatIntel,
    UrlReputation,
    SearchExposure,
    EmailHarvest,
}

impl FragmentKind {
    pub fn collector_name(self) -> &'static str {
        self.into()
    }

    /// Third-party enrichment collectors, dispatched only by full scans.
    pub fn is_enrichment(self) -> bool {
        matches!(
            self,
            FragmentKind::Infrastructure
                | FragmentKind::ThreatIntel
                | FragmentKind::UrlReputation
                | FragmentKind::SearchExposure
                | FragmentKind::EmailHarvest
        )
    }
}

// --- Domain Fragment ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationData {
    pub registrar: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub expires: Option<DateTime<Utc>>,
    pub age_days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsData {
    pub a: Vec<String>,
    pub aaaa: Vec<String>,
    pub mx: Vec<MxRecord>,
    pub ns: Vec<String>,
    pub txt: Vec<String>,
    pub spf: Option<String>,
    pub dmarc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subdomain {
    pub name: String,
    pub source: String,
    pub first_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub is_valid: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainFragment {
    pub domain: String,
    pub registration: Option<RegistrationData>,
    pub dns: DnsData,
    pub subdomains: Vec<Subdomain>,
    pub subdomain_count: usize,
    pub ip_addresses: Vec<String>,
    pub certificate: Option<CertificateInfo>,
    pub insights: Vec<String>,
}

impl DomainFragment {
    pub fn age_days(&self) -> Option<i64> {
        self.registration.as_ref().and_then(|r| r.age_days)
    }
}

// --- Technology Fragment ---

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub category: String,
    pub version: Option<String>,
    pub security_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCheck {
    pub name: String,
    pub present: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnologyFragment {
    pub domain: String,
    pub web_server: Option<String>,
    pub cdn: Option<String>,
    pub technologies: Vec<Technology>,
    /// Ordered; attack-surface projection follows this order.
    pub security_headers: Vec<HeaderCheck>,
    pub analytics: Vec<String>,
    pub notes: Vec<String>,
}

impl TechnologyFragment {
    pub fn missing_headers(&self) -> impl Iterator<Item = &HeaderCheck> {
        self.security_headers.iter().filter(|h| !h.present)
    }
}

// --- Code Exposure Fragment ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub description: Option<String>,
    pub stars: u64,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeFinding {
    pub repository: String,
    pub file_path: String,
    pub snippet: String,
    /// "config", "api_key", "endpoint" or "leak".
    pub finding_type: String,
    pub risk_level: RiskLevel,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeExposureFragment {
    pub target: String,
    pub repositories: Vec<Repository>,
    pub findings: Vec<CodeFinding>,
    pub total_repos_found: usize,
    pub high_risk_findings: usize,
}

impl CodeExposureFragment {
    /// Builds the fragment and derives the counters from the collections.
    pub fn new(target: &str, repositories: Vec<Repository>, findings: Vec<CodeFinding>) -> Self {
        let high_risk_findings = findings
            .iter()
            .filter(|f| f.risk_level >= RiskLevel::High)
            .count();
        Self {
            target: target.to_string(),
            total_repos_found: repositories.len(),
            repositories,
            findings,
            high_risk_findings,
        }
    }
}

// --- Email Fragment ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmailRisk {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailFragment {
    pub email: String,
    pub valid_format: bool,
    pub mx_records: Vec<String>,
    pub mx_valid: bool,
    pub disposable: bool,
    pub pattern: Option<String>,
    pub breach_found: bool,
    pub breach_count: usize,
    pub risk: EmailRisk,
}

// --- Username Fragment ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPresence {
    pub platform: String,
    pub url: String,
    pub found: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsernameFragment {
    pub username: String,
    pub platforms: Vec<PlatformPresence>,
    pub total_platforms: usize,
    pub github_profile: Option<String>,
    pub insights: Vec<String>,
}

// --- Phone Fragment ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneFragment {
    pub phone: String,
    pub valid: bool,
    pub international_number: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub carrier: Option<String>,
    pub line_type: Option<String>,
    pub observations: Vec<String>,
}

impl PhoneFragment {
    pub fn is_voip(&self) -> bool {
        self.line_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("voip"))
    }
}

// --- Enrichment Fragments ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureFragment {
    pub ip: String,
    pub ports: Vec<u16>,
    pub hostnames: Vec<String>,
    pub tags: Vec<String>,
    pub vulnerabilities: Vec<String>,
    pub os: Option<String>,
    pub isp: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThreatVerdict {
    Clean,
    Suspicious,
    Malicious,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreatIntelFragment {
    pub target: String,
    pub reputation: i64,
    pub malicious_count: u32,
    pub suspicious_count: u32,
    pub harmless_count: u32,
    pub total_engines: u32,
    pub categories: Vec<String>,
    pub permalink: String,
}

impl ThreatIntelFragment {
    pub fn verdict(&self) -> ThreatVerdict {
        if self.malicious_count > 0 {
            ThreatVerdict::Malicious
        } else if self.suspicious_count > 0 {
            ThreatVerdict::Suspicious
        } else {
            ThreatVerdict::Clean
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlReputationFragment {
    pub url: String,
    pub is_safe: bool,
    pub threats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: Option<String>,
    pub dork: String,
    pub sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchExposureFragment {
    pub target: String,
    pub hits: Vec<SearchHit>,
    pub dorks_applied: Vec<String>,
}

impl SearchExposureFragment {
    pub fn sensitive_hits(&self) -> impl Iterator<Item = &SearchHit> {
        self.hits.iter().filter(|h| h.sensitive)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestedEmail {
    pub address: String,
    pub position: Option<String>,
    pub confidence: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailHarvestFragment {
    pub domain: String,
    pub pattern: Option<String>,
    pub emails: Vec<HarvestedEmail>,
}

// --- Fragment Union & Sparse Set ---

/// One collector's complete output. A fragment is always whole: collectors
/// return either a fully built variant or nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Fragment {
    Domain(DomainFragment),
    TechStack(TechnologyFragment),
    CodeExposure(CodeExposureFragment),
    Email(EmailFragment),
    Username(UsernameFragment),
    Phone(PhoneFragment),
    Infrastructure(InfrastructureFragment),
    ThreatIntel(ThreatIntelFragment),
    UrlReputation(UrlReputationFragment),
    SearchExposure(SearchExposureFragment),
    EmailHarvest(EmailHarvestFragment),
}

impl Fragment {
    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::Domain(_) => FragmentKind::Domain,
            Fragment::TechStack(_) => FragmentKind::TechStack,
            Fragment::CodeExposure(_) => FragmentKind::CodeExposure,
            Fragment::Email(_) => FragmentKind::Email,
            Fragment::Username(_) => FragmentKind::Username,
            Fragment::Phone(_) => FragmentKind::Phone,
            Fragment::Infrastructure(_) => FragmentKind::Infrastructure,
            Fragment::ThreatIntel(_) => FragmentKind::ThreatIntel,
            Fragment::UrlReputation(_) => FragmentKind::UrlReputation,
            Fragment::SearchExposure(_) => FragmentKind::SearchExposure,
            Fragment::EmailHarvest(_) => FragmentKind::EmailHarvest,
        }
    }
}

/// Sparse mapping from fragment kind to fragment. Keyed by kind, so the
/// iteration order never depends on the order fragments arrived in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentSet(BTreeMap<FragmentKind, Fragment>);

impl FragmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the fragment in its own slot, returning the one it replaced.
    pub fn insert(&mut self, fragment: Fragment) -> Option<Fragment> {
        self.0.insert(fragment.kind(), fragment)
    }

    pub fn get(&self, kind: FragmentKind) -> Option<&Fragment> {
        self.0.get(&kind)
    }

    pub fn contains(&self, kind: FragmentKind) -> bool {
        self.0.contains_key(&kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Fragment> for FragmentSet {
    fn from_iter<I: IntoIterator<Item = Fragment>>(iter: I) -> Self {
        let mut set = FragmentSet::new();
        for fragment in iter {
            set.insert(fragment);
        }
        set
    }
}

// --- Correlation Output ---

/// Category of an attack-surface item. Recommendations key off these.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SurfaceKind {
    Subdomain,
    Technology,
    SecurityHeader,
    ExposedFile,
    OpenPort,
    Vulnerability,
    ThreatIntel,
    UnsafeUrl,
    SearchExposure,
    HarvestedEmail,
    PhoneLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackSurfaceItem {
    pub item_type: SurfaceKind,
    pub name: String,
    pub risk_level: RiskLevel,
    pub description: String,
    pub source_modules: Vec<String>,
}

impl AttackSurfaceItem {
    pub fn new(
        item_type: SurfaceKind,
        name: impl Into<String>,
        risk_level: RiskLevel,
        description: impl Into<String>,
        source: FragmentKind,
    ) -> Self {
        Self {
            item_type,
            name: name.into(),
            risk_level,
            description: description.into(),
            source_modules: vec![source.collector_name().to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedIntelligence {
    pub target: String,
    pub attack_surface: Vec<AttackSurfaceItem>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

// --- Scan Lifecycle ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub target: String,
    pub category: ScanCategory,
    pub deep_scan: bool,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>, category: ScanCategory) -> Self {
        Self { target: target.into(), category, deep_scan: false }
    }

    pub fn deep(mut self, deep_scan: bool) -> Self {
        self.deep_scan = deep_scan;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutcomeStatus {
    /// The collector returned a fragment.
    Collected,
    /// The collector ran but had nothing to report.
    Empty,
    Failed,
    TimedOut,
}

impl OutcomeStatus {
    pub fn executed(self) -> bool {
        matches!(self, OutcomeStatus::Collected | OutcomeStatus::Empty)
    }
}

/// The settlement of one dispatched collector. Failed and timed-out
/// collectors are recorded here as the explicit absence marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectorOutcome {
    pub collector: FragmentKind,
    pub status: OutcomeStatus,
    pub detail: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_id: ScanId,
    pub target: String,
    pub category: ScanCategory,
    pub deep_scan: bool,
    pub status: ScanStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub fragments: FragmentSet,
    pub correlated: Option<CorrelatedIntelligence>,
    pub modules_executed: Vec<String>,
    pub outcomes: Vec<CollectorOutcome>,
    pub collectors_dispatched: usize,
    pub error: Option<String>,
}

impl ScanRecord {
    pub fn new(scan_id: ScanId, request: &ScanRequest) -> Self {
        Self {
            scan_id,
            target: request.target.clone(),
            category: request.category,
            deep_scan: request.deep_scan,
            status: ScanStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            fragments: FragmentSet::new(),
            correlated: None,
            modules_executed: Vec::new(),
            outcomes: Vec::new(),
            collectors_dispatched: 0,
            error: None,
        }
    }

    fn transition(&mut self, to: ScanStatus) -> Result<(), ScanError> {
        let allowed = matches!(
            (self.status, to),
            (ScanStatus::Pending, ScanStatus::Running)
                | (ScanStatus::Pending, ScanStatus::Failed)
                | (ScanStatus::Running, ScanStatus::Completed)
                | (ScanStatus::Running, ScanStatus::Failed)
        );
        if !allowed {
            return Err(ScanError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }

    pub fn start(&mut self, collectors_dispatched: usize) -> Result<(), ScanError> {
        self.transition(ScanStatus::Running)?;
        self.collectors_dispatched = collectors_dispatched;
        Ok(())
    }

    /// Records one collector settlement. Only the collector's own slot is
    /// written; executed collectors are appended to `modules_executed`.
    pub fn settle(
        &mut self,
        outcome: CollectorOutcome,
        fragment: Option<Fragment>,
    ) -> Result<(), ScanError> {
        if self.status != ScanStatus::Running {
            return Err(ScanError::InvalidTransition { from: self.status, to: ScanStatus::Running });
        }
        if outcome.status.executed() {
            self.modules_executed
                .push(outcome.collector.collector_name().to_string());
        }
        if let Some(fragment) = fragment {
            self.fragments.insert(fragment);
        }
        self.outcomes.push(outcome);
        Ok(())
    }

    pub fn complete(&mut self, correlated: CorrelatedIntelligence) -> Result<(), ScanError> {
        self.transition(ScanStatus::Completed)?;
        self.correlated = Some(correlated);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), ScanError> {
        self.transition(ScanStatus::Failed)?;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn execution_time_secs(&self) -> Option<f64> {
        self.completed_at
            .map(|done| (done - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    pub fn status_snapshot(&self) -> ScanStatusSnapshot {
        let settled = self.outcomes.len();
        let progress = match self.status {
            ScanStatus::Completed => 100,
            ScanStatus::Running if self.collectors_dispatched > 0 => {
                // Capped below 100 until correlation has run.
                ((settled * 100 / self.collectors_dispatched) as u8).min(99)
            }
            _ => 0,
        };
        ScanStatusSnapshot {
            scan_id: self.scan_id.clone(),
            status: self.status,
            collectors_dispatched: self.collectors_dispatched,
            collectors_settled: settled,
            progress,
            current_module: self
                .outcomes
                .last()
                .map(|o| o.collector.collector_name().to_string()),
            message: format!("Scan {}", self.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanStatusSnapshot {
    pub scan_id: ScanId,
    pub status: ScanStatus,
    pub collectors_dispatched: usize,
    pub collectors_settled: usize,
    pub progress: u8,
    pub current_module: Option<String>,
    pub message: String,
}
