// tests/orchestrator.rs

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use vanguard_osint::core::collectors::{CollectOptions, Collector, CollectorError, CollectorRegistry};
use vanguard_osint::core::error::ScanError;
use vanguard_osint::core::models::{
    CodeExposureFragment, CodeFinding, DomainFragment, Fragment, FragmentKind, OutcomeStatus,
    PhoneFragment, RiskLevel, ScanCategory, ScanId, ScanRecord, ScanRequest, ScanStatus,
    Subdomain,
};
use vanguard_osint::core::orchestrator::Orchestrator;
use vanguard_osint::core::scan_log::{ScanLog, ScanLogEntry, ScanLogError};
use vanguard_osint::core::store::{InMemoryScanStore, RecordMutation, ScanStore};
use vanguard_osint::core::target::DefaultTargetPolicy;

// --- Fake collectors ---

struct Static(Fragment);

#[async_trait]
impl Collector for Static {
    fn kind(&self) -> FragmentKind {
        self.0.kind()
    }

    async fn collect(&self, _: &str, _: &CollectOptions) -> Result<Option<Fragment>, CollectorError> {
        Ok(Some(self.0.clone()))
    }
}

struct Slow(FragmentKind, Duration);

#[async_trait]
impl Collector for Slow {
    fn kind(&self) -> FragmentKind {
        self.0
    }

    async fn collect(&self, _: &str, _: &CollectOptions) -> Result<Option<Fragment>, CollectorError> {
        tokio::time::sleep(self.1).await;
        Ok(None)
    }
}

struct Failing(FragmentKind);

#[async_trait]
impl Collector for Failing {
    fn kind(&self) -> FragmentKind {
        self.0
    }

    async fn collect(&self, _: &str, _: &CollectOptions) -> Result<Option<Fragment>, CollectorError> {
        Err(CollectorError::Status { service: "fake", status: 503 })
    }
}

struct Panicking(FragmentKind);

#[async_trait]
impl Collector for Panicking {
    fn kind(&self) -> FragmentKind {
        self.0
    }

    async fn collect(&self, _: &str, _: &CollectOptions) -> Result<Option<Fragment>, CollectorError> {
        panic!("collector blew up")
    }
}

/// Remembers the target and options it was called with.
struct Recording {
    kind: FragmentKind,
    calls: Arc<Mutex<Vec<(String, bool)>>>,
}

#[async_trait]
impl Collector for Recording {
    fn kind(&self) -> FragmentKind {
        self.kind
    }

    async fn collect(&self, target: &str, options: &CollectOptions) -> Result<Option<Fragment>, CollectorError> {
        self.calls.lock().unwrap().push((target.to_string(), options.deep_scan));
        Ok(None)
    }
}

/// Claims the username slot but hands back a phone fragment.
struct WrongSlot;

#[async_trait]
impl Collector for WrongSlot {
    fn kind(&self) -> FragmentKind {
        FragmentKind::Username
    }

    async fn collect(&self, _: &str, _: &CollectOptions) -> Result<Option<Fragment>, CollectorError> {
        Ok(Some(Fragment::Phone(PhoneFragment::default())))
    }
}

// --- Fake collaborators ---

#[derive(Default)]
struct RecordingLog {
    entries: Mutex<Vec<ScanLogEntry>>,
}

impl ScanLog for RecordingLog {
    fn append(&self, entry: &ScanLogEntry) -> Result<(), ScanLogError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

struct BrokenLog;

impl ScanLog for BrokenLog {
    fn append(&self, _: &ScanLogEntry) -> Result<(), ScanLogError> {
        Err(ScanLogError::Poisoned)
    }
}

/// Refuses to persist the completed state.
#[derive(Default)]
struct RefusesCompletion(InMemoryScanStore);

impl ScanStore for RefusesCompletion {
    fn insert(&self, record: ScanRecord) -> Result<(), ScanError> {
        self.0.insert(record)
    }

    fn get(&self, scan_id: &ScanId) -> Result<ScanRecord, ScanError> {
        self.0.get(scan_id)
    }

    fn update(&self, scan_id: &ScanId, mutation: RecordMutation<'_>) -> Result<ScanRecord, ScanError> {
        self.0.update(scan_id, &mut |record: &mut ScanRecord| {
            let mut draft = record.clone();
            mutation(&mut draft)?;
            if draft.status == ScanStatus::Completed {
                return Err(ScanError::Store("write refused".into()));
            }
            *record = draft;
            Ok(())
        })
    }
}

// --- Helpers ---

const TIMEOUT: Duration = Duration::from_millis(200);

fn domain_fragment(subdomains: usize) -> Fragment {
    let subdomains: Vec<Subdomain> = (0..subdomains)
        .map(|i| Subdomain { name: format!("s{i}.acme.io"), source: "crt.sh".into(), first_seen: None })
        .collect();
    Fragment::Domain(DomainFragment {
        domain: "acme.io".into(),
        subdomain_count: subdomains.len(),
        subdomains,
        ..Default::default()
    })
}

fn code_fragment() -> Fragment {
    let finding = |path: &str, risk| CodeFinding {
        repository: "acme/app".into(),
        file_path: path.into(),
        snippet: String::new(),
        finding_type: "leak".into(),
        risk_level: risk,
        url: format!("https://github.com/acme/app/blob/main/{path}"),
    };
    Fragment::CodeExposure(CodeExposureFragment::new(
        "acme.io",
        Vec::new(),
        vec![
            finding("a.env", RiskLevel::High),
            finding("README.md", RiskLevel::Low),
            finding("b.env", RiskLevel::High),
            finding("c.env", RiskLevel::High),
        ],
    ))
}

fn orchestrator(collectors: Vec<Arc<dyn Collector>>, log: Arc<dyn ScanLog>) -> Orchestrator {
    orchestrator_with_store(collectors, log, Arc::new(InMemoryScanStore::new()))
}

fn orchestrator_with_store(
    collectors: Vec<Arc<dyn Collector>>,
    log: Arc<dyn ScanLog>,
    store: Arc<dyn ScanStore>,
) -> Orchestrator {
    let mut registry = CollectorRegistry::new();
    for collector in collectors {
        registry.register(collector);
    }
    Orchestrator::new(
        store,
        registry,
        Arc::new(DefaultTargetPolicy::new(vec!["blocked.example".into()])),
        log,
        TIMEOUT,
    )
}

fn outcome_status(record: &ScanRecord, kind: FragmentKind) -> Option<OutcomeStatus> {
    record.outcomes.iter().find(|o| o.collector == kind).map(|o| o.status)
}

// --- Tests ---

#[tokio::test]
async fn timed_out_collector_does_not_block_completion() {
    let log = Arc::new(RecordingLog::default());
    let orchestrator = orchestrator(
        vec![
            Arc::new(Static(domain_fragment(25))),
            Arc::new(Slow(FragmentKind::TechStack, Duration::from_secs(10))),
            Arc::new(Static(code_fragment())),
        ],
        log.clone(),
    );

    let scan_id = orchestrator
        .submit_scan(ScanRequest::new("https://ACME.io/login", ScanCategory::Domain))
        .unwrap();
    let record = orchestrator.wait(&scan_id).await.unwrap();

    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.target, "acme.io");
    assert_eq!(record.collectors_dispatched, 3);
    assert_eq!(record.outcomes.len(), 3);
    assert_eq!(outcome_status(&record, FragmentKind::TechStack), Some(OutcomeStatus::TimedOut));
    assert!(!record.modules_executed.contains(&"tech_stack".to_string()));
    assert!(record.modules_executed.contains(&"domain".to_string()));
    assert!(record.modules_executed.contains(&"code_exposure".to_string()));
    assert!(!record.fragments.contains(FragmentKind::TechStack));

    // 10 for subdomains, 20 + 5 for code findings.
    let correlated = record.correlated.expect("completed scans carry a result");
    assert_eq!(correlated.risk_score, 35);
    assert_eq!(correlated.risk_level, RiskLevel::Medium);
    assert_eq!(correlated.attack_surface.len(), 24);
    assert!(correlated.attack_surface[..3].iter().all(|i| i.risk_level == RiskLevel::High));

    let statuses: Vec<ScanStatus> = log.entries.lock().unwrap().iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![ScanStatus::Pending, ScanStatus::Running, ScanStatus::Completed]);
    let last = log.entries.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.risk_level, Some(RiskLevel::Medium));
    assert!(last.execution_time.is_some());
}

#[tokio::test]
async fn failing_and_panicking_collectors_become_absent() {
    let orchestrator = orchestrator(
        vec![
            Arc::new(Failing(FragmentKind::Domain)),
            Arc::new(Panicking(FragmentKind::TechStack)),
            Arc::new(Static(code_fragment())),
        ],
        Arc::new(RecordingLog::default()),
    );

    let scan_id = orchestrator.submit_scan(ScanRequest::new("acme.io", ScanCategory::Domain)).unwrap();
    let record = orchestrator.wait(&scan_id).await.unwrap();

    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(outcome_status(&record, FragmentKind::Domain), Some(OutcomeStatus::Failed));
    assert_eq!(outcome_status(&record, FragmentKind::TechStack), Some(OutcomeStatus::Failed));
    assert_eq!(record.modules_executed, vec!["code_exposure".to_string()]);
    assert_eq!(record.fragments.len(), 1);
    assert_eq!(record.correlated.unwrap().risk_score, 25);
}

#[tokio::test]
async fn empty_results_still_count_as_executed() {
    let orchestrator = orchestrator(
        vec![Arc::new(Slow(FragmentKind::Username, Duration::from_millis(1)))],
        Arc::new(RecordingLog::default()),
    );
    let scan_id = orchestrator.submit_scan(ScanRequest::new("octocat", ScanCategory::Username)).unwrap();
    let record = orchestrator.wait(&scan_id).await.unwrap();

    assert_eq!(record.modules_executed, vec!["username".to_string()]);
    assert_eq!(outcome_status(&record, FragmentKind::Username), Some(OutcomeStatus::Empty));

    let correlated = record.correlated.unwrap();
    assert_eq!(correlated.risk_score, 0);
    assert!(correlated.attack_surface.is_empty());
    assert_eq!(correlated.recommendations.len(), 2);
}

#[tokio::test]
async fn fragments_only_fill_their_own_slot() {
    let orchestrator = orchestrator(vec![Arc::new(WrongSlot)], Arc::new(RecordingLog::default()));
    let scan_id = orchestrator.submit_scan(ScanRequest::new("octocat", ScanCategory::Username)).unwrap();
    let record = orchestrator.wait(&scan_id).await.unwrap();

    assert_eq!(outcome_status(&record, FragmentKind::Username), Some(OutcomeStatus::Failed));
    assert!(record.fragments.is_empty());
}

#[tokio::test]
async fn email_scans_look_up_the_mail_domain_passively() {
    let email_calls = Arc::new(Mutex::new(Vec::new()));
    let domain_calls = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = orchestrator(
        vec![
            Arc::new(Recording { kind: FragmentKind::Email, calls: email_calls.clone() }),
            Arc::new(Recording { kind: FragmentKind::Domain, calls: domain_calls.clone() }),
        ],
        Arc::new(RecordingLog::default()),
    );

    let request = ScanRequest::new("Jane.Doe@Acme.io", ScanCategory::Email).deep(true);
    let scan_id = orchestrator.submit_scan(request).unwrap();
    let record = orchestrator.wait(&scan_id).await.unwrap();

    assert_eq!(record.collectors_dispatched, 2);
    assert_eq!(*email_calls.lock().unwrap(), vec![("jane.doe@acme.io".to_string(), true)]);
    assert_eq!(*domain_calls.lock().unwrap(), vec![("acme.io".to_string(), false)]);
}

#[tokio::test]
async fn unregistered_collectors_are_not_dispatched() {
    let orchestrator = orchestrator(
        vec![Arc::new(Static(domain_fragment(3)))],
        Arc::new(RecordingLog::default()),
    );
    let scan_id = orchestrator.submit_scan(ScanRequest::new("acme.io", ScanCategory::Full)).unwrap();
    let record = orchestrator.wait(&scan_id).await.unwrap();

    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.collectors_dispatched, 1);
    assert_eq!(record.outcomes.len(), 1);
}

#[tokio::test]
async fn collectors_run_concurrently_and_progress_only_grows() {
    let orchestrator = orchestrator(
        vec![
            Arc::new(Slow(FragmentKind::Domain, Duration::from_millis(60))),
            Arc::new(Slow(FragmentKind::TechStack, Duration::from_millis(110))),
            Arc::new(Slow(FragmentKind::CodeExposure, Duration::from_millis(150))),
        ],
        Arc::new(RecordingLog::default()),
    );

    let started = Instant::now();
    let scan_id = orchestrator.submit_scan(ScanRequest::new("acme.io", ScanCategory::Domain)).unwrap();

    let mut last_settled = 0;
    let mut last_progress = 0;
    let mut observed = Vec::new();
    loop {
        let status = orchestrator.get_scan_status(&scan_id).unwrap();
        assert!(status.collectors_settled >= last_settled, "settled count went backwards");
        assert!(status.progress >= last_progress, "progress went backwards");
        last_settled = status.collectors_settled;
        last_progress = status.progress;
        observed.push(status.collectors_settled);
        if status.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let record = orchestrator.wait(&scan_id).await.unwrap();
    let elapsed = started.elapsed();

    // Sequential dispatch would need 320ms.
    assert!(elapsed < Duration::from_millis(300), "collectors were serialized: {:?}", elapsed);
    assert_eq!(record.status, ScanStatus::Completed);
    assert_eq!(record.outcomes.len(), 3);
    assert_eq!(last_progress, 100);
    assert!(observed.iter().any(|settled| *settled > 0 && *settled < 3));
}

#[tokio::test]
async fn result_is_all_or_nothing() {
    let orchestrator = orchestrator(
        vec![Arc::new(Slow(FragmentKind::Phone, Duration::from_millis(50)))],
        Arc::new(RecordingLog::default()),
    );
    let scan_id = orchestrator.submit_scan(ScanRequest::new("+15550100", ScanCategory::Phone)).unwrap();

    let in_flight = orchestrator.get_scan_result(&scan_id).unwrap();
    assert!(!in_flight.status.is_terminal());
    assert!(in_flight.correlated.is_none());
    assert!(orchestrator.get_scan_status(&scan_id).unwrap().progress < 100);

    let done = orchestrator.wait(&scan_id).await.unwrap();
    assert!(done.correlated.is_some());
    let status = orchestrator.get_scan_status(&scan_id).unwrap();
    assert_eq!(status.progress, 100);
    assert_eq!(status.collectors_settled, 1);
}

#[tokio::test]
async fn store_failure_fails_the_scan() {
    let orchestrator = orchestrator_with_store(
        vec![Arc::new(Static(domain_fragment(60)))],
        Arc::new(RecordingLog::default()),
        Arc::new(RefusesCompletion::default()),
    );
    let scan_id = orchestrator.submit_scan(ScanRequest::new("acme.io", ScanCategory::Domain)).unwrap();
    let record = orchestrator.wait(&scan_id).await.unwrap();

    assert_eq!(record.status, ScanStatus::Failed);
    assert!(record.error.unwrap().contains("write refused"));
    assert!(record.correlated.is_none());
}

#[tokio::test]
async fn scan_log_failures_are_ignored() {
    let orchestrator = orchestrator(vec![Arc::new(Static(domain_fragment(1)))], Arc::new(BrokenLog));
    let scan_id = orchestrator.submit_scan(ScanRequest::new("acme.io", ScanCategory::Domain)).unwrap();
    assert_eq!(orchestrator.wait(&scan_id).await.unwrap().status, ScanStatus::Completed);
}

#[tokio::test]
async fn bad_requests_never_create_records() {
    let orchestrator = orchestrator(Vec::new(), Arc::new(RecordingLog::default()));

    let empty = orchestrator.submit_scan(ScanRequest::new("  ", ScanCategory::Domain));
    assert!(matches!(empty, Err(ScanError::Validation(_))));

    for (target, category) in [
        ("localhost", ScanCategory::Domain),
        ("10.0.0.8", ScanCategory::Full),
        ("whitehouse.gov", ScanCategory::Domain),
        ("blocked.example", ScanCategory::Domain),
        ("not-an-email", ScanCategory::Email),
    ] {
        let result = orchestrator.submit_scan(ScanRequest::new(target, category));
        assert!(matches!(result, Err(ScanError::Rejected(_))), "{target}");
    }
}

#[tokio::test]
async fn unknown_scan_ids_are_not_found() {
    let orchestrator = orchestrator(Vec::new(), Arc::new(RecordingLog::default()));
    let missing = ScanId::from("does-not-exist");

    assert_eq!(orchestrator.get_scan_status(&missing), Err(ScanError::NotFound(missing.clone())));
    assert!(matches!(orchestrator.get_scan_result(&missing), Err(ScanError::NotFound(_))));
    assert!(matches!(orchestrator.wait(&missing).await, Err(ScanError::NotFound(_))));
}
