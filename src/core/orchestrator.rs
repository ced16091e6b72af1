// src/core/orchestrator.rs

//! The scan orchestrator.
//!
//! `submit_scan` validates a request, creates a `pending` record and hands
//! the scan to a supervised background task:
//!
//! ```text
//! supervisor task ── awaits ──> scan task ── JoinSet ──> one task per collector
//!                                                          └─ spawned collector future (timeout)
//! ```
//!
//! Every collector settles as exactly one [`CollectorOutcome`]; errors,
//! timeouts and panics all become an empty slot. Correlation runs once, after
//! the last settlement. Anything that goes wrong outside that isolation
//! boundary is caught by the supervisor and fails the scan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::core::collectors::{CollectOptions, Collector, CollectorError, CollectorRegistry};
use crate::core::correlation::correlate;
use crate::core::error::ScanError;
use crate::core::models::{
    CollectorOutcome, Fragment, FragmentKind, OutcomeStatus, ScanCategory, ScanId, ScanRecord,
    ScanRequest, ScanStatusSnapshot,
};
use crate::core::scan_log::{JsonlScanLog, ScanLog, ScanLogEntry};
use crate::core::store::{InMemoryScanStore, ScanStore};
use crate::core::target::{DefaultTargetPolicy, TargetPolicy, mail_domain, validate_request};

const DOMAIN_SET: &[FragmentKind] =
    &[FragmentKind::Domain, FragmentKind::TechStack, FragmentKind::CodeExposure];
const ENRICHMENT_SET: &[FragmentKind] = &[
    FragmentKind::Infrastructure,
    FragmentKind::ThreatIntel,
    FragmentKind::UrlReputation,
    FragmentKind::SearchExposure,
    FragmentKind::EmailHarvest,
];

/// One collector invocation of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub kind: FragmentKind,
    pub target: String,
    pub options: CollectOptions,
}

impl Dispatch {
    fn new(kind: FragmentKind, target: impl Into<String>, deep_scan: bool) -> Self {
        Self { kind, target: target.into(), options: CollectOptions { deep_scan } }
    }
}

/// The collectors a request calls for, before registry lookup.
///
/// Email scans also run the domain collector against the mail domain, as a
/// passive lookup regardless of the deep-scan flag.
pub fn dispatch_plan(request: &ScanRequest) -> Vec<Dispatch> {
    let target = request.target.as_str();
    let deep = request.deep_scan;
    match request.category {
        ScanCategory::Domain => DOMAIN_SET.iter().map(|k| Dispatch::new(*k, target, deep)).collect(),
        ScanCategory::Full => DOMAIN_SET
            .iter()
            .chain(ENRICHMENT_SET)
            .map(|k| Dispatch::new(*k, target, deep))
            .collect(),
        ScanCategory::Email => {
            let mut plan = vec![Dispatch::new(FragmentKind::Email, target, deep)];
            if let Some(domain) = mail_domain(target) {
                plan.push(Dispatch::new(FragmentKind::Domain, domain, false));
            }
            plan
        }
        ScanCategory::Username => vec![Dispatch::new(FragmentKind::Username, target, deep)],
        ScanCategory::Phone => vec![Dispatch::new(FragmentKind::Phone, target, deep)],
    }
}

/// State shared between the orchestrator handle and its scan tasks.
struct Engine {
    store: Arc<dyn ScanStore>,
    registry: CollectorRegistry,
    scan_log: Arc<dyn ScanLog>,
    collector_timeout: Duration,
}

impl Engine {
    /// Applies a lifecycle transition and offers the new state to the scan log.
    fn transition(
        &self,
        scan_id: &ScanId,
        mut mutation: impl FnMut(&mut ScanRecord) -> Result<(), ScanError>,
    ) -> Result<ScanRecord, ScanError> {
        let record = self.store.update(scan_id, &mut mutation)?;
        self.log_transition(&record);
        Ok(record)
    }

    fn log_transition(&self, record: &ScanRecord) {
        if let Err(e) = self.scan_log.append(&ScanLogEntry::from(record)) {
            warn!(scan_id = %record.scan_id, error = %e, "Could not write scan log entry.");
        }
    }

    async fn run(self: Arc<Self>, scan_id: ScanId, request: ScanRequest) -> Result<(), ScanError> {
        let jobs: Vec<(Dispatch, Arc<dyn Collector>)> = dispatch_plan(&request)
            .into_iter()
            .filter_map(|job| match self.registry.get(job.kind) {
                Some(collector) => Some((job, collector)),
                None => {
                    warn!(scan_id = %scan_id, collector = %job.kind, "No collector registered, skipping.");
                    None
                }
            })
            .collect();

        let dispatched = jobs.len();
        self.transition(&scan_id, |record| record.start(dispatched))?;
        info!(scan_id = %scan_id, collectors = dispatched, "Scan running.");

        let mut set = JoinSet::new();
        for (job, collector) in jobs {
            set.spawn(isolate(job, collector, self.collector_timeout));
        }

        while let Some(joined) = set.join_next().await {
            let (outcome, fragment) =
                joined.map_err(|e| ScanError::Orchestration(format!("Collector supervisor lost: {}", e)))?;
            debug!(
                scan_id = %scan_id,
                collector = %outcome.collector,
                status = %outcome.status,
                elapsed_ms = outcome.elapsed_ms,
                "Collector settled."
            );
            let mut slot = Some((outcome, fragment));
            self.store.update(&scan_id, &mut |record: &mut ScanRecord| match slot.take() {
                Some((outcome, fragment)) => record.settle(outcome, fragment),
                None => Ok(()),
            })?;
        }

        let fragments = self.store.get(&scan_id)?.fragments;
        let correlated = correlate(&request.target, &fragments);
        let risk_level = correlated.risk_level;
        let mut correlated = Some(correlated);
        self.transition(&scan_id, |record| match correlated.take() {
            Some(correlated) => record.complete(correlated),
            None => Ok(()),
        })?;

        info!(scan_id = %scan_id, risk_level = %risk_level, "Scan completed.");
        Ok(())
    }

    async fn supervise(self: Arc<Self>, scan_id: ScanId, request: ScanRequest) {
        let scan = tokio::spawn(self.clone().run(scan_id.clone(), request));
        let failure = match scan.await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) if e.is_panic() => "Scan task panicked".to_string(),
            Err(e) => format!("Scan task aborted: {}", e),
        };

        error!(scan_id = %scan_id, error = %failure, "Scan failed.");
        if let Err(e) = self.transition(&scan_id, |record| record.fail(failure.clone())) {
            warn!(scan_id = %scan_id, error = %e, "Could not mark scan as failed.");
        }
    }
}

/// Runs one collector in its own task under the collector timeout and folds
/// every result into an outcome.
async fn isolate(
    job: Dispatch,
    collector: Arc<dyn Collector>,
    timeout: Duration,
) -> (CollectorOutcome, Option<Fragment>) {
    let started = Instant::now();
    let Dispatch { kind, target, options } = job;
    let mut task = tokio::spawn(async move { collector.collect(&target, &options).await });

    let (status, detail, fragment) = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(Ok(Some(fragment)))) if fragment.kind() == kind => {
            (OutcomeStatus::Collected, None, Some(fragment))
        }
        Ok(Ok(Ok(Some(fragment)))) => (
            OutcomeStatus::Failed,
            Some(format!("Returned a {} fragment", fragment.kind())),
            None,
        ),
        Ok(Ok(Ok(None))) => (OutcomeStatus::Empty, None, None),
        Ok(Ok(Err(e))) => {
            warn!(collector = %kind, error = %e, "Collector failed.");
            (OutcomeStatus::Failed, Some(e.to_string()), None)
        }
        Ok(Err(e)) => {
            let e = CollectorError::Task(e.to_string());
            warn!(collector = %kind, error = %e, "Collector task crashed.");
            (OutcomeStatus::Failed, Some(e.to_string()), None)
        }
        Err(_) => {
            task.abort();
            warn!(collector = %kind, timeout_secs = timeout.as_secs_f64(), "Collector timed out.");
            (OutcomeStatus::TimedOut, Some(format!("No response within {:?}", timeout)), None)
        }
    };

    let outcome = CollectorOutcome {
        collector: kind,
        status,
        detail,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    (outcome, fragment)
}

/// Entry point for scans: accepts requests, runs them in the background and
/// answers status and result queries.
pub struct Orchestrator {
    engine: Arc<Engine>,
    policy: Arc<dyn TargetPolicy>,
    tasks: Mutex<HashMap<ScanId, JoinHandle<()>>>,
}

impl Orchestrator {
    /// Wires the orchestrator to its collaborators.
    ///
    /// # Arguments
    ///
    /// * `store` - Where scan records live; every state transition goes through it.
    /// * `registry` - The collectors available for dispatch. Kinds missing here are skipped.
    /// * `policy` - Decides whether a target may be scanned at all.
    /// * `scan_log` - Receives every lifecycle transition. Its failures are logged and ignored.
    /// * `collector_timeout` - Upper bound on each collector's run time.
    pub fn new(
        store: Arc<dyn ScanStore>,
        registry: CollectorRegistry,
        policy: Arc<dyn TargetPolicy>,
        scan_log: Arc<dyn ScanLog>,
        collector_timeout: Duration,
    ) -> Self {
        Self {
            engine: Arc::new(Engine { store, registry, scan_log, collector_timeout }),
            policy,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// The bundled collectors, an in-memory store, the default policy and a
    /// JSON-lines scan log.
    pub fn from_settings(settings: &Settings) -> Result<Self, CollectorError> {
        let scan_log_path = settings
            .scan_log_path
            .clone()
            .unwrap_or_else(|| crate::logging::get_data_dir().join("scans.jsonl"));

        Ok(Self::new(
            Arc::new(InMemoryScanStore::new()),
            CollectorRegistry::with_defaults(settings)?,
            Arc::new(DefaultTargetPolicy::new(settings.blocked_targets.clone())),
            Arc::new(JsonlScanLog::new(scan_log_path)),
            settings.collector_timeout(),
        ))
    }

    /// Accepts a scan and returns its id at once; the work runs in the
    /// background. Must be called from within a Tokio runtime.
    ///
    /// Fails with `Validation` for malformed input and `Rejected` when the
    /// safety policy refuses the target. No record is created in either case.
    pub fn submit_scan(&self, request: ScanRequest) -> Result<ScanId, ScanError> {
        let request = validate_request(&request)?;
        self.policy
            .check(&request.target, request.category)
            .map_err(ScanError::Rejected)?;

        let scan_id = ScanId::generate();
        let record = ScanRecord::new(scan_id.clone(), &request);
        self.engine.store.insert(record.clone())?;
        self.engine.log_transition(&record);
        info!(
            scan_id = %scan_id,
            target = %request.target,
            category = %request.category,
            deep = request.deep_scan,
            "Scan accepted."
        );

        let handle = tokio::spawn(self.engine.clone().supervise(scan_id.clone(), request));
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(scan_id.clone(), handle);
        Ok(scan_id)
    }

    /// Returns the scan's lifecycle state and collector progress.
    ///
    /// # Arguments
    ///
    /// * `scan_id` - The id returned by [`Orchestrator::submit_scan`].
    ///
    /// # Returns
    ///
    /// A snapshot whose `collectors_settled` and `progress` never decrease
    /// while the scan runs, or `ScanError::NotFound` for an unknown id.
    pub fn get_scan_status(&self, scan_id: &ScanId) -> Result<ScanStatusSnapshot, ScanError> {
        Ok(self.engine.store.get(scan_id)?.status_snapshot())
    }

    /// The record as it stands; callers check `status` to tell a running
    /// scan from a finished one.
    ///
    /// # Returns
    ///
    /// The full `ScanRecord`. `correlated` is only set once the scan has
    /// completed. Unknown ids yield `ScanError::NotFound`.
    pub fn get_scan_result(&self, scan_id: &ScanId) -> Result<ScanRecord, ScanError> {
        self.engine.store.get(scan_id)
    }

    /// Waits for the scan's background task and returns the final record.
    ///
    /// The task handle is consumed by the first waiter; later calls return
    /// the record as it stands.
    pub async fn wait(&self, scan_id: &ScanId) -> Result<ScanRecord, ScanError> {
        let handle = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(scan_id);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(scan_id = %scan_id, error = %e, "Scan supervisor crashed.");
            }
        }
        self.engine.store.get(scan_id)
    }
}
