// src/app.rs

use ratatui::widgets::{ListState, ScrollbarState};
use strum::IntoEnumIterator;
use tracing::{info, warn};

use vanguard_osint::core::models::{
    AttackSurfaceItem, RiskLevel, ScanCategory, ScanId, ScanRecord, ScanRequest, ScanStatus,
    ScanStatusSnapshot,
};
use vanguard_osint::core::orchestrator::Orchestrator;
use vanguard_osint::core::target::classify;
use vanguard_osint::logging::{get_data_dir, read_log_tail};

pub const SPINNER_CHARS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const LOG_TAIL_LINES: usize = 200;

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Idle,
    Scanning,
    Finished,
}

/// Attack-surface item counts per risk level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub score: u8,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ScanSummary {
    pub fn from_record(record: &ScanRecord) -> Self {
        let Some(correlated) = &record.correlated else {
            return Self::default();
        };
        let count = |level| correlated.attack_surface.iter().filter(|i| i.risk_level == level).count();
        Self {
            score: correlated.risk_score,
            critical: count(RiskLevel::Critical),
            high: count(RiskLevel::High),
            medium: count(RiskLevel::Medium),
            low: count(RiskLevel::Low),
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub show_disclaimer: bool,
    pub state: AppState,
    pub input: String,
    /// `None` lets the target decide.
    pub category: Option<ScanCategory>,
    pub deep_scan: bool,
    pub orchestrator: Orchestrator,
    pub scan_id: Option<ScanId>,
    pub status: Option<ScanStatusSnapshot>,
    pub record: Option<ScanRecord>,
    pub error_message: Option<String>,
    pub summary: ScanSummary,
    pub displayed_score: u8,
    pub spinner_frame: usize,
    pub surface_list_state: ListState,
    pub show_logs: bool,
    pub log_content: Vec<String>,
    pub log_horizontal_scroll: usize,
    pub log_horizontal_scroll_state: ScrollbarState,
    pub export_status: ExportStatus,
}

impl App {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            should_quit: false,
            show_disclaimer: true,
            state: AppState::Idle,
            input: String::new(),
            category: None,
            deep_scan: false,
            orchestrator,
            scan_id: None,
            status: None,
            record: None,
            error_message: None,
            summary: ScanSummary::default(),
            displayed_score: 0,
            spinner_frame: 0,
            surface_list_state: ListState::default(),
            show_logs: false,
            log_content: Vec::new(),
            log_horizontal_scroll: 0,
            log_horizontal_scroll_state: ScrollbarState::default(),
            export_status: ExportStatus::Idle,
        }
    }

    /// Auto → domain → email → username → phone → full → Auto.
    pub fn cycle_category(&mut self) {
        let all: Vec<ScanCategory> = ScanCategory::iter().collect();
        self.category = match self.category {
            None => all.first().copied(),
            Some(current) => all
                .iter()
                .position(|c| *c == current)
                .and_then(|i| all.get(i + 1).copied()),
        };
    }

    pub fn toggle_deep_scan(&mut self) {
        self.deep_scan = !self.deep_scan;
    }

    pub fn category_label(&self) -> String {
        match self.category {
            Some(category) => category.to_string(),
            None if self.input.trim().is_empty() => "auto".to_string(),
            None => format!("auto: {}", classify(&self.input)),
        }
    }

    pub fn build_request(&self) -> ScanRequest {
        let category = self.category.unwrap_or_else(|| classify(&self.input));
        ScanRequest::new(self.input.trim(), category).deep(self.deep_scan)
    }

    pub fn submit(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        let request = self.build_request();
        match self.orchestrator.submit_scan(request) {
            Ok(scan_id) => {
                info!(scan_id = %scan_id, "Scan submitted from UI.");
                self.scan_id = Some(scan_id);
                self.error_message = None;
                self.state = AppState::Scanning;
            }
            Err(e) => {
                warn!(error = %e, "Scan request refused.");
                self.error_message = Some(e.to_string());
            }
        }
    }

    /// Advances animations and polls the running scan.
    pub fn on_tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();

        let polling = match self.state {
            AppState::Scanning => self.scan_id.clone(),
            _ => None,
        };
        if let Some(scan_id) = polling {
            match self.orchestrator.get_scan_status(&scan_id) {
                Ok(status) if status.status.is_terminal() => {
                    self.status = Some(status);
                    self.finish();
                }
                Ok(status) => self.status = Some(status),
                Err(e) => {
                    self.error_message = Some(e.to_string());
                    self.state = AppState::Idle;
                }
            }
        }

        if self.displayed_score < self.summary.score {
            self.displayed_score += 1;
        }

        if self.show_logs {
            self.log_content = read_log_tail(LOG_TAIL_LINES);
        }
    }

    fn finish(&mut self) {
        let Some(scan_id) = &self.scan_id else {
            return;
        };
        match self.orchestrator.get_scan_result(scan_id) {
            Ok(record) => {
                self.summary = ScanSummary::from_record(&record);
                self.displayed_score = 0;
                let has_items = record
                    .correlated
                    .as_ref()
                    .is_some_and(|c| !c.attack_surface.is_empty());
                self.surface_list_state.select(if has_items { Some(0) } else { None });
                if record.status == ScanStatus::Failed {
                    self.error_message = record.error.clone();
                }
                self.record = Some(record);
            }
            Err(e) => self.error_message = Some(e.to_string()),
        }
        self.state = AppState::Finished;
    }

    pub fn attack_surface(&self) -> &[AttackSurfaceItem] {
        self.record
            .as_ref()
            .and_then(|r| r.correlated.as_ref())
            .map(|c| c.attack_surface.as_slice())
            .unwrap_or_default()
    }

    pub fn selected_item(&self) -> Option<&AttackSurfaceItem> {
        self.surface_list_state
            .selected()
            .and_then(|i| self.attack_surface().get(i))
    }

    pub fn next_item(&mut self) {
        let len = self.attack_surface().len();
        if len == 0 {
            return;
        }
        let next = self.surface_list_state.selected().map_or(0, |i| (i + 1) % len);
        self.surface_list_state.select(Some(next));
    }

    pub fn previous_item(&mut self) {
        let len = self.attack_surface().len();
        if len == 0 {
            return;
        }
        let previous = self
            .surface_list_state
            .selected()
            .map_or(0, |i| if i == 0 { len - 1 } else { i - 1 });
        self.surface_list_state.select(Some(previous));
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
        if self.show_logs {
            self.log_content = read_log_tail(LOG_TAIL_LINES);
        }
    }

    pub fn scroll_log_left(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_sub(4);
        self.log_horizontal_scroll_state =
            self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    pub fn scroll_log_right(&mut self) {
        self.log_horizontal_scroll = self.log_horizontal_scroll.saturating_add(4);
        self.log_horizontal_scroll_state =
            self.log_horizontal_scroll_state.position(self.log_horizontal_scroll);
    }

    /// Writes the finished record as pretty JSON into the data directory.
    pub fn export(&mut self) {
        let Some(record) = &self.record else {
            return;
        };
        let path = get_data_dir().join(format!("scan-{}.json", record.scan_id));
        let result = serde_json::to_string_pretty(record)
            .map_err(|e| e.to_string())
            .and_then(|json| {
                std::fs::create_dir_all(get_data_dir()).map_err(|e| e.to_string())?;
                std::fs::write(&path, json).map_err(|e| e.to_string())
            });
        self.export_status = match result {
            Ok(()) => {
                info!(path = %path.display(), "Scan exported.");
                ExportStatus::Success(path.display().to_string())
            }
            Err(e) => {
                warn!(error = %e, "Export failed.");
                ExportStatus::Error(e)
            }
        };
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.scan_id = None;
        self.status = None;
        self.record = None;
        self.error_message = None;
        self.summary = ScanSummary::default();
        self.displayed_score = 0;
        self.surface_list_state = ListState::default();
        self.export_status = ExportStatus::Idle;
    }
}
