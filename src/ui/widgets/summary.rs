// src/ui/widgets/summary.rs

use super::analysis_view::risk_style;
use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use vanguard_osint::core::models::{OutcomeStatus, RiskLevel};

/// Renders the summary widget: the risk score, the gauge, item counts per
/// risk level and the state of each collector.
///
/// While a scan is running only its progress is shown.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // score and level
            Constraint::Length(1), // gauge
            Constraint::Length(1),
            Constraint::Length(5), // counts
            Constraint::Length(1),
            Constraint::Min(0),    // collectors
        ])
        .split(area);

    match app.state {
        AppState::Idle => return,
        AppState::Scanning => {
            let progress = app.status.as_ref().map_or(0, |s| s.progress);
            let gauge = Gauge::default()
                .percent(u16::from(progress))
                .label(format!("{}%", progress))
                .gauge_style(Style::default().fg(Color::Cyan));
            frame.render_widget(Paragraph::new("Progress".bold()).alignment(Alignment::Center), summary_chunks[0]);
            frame.render_widget(gauge, summary_chunks[1]);
            return;
        }
        AppState::Finished => {}
    }

    // Higher scores are worse.
    let level = RiskLevel::from_score(app.summary.score);
    let score_line = Line::from(format!("{}/100 ({})", app.summary.score, level.to_string().to_uppercase()))
        .style(risk_style(level));
    let score_text = Text::from(vec![Line::from("Risk Score".bold()), score_line]);
    frame.render_widget(Paragraph::new(score_text).alignment(Alignment::Center), summary_chunks[0]);

    let score_gauge = Gauge::default()
        .percent(u16::from(app.displayed_score.min(100)))
        .label("")
        .style(Style::default().fg(match app.displayed_score {
            70.. => Color::Red,
            50..=69 => Color::LightRed,
            30..=49 => Color::Yellow,
            _ => Color::Green,
        }));
    frame.render_widget(score_gauge, summary_chunks[1]);

    let counts_block = Block::default().title("ATTACK SURFACE".bold());
    let counts = [
        (RiskLevel::Critical, app.summary.critical),
        (RiskLevel::High, app.summary.high),
        (RiskLevel::Medium, app.summary.medium),
        (RiskLevel::Low, app.summary.low),
    ];
    let count_lines: Vec<Line> = counts
        .into_iter()
        .map(|(level, count)| {
            Line::from(vec![
                Span::raw(format!("{:<10}", level.to_string())),
                Span::styled(count.to_string(), risk_style(level)),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(count_lines).block(counts_block), summary_chunks[3]);

    let collectors_block = Block::default().title("COLLECTORS".bold());
    let mut collector_lines = Vec::new();
    if let Some(record) = &app.record {
        for outcome in &record.outcomes {
            let (icon, style) = match outcome.status {
                OutcomeStatus::Collected => ("✓", Style::default().fg(Color::Green)),
                OutcomeStatus::Empty => ("○", Style::default().fg(Color::DarkGray)),
                OutcomeStatus::Failed | OutcomeStatus::TimedOut => ("✗", Style::default().fg(Color::Red)),
            };
            let mut spans = vec![
                Span::styled(format!("{} ", icon), style),
                Span::raw(outcome.collector.collector_name()),
            ];
            if !outcome.status.executed() {
                let reason = outcome.detail.clone().unwrap_or_else(|| "timed out".to_string());
                spans.push(Span::styled(format!(" ({})", reason), Style::default().fg(Color::DarkGray)));
            }
            collector_lines.push(Line::from(spans));
        }
    }
    frame.render_widget(Paragraph::new(collector_lines).block(collectors_block), summary_chunks[5]);
}
