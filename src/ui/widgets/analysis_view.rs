// src/ui/widgets/analysis_view.rs

use crate::app::{App, AppState, SPINNER_CHARS};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use vanguard_osint::core::knowledge_base;
use vanguard_osint::core::models::{RiskLevel, ScanStatus};

pub fn risk_style(level: RiskLevel) -> Style {
    match level {
        RiskLevel::Critical => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        RiskLevel::High => Style::default().fg(Color::Red),
        RiskLevel::Medium => Style::default().fg(Color::Yellow),
        RiskLevel::Low => Style::default().fg(Color::Cyan),
    }
}

pub fn render_analysis_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Attack Surface (Navigate with ↑ ↓)");

    match app.state {
        AppState::Idle => {
            let content = Paragraph::new("Enter a domain, email, username or phone number.")
                .alignment(Alignment::Center);
            frame.render_widget(content.block(main_block), area);
            return;
        }
        AppState::Scanning => {
            render_progress(frame, app, main_block, area);
            return;
        }
        AppState::Finished => {}
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    if let Some(record) = &app.record {
        if record.status == ScanStatus::Failed {
            let message = record.error.clone().unwrap_or_else(|| "unknown error".to_string());
            let text = vec![
                Line::from("SCAN FAILED".red().bold()),
                Line::from(""),
                Line::from(message),
            ];
            let p = Paragraph::new(text).wrap(Wrap { trim: true }).alignment(Alignment::Center);
            frame.render_widget(p, inner_area);
            return;
        }
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(25),
            Constraint::Min(0),
        ])
        .split(inner_area);

    let items: Vec<ListItem> = app
        .attack_surface()
        .iter()
        .map(|item| {
            let prefix = knowledge_base::detail_for(item.item_type)
                .map(|d| format!("[{}] ", d.category))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(prefix, Style::default().fg(Color::DarkGray)),
                Span::styled(item.name.clone(), risk_style(item.risk_level)),
            ]))
        })
        .collect();

    let surface_list = List::new(items)
        .block(Block::default())
        .highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(surface_list, chunks[0], &mut app.surface_list_state);

    render_details(frame, app, chunks[1]);
    render_findings(frame, app, chunks[2]);
}

fn render_progress(frame: &mut Frame, app: &App, block: Block, area: Rect) {
    let spinner_char = SPINNER_CHARS[app.spinner_frame];
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
        Span::raw(format!("Scanning {}...", app.input.trim())),
    ])];
    if let Some(status) = &app.status {
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "{} of {} collectors settled",
            status.collectors_settled, status.collectors_dispatched
        )));
        if let Some(module) = &status.current_module {
            lines.push(Line::from(format!("Last settled: {}", module)).fg(Color::DarkGray));
        }
    }
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(block);
    frame.render_widget(p, area);
}

fn render_details(frame: &mut Frame, app: &App, area: Rect) {
    let detail_block = Block::default().borders(Borders::TOP).title("Details");

    let Some(item) = app.selected_item() else {
        let text = if app.attack_surface().is_empty() {
            Text::from(vec![
                Line::from(""),
                Line::from("✓ NO EXPOSURE FOUND".bold().fg(Color::Green)),
                Line::from(""),
                Line::from("None of the collectors reported an attack-surface item."),
            ])
        } else {
            Text::from("Select an item above to see details.")
        };
        let p = Paragraph::new(text).alignment(Alignment::Center).block(detail_block);
        frame.render_widget(p, area);
        return;
    };

    let mut text = vec![
        Line::from(vec![
            Span::styled(item.risk_level.to_string().to_uppercase(), risk_style(item.risk_level)),
            Span::raw(format!("  {}", item.description)),
        ]),
        Line::from(format!("Reported by: {}", item.source_modules.join(", "))).fg(Color::DarkGray),
    ];
    if let Some(detail) = knowledge_base::detail_for(item.item_type) {
        text.push(Line::from(""));
        text.push(Line::from(detail.title.yellow().bold()));
        text.push(Line::from(detail.description));
    }
    if let Some(remediation) = knowledge_base::remediation_for(item) {
        text.push(Line::from(""));
        text.push(Line::from("HOW TO FIX:".yellow().bold()));
        text.push(Line::from(remediation));
    }
    let p = Paragraph::new(text).wrap(Wrap { trim: true }).block(detail_block);
    frame.render_widget(p, area);
}

fn render_findings(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::TOP).title("Key Findings");
    let Some(correlated) = app.record.as_ref().and_then(|r| r.correlated.as_ref()) else {
        frame.render_widget(block, area);
        return;
    };

    let mut lines: Vec<Line> = correlated
        .key_findings
        .iter()
        .map(|f| Line::from(vec![Span::raw("• "), Span::raw(f.as_str())]))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from("RECOMMENDATIONS".yellow().bold()));
    lines.extend(
        correlated
            .recommendations
            .iter()
            .map(|r| Line::from(vec![Span::styled("→ ", Style::default().fg(Color::Green)), Span::raw(r.as_str())])),
    );

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    frame.render_widget(p, area);
}
