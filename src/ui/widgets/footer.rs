// src/ui/widgets/footer.rs

use crate::app::{App, AppState, ExportStatus};
use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key(label: &str) -> Span<'_> {
    Span::styled(label, Style::new().bold().fg(Color::Yellow))
}

/// Renders the footer widget, which displays available actions.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.state {
        AppState::Idle => Line::from(vec![
            key("Enter"),
            Span::raw(" scan, "),
            key("Tab"),
            Span::raw(" category, "),
            key("Shift-Tab"),
            Span::raw(" deep scan, "),
            key("Esc"),
            Span::raw(" quit"),
        ]),
        AppState::Finished => match &app.export_status {
            ExportStatus::Success(path) => {
                Line::from(format!("Exported to {}", path)).style(Style::new().fg(Color::Green))
            }
            ExportStatus::Error(e) => {
                Line::from(format!("Export failed: {}", e)).style(Style::new().fg(Color::Red))
            }
            ExportStatus::Idle => Line::from(vec![
                key("[N]"),
                Span::raw("ew scan, "),
                key("[E]"),
                Span::raw("xport, "),
                key("[L]"),
                Span::raw("ogs, "),
                key("[Q]"),
                Span::raw("uit"),
            ]),
        },
        AppState::Scanning => Line::from(vec![
            Span::raw("Scanning... "),
            key("L"),
            Span::raw(" logs, "),
            key("Q"),
            Span::raw(" quit"),
        ]),
    };

    let footer = Paragraph::new(line).alignment(Alignment::Center);
    frame.render_widget(footer, area);
}
