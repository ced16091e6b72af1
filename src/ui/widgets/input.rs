// src/ui/widgets/input.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// Renders the target input box. The title shows the selected category and
/// the deep-scan flag; a refused request replaces the title with the reason.
pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.error_message {
        Some(message) if matches!(app.state, AppState::Idle) => {
            Line::from(format!(" {} ", message)).style(Style::default().fg(Color::Red))
        }
        _ => Line::from(vec![
            Span::raw(" Target "),
            Span::styled(format!("[{}]", app.category_label()), Style::default().fg(Color::Cyan)),
            Span::raw(" "),
            if app.deep_scan {
                Span::styled("[deep]", Style::default().fg(Color::Magenta))
            } else {
                Span::styled("[quick]", Style::default().fg(Color::DarkGray))
            },
            Span::raw(" "),
        ]),
    };

    let input_block = Block::default().borders(Borders::ALL).title(title);
    let input_paragraph = Paragraph::new(app.input.as_str())
        .block(input_block)
        .style(Style::default().fg(Color::Yellow));
    frame.render_widget(input_paragraph, area);

    if matches!(app.state, AppState::Idle) && !app.show_disclaimer {
        frame.set_cursor_position(Position::new(
            area.x + app.input.chars().count() as u16 + 1,
            area.y + 1,
        ));
    }
}
