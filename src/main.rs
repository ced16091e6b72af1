// src/main.rs

use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

use vanguard_osint::config::Settings;
use vanguard_osint::core::orchestrator::Orchestrator;
use vanguard_osint::logging;

mod app;
mod ui;

use app::{App, AppState};

const TICK_RATE: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    logging::initialize_logging()?;

    let settings = Settings::load().wrap_err("could not load settings")?;
    let orchestrator = Orchestrator::from_settings(&settings).wrap_err("could not build collectors")?;
    info!(timeout_secs = settings.collector_timeout_secs, "Starting up.");

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = App::new(orchestrator);
    let result = run(&mut terminal, &mut app);

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }
        app.on_tick();
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }
    if app.show_disclaimer {
        match key.code {
            KeyCode::Enter => app.show_disclaimer = false,
            KeyCode::Esc | KeyCode::Char('q') => app.quit(),
            _ => {}
        }
        return;
    }
    match app.state {
        AppState::Idle => handle_idle_input(app, key.code),
        AppState::Scanning => match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
            KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_logs(),
            _ => {}
        },
        AppState::Finished => handle_finished_input(app, key.code),
    }
}

/// While typing, letters go to the input; Esc quits.
fn handle_idle_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Esc => app.quit(),
        KeyCode::Tab => app.cycle_category(),
        KeyCode::BackTab => app.toggle_deep_scan(),
        KeyCode::Char(c) => {
            app.input.push(c);
            app.error_message = None;
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Enter => app.submit(),
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.reset(),
        KeyCode::Char('e') | KeyCode::Char('E') => app.export(),
        KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_logs(),
        KeyCode::Up => app.previous_item(),
        KeyCode::Down => app.next_item(),
        KeyCode::Left => app.scroll_log_left(),
        KeyCode::Right => app.scroll_log_right(),
        _ => {}
    }
}
