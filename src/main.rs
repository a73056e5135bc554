pub mod app;
pub mod circuit;
pub mod config;
pub mod gates;
pub mod placement;
pub mod puzzle;
pub mod qasm;
pub mod quantum;
pub mod render;

use std::io;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use app::{App, Focus, LogKind, Screen};
use gates::Tool;
use puzzle::Role;

fn main() -> anyhow::Result<()> {
    let config = config::Config::parse();
    config.init_logging()?;
    info!(shots = config.shots, seed = config.seed, "starting q-heist");

    // Setup terminal
    enable_raw_mode().context("cannot enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %e, "event loop failed");
    }
    result.context("terminal I/O failed")
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render::render(f, app))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(app, key) {
                    info!("quit requested");
                    return Ok(());
                }
            }
            Event::Mouse(mouse) => {
                if mouse.kind == MouseEventKind::Down(MouseButton::Left)
                    && app.screen == Screen::Puzzle
                {
                    app.click_at(mouse.column, mouse.row);
                }
            }
            _ => {}
        }
    }
}

/// Returns true when the player asked to quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    let code = key.code;
    let mods = key.modifiers;

    // Global: Ctrl+C always quits
    if code == KeyCode::Char('c') && mods.contains(KeyModifiers::CONTROL) {
        return true;
    }
    if code == KeyCode::Char('q') {
        return true;
    }

    match app.screen {
        Screen::RoleSelect => handle_role_keys(app, code),
        Screen::Puzzle => match app.focus {
            Focus::Circuit => handle_circuit_keys(app, code, mods),
            Focus::Answers => handle_answer_keys(app, code),
        },
        Screen::Debrief => match code {
            KeyCode::Enter | KeyCode::Char('n') | KeyCode::Char(' ') => app.advance(),
            KeyCode::Char('r') => app.reset_game(),
            _ => {}
        },
        Screen::GameOver => {
            if matches!(code, KeyCode::Char('r') | KeyCode::Enter) {
                app.reset_game();
            }
        }
    }
    false
}

// ── Role select ────────────────────────────────────────────────────────────────

fn handle_role_keys(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => {
            app.role_cursor = app.role_cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.role_cursor = (app.role_cursor + 1).min(Role::ALL.len() - 1);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            let role = Role::ALL[app.role_cursor];
            app.select_role(role);
        }
        _ => {}
    }
}

// ── Focus::Circuit ─────────────────────────────────────────────────────────────

fn handle_circuit_keys(app: &mut App, code: KeyCode, mods: KeyModifiers) {
    match code {
        KeyCode::Char('s') if mods.contains(KeyModifiers::CONTROL) => match app.save_snapshot() {
            Ok(path) => app.push_log(LogKind::System, format!("Circuit saved to {}", path.display())),
            Err(e) => app.push_log(LogKind::Error, format!("Save failed: {e:#}")),
        },
        KeyCode::Tab if app.session.is_read_only() => app.focus = Focus::Answers,
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1, 0),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1, 0),
        KeyCode::Left | KeyCode::Char('h') => app.move_cursor(0, -1),
        KeyCode::Right | KeyCode::Char('l') => app.move_cursor(0, 1),
        KeyCode::Enter | KeyCode::Char(' ') => app.click_at_cursor(),
        KeyCode::Char(c @ '1'..='9') => {
            let idx = c as usize - '1' as usize;
            app.select_palette(idx);
        }
        KeyCode::Char('d') | KeyCode::Delete | KeyCode::Backspace => {
            app.select_tool(Some(Tool::Delete));
        }
        KeyCode::Esc => app.select_tool(None),
        KeyCode::Char('x') => app.run_circuit(),
        KeyCode::Char('r') => app.reset_game(),
        _ => {}
    }
}

// ── Focus::Answers ─────────────────────────────────────────────────────────────

fn handle_answer_keys(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Tab => app.focus = Focus::Circuit,
        KeyCode::Up | KeyCode::Char('k') => app.move_answer(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_answer(1),
        KeyCode::Enter | KeyCode::Char(' ') => app.submit_answer(),
        KeyCode::Char('r') => app.reset_game(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gates::GateKind;
    use crate::placement::Gesture;

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn keyboard_walkthrough_of_first_hacker_mission() {
        let mut app = App::new(Config::default());
        assert!(!press(&mut app, KeyCode::Enter));
        assert_eq!(app.role, Some(Role::Hacker));

        press(&mut app, KeyCode::Char('1'));
        assert_eq!(app.session.gesture(), Gesture::Armed(GateKind::H));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.session.circuit().count(GateKind::H), 1);
        assert_eq!(app.session.circuit().count(GateKind::M), 1);

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.screen, Screen::Debrief);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.screen, Screen::Puzzle);
        assert_eq!(app.puzzle_idx, 1);
    }

    #[test]
    fn escape_clears_and_q_quits() {
        let mut app = App::new(Config {
            role: Some(Role::Hacker),
            ..Config::default()
        });
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.session.gesture(), Gesture::Deleting);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.session.gesture(), Gesture::Idle);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn analyst_tab_switches_focus() {
        let mut app = App::new(Config {
            role: Some(Role::Analyst),
            ..Config::default()
        });
        assert_eq!(app.focus, Focus::Answers);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Circuit);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Answers);
    }
}
