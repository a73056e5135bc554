use std::collections::VecDeque;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use tracing::{info, warn};

use crate::circuit::Circuit;
use crate::config::Config;
use crate::gates::Tool;
use crate::placement::{Gesture, Outcome, Session};
use crate::puzzle::{Puzzle, PuzzleKind, Role};
use crate::quantum::{run_shots, Counts};

const LOG_CAPACITY: usize = 300;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Screen {
    RoleSelect,
    Puzzle,
    Debrief,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Focus {
    Circuit,
    Answers,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LogKind {
    Info,
    Success,
    Error,
    System,
    Player,
}

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub timestamp: String,
    pub kind: LogKind,
    pub text: String,
}

/// The window of the circuit grid drawn last frame, so mouse clicks can be
/// mapped back to cells. Only cells inside the window are hit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridGeometry {
    pub x: u16,
    pub y: u16,
    pub cell_w: u16,
    pub row_h: u16,
    pub start_step: usize,
    pub visible_steps: usize,
    pub start_qubit: usize,
    pub visible_qubits: usize,
}

impl GridGeometry {
    pub fn cell_at(&self, column: u16, row: u16) -> Option<(usize, usize)> {
        if column < self.x || row < self.y || self.cell_w == 0 || self.row_h == 0 {
            return None;
        }
        let col = ((column - self.x) / self.cell_w) as usize;
        let lane = ((row - self.y) / self.row_h) as usize;
        if col >= self.visible_steps || lane >= self.visible_qubits {
            return None;
        }
        Some((self.start_qubit + lane, self.start_step + col))
    }
}

pub struct App {
    pub config: Config,
    pub screen: Screen,
    pub role: Option<Role>,
    pub role_cursor: usize,
    pub puzzle_idx: usize,
    pub session: Session,
    pub cursor_qubit: usize,
    pub cursor_step: usize,
    pub focus: Focus,
    pub answer_idx: usize,
    pub last_counts: Option<Counts>,
    pub debrief: String,
    pub log: VecDeque<LogEntry>,
    pub grid: GridGeometry,
}

impl App {
    pub fn new(config: Config) -> Self {
        let preset = config.role;
        let mut app = App {
            config,
            screen: Screen::RoleSelect,
            role: None,
            role_cursor: 0,
            puzzle_idx: 0,
            session: Session::new(Circuit::new(0, 0), Vec::new(), true),
            cursor_qubit: 0,
            cursor_step: 0,
            focus: Focus::Circuit,
            answer_idx: 0,
            last_counts: None,
            debrief: String::new(),
            log: VecDeque::with_capacity(LOG_CAPACITY),
            grid: GridGeometry::default(),
        };
        app.push_log(LogKind::System, "Secure channel open. Choose your role.");
        if let Some(role) = preset {
            app.select_role(role);
        }
        app
    }

    pub fn push_log(&mut self, kind: LogKind, text: impl Into<String>) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            kind,
            text: text.into(),
        });
    }

    pub fn puzzle(&self) -> Option<&'static Puzzle> {
        self.role?.puzzles().get(self.puzzle_idx)
    }

    // ── Game flow ─────────────────────────────────────────────────────────

    pub fn select_role(&mut self, role: Role) {
        info!(role = role.title(), "role selected");
        self.role = Some(role);
        self.push_log(LogKind::Player, format!("Role selected: {}", role.title()));
        self.start_puzzle(0);
    }

    pub fn start_puzzle(&mut self, idx: usize) {
        self.puzzle_idx = idx;
        let Some(puzzle) = self.puzzle() else {
            self.screen = Screen::GameOver;
            self.push_log(
                LogKind::Success,
                "All missions for this role complete. Outstanding work, agent.",
            );
            return;
        };

        let circuit = match puzzle.initial_circuit() {
            Ok(c) => c,
            Err(e) => {
                warn!(puzzle = puzzle.name, error = %e, "bad puzzle layout");
                self.push_log(LogKind::Error, format!("Mission data corrupted: {e}"));
                self.screen = Screen::GameOver;
                return;
            }
        };

        info!(puzzle = puzzle.name, "starting puzzle");
        self.session.reset(
            circuit,
            puzzle.available_gates().to_vec(),
            puzzle.is_read_only(),
        );
        self.cursor_qubit = 0;
        self.cursor_step = 0;
        self.answer_idx = 0;
        self.last_counts = None;
        self.focus = if puzzle.is_read_only() { Focus::Answers } else { Focus::Circuit };
        self.screen = Screen::Puzzle;
        self.push_log(
            LogKind::System,
            format!("Mission {}: {}", puzzle.id, puzzle.name),
        );
        self.push_log(LogKind::Info, format!("Objective: {}", puzzle.objective));
    }

    pub fn advance(&mut self) {
        self.start_puzzle(self.puzzle_idx + 1);
    }

    pub fn reset_game(&mut self) {
        self.screen = Screen::RoleSelect;
        self.role = None;
        self.puzzle_idx = 0;
        self.session.reset(Circuit::new(0, 0), Vec::new(), true);
        self.push_log(LogKind::System, "Returned to role selection.");
    }

    fn succeed(&mut self, puzzle: &Puzzle) {
        info!(puzzle = puzzle.name, "puzzle solved");
        self.push_log(LogKind::Success, format!("{} cracked!", puzzle.name));
        self.debrief = format!(
            "Mission \"{}\" accomplished.\n\nTopic unlocked: {}",
            puzzle.name, puzzle.topic
        );
        self.screen = Screen::Debrief;
    }

    // ── Palette / placement ───────────────────────────────────────────────

    pub fn palette(&self) -> Vec<Tool> {
        if self.session.is_read_only() {
            return Vec::new();
        }
        self.session
            .available()
            .iter()
            .map(|&k| Tool::Gate(k))
            .chain(std::iter::once(Tool::Delete))
            .collect()
    }

    pub fn select_palette(&mut self, idx: usize) {
        if let Some(tool) = self.palette().get(idx).copied() {
            self.select_tool(Some(tool));
        }
    }

    pub fn select_tool(&mut self, tool: Option<Tool>) {
        let before = self.session.gesture();
        let after = self.session.select_tool(tool);
        if before == after {
            return;
        }
        match after.tool() {
            Some(t) => self.push_log(LogKind::Player, format!("Armed {} [{t}]", t.label())),
            None => self.push_log(LogKind::Player, "Selection cleared"),
        }
    }

    pub fn click_cell(&mut self, qubit: usize, step: usize) {
        self.cursor_qubit = qubit;
        self.cursor_step = step;
        let outcome = self.session.handle_cell_click(qubit, step);
        self.report(outcome);
    }

    pub fn click_at_cursor(&mut self) {
        self.click_cell(self.cursor_qubit, self.cursor_step);
    }

    pub fn click_at(&mut self, column: u16, row: u16) {
        if let Some((qubit, step)) = self.grid.cell_at(column, row) {
            self.click_cell(qubit, step);
        }
    }

    fn report(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Placed(id) => {
                let text = match self.session.circuit().find(id) {
                    Some((step, g)) => match g.control_qubit() {
                        Some(c) => format!(
                            "Placed {} control q[{c}] target q[{}] at step {step}",
                            g.kind,
                            g.qubit()
                        ),
                        None => format!("Placed {} on q[{}] at step {step}", g.kind, g.qubit()),
                    },
                    None => format!("Placed {id}"),
                };
                self.push_log(LogKind::Player, text);
            }
            Outcome::Removed(id) => self.push_log(LogKind::Player, format!("Removed gate {id}")),
            Outcome::ControlPending { qubit, step } => self.push_log(
                LogKind::Info,
                format!("Control set on q[{qubit}] at step {step}. Pick the target in the same step."),
            ),
            Outcome::Abandoned => self.push_log(
                LogKind::Error,
                "CNOT abandoned: control and target must share a step.",
            ),
            Outcome::Rejected(e) => self.push_log(LogKind::Error, format!("Cannot do that: {e}")),
            Outcome::Ignored => {}
        }
    }

    pub fn move_cursor(&mut self, d_qubit: isize, d_step: isize) {
        let circuit = self.session.circuit();
        let max_q = circuit.qubits().saturating_sub(1);
        let max_s = circuit.num_steps().saturating_sub(1);
        self.cursor_qubit = self.cursor_qubit.saturating_add_signed(d_qubit).min(max_q);
        self.cursor_step = self.cursor_step.saturating_add_signed(d_step).min(max_s);
    }

    // ── Run / submit ──────────────────────────────────────────────────────

    pub fn run_circuit(&mut self) {
        let Some(puzzle) = self.puzzle() else { return };
        if !matches!(puzzle.kind, PuzzleKind::Construct { .. }) {
            return;
        }
        self.session.select_tool(None);
        let snapshot = self.session.circuit_snapshot();
        let counts = run_shots(&snapshot, self.config.shots, self.config.seed);
        let solved = puzzle.evaluate_run(&counts, &snapshot);
        info!(puzzle = puzzle.name, solved, "circuit run");

        if counts.is_empty() {
            self.push_log(LogKind::Info, "Circuit executed. No measurements recorded.");
        } else {
            let summary: Vec<String> = counts
                .outcomes
                .iter()
                .map(|(bits, n)| format!("{bits}: {n}"))
                .collect();
            self.push_log(LogKind::Info, format!("Results: {}", summary.join(", ")));
        }
        self.last_counts = Some(counts);

        if solved {
            self.succeed(puzzle);
        } else {
            self.push_log(LogKind::Error, "The lock holds. Rethink your circuit.");
        }
    }

    pub fn move_answer(&mut self, delta: isize) {
        let n = self.puzzle().map_or(0, |p| p.options().len());
        if n == 0 {
            return;
        }
        self.answer_idx = self.answer_idx.saturating_add_signed(delta).min(n - 1);
    }

    pub fn submit_answer(&mut self) {
        let Some(puzzle) = self.puzzle() else { return };
        let Some(answer) = puzzle.options().get(self.answer_idx).copied() else {
            return;
        };
        self.push_log(LogKind::Player, format!("Analysis submitted: {answer}"));
        if puzzle.check_answer(answer) {
            self.succeed(puzzle);
        } else {
            info!(puzzle = puzzle.name, answer, "wrong analysis");
            self.push_log(LogKind::Error, "Incorrect assessment. The threat persists.");
        }
    }

    pub fn save_snapshot(&self) -> anyhow::Result<PathBuf> {
        let json = serde_json::to_string_pretty(&self.session.circuit_snapshot())
            .context("cannot serialise circuit")?;
        let path = self.config.save_path.clone();
        std::fs::write(&path, json)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), "saved circuit snapshot");
        Ok(path)
    }

    pub fn pending_hint(&self) -> Option<String> {
        match self.session.gesture() {
            Gesture::PendingControl { control_qubit, control_step, .. } => Some(format!(
                "CNOT control on q[{control_qubit}] at step {control_step}: click the target"
            )),
            Gesture::Deleting => Some("Delete mode: click a gate to remove it".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::GateKind;

    fn app_as(role: Role) -> App {
        let cfg = Config {
            role: Some(role),
            ..Config::default()
        };
        App::new(cfg)
    }

    #[test]
    fn preset_role_starts_first_puzzle() {
        let app = app_as(Role::Hacker);
        assert_eq!(app.screen, Screen::Puzzle);
        assert_eq!(app.puzzle().unwrap().name, "Superposition Lock");
        assert!(!app.session.is_read_only());
        assert_eq!(
            app.palette(),
            vec![
                Tool::Gate(GateKind::H),
                Tool::Gate(GateKind::X),
                Tool::Gate(GateKind::M),
                Tool::Delete
            ]
        );
    }

    #[test]
    fn solving_superposition_lock_opens_debrief_then_next_puzzle() {
        let mut app = app_as(Role::Hacker);
        app.select_palette(0);
        app.click_cell(0, 0);
        app.select_palette(2);
        app.click_cell(0, 1);
        app.run_circuit();
        assert_eq!(app.screen, Screen::Debrief);
        assert!(app.last_counts.is_some());

        app.advance();
        assert_eq!(app.screen, Screen::Puzzle);
        assert_eq!(app.puzzle().unwrap().name, "Entanglement Key");
        assert!(app.session.circuit().is_empty());
        assert_eq!(app.session.gesture(), Gesture::Idle);
    }

    #[test]
    fn failed_run_stays_on_puzzle() {
        let mut app = app_as(Role::Hacker);
        app.run_circuit();
        assert_eq!(app.screen, Screen::Puzzle);
        assert_eq!(app.log.back().unwrap().kind, LogKind::Error);
    }

    #[test]
    fn analyst_answers_and_finishes() {
        let mut app = app_as(Role::Analyst);
        assert!(app.session.is_read_only());
        assert!(app.palette().is_empty());
        assert_eq!(app.focus, Focus::Answers);

        app.click_cell(0, 0);
        assert_eq!(app.log.back().unwrap().kind, LogKind::Error);

        app.answer_idx = 0;
        app.submit_answer();
        assert_eq!(app.screen, Screen::Puzzle);

        for _ in 0..4 {
            let correct = match app.puzzle().unwrap().kind {
                PuzzleKind::Analyze { options, correct } => {
                    options.iter().position(|o| *o == correct).unwrap()
                }
                PuzzleKind::Construct { .. } => unreachable!(),
            };
            app.answer_idx = correct;
            app.submit_answer();
            assert_eq!(app.screen, Screen::Debrief);
            app.advance();
        }
        assert_eq!(app.screen, Screen::GameOver);
    }

    #[test]
    fn cursor_stays_inside_grid() {
        let mut app = app_as(Role::Hacker);
        app.move_cursor(-1, -1);
        assert_eq!((app.cursor_qubit, app.cursor_step), (0, 0));
        app.move_cursor(5, 10);
        assert_eq!((app.cursor_qubit, app.cursor_step), (0, 2));
    }

    #[test]
    fn grid_hit_testing() {
        let g = GridGeometry {
            x: 10,
            y: 5,
            cell_w: 11,
            row_h: 3,
            start_step: 2,
            visible_steps: 3,
            start_qubit: 0,
            visible_qubits: 2,
        };
        assert_eq!(g.cell_at(10, 5), Some((0, 2)));
        assert_eq!(g.cell_at(32, 9), Some((1, 4)));
        assert_eq!(g.cell_at(9, 5), None);
        assert_eq!(g.cell_at(43, 5), None);
        assert_eq!(g.cell_at(10, 11), None);
    }

    #[test]
    fn grid_hit_testing_stops_at_clipped_lanes() {
        // Three-qubit circuit in a panel with room for one lane, scrolled to q[1].
        let g = GridGeometry {
            x: 8,
            y: 7,
            cell_w: 11,
            row_h: 3,
            start_step: 0,
            visible_steps: 3,
            start_qubit: 1,
            visible_qubits: 1,
        };
        assert_eq!(g.cell_at(9, 7), Some((1, 0)));
        assert_eq!(g.cell_at(9, 9), Some((1, 0)));
        assert_eq!(g.cell_at(9, 10), None);
        assert_eq!(g.cell_at(9, 13), None);
    }

    #[test]
    fn activity_log_keeps_only_recent_entries() {
        let mut app = app_as(Role::Hacker);
        for i in 0..LOG_CAPACITY + 25 {
            app.push_log(LogKind::Info, format!("entry {i}"));
        }
        assert_eq!(app.log.len(), LOG_CAPACITY);
        assert_eq!(
            app.log.back().unwrap().text,
            format!("entry {}", LOG_CAPACITY + 24)
        );
    }

    #[test]
    fn reset_returns_to_role_select() {
        let mut app = app_as(Role::Hacker);
        app.reset_game();
        assert_eq!(app.screen, Screen::RoleSelect);
        assert!(app.role.is_none());
        assert!(app.puzzle().is_none());
    }
}
