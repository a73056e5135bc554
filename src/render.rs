use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, GridGeometry, LogKind, Screen};
use crate::circuit::{CellInfo, CellRole};
use crate::gates::Tool;
use crate::placement::Gesture;
use crate::puzzle::Role;
use crate::qasm::to_qasm;
use crate::quantum::{format_bits, simulate_circuit};

// ── Colors ─────────────────────────────────────────────────────────────────

const BLUE: Color = Color::Rgb(122, 162, 247);
const PURPLE: Color = Color::Rgb(187, 154, 247);
const GREEN: Color = Color::Rgb(158, 206, 106);
const ORANGE: Color = Color::Rgb(255, 158, 100);
const CYAN: Color = Color::Rgb(115, 218, 202);
const YELLOW: Color = Color::Rgb(224, 175, 104);
const DIM: Color = Color::Rgb(86, 95, 137);
const RED: Color = Color::Rgb(247, 118, 142);
const DARK_BLUE: Color = Color::Rgb(192, 202, 245);

// ── Layout constants ────────────────────────────────────────────────────────

const CELL_W: usize = 11;
const LABEL_W: usize = 7; // "q[N]  ──"
const GATE_NAME_W: usize = 5;
const ROW_H: usize = 3;

// ── Main render entry point ─────────────────────────────────────────────────

pub fn render(f: &mut Frame, app: &mut App) {
    let size = f.area();

    match app.screen {
        Screen::RoleSelect => render_role_select(f, app, size),
        Screen::Puzzle | Screen::Debrief | Screen::GameOver => render_puzzle_screen(f, app, size),
    }

    match app.screen {
        Screen::Debrief => render_message_overlay(f, "Mission Debrief", &app.debrief, "⏎ Next mission  r Roles  q Quit", GREEN),
        Screen::GameOver => render_message_overlay(
            f,
            "Game Over",
            "Congratulations, agent! You have completed every mission for this role.",
            "r Choose another role  q Quit",
            PURPLE,
        ),
        _ => {}
    }
}

// ── Role selection ──────────────────────────────────────────────────────────

fn render_role_select(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ORANGE))
        .title(Span::styled("Q-HEIST :: Choose your role", Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::default()];
    for (i, role) in Role::ALL.iter().enumerate() {
        let selected = i == app.role_cursor;
        let marker = if selected { " ▸ " } else { "   " };
        let style = if selected {
            Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DARK_BLUE)
        };
        lines.push(Line::from(vec![
            Span::styled(marker, style),
            Span::styled(format!("{:<10}", role.title()), style),
            Span::styled(role.blurb(), Style::default().fg(DIM)),
        ]));
    }
    lines.push(Line::default());
    lines.push(Line::styled("↑↓ Select  ⏎ Start  q Quit", Style::default().fg(YELLOW)));

    f.render_widget(Paragraph::new(Text::from(lines)), inner);
}

// ── Puzzle screen ───────────────────────────────────────────────────────────

fn render_puzzle_screen(f: &mut Frame, app: &mut App, size: Rect) {
    let ctrl_height = 3u16;
    let log_h = (size.height / 4).clamp(4, 10);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(6),
            Constraint::Length(log_h),
            Constraint::Length(ctrl_height),
        ])
        .split(size);

    let side_w = ((size.width / 3) as usize).max(30).min(size.width.saturating_sub(20) as usize) as u16;
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(side_w)])
        .split(rows[1]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(middle[1]);

    render_mission_panel(f, app, rows[0]);
    render_circuit_panel(f, app, middle[0]);
    if app.session.is_read_only() {
        render_answers_panel(f, app, side[0]);
    } else {
        render_palette_panel(f, app, side[0]);
    }
    render_results_panel(f, app, side[1]);
    render_log_panel(f, app, rows[2]);
    render_controls_panel(f, app, rows[3]);
}

fn render_mission_panel(f: &mut Frame, app: &App, area: Rect) {
    let title = app
        .puzzle()
        .map(|p| format!("Mission {}: {}", p.id, p.name))
        .unwrap_or_else(|| "Mission".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(CYAN))
        .title(Span::styled(title, Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let objective = app.puzzle().map(|p| p.objective).unwrap_or_default();
    let p = Paragraph::new(Span::styled(objective, Style::default().fg(DARK_BLUE)))
        .wrap(Wrap { trim: true });
    f.render_widget(p, inner);
}

// ── Circuit Panel ─────────────────────────────────────────────────────────────

fn render_circuit_panel(f: &mut Frame, app: &mut App, area: Rect) {
    let active = app.focus == Focus::Circuit;
    let border_color = if active { ORANGE } else { BLUE };
    let title = if app.session.is_read_only() {
        "Circuit Canvas [ANALYSIS MODE: read-only]"
    } else {
        "Circuit Canvas"
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(title, Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let (lines, geometry) = build_circuit_lines(app, inner);
    app.grid = geometry;

    let text: Vec<Line> = lines.into_iter().map(Line::raw).collect();
    f.render_widget(Paragraph::new(Text::from(text)), inner);
}

fn build_circuit_lines(app: &App, area: Rect) -> (Vec<String>, GridGeometry) {
    let circuit = app.session.circuit();
    let mut lines: Vec<String> = Vec::new();

    let avail = (area.width as usize).saturating_sub(LABEL_W + 2);
    let max_steps = (avail / CELL_W).max(1);
    let start_step = if app.cursor_step >= max_steps {
        app.cursor_step - max_steps + 1
    } else {
        0
    };
    let end_step = (start_step + max_steps).min(circuit.num_steps());

    // One header line above the lanes.
    let max_lanes = (area.height as usize).saturating_sub(1) / ROW_H;
    let start_qubit = if max_lanes > 0 && app.cursor_qubit >= max_lanes {
        app.cursor_qubit - max_lanes + 1
    } else {
        0
    };
    let end_qubit = (start_qubit + max_lanes).min(circuit.qubits());

    let geometry = GridGeometry {
        x: area.x + LABEL_W as u16,
        y: area.y + 1,
        cell_w: CELL_W as u16,
        row_h: ROW_H as u16,
        start_step,
        visible_steps: end_step.saturating_sub(start_step),
        start_qubit,
        visible_qubits: end_qubit.saturating_sub(start_qubit),
    };

    if circuit.qubits() == 0 {
        lines.push(String::new());
        lines.push("  (no qubits in this scenario)".to_string());
        return (lines, geometry);
    }

    // Step numbers header
    let mut step_hdr = " ".repeat(LABEL_W);
    for step in start_step..end_step {
        step_hdr.push_str(&pad_center(&format!("{step}"), CELL_W));
    }
    lines.push(step_hdr);

    let pending = match app.session.gesture() {
        Gesture::PendingControl { control_qubit, control_step, .. } => Some((control_qubit, control_step)),
        _ => None,
    };

    for qubit in start_qubit..end_qubit {
        let mut top_line = " ".repeat(LABEL_W);
        let label = format!("q[{qubit}]");
        let mut mid_line = format!("{:<5}", label) + "──";
        let mut bot_line = " ".repeat(LABEL_W);

        for step in start_step..end_step {
            let info = circuit.cell_info(qubit, step);
            let is_cursor = app.focus == Focus::Circuit
                && step == app.cursor_step
                && qubit == app.cursor_qubit;
            let is_pending = pending == Some((qubit, step));

            let (top, mid, bot) = render_cell(&info, is_cursor, is_pending);
            top_line.push_str(&top);
            mid_line.push_str(&mid);
            bot_line.push_str(&bot);
        }

        lines.push(top_line);
        lines.push(mid_line);
        lines.push(bot_line);
    }

    let mut status = format!("  Position: Step {}, Qubit {}", app.cursor_step, app.cursor_qubit);
    if end_qubit - start_qubit < circuit.qubits() {
        status.push_str(&format!("  (q[{start_qubit}]..q[{}] shown)", end_qubit.saturating_sub(1)));
    }
    if let Some(hint) = app.pending_hint() {
        status.push_str(&format!("  │  {hint}"));
    }
    lines.push(status);

    (lines, geometry)
}

fn render_cell(info: &CellInfo, is_cursor: bool, is_pending: bool) -> (String, String, String) {
    let empty = " ".repeat(CELL_W);
    let half = CELL_W / 2;
    let vert_row = " ".repeat(half) + "│" + &" ".repeat(CELL_W - half - 1);

    let dash_l = (CELL_W - 1) / 2;
    let dash_r = CELL_W - dash_l - 1;

    if is_cursor {
        let inner_w = CELL_W - 2;
        let dleft = (inner_w - 1) / 2;
        let dright = inner_w - dleft - 1;

        let top = format!("╔{}╗", "═".repeat(inner_w));
        let bot = format!("╚{}╝", "═".repeat(inner_w));

        let mid = if is_pending {
            format!("║{}◉{}║", "─".repeat(dleft), "─".repeat(dright))
        } else if let (Some(gate), Some(role)) = (&info.gate, info.role) {
            match role {
                CellRole::Control => format!("║{}●{}║", "─".repeat(dleft), "─".repeat(dright)),
                CellRole::Target => format!("║{}⊕{}║", "─".repeat(dleft), "─".repeat(dright)),
                CellRole::Single => {
                    let name = pad_center(gate.kind.as_str(), GATE_NAME_W);
                    format!("║─┤{}├─║", name)
                }
            }
        } else if info.pass_through {
            format!("║{}┼{}║", "─".repeat(dleft), "─".repeat(dright))
        } else {
            format!("║{}║", "─".repeat(inner_w))
        };

        return (top, mid, bot);
    }

    if is_pending {
        let mid = "─".repeat(dash_l) + "◉" + &"─".repeat(dash_r);
        return (empty.clone(), mid, empty);
    }

    if let (Some(gate), Some(role)) = (&info.gate, info.role) {
        let link_top = if info.vert_above { vert_row.clone() } else { empty.clone() };
        let link_bot = if info.vert_below { vert_row.clone() } else { empty.clone() };
        match role {
            CellRole::Control => {
                let mid = "─".repeat(dash_l) + "●" + &"─".repeat(dash_r);
                return (link_top, mid, link_bot);
            }
            CellRole::Target => {
                let mid = "─".repeat(dash_l) + "⊕" + &"─".repeat(dash_r);
                return (link_top, mid, link_bot);
            }
            CellRole::Single => {
                let margin = (CELL_W - GATE_NAME_W - 2) / 2;
                let rmargin = CELL_W - margin - GATE_NAME_W - 2;
                let name = pad_center(gate.kind.as_str(), GATE_NAME_W);
                let top = " ".repeat(margin) + "┌" + &"─".repeat(GATE_NAME_W) + "┐" + &" ".repeat(rmargin);
                let mid = "─".repeat(margin) + "┤" + &name + "├" + &"─".repeat(rmargin);
                let bot = " ".repeat(margin) + "└" + &"─".repeat(GATE_NAME_W) + "┘" + &" ".repeat(rmargin);
                return (top, mid, bot);
            }
        }
    }

    if info.pass_through {
        let mid = "─".repeat(dash_l) + "┼" + &"─".repeat(dash_r);
        return (vert_row.clone(), mid, vert_row);
    }

    // Empty wire
    (empty.clone(), "─".repeat(CELL_W), empty)
}

fn pad_center(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.chars().take(width).collect();
    }
    let total = width - len;
    let left = total / 2;
    let right = total - left;
    " ".repeat(left) + s + &" ".repeat(right)
}

// ── Gate palette / answers ──────────────────────────────────────────────────

fn render_palette_panel(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PURPLE))
        .title(Span::styled("Gate Arsenal", Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let armed = app.session.gesture().tool();
    let mut lines: Vec<Line> = Vec::new();
    for (i, tool) in app.palette().iter().enumerate() {
        let selected = armed == Some(*tool);
        let (symbol, desc) = match tool {
            Tool::Gate(kind) => (kind.gate().symbol, kind.gate().description),
            Tool::Delete => ("✕", "Remove a gate from the circuit"),
        };
        let accent = if *tool == Tool::Delete { RED } else { CYAN };
        let name_style = if selected {
            Style::default().fg(Color::Black).bg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(accent)
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", i + 1), Style::default().fg(DIM)),
            Span::styled(format!(" {symbol} {:<14}", tool.label()), name_style),
        ]));
        lines.push(Line::styled(format!("     {desc}"), Style::default().fg(DIM)));
    }

    f.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);
}

fn render_answers_panel(f: &mut Frame, app: &App, area: Rect) {
    let active = app.focus == Focus::Answers;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if active { ORANGE } else { PURPLE }))
        .title(Span::styled("Assessment", Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let options = app.puzzle().map(|p| p.options()).unwrap_or_default();
    let mut lines: Vec<Line> = vec![Line::default()];
    for (i, opt) in options.iter().enumerate() {
        if i == app.answer_idx {
            lines.push(Line::styled(format!("▸ {opt}"), Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
        } else {
            lines.push(Line::styled(format!("  {opt}"), Style::default().fg(DARK_BLUE)));
        }
    }
    lines.push(Line::default());
    lines.push(Line::styled("↑↓ Select  ⏎ Submit", Style::default().fg(DIM)));

    f.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);
}

// ── Results / probabilities / QASM ───────────────────────────────────────────

fn render_results_panel(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(RED))
        .title(Span::styled("Readout", Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let circuit = app.session.circuit();
    let bar_width = (inner.width as usize).saturating_sub(22).max(8);
    let mut text_lines: Vec<Line> = Vec::new();

    match &app.last_counts {
        Some(counts) if !counts.is_empty() => {
            text_lines.push(Line::styled(format!("Last run ({} shots)", counts.shots), Style::default().fg(DIM)));
            for (bits, &n) in &counts.outcomes {
                let frac = counts.fraction(bits);
                let fill = ((frac * bar_width as f64).round() as usize).min(bar_width);
                let bar = "█".repeat(fill) + &"░".repeat(bar_width - fill);
                text_lines.push(Line::styled(format!("|{bits}⟩ {n:>5} [{bar}]"), Style::default().fg(YELLOW)));
            }
        }
        _ if circuit.qubits() > 0 => {
            text_lines.push(Line::styled("Probabilities (before measurement)", Style::default().fg(DIM)));
            let state = simulate_circuit(circuit);
            let mut probs = state.basis_probabilities();
            probs.sort_by(|a, b| b.prob.partial_cmp(&a.prob).unwrap_or(std::cmp::Ordering::Equal));
            for s in probs.iter().take(8) {
                let fill = ((s.prob * bar_width as f64).round() as usize).min(bar_width);
                let bar = "█".repeat(fill) + &"░".repeat(bar_width - fill);
                let bits = format_bits(s.basis_state, circuit.qubits());
                text_lines.push(Line::styled(format!("|{bits}⟩ P={:.2} [{bar}]", s.prob), Style::default().fg(YELLOW)));
            }
        }
        _ => {}
    }

    if circuit.qubits() > 0 {
        text_lines.push(Line::default());
        for line in to_qasm(circuit).lines().filter(|l| !l.is_empty()) {
            text_lines.push(Line::styled(line.to_string(), Style::default().fg(DARK_BLUE)));
        }
    }

    f.render_widget(Paragraph::new(Text::from(text_lines)), inner);
}

// ── Activity log ─────────────────────────────────────────────────────────────

fn render_log_panel(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(CYAN))
        .title(Span::styled("Activity Log", Style::default().fg(ORANGE).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let visible = inner.height as usize;
    let start = app.log.len().saturating_sub(visible);
    let lines: Vec<Line> = app
        .log
        .iter()
        .skip(start)
        .map(|entry| {
            let color = match entry.kind {
                LogKind::Info => DARK_BLUE,
                LogKind::Success => GREEN,
                LogKind::Error => RED,
                LogKind::System => CYAN,
                LogKind::Player => YELLOW,
            };
            Line::from(vec![
                Span::styled(format!("{} > ", entry.timestamp), Style::default().fg(DIM)),
                Span::styled(entry.text.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    f.render_widget(Paragraph::new(Text::from(lines)), inner);
}

// ── Controls Panel ─────────────────────────────────────────────────────────────

fn render_controls_panel(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let help = if app.session.is_read_only() {
        "Tab Focus  ↑↓ Answer  ⏎ Submit  ←→/hjkl Inspect  r Roles  q Quit".to_string()
    } else {
        let gates = app.palette().len();
        format!(
            "1-{gates} Arm tool  d Delete  Esc Clear  ↑↓←→/hjkl Move  ⏎/Space/Click Place  x Run  Ctrl+S Save  r Roles  q Quit"
        )
    };

    let p = Paragraph::new(Span::styled(help, Style::default().fg(YELLOW)));
    f.render_widget(p, inner);
}

// ── Message overlay ──────────────────────────────────────────────────────────

fn render_message_overlay(f: &mut Frame, title: &str, body: &str, help: &str, color: Color) {
    let area = overlay_rect(f.area(), 60, 10);
    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(title.to_string(), Style::default().fg(color).add_modifier(Modifier::BOLD)));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = vec![Line::default()];
    for l in body.lines() {
        lines.push(Line::styled(l.to_string(), Style::default().fg(DARK_BLUE)));
    }
    lines.push(Line::default());
    lines.push(Line::styled(help.to_string(), Style::default().fg(DIM)));

    f.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true }), inner);
}

// ── Overlay rect helper ────────────────────────────────────────────────────────

fn overlay_rect(screen: Rect, min_w: u16, min_h: u16) -> Rect {
    let w = min_w.min(screen.width.saturating_sub(4));
    let h = min_h.min(screen.height.saturating_sub(4));
    Rect {
        x: screen.width.saturating_sub(w) / 2,
        y: screen.height.saturating_sub(h) / 2,
        width: w,
        height: h,
    }
}
