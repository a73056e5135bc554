//! OpenQASM 2.0 text for circuits.
//!
//! Plain QASM has no notion of a time step, so steps are delimited with
//! `// step N` comment markers. Every step is written, empty ones included,
//! which lets [`parse_layout`] rebuild the exact grid.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::circuit::{Circuit, CircuitError, Placement};
use crate::gates::{GateKind, GateParseError};

fn qreg_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^qreg\s+q\[(\d+)\];?$").unwrap())
}

fn step_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^//\s*step\s+(\d+)$").unwrap())
}

fn single_gate_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^([a-z]+)\s+q\[(\d+)\];?$").unwrap())
}

fn cx_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^cx\s+q\[(\d+)\],\s*q\[(\d+)\];?$").unwrap())
}

fn measure_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^measure\s+q\[(\d+)\]\s*->\s*c\[(\d+)\];?$").unwrap())
}

#[derive(Debug, Error)]
pub enum QasmError {
    #[error("missing `qreg q[N];` declaration")]
    MissingQreg,

    #[error("line {line}: gate outside of a `// step N` block")]
    OutsideStep { line: usize },

    #[error("line {line}: expected step {expected}, found step {found}")]
    StepOutOfOrder { line: usize, expected: usize, found: usize },

    #[error("line {line}: unsupported statement `{text}`")]
    Unsupported { line: usize, text: String },

    #[error("line {line}: {source}")]
    Gate {
        line: usize,
        #[source]
        source: GateParseError,
    },

    #[error("line {line}: {source}")]
    Placement {
        line: usize,
        #[source]
        source: CircuitError,
    },
}

pub fn to_qasm(circuit: &Circuit) -> String {
    let mut sb = String::new();
    sb.push_str("OPENQASM 2.0;\n");
    sb.push_str("include \"qelib1.inc\";\n\n");
    sb.push_str(&format!("qreg q[{}];\n", circuit.qubits()));
    if circuit.count(GateKind::M) > 0 {
        sb.push_str(&format!("creg c[{}];\n", circuit.qubits()));
    }

    for (step, gates) in circuit.steps().iter().enumerate() {
        sb.push_str(&format!("// step {step}\n"));
        for g in gates {
            let line = match (g.kind, g.placement) {
                (GateKind::CX, Placement::Two { target, control }) => {
                    format!("cx q[{control}], q[{target}];\n")
                }
                (GateKind::M, Placement::Single { qubit }) => {
                    format!("measure q[{qubit}] -> c[{qubit}];\n")
                }
                (kind, p) => format!("{} q[{}];\n", kind.as_str().to_lowercase(), p.qubit()),
            };
            sb.push_str(&line);
        }
    }

    sb
}

/// Builds a circuit from step-marked QASM, applying the normal placement
/// rules to every statement.
pub fn parse_layout(qasm: &str) -> Result<Circuit, QasmError> {
    // First pass: register size and step count.
    let mut qubits = None;
    let mut steps = 0;
    for raw in qasm.lines() {
        let line = raw.trim();
        if let Some(caps) = qreg_re().captures(line) {
            qubits = caps[1].parse::<usize>().ok();
        } else if step_re().is_match(line) {
            steps += 1;
        }
    }
    let qubits = qubits.ok_or(QasmError::MissingQreg)?;
    let mut circuit = Circuit::new(qubits, steps);

    let mut current: Option<usize> = None;
    for (idx, raw) in qasm.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty()
            || line.starts_with("OPENQASM")
            || line.starts_with("include")
            || line.starts_with("creg")
            || qreg_re().is_match(line)
        {
            continue;
        }

        if let Some(caps) = step_re().captures(line) {
            let found: usize = caps[1].parse().unwrap_or(usize::MAX);
            let expected = current.map_or(0, |s| s + 1);
            if found != expected {
                return Err(QasmError::StepOutOfOrder { line: line_no, expected, found });
            }
            current = Some(found);
            continue;
        }
        if line.starts_with("//") {
            continue;
        }

        let step = current.ok_or(QasmError::OutsideStep { line: line_no })?;
        let placed = if let Some(caps) = cx_re().captures(line) {
            let control = parse_index(&caps[1]);
            let target = parse_index(&caps[2]);
            circuit.add_gate(GateKind::CX.gate(), target, step, Some(control))
        } else if let Some(caps) = measure_re().captures(line) {
            let q = parse_index(&caps[1]);
            circuit.add_gate(GateKind::M.gate(), q, step, None)
        } else if let Some(caps) = single_gate_re().captures(line) {
            let kind: GateKind = caps[1].parse().map_err(|source| QasmError::Gate {
                line: line_no,
                source,
            })?;
            let q = parse_index(&caps[2]);
            circuit.add_gate(kind.gate(), q, step, None)
        } else {
            return Err(QasmError::Unsupported {
                line: line_no,
                text: line.to_string(),
            });
        };
        placed.map_err(|source| QasmError::Placement { line: line_no, source })?;
    }

    Ok(circuit)
}

// The regexes only admit digits; an overflowing index is simply out of range.
fn parse_index(digits: &str) -> usize {
    digits.parse().unwrap_or(usize::MAX)
}
