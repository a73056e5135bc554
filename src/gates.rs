use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gate kinds the game knows about.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum GateKind {
    H,
    X,
    CX,
    M,
}

impl GateKind {
    pub const ALL: [GateKind; 4] = [GateKind::H, GateKind::X, GateKind::CX, GateKind::M];

    pub fn as_str(self) -> &'static str {
        match self {
            GateKind::H => "H",
            GateKind::X => "X",
            GateKind::CX => "CX",
            GateKind::M => "M",
        }
    }

    pub fn gate(self) -> &'static Gate {
        // Every kind has exactly one entry.
        match self {
            GateKind::H => &GATES[0],
            GateKind::X => &GATES[1],
            GateKind::CX => &GATES[2],
            GateKind::M => &GATES[3],
        }
    }

    pub fn arity(self) -> Arity {
        self.gate().arity
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown gate kind '{0}'")]
pub struct GateParseError(pub String);

impl FromStr for GateKind {
    type Err = GateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "H" => Ok(GateKind::H),
            "X" => Ok(GateKind::X),
            "CX" | "CNOT" => Ok(GateKind::CX),
            "M" | "MEASURE" => Ok(GateKind::M),
            _ => Err(GateParseError(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Arity {
    Single,
    Two,
}

#[derive(Clone, Debug)]
pub struct Gate {
    pub id: GateKind,
    pub name: &'static str,
    pub description: &'static str,
    pub symbol: &'static str,
    pub arity: Arity,
}

pub static GATES: &[Gate] = &[
    Gate { id: GateKind::H,  name: "Hadamard Gate", symbol: "H", arity: Arity::Single, description: "Puts a qubit into a superposition of |0> and |1>." },
    Gate { id: GateKind::X,  name: "Pauli-X Gate",  symbol: "X", arity: Arity::Single, description: "Flips a qubit's state (0->1, 1->0). Also known as a NOT gate." },
    Gate { id: GateKind::CX, name: "CNOT Gate",     symbol: "⊕", arity: Arity::Two,    description: "Controlled-NOT. Flips the target qubit if the control qubit is |1>. Creates entanglement." },
    Gate { id: GateKind::M,  name: "Measurement",   symbol: "M", arity: Arity::Single, description: "Measures a qubit, collapsing its superposition to a classical bit (0 or 1)." },
];

pub fn find_by_id(id: GateKind) -> Option<&'static Gate> {
    GATES.iter().find(|g| g.id == id)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tool {
    Gate(GateKind),
    Delete,
}

impl Tool {
    pub fn label(self) -> &'static str {
        match self {
            Tool::Gate(kind) => kind.gate().name,
            Tool::Delete => "Delete Gate",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Gate(kind) => write!(f, "{kind}"),
            Tool::Delete => f.write_str("DEL"),
        }
    }
}
