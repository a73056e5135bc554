use clap::ValueEnum;

use crate::circuit::{Circuit, Placement};
use crate::gates::GateKind;
use crate::qasm::{parse_layout, QasmError};
use crate::quantum::Counts;

#[derive(Clone, Copy, PartialEq, Eq, Debug, ValueEnum)]
pub enum Role {
    /// Builds circuits to crack quantum locks.
    Hacker,
    /// Reads captured circuits and picks the right response.
    Analyst,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Hacker, Role::Analyst];

    pub fn title(self) -> &'static str {
        match self {
            Role::Hacker => "Hacker",
            Role::Analyst => "Analyst",
        }
    }

    pub fn blurb(self) -> &'static str {
        match self {
            Role::Hacker => "Construct quantum circuits to break through locks.",
            Role::Analyst => "Analyse captured circuits and security incidents.",
        }
    }

    pub fn puzzles(self) -> &'static [Puzzle] {
        match self {
            Role::Hacker => HACKER_PUZZLES,
            Role::Analyst => ANALYST_PUZZLES,
        }
    }
}

/// Pass/fail checks for construct puzzles, evaluated on a finished run.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SuccessCondition {
    SuperpositionLock,
    /// H, CX, two measurements, and counts concentrated on `00`/`11`.
    BellState,
    /// CX from q0 to q1, H on q0, two measurements.
    Teleportation,
    RepetitionCode,
}

impl SuccessCondition {
    pub fn evaluate(self, counts: &Counts, circuit: &Circuit) -> bool {
        let measurements = circuit.count(GateKind::M);
        match self {
            SuccessCondition::SuperpositionLock => {
                circuit.count(GateKind::H) > 0 && measurements > 0
            }
            SuccessCondition::BellState => {
                let signature = counts.fraction("00") > 0.4
                    && counts.fraction("11") > 0.4
                    && counts.fraction("01") < 0.1
                    && counts.fraction("10") < 0.1;
                circuit.count(GateKind::H) > 0
                    && circuit.count(GateKind::CX) > 0
                    && measurements >= 2
                    && signature
            }
            SuccessCondition::Teleportation => {
                let entangle = circuit.gates().any(|(_, g)| {
                    g.placement == Placement::Two { target: 1, control: 0 }
                });
                let rotate = circuit
                    .gates()
                    .any(|(_, g)| g.kind == GateKind::H && g.qubit() == 0);
                entangle && rotate && measurements >= 2
            }
            SuccessCondition::RepetitionCode => {
                circuit.count(GateKind::CX) == 2
                    && circuit
                        .gates()
                        .filter(|(_, g)| g.kind == GateKind::CX)
                        .all(|(_, g)| g.control_qubit() == Some(0))
            }
        }
    }
}

#[derive(Clone, Debug)]
pub enum PuzzleKind {
    Construct {
        available: &'static [GateKind],
        success: SuccessCondition,
    },
    Analyze {
        options: &'static [&'static str],
        correct: &'static str,
    },
}

#[derive(Clone, Debug)]
pub struct Puzzle {
    pub id: u32,
    pub name: &'static str,
    pub objective: &'static str,
    pub kind: PuzzleKind,
    /// Initial circuit as step-marked QASM.
    pub layout: &'static str,
    pub topic: &'static str,
}

impl Puzzle {
    pub fn initial_circuit(&self) -> Result<Circuit, QasmError> {
        parse_layout(self.layout)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.kind, PuzzleKind::Analyze { .. })
    }

    pub fn available_gates(&self) -> &'static [GateKind] {
        match self.kind {
            PuzzleKind::Construct { available, .. } => available,
            PuzzleKind::Analyze { .. } => &[],
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self.kind {
            PuzzleKind::Construct { .. } => &[],
            PuzzleKind::Analyze { options, .. } => options,
        }
    }

    /// Construct puzzles only; analyse puzzles are never solved by a run.
    pub fn evaluate_run(&self, counts: &Counts, circuit: &Circuit) -> bool {
        match self.kind {
            PuzzleKind::Construct { success, .. } => success.evaluate(counts, circuit),
            PuzzleKind::Analyze { .. } => false,
        }
    }

    pub fn check_answer(&self, answer: &str) -> bool {
        match self.kind {
            PuzzleKind::Analyze { correct, .. } => answer == correct,
            PuzzleKind::Construct { .. } => false,
        }
    }
}

pub static HACKER_PUZZLES: &[Puzzle] = &[
    Puzzle {
        id: 1,
        name: "Superposition Lock",
        objective: "The vault's primary lock is quantum. It will only open if its single qubit is in a perfect superposition. Use a Hadamard gate to prepare the state, then measure it.",
        kind: PuzzleKind::Construct {
            available: &[GateKind::H, GateKind::X, GateKind::M],
            success: SuccessCondition::SuperpositionLock,
        },
        layout: "qreg q[1];\n// step 0\n// step 1\n// step 2\n",
        topic: "Superposition",
    },
    Puzzle {
        id: 2,
        name: "Entanglement Key",
        objective: "A two-factor authentication system requires two entangled qubits. Create a Bell state (|00> + |11>) by putting one qubit in superposition and then entangling it with a second qubit using a CNOT gate.",
        kind: PuzzleKind::Construct {
            available: &[GateKind::H, GateKind::X, GateKind::CX, GateKind::M],
            success: SuccessCondition::BellState,
        },
        layout: "qreg q[2];\n// step 0\n// step 1\n// step 2\n// step 3\n",
        topic: "Entanglement",
    },
    Puzzle {
        id: 3,
        name: "Quantum Teleportation",
        objective: "Teleport the state of |q0> (the source) to |q2> (the target) using an entangled pair (|q1>, |q2>). You won't create the initial entanglement, just perform the teleportation protocol itself.",
        kind: PuzzleKind::Construct {
            available: &[GateKind::CX, GateKind::H, GateKind::M],
            success: SuccessCondition::Teleportation,
        },
        layout: "qreg q[3];\n// step 0\n// step 1\n// step 2\n// step 3\n// step 4\n",
        topic: "Quantum Teleportation",
    },
    Puzzle {
        id: 4,
        name: "Error Correction Encoding",
        objective: "The data channel is noisy. Protect the logical qubit |q0> from bit-flip errors by encoding its state across two other physical qubits using a repetition code.",
        kind: PuzzleKind::Construct {
            available: &[GateKind::CX, GateKind::M],
            success: SuccessCondition::RepetitionCode,
        },
        layout: "qreg q[3];\n// step 0\n// step 1\n// step 2\n// step 3\n",
        topic: "Quantum Error Correction",
    },
];

pub static ANALYST_PUZZLES: &[Puzzle] = &[
    Puzzle {
        id: 1,
        name: "QKD Eavesdropping Detected",
        objective: "An unusually high Quantum Bit Error Rate (QBER) of 15% is detected on a secure channel. Analyse the situation and select the appropriate response.",
        kind: PuzzleKind::Analyze {
            options: &["Ignore Anomaly", "Re-route to Backup", "Reset and Secure Channel"],
            correct: "Reset and Secure Channel",
        },
        layout: "qreg q[1];\n// step 0\n",
        topic: "Quantum Key Distribution (QKD)",
    },
    Puzzle {
        id: 2,
        name: "Attack Vector Identification",
        objective: "An attacker's quantum program has been captured targeting the firewall. Analyse the circuit and identify the algorithm being used.",
        kind: PuzzleKind::Analyze {
            options: &["Bell State Injection", "Grover's Algorithm", "Shor's Algorithm"],
            correct: "Grover's Algorithm",
        },
        layout: "\
qreg q[2];
// step 0
h q[0];
h q[1];
// step 1
cx q[0], q[1];
// step 2
h q[0];
h q[1];
",
        topic: "Grover's Algorithm",
    },
    Puzzle {
        id: 3,
        name: "Decoherence Analysis",
        objective: "A drone's navigation qubit should be in a 50/50 superposition, but diagnostics show results skewed 95% to |0>. The circuit is correct. What is the cause?",
        kind: PuzzleKind::Analyze {
            options: &["Incorrect Gate", "Decoherence", "System Miscalibration"],
            correct: "Decoherence",
        },
        layout: "\
qreg q[1];
// step 0
h q[0];
// step 1
measure q[0] -> c[0];
",
        topic: "Decoherence",
    },
    Puzzle {
        id: 4,
        name: "PQC Algorithm Selection",
        objective: "Upgrade a legacy database. The primary constraints are minimal key size and high performance for embedded systems. Choose the most suitable PQC algorithm.",
        kind: PuzzleKind::Analyze {
            options: &["Kyber (Lattice-based)", "SPHINCS+ (Hash-based)", "Classic McEliece (Code-based)"],
            correct: "Kyber (Lattice-based)",
        },
        layout: "qreg q[0];\n// step 0\n",
        topic: "Post-Quantum Cryptography",
    },
];
