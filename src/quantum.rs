use std::collections::BTreeMap;

use num_complex::Complex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::circuit::{Circuit, CircuitGate, Placement};
use crate::gates::GateKind;

pub type ComplexF64 = Complex<f64>;

#[derive(Clone, Debug)]
pub struct StateVector {
    pub amplitudes: Vec<ComplexF64>,
    pub num_qubits: usize,
}

impl StateVector {
    pub fn new(num_qubits: usize) -> Self {
        let n = 1 << num_qubits;
        let mut amplitudes = vec![ComplexF64::new(0.0, 0.0); n];
        amplitudes[0] = ComplexF64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Applies the unitary part of `gate`. Measurements are not unitary and
    /// are left to [`StateVector::measure`].
    pub fn apply_gate(&mut self, gate: &CircuitGate) {
        match (gate.kind, gate.placement) {
            (GateKind::H, Placement::Single { qubit }) => self.apply_h(qubit),
            (GateKind::X, Placement::Single { qubit }) => self.apply_x(qubit),
            (GateKind::CX, Placement::Two { target, control }) => self.apply_cx(control, target),
            _ => {}
        }
    }

    fn apply_h(&mut self, q: usize) {
        let h_factor = ComplexF64::new(1.0 / std::f64::consts::SQRT_2, 0.0);
        let bit = 1 << q;
        for i in 0..self.amplitudes.len() {
            if (i & bit) == 0 {
                let j = i | bit;
                let (a, b) = (self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = h_factor * (a + b);
                self.amplitudes[j] = h_factor * (a - b);
            }
        }
    }

    fn apply_x(&mut self, q: usize) {
        let bit = 1 << q;
        for i in 0..self.amplitudes.len() {
            if (i & bit) == 0 {
                self.amplitudes.swap(i, i | bit);
            }
        }
    }

    fn apply_cx(&mut self, control: usize, target: usize) {
        let c_bit = 1 << control;
        let t_bit = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & c_bit) != 0 && (i & t_bit) == 0 {
                self.amplitudes.swap(i, i | t_bit);
            }
        }
    }

    pub fn prob_one(&self, q: usize) -> f64 {
        let bit = 1 << q;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & bit != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    pub fn measure(&mut self, q: usize, rng: &mut impl Rng) -> bool {
        let p1 = self.prob_one(q);
        let one = rng.gen_range(0.0..1.0) < p1;
        let keep_prob = if one { p1 } else { 1.0 - p1 };
        let norm = if keep_prob > 0.0 { keep_prob.sqrt() } else { 1.0 };
        let bit = 1 << q;
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if ((i & bit) != 0) == one {
                *amp /= norm;
            } else {
                *amp = ComplexF64::new(0.0, 0.0);
            }
        }
        one
    }

    pub fn sample(&self, rng: &mut impl Rng) -> usize {
        let r: f64 = rng.gen_range(0.0..1.0);
        let mut acc = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            acc += amp.norm_sqr();
            if r < acc {
                return i;
            }
        }
        // Rounding can leave `acc` a hair under 1.0.
        self.amplitudes
            .iter()
            .rposition(|a| a.norm_sqr() > 0.0)
            .unwrap_or(0)
    }

    pub fn basis_probabilities(&self) -> Vec<BasisProbability> {
        self.amplitudes
            .iter()
            .enumerate()
            .filter_map(|(i, amp)| {
                let prob = amp.norm_sqr();
                (prob > 1e-10).then_some(BasisProbability { basis_state: i, prob })
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct BasisProbability {
    pub basis_state: usize,
    pub prob: f64,
}

/// `|q(n-1)…q0⟩` bit string, most significant qubit first.
pub fn format_bits(state: usize, num_qubits: usize) -> String {
    (0..num_qubits)
        .rev()
        .map(|i| if state & (1 << i) != 0 { '1' } else { '0' })
        .collect()
}

/// Pre-measurement state of the whole circuit, for display.
pub fn simulate_circuit(circuit: &Circuit) -> StateVector {
    let mut state = StateVector::new(circuit.qubits());
    for (_, gate) in circuit.gates() {
        state.apply_gate(gate);
    }
    state
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub shots: usize,
    pub outcomes: BTreeMap<String, usize>,
}

impl Counts {
    pub fn get(&self, bits: &str) -> usize {
        self.outcomes.get(bits).copied().unwrap_or(0)
    }

    pub fn fraction(&self, bits: &str) -> f64 {
        if self.shots == 0 {
            return 0.0;
        }
        self.get(bits) as f64 / self.shots as f64
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Runs `shots` independent executions with mid-circuit collapse at every
/// measurement. A circuit without measurements yields no counts.
pub fn run_shots(circuit: &Circuit, shots: usize, seed: u64) -> Counts {
    let mut counts = Counts::default();
    let n = circuit.qubits();
    if n == 0 || circuit.count(GateKind::M) == 0 {
        return counts;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..shots {
        let mut state = StateVector::new(n);
        for (_, gate) in circuit.gates() {
            match gate.placement {
                Placement::Single { qubit } if gate.kind == GateKind::M => {
                    state.measure(qubit, &mut rng);
                }
                _ => state.apply_gate(gate),
            }
        }
        let outcome = state.sample(&mut rng);
        *counts.outcomes.entry(format_bits(outcome, n)).or_default() += 1;
    }
    counts.shots = shots;

    debug!(shots, qubits = n, outcomes = counts.outcomes.len(), "ran circuit");
    counts
}
