use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gates::{Arity, Gate, GateKind};

/// Never reused within a circuit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct GateId(pub u64);

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Single { qubit: usize },
    Two { target: usize, control: usize },
}

impl Placement {
    /// The primary qubit: the only qubit of a single-qubit gate, the target otherwise.
    pub fn qubit(&self) -> usize {
        match *self {
            Placement::Single { qubit } => qubit,
            Placement::Two { target, .. } => target,
        }
    }

    pub fn control(&self) -> Option<usize> {
        match *self {
            Placement::Single { .. } => None,
            Placement::Two { control, .. } => Some(control),
        }
    }

    pub fn touched(&self) -> impl Iterator<Item = usize> {
        std::iter::once(self.qubit()).chain(self.control())
    }

    /// Lowest and highest qubit covered, inclusive.
    pub fn span(&self) -> (usize, usize) {
        match *self {
            Placement::Single { qubit } => (qubit, qubit),
            Placement::Two { target, control } => (target.min(control), target.max(control)),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CellRole {
    Single,
    Control,
    Target,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitGate {
    pub id: GateId,
    pub kind: GateKind,
    pub placement: Placement,
}

impl CircuitGate {
    pub fn qubit(&self) -> usize {
        self.placement.qubit()
    }

    pub fn control_qubit(&self) -> Option<usize> {
        self.placement.control()
    }

    pub fn role_of(&self, qubit: usize) -> Option<CellRole> {
        match self.placement {
            Placement::Single { qubit: q } if q == qubit => Some(CellRole::Single),
            Placement::Two { control, .. } if control == qubit => Some(CellRole::Control),
            Placement::Two { target, .. } if target == qubit => Some(CellRole::Target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    #[error("step {step} is outside the circuit (0..{steps})")]
    StepOutOfRange { step: usize, steps: usize },

    #[error("qubit {qubit} is outside the circuit (0..{qubits})")]
    QubitOutOfRange { qubit: usize, qubits: usize },

    #[error("q[{qubit}] is already used by another gate at step {step}")]
    Occupied { qubit: usize, step: usize },

    #[error("{kind} needs a control qubit")]
    MissingControl { kind: GateKind },

    #[error("{kind} control and target must be different qubits")]
    ControlIsTarget { kind: GateKind },

    #[error("{kind} acts on a single qubit and takes no control")]
    UnexpectedControl { kind: GateKind },

    #[error("circuit is read-only")]
    ReadOnly,
}

pub type CircuitResult<T> = Result<T, CircuitError>;

/// Within one step a qubit is touched by at most one gate instance, whether
/// as the single qubit, the target, or the control.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    qubits: usize,
    steps: Vec<Vec<CircuitGate>>,
    next_id: u64,
}

impl Circuit {
    pub fn new(qubits: usize, steps: usize) -> Self {
        Circuit {
            qubits,
            steps: vec![Vec::new(); steps],
            next_id: 1,
        }
    }

    pub fn qubits(&self) -> usize {
        self.qubits
    }

    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Vec<CircuitGate>] {
        &self.steps
    }

    pub fn gates(&self) -> impl Iterator<Item = (usize, &CircuitGate)> {
        self.steps
            .iter()
            .enumerate()
            .flat_map(|(step, gates)| gates.iter().map(move |g| (step, g)))
    }

    pub fn count(&self, kind: GateKind) -> usize {
        self.gates().filter(|(_, g)| g.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.iter().all(Vec::is_empty)
    }

    pub fn find(&self, id: GateId) -> Option<(usize, &CircuitGate)> {
        self.gates().find(|(_, g)| g.id == id)
    }

    pub fn occupant(&self, qubit: usize, step: usize) -> Option<(&CircuitGate, CellRole)> {
        self.steps
            .get(step)?
            .iter()
            .find_map(|g| g.role_of(qubit).map(|role| (g, role)))
    }

    pub fn is_free(&self, qubit: usize, step: usize) -> bool {
        self.occupant(qubit, step).is_none()
    }

    pub fn contains_cell(&self, qubit: usize, step: usize) -> bool {
        qubit < self.qubits && step < self.steps.len()
    }

    /// `qubit` is the target of a two-qubit gate. Rejected placements leave
    /// the circuit untouched.
    pub fn add_gate(
        &mut self,
        gate: &Gate,
        qubit: usize,
        step: usize,
        control: Option<usize>,
    ) -> CircuitResult<GateId> {
        if step >= self.steps.len() {
            return Err(CircuitError::StepOutOfRange { step, steps: self.steps.len() });
        }
        self.check_qubit(qubit)?;

        let placement = match (gate.arity, control) {
            (Arity::Single, None) => Placement::Single { qubit },
            (Arity::Single, Some(_)) => {
                return Err(CircuitError::UnexpectedControl { kind: gate.id });
            }
            (Arity::Two, None) => return Err(CircuitError::MissingControl { kind: gate.id }),
            (Arity::Two, Some(c)) => {
                self.check_qubit(c)?;
                if c == qubit {
                    return Err(CircuitError::ControlIsTarget { kind: gate.id });
                }
                Placement::Two { target: qubit, control: c }
            }
        };

        if let Some(busy) = placement.touched().find(|&q| !self.is_free(q, step)) {
            return Err(CircuitError::Occupied { qubit: busy, step });
        }

        let id = GateId(self.next_id);
        self.next_id += 1;
        self.steps[step].push(CircuitGate {
            id,
            kind: gate.id,
            placement,
        });
        Ok(id)
    }

    pub fn remove_gate(&mut self, id: GateId) -> Option<CircuitGate> {
        for gates in &mut self.steps {
            if let Some(pos) = gates.iter().position(|g| g.id == id) {
                return Some(gates.remove(pos));
            }
        }
        None
    }

    fn check_qubit(&self, qubit: usize) -> CircuitResult<()> {
        if qubit >= self.qubits {
            return Err(CircuitError::QubitOutOfRange { qubit, qubits: self.qubits });
        }
        Ok(())
    }

    pub fn cell_info(&self, qubit: usize, step: usize) -> CellInfo {
        let mut info = CellInfo::default();

        if let Some((gate, role)) = self.occupant(qubit, step) {
            info.gate = Some(gate.clone());
            info.role = Some(role);
        }

        // Vertical connections
        for g in self.steps.get(step).into_iter().flatten() {
            if g.placement.control().is_none() {
                continue;
            }
            let (min_q, max_q) = g.placement.span();
            if qubit >= min_q && qubit <= max_q {
                if qubit > min_q {
                    info.vert_above = true;
                }
                if qubit < max_q {
                    info.vert_below = true;
                }
                if qubit > min_q && qubit < max_q && info.gate.is_none() {
                    info.pass_through = true;
                }
            }
        }

        info
    }
}

#[derive(Clone, Debug, Default)]
pub struct CellInfo {
    pub gate: Option<CircuitGate>,
    pub role: Option<CellRole>,
    pub vert_above: bool,
    pub vert_below: bool,
    pub pass_through: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::GateKind;
    use proptest::prelude::*;

    fn h() -> &'static Gate {
        GateKind::H.gate()
    }

    fn cx() -> &'static Gate {
        GateKind::CX.gate()
    }

    #[test]
    fn single_gate_on_free_cell_is_placed() {
        let mut c = Circuit::new(2, 3);
        let id = c.add_gate(h(), 1, 2, None).unwrap();
        let (gate, role) = c.occupant(1, 2).unwrap();
        assert_eq!(gate.id, id);
        assert_eq!(gate.kind, GateKind::H);
        assert_eq!(role, CellRole::Single);
        assert_eq!(c.steps()[2].len(), 1);
        assert_eq!(c.num_steps(), 3);
    }

    #[test]
    fn occupied_cell_rejects_and_leaves_circuit_unchanged() {
        let mut c = Circuit::new(2, 1);
        c.add_gate(h(), 0, 0, None).unwrap();
        let before = c.clone();

        for _ in 0..3 {
            let err = c.add_gate(GateKind::X.gate(), 0, 0, None).unwrap_err();
            assert_eq!(err, CircuitError::Occupied { qubit: 0, step: 0 });
            assert_eq!(c, before);
        }
    }

    #[test]
    fn cx_control_collision_is_rejected_without_partial_insert() {
        let mut c = Circuit::new(3, 1);
        c.add_gate(h(), 0, 0, None).unwrap();
        let before = c.clone();

        let err = c.add_gate(cx(), 2, 0, Some(0)).unwrap_err();
        assert_eq!(err, CircuitError::Occupied { qubit: 0, step: 0 });
        assert_eq!(c, before);
        assert!(c.is_free(2, 0));
    }

    #[test]
    fn cx_occupies_both_cells_with_roles() {
        let mut c = Circuit::new(2, 1);
        let id = c.add_gate(cx(), 1, 0, Some(0)).unwrap();

        let (g, role) = c.occupant(0, 0).unwrap();
        assert_eq!((g.id, role), (id, CellRole::Control));
        let (g, role) = c.occupant(1, 0).unwrap();
        assert_eq!((g.id, role), (id, CellRole::Target));
        assert_eq!(g.qubit(), 1);
        assert_eq!(g.control_qubit(), Some(0));

        // Single-qubit gates cannot land on either half.
        assert!(c.add_gate(h(), 0, 0, None).is_err());
        assert!(c.add_gate(h(), 1, 0, None).is_err());
    }

    #[test]
    fn arity_preconditions() {
        let mut c = Circuit::new(2, 1);
        assert_eq!(
            c.add_gate(cx(), 1, 0, None),
            Err(CircuitError::MissingControl { kind: GateKind::CX })
        );
        assert_eq!(
            c.add_gate(cx(), 1, 0, Some(1)),
            Err(CircuitError::ControlIsTarget { kind: GateKind::CX })
        );
        assert_eq!(
            c.add_gate(h(), 1, 0, Some(0)),
            Err(CircuitError::UnexpectedControl { kind: GateKind::H })
        );
        assert_eq!(
            c.add_gate(cx(), 1, 0, Some(5)),
            Err(CircuitError::QubitOutOfRange { qubit: 5, qubits: 2 })
        );
        assert!(c.is_empty());
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut c = Circuit::new(1, 1);
        assert_eq!(
            c.add_gate(h(), 0, 1, None),
            Err(CircuitError::StepOutOfRange { step: 1, steps: 1 })
        );
        assert_eq!(
            c.add_gate(h(), 1, 0, None),
            Err(CircuitError::QubitOutOfRange { qubit: 1, qubits: 1 })
        );

        let mut empty = Circuit::new(0, 1);
        assert!(empty.add_gate(h(), 0, 0, None).is_err());
    }

    #[test]
    fn removing_cx_frees_both_cells() {
        let mut c = Circuit::new(3, 2);
        let id = c.add_gate(cx(), 2, 1, Some(0)).unwrap();
        let removed = c.remove_gate(id).unwrap();
        assert_eq!(removed.placement, Placement::Two { target: 2, control: 0 });
        assert!(c.is_free(0, 1));
        assert!(c.is_free(2, 1));
        assert!(c.add_gate(h(), 0, 1, None).is_ok());
    }

    #[test]
    fn removing_unknown_id_is_noop() {
        let mut c = Circuit::new(2, 2);
        c.add_gate(h(), 0, 0, None).unwrap();
        let before = c.clone();
        assert!(c.remove_gate(GateId(999)).is_none());
        assert_eq!(c, before);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut c = Circuit::new(1, 2);
        let a = c.add_gate(h(), 0, 0, None).unwrap();
        c.remove_gate(a);
        let b = c.add_gate(h(), 0, 0, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn cell_info_links_cx_through_middle_qubit() {
        let mut c = Circuit::new(3, 1);
        c.add_gate(cx(), 2, 0, Some(0)).unwrap();

        let top = c.cell_info(0, 0);
        assert_eq!(top.role, Some(CellRole::Control));
        assert!(!top.vert_above && top.vert_below);

        let mid = c.cell_info(1, 0);
        assert!(mid.gate.is_none());
        assert!(mid.pass_through && mid.vert_above && mid.vert_below);

        let bottom = c.cell_info(2, 0);
        assert_eq!(bottom.role, Some(CellRole::Target));
        assert!(bottom.vert_above && !bottom.vert_below);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add { kind: usize, qubit: usize, step: usize, control: usize },
        Remove(u64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0usize..4, 0usize..4, 0usize..4, 0usize..4)
                .prop_map(|(kind, qubit, step, control)| Op::Add { kind, qubit, step, control }),
            1 => (1u64..20).prop_map(Op::Remove),
        ]
    }

    fn assert_cells_exclusive(c: &Circuit) {
        for gates in c.steps() {
            let mut seen = Vec::new();
            for g in gates {
                for q in g.placement.touched() {
                    assert!(!seen.contains(&q), "qubit {q} touched twice in one step");
                    seen.push(q);
                }
                if let Placement::Two { target, control } = g.placement {
                    assert_ne!(target, control);
                }
            }
        }
    }

    proptest! {
        #[test]
        fn occupancy_holds_under_any_edit_sequence(ops in prop::collection::vec(arb_op(), 1..40)) {
            let mut c = Circuit::new(3, 3);
            for op in ops {
                let before = c.clone();
                match op {
                    Op::Add { kind, qubit, step, control } => {
                        let gate = GateKind::ALL[kind].gate();
                        let control = (gate.arity == Arity::Two).then_some(control);
                        if c.add_gate(gate, qubit, step, control).is_err() {
                            prop_assert_eq!(&c, &before);
                        }
                    }
                    Op::Remove(id) => {
                        if c.remove_gate(GateId(id)).is_none() {
                            prop_assert_eq!(&c, &before);
                        }
                    }
                }
                assert_cells_exclusive(&c);
                prop_assert_eq!(c.num_steps(), 3);
            }
        }
    }
}
