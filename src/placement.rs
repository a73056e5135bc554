//! Placement controller: the click-by-click gesture state machine and the
//! per-puzzle session that owns the circuit it edits.

use tracing::{debug, info};

use crate::circuit::{Circuit, CircuitError, GateId};
use crate::gates::{find_by_id, Arity, GateKind, Tool};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gesture {
    Idle,
    /// A gate kind is armed and no cell has been clicked yet.
    Armed(GateKind),
    /// First endpoint of a two-qubit gate chosen; waiting for the target.
    PendingControl {
        kind: GateKind,
        control_qubit: usize,
        control_step: usize,
    },
    Deleting,
}

impl Gesture {
    pub fn tool(&self) -> Option<Tool> {
        match *self {
            Gesture::Idle => None,
            Gesture::Armed(kind) | Gesture::PendingControl { kind, .. } => Some(Tool::Gate(kind)),
            Gesture::Deleting => Some(Tool::Delete),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Placed(GateId),
    Removed(GateId),
    ControlPending { qubit: usize, step: usize },
    /// A two-qubit gesture was dropped because the second click was in another step.
    Abandoned,
    /// Nothing to do: idle click, empty cell while deleting, unknown id, ...
    Ignored,
    Rejected(CircuitError),
}

/// One puzzle attempt: the circuit being edited, the gesture in progress and
/// what the puzzle allows.
#[derive(Clone, Debug)]
pub struct Session {
    circuit: Circuit,
    gesture: Gesture,
    available: Vec<GateKind>,
    read_only: bool,
}

impl Session {
    pub fn new(circuit: Circuit, available: Vec<GateKind>, read_only: bool) -> Self {
        Session {
            circuit,
            gesture: Gesture::Idle,
            available,
            read_only,
        }
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn available(&self) -> &[GateKind] {
        &self.available
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn circuit_snapshot(&self) -> Circuit {
        self.circuit.clone()
    }

    pub fn reset(&mut self, circuit: Circuit, available: Vec<GateKind>, read_only: bool) {
        *self = Session::new(circuit, available, read_only);
    }

    /// Arms `tool`, or disarms when `tool` is `None` or already armed.
    pub fn select_tool(&mut self, tool: Option<Tool>) -> Gesture {
        let next = match tool {
            None => Gesture::Idle,
            Some(t) if self.gesture.tool() == Some(t) => Gesture::Idle,
            Some(Tool::Delete) => Gesture::Deleting,
            Some(Tool::Gate(kind)) => {
                if !self.available.contains(&kind) || find_by_id(kind).is_none() {
                    debug!(%kind, "gate kind not available in this puzzle");
                    return self.gesture;
                }
                Gesture::Armed(kind)
            }
        };
        debug!(from = ?self.gesture, to = ?next, "select tool");
        self.gesture = next;
        next
    }

    pub fn handle_cell_click(&mut self, qubit: usize, step: usize) -> Outcome {
        if self.read_only {
            return Outcome::Rejected(CircuitError::ReadOnly);
        }
        if !self.circuit.contains_cell(qubit, step) {
            return Outcome::Ignored;
        }

        let outcome = match self.gesture {
            Gesture::Idle => Outcome::Ignored,
            Gesture::Deleting => match self.circuit.occupant(qubit, step).map(|(g, _)| g.id) {
                Some(id) => self.remove(id),
                None => Outcome::Ignored,
            },
            Gesture::Armed(kind) => match kind.arity() {
                Arity::Single => {
                    self.gesture = Gesture::Idle;
                    self.place(kind, qubit, step, None)
                }
                Arity::Two => {
                    if self.circuit.is_free(qubit, step) {
                        self.gesture = Gesture::PendingControl {
                            kind,
                            control_qubit: qubit,
                            control_step: step,
                        };
                        Outcome::ControlPending { qubit, step }
                    } else {
                        self.gesture = Gesture::Idle;
                        Outcome::Rejected(CircuitError::Occupied { qubit, step })
                    }
                }
            },
            Gesture::PendingControl {
                kind,
                control_qubit,
                control_step,
            } => {
                if step != control_step {
                    self.gesture = Gesture::Idle;
                    Outcome::Abandoned
                } else if qubit == control_qubit {
                    Outcome::Ignored
                } else {
                    self.gesture = Gesture::Idle;
                    self.place(kind, qubit, step, Some(control_qubit))
                }
            }
        };

        debug!(qubit, step, ?outcome, gesture = ?self.gesture, "cell click");
        outcome
    }

    pub fn remove_gate_instance(&mut self, id: GateId) -> Outcome {
        if self.read_only {
            return Outcome::Rejected(CircuitError::ReadOnly);
        }
        self.remove(id)
    }

    fn place(&mut self, kind: GateKind, qubit: usize, step: usize, control: Option<usize>) -> Outcome {
        let Some(gate) = find_by_id(kind) else {
            return Outcome::Ignored;
        };
        match self.circuit.add_gate(gate, qubit, step, control) {
            Ok(id) => {
                info!(%id, %kind, qubit, step, ?control, "placed gate");
                Outcome::Placed(id)
            }
            Err(e) => Outcome::Rejected(e),
        }
    }

    fn remove(&mut self, id: GateId) -> Outcome {
        match self.circuit.remove_gate(id) {
            Some(gate) => {
                info!(%id, kind = %gate.kind, "removed gate");
                Outcome::Removed(id)
            }
            None => Outcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::CellRole;

    const ALL: [GateKind; 4] = GateKind::ALL;

    fn session(qubits: usize, steps: usize) -> Session {
        Session::new(Circuit::new(qubits, steps), ALL.to_vec(), false)
    }

    #[test]
    fn hadamard_on_single_cell() {
        let mut s = session(1, 1);
        assert_eq!(s.select_tool(Some(Tool::Gate(GateKind::H))), Gesture::Armed(GateKind::H));
        let outcome = s.handle_cell_click(0, 0);
        let Outcome::Placed(id) = outcome else {
            panic!("expected placement, got {outcome:?}");
        };
        let (gate, role) = s.circuit().occupant(0, 0).unwrap();
        assert_eq!((gate.id, gate.kind, role), (id, GateKind::H, CellRole::Single));
        assert_eq!(s.circuit().steps()[0].len(), 1);
        assert_eq!(s.gesture(), Gesture::Idle);
    }

    #[test]
    fn cnot_two_click_placement() {
        let mut s = session(2, 1);
        s.select_tool(Some(Tool::Gate(GateKind::CX)));

        assert_eq!(s.handle_cell_click(0, 0), Outcome::ControlPending { qubit: 0, step: 0 });
        assert_eq!(
            s.gesture(),
            Gesture::PendingControl { kind: GateKind::CX, control_qubit: 0, control_step: 0 }
        );
        assert!(s.circuit().is_empty());

        // Same cell again: nothing happens, still pending.
        assert_eq!(s.handle_cell_click(0, 0), Outcome::Ignored);
        assert!(matches!(s.gesture(), Gesture::PendingControl { .. }));

        assert!(matches!(s.handle_cell_click(1, 0), Outcome::Placed(_)));
        let (gate, _) = s.circuit().occupant(1, 0).unwrap();
        assert_eq!(gate.qubit(), 1);
        assert_eq!(gate.control_qubit(), Some(0));
        assert_eq!(s.gesture(), Gesture::Idle);
    }

    #[test]
    fn cnot_cross_step_abandons() {
        let mut s = session(2, 2);
        s.select_tool(Some(Tool::Gate(GateKind::CX)));
        s.handle_cell_click(0, 0);
        let before = s.circuit_snapshot();

        assert_eq!(s.handle_cell_click(1, 1), Outcome::Abandoned);
        assert_eq!(s.gesture(), Gesture::Idle);
        assert_eq!(s.circuit_snapshot(), before);
    }

    #[test]
    fn rejected_single_placement_still_clears_selection() {
        let mut s = session(1, 1);
        s.select_tool(Some(Tool::Gate(GateKind::H)));
        s.handle_cell_click(0, 0);
        let before = s.circuit_snapshot();

        s.select_tool(Some(Tool::Gate(GateKind::X)));
        assert_eq!(
            s.handle_cell_click(0, 0),
            Outcome::Rejected(CircuitError::Occupied { qubit: 0, step: 0 })
        );
        assert_eq!(s.gesture(), Gesture::Idle);
        assert_eq!(s.circuit_snapshot(), before);
    }

    #[test]
    fn cnot_target_collision_rejected_and_cleared() {
        let mut s = session(2, 1);
        s.select_tool(Some(Tool::Gate(GateKind::H)));
        s.handle_cell_click(1, 0);
        let before = s.circuit_snapshot();

        s.select_tool(Some(Tool::Gate(GateKind::CX)));
        s.handle_cell_click(0, 0);
        assert_eq!(
            s.handle_cell_click(1, 0),
            Outcome::Rejected(CircuitError::Occupied { qubit: 1, step: 0 })
        );
        assert_eq!(s.gesture(), Gesture::Idle);
        assert_eq!(s.circuit_snapshot(), before);
    }

    #[test]
    fn cnot_first_click_on_occupied_cell_is_rejected() {
        let mut s = session(2, 1);
        s.select_tool(Some(Tool::Gate(GateKind::M)));
        s.handle_cell_click(0, 0);

        s.select_tool(Some(Tool::Gate(GateKind::CX)));
        assert!(matches!(
            s.handle_cell_click(0, 0),
            Outcome::Rejected(CircuitError::Occupied { .. })
        ));
        assert_eq!(s.gesture(), Gesture::Idle);
    }

    #[test]
    fn selection_toggles_and_switches() {
        let mut s = session(2, 2);
        let h = Some(Tool::Gate(GateKind::H));
        let x = Some(Tool::Gate(GateKind::X));

        assert_eq!(s.select_tool(h), Gesture::Armed(GateKind::H));
        assert_eq!(s.select_tool(x), Gesture::Armed(GateKind::X));
        assert_eq!(s.select_tool(x), Gesture::Idle);
        assert_eq!(s.select_tool(Some(Tool::Delete)), Gesture::Deleting);
        assert_eq!(s.select_tool(Some(Tool::Delete)), Gesture::Idle);
        assert_eq!(s.select_tool(h), Gesture::Armed(GateKind::H));
        assert_eq!(s.select_tool(None), Gesture::Idle);
    }

    #[test]
    fn deselect_discards_pending_control() {
        let mut s = session(2, 1);
        let cx = Some(Tool::Gate(GateKind::CX));
        s.select_tool(cx);
        s.handle_cell_click(0, 0);
        assert_eq!(s.select_tool(cx), Gesture::Idle);
        assert!(s.circuit().is_empty());

        s.select_tool(cx);
        s.handle_cell_click(0, 0);
        s.reset(Circuit::new(2, 1), ALL.to_vec(), false);
        assert_eq!(s.gesture(), Gesture::Idle);
        // Second click after reset only ignores: nothing armed.
        assert_eq!(s.handle_cell_click(1, 0), Outcome::Ignored);
    }

    #[test]
    fn unavailable_kind_is_not_armed() {
        let mut s = Session::new(Circuit::new(1, 1), vec![GateKind::H], false);
        assert_eq!(s.select_tool(Some(Tool::Gate(GateKind::CX))), Gesture::Idle);
        s.select_tool(Some(Tool::Gate(GateKind::H)));
        assert_eq!(s.select_tool(Some(Tool::Gate(GateKind::X))), Gesture::Armed(GateKind::H));
    }

    #[test]
    fn delete_mode_removes_whole_cnot_and_stays_armed() {
        let mut s = session(3, 1);
        s.select_tool(Some(Tool::Gate(GateKind::CX)));
        s.handle_cell_click(0, 0);
        let Outcome::Placed(id) = s.handle_cell_click(2, 0) else {
            panic!("cnot not placed");
        };

        s.select_tool(Some(Tool::Delete));
        assert_eq!(s.handle_cell_click(1, 0), Outcome::Ignored);
        assert_eq!(s.handle_cell_click(2, 0), Outcome::Removed(id));
        assert!(s.circuit().is_free(0, 0));
        assert!(s.circuit().is_free(2, 0));
        assert_eq!(s.gesture(), Gesture::Deleting);
    }

    #[test]
    fn remove_by_id_and_unknown_id() {
        let mut s = session(1, 1);
        s.select_tool(Some(Tool::Gate(GateKind::X)));
        let Outcome::Placed(id) = s.handle_cell_click(0, 0) else {
            panic!("x not placed");
        };
        let before = s.circuit_snapshot();
        assert_eq!(s.remove_gate_instance(GateId(77)), Outcome::Ignored);
        assert_eq!(s.circuit_snapshot(), before);
        assert_eq!(s.remove_gate_instance(id), Outcome::Removed(id));
        assert!(s.circuit().is_empty());
    }

    #[test]
    fn read_only_rejects_everything() {
        let mut circuit = Circuit::new(2, 2);
        let id = circuit.add_gate(GateKind::H.gate(), 0, 0, None).unwrap();
        let mut s = Session::new(circuit, ALL.to_vec(), true);
        let before = s.circuit_snapshot();

        for tool in [Tool::Gate(GateKind::H), Tool::Gate(GateKind::CX), Tool::Delete] {
            s.select_tool(Some(tool));
            for (q, st) in [(0, 0), (1, 0), (1, 1)] {
                assert_eq!(s.handle_cell_click(q, st), Outcome::Rejected(CircuitError::ReadOnly));
            }
        }
        assert_eq!(s.remove_gate_instance(id), Outcome::Rejected(CircuitError::ReadOnly));
        assert_eq!(s.circuit_snapshot(), before);
    }

    #[test]
    fn idle_and_out_of_range_clicks_are_ignored() {
        let mut s = session(1, 1);
        assert_eq!(s.handle_cell_click(0, 0), Outcome::Ignored);
        s.select_tool(Some(Tool::Gate(GateKind::H)));
        assert_eq!(s.handle_cell_click(3, 0), Outcome::Ignored);
        assert_eq!(s.gesture(), Gesture::Armed(GateKind::H));
    }
}
