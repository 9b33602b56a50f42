use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The identifier of a wire in a [`Circuit`].
pub type WireId = u32;

const MAX_GATES: usize = (u32::MAX >> 4) as usize;

/// Circuit outputs are decoded into a `u64`.
const MAX_OUTPUT_WIRES: usize = u64::BITS as usize;

/// A boolean circuit shared by both parties, with explicitly numbered wires.
///
/// The JSON representation follows the circuit file format:
///
/// ```json
/// { "id": "and", "alice": [1], "bob": [2], "out": [3],
///   "gates": [ { "id": 3, "type": "AND", "in": [1, 2] } ] }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    /// Human readable name of the circuit.
    id: String,
    /// Input wires of the garbler, in the order of the input bits (most significant first).
    #[serde(rename = "alice", default)]
    alice_wires: Vec<WireId>,
    /// Input wires of the evaluator, in the order of the input bits (most significant first).
    #[serde(rename = "bob", default)]
    bob_wires: Vec<WireId>,
    /// Output wires, the first one being the least significant bit of the output.
    #[serde(rename = "out")]
    output_wires: Vec<WireId>,
    /// The gates, each one only depending on input wires or on the outputs of earlier gates.
    gates: Vec<Gate>,
}

/// A file with one or more circuits, evaluated one after the other.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitFile {
    /// Name of the collection.
    #[serde(default)]
    pub name: String,
    /// The circuits in the file.
    pub circuits: Vec<Circuit>,
}

impl Circuit {
    /// the name of the circuit
    pub fn id(&self) -> &str {
        &self.id
    }
    /// input wires of the garbler (Alice)
    pub fn alice_wires(&self) -> &[WireId] {
        &self.alice_wires
    }
    /// input wires of the evaluator (Bob)
    pub fn bob_wires(&self) -> &[WireId] {
        &self.bob_wires
    }
    /// wires that are exposed as outputs of the whole circuit
    pub fn output_wires(&self) -> &[WireId] {
        &self.output_wires
    }
    /// the gates of the circuit
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// create new circuit from a collection of gates and the input / output wires
    pub fn new(
        id: impl Into<String>,
        gates: Vec<Gate>,
        alice_wires: Vec<WireId>,
        bob_wires: Vec<WireId>,
        output_wires: Vec<WireId>,
    ) -> Self {
        Self {
            id: id.into(),
            alice_wires,
            bob_wires,
            output_wires,
            gates,
        }
    }

    /// Parses all circuits of a JSON circuit file and validates them.
    pub fn from_json(json: &str) -> Result<Vec<Circuit>, Error> {
        let file: CircuitFile =
            serde_json::from_str(json).map_err(|e| Error::CircuitFile(e.to_string()))?;
        for circuit in file.circuits.iter() {
            circuit.validate()?;
        }
        Ok(file.circuits)
    }

    /// Performs a syntax check of the circuit.
    ///
    /// A circuit is invalid if any of the following is true:
    ///   - a gate reads a wire that is neither an input nor the output of an earlier gate
    ///   - a wire is assigned more than once (as an input or gate output)
    ///   - a gate has the wrong number of inputs for its operation
    ///   - it does not contain any output wires, or more than 64
    ///   - the output wires do not occur in the circuit
    ///   - the number of gates exceeds the maximum number supported
    pub fn validate(&self) -> Result<(), Error> {
        if self.gates.len() > MAX_GATES {
            return Err(Error::MaxCircuitSizeExceeded);
        }
        let mut defined = HashSet::new();
        for &w in self.alice_wires.iter().chain(self.bob_wires.iter()) {
            if !defined.insert(w) {
                return Err(Error::InvalidCircuit(format!(
                    "input wire {w} is assigned twice"
                )));
            }
        }
        for gate in self.gates.iter() {
            if gate.inputs.len() != gate.op.arity() {
                return Err(Error::InvalidCircuit(format!(
                    "gate {} ({:?}) expects {} inputs",
                    gate.output,
                    gate.op,
                    gate.op.arity()
                )));
            }
            if let Some(w) = gate.inputs.iter().find(|w| !defined.contains(*w)) {
                return Err(Error::InvalidCircuit(format!(
                    "gate {} reads the undefined wire {w}",
                    gate.output
                )));
            }
            if !defined.insert(gate.output) {
                return Err(Error::InvalidCircuit(format!(
                    "wire {} is assigned twice",
                    gate.output
                )));
            }
        }
        if self.output_wires.is_empty() || self.output_wires.len() > MAX_OUTPUT_WIRES {
            return Err(Error::InvalidCircuit(format!(
                "expected between 1 and {MAX_OUTPUT_WIRES} output wires, found {}",
                self.output_wires.len()
            )));
        }
        if let Some(w) = self.output_wires.iter().find(|w| !defined.contains(*w)) {
            return Err(Error::InvalidCircuit(format!(
                "output wire {w} does not occur in the circuit"
            )));
        }
        Ok(())
    }

    /// Evaluates the circuit in the clear, returning the bits of the output wires.
    pub fn evaluate_plaintext(&self, alice: &[bool], bob: &[bool]) -> Result<Vec<bool>, Error> {
        self.validate()?;
        if alice.len() != self.alice_wires.len() || bob.len() != self.bob_wires.len() {
            return Err(Error::InsufficientInput);
        }
        let mut wires: HashMap<WireId, bool> = self
            .alice_wires
            .iter()
            .copied()
            .zip(alice.iter().copied())
            .chain(self.bob_wires.iter().copied().zip(bob.iter().copied()))
            .collect();
        for gate in self.gates.iter() {
            let read = |w: &WireId| wires.get(w).copied().ok_or(Error::MissingWireInput(*w));
            let x = read(&gate.inputs[0])?;
            let y = match gate.inputs.get(1) {
                Some(w) => read(w)?,
                None => x,
            };
            wires.insert(gate.output, gate.op.apply(x, y));
        }
        self.output_wires
            .iter()
            .map(|w| wires.get(w).copied().ok_or(Error::MissingWireInput(*w)))
            .collect()
    }
}

/// Reads and validates the circuits of a JSON circuit file.
pub fn load_circuits(path: impl AsRef<Path>) -> Result<Vec<Circuit>, Error> {
    let json = std::fs::read_to_string(path)?;
    Circuit::from_json(&json)
}

/// The boolean operation of a [`Gate`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateOp {
    /// `x AND y`
    And,
    /// `x OR y`
    Or,
    /// `x XOR y`
    Xor,
    /// `NOT (x AND y)`
    Nand,
    /// `NOT (x OR y)`
    Nor,
    /// `NOT (x XOR y)`
    Xnor,
    /// `NOT x`, the only unary operation.
    Not,
}

impl GateOp {
    /// The number of input wires of the operation.
    pub fn arity(self) -> usize {
        match self {
            GateOp::Not => 1,
            _ => 2,
        }
    }

    /// Computes the operation; unary operations ignore {y}.
    #[inline]
    pub fn apply(self, x: bool, y: bool) -> bool {
        match self {
            GateOp::And => x & y,
            GateOp::Or => x | y,
            GateOp::Xor => x ^ y,
            GateOp::Nand => !(x & y),
            GateOp::Nor => !(x | y),
            GateOp::Xnor => !(x ^ y),
            GateOp::Not => !x,
        }
    }
}

/// A single gate in a larger [`Circuit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// The wire written by the gate, which also identifies the gate.
    #[serde(rename = "id")]
    pub output: WireId,
    /// The operation computed by the gate.
    #[serde(rename = "type")]
    pub op: GateOp,
    /// The wires read by the gate.
    #[serde(rename = "in")]
    pub inputs: Vec<WireId>,
}

impl Gate {
    /// A gate computing `op(x, y)` into wire {output}.
    pub fn binary(op: GateOp, x: WireId, y: WireId, output: WireId) -> Self {
        Self {
            output,
            op,
            inputs: vec![x, y],
        }
    }

    /// A gate computing `NOT x` into wire {output}.
    pub fn not(x: WireId, output: WireId) -> Self {
        Self {
            output,
            op: GateOp::Not,
            inputs: vec![x],
        }
    }
}
