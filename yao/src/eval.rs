//! Evaluation of a garbled circuit, knowing a single label per wire.
use std::collections::HashMap;

use crate::{
    garble::{row_index, GarbledTable},
    types::WireInput,
    Circuit, Error, WireId,
};

/// Evaluates the garbled tables of {circuit} and decodes the output bits.
///
/// {inputs} must hold one [`WireInput`] for every input wire of both parties. Each gate opens
/// exactly the row selected by the permutation-adjusted bits of its input wires; the output wires
/// are decoded by XORing their bits with {pbits_out}.
pub fn evaluate(
    circuit: &Circuit,
    tables: &[GarbledTable],
    pbits_out: &[bool],
    mut inputs: HashMap<WireId, WireInput>,
) -> Result<Vec<bool>, Error> {
    circuit.validate()?;
    if tables.len() != circuit.gates().len() {
        return Err(Error::InvalidGarbledTable(format!(
            "expected {} tables, found {}",
            circuit.gates().len(),
            tables.len()
        )));
    }
    if pbits_out.len() != circuit.output_wires().len() {
        return Err(Error::InvalidGarbledTable(format!(
            "expected {} output permutation bits, found {}",
            circuit.output_wires().len(),
            pbits_out.len()
        )));
    }
    if let Some(&w) = circuit
        .alice_wires()
        .iter()
        .chain(circuit.bob_wires())
        .find(|w| !inputs.contains_key(w))
    {
        return Err(Error::MissingWireInput(w));
    }

    for (gate, table) in circuit.gates().iter().zip(tables) {
        if table.rows.len() != 1 << gate.op.arity() {
            return Err(Error::InvalidGarbledTable(format!(
                "gate {} has {} rows",
                gate.output,
                table.rows.len()
            )));
        }
        let read = |w: &WireId| inputs.get(w).copied().ok_or(Error::MissingWireInput(*w));
        let x = read(&gate.inputs[0])?;
        let output = match gate.inputs.get(1) {
            Some(y_wire) => {
                let y = read(y_wire)?;
                let row = row_index(x.bit, y.bit);
                table.rows[row as usize].open(&x.label, Some(&y.label), gate.output, row)?
            }
            None => {
                let row = x.bit as u8;
                table.rows[row as usize].open(&x.label, None, gate.output, row)?
            }
        };
        inputs.insert(gate.output, output);
    }

    circuit
        .output_wires()
        .iter()
        .zip(pbits_out)
        .map(|(w, p)| {
            inputs
                .get(w)
                .map(|input| input.bit ^ p)
                .ok_or(Error::MissingWireInput(*w))
        })
        .collect()
}
