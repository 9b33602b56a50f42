//! Point-and-permute garbling of a [`Circuit`].
//!
//! Every wire gets two random labels and a random permutation bit. The table of a gate contains
//! one row per combination of input bits `(x, y)`, placed at index `(x ^ p_x) * 2 + (y ^ p_y)`,
//! so that the evaluator can select the single row it is able to decrypt using only the
//! permutation-adjusted bits it carries along with the labels.

use std::collections::HashMap;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{
    hash::{garbling_hash, xor_bytes},
    types::{GarbledRow, WireInput, WireKeyPair, WireLabel, LABEL_LEN, ROW_LEN},
    Circuit, Error, Gate, WireId,
};

/// The garbled table of a single gate: 4 rows for binary gates, 2 rows for `NOT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbledTable {
    pub(crate) rows: Vec<GarbledRow>,
}

impl GarbledTable {
    /// The encrypted rows, in point-and-permute order.
    pub fn rows(&self) -> &[GarbledRow] {
        &self.rows
    }
}

/// The garbler's view of a garbled circuit: all wire labels and the garbled tables.
///
/// Only the tables and the output permutation bits may be disclosed to the evaluator; input
/// labels leave this struct one at a time through [`GarbledCircuit::encode`] and
/// [`GarbledCircuit::offered_labels`].
pub struct GarbledCircuit {
    keys: HashMap<WireId, WireKeyPair>,
    tables: Vec<GarbledTable>,
    pbits_out: Vec<bool>,
}

impl GarbledCircuit {
    /// Draws fresh labels for every wire and garbles every gate of the circuit.
    pub fn garble<R: RngCore + CryptoRng>(circuit: &Circuit, rng: &mut R) -> Result<Self, Error> {
        circuit.validate()?;

        let wires = circuit
            .alice_wires()
            .iter()
            .chain(circuit.bob_wires())
            .chain(circuit.gates().iter().map(|g| &g.output));
        let keys: HashMap<WireId, WireKeyPair> = wires
            .map(|&w| (w, WireKeyPair::random(rng)))
            .collect();

        let tables = circuit
            .gates()
            .iter()
            .map(|gate| garble_gate(gate, &keys))
            .collect::<Result<Vec<_>, _>>()?;

        let pbits_out = circuit
            .output_wires()
            .iter()
            .map(|w| key_pair(&keys, *w).map(|k| k.permutation))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keys,
            tables,
            pbits_out,
        })
    }

    /// The garbled tables, in the order of the circuit's gates.
    pub fn tables(&self) -> &[GarbledTable] {
        &self.tables
    }

    /// The permutation bits of the output wires, needed to decode the output.
    pub fn pbits_out(&self) -> &[bool] {
        &self.pbits_out
    }

    /// Encodes one of the garbler's own input bits.
    pub fn encode(&self, wire: WireId, bit: bool) -> Result<WireInput, Error> {
        Ok(key_pair(&self.keys, wire)?.encode(bit))
    }

    /// Encodes a row of input bits for the given wires.
    pub fn encode_inputs(
        &self,
        wires: &[WireId],
        bits: &[bool],
    ) -> Result<Vec<(WireId, WireInput)>, Error> {
        if wires.len() != bits.len() {
            return Err(Error::InsufficientInput);
        }
        wires
            .iter()
            .zip(bits)
            .map(|(&w, &bit)| Ok((w, self.encode(w, bit)?)))
            .collect()
    }

    /// Both encodings `(label_0, p), (label_1, 1 ^ p)` of an evaluator wire, to be offered via OT.
    pub fn offered_labels(&self, wire: WireId) -> Result<[WireInput; 2], Error> {
        let keys = key_pair(&self.keys, wire)?;
        Ok([keys.encode(false), keys.encode(true)])
    }
}

fn key_pair(keys: &HashMap<WireId, WireKeyPair>, wire: WireId) -> Result<&WireKeyPair, Error> {
    keys.get(&wire).ok_or(Error::MissingWireInput(wire))
}

fn garble_gate(gate: &Gate, keys: &HashMap<WireId, WireKeyPair>) -> Result<GarbledTable, Error> {
    let out = key_pair(keys, gate.output)?;
    let rows = match gate.inputs.as_slice() {
        &[x_wire] => {
            let kx = key_pair(keys, x_wire)?;
            let mut rows = [GarbledRow([0; ROW_LEN]); 2];
            for x in [false, true] {
                let row = (x ^ kx.permutation) as u8;
                let z = gate.op.apply(x, x);
                rows[row as usize] =
                    GarbledRow::seal(&kx.label(x), None, gate.output, row, out.encode(z));
            }
            rows.to_vec()
        }
        &[x_wire, y_wire] => {
            let kx = key_pair(keys, x_wire)?;
            let ky = key_pair(keys, y_wire)?;
            let mut rows = [GarbledRow([0; ROW_LEN]); 4];
            for x in [false, true] {
                for y in [false, true] {
                    let row = row_index(x ^ kx.permutation, y ^ ky.permutation);
                    let z = gate.op.apply(x, y);
                    rows[row as usize] = GarbledRow::seal(
                        &kx.label(x),
                        Some(&ky.label(y)),
                        gate.output,
                        row,
                        out.encode(z),
                    );
                }
            }
            rows.to_vec()
        }
        _ => {
            return Err(Error::InvalidCircuit(format!(
                "gate {} has {} inputs",
                gate.output,
                gate.inputs.len()
            )))
        }
    };
    Ok(GarbledTable { rows })
}

/// The row selected by the permutation-adjusted bits of a binary gate's inputs.
#[inline]
pub(crate) fn row_index(x: bool, y: bool) -> u8 {
    ((x as u8) << 1) | y as u8
}

impl GarbledRow {
    /// Encrypts the output encoding: `label || bit || 0^15`, XORed with the row's pad.
    pub(crate) fn seal(
        label_x: &WireLabel,
        label_y: Option<&WireLabel>,
        gate: WireId,
        row: u8,
        output: WireInput,
    ) -> Self {
        let mut plaintext = [0u8; ROW_LEN];
        plaintext[..=LABEL_LEN].copy_from_slice(&output.to_bytes());
        let pad = garbling_hash::pad(label_x, label_y, gate, row);
        Self(xor_bytes(&plaintext, &pad))
    }

    /// Decrypts the row, failing unless the zero tag is intact.
    pub(crate) fn open(
        &self,
        label_x: &WireLabel,
        label_y: Option<&WireLabel>,
        gate: WireId,
        row: u8,
    ) -> Result<WireInput, Error> {
        let pad = garbling_hash::pad(label_x, label_y, gate, row);
        let plaintext = xor_bytes(&self.0, &pad);
        let (encoded, tag) = plaintext.split_at(LABEL_LEN + 1);
        if plaintext[LABEL_LEN] > 1 || tag.iter().any(|&b| b != 0) {
            return Err(Error::GarbledRowCorrupt(gate));
        }
        let mut bytes = [0u8; LABEL_LEN + 1];
        bytes.copy_from_slice(encoded);
        Ok(WireInput::from_bytes(&bytes))
    }
}
