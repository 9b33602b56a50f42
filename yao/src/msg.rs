//! Messages exchanged between [`Garbler`](crate::Garbler) and [`Evaluator`](crate::Evaluator).
//!
//! The garbler only ever sends requests, the evaluator only ever replies. Every request gets
//! exactly one reply, most of them a plain [`Msg::Ack`].

use serde::{Deserialize, Serialize};

pub use crate::ot_base::message::{OtChoice, OtCiphertext, OtSetup, OtTransfer};
use crate::{garble::GarbledTable, group::GroupParameters, types::WireInput, Circuit, WireId};

/// The closed set of protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    /// Starts a new circuit session.
    Circuit(Box<CircuitOffer>),
    /// The sender's own exhaustion flag, exchanged at the start of every round.
    Exhausted(bool),
    /// The encoded input bits of the garbler for the current round.
    GarblerInputs(Vec<(WireId, WireInput)>),
    /// Starts the transfer of the labels of one of the evaluator's wires.
    OtSetup {
        /// The evaluator wire whose labels are offered.
        wire: WireId,
        /// The sender's first OT message.
        setup: OtSetup,
    },
    /// The receiver's public keys.
    OtChoice(OtChoice),
    /// The encrypted labels.
    OtTransfer(OtTransfer),
    /// Both labels of an evaluator wire, sent in the clear when OT is disabled.
    PlainLabels {
        /// The evaluator wire whose labels are sent.
        wire: WireId,
        /// The encodings of `0` and `1`.
        labels: [WireInput; 2],
    },
    /// Asks the evaluator to evaluate the circuit with the inputs of the current round.
    Evaluate,
    /// The decoded output bits, in the order of the circuit's output wires.
    Output(Vec<bool>),
    /// Acknowledges a request that has no other reply.
    Ack,
    /// Declines a [`Msg::Circuit`] that the evaluator cannot run, with the reason.
    Reject(String),
    /// Ends the protocol after the last circuit.
    Exit,
}

/// Everything the evaluator needs to know about a garbled circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitOffer {
    /// The gate structure and the input/output wires.
    pub circuit: Circuit,
    /// One garbled table per gate.
    pub garbled_tables: Vec<GarbledTable>,
    /// The permutation bits of the output wires.
    pub pbits_out: Vec<bool>,
    /// The group used for all oblivious transfers of this session.
    pub group: GroupParameters,
    /// Whether the evaluator's labels are sent via OT or in the clear.
    pub oblivious_transfer: bool,
}

impl Msg {
    /// The kind of the message, as used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Msg::Circuit(_) => "circuit",
            Msg::Exhausted(_) => "exhausted",
            Msg::GarblerInputs(_) => "garbler_inputs",
            Msg::OtSetup { .. } => "ot_setup",
            Msg::OtChoice(_) => "ot_choice",
            Msg::OtTransfer(_) => "ot_transfer",
            Msg::PlainLabels { .. } => "plain_labels",
            Msg::Evaluate => "evaluate",
            Msg::Output(_) => "output",
            Msg::Ack => "ack",
            Msg::Reject(_) => "reject",
            Msg::Exit => "exit",
        }
    }
}
