//! Secure two-party maximum using Yao's Garbled Circuits.
//!
//! Two parties, the _garbler_ (Alice) and the _evaluator_ (Bob), repeatedly evaluate a boolean
//! circuit (by default a 4-bit maximum) over their private input sequences. Neither party learns
//! the other's inputs, only the outputs of each evaluation and the running maximum.
//!
//! The garbler encodes the circuit using the point-and-permute technique, the evaluator obtains
//! the wire labels for its own input bits through a 1-out-of-2 oblivious transfer based on the
//! Diffie-Hellman problem in a prime order group (see "Cryptography Made Simple", N. Smart).
//!
//! The transport is deliberately _not_ fixed by this crate. Both parties are driven through the
//! [`Transport`] trait; [`ChannelTransport`] connects two parties running as threads in the same
//! process, other implementations (e.g. TCP) can be provided by the user of this crate.
//!
//! # Examples
//!
//! ```
//! use yao::{Circuit, Error, GarblerOptions, Gate, GateOp, InputRow};
//!
//! fn main() -> Result<(), Error> {
//!     // A single AND gate between one bit of each party:
//!     let circuit = Circuit::new(
//!         "and",
//!         vec![Gate::binary(GateOp::And, 1, 2, 3)],
//!         vec![1],
//!         vec![2],
//!         vec![3],
//!     );
//!
//!     let alice = vec![InputRow::new(1, 1)?];
//!     let bob = vec![InputRow::new(0, 1)?, InputRow::new(1, 1)?];
//!
//!     // Alice replays her single input until Bob has used each of his inputs once:
//!     let options = GarblerOptions::default();
//!     let (garbler, evaluator) = yao::simulate(&[circuit], &alice, &bob, options)?;
//!     assert_eq!(garbler.outputs(), vec![0, 1]);
//!     assert_eq!(garbler.max(), Some(1));
//!     assert_eq!(evaluator.max(), Some(1));
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod circuit;
mod eval;
mod garble;
mod group;
mod hash;
mod input;
mod log;
pub mod msg;
mod ot_base;
mod simulator;
pub mod states;
mod transport;
mod types;

pub use circuit::*;
pub use eval::evaluate;
pub use garble::{GarbledCircuit, GarbledTable};
pub use group::{GroupElement, GroupParameters, PrimeGroup, DEFAULT_PRIME_BITS};
pub use input::*;
pub use log::{Direction, LogRecord, MessageLog};
pub use simulator::*;
pub use states::{Evaluator, Garbler, GarblerOptions, Report, RoundOutcome, RoundState};
pub use transport::{channel_pair, ChannelTransport, Transport};
pub use types::{GarbledRow, WireInput, WireLabel};

/// Errors occurring during the validation or the execution of the protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The provided circuit contains invalid gate connections or wire assignments.
    #[error("The provided circuit is invalid and cannot be executed: {0}")]
    InvalidCircuit(String),
    /// The provided circuit has too many gates to be processed.
    #[error("The number of gates in the circuit exceed the maximum that can be processed")]
    MaxCircuitSizeExceeded,
    /// The circuit file could not be parsed.
    #[error("The circuit file could not be parsed: {0}")]
    CircuitFile(String),
    /// A file could not be read or written.
    #[error("I/O error: {0}")]
    Io(String),
    /// An input value does not fit into the configured number of bits.
    #[error("Input value {value} is out of range [0, 2^{bit_size})")]
    InputOutOfRange {
        /// The offending input value.
        value: i128,
        /// The configured number of bits per input value.
        bit_size: usize,
    },
    /// An input token is not a decimal integer, or the bit size is unsupported.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A party has no input values at all.
    #[error("The input sequence is empty")]
    EmptyInput,
    /// The width of the input rows does not match the number of input wires of the circuit.
    #[error("Not enough or too many input bits provided")]
    InsufficientInput,
    /// A different message was expected from the other party at this point in the protocol.
    #[error("Unexpected message kind: expected {expected}, received {received}")]
    UnexpectedMessageType {
        /// The message(s) valid in the current protocol state.
        expected: &'static str,
        /// The kind of the message that was actually received.
        received: &'static str,
    },
    /// An OT message refers to a different wire than the one currently being transferred.
    #[error("Expected a transfer for wire {expected}, received one for wire {received}")]
    WireMismatch {
        /// The wire whose label is transferred next.
        expected: WireId,
        /// The wire named by the other party.
        received: WireId,
    },
    /// A group element received from the other party is outside of `[1, prime - 1]`.
    #[error("Group element {0} is outside of the valid range")]
    InvalidGroupElement(u64),
    /// The other party uses different group parameters than the ones agreed for this session.
    #[error("The group parameters of the other party do not match the session parameters")]
    GroupMismatch,
    /// The group parameters do not describe a prime order group with a valid generator.
    #[error("Invalid group parameters: {0}")]
    InvalidGroupParameters(String),
    /// The public keys of an OT receiver do not multiply to the sender's setup element.
    #[error("The OT receiver's public keys are inconsistent with the OT setup")]
    OtKeyMismatch,
    /// An element without a multiplicative inverse was inverted.
    #[error("The element is not invertible")]
    NotInvertible,
    /// No generator was found within the maximum number of attempts.
    #[error("No generator found for the group")]
    GeneratorNotFound,
    /// No prime of the requested size was found within the maximum number of attempts.
    #[error("No prime of {0} bits found")]
    PrimeNotFound(u32),
    /// The garbled tables do not fit the structure of the circuit.
    #[error("The garbled tables do not match the circuit: {0}")]
    InvalidGarbledTable(String),
    /// A garbled table row did not decrypt to a well-formed entry.
    #[error("The garbled table row of gate {0} could not be decrypted")]
    GarbledRowCorrupt(WireId),
    /// No label is known for a wire that is needed to evaluate a gate.
    #[error("No label available for wire {0}")]
    MissingWireInput(WireId),
    /// The output bits do not fit the output wires of the circuit.
    #[error("Invalid output: {0}")]
    InvalidOutput(String),
    /// The other party refused to run a circuit.
    #[error("The other party rejected the circuit: {0}")]
    Rejected(String),
    /// The message could not be serialized to / deserialized from bincode.
    #[error("The message could not be serialized to / deserialized from bincode: {0}")]
    Serialization(String),
    /// The transport failed to send or receive a message.
    #[error("Transport error: {0}")]
    Transport(String),
    /// Receiving was interrupted by an external stop signal.
    #[error("Interrupted")]
    Interrupted,
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
