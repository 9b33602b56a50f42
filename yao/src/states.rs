//! The two parties of the protocol and their synchronized round loop.
//!
//! Both parties walk through their own input sequence with a [`RoundState`]. Once a party has used
//! its last input it is _exhausted_, but keeps replaying its inputs from the start until the other
//! party is exhausted as well. Each round therefore pairs one input of the [`Garbler`] with one
//! input of the [`Evaluator`], and a circuit is evaluated exactly `max(n_a, n_b)` times.
//!
//! The parties are deliberately transport-agnostic and communicate through a [`Transport`]. The
//! garbler drives the protocol by sending requests, the evaluator answers every request with
//! exactly one reply.

use std::collections::HashMap;

use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::{
    eval::evaluate,
    garble::GarbledCircuit,
    group::{PrimeGroup, DEFAULT_PRIME_BITS},
    input::{decode_output, InputRow},
    log::MessageLog,
    msg::{CircuitOffer, Msg},
    ot_base::{Receiver, Sender},
    transport::Transport,
    types::WireInput,
    Circuit, Error,
};

/// Position of a party in its own input sequence, and the exhaustion flags of both parties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    cursor: usize,
    len: usize,
    self_exhausted: bool,
    peer_exhausted: bool,
}

impl RoundState {
    /// Starts at the first of {len} inputs, with neither party exhausted.
    pub fn new(len: usize) -> Self {
        Self {
            cursor: 0,
            len,
            self_exhausted: false,
            peer_exhausted: false,
        }
    }

    /// Returns the index of the input row for the next round.
    ///
    /// Handing out the last row marks the party as exhausted and rewinds the cursor, so that the
    /// inputs are replayed for as long as the other party needs.
    pub fn next_row(&mut self) -> usize {
        let row = self.cursor;
        if self.cursor + 1 >= self.len {
            self.cursor = 0;
            self.self_exhausted = true;
        } else {
            self.cursor += 1;
        }
        row
    }

    /// Stores the exhaustion flag received from the other party.
    pub fn observe_peer(&mut self, exhausted: bool) {
        self.peer_exhausted = exhausted;
    }

    /// True once both parties have used each of their inputs at least once.
    pub fn is_done(&self) -> bool {
        self.self_exhausted && self.peer_exhausted
    }

    /// True once this party has used each of its inputs at least once.
    pub fn self_exhausted(&self) -> bool {
        self.self_exhausted
    }

    /// The last exhaustion flag received from the other party.
    pub fn peer_exhausted(&self) -> bool {
        self.peer_exhausted
    }
}

/// The output of a single round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundOutcome {
    /// The id of the evaluated circuit.
    pub circuit: String,
    /// The decoded output of the round.
    pub output: u64,
    /// The maximum of all outputs up to and including this round.
    pub running_max: u64,
}

/// All outputs observed by a party, and their running maximum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    rounds: Vec<RoundOutcome>,
    max: Option<u64>,
}

impl Report {
    fn record(&mut self, circuit: &str, output: u64) -> u64 {
        let running_max = match self.max {
            Some(max) if max >= output => max,
            _ => output,
        };
        self.max = Some(running_max);
        self.rounds.push(RoundOutcome {
            circuit: circuit.to_string(),
            output,
            running_max,
        });
        running_max
    }

    /// Every round, in the order of evaluation.
    pub fn rounds(&self) -> &[RoundOutcome] {
        &self.rounds
    }

    /// The decoded outputs of all rounds.
    pub fn outputs(&self) -> Vec<u64> {
        self.rounds.iter().map(|r| r.output).collect()
    }

    /// The running maximum over all rounds of all circuits, `None` if no round was completed.
    pub fn max(&self) -> Option<u64> {
        self.max
    }
}

/// Options chosen by the garbler and announced to the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GarblerOptions {
    /// The size of the prime of the OT group, generated anew for every circuit.
    pub prime_bits: u32,
    /// If false, both labels of every evaluator wire are sent in the clear (for debugging only).
    pub oblivious_transfer: bool,
}

impl Default for GarblerOptions {
    fn default() -> Self {
        Self {
            prime_bits: DEFAULT_PRIME_BITS,
            oblivious_transfer: true,
        }
    }
}

/// The party garbling the circuits and driving the protocol (Alice).
pub struct Garbler {
    circuits: Vec<Circuit>,
    inputs: Vec<InputRow>,
    options: GarblerOptions,
}

/// The party evaluating the garbled circuits (Bob).
pub struct Evaluator {
    inputs: Vec<InputRow>,
}

/// Wraps a transport, recording every message in the party's log.
struct Link<'l, T> {
    transport: T,
    log: &'l mut MessageLog,
}

impl<'l, T: Transport> Link<'l, T> {
    fn send(&mut self, msg: &Msg) -> Result<(), Error> {
        debug!(msg = msg.name(), "sending");
        self.transport.send(msg)?;
        self.log.record_sent(msg);
        Ok(())
    }

    fn receive(&mut self) -> Result<Msg, Error> {
        let msg = self.transport.receive()?;
        debug!(msg = msg.name(), "received");
        self.log.record_received(&msg);
        Ok(msg)
    }

    fn request(&mut self, msg: &Msg) -> Result<Msg, Error> {
        self.send(msg)?;
        self.receive()
    }

    fn request_ack(&mut self, msg: &Msg) -> Result<(), Error> {
        match self.request(msg)? {
            Msg::Ack => Ok(()),
            other => Err(unexpected("ack", &other)),
        }
    }
}

fn unexpected(expected: &'static str, received: &Msg) -> Error {
    let received = received.name();
    warn!(expected, received, "protocol violation");
    Error::UnexpectedMessageType { expected, received }
}

fn check_inputs(inputs: &[InputRow], width: usize) -> Result<(), Error> {
    if inputs.is_empty() {
        return Err(Error::EmptyInput);
    }
    if inputs.iter().any(|row| row.bits().len() != width) {
        return Err(Error::InsufficientInput);
    }
    Ok(())
}

impl Garbler {
    /// Validates the circuits and checks that every input row matches the garbler's wires.
    pub fn new(
        circuits: Vec<Circuit>,
        inputs: Vec<InputRow>,
        options: GarblerOptions,
    ) -> Result<Self, Error> {
        for circuit in circuits.iter() {
            circuit.validate()?;
            check_inputs(&inputs, circuit.alice_wires().len())?;
        }
        Ok(Self {
            circuits,
            inputs,
            options,
        })
    }

    /// Runs all circuits against the evaluator on the other end of {transport}.
    pub fn run<T: Transport, R: RngCore + CryptoRng>(
        &self,
        transport: T,
        log: &mut MessageLog,
        rng: &mut R,
    ) -> Result<Report, Error> {
        let mut link = Link { transport, log };
        let mut report = Report::default();
        for circuit in self.circuits.iter() {
            self.run_circuit(circuit, &mut link, &mut report, rng)?;
        }
        link.request_ack(&Msg::Exit)?;
        info!(max = ?report.max(), "garbler finished");
        Ok(report)
    }

    fn run_circuit<T: Transport, R: RngCore + CryptoRng>(
        &self,
        circuit: &Circuit,
        link: &mut Link<T>,
        report: &mut Report,
        rng: &mut R,
    ) -> Result<(), Error> {
        let group = PrimeGroup::generate(self.options.prime_bits, rng)?;
        let garbled = GarbledCircuit::garble(circuit, rng)?;
        info!(
            circuit = circuit.id(),
            gates = circuit.gates().len(),
            prime = group.prime(),
            "garbled circuit"
        );
        let offer = CircuitOffer {
            circuit: circuit.clone(),
            garbled_tables: garbled.tables().to_vec(),
            pbits_out: garbled.pbits_out().to_vec(),
            group: group.parameters(),
            oblivious_transfer: self.options.oblivious_transfer,
        };
        match link.request(&Msg::Circuit(Box::new(offer)))? {
            Msg::Ack => {}
            Msg::Reject(reason) => {
                warn!(circuit = circuit.id(), %reason, "circuit rejected");
                return Err(Error::Rejected(reason));
            }
            other => return Err(unexpected("ack", &other)),
        }

        let mut state = RoundState::new(self.inputs.len());
        while !state.is_done() {
            let row = &self.inputs[state.next_row()];
            match link.request(&Msg::Exhausted(state.self_exhausted()))? {
                Msg::Exhausted(peer) => state.observe_peer(peer),
                other => return Err(unexpected("exhausted", &other)),
            }

            let inputs = garbled.encode_inputs(circuit.alice_wires(), row.bits())?;
            link.request_ack(&Msg::GarblerInputs(inputs))?;

            for &wire in circuit.bob_wires() {
                let labels = garbled.offered_labels(wire)?;
                if !self.options.oblivious_transfer {
                    link.request_ack(&Msg::PlainLabels { wire, labels })?;
                    continue;
                }
                let sender = Sender::new(&group, labels.map(WireInput::to_bytes), rng);
                let setup = sender.setup_message();
                let choice = match link.request(&Msg::OtSetup { wire, setup })? {
                    Msg::OtChoice(choice) => choice,
                    other => return Err(unexpected("ot_choice", &other)),
                };
                let transfer = sender.send(&choice, rng)?;
                link.request_ack(&Msg::OtTransfer(transfer))?;
            }

            let bits = match link.request(&Msg::Evaluate)? {
                Msg::Output(bits) => bits,
                other => return Err(unexpected("output", &other)),
            };
            let expected = circuit.output_wires().len();
            if bits.len() != expected {
                warn!(expected, received = bits.len(), "protocol violation");
                return Err(Error::InvalidOutput(format!(
                    "expected {expected} output bits, received {}",
                    bits.len()
                )));
            }
            let output = decode_output(&bits)?;
            link.log.record_result(circuit.output_wires(), &bits, output);
            let running_max = report.record(circuit.id(), output);
            info!(circuit = circuit.id(), output, running_max, "round completed");
        }
        Ok(())
    }
}

impl Evaluator {
    /// Creates an evaluator for the given (non-empty) input sequence.
    pub fn new(inputs: Vec<InputRow>) -> Result<Self, Error> {
        if inputs.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(Self { inputs })
    }

    /// Answers the garbler's requests until it sends [`Msg::Exit`].
    ///
    /// An [`Error::Interrupted`] raised by the transport stops the evaluator gracefully,
    /// returning the rounds completed so far.
    pub fn run<T: Transport, R: RngCore + CryptoRng>(
        &self,
        transport: T,
        log: &mut MessageLog,
        rng: &mut R,
    ) -> Result<Report, Error> {
        let mut link = Link { transport, log };
        let mut report = Report::default();
        match self.receive_loop(&mut link, &mut report, rng) {
            Ok(()) => info!(max = ?report.max(), "evaluator finished"),
            Err(Error::Interrupted) => warn!(max = ?report.max(), "evaluator interrupted"),
            Err(e) => return Err(e),
        }
        Ok(report)
    }

    fn receive_loop<T: Transport, R: RngCore + CryptoRng>(
        &self,
        link: &mut Link<T>,
        report: &mut Report,
        rng: &mut R,
    ) -> Result<(), Error> {
        loop {
            match link.receive()? {
                Msg::Circuit(offer) => {
                    let group = match self.accept(&offer) {
                        Ok(group) => group,
                        Err(e) => {
                            link.send(&Msg::Reject(e.to_string()))?;
                            return Err(e);
                        }
                    };
                    link.send(&Msg::Ack)?;
                    self.run_circuit(*offer, group, link, report, rng)?;
                }
                Msg::Exit => return link.send(&Msg::Ack),
                other => return Err(unexpected("circuit or exit", &other)),
            }
        }
    }

    /// Checks that the offered circuit can be run with the evaluator's inputs.
    fn accept(&self, offer: &CircuitOffer) -> Result<PrimeGroup, Error> {
        offer.circuit.validate()?;
        check_inputs(&self.inputs, offer.circuit.bob_wires().len())?;
        PrimeGroup::from_parameters(offer.group)
    }

    fn run_circuit<T: Transport, R: RngCore + CryptoRng>(
        &self,
        offer: CircuitOffer,
        group: PrimeGroup,
        link: &mut Link<T>,
        report: &mut Report,
        rng: &mut R,
    ) -> Result<(), Error> {
        let CircuitOffer {
            circuit,
            garbled_tables,
            pbits_out,
            oblivious_transfer,
            ..
        } = offer;
        info!(
            circuit = circuit.id(),
            gates = circuit.gates().len(),
            prime = group.prime(),
            "received garbled circuit"
        );
        if !oblivious_transfer {
            warn!("oblivious transfer is disabled, the garbler sends all labels in the clear");
        }

        let mut state = RoundState::new(self.inputs.len());
        while !state.is_done() {
            let row = &self.inputs[state.next_row()];
            match link.receive()? {
                Msg::Exhausted(peer) => state.observe_peer(peer),
                other => return Err(unexpected("exhausted", &other)),
            }
            link.send(&Msg::Exhausted(state.self_exhausted()))?;

            let mut inputs: HashMap<_, _> = match link.receive()? {
                Msg::GarblerInputs(inputs) => inputs.into_iter().collect(),
                other => return Err(unexpected("garbler_inputs", &other)),
            };
            link.send(&Msg::Ack)?;

            for (&wire, &bit) in circuit.bob_wires().iter().zip(row.bits()) {
                let input = if oblivious_transfer {
                    let setup = match link.receive()? {
                        Msg::OtSetup { wire: w, setup } if w == wire => setup,
                        Msg::OtSetup { wire: w, .. } => {
                            return Err(Error::WireMismatch {
                                expected: wire,
                                received: w,
                            })
                        }
                        other => return Err(unexpected("ot_setup", &other)),
                    };
                    let (choice, receiver) = Receiver::init(&group, &setup, bit, rng)?;
                    let transfer = match link.request(&Msg::OtChoice(choice))? {
                        Msg::OtTransfer(transfer) => transfer,
                        other => return Err(unexpected("ot_transfer", &other)),
                    };
                    WireInput::from_bytes(&receiver.recv(&transfer)?)
                } else {
                    match link.receive()? {
                        Msg::PlainLabels { wire: w, labels } if w == wire => labels[bit as usize],
                        Msg::PlainLabels { wire: w, .. } => {
                            return Err(Error::WireMismatch {
                                expected: wire,
                                received: w,
                            })
                        }
                        other => return Err(unexpected("plain_labels", &other)),
                    }
                };
                link.send(&Msg::Ack)?;
                inputs.insert(wire, input);
            }

            match link.receive()? {
                Msg::Evaluate => {}
                other => return Err(unexpected("evaluate", &other)),
            }
            let bits = evaluate(&circuit, &garbled_tables, &pbits_out, inputs)?;
            link.send(&Msg::Output(bits.clone()))?;

            let output = decode_output(&bits)?;
            link.log.record_result(circuit.output_wires(), &bits, output);
            let running_max = report.record(circuit.id(), output);
            info!(circuit = circuit.id(), output, running_max, "round completed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounds(n_a: usize, n_b: usize) -> usize {
        let (mut a, mut b) = (RoundState::new(n_a), RoundState::new(n_b));
        let mut rounds = 0;
        while !a.is_done() {
            assert_eq!(a.is_done(), b.is_done());
            a.next_row();
            b.next_row();
            let (flag_a, flag_b) = (a.self_exhausted(), b.self_exhausted());
            a.observe_peer(flag_b);
            b.observe_peer(flag_a);
            rounds += 1;
        }
        assert!(b.is_done());
        assert!(a.peer_exhausted() && b.peer_exhausted());
        rounds
    }

    #[test]
    fn test_round_count() {
        for n_a in 1..6 {
            for n_b in 1..6 {
                assert_eq!(rounds(n_a, n_b), n_a.max(n_b), "n_a = {n_a}, n_b = {n_b}");
            }
        }
    }

    #[test]
    fn test_cyclic_replay() {
        let mut state = RoundState::new(2);
        let rows: Vec<usize> = (0..5).map(|_| state.next_row()).collect();
        assert_eq!(rows, vec![0, 1, 0, 1, 0]);
        assert!(state.self_exhausted());
        assert!(!state.is_done());
    }

    #[test]
    fn test_running_max() {
        let mut report = Report::default();
        assert_eq!(report.max(), None);
        assert_eq!(report.record("max", 0), 0);
        assert_eq!(report.record("max", 5), 5);
        assert_eq!(report.record("max", 3), 5);
        assert_eq!(report.outputs(), vec![0, 5, 3]);
        let maxima: Vec<u64> = report.rounds().iter().map(|r| r.running_max).collect();
        assert_eq!(maxima, vec![0, 5, 5]);
        assert_eq!(report.max(), Some(5));
    }
}
