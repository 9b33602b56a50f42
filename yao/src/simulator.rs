//! Local execution of both parties, connected by an in-process channel.

use std::thread;

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::{
    channel_pair, Circuit, Error, Evaluator, Garbler, GarblerOptions, InputRow, MessageLog,
    Report,
};

/// The log and the outcome of one party of a simulated run.
#[derive(Debug)]
pub struct PartyRun {
    /// Every message and intermediate result of the party, also if the run failed.
    pub log: MessageLog,
    /// The outputs and the running maximum of the party.
    pub result: Result<Report, Error>,
}

/// Simulates both parties on the local machine, returning the garbler's and the evaluator's report.
///
/// The full cryptographic protocol is executed: the [`Garbler`] runs on the calling thread, the
/// [`Evaluator`] on a separate thread, and the messages are exchanged over local channels. The run
/// thus behaves like a two-party execution under ideal network conditions.
pub fn simulate(
    circuits: &[Circuit],
    alice_inputs: &[InputRow],
    bob_inputs: &[InputRow],
    options: GarblerOptions,
) -> Result<(Report, Report), Error> {
    let (garbler, evaluator) = simulate_logged(circuits, alice_inputs, bob_inputs, options)?;
    match (garbler.result, evaluator.result) {
        (Ok(garbler), Ok(evaluator)) => Ok((garbler, evaluator)),
        // the garbler only sees a closed channel or a rejection, report the cause instead
        (Err(Error::Transport(_) | Error::Rejected(_)), Err(e)) => Err(e),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

/// Like [`simulate`], but also returns the message logs of both parties.
///
/// Fails early only if the parties cannot be created; errors during the run are reported in the
/// returned [`PartyRun`]s.
pub fn simulate_logged(
    circuits: &[Circuit],
    alice_inputs: &[InputRow],
    bob_inputs: &[InputRow],
    options: GarblerOptions,
) -> Result<(PartyRun, PartyRun), Error> {
    let garbler = Garbler::new(circuits.to_vec(), alice_inputs.to_vec(), options)?;
    let evaluator = Evaluator::new(bob_inputs.to_vec())?;
    let (garbler_channel, evaluator_channel) = channel_pair();

    let evaluator_thread = thread::spawn(move || {
        let mut log = MessageLog::new();
        let mut rng = ChaCha20Rng::from_entropy();
        let result = evaluator.run(evaluator_channel, &mut log, &mut rng);
        PartyRun { log, result }
    });

    let mut log = MessageLog::new();
    let mut rng = ChaCha20Rng::from_entropy();
    let result = garbler.run(garbler_channel, &mut log, &mut rng);
    let garbler_run = PartyRun { log, result };

    let evaluator_run = evaluator_thread
        .join()
        .map_err(|_| Error::Transport("the evaluator thread panicked".into()))?;
    Ok((garbler_run, evaluator_run))
}
