//! Command line runner for the two-party secure maximum.
//!
//! The garbler (Alice) and the evaluator (Bob) either run as separate processes connected via TCP
//! (see [`run_alice`] and [`run_bob`]), or as two threads of a single process followed by a
//! verification of the result (see [`run_local`]).

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::{
    path::Path,
    sync::{atomic::AtomicBool, Arc},
};

use anyhow::{bail, Context};
use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};
use tracing::info;
use yao::{load_circuits, read_inputs, Circuit, Evaluator, Garbler, InputRow, MessageLog, Report};

pub mod config;
mod tcp;

pub use config::{Config, Overrides};
pub use tcp::TcpTransport;

fn check_extension(path: &Path, extension: &str, kind: &str) -> anyhow::Result<()> {
    if path.extension().and_then(|e| e.to_str()) != Some(extension) {
        bail!("{kind} file must be a .{extension} file: {}", path.display());
    }
    Ok(())
}

fn load_circuit_file(path: &Path) -> anyhow::Result<Vec<Circuit>> {
    if !path.exists() {
        bail!("Could not open file `{}`", path.display());
    }
    load_circuits(path).with_context(|| format!("Not a valid circuit file `{}`", path.display()))
}

fn load_input_file(path: &Path, bit_size: usize) -> anyhow::Result<Vec<InputRow>> {
    check_extension(path, "txt", "Input")?;
    if !path.exists() {
        bail!("Could not open file `{}`", path.display());
    }
    read_inputs(path, bit_size).with_context(|| format!("Invalid input file `{}`", path.display()))
}

fn write_log(log: &MessageLog, path: &Path) -> anyhow::Result<()> {
    log.write_to(path)
        .with_context(|| format!("Could not write log file `{}`", path.display()))?;
    info!(path = %path.display(), records = log.records().len(), "wrote message log");
    Ok(())
}

/// Writes the log even if the run failed; the run's error takes precedence.
fn finish(
    result: Result<Report, yao::Error>,
    log: &MessageLog,
    log_path: &Path,
) -> anyhow::Result<Report> {
    let written = write_log(log, log_path);
    let report = result.context("The protocol was aborted")?;
    written?;
    Ok(report)
}

/// Runs the garbler, connecting to the evaluator at the configured address.
pub fn run_alice(
    config: &Config,
    circuit: &Path,
    input: &Path,
    log_path: &Path,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<Report> {
    check_extension(log_path, "json", "Log")?;
    let circuits = load_circuit_file(circuit)?;
    let inputs = load_input_file(input, config.bit_size)?;
    let garbler = Garbler::new(circuits, inputs, config.garbler_options())
        .context("The inputs do not match the circuit")?;

    let transport = TcpTransport::connect(&config.address, stop)
        .with_context(|| format!("Could not connect to `{}`", config.address))?;
    let mut log = MessageLog::new();
    let result = garbler.run(transport, &mut log, &mut ChaCha20Rng::from_entropy());
    finish(result, &log, log_path)
}

/// Runs the evaluator, waiting for the garbler to connect to the configured address.
///
/// Setting `stop` ends the run gracefully, returning the rounds completed so far.
pub fn run_bob(
    config: &Config,
    input: &Path,
    log_path: &Path,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<Report> {
    check_extension(log_path, "json", "Log")?;
    let inputs = load_input_file(input, config.bit_size)?;
    let evaluator = Evaluator::new(inputs)?;

    let mut log = MessageLog::new();
    let result = match TcpTransport::accept(&config.address, stop) {
        Ok(transport) => evaluator.run(transport, &mut log, &mut ChaCha20Rng::from_entropy()),
        Err(yao::Error::Interrupted) => Ok(Report::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("Could not listen on `{}`", config.address))
        }
    };
    finish(result, &log, log_path)
}

/// The paths used by [`run_local`].
#[derive(Debug, Clone)]
pub struct LocalPaths<'a> {
    /// The circuit file.
    pub circuit: &'a Path,
    /// The garbler's input file.
    pub alice_input: &'a Path,
    /// The evaluator's input file.
    pub bob_input: &'a Path,
    /// The garbler's message log.
    pub alice_log: &'a Path,
    /// The evaluator's message log.
    pub bob_log: &'a Path,
    /// Receives `1` if the run was verified successfully, `0` otherwise.
    pub verification: &'a Path,
}

/// The outcome of a local run.
#[derive(Debug, Clone)]
pub struct LocalRun {
    /// The garbler's report.
    pub alice: Report,
    /// The evaluator's report.
    pub bob: Report,
    /// Whether both parties computed the maximum of all inputs.
    pub verified: bool,
}

/// Runs both parties in this process, then verifies their result.
pub fn run_local(config: &Config, paths: &LocalPaths) -> anyhow::Result<LocalRun> {
    check_extension(paths.alice_log, "json", "Log")?;
    check_extension(paths.bob_log, "json", "Log")?;
    check_extension(paths.verification, "txt", "Verification")?;
    let circuits = load_circuit_file(paths.circuit)?;
    let alice_inputs = load_input_file(paths.alice_input, config.bit_size)?;
    let bob_inputs = load_input_file(paths.bob_input, config.bit_size)?;

    let (alice, bob) = yao::simulate_logged(
        &circuits,
        &alice_inputs,
        &bob_inputs,
        config.garbler_options(),
    )
    .context("The inputs do not match the circuit")?;
    let alice_report = finish(alice.result, &alice.log, paths.alice_log);
    let bob_report = finish(bob.result, &bob.log, paths.bob_log);
    let (alice, bob) = (alice_report?, bob_report?);

    let verified = verify(&alice, &bob, &alice_inputs, &bob_inputs);
    std::fs::write(paths.verification, if verified { "1" } else { "0" }).with_context(|| {
        format!(
            "Could not write verification file `{}`",
            paths.verification.display()
        )
    })?;
    Ok(LocalRun {
        alice,
        bob,
        verified,
    })
}

/// True if both parties agree on a maximum that equals the maximum of all inputs.
pub fn verify(
    alice: &Report,
    bob: &Report,
    alice_inputs: &[InputRow],
    bob_inputs: &[InputRow],
) -> bool {
    let expected = alice_inputs.iter().chain(bob_inputs).map(InputRow::value).max();
    alice.max() == bob.max() && alice.max() == expected
}
