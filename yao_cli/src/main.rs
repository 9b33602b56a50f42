use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use yao_cli::{config::CONFIG_FILE, run_alice, run_bob, run_local, Config, LocalPaths, Overrides};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(
        long,
        global = true,
        default_value = CONFIG_FILE,
        help = "Path to a TOML configuration file"
    )]
    config: PathBuf,

    #[arg(long, global = true, help = "Address of the evaluator")]
    address: Option<String>,

    #[arg(
        short,
        long,
        global = true,
        help = "Number of input wires of a party in the circuit"
    )]
    bit_size: Option<usize>,

    #[arg(long, global = true, help = "Size of the prime used for oblivious transfer")]
    prime_bits: Option<u32>,

    #[arg(
        long,
        global = true,
        help = "Sends the evaluator's labels in the clear (debugging only)"
    )]
    disable_ot: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Garbles the circuits and connects to the evaluator
    Alice {
        #[arg(short, long, default_value = "4bit_max.json", help = "Path to the circuit file")]
        circuit: PathBuf,
        #[arg(short, long, default_value = "inputs_alice.txt", help = "Path to Alice's input file")]
        input: PathBuf,
        #[arg(short, long, default_value = "logs_alice.json", help = "Path to Alice's log file")]
        log: PathBuf,
    },
    /// Waits for the garbler and evaluates the garbled circuits
    Bob {
        #[arg(short, long, default_value = "inputs_bob.txt", help = "Path to Bob's input file")]
        input: PathBuf,
        #[arg(short, long, default_value = "logs_bob.json", help = "Path to Bob's log file")]
        log: PathBuf,
    },
    /// Runs both parties in this process and verifies the result
    Local {
        #[arg(short, long, default_value = "4bit_max.json", help = "Path to the circuit file")]
        circuit: PathBuf,
        #[arg(long, default_value = "inputs_alice.txt", help = "Path to Alice's input file")]
        input_alice: PathBuf,
        #[arg(long, default_value = "inputs_bob.txt", help = "Path to Bob's input file")]
        input_bob: PathBuf,
        #[arg(long, default_value = "logs_alice.json", help = "Path to Alice's log file")]
        log_alice: PathBuf,
        #[arg(long, default_value = "logs_bob.json", help = "Path to Bob's log file")]
        log_bob: PathBuf,
        #[arg(
            short,
            long,
            default_value = "verification.txt",
            help = "Path to the verification output file"
        )]
        verify: PathBuf,
    },
}

fn format_max(max: Option<u64>) -> String {
    max.map_or_else(|| "none".to_string(), |max| max.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let overrides = Overrides {
        address: cli.address,
        bit_size: cli.bit_size,
        prime_bits: cli.prime_bits,
        oblivious_transfer: cli.disable_ot.then_some(false),
    };
    let config = Config::load(&cli.config, &overrides)
        .with_context(|| format!("Invalid configuration `{}`", cli.config.display()))?;

    let stop = Arc::new(AtomicBool::new(false));
    let signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.store(true, Ordering::Relaxed);
        }
    });

    let command = cli.command;
    tokio::task::spawn_blocking(move || match command {
        Command::Alice {
            circuit,
            input,
            log,
        } => {
            let report = run_alice(&config, &circuit, &input, &log, stop)?;
            println!("Computed global max: {}", format_max(report.max()));
            Ok(())
        }
        Command::Bob { input, log } => {
            let report = run_bob(&config, &input, &log, stop)?;
            println!("Computed global max: {}", format_max(report.max()));
            Ok(())
        }
        Command::Local {
            circuit,
            input_alice,
            input_bob,
            log_alice,
            log_bob,
            verify,
        } => {
            let paths = LocalPaths {
                circuit: &circuit,
                alice_input: &input_alice,
                bob_input: &input_bob,
                alice_log: &log_alice,
                bob_log: &log_bob,
                verification: &verify,
            };
            let run = run_local(&config, &paths)?;
            println!("Alice global max: {}", format_max(run.alice.max()));
            println!("Bob global max: {}", format_max(run.bob.max()));
            println!("Verification: {}", run.verified as u8);
            Ok(())
        }
    })
    .await?
}
