use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use rand::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    thread,
    time::Duration,
};

const CRATE_NAME: &str = "yao";
const CIRCUIT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../yao/circuits/max_4bit.json");

/// A fresh directory for the input, log and verification files of a single test.
fn test_dir(name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let suffix: u64 = random();
    let dir = std::env::temp_dir().join(format!("yao-cli-{name}-{suffix:x}"));
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn write(dir: &Path, file: &str, contents: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.join(file);
    fs::write(&path, contents)?;
    Ok(path)
}

fn new_command(dir: &Path) -> Result<Command, Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin(CRATE_NAME)?;
    cmd.current_dir(dir)
        .env_remove("YAO_ADDRESS")
        .env_remove("YAO_BIT_SIZE")
        .env_remove("YAO_PRIME_BITS")
        .env_remove("YAO_OBLIVIOUS_TRANSFER");
    Ok(cmd)
}

fn local_command(
    dir: &Path,
    alice: &str,
    bob: &str,
) -> Result<Command, Box<dyn std::error::Error>> {
    write(dir, "inputs_alice.txt", alice)?;
    write(dir, "inputs_bob.txt", bob)?;
    let mut cmd = new_command(dir)?;
    cmd.args(["local", "--circuit", CIRCUIT, "--prime-bits", "32"]);
    Ok(cmd)
}

#[test]
fn file_doesnt_exist() -> Result<(), Box<dyn std::error::Error>> {
    let dir = test_dir("missing")?;
    write(&dir, "inputs_alice.txt", "1")?;
    write(&dir, "inputs_bob.txt", "1")?;
    new_command(&dir)?
        .args(["local", "--circuit", "foobar.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not open file"));

    new_command(&dir)?
        .args(["local", "--circuit", CIRCUIT, "--input-bob", "foobar.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Could not open file"));

    Ok(())
}

#[test]
fn invalid_file_extensions() -> Result<(), Box<dyn std::error::Error>> {
    let dir = test_dir("extensions")?;
    local_command(&dir, "1", "2")?
        .args(["--log-alice", "logs_alice.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Log file must be a .json file"));

    local_command(&dir, "1", "2")?
        .args(["--verify", "verification.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Verification file must be a .txt file",
        ));

    Ok(())
}

#[test]
fn input_out_of_range() -> Result<(), Box<dyn std::error::Error>> {
    let dir = test_dir("range")?;
    local_command(&dir, "3 16", "5")?
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    // 16 fits into 5 bits, but the circuit only has 4 input wires per party
    local_command(&dir, "3 16", "5")?
        .args(["--bit-size", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("do not match the circuit"));

    Ok(())
}

#[test]
fn local_run() -> Result<(), Box<dyn std::error::Error>> {
    let dir = test_dir("local")?;
    local_command(&dir, "3 9", "5")?
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice global max: 9"))
        .stdout(predicate::str::contains("Bob global max: 9"))
        .stdout(predicate::str::contains("Verification: 1"));

    assert_eq!(fs::read_to_string(dir.join("verification.txt"))?, "1");
    for log in ["logs_alice.json", "logs_bob.json"] {
        let json = fs::read_to_string(dir.join(log))?;
        assert!(json.contains("\"intermediate_result\""), "{log}");
        assert!(json.contains("\"communication\""), "{log}");
    }
    Ok(())
}

#[test]
fn local_run_without_ot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = test_dir("plain")?;
    local_command(&dir, "0", "0")?
        .arg("--disable-ot")
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice global max: 0"))
        .stdout(predicate::str::contains("Verification: 1"));

    let json = fs::read_to_string(dir.join("logs_bob.json"))?;
    assert!(json.contains("PlainLabels"));
    Ok(())
}

#[test]
fn configuration_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = test_dir("config")?;
    write(&dir, "Yao.toml", "bit_size = 3\nprime_bits = 16\n")?;
    local_command(&dir, "3 9", "5")?
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
    Ok(())
}

#[test]
fn two_processes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = test_dir("tcp")?;
    write(&dir, "inputs_alice.txt", "1 14 7")?;
    write(&dir, "inputs_bob.txt", "4 2")?;
    let port: u16 = thread_rng().gen_range(20001..=30000);
    let address = format!("127.0.0.1:{port}");

    let bob = new_command(&dir)?
        .args(["bob", "--address", &address])
        .stdout(Stdio::piped())
        .spawn()?;
    thread::sleep(Duration::from_millis(200));

    new_command(&dir)?
        .args(["alice", "--circuit", CIRCUIT, "--address", &address])
        .args(["--prime-bits", "32"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Computed global max: 14"));

    let output = bob.wait_with_output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)?.contains("Computed global max: 14"));

    for log in ["logs_alice.json", "logs_bob.json"] {
        let json = fs::read_to_string(dir.join(log))?;
        assert!(json.contains("\"intermediate_result\""), "{log}");
    }
    Ok(())
}
