//! Layered configuration: defaults, then a TOML file, then `YAO_*` environment variables, then
//! command line flags.
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use yao::{GarblerOptions, DEFAULT_PRIME_BITS};

/// The default configuration file, read from the working directory if it exists.
pub const CONFIG_FILE: &str = "Yao.toml";

/// Settings shared by both parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The address the evaluator listens on and the garbler connects to.
    pub address: String,
    /// The number of bits of every input value.
    pub bit_size: usize,
    /// The size of the prime used for the oblivious transfers (garbler only).
    pub prime_bits: u32,
    /// Whether the evaluator's labels are transferred obliviously (garbler only).
    pub oblivious_transfer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5555".into(),
            bit_size: 4,
            prime_bits: DEFAULT_PRIME_BITS,
            oblivious_transfer: true,
        }
    }
}

/// Values given on the command line, taking precedence over all other sources.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    /// `--address`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// `--bit-size`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_size: Option<usize>,
    /// `--prime-bits`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prime_bits: Option<u32>,
    /// `Some(false)` if `--disable-ot` is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oblivious_transfer: Option<bool>,
}

impl Config {
    /// All configuration sources except the command line, in increasing order of precedence.
    pub fn figment(file: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("YAO_"))
    }

    /// Extracts the configuration, applying the command line {overrides} last.
    pub fn load(file: impl AsRef<Path>, overrides: &Overrides) -> Result<Config, figment::Error> {
        Self::figment(file)
            .merge(Serialized::defaults(overrides))
            .extract()
    }

    /// The options of the garbler, as announced to the evaluator.
    pub fn garbler_options(&self) -> GarblerOptions {
        GarblerOptions {
            prime_bits: self.prime_bits,
            oblivious_transfer: self.oblivious_transfer,
        }
    }
}
