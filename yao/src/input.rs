//! Parsing of input files and decoding of outputs.
use std::path::Path;

use crate::Error;

/// A single input value, together with its fixed-width binary representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    value: u64,
    bits: Vec<bool>,
}

impl InputRow {
    /// Converts {value} into {bit_size} bits, most significant bit first.
    ///
    /// Fails unless `0 <= value < 2^bit_size`; `bit_size` must be in `1..=63`.
    pub fn new(value: i128, bit_size: usize) -> Result<Self, Error> {
        if !(1..=63).contains(&bit_size) {
            return Err(Error::InvalidInput(format!(
                "a bit size of {bit_size} is not supported"
            )));
        }
        if value < 0 || value >= 1 << bit_size {
            return Err(Error::InputOutOfRange { value, bit_size });
        }
        let value = value as u64;
        let bits = (0..bit_size)
            .rev()
            .map(|i| (value >> i) & 1 == 1)
            .collect();
        Ok(Self { value, bits })
    }

    /// The integer value.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// The bits of the value, most significant first.
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }
}

/// Parses whitespace separated decimal integers into input rows of {bit_size} bits.
pub fn parse_inputs(text: &str, bit_size: usize) -> Result<Vec<InputRow>, Error> {
    let rows = text
        .split_whitespace()
        .map(|token| {
            let value: i128 = token
                .parse()
                .map_err(|_| Error::InvalidInput(format!("'{token}' is not an integer")))?;
            InputRow::new(value, bit_size)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Err(Error::EmptyInput);
    }
    Ok(rows)
}

/// Reads and parses an input file, see [`parse_inputs`].
pub fn read_inputs(path: impl AsRef<Path>, bit_size: usize) -> Result<Vec<InputRow>, Error> {
    let text = std::fs::read_to_string(path)?;
    parse_inputs(&text, bit_size)
}

/// Decodes output bits into an integer, the first bit being the least significant one.
///
/// Fails for more than 64 bits.
pub fn decode_output(bits: &[bool]) -> Result<u64, Error> {
    if bits.len() > u64::BITS as usize {
        return Err(Error::InvalidOutput(format!(
            "{} bits do not fit into a 64-bit integer",
            bits.len()
        )));
    }
    Ok(bits
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &bit)| acc | ((bit as u64) << i)))
}
