//! Append-only JSON log of all messages and intermediate results of a party.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{msg::Msg, Error, WireId};

/// Whether a logged message was sent or received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Sent to the other party.
    Send,
    /// Received from the other party.
    Receive,
}

/// A single entry of the [`MessageLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogRecord {
    /// A message exchanged with the other party.
    Communication {
        /// Sent or received.
        direction: Direction,
        /// The message, with labels and table rows hex encoded.
        data: serde_json::Value,
    },
    /// The decoded output of a single round.
    IntermediateResult {
        /// The output wires, their bits and the decoded value.
        data: serde_json::Value,
    },
}

/// The records of a party, in the order in which they happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageLog {
    records: Vec<LogRecord>,
}

impl MessageLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message sent to the other party.
    pub fn record_sent(&mut self, msg: &Msg) {
        self.record_communication(Direction::Send, msg)
    }

    /// Appends a message received from the other party.
    pub fn record_received(&mut self, msg: &Msg) {
        self.record_communication(Direction::Receive, msg)
    }

    fn record_communication(&mut self, direction: Direction, msg: &Msg) {
        let data = serde_json::to_value(msg)
            .unwrap_or_else(|e| serde_json::Value::String(format!("<{}: {e}>", msg.name())));
        self.records.push(LogRecord::Communication { direction, data });
    }

    /// Appends the decoded output of a round.
    pub fn record_result(&mut self, wires: &[WireId], bits: &[bool], value: u64) {
        let outputs: serde_json::Map<String, serde_json::Value> = wires
            .iter()
            .zip(bits)
            .map(|(w, b)| (w.to_string(), serde_json::Value::from(*b as u8)))
            .collect();
        let data = serde_json::json!({ "outputs": outputs, "value": value });
        self.records.push(LogRecord::IntermediateResult { data });
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// The log as a pretty-printed JSON array.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(&self.records).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Writes the log as a JSON array to {path}, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
