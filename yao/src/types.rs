//! Common type definitions.

use std::fmt;

use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of bytes of a wire label.
pub(crate) const LABEL_LEN: usize = 16;

/// Number of bytes of a garbled table row: label, permutation-adjusted bit and a zero tag.
pub(crate) const ROW_LEN: usize = 32;

/// Number of bytes of a [`WireInput`] once serialized for the oblivious transfer.
pub(crate) const WIRE_INPUT_LEN: usize = LABEL_LEN + 1;

/// A random secret label identifying one of the two possible values of a wire.
///
/// Serialized as a hex string for human-readable formats (the JSON log) and as a plain `u128`
/// otherwise.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireLabel(pub(crate) u128);

impl WireLabel {
    pub(crate) fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(rng.gen())
    }

    pub(crate) fn to_bytes(self) -> [u8; LABEL_LEN] {
        self.0.to_le_bytes()
    }
}

impl fmt::Debug for WireLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WireLabel({:032x})", self.0)
    }
}

impl Serialize for WireLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(self.to_bytes()))
        } else {
            serializer.serialize_u128(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for WireLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let bytes: [u8; LABEL_LEN] = hex_bytes::deserialize(deserializer)?;
            Ok(Self(u128::from_le_bytes(bytes)))
        } else {
            u128::deserialize(deserializer).map(Self)
        }
    }
}

/// The two labels and the permutation bit of a wire, known only to the garbler.
#[derive(Debug, Clone)]
pub(crate) struct WireKeyPair {
    pub(crate) label_0: WireLabel,
    pub(crate) label_1: WireLabel,
    /// Decides which garbled table row a logical bit selects.
    pub(crate) permutation: bool,
}

impl WireKeyPair {
    pub(crate) fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            label_0: WireLabel::random(rng),
            label_1: WireLabel::random(rng),
            permutation: rng.gen(),
        }
    }

    /// Returns the label matching the given logical {bit}.
    #[inline]
    pub(crate) fn label(&self, bit: bool) -> WireLabel {
        if bit {
            self.label_1
        } else {
            self.label_0
        }
    }

    /// Encodes a logical bit as the label and the permutation-adjusted bit of this wire.
    #[inline]
    pub(crate) fn encode(&self, bit: bool) -> WireInput {
        WireInput {
            label: self.label(bit),
            bit: self.permutation ^ bit,
        }
    }
}

/// The active label of a wire together with its permutation-adjusted bit.
///
/// This is all the evaluator ever learns about a wire; the bit is the logical value of the wire
/// XORed with a secret permutation bit and selects the garbled table row to decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireInput {
    pub(crate) label: WireLabel,
    pub(crate) bit: bool,
}

impl WireInput {
    /// The permutation-adjusted bit carried with the label.
    pub fn permuted_bit(&self) -> bool {
        self.bit
    }

    pub(crate) fn to_bytes(self) -> [u8; WIRE_INPUT_LEN] {
        let mut bytes = [0u8; WIRE_INPUT_LEN];
        bytes[..LABEL_LEN].copy_from_slice(&self.label.to_bytes());
        bytes[LABEL_LEN] = self.bit as u8;
        bytes
    }

    pub(crate) fn from_bytes(bytes: &[u8; WIRE_INPUT_LEN]) -> Self {
        let mut label = [0u8; LABEL_LEN];
        label.copy_from_slice(&bytes[..LABEL_LEN]);
        Self {
            label: WireLabel(u128::from_le_bytes(label)),
            bit: bytes[LABEL_LEN] & 1 == 1,
        }
    }
}

/// A single encrypted row of a garbled table.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbledRow(#[serde(with = "hex_bytes")] pub(crate) [u8; ROW_LEN]);

impl fmt::Debug for GarbledRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GarbledRow({})", hex::encode(self.0))
    }
}

/// Serde helpers for fixed size byte arrays, hex encoded in human-readable formats.
pub(crate) mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            hex::decode(s).map_err(de::Error::custom)?
        } else {
            Vec::<u8>::deserialize(deserializer)?
        };
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| de::Error::invalid_length(len, &"a fixed number of bytes"))
    }
}
