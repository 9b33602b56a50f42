//! Pads for garbled table rows and OT payloads, based on the [`blake3`] XOF.
use crate::{
    group::GroupElement,
    types::{WireLabel, ROW_LEN, WIRE_INPUT_LEN},
    WireId,
};

/// Hashing for building and opening garbled tables.
pub(crate) mod garbling_hash {
    use super::*;

    /// Computes the pad of a garbled table row.
    ///
    /// Unary gates pass `None` as the second label. The gate and row are part of the input, so no
    /// two rows of a circuit share a pad even if they are built from the same labels.
    pub(crate) fn pad(
        label_x: &WireLabel,
        label_y: Option<&WireLabel>,
        gate: WireId,
        row: u8,
    ) -> [u8; ROW_LEN] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&label_x.to_bytes());
        if let Some(label_y) = label_y {
            hasher.update(&label_y.to_bytes());
        }
        hasher.update(&gate.to_le_bytes());
        hasher.update(&[row]);
        let mut output_reader = hasher.finalize_xof();

        let mut pad = [0u8; ROW_LEN];
        output_reader.fill(&mut pad);
        pad
    }

    #[test]
    fn test_pad() {
        let h0 = pad(&WireLabel(0), Some(&WireLabel(1)), 0, 0);
        let h1 = pad(&WireLabel(0), Some(&WireLabel(1)), 0, 1);
        let h2 = pad(&WireLabel(0), None, 0, 0);
        assert_ne!(h0, h1);
        assert_ne!(h0, h2);
    }
}

/// Derives the mask hiding an OT payload from the sender's ephemeral element and the shared
/// Diffie-Hellman secret.
pub(crate) fn ot_mask(
    ephemeral: GroupElement,
    shared: GroupElement,
    index: u8,
) -> [u8; WIRE_INPUT_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&ephemeral.value().to_le_bytes());
    hasher.update(&shared.value().to_le_bytes());
    hasher.update(&[index]);

    let mut mask = [0u8; WIRE_INPUT_LEN];
    hasher.finalize_xof().fill(&mut mask);
    mask
}

#[inline]
pub(crate) fn xor_bytes<const N: usize>(lhs: &[u8; N], rhs: &[u8; N]) -> [u8; N] {
    let mut result = [0u8; N];
    for idx in 0..N {
        result[idx] = lhs[idx] ^ rhs[idx];
    }
    result
}

#[test]
fn reference_masks() {
    let a = GroupElement(3);
    let b = GroupElement(5);
    assert_eq!(ot_mask(a, b, 0), ot_mask(a, b, 0));
    assert_ne!(ot_mask(a, b, 0), ot_mask(a, b, 1));
    assert_ne!(ot_mask(a, b, 0), ot_mask(b, a, 0));

    let mut expected = [0u8; WIRE_INPUT_LEN];
    let mut hasher = blake3::Hasher::new();
    hasher.update(&3u64.to_le_bytes());
    hasher.update(&5u64.to_le_bytes());
    hasher.update(&[0]);
    expected.copy_from_slice(&hasher.finalize().as_bytes()[..WIRE_INPUT_LEN]);
    assert_eq!(ot_mask(a, b, 0), expected);
}

#[test]
fn test_xor_bytes() {
    let x = [0b1010u8; 4];
    let y = [0b0110u8; 4];
    assert_eq!(xor_bytes(&x, &y), [0b1100u8; 4]);
    assert_eq!(xor_bytes(&xor_bytes(&x, &y), &y), x);
}
