//! 1-out-of-2 base OT based on the Diffie-Hellman problem in a [`PrimeGroup`].
//!
//! Follows the protocol from N. Smart's "Cryptography Made Simple":
//!
//!   1. the [`Sender`] publishes a random element `C` whose discrete log the receiver does not know
//!   2. the [`Receiver`] with choice bit `b` publishes `PK_b = g^k` and `PK_(1-b) = C / PK_b`
//!   3. the sender encrypts `m_i` under `H(g^(r_i), PK_i^(r_i))` for fresh `r_i`
//!   4. the receiver can only compute `PK_b^(r_b) = (g^(r_b))^k` and thus only decrypt `m_b`
use rand::{CryptoRng, RngCore};

use crate::{
    group::{GroupElement, PrimeGroup},
    hash::{ot_mask, xor_bytes},
    types::WIRE_INPUT_LEN,
    Error,
};

/// The type of message exchanged via the base OT protocol.
pub(crate) type OtMessage = [u8; WIRE_INPUT_LEN];

/// The party sending data to a [`Receiver`].
///
/// I.e. the logical actor offering 2 pieces of data of which the [`Receiver`] will be able to
/// recover only 1. A sender is consumed by [`Sender::send`] and never reused.
pub(crate) struct Sender<'g> {
    group: &'g PrimeGroup,
    c: GroupElement,
    messages: [OtMessage; 2],
}

/// The party choosing 1-out-of-2 pieces of data w/o the [`Sender`] knowing which it was.
pub(crate) struct Receiver<'g> {
    group: &'g PrimeGroup,
    private_key: u64,
    choice: bool,
}

/// The kind of messages exchanged between a [`Sender`] and a [`Receiver`].
pub mod message {
    use serde::{Deserialize, Serialize};

    use crate::{
        group::{GroupElement, GroupParameters},
        types::hex_bytes,
    };

    use super::OtMessage;

    /// Sent by the sender to start a transfer: the session's group and the element `C`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OtSetup {
        pub(crate) group: GroupParameters,
        pub(crate) c: GroupElement,
    }

    /// The receiver's pair of public keys `(PK_0, PK_1)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OtChoice {
        pub(crate) public_keys: [GroupElement; 2],
    }

    /// One ephemeral element and one masked payload per choice.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OtTransfer {
        pub(crate) ciphertexts: [OtCiphertext; 2],
    }

    /// The element `g^(r_i)` and the payload `m_i` XOR its mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct OtCiphertext {
        pub(crate) ephemeral: GroupElement,
        #[serde(with = "hex_bytes")]
        pub(crate) payload: OtMessage,
    }
}

use message::{OtChoice, OtCiphertext, OtSetup, OtTransfer};

impl<'g> Sender<'g> {
    /// Creates a new sender for the two messages, choosing a fresh `C`.
    pub(crate) fn new<R: RngCore + CryptoRng>(
        group: &'g PrimeGroup,
        messages: [OtMessage; 2],
        rng: &mut R,
    ) -> Self {
        let c = group.generator_power(group.random_exponent(rng));
        Self {
            group,
            c,
            messages,
        }
    }

    /// Creates an [`OtSetup`] message suitable for exchange with a [`Receiver`].
    pub(crate) fn setup_message(&self) -> OtSetup {
        OtSetup {
            group: self.group.parameters(),
            c: self.c,
        }
    }

    /// The logical "send" part of the protocol, answering the receiver's [`OtChoice`].
    pub(crate) fn send<R: RngCore + CryptoRng>(
        self,
        choice: &OtChoice,
        rng: &mut R,
    ) -> Result<OtTransfer, Error> {
        let [pk_0, pk_1] = choice.public_keys;
        let pk_0 = self.group.element(pk_0.value())?;
        let pk_1 = self.group.element(pk_1.value())?;
        if self.group.multiply(pk_0, pk_1) != self.c {
            return Err(Error::OtKeyMismatch);
        }

        let mut encrypt = |index: u8, public_key: GroupElement| {
            let r = self.group.random_exponent(rng);
            let ephemeral = self.group.generator_power(r);
            let shared = self.group.power(public_key, r);
            let mask = ot_mask(ephemeral, shared, index);
            OtCiphertext {
                ephemeral,
                payload: xor_bytes(&self.messages[index as usize], &mask),
            }
        };
        let ciphertexts = [encrypt(0, pk_0), encrypt(1, pk_1)];
        Ok(OtTransfer { ciphertexts })
    }
}

impl<'g> Receiver<'g> {
    /// Answers an [`OtSetup`] with the public keys for the given choice.
    pub(crate) fn init<R: RngCore + CryptoRng>(
        group: &'g PrimeGroup,
        setup: &OtSetup,
        choice: bool,
        rng: &mut R,
    ) -> Result<(OtChoice, Self), Error> {
        if setup.group != group.parameters() {
            return Err(Error::GroupMismatch);
        }
        let c = group.element(setup.c.value())?;

        let private_key = group.random_exponent(rng);
        let chosen = group.generator_power(private_key);
        let other = group.multiply(c, group.invert(chosen)?);

        let public_keys = if choice {
            [other, chosen]
        } else {
            [chosen, other]
        };
        let receiver = Receiver {
            group,
            private_key,
            choice,
        };
        Ok((OtChoice { public_keys }, receiver))
    }

    /// The logical "receive" part of the protocol, recovering the chosen message.
    pub(crate) fn recv(self, transfer: &OtTransfer) -> Result<OtMessage, Error> {
        let OtCiphertext { ephemeral, payload } = transfer.ciphertexts[self.choice as usize];
        let ephemeral = self.group.element(ephemeral.value())?;
        let shared = self.group.power(ephemeral, self.private_key);
        let mask = ot_mask(ephemeral, shared, self.choice as u8);
        Ok(xor_bytes(&payload, &mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupParameters;
    use rand::{RngCore, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    fn transfer(
        group: &PrimeGroup,
        messages: [OtMessage; 2],
        choice: bool,
        rng: &mut ChaCha20Rng,
    ) -> Result<OtMessage, Error> {
        let sender = Sender::new(group, messages, rng);
        let setup = sender.setup_message();
        let (msg, receiver) = Receiver::init(group, &setup, choice, rng)?;
        let reply = sender.send(&msg, rng)?;
        receiver.recv(&reply)
    }

    #[test]
    fn test_dh_ot() {
        let mut rng = ChaCha20Rng::from_entropy();
        let group = PrimeGroup::generate(64, &mut rng).unwrap();

        for _ in 0..20 {
            for choice in [false, true] {
                let mut messages = [OtMessage::default(); 2];
                rng.fill_bytes(&mut messages[0]);
                rng.fill_bytes(&mut messages[1]);

                let key = transfer(&group, messages, choice, &mut rng).unwrap();

                assert_eq!(key, messages[choice as usize]);
                assert_ne!(key, messages[!choice as usize]);
            }
        }
    }

    #[test]
    fn test_receiver_hiding() {
        // the sender only sees (PK_0, PK_1) with PK_0 * PK_1 = C, so PK_0 determines the view;
        // its distribution has to be uniform over the group for both choices
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let group = PrimeGroup::new(23, &mut rng).unwrap();
        let sender = Sender::new(&group, [[0; WIRE_INPUT_LEN]; 2], &mut rng);
        let setup = sender.setup_message();

        const SAMPLES: usize = 22_000;
        for choice in [false, true] {
            let mut histogram = [0usize; 23];
            for _ in 0..SAMPLES {
                let (msg, _) = Receiver::init(&group, &setup, choice, &mut rng).unwrap();
                histogram[msg.public_keys[0].value() as usize] += 1;
            }
            assert_eq!(histogram[0], 0);
            for count in &histogram[1..] {
                assert!((800..1200).contains(count), "{histogram:?}");
            }
        }
    }

    #[test]
    fn test_group_mismatch() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let group = PrimeGroup::new(23, &mut rng).unwrap();
        let other = PrimeGroup::new(47, &mut rng).unwrap();
        let sender = Sender::new(&other, [[1; WIRE_INPUT_LEN]; 2], &mut rng);
        let result = Receiver::init(&group, &sender.setup_message(), false, &mut rng);
        assert!(matches!(result, Err(Error::GroupMismatch)));
    }

    #[test]
    fn test_invalid_elements() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let group = PrimeGroup::new(23, &mut rng).unwrap();

        let setup = OtSetup {
            group: GroupParameters {
                prime: 23,
                generator: group.generator().value(),
            },
            c: GroupElement(23),
        };
        let result = Receiver::init(&group, &setup, true, &mut rng);
        assert!(matches!(result, Err(Error::InvalidGroupElement(23))));

        let sender = Sender::new(&group, [[1; WIRE_INPUT_LEN]; 2], &mut rng);
        let choice = OtChoice {
            public_keys: [GroupElement(0), GroupElement(1)],
        };
        assert!(matches!(
            sender.send(&choice, &mut rng),
            Err(Error::InvalidGroupElement(0))
        ));
    }

    #[test]
    fn test_inconsistent_keys() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let group = PrimeGroup::new(23, &mut rng).unwrap();
        let sender = Sender::new(&group, [[1; WIRE_INPUT_LEN]; 2], &mut rng);
        let c = sender.setup_message().c;
        let one = GroupElement(1);
        let other = if c == one { GroupElement(2) } else { one };
        // both keys with known discrete logs would reveal both messages
        let choice = OtChoice {
            public_keys: [other, other],
        };
        if group.multiply(other, other) != c {
            assert!(matches!(
                sender.send(&choice, &mut rng),
                Err(Error::OtKeyMismatch)
            ));
        }
    }
}
