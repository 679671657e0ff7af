//! Lightweight Fiat–Shamir transcript utilities.
//!
//! The [`Transcript`] type records labelled byte messages and derives
//! deterministic challenges from them using a domain-separated BLAKE2b
//! expander.  Every message is length-prefixed, so distinct message sequences
//! never hash to the same input.  Each derived challenge is absorbed back
//! into the transcript together with a monotonic counter.

use ark_ff::PrimeField;
use blake2::digest::{consts::U32, Digest};
use blake2::Blake2b512;

use crate::field::element_to_bytes;

type Blake2b256 = blake2::Blake2b<U32>;

const CHALLENGE_DOMAIN: &[u8] = b"ZKTX_CHALLENGE";

/// Stateful helper that derives challenges from a recorded transcript.
#[derive(Debug, Clone)]
pub struct Transcript {
    domain_tag: &'static [u8],
    bytes: Vec<u8>,
    counter: u64,
}

impl Transcript {
    /// Creates an empty transcript associated with the given domain tag.
    pub fn new(domain_tag: &'static [u8]) -> Self {
        Self {
            domain_tag,
            bytes: Vec::new(),
            counter: 0,
        }
    }

    /// Appends a labelled message to the transcript.
    pub fn append_message(&mut self, label: &'static [u8], message: &[u8]) {
        self.mix(label);
        self.mix(message);
    }

    /// Appends the canonical encoding of a field element.
    pub fn append_scalar<F: PrimeField>(&mut self, label: &'static [u8], value: &F) {
        self.append_message(label, &element_to_bytes(value));
    }

    /// Returns an immutable view of the accumulated transcript bytes.
    pub fn snapshot(&self) -> &[u8] {
        &self.bytes
    }

    /// Derives a field element in `[0, p)` from the transcript.
    ///
    /// A 64-byte BLAKE2b output is reduced modulo `p`, which keeps the bias
    /// negligible for moduli up to 256 bits.
    pub fn challenge_scalar<F: PrimeField>(&mut self, label: &'static [u8]) -> F {
        let mut hasher = Blake2b512::new();
        self.absorb_state(&mut hasher, label);
        let challenge = F::from_le_bytes_mod_order(&hasher.finalize());
        self.append_scalar(label, &challenge);
        self.counter = self.counter.wrapping_add(1);
        challenge
    }

    /// Derives a 32-byte digest challenge from the transcript.
    pub fn challenge_bytes(&mut self, label: &'static [u8]) -> [u8; 32] {
        let mut hasher = Blake2b256::new();
        self.absorb_state(&mut hasher, label);
        let mut challenge = [0u8; 32];
        challenge.copy_from_slice(&hasher.finalize());
        self.append_message(label, &challenge);
        self.counter = self.counter.wrapping_add(1);
        challenge
    }

    fn absorb_state<D: Digest>(&self, hasher: &mut D, label: &[u8]) {
        hasher.update(CHALLENGE_DOMAIN);
        hasher.update((self.domain_tag.len() as u64).to_be_bytes());
        hasher.update(self.domain_tag);
        hasher.update((self.bytes.len() as u64).to_be_bytes());
        hasher.update(&self.bytes);
        hasher.update(self.counter.to_be_bytes());
        hasher.update((label.len() as u64).to_be_bytes());
        hasher.update(label);
    }

    fn mix(&mut self, bytes: &[u8]) {
        self.bytes
            .extend_from_slice(&(bytes.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldElement;

    #[test]
    fn test_challenges_are_replayable() {
        let mut a = Transcript::new(b"test");
        let mut b = Transcript::new(b"test");
        a.append_message(b"m", b"hello");
        b.append_message(b"m", b"hello");
        let xa: FieldElement = a.challenge_scalar(b"x");
        let xb: FieldElement = b.challenge_scalar(b"x");
        assert_eq!(xa, xb);
        assert_eq!(a.challenge_bytes(b"c"), b.challenge_bytes(b"c"));
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_message_boundaries_are_separated() {
        let mut a = Transcript::new(b"test");
        let mut b = Transcript::new(b"test");
        a.append_message(b"m", b"ab");
        a.append_message(b"m", b"c");
        b.append_message(b"m", b"a");
        b.append_message(b"m", b"bc");
        assert_ne!(a.challenge_bytes(b"c"), b.challenge_bytes(b"c"));
    }

    #[test]
    fn test_domain_tag_separates_challenges() {
        let mut a = Transcript::new(b"one");
        let mut b = Transcript::new(b"two");
        assert_ne!(a.challenge_bytes(b"c"), b.challenge_bytes(b"c"));
    }

    #[test]
    fn test_successive_challenges_differ() {
        let mut t = Transcript::new(b"test");
        let first = t.challenge_bytes(b"c");
        let second = t.challenge_bytes(b"c");
        assert_ne!(first, second);
    }
}
