//! The proof subsystem is deliberately small, yet every step of it is spelled out.
//! Each module owns one concept of the confidential transfer: field arithmetic,
//! polynomials, commitments, transcripts and the proof that ties them together.
//!
//! Finite field arithmetic.
//!
//! This module provides arithmetic in a prime field.  The [`Field`] type is
//! parameterised by an arkworks [`PrimeField`], which fixes the modulus `p`
//! at the type level, and exposes addition, subtraction, multiplication,
//! exponentiation and uniform sampling.  Every result is a canonical element
//! of `[0, p)`.
//!
//! Arithmetic is delegated to the Montgomery backend of `ark-ff`.  It does not
//! branch on operand values for `add`, `sub` and `mul`, but the crate makes no
//! formal constant-time guarantee.

use ark_ff::{BigInteger, PrimeField};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand_core::{CryptoRng, RngCore};
use std::marker::PhantomData;

use crate::ProofError;

/// Prime field used by the transfer proof (BN254 scalar field, 254 bits).
pub type FieldElement = ark_bn254::Fr;

/// Width in bytes of a canonically encoded [`FieldElement`].
pub const FIELD_ELEMENT_LEN: usize = 32;

/// Bytes drawn from the entropy source per sampled element.
///
/// Twice the element width, so the reduction mod `p` is statistically uniform.
const SAMPLE_WIDTH: usize = 64;

/// A finite field defined by the prime modulus of `F`.
///
/// `Field` carries no runtime state; choosing `F` chooses the modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Field<F: PrimeField> {
    _marker: PhantomData<F>,
}

impl<F: PrimeField> Field<F> {
    /// Creates a handle for the field with modulus `F::MODULUS`.
    pub fn new() -> Self {
        Field {
            _marker: PhantomData,
        }
    }

    /// Returns the big-endian bytes of the modulus.
    pub fn modulus_be_bytes(&self) -> Vec<u8> {
        F::MODULUS.to_bytes_be()
    }

    /// Returns the bit length of the modulus.
    #[inline]
    pub fn modulus_bits(&self) -> u32 {
        F::MODULUS_BIT_SIZE
    }

    /// Adds two field elements.
    #[inline]
    pub fn add(&self, a: F, b: F) -> F {
        a + b
    }

    /// Subtracts `b` from `a`.
    #[inline]
    pub fn sub(&self, a: F, b: F) -> F {
        a - b
    }

    /// Multiplies two field elements.
    #[inline]
    pub fn mul(&self, a: F, b: F) -> F {
        a * b
    }

    /// Exponentiates `a` by `e` modulo `p`.
    #[inline]
    pub fn pow(&self, a: F, e: u64) -> F {
        a.pow([e])
    }

    /// Reduces an arbitrary big-endian integer into the field.
    pub fn reduce_be_bytes(&self, bytes: &[u8]) -> F {
        F::from_be_bytes_mod_order(bytes)
    }

    /// Samples a uniformly random element using a cryptographically secure source.
    ///
    /// Fails with [`ProofError::RandomSource`] when the source reports an error.
    pub fn sample<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<F, ProofError> {
        let mut wide = [0u8; SAMPLE_WIDTH];
        rng.try_fill_bytes(&mut wide)?;
        Ok(F::from_le_bytes_mod_order(&wide))
    }
}

/// Encodes an element as its canonical little-endian bytes.
pub fn element_to_bytes<F: PrimeField>(value: &F) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.compressed_size());
    // Writing into a Vec cannot fail.
    let _ = value.serialize_compressed(&mut out);
    out
}

/// Decodes a canonical element, rejecting values outside `[0, p)`.
pub fn element_from_bytes<F: PrimeField>(bytes: &[u8]) -> Result<F, ProofError> {
    F::deserialize_compressed(bytes).map_err(|err| ProofError::MalformedEncoding(err.to_string()))
}
