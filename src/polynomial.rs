//! The proof subsystem is deliberately small, yet every step of it is spelled out.
//! Each module owns one concept of the confidential transfer: field arithmetic,
//! polynomials, commitments, transcripts and the proof that ties them together.
//!
//! Fixed-degree univariate polynomials.
//!
//! A [`Polynomial`] stores its `N` coefficients `[c₀, …, c_{N-1}]` inline, so
//! the degree is part of the type and no heap allocation is involved.  The
//! transfer proof uses the cubic instance [`CubicPolynomial`].

use ark_ff::{PrimeField, Zero};
use rand_core::{CryptoRng, RngCore};

use crate::{Field, ProofError};

/// Number of coefficients of the polynomial sampled by the transfer proof.
pub const CUBIC_COEFFICIENTS: usize = 4;

/// Represents `c₀ + c₁·x + ⋯ + c_{N-1}·x^{N-1}` over the field `F`.
///
/// Coefficients are stored in ascending order of degree.  The polynomial is
/// immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polynomial<F: PrimeField, const N: usize> {
    coefficients: [F; N],
}

/// A polynomial of degree three, the shape sampled per transfer proof.
pub type CubicPolynomial<F> = Polynomial<F, CUBIC_COEFFICIENTS>;

impl<F: PrimeField, const N: usize> Polynomial<F, N> {
    /// Builds a polynomial from exactly `N` coefficients.
    ///
    /// Any other count fails with [`ProofError::DegreeMismatch`].
    pub fn from_coefficients(coefficients: &[F]) -> Result<Self, ProofError> {
        let coefficients: [F; N] =
            coefficients
                .try_into()
                .map_err(|_| ProofError::DegreeMismatch {
                    expected: N,
                    actual: coefficients.len(),
                })?;
        Ok(Self { coefficients })
    }

    /// Draws `N` independent uniform coefficients from `rng`.
    pub fn sample<R: RngCore + CryptoRng>(
        field: &Field<F>,
        rng: &mut R,
    ) -> Result<Self, ProofError> {
        let mut coefficients = [F::zero(); N];
        for coef in coefficients.iter_mut() {
            *coef = field.sample(rng)?;
        }
        Ok(Self { coefficients })
    }

    /// Returns the nominal degree `N - 1`.
    pub fn degree(&self) -> usize {
        N.saturating_sub(1)
    }

    /// Returns the coefficients in ascending order of degree.
    pub fn coefficients(&self) -> &[F; N] {
        &self.coefficients
    }

    /// Evaluates the polynomial at `x` with Horner's rule.
    ///
    /// `result = c_{N-1}`, then `result = result·x + c_i` for `i` from `N-2`
    /// down to `0`.
    pub fn evaluate(&self, field: &Field<F>, x: F) -> F {
        self.coefficients
            .iter()
            .rev()
            .fold(F::zero(), |acc, &coef| field.add(field.mul(acc, x), coef))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldElement;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fe(v: u64) -> FieldElement {
        FieldElement::from(v)
    }

    #[test]
    fn test_rejects_wrong_coefficient_count() {
        let err = CubicPolynomial::<FieldElement>::from_coefficients(&[fe(1), fe(2), fe(3)])
            .unwrap_err();
        assert_eq!(
            err,
            ProofError::DegreeMismatch {
                expected: 4,
                actual: 3
            }
        );
        assert!(CubicPolynomial::<FieldElement>::from_coefficients(&[fe(0); 5]).is_err());
    }

    #[test]
    fn test_small_evaluation() {
        let field = Field::new();
        // f(x) = 1 + 2x + 3x² + 4x³
        let poly = CubicPolynomial::from_coefficients(&[fe(1), fe(2), fe(3), fe(4)]).unwrap();
        assert_eq!(poly.degree(), 3);
        // f(2) = 1 + 4 + 12 + 32 = 49
        assert_eq!(poly.evaluate(&field, fe(2)), fe(49));
        assert_eq!(poly.evaluate(&field, fe(0)), fe(1));
    }

    proptest! {
        #[test]
        fn prop_horner_matches_direct_powers(
            c0 in any::<u64>(),
            c1 in any::<u64>(),
            c2 in any::<u64>(),
            c3 in any::<u64>(),
            x in any::<u64>(),
        ) {
            let field = Field::new();
            let coefs = [fe(c0), fe(c1), fe(c2), fe(c3)];
            let poly = CubicPolynomial::from_coefficients(&coefs).unwrap();
            let x = fe(x);
            let direct = coefs
                .iter()
                .enumerate()
                .fold(fe(0), |acc, (i, &c)| field.add(acc, field.mul(c, field.pow(x, i as u64))));
            prop_assert_eq!(poly.evaluate(&field, x), direct);
        }

        #[test]
        fn prop_horner_matches_direct_powers_for_sampled_polynomials(seed in any::<u64>()) {
            let field = Field::<FieldElement>::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let poly = CubicPolynomial::sample(&field, &mut rng).unwrap();
            let x = field.sample(&mut rng).unwrap();
            let direct = poly
                .coefficients()
                .iter()
                .enumerate()
                .fold(fe(0), |acc, (i, &c)| field.add(acc, field.mul(c, field.pow(x, i as u64))));
            prop_assert_eq!(poly.evaluate(&field, x), direct);
        }
    }
}
