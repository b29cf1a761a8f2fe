//! Low-level ECDSA primitive (spec.md §6).
//!
//! # Hazmat
//!
//! These are easy-to-misuse low-level primitives meant to be driven by the
//! rest of this crate's analyses (fault/power-analysis experiments, mostly),
//! not by an application wanting a signature scheme.
//!
//! Grounded on `elliptic-curve-crate/src/weierstrass/ecdsa.rs`'s
//! `SignPrimitive`/`VerifyPrimitive`/`RecoverPrimitive` traits, generalized
//! from `Self: Curve` implementors with fixed-size `GenericArray` scalars to
//! `impl ... for DomainParameters` with runtime `BigUint` scalars, since the
//! curve is chosen at runtime rather than fixed by a const-generic type.
//! `masking_scalar` is the same additive-blinding idea as
//! `ec_mult::countermeasures::GroupScalarRandomization`: `k' = k + mask * n`
//! leaves `[k']G == [k]G` but randomizes the multiplier's trace, so signing
//! uses it for the scalar multiplication only and the true `k` for the
//! modular-arithmetic half of the signature.

use num_bigint::BigUint;
use num_traits::Zero;

use ec_core::curve::DomainParameters;
use modfield::Mod;

use crate::error::{Error, Result};
use crate::keygen::PublicKey;
use crate::rpa::{affine_point, short_weierstrass_ab};

/// An ECDSA signature: the pair `(r, s)`, both already reduced mod the
/// curve's order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// `x`-coordinate of the ephemeral point `[k]G`, reduced mod the order.
    pub r: BigUint,
    /// `s = k^-1 * (e + r * secret) mod n`.
    pub s: BigUint,
}

fn scalar_mod(value: &BigUint, n: &BigUint) -> Mod {
    Mod::new(value % n, n.clone())
}

/// Leftmost `bit_length(n)` bits of the hash, reduced mod `n` (FIPS 186-4
/// §6.4's bits2int, minus the edge case of a hash longer than `n`'s bit
/// length being truncated rather than shifted).
fn hash_to_scalar(hashed_msg: &[u8], n: &BigUint) -> BigUint {
    let byte_len = (n.bits() as usize).div_ceil(8);
    let truncated = if hashed_msg.len() > byte_len {
        &hashed_msg[..byte_len]
    } else {
        hashed_msg
    };
    BigUint::from_bytes_be(truncated) % n
}

/// Sign a prehashed message.
pub trait SignPrimitive {
    /// Sign `hashed_msg` with `secret_scalar`, using the caller-supplied
    /// (MUST be uniformly random, MUST NOT be reused) `ephemeral_scalar` as
    /// the ECDSA nonce `k`. `masking_scalar`, if given, additively blinds
    /// the nonce used for the curve scalar multiplication only.
    fn try_sign_prehashed(
        &self,
        secret_scalar: &BigUint,
        ephemeral_scalar: &BigUint,
        masking_scalar: Option<&BigUint>,
        hashed_msg: &[u8],
    ) -> Result<Signature>;
}

/// Verify a prehashed message against a signature.
pub trait VerifyPrimitive {
    /// Verify `signature` over `hashed_msg` against `public_key`.
    fn verify_prehashed(
        &self,
        public_key: &PublicKey,
        hashed_msg: &[u8],
        signature: &Signature,
    ) -> Result<()>;
}

/// Public key recovery from a signature.
pub trait RecoverPrimitive {
    /// Recover the public key a signature over `hashed_msg` would verify
    /// against, given which of the two `x`-coordinate candidates the
    /// ephemeral point used (`r_reduced`: did `x([k]G)` overflow the order,
    /// so the true `x` is `r + n`?) and its `y`-coordinate's parity.
    fn recover_pubkey(
        &self,
        hashed_msg: &[u8],
        signature: &Signature,
        r_reduced: bool,
        y_is_odd: bool,
    ) -> Result<PublicKey>;
}

impl SignPrimitive for DomainParameters {
    fn try_sign_prehashed(
        &self,
        secret_scalar: &BigUint,
        ephemeral_scalar: &BigUint,
        masking_scalar: Option<&BigUint>,
        hashed_msg: &[u8],
    ) -> Result<Signature> {
        let n = &self.order;
        let blinded_k = match masking_scalar {
            Some(mask) => ephemeral_scalar + mask * n,
            None => ephemeral_scalar.clone(),
        };
        let point = self.curve.multiply(&self.generator, &blinded_k)?;
        let x = point.coord("x").ok_or(Error::InvalidSignature)?;
        let r = x.value()?.clone() % n;
        if r.is_zero() {
            return Err(Error::InvalidSignature);
        }

        let k_inv = scalar_mod(ephemeral_scalar, n).inverse()?;
        let e = scalar_mod(&hash_to_scalar(hashed_msg, n), n);
        let secret = scalar_mod(secret_scalar, n);
        let r_mod = scalar_mod(&r, n);
        let s = k_inv.mul(&e.add(&r_mod.mul(&secret)?)?)?;
        let s_value = s.value()?.clone();
        if s_value.is_zero() {
            return Err(Error::InvalidSignature);
        }
        Ok(Signature { r, s: s_value })
    }
}

impl VerifyPrimitive for DomainParameters {
    fn verify_prehashed(
        &self,
        public_key: &PublicKey,
        hashed_msg: &[u8],
        signature: &Signature,
    ) -> Result<()> {
        let n = &self.order;
        if signature.r.is_zero() || &signature.r >= n || signature.s.is_zero() || &signature.s >= n {
            return Err(Error::InvalidSignature);
        }
        let s_inv = scalar_mod(&signature.s, n).inverse()?;
        let e = scalar_mod(&hash_to_scalar(hashed_msg, n), n);
        let r_mod = scalar_mod(&signature.r, n);
        let u1 = s_inv.mul(&e)?.value()?.clone();
        let u2 = s_inv.mul(&r_mod)?.value()?.clone();

        let p1 = self.curve.multiply(&self.generator, &u1)?;
        let p2 = self.curve.multiply(public_key.as_point(), &u2)?;
        let sum = self.curve.add(&p1, &p2)?;
        if sum.is_infinity() {
            return Err(Error::InvalidSignature);
        }
        let x = sum.coord("x").ok_or(Error::InvalidSignature)?;
        let v = x.value()?.clone() % n;
        if v == signature.r {
            Ok(())
        } else {
            Err(Error::InvalidSignature)
        }
    }
}

impl RecoverPrimitive for DomainParameters {
    fn recover_pubkey(
        &self,
        hashed_msg: &[u8],
        signature: &Signature,
        r_reduced: bool,
        y_is_odd: bool,
    ) -> Result<PublicKey> {
        let n = &self.order;
        let (a, b) = short_weierstrass_ab(self)?;
        let p = self.curve.p.clone();

        let mut x_value = signature.r.clone();
        if r_reduced {
            x_value += n;
        }
        let x = Mod::new(x_value, p);
        let rhs = x.pow_i64(3)?.add(&a.mul(&x)?)?.add(&b)?;
        let candidate = rhs.sqrt().map_err(|_| Error::InvalidSignature)?;
        let candidate_value = candidate.value()?.clone();
        let y = if candidate_value.bit(0) == y_is_odd {
            candidate
        } else {
            candidate.neg()?
        };
        let r_point = affine_point(self, x, y)?;

        let r_inv = scalar_mod(&signature.r, n).inverse()?;
        let e = scalar_mod(&hash_to_scalar(hashed_msg, n), n);
        let s_mod = scalar_mod(&signature.s, n);
        let u1 = r_inv.mul(&e)?.neg()?.value()?.clone();
        let u2 = r_inv.mul(&s_mod)?.value()?.clone();

        let p1 = self.curve.multiply(&self.generator, &u1)?;
        let p2 = self.curve.multiply(&r_point, &u2)?;
        let point = self.curve.add(&p1, &p2)?;
        Ok(PublicKey::from_point(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::{toy_params, SecretKey};

    #[test]
    fn sign_then_verify_round_trips() {
        let params = toy_params();
        let secret = SecretKey::new(BigUint::from(3u32)).unwrap();
        let public = secret.public_key(&params).unwrap();
        let signature = params
            .try_sign_prehashed(secret.secret_scalar(), &BigUint::from(1u32), None, &[2u8])
            .unwrap();
        assert_eq!(signature.r, BigUint::from(3u32));
        assert_eq!(signature.s, BigUint::from(1u32));
        params.verify_prehashed(&public, &[2u8], &signature).unwrap();
    }

    #[test]
    fn masking_scalar_does_not_change_the_signature() {
        let params = toy_params();
        let secret = BigUint::from(3u32);
        let plain = params
            .try_sign_prehashed(&secret, &BigUint::from(1u32), None, &[2u8])
            .unwrap();
        let blinded = params
            .try_sign_prehashed(&secret, &BigUint::from(1u32), Some(&BigUint::from(1u32)), &[2u8])
            .unwrap();
        assert_eq!(plain, blinded);
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let params = toy_params();
        let secret = SecretKey::new(BigUint::from(3u32)).unwrap();
        let public = secret.public_key(&params).unwrap();
        let mut signature = params
            .try_sign_prehashed(secret.secret_scalar(), &BigUint::from(1u32), None, &[2u8])
            .unwrap();
        signature.s = (&signature.s + BigUint::from(1u32)) % &params.order;
        assert!(params.verify_prehashed(&public, &[2u8], &signature).is_err());
    }

    #[test]
    fn recover_pubkey_reconstructs_the_signer() {
        let params = toy_params();
        let secret = SecretKey::new(BigUint::from(3u32)).unwrap();
        let public = secret.public_key(&params).unwrap();
        // [4]G = (3, 91) on the toy curve: x = 3 is already < the order 5,
        // so r_reduced is false, and y = 91 is odd.
        let signature = params
            .try_sign_prehashed(secret.secret_scalar(), &BigUint::from(4u32), None, &[2u8])
            .unwrap();
        let recovered = params.recover_pubkey(&[2u8], &signature, false, true).unwrap();
        assert!(recovered.as_point().equals(public.as_point()));
    }
}
