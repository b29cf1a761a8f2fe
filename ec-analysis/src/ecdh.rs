//! ECDH shared-secret derivation (spec.md §6).
//!
//! Grounded in shape on
//! `elliptic-curve-crate/src/weierstrass/public_key.rs`'s
//! `PublicKey::from_secret_key` — the same `[scalar] * point` computation,
//! generalized from the teacher's per-curve `Curve::mul_base` to
//! `DomainParameters::curve::multiply` — with the result reduced to its
//! `x`-coordinate alone and encoded per spec.md §6's scalar-encoding rule,
//! the usual ECDH convention (the `y`-coordinate carries no information the
//! peer's own point doesn't already fix up to sign, so it is dropped).

use alloc::vec::Vec;

use ec_core::curve::DomainParameters;
use modfield::ByteOrder;

use crate::error::{Error, Result};
use crate::keygen::{PublicKey, SecretKey};

/// Derive the ECDH shared secret for `secret_key` and `peer_public_key`:
/// `[secret] * peer_public_key`'s `x`-coordinate, big-endian encoded.
/// Errors if the computed point is the curve's neutral element — a
/// low-order or otherwise invalid peer public key, never legitimate ECDH
/// output.
pub fn shared_secret(
    params: &DomainParameters,
    secret_key: &SecretKey,
    peer_public_key: &PublicKey,
) -> Result<Vec<u8>> {
    let shared_point = params
        .curve
        .multiply(peer_public_key.as_point(), secret_key.secret_scalar())?;
    if shared_point.is_infinity() {
        return Err(Error::InvalidSignature);
    }
    let x = shared_point.coord("x").ok_or(Error::InvalidSignature)?;
    Ok(x.to_bytes(ByteOrder::BigEndian)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keygen::toy_params;
    use ec_core::point::Point;
    use num_bigint::BigUint;

    #[test]
    fn both_sides_derive_the_same_shared_secret() {
        let params = toy_params();
        let alice_secret = SecretKey::new(BigUint::from(1u32)).unwrap();
        let bob_secret = SecretKey::new(BigUint::from(4u32)).unwrap();
        let alice_public = alice_secret.public_key(&params).unwrap();
        let bob_public = bob_secret.public_key(&params).unwrap();

        let alice_view = shared_secret(&params, &alice_secret, &bob_public).unwrap();
        let bob_view = shared_secret(&params, &bob_secret, &alice_public).unwrap();
        assert_eq!(alice_view, bob_view);
    }

    #[test]
    fn neutral_result_is_rejected() {
        let params = toy_params();
        let secret = SecretKey::new(BigUint::from(1u32)).unwrap();
        let neutral_peer = PublicKey::from_point(Point::infinity(params.curve.coordinate_model.clone()));
        assert!(shared_secret(&params, &secret, &neutral_peer).is_err());
    }
}
