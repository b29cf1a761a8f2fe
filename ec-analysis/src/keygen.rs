//! Keypair generation (spec.md §6): a uniformly random scalar secret key
//! and its corresponding public point.
//!
//! Grounded on `elliptic-curve-crate/src/weierstrass/secret_key.rs`'s
//! `SecretKey::generate`/`secret_scalar`/zeroizing `Drop` and
//! `elliptic-curve-crate/src/weierstrass/public_key.rs`'s
//! `PublicKey::from_secret_key`, generalized from per-curve
//! `GenericArray<u8, ScalarSize>` scalars to `DomainParameters`-scoped
//! `BigUint` scalars and `ec_core::point::Point<Mod>` public points, since
//! the curve is chosen at runtime rather than fixed at compile time.
//! Point encoding follows spec.md §6 exactly: each coordinate in model
//! order as `ceil(bit_length(p)/8)` big-endian bytes, infinity as a single
//! `0x00` byte.

use alloc::vec::Vec;
use num_bigint::BigUint;
use num_traits::Zero;
use rand_core::{CryptoRng, RngCore};
use rustc_hash::FxHashMap;
use zeroize::Zeroize;

use ec_core::curve::DomainParameters;
use ec_core::point::Point;
use modfield::{ByteOrder, Mod};

use crate::error::{Error, Result};

/// Encode a point as spec.md §6 describes: one `ceil(bit_length(p)/8)`-byte
/// big-endian chunk per coordinate in coordinate-model order, concatenated;
/// the infinity sentinel as a single `0x00` byte.
pub(crate) fn encode_point(params: &DomainParameters, point: &Point<Mod>) -> Result<Vec<u8>> {
    if point.is_infinity() {
        return Ok(alloc::vec![0u8]);
    }
    let mut out = Vec::new();
    for name in &params.curve.coordinate_model.variables {
        let value = point.coord(name).ok_or(ec_core::Error::InputMismatch)?;
        out.extend(value.to_bytes(ByteOrder::BigEndian)?);
    }
    Ok(out)
}

/// Inverse of [`encode_point`].
pub(crate) fn decode_point(params: &DomainParameters, bytes: &[u8]) -> Result<Point<Mod>> {
    if bytes == [0u8] {
        return Ok(Point::infinity(params.curve.coordinate_model.clone()));
    }
    let coordinate_size = (params.curve.p.bits() as usize).div_ceil(8).max(1);
    let variables = &params.curve.coordinate_model.variables;
    if bytes.len() != coordinate_size * variables.len() {
        return Err(Error::from(ec_core::Error::InputMismatch));
    }
    let mut coords = FxHashMap::default();
    for (i, name) in variables.iter().enumerate() {
        let chunk = &bytes[i * coordinate_size..(i + 1) * coordinate_size];
        coords.insert(
            name.clone(),
            Mod::from_bytes(chunk, params.curve.p.clone(), ByteOrder::BigEndian),
        );
    }
    Ok(Point::new(params.curve.coordinate_model.clone(), coords)?)
}

/// Draw a uniformly random scalar in `[1, order)`.
fn random_scalar(order: &BigUint, mut rng: impl CryptoRng + RngCore) -> BigUint {
    loop {
        let candidate = Mod::random(order.clone(), &mut rng);
        let Ok(value) = candidate.value() else { continue };
        if !value.is_zero() {
            return value.clone();
        }
    }
}

/// A secret scalar, zeroized on drop. Not `Copy`/`Clone` so a secret key
/// can't accidentally be duplicated.
#[derive(Debug)]
pub struct SecretKey {
    scalar: BigUint,
}

impl SecretKey {
    /// Wrap an already-reduced scalar as a secret key. Rejects `0`, which
    /// is never a valid private key.
    pub fn new(scalar: BigUint) -> Result<Self> {
        if scalar.is_zero() {
            return Err(Error::InvalidSignature);
        }
        Ok(SecretKey { scalar })
    }

    /// Generate a fresh secret key uniformly at random in `[1, order)`.
    pub fn generate(params: &DomainParameters, rng: impl CryptoRng + RngCore) -> Self {
        SecretKey {
            scalar: random_scalar(&params.order, rng),
        }
    }

    /// Decode a big-endian scalar encoding (spec.md §6).
    pub fn from_bytes(bytes: &[u8], order: &BigUint) -> Result<Self> {
        let candidate = BigUint::from_bytes_be(bytes);
        Self::new(candidate % order)
    }

    /// Encode the secret scalar as `ceil(bit_length(n)/8)` big-endian bytes.
    pub fn to_bytes(&self, order: &BigUint) -> Vec<u8> {
        let size = (order.bits() as usize).div_ceil(8).max(1);
        let mut be = self.scalar.to_bytes_be();
        if be.len() < size {
            let mut padded = alloc::vec![0u8; size - be.len()];
            padded.extend_from_slice(&be);
            be = padded;
        }
        be
    }

    /// The wrapped scalar.
    pub fn secret_scalar(&self) -> &BigUint {
        &self.scalar
    }

    /// The public point `[scalar] * generator`.
    pub fn public_key(&self, params: &DomainParameters) -> Result<PublicKey> {
        PublicKey::from_secret_key(params, self)
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        // `BigUint` has no in-place zeroizing clear; overwrite its backing
        // limbs before the allocation is freed.
        let bits = self.scalar.bits().max(1) as usize;
        let mut bytes = alloc::vec![0u8; bits.div_ceil(8)];
        bytes.zeroize();
        self.scalar = BigUint::from_bytes_be(&bytes);
    }
}

/// A public point, computed from a [`SecretKey`] or decoded from bytes.
#[derive(Clone, Debug)]
pub struct PublicKey {
    point: Point<Mod>,
}

impl PublicKey {
    /// Compute the public key for `secret_key`: `[scalar] * generator`.
    pub fn from_secret_key(params: &DomainParameters, secret_key: &SecretKey) -> Result<Self> {
        let point = params.curve.multiply(&params.generator, &secret_key.scalar)?;
        Ok(PublicKey { point })
    }

    /// Decode a public key from its spec.md §6 point encoding.
    pub fn from_bytes(params: &DomainParameters, bytes: &[u8]) -> Result<Self> {
        Ok(PublicKey {
            point: decode_point(params, bytes)?,
        })
    }

    /// Encode this public key per spec.md §6.
    pub fn to_bytes(&self, params: &DomainParameters) -> Result<Vec<u8>> {
        encode_point(params, &self.point)
    }

    /// The underlying curve point.
    pub fn as_point(&self) -> &Point<Mod> {
        &self.point
    }

    /// Wrap an already-computed point (e.g. ECDSA public key recovery).
    pub(crate) fn from_point(point: Point<Mod>) -> Self {
        PublicKey { point }
    }
}

/// Generate a fresh keypair: a uniformly random secret scalar and its
/// public point.
pub fn generate_keypair(
    params: &DomainParameters,
    rng: impl CryptoRng + RngCore,
) -> Result<(SecretKey, PublicKey)> {
    let secret = SecretKey::generate(params, rng);
    let public = secret.public_key(params)?;
    Ok((secret, public))
}

// y^2 = x^3 + 2x + 3 over GF(97), generator (3, 6), order 5: the same toy
// curve `ec_core::curve`'s own tests use, full affine add/double/negate
// code included so `EllipticCurve::multiply` actually runs. Shared across
// `ec-analysis`'s test modules (`ecdh`, `ecdsa`) rather than duplicated.
#[cfg(test)]
pub(crate) fn toy_params() -> DomainParameters {
    use ec_core::model::{Assumption, CoordinateModel, CurveModel};
    use ec_core::op::{CodeOp, OpKind, Operand};
    use modfield::symbolic::Expr;

    let p = BigUint::from(97u32);
    let equation = Assumption::new(
        Expr::Pow(alloc::boxed::Box::new(Expr::Var("y".into())), 2),
        Expr::Add(
            alloc::boxed::Box::new(Expr::Add(
                alloc::boxed::Box::new(Expr::Pow(alloc::boxed::Box::new(Expr::Var("x".into())), 3)),
                alloc::boxed::Box::new(Expr::Mul(
                    alloc::boxed::Box::new(Expr::Var("a".into())),
                    alloc::boxed::Box::new(Expr::Var("x".into())),
                )),
            )),
            alloc::boxed::Box::new(Expr::Var("b".into())),
        ),
    );
    let base_addition = alloc::vec![
        CodeOp::binary("t0", OpKind::Sub, Operand::Var("y2".into()), Operand::Var("y1".into())),
        CodeOp::binary("t1", OpKind::Sub, Operand::Var("x2".into()), Operand::Var("x1".into())),
        CodeOp::binary("lambda", OpKind::Div, Operand::Var("t0".into()), Operand::Var("t1".into())),
        CodeOp::unary("t2", OpKind::Sqr, Operand::Var("lambda".into())),
        CodeOp::binary("t3", OpKind::Sub, Operand::Var("t2".into()), Operand::Var("x1".into())),
        CodeOp::binary("x3", OpKind::Sub, Operand::Var("t3".into()), Operand::Var("x2".into())),
        CodeOp::binary("t4", OpKind::Sub, Operand::Var("x1".into()), Operand::Var("x3".into())),
        CodeOp::binary("t5", OpKind::Mult, Operand::Var("lambda".into()), Operand::Var("t4".into())),
        CodeOp::binary("y3", OpKind::Sub, Operand::Var("t5".into()), Operand::Var("y1".into())),
    ];
    let base_doubling = alloc::vec![
        CodeOp::unary("t0", OpKind::Sqr, Operand::Var("x1".into())),
        CodeOp::binary("t1", OpKind::Mult, Operand::Var("t0".into()), Operand::Literal(3)),
        CodeOp::binary("t2", OpKind::Add, Operand::Var("t1".into()), Operand::Var("a".into())),
        CodeOp::binary("t3", OpKind::Mult, Operand::Var("y1".into()), Operand::Literal(2)),
        CodeOp::binary("lambda", OpKind::Div, Operand::Var("t2".into()), Operand::Var("t3".into())),
        CodeOp::unary("t4", OpKind::Sqr, Operand::Var("lambda".into())),
        CodeOp::binary("t5", OpKind::Mult, Operand::Var("x1".into()), Operand::Literal(2)),
        CodeOp::binary("x3", OpKind::Sub, Operand::Var("t4".into()), Operand::Var("t5".into())),
        CodeOp::binary("t6", OpKind::Sub, Operand::Var("x1".into()), Operand::Var("x3".into())),
        CodeOp::binary("t7", OpKind::Mult, Operand::Var("lambda".into()), Operand::Var("t6".into())),
        CodeOp::binary("y3", OpKind::Sub, Operand::Var("t7".into()), Operand::Var("y1".into())),
    ];
    let base_negation = alloc::vec![
        CodeOp::unary("x3", OpKind::Id, Operand::Var("x1".into())),
        CodeOp::unary("y3", OpKind::Neg, Operand::Var("y1".into())),
    ];
    let curve_model = CurveModel::new(
        "shortw",
        alloc::vec!["a".into(), "b".into()],
        alloc::vec!["x".into(), "y".into()],
        equation,
        base_addition,
        base_doubling,
        base_negation,
        Vec::new(),
    );
    let coordinate_model = alloc::rc::Rc::new(CoordinateModel::affine(curve_model.clone()));
    let mut parameters = FxHashMap::default();
    parameters.insert("a".into(), Mod::from_u64(2, p.clone()));
    parameters.insert("b".into(), Mod::from_u64(3, p.clone()));
    let mut gen_coords = FxHashMap::default();
    gen_coords.insert("x".into(), Mod::from_u64(3, p.clone()));
    gen_coords.insert("y".into(), Mod::from_u64(6, p.clone()));
    let generator = Point::new(coordinate_model.clone(), gen_coords).unwrap();
    let neutral = Point::infinity(coordinate_model.clone());
    let curve = ec_core::curve::EllipticCurve::new(curve_model, coordinate_model, p, parameters, neutral).unwrap();
    DomainParameters {
        curve: alloc::rc::Rc::new(curve),
        generator,
        order: BigUint::from(5u32),
        cofactor: BigUint::from(1u32),
        name: None,
        category: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn generated_public_key_round_trips_through_its_byte_encoding() {
        let params = toy_params();
        let (_secret, public) = generate_keypair(&params, OsRng).unwrap();
        let bytes = public.to_bytes(&params).unwrap();
        let decoded = PublicKey::from_bytes(&params, &bytes).unwrap();
        assert!(decoded.as_point().equals(public.as_point()));
    }

    #[test]
    fn public_key_matches_manual_scalar_multiplication() {
        let params = toy_params();
        let secret = SecretKey::new(BigUint::from(3u32)).unwrap();
        let public = secret.public_key(&params).unwrap();
        let expected = params.curve.multiply(&params.generator, &BigUint::from(3u32)).unwrap();
        assert!(public.as_point().equals(&expected));
    }

    #[test]
    fn secret_key_scalar_round_trips_through_bytes() {
        let order = BigUint::from(97u32 * 2 + 1);
        let secret = SecretKey::new(BigUint::from(42u32)).unwrap();
        let bytes = secret.to_bytes(&order);
        let decoded = SecretKey::from_bytes(&bytes, &order).unwrap();
        assert_eq!(decoded.secret_scalar(), &BigUint::from(42u32));
    }

    #[test]
    fn zero_secret_scalar_is_rejected() {
        assert!(SecretKey::new(BigUint::zero()).is_err());
    }

    #[test]
    fn infinity_point_encodes_as_a_single_zero_byte() {
        let params = toy_params();
        let infinity = Point::infinity(params.curve.coordinate_model.clone());
        let bytes = encode_point(&params, &infinity).unwrap();
        assert_eq!(bytes, alloc::vec![0u8]);
        let decoded = decode_point(&params, &bytes).unwrap();
        assert!(decoded.is_infinity());
    }
}
