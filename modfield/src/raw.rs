//! The default, heap-allocated arbitrary-precision `Mod` backend.
//!
//! Grounded on `examples/CokieMiner-SymbAnaFis`'s `num-anafis` crate, whose
//! `backend_big_astro`/`backend_big_rug` features select an arbitrary
//! precision numeric backend behind a Cargo feature exactly like spec.md
//! §4.1's "multiple backends may coexist; selection is a process-wide
//! configuration" calls for; we reuse its choice of `num-bigint` as the
//! concrete bignum crate (`num-anafis/Cargo.toml`'s `num-bigint` dependency)
//! instead of inventing a bignum type, since the teacher's own
//! `crypto-bigint` types are const-generic over a compile-time modulus and
//! do not fit a curve chosen at runtime.

use crate::config::getconfig;
use crate::error::{dispatch, Error, Result};
use crate::{ByteOrder, FieldValue};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand_core::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// An element `x` of `Z/nZ`, or the `Undefined` sentinel used for
/// abstract/uninstantiated coordinates (spec.md §3).
///
/// `n` is fixed for the lifetime of a value; every arithmetic operation
/// returns a fresh `Mod` sharing the same `n`. Combining two `Mod`s with
/// different `n` is an [`Error::ModulusMismatch`].
#[derive(Clone, Debug)]
pub struct Mod {
    repr: Repr,
}

#[derive(Clone, Debug)]
enum Repr {
    Undefined,
    Value { x: BigUint, n: BigUint },
}

impl Mod {
    /// The `Undefined` sentinel: every arithmetic operation on it fails.
    pub fn undefined() -> Self {
        Mod {
            repr: Repr::Undefined,
        }
    }

    /// Construct `x mod n`, reducing `x` into `[0, n)` first.
    pub fn new(x: BigUint, n: BigUint) -> Self {
        let x = if x >= n { &x % &n } else { x };
        Mod {
            repr: Repr::Value { x, n },
        }
    }

    /// Construct from a small non-negative integer.
    pub fn from_u64(x: u64, n: BigUint) -> Self {
        Mod::new(BigUint::from(x), n)
    }

    /// Whether this is the `Undefined` sentinel.
    pub fn is_undefined(&self) -> bool {
        matches!(self.repr, Repr::Undefined)
    }

    /// The modulus `n`, if this is not `Undefined`.
    pub fn modulus(&self) -> Result<&BigUint> {
        match &self.repr {
            Repr::Undefined => Err(Error::Undefined),
            Repr::Value { n, .. } => Ok(n),
        }
    }

    /// The canonical representative `x` in `[0, n)`, if not `Undefined`.
    pub fn value(&self) -> Result<&BigUint> {
        match &self.repr {
            Repr::Undefined => Err(Error::Undefined),
            Repr::Value { x, .. } => Ok(x),
        }
    }

    fn same_field(&self, other: &Self) -> Result<&BigUint> {
        match (&self.repr, &other.repr) {
            (Repr::Value { n: n1, .. }, Repr::Value { n: n2, .. }) => {
                if n1 == n2 {
                    Ok(n1)
                } else {
                    Err(Error::ModulusMismatch)
                }
            }
            _ => Err(Error::Undefined),
        }
    }

    /// `self + other`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        let n = self.same_field(other)?.clone();
        let (x1, x2) = (self.value()?, other.value()?);
        Ok(Mod::new((x1 + x2) % &n, n))
    }

    /// `self - other`.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        let n = self.same_field(other)?.clone();
        let (x1, x2) = (self.value()?, other.value()?);
        let diff = if x1 >= x2 {
            x1 - x2
        } else {
            &n - (x2 - x1) % &n
        };
        Ok(Mod::new(diff % &n, n))
    }

    /// `-self`.
    pub fn neg(&self) -> Result<Self> {
        let n = self.modulus()?.clone();
        let x = self.value()?;
        if x.is_zero() {
            Ok(Mod::new(BigUint::zero(), n))
        } else {
            Ok(Mod::new(&n - x, n))
        }
    }

    /// `self * other`.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        let n = self.same_field(other)?.clone();
        let (x1, x2) = (self.value()?, other.value()?);
        Ok(Mod::new((x1 * x2) % &n, n))
    }

    /// `self / other`, i.e. `self * other.inverse()`.
    pub fn div(&self, other: &Self) -> Result<Self> {
        self.mul(&other.inverse()?)
    }

    /// `self * self`.
    pub fn sqr(&self) -> Result<Self> {
        self.mul(self)
    }

    /// Modular inverse. Dispatches through the configured
    /// `no_inverse_action` policy on failure (spec.md §4.1).
    pub fn inverse(&self) -> Result<Self> {
        let n = self.modulus()?.clone();
        let x = self.value()?;
        let (gcd, inv, _) = extended_gcd(&x.clone().into(), &n.clone().into());
        if gcd != num_bigint::BigInt::one() {
            let cfg = getconfig();
            return dispatch(
                cfg.no_inverse_action,
                Error::NonInvertible,
                "Mod::inverse",
                Mod::new(BigUint::zero(), n),
            );
        }
        let inv = inv.mod_floor(&n.clone().into());
        Ok(Mod::new(inv.to_biguint().expect("non-negative by mod_floor"), n))
    }

    /// `self^e` for a non-negative integer exponent.
    pub fn pow(&self, e: &BigUint) -> Result<Self> {
        let n = self.modulus()?.clone();
        let x = self.value()?;
        Ok(Mod::new(x.modpow(e, &n), n))
    }

    /// `self^e` for a signed exponent; negative exponents invert first.
    pub fn pow_i64(&self, e: i64) -> Result<Self> {
        if e < 0 {
            self.inverse()?.pow(&BigUint::from((-e) as u64))
        } else {
            self.pow(&BigUint::from(e as u64))
        }
    }

    /// Bit length of the canonical representative.
    pub fn bit_length(&self) -> Result<u64> {
        Ok(self.value()?.bits())
    }

    /// Whether `self` is a nonzero quadratic residue modulo a prime `n`
    /// (Legendre symbol via Euler's criterion). Fails with
    /// [`Error::NotImplementedForComposite`] if `n` is not (probably) prime.
    pub fn is_residue(&self) -> Result<bool> {
        let n = self.modulus()?;
        require_prime(n)?;
        let x = self.value()?;
        if x.is_zero() {
            return Ok(true);
        }
        let exp = (n - BigUint::one()) >> 1u32;
        let r = x.modpow(&exp, n);
        Ok(r == BigUint::one())
    }

    /// Modular square root via Tonelli-Shanks. Requires a prime modulus.
    /// Non-residues dispatch through `non_residue_action`.
    pub fn sqrt(&self) -> Result<Self> {
        let n = self.modulus()?.clone();
        require_prime(&n)?;
        if !self.is_residue()? {
            let cfg = getconfig();
            return dispatch(
                cfg.non_residue_action,
                Error::NonResidue,
                "Mod::sqrt",
                Mod::new(BigUint::zero(), n),
            );
        }
        let x = self.value()?.clone();
        if x.is_zero() {
            return Ok(Mod::new(BigUint::zero(), n));
        }
        let three = BigUint::from(3u8);
        let four = BigUint::from(4u8);
        if (&n % &four) == three {
            let exp = (&n + BigUint::one()) >> 2u32;
            return Ok(Mod::new(x.modpow(&exp, &n), n));
        }
        // General Tonelli-Shanks.
        let mut q = &n - BigUint::one();
        let mut s: u32 = 0;
        while (&q).is_even() {
            q >>= 1u32;
            s += 1;
        }
        let mut z = BigUint::from(2u8);
        while mod_is_residue(&z, &n) {
            z += BigUint::one();
        }
        let mut m = s;
        let mut c = z.modpow(&q, &n);
        let mut t = x.modpow(&q, &n);
        let r_exp = (&q + BigUint::one()) >> 1u32;
        let mut r = x.modpow(&r_exp, &n);
        while t != BigUint::one() {
            let mut i = 1u32;
            let mut t2i = (&t * &t) % &n;
            while t2i != BigUint::one() {
                t2i = (&t2i * &t2i) % &n;
                i += 1;
            }
            let two_exp = m - i - 1;
            let b = c.modpow(&(BigUint::one() << two_exp), &n);
            m = i;
            c = (&b * &b) % &n;
            t = (&t * &c) % &n;
            r = (&r * &b) % &n;
        }
        Ok(Mod::new(r, n))
    }

    /// Whether `self` is a nonzero cubic residue modulo a prime `n`.
    pub fn is_cubic_residue(&self) -> Result<bool> {
        let n = self.modulus()?;
        require_prime(n)?;
        let x = self.value()?;
        if x.is_zero() {
            return Ok(true);
        }
        let g = (&n.clone() - BigUint::one()).gcd(&BigUint::from(3u8));
        if g == BigUint::one() {
            return Ok(true);
        }
        let exp = (n - BigUint::one()) / BigUint::from(3u8);
        Ok(x.modpow(&exp, n) == BigUint::one())
    }

    /// Cube root via Adleman-Manders-Miller. Requires a prime modulus.
    pub fn cube_root(&self) -> Result<Self> {
        let n = self.modulus()?.clone();
        require_prime(&n)?;
        if !self.is_cubic_residue()? {
            let cfg = getconfig();
            return dispatch(
                cfg.non_residue_action,
                Error::NonResidue,
                "Mod::cube_root",
                Mod::new(BigUint::zero(), n),
            );
        }
        let x = self.value()?.clone();
        let three = BigUint::from(3u8);
        if (&(&n - BigUint::one()) % &three) == BigUint::from(2u8) {
            // gcd(3, n - 1) == 1: unique cube root is x^{inverse of 3 mod (n-1)}.
            let order = &n - BigUint::one();
            let (_, inv3, _) = extended_gcd(&three.clone().into(), &order.clone().into());
            let inv3 = inv3.mod_floor(&order.into());
            return Ok(Mod::new(
                x.modpow(&inv3.to_biguint().expect("non-negative"), &n),
                n,
            ));
        }
        // gcd(3, n - 1) == 3: Adleman-Manders-Miller style search.
        let mut q = &n - BigUint::one();
        let mut s: u32 = 0;
        while (&q % &three).is_zero() {
            q /= &three;
            s += 1;
        }
        let t = q.clone();
        let k = if (&t % &three) == BigUint::one() {
            (&t - BigUint::one()) / &three
        } else {
            (&t + BigUint::one()) / &three
        };
        let mut b = BigUint::from(2u8);
        while mod_is_cubic_residue(&b, &n) {
            b += BigUint::one();
        }
        let mut c = b.modpow(&t, &n);
        let mut r = x.modpow(&t, &n);
        let mut h = BigUint::one();
        let cp = c.modpow(&BigUint::from(3u32).pow(s.saturating_sub(1)), &n);
        c = mod_inv(&c, &n)?;
        for i in 1..s {
            let d = r.modpow(&BigUint::from(3u32).pow(s - i - 1), &n);
            if d == cp {
                h = (&h * &c) % &n;
                r = (&r * &c.modpow(&three, &n)) % &n;
            } else if d != BigUint::one() {
                h = (&h * &c.modpow(&BigUint::from(2u8), &n)) % &n;
                r = (&r * &c.modpow(&BigUint::from(6u8), &n)) % &n;
            }
            c = c.modpow(&three, &n);
        }
        let mut result = (x.modpow(&k, &n) * h) % &n;
        if (&t % &three) == BigUint::one() {
            result = mod_inv(&result, &n)?;
        }
        Ok(Mod::new(result, n))
    }

    /// Encode as `ceil(bit_length(n) / 8)` big-endian (or little-endian)
    /// bytes, per spec.md §6.
    pub fn to_bytes(&self, order: ByteOrder) -> Result<Vec<u8>> {
        let n = self.modulus()?;
        let size = (n.bits() as usize).div_ceil(8).max(1);
        let x = self.value()?;
        let mut be = x.to_bytes_be();
        if be.len() < size {
            let mut padded = alloc::vec![0u8; size - be.len()];
            padded.extend_from_slice(&be);
            be = padded;
        }
        if matches!(order, ByteOrder::LittleEndian) {
            be.reverse();
        }
        Ok(be)
    }

    /// Decode big-endian (or little-endian) bytes modulo `n`.
    pub fn from_bytes(bytes: &[u8], n: BigUint, order: ByteOrder) -> Self {
        let mut be = bytes.to_vec();
        if matches!(order, ByteOrder::LittleEndian) {
            be.reverse();
        }
        Mod::new(BigUint::from_bytes_be(&be), n)
    }

    /// Draw a uniformly random element of `[0, n)` using `rng`.
    /// Corresponds to the `RandomModAction` of spec.md §3/§4.6.
    pub fn random(n: BigUint, mut rng: impl CryptoRng + RngCore) -> Self {
        let bits = n.bits().max(1) as usize;
        let bytes = bits.div_ceil(8);
        loop {
            let mut buf = alloc::vec![0u8; bytes];
            rng.fill_bytes(&mut buf);
            // Mask off the excess high bits of the top byte so the sample
            // is uniform over [0, 2^bits) before rejecting out-of-range.
            let excess = bytes * 8 - bits;
            if excess > 0 {
                buf[0] &= 0xffu8 >> excess;
            }
            let candidate = BigUint::from_bytes_be(&buf);
            if candidate < n {
                return Mod::new(candidate, n);
            }
        }
    }
}

fn require_prime(n: &BigUint) -> Result<()> {
    // Full primality proving is out of scope; callers are expected to pass
    // field/order moduli that are already known-prime curve parameters.
    // We reject the one case we can detect for free: even moduli (aside
    // from 2) can never satisfy Tonelli-Shanks/AMM's setup.
    if n.is_even() && n != &BigUint::from(2u8) {
        return Err(Error::NotImplementedForComposite);
    }
    Ok(())
}

fn mod_is_residue(z: &BigUint, n: &BigUint) -> bool {
    if z.is_zero() {
        return true;
    }
    let exp = (n - BigUint::one()) >> 1u32;
    z.modpow(&exp, n) == BigUint::one()
}

fn mod_is_cubic_residue(b: &BigUint, n: &BigUint) -> bool {
    if b.is_zero() {
        return true;
    }
    let exp = (n - BigUint::one()) / BigUint::from(3u8);
    b.modpow(&exp, n) == BigUint::one()
}

fn mod_inv(x: &BigUint, n: &BigUint) -> Result<BigUint> {
    let (gcd, inv, _) = extended_gcd(&x.clone().into(), &n.clone().into());
    if gcd != num_bigint::BigInt::one() {
        return Err(Error::NonInvertible);
    }
    Ok(inv.mod_floor(&n.clone().into()).to_biguint().expect("non-negative"))
}

/// Extended Euclidean algorithm over signed integers: returns `(g, x, y)`
/// with `a*x + b*y == g == gcd(a, b)`.
fn extended_gcd(
    a: &num_bigint::BigInt,
    b: &num_bigint::BigInt,
) -> (num_bigint::BigInt, num_bigint::BigInt, num_bigint::BigInt) {
    let result = a.extended_gcd(b);
    (result.gcd, result.x, result.y)
}

impl PartialEq for Mod {
    fn eq(&self, other: &Self) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Undefined, Repr::Undefined) => true,
            (Repr::Value { x: x1, n: n1 }, Repr::Value { x: x2, n: n2 }) => {
                n1 == n2 && x1 == x2
            }
            _ => false,
        }
    }
}

impl Eq for Mod {}

impl ConstantTimeEq for Mod {
    fn ct_eq(&self, other: &Self) -> Choice {
        Choice::from(u8::from(self == other))
    }
}

impl PartialOrd for Mod {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.repr, &other.repr) {
            (Repr::Value { x: x1, n: n1 }, Repr::Value { x: x2, n: n2 }) if n1 == n2 => {
                x1.partial_cmp(x2)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Mod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Undefined => f.write_str("Undefined"),
            Repr::Value { x, n } => write!(f, "{x} (mod {n})"),
        }
    }
}

impl Zeroize for Mod {
    fn zeroize(&mut self) {
        if let Repr::Value { x, .. } = &mut self.repr {
            *x = BigUint::zero();
        }
        self.repr = Repr::Undefined;
    }
}

impl FieldValue for Mod {
    fn from_literal(value: i64, like: &Self) -> Self {
        let n = like.modulus().cloned().unwrap_or_default();
        if value >= 0 {
            Mod::new(BigUint::from(value as u64) % &n, n)
        } else {
            let pos = Mod::new(BigUint::from((-value) as u64) % &n, n.clone());
            pos.neg().unwrap_or_else(|_| Mod::new(BigUint::zero(), n))
        }
    }

    fn op_add(&self, other: &Self) -> Result<Self> {
        self.add(other)
    }

    fn op_sub(&self, other: &Self) -> Result<Self> {
        self.sub(other)
    }

    fn op_mul(&self, other: &Self) -> Result<Self> {
        self.mul(other)
    }

    fn op_div(&self, other: &Self) -> Result<Self> {
        self.div(other)
    }

    fn op_neg(&self) -> Result<Self> {
        self.neg()
    }

    fn op_sqr(&self) -> Result<Self> {
        self.sqr()
    }

    fn op_pow(&self, e: i64) -> Result<Self> {
        self.pow_i64(e)
    }

    fn op_inv(&self) -> Result<Self> {
        self.inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p17(x: u64) -> Mod {
        Mod::from_u64(x, BigUint::from(17u8))
    }

    #[test]
    fn addition_is_associative() {
        let (a, b, c) = (p17(5), p17(9), p17(13));
        let lhs = a.add(&b).unwrap().add(&c).unwrap();
        let rhs = a.add(&b.add(&c).unwrap()).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn multiplication_distributes_over_addition() {
        let (a, b, c) = (p17(5), p17(9), p17(13));
        let lhs = a.mul(&b.add(&c).unwrap()).unwrap();
        let rhs = a.mul(&b).unwrap().add(&a.mul(&c).unwrap()).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn inverse_of_unit_is_multiplicative_identity() {
        let a = p17(5);
        let inv = a.inverse().unwrap();
        assert_eq!(a.mul(&inv).unwrap(), p17(1));
    }

    #[test]
    fn sqrt_squares_back_to_self_for_residues() {
        for v in 1u64..17 {
            let x = p17(v);
            if x.is_residue().unwrap() {
                let root = x.sqrt().unwrap();
                assert_eq!(root.sqr().unwrap(), x);
            }
        }
    }

    #[test]
    fn mismatched_modulus_is_rejected() {
        let a = p17(3);
        let b = Mod::from_u64(3, BigUint::from(19u8));
        assert_eq!(a.add(&b), Err(Error::ModulusMismatch));
    }

    #[test]
    fn non_invertible_zero_respects_policy() {
        use crate::config::{Config, FailAction, TemporaryConfig};
        let zero = p17(0);
        assert_eq!(zero.inverse(), Err(Error::NonInvertible));

        let mut cfg = Config::default();
        cfg.no_inverse_action = FailAction::Ignore;
        let _guard = TemporaryConfig::install(cfg);
        assert!(zero.inverse().is_ok());
    }

    #[test]
    fn byte_roundtrip_is_big_endian_and_padded() {
        let x = p17(5);
        let bytes = x.to_bytes(ByteOrder::BigEndian).unwrap();
        assert_eq!(bytes, alloc::vec![5]);
        let back = Mod::from_bytes(&bytes, BigUint::from(17u8), ByteOrder::BigEndian);
        assert_eq!(back, x);
    }
}
