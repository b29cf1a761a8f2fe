//! Side-channel countermeasure wrappers (spec.md §4.5).
//!
//! No multiplier-shaped countermeasure class exists in
//! `examples/original_source/`; these are built directly from spec.md's
//! algorithm descriptions, composed the same way the rest of this crate
//! composes [`MultiplierCore`] — a countermeasure wraps one or more boxed
//! `ScalarMultiplier`s and exposes the identical `init`/`multiply`
//! contract, so a countermeasure can itself wrap another countermeasure.
//! Randomness is threaded through an explicit, caller-supplied RNG
//! (stored at construction) rather than a global, matching
//! `modfield::Mod::random`'s own `rand_core::{CryptoRng, RngCore}` bound.

use alloc::boxed::Box;
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use rand_core::{CryptoRng, RngCore};

use ec_core::{Context, DomainParameters, Formula, Point};
use modfield::Mod;

use crate::base::ScalarMultiplier;
use crate::error::{Error, Result};

fn random_below<R: CryptoRng + RngCore>(bound: &BigUint, rng: &mut R) -> BigUint {
    Mod::random(bound.clone(), &mut *rng).value().ok().cloned().unwrap_or_default()
}

fn mod_inverse(x: &BigUint, n: &BigUint) -> Result<BigUint> {
    let result = BigInt::from(x.clone()).extended_gcd(&BigInt::from(n.clone()));
    if result.gcd != BigInt::one() {
        return Err(Error::BadConfiguration("scalar is not invertible modulo the curve order"));
    }
    let inv = result.x.mod_floor(&BigInt::from(n.clone()));
    Ok(inv.to_biguint().expect("non-negative by mod_floor"))
}

fn curve_add(
    params: &DomainParameters,
    formula: &Option<Formula>,
    p1: &Point<Mod>,
    p2: &Point<Mod>,
    ctx: &mut dyn Context,
) -> Result<Point<Mod>> {
    match formula {
        Some(f) => Ok(f
            .call(&params.curve.p, &[p1.clone(), p2.clone()], &params.curve.parameters, ctx)?
            .into_iter()
            .next()
            .unwrap()),
        None => Ok(params.curve.add(p1, p2)?),
    }
}

fn curve_neg(params: &DomainParameters, p: &Point<Mod>) -> Result<Point<Mod>> {
    Ok(params.curve.neg(p)?)
}

/// `[k + r*n] point` via a single inner multiplier, `r` drawn from
/// `[0, 2^rand_bits)` fresh on every call.
pub struct GroupScalarRandomization<R> {
    mult: Box<dyn ScalarMultiplier>,
    rand_bits: u32,
    rng: R,
    params: Option<DomainParameters>,
}

impl<R: CryptoRng + RngCore> GroupScalarRandomization<R> {
    /// Wrap `mult`, randomizing the scalar by `rand_bits` extra bits each
    /// call, drawing from `rng`.
    pub fn new(mult: Box<dyn ScalarMultiplier>, rand_bits: u32, rng: R) -> Self {
        GroupScalarRandomization {
            mult,
            rand_bits,
            rng,
            params: None,
        }
    }
}

impl<R: CryptoRng + RngCore> ScalarMultiplier for GroupScalarRandomization<R> {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        let n_bits = params.order.bits();
        let base_bits = bits.unwrap_or_else(|| params.full_order().bits());
        let adjusted = core::cmp::max(base_bits, self.rand_bits as u64 + n_bits) + 1;
        self.mult.init(params.clone(), point, Some(adjusted), ctx)?;
        self.params = Some(params);
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let params = self.params.clone().ok_or(Error::Uninitialized)?;
        let bound = BigUint::one() << self.rand_bits;
        let r = random_below(&bound, &mut self.rng);
        let randomized = scalar + &r * &params.order;
        self.mult.multiply(&randomized, ctx)
    }
}

/// `[r] point + [k-r] point`, `r` drawn from `[0, n)` fresh on every
/// call. `add` overrides the addition used to combine the two partial
/// results; defaults to the curve's own (affine) addition.
pub struct AdditiveSplitting<R> {
    m1: Box<dyn ScalarMultiplier>,
    m2: Box<dyn ScalarMultiplier>,
    add: Option<Formula>,
    rng: R,
    params: Option<DomainParameters>,
}

impl<R: CryptoRng + RngCore> AdditiveSplitting<R> {
    /// Wrap `m1`/`m2`, optionally overriding the combining addition.
    pub fn new(m1: Box<dyn ScalarMultiplier>, m2: Box<dyn ScalarMultiplier>, add: Option<Formula>, rng: R) -> Self {
        AdditiveSplitting {
            m1,
            m2,
            add,
            rng,
            params: None,
        }
    }
}

impl<R: CryptoRng + RngCore> ScalarMultiplier for AdditiveSplitting<R> {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.m1.init(params.clone(), point.clone(), bits, ctx)?;
        self.m2.init(params.clone(), point, bits, ctx)?;
        self.params = Some(params);
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let params = self.params.clone().ok_or(Error::Uninitialized)?;
        let r = random_below(&params.order, &mut self.rng);
        let k2 = modsub(scalar, &r, &params.order);
        let p1 = self.m1.multiply(&r, ctx)?;
        let p2 = self.m2.multiply(&k2, ctx)?;
        curve_add(&params, &self.add, &p1, &p2, ctx)
    }
}

fn modsub(a: &BigUint, b: &BigUint, n: &BigUint) -> BigUint {
    let a = a % n;
    if a >= *b {
        &a - b
    } else {
        &a + n - b
    }
}

/// `[k * r^-1 mod n] * [r] point`, `r` drawn from `[0, 2^rand_bits)`
/// (redrawn if not invertible mod `n`) fresh on every call. `m1`
/// multiplies `point` by `r`; `m2` is re-initialized each call with the
/// result `S = [r]point` as its own base point.
pub struct MultiplicativeSplitting<R> {
    m1: Box<dyn ScalarMultiplier>,
    m2: Box<dyn ScalarMultiplier>,
    rand_bits: u32,
    rng: R,
    params: Option<DomainParameters>,
    bits: Option<u64>,
}

impl<R: CryptoRng + RngCore> MultiplicativeSplitting<R> {
    /// Wrap `m1`/`m2`.
    pub fn new(m1: Box<dyn ScalarMultiplier>, m2: Box<dyn ScalarMultiplier>, rand_bits: u32, rng: R) -> Self {
        MultiplicativeSplitting {
            m1,
            m2,
            rand_bits,
            rng,
            params: None,
            bits: None,
        }
    }
}

impl<R: CryptoRng + RngCore> ScalarMultiplier for MultiplicativeSplitting<R> {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.m1.init(params.clone(), point, bits, ctx)?;
        self.params = Some(params);
        self.bits = bits;
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let params = self.params.clone().ok_or(Error::Uninitialized)?;
        let bound = BigUint::one() << self.rand_bits;
        let (r, r_inv) = loop {
            let r = random_below(&bound, &mut self.rng);
            if r.is_zero() {
                continue;
            }
            match mod_inverse(&r, &params.order) {
                Ok(inv) => break (r, inv),
                Err(_) => continue,
            }
        };
        let s = self.m1.multiply(&r, ctx)?;
        let k_prime = (scalar * &r_inv) % &params.order;
        self.m2.init(params, s, self.bits, ctx)?;
        self.m2.multiply(&k_prime, ctx)
    }
}

/// `[k div r] * [r] point + [k mod r] point`, `r` drawn roughly
/// `|n|/2` bits long fresh on every call. `m1` computes `R = [r]point`;
/// `m2` is re-initialized each call with `R`; `m3` stays bound to
/// `point`. `add` overrides the final combining addition.
pub struct EuclideanSplitting<R> {
    m1: Box<dyn ScalarMultiplier>,
    m2: Box<dyn ScalarMultiplier>,
    m3: Box<dyn ScalarMultiplier>,
    add: Option<Formula>,
    rng: R,
    params: Option<DomainParameters>,
    bits: Option<u64>,
}

impl<R: CryptoRng + RngCore> EuclideanSplitting<R> {
    /// Wrap `m1`/`m2`/`m3`, optionally overriding the combining addition.
    pub fn new(
        m1: Box<dyn ScalarMultiplier>,
        m2: Box<dyn ScalarMultiplier>,
        m3: Box<dyn ScalarMultiplier>,
        add: Option<Formula>,
        rng: R,
    ) -> Self {
        EuclideanSplitting {
            m1,
            m2,
            m3,
            add,
            rng,
            params: None,
            bits: None,
        }
    }
}

impl<R: CryptoRng + RngCore> ScalarMultiplier for EuclideanSplitting<R> {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.m1.init(params.clone(), point.clone(), bits, ctx)?;
        self.m3.init(params.clone(), point, bits, ctx)?;
        self.params = Some(params);
        self.bits = bits;
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let params = self.params.clone().ok_or(Error::Uninitialized)?;
        let half_bits = (params.order.bits() / 2).max(1);
        let bound = BigUint::one() << half_bits;
        let mut r = random_below(&bound, &mut self.rng);
        if r.is_zero() {
            r = BigUint::one();
        }
        let k1 = scalar % &r;
        let k2 = scalar / &r;
        let big_r = self.m1.multiply(&r, ctx)?;
        self.m2.init(params.clone(), big_r, self.bits, ctx)?;
        let p_k2 = self.m2.multiply(&k2, ctx)?;
        let p_k1 = self.m3.multiply(&k1, ctx)?;
        curve_add(&params, &self.add, &p_k2, &p_k1, ctx)
    }
}

/// Adjusts the scalar to `k+n` or `k+2n` so the multiplied bit-length
/// always matches `|n|`, defeating attacks that distinguish the last
/// iteration of a variable-length scan. No randomness involved.
pub struct BrumleyTuveri {
    mult: Box<dyn ScalarMultiplier>,
    params: Option<DomainParameters>,
}

impl BrumleyTuveri {
    /// Wrap `mult`.
    pub fn new(mult: Box<dyn ScalarMultiplier>) -> Self {
        BrumleyTuveri { mult, params: None }
    }
}

impl ScalarMultiplier for BrumleyTuveri {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.mult.init(params.clone(), point, bits, ctx)?;
        self.params = Some(params);
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let params = self.params.clone().ok_or(Error::Uninitialized)?;
        let target = params.order.bits();
        let adjusted = if scalar.bits() == target {
            scalar.clone()
        } else if (scalar + &params.order).bits() == target {
            scalar + &params.order
        } else {
            scalar + &params.order + &params.order
        };
        self.mult.multiply(&adjusted, ctx)
    }
}

/// `[k] T - [k] R` for a fresh random point `R` and `T = point + R`,
/// masking `point` from every formula `[k]` is actually applied to. `m1`
/// computes `[k]R`; `m2` is re-initialized each call with `T`.
pub struct PointBlinding<R> {
    m1: Box<dyn ScalarMultiplier>,
    m2: Box<dyn ScalarMultiplier>,
    rng: R,
    params: Option<DomainParameters>,
    point: Option<Point<Mod>>,
    bits: Option<u64>,
}

impl<R: CryptoRng + RngCore> PointBlinding<R> {
    /// Wrap `m1`/`m2`.
    pub fn new(m1: Box<dyn ScalarMultiplier>, m2: Box<dyn ScalarMultiplier>, rng: R) -> Self {
        PointBlinding {
            m1,
            m2,
            rng,
            params: None,
            point: None,
            bits: None,
        }
    }
}

impl<R: CryptoRng + RngCore> ScalarMultiplier for PointBlinding<R> {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        _ctx: &mut dyn Context,
    ) -> Result<()> {
        self.params = Some(params);
        self.point = Some(point);
        self.bits = bits;
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let params = self.params.clone().ok_or(Error::Uninitialized)?;
        let point = self.point.clone().ok_or(Error::Uninitialized)?;
        let r = params.curve.random_point(&mut self.rng)?;
        let t = params.curve.add(&point, &r)?;
        self.m1.init(params.clone(), r, self.bits, ctx)?;
        let s = self.m1.multiply(scalar, ctx)?;
        self.m2.init(params.clone(), t, self.bits, ctx)?;
        let q = self.m2.multiply(scalar, ctx)?;
        let neg_s = curve_neg(&params, &s)?;
        curve_add(&params, &None, &q, &neg_s, ctx)
    }
}
