//! Comb-style multipliers.
//!
//! Grounded on `examples/original_source/pyecsca/ec/mult/comb.py`'s
//! `BGMWMultiplier`/`CombMultiplier`.

use alloc::collections::BTreeMap;
use num_bigint::BigUint;
use num_traits::Zero;

use ec_core::{Action, ActionResult, Context, DomainParameters, FormulaKind, Point};
use modfield::Mod;

use crate::base::{AccumulationOrder, Formulas, MultiplierCore, ProcessingDirection, ScalarMultiplier};
use crate::error::{Error, Result};
use crate::recoding::convert_base;

/// Width-`w` BGMW: precomputes `d = ceil(bits / w)` points `[2^(w*i)] point`
/// inside a `PrecomputationAction`, then runs Algorithm 3.41's
/// "running total of running totals" double loop over the base-`2^w`
/// digits of the scalar.
#[derive(Clone, Debug)]
pub struct BgmwMultiplier {
    core: MultiplierCore,
    width: u32,
    direction: ProcessingDirection,
    table: alloc::vec::Vec<Point<Mod>>,
}

impl BgmwMultiplier {
    /// Build a width-`w` BGMW multiplier.
    pub fn new(
        formulas: Formulas,
        width: u32,
        direction: ProcessingDirection,
        short_circuit: bool,
    ) -> Result<Self> {
        if width < 1 {
            return Err(Error::BadConfiguration("BGMWMultiplier width must be at least 1"));
        }
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(BgmwMultiplier {
            core,
            width,
            direction,
            table: alloc::vec::Vec::new(),
        })
    }
}

impl ScalarMultiplier for BgmwMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point.clone(), bits);
        let bits = self.core.bits()?;
        let d = bits.div_ceil(self.width as u64);
        ctx.enter_action(&Action::Precomputation { point: point.clone() });
        let mut table = alloc::vec::Vec::with_capacity(d as usize);
        let mut current = point;
        table.push(current.clone());
        for _ in 1..d {
            for _ in 0..self.width {
                current = self.core.dbl(&current, ctx)?;
            }
            table.push(current.clone());
        }
        ctx.exit_action(&ActionResult::Points(table.clone()));
        self.table = table;
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if scalar.is_zero() {
            return self.core.neutral();
        }
        let point = self.core.point()?.clone();
        ctx.enter_action(&Action::ScalarMultiplication {
            point,
            scalar: scalar.clone(),
        });
        let radix = 1u32 << self.width;
        let mut digits = convert_base(scalar, radix);
        digits.resize(self.table.len(), 0);
        let mut r = self.core.neutral()?;
        let mut a = self.core.neutral()?;
        let indices: alloc::vec::Vec<usize> = match self.direction {
            ProcessingDirection::LeftToRight => (0..self.table.len()).rev().collect(),
            ProcessingDirection::RightToLeft => (0..self.table.len()).collect(),
        };
        // Algorithm 3.41: walk the digit values from the top down; at
        // each distinct digit level, fold the running total `a` into `r`.
        let max_digit = digits.iter().copied().max().unwrap_or(0);
        for level in (1..=max_digit).rev() {
            for &i in &indices {
                if digits[i] == level {
                    a = self.core.accumulate(&a, &self.table[i].clone(), ctx)?;
                }
            }
            r = self.core.accumulate(&r, &a, ctx)?;
        }
        ctx.exit_action(&ActionResult::Point(r.clone()));
        Ok(r)
    }
}

/// `w`-tooth comb: precomputes `w` base points `[2^(d*i)] point` then all
/// `2^w - 1` nonzero combinations of them inside a `PrecomputationAction`;
/// the main loop is one doubling plus one conditional accumulation per
/// digit slice.
#[derive(Clone, Debug)]
pub struct CombMultiplier {
    core: MultiplierCore,
    width: u32,
    table: BTreeMap<u32, Point<Mod>>,
    d: u64,
}

impl CombMultiplier {
    /// Build a `w`-tooth comb multiplier.
    pub fn new(formulas: Formulas, width: u32, short_circuit: bool) -> Result<Self> {
        if width < 1 {
            return Err(Error::BadConfiguration("CombMultiplier width must be at least 1"));
        }
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(CombMultiplier {
            core,
            width,
            table: BTreeMap::new(),
            d: 0,
        })
    }
}

impl ScalarMultiplier for CombMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point.clone(), bits);
        let bits = self.core.bits()?;
        let d = bits.div_ceil(self.width as u64);
        self.d = d;
        ctx.enter_action(&Action::Precomputation { point: point.clone() });
        let mut base_points = alloc::vec::Vec::with_capacity(self.width as usize);
        let mut current = point;
        base_points.push(current.clone());
        for _ in 1..self.width {
            for _ in 0..d {
                current = self.core.dbl(&current, ctx)?;
            }
            base_points.push(current.clone());
        }
        let mut table = BTreeMap::new();
        for mask in 1u32..(1u32 << self.width) {
            let mut acc: Option<Point<Mod>> = None;
            for (bit, base) in base_points.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    acc = Some(match acc {
                        None => base.clone(),
                        Some(prev) => self.core.add(&prev, base, ctx)?,
                    });
                }
            }
            table.insert(mask, acc.expect("mask is nonzero"));
        }
        ctx.exit_action(&ActionResult::Points(table.values().cloned().collect()));
        self.table = table;
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if scalar.is_zero() {
            return self.core.neutral();
        }
        let point = self.core.point()?.clone();
        ctx.enter_action(&Action::ScalarMultiplication {
            point,
            scalar: scalar.clone(),
        });
        // Tooth `t`'s digit is the `d`-bit slice of `scalar` starting at
        // bit `t*d`; row `i` takes bit `i` of every tooth's digit at once,
        // avoiding a `2^d`-sized intermediate radix (`d` scales with
        // `bits/width` and can exceed 32 for real curves).
        let mut q = self.core.neutral()?;
        for i in (0..self.d).rev() {
            q = self.core.dbl(&q, ctx)?;
            let mut mask = 0u32;
            for tooth in 0..self.width {
                if scalar.bit(tooth as u64 * self.d + i) {
                    mask |= 1 << tooth;
                }
            }
            if mask != 0 {
                let term = self.table.get(&mask).ok_or(Error::Uninitialized)?.clone();
                q = self.core.accumulate(&q, &term, ctx)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(q.clone()));
        Ok(q)
    }
}
