//! Window-recoded multipliers that are not NAF-based.
//!
//! `FixedWindowLtrMultiplier` is grounded on
//! `examples/original_source/pyecsca/ec/mult/window.py`'s
//! `FixedWindowLTRMultiplier`. `SlidingWindowMultiplier` generalizes the
//! same source file's `sliding_window_ltr` recoding (used there only as a
//! free function) into a full multiplier, since no multiplier class wraps
//! it in the source. `WindowBoothMultiplier` has no source precedent at
//! all — built from [`crate::recoding::booth_recode`] in the same shape.

use alloc::collections::BTreeMap;
use num_bigint::BigUint;
use num_traits::Zero;

use ec_core::{Action, ActionResult, Context, DomainParameters, FormulaKind, Point};
use modfield::Mod;

use crate::base::{AccumulationOrder, Formulas, MultiplierCore, ScalarMultiplier};
use crate::error::{Error, Result};
use crate::recoding::{booth_recode, convert_base, sliding_window_ltr, Digit};

/// General `m`-ary left-to-right windowing (`m` need not be a power of
/// two). Precomputes `1..m-1` times the point inside a
/// `PrecomputationAction`; the main loop raises the accumulator to its
/// `m`-th power (by repeated doubling when `m` is a power of two, else by
/// `m-2` accumulations) and adds in one precomputed multiple per digit.
#[derive(Clone, Debug)]
pub struct FixedWindowLtrMultiplier {
    core: MultiplierCore,
    m: u32,
    table: BTreeMap<u32, Point<Mod>>,
}

impl FixedWindowLtrMultiplier {
    /// Build an `m`-ary fixed-window multiplier. `m` must be at least 2.
    pub fn new(formulas: Formulas, m: u32, short_circuit: bool) -> Result<Self> {
        if m < 2 {
            return Err(Error::BadConfiguration("FixedWindowLTRMultiplier m must be at least 2"));
        }
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(FixedWindowLtrMultiplier {
            core,
            m,
            table: BTreeMap::new(),
        })
    }

    fn mult_m(&self, point: &Point<Mod>, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if self.m.is_power_of_two() {
            let mut acc = point.clone();
            for _ in 0..self.m.trailing_zeros() {
                acc = self.core.dbl(&acc, ctx)?;
            }
            Ok(acc)
        } else {
            let mut acc = point.clone();
            for _ in 0..self.m - 1 {
                acc = self.core.add(&acc, point, ctx)?;
            }
            Ok(acc)
        }
    }
}

impl ScalarMultiplier for FixedWindowLtrMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point.clone(), bits);
        ctx.enter_action(&Action::Precomputation { point: point.clone() });
        let mut table = BTreeMap::new();
        table.insert(1u32, point.clone());
        if self.m > 2 {
            let two = self.core.dbl(&point, ctx)?;
            table.insert(2, two);
            for i in 3..self.m {
                let prev = table[&(i - 1)].clone();
                let next = self.core.add(&prev, &point, ctx)?;
                table.insert(i, next);
            }
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
        let digits = convert_base(scalar, self.m);
        let mut q = self.core.neutral()?;
        for &d in digits.iter().rev() {
            q = self.mult_m(&q, ctx)?;
            if d != 0 {
                let term = self.table.get(&d).ok_or(Error::Uninitialized)?.clone();
                q = self.core.accumulate(&q, &term, ctx)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(q.clone()));
        Ok(q)
    }
}

/// Maximum-width odd sliding window, LTR. Precomputes every odd multiple
/// `1, 3, ..., 2^w - 1` inside a `PrecomputationAction`, then follows
/// [`crate::recoding::sliding_window_ltr`]'s digit stream.
#[derive(Clone, Debug)]
pub struct SlidingWindowMultiplier {
    core: MultiplierCore,
    width: u32,
    table: BTreeMap<i64, Point<Mod>>,
}

impl SlidingWindowMultiplier {
    /// Build a sliding-window multiplier of width `w`.
    pub fn new(formulas: Formulas, width: u32, short_circuit: bool) -> Result<Self> {
        if width < 1 {
            return Err(Error::BadConfiguration("SlidingWindowMultiplier width must be at least 1"));
        }
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(SlidingWindowMultiplier {
            core,
            width,
            table: BTreeMap::new(),
        })
    }
}

impl ScalarMultiplier for SlidingWindowMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point.clone(), bits);
        ctx.enter_action(&Action::Precomputation { point: point.clone() });
        let mut table = BTreeMap::new();
        table.insert(1i64, point.clone());
        if self.width > 1 {
            let two_p = self.core.dbl(&point, ctx)?;
            let max_odd = (1i64 << self.width) - 1;
            let mut current = point.clone();
            let mut d = 1i64;
            while d + 2 <= max_odd {
                current = self.core.add(&current, &two_p, ctx)?;
                d += 2;
                table.insert(d, current.clone());
            }
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
        let digits = sliding_window_ltr(scalar, self.width);
        let mut q = self.core.neutral()?;
        for d in digits {
            match d {
                Digit::Zero => q = self.core.dbl(&q, ctx)?,
                Digit::Value { value, width } => {
                    for _ in 0..width {
                        q = self.core.dbl(&q, ctx)?;
                    }
                    let term = self.table.get(&value).ok_or(Error::Uninitialized)?.clone();
                    q = self.core.accumulate(&q, &term, ctx)?;
                }
            }
        }
        ctx.exit_action(&ActionResult::Point(q.clone()));
        Ok(q)
    }
}

/// Width-`w` Booth-recoded windowing: dense signed digits in
/// `(-2^(w-1), 2^(w-1)]`, processed LTR with one doubling per digit-width
/// and a signed accumulation (add the positive multiple, or subtract via
/// the precomputed negation).
#[derive(Clone, Debug)]
pub struct WindowBoothMultiplier {
    core: MultiplierCore,
    width: u32,
    table: BTreeMap<i64, Point<Mod>>,
}

impl WindowBoothMultiplier {
    /// Build a Booth-recoded windowed multiplier of width `w`.
    pub fn new(formulas: Formulas, width: u32, short_circuit: bool) -> Result<Self> {
        if width < 2 {
            return Err(Error::BadConfiguration("WindowBoothMultiplier width must be at least 2"));
        }
        let core = MultiplierCore::new(
            formulas,
            &[
                FormulaKind::Addition,
                FormulaKind::Doubling,
                FormulaKind::Negation,
            ],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(WindowBoothMultiplier {
            core,
            width,
            table: BTreeMap::new(),
        })
    }
}

impl ScalarMultiplier for WindowBoothMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point.clone(), bits);
        ctx.enter_action(&Action::Precomputation { point: point.clone() });
        let half = 1i64 << (self.width - 1);
        let mut table = BTreeMap::new();
        let mut acc = point.clone();
        table.insert(1i64, point.clone());
        for k in 2..=half {
            acc = self.core.add(&acc, &point, ctx)?;
            table.insert(k, acc.clone());
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
        let digits = booth_recode(scalar, self.width);
        let mut q = self.core.neutral()?;
        for &d in digits.iter().rev() {
            for _ in 0..self.width {
                q = self.core.dbl(&q, ctx)?;
            }
            if d != 0 {
                let base = self.table.get(&d.abs()).ok_or(Error::Uninitialized)?;
                let term = if d > 0 {
                    base.clone()
                } else {
                    self.core.neg(base, ctx)?
                };
                q = self.core.accumulate(&q, &term, ctx)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(q.clone()));
        Ok(q)
    }
}
