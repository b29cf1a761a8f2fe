//! NAF-recoded double-and-add multipliers.
//!
//! Grounded on `examples/original_source/pyecsca/ec/mult/naf.py`'s
//! `BinaryNAFMultiplier`/`WindowNAFMultiplier`.

use alloc::collections::BTreeMap;
use num_bigint::BigUint;
use num_traits::Zero;

use ec_core::{Action, ActionResult, Context, DomainParameters, FormulaKind, Point};
use modfield::Mod;

use crate::base::{AccumulationOrder, Formulas, MultiplierCore, ProcessingDirection, ScalarMultiplier};
use crate::error::{Error, Result};
use crate::recoding::{naf, wnaf};

/// Recodes the scalar as a plain NAF, then runs double-and-add over the
/// signed digits, adding the point or its precomputed negation.
///
/// Grounded on the source's `init()` precomputing `-point` inside a
/// `PrecomputationAction` up front — whether that negation itself is
/// precomputed or computed lazily per negative digit is an open
/// parameter there too; this multiplier always precomputes it.
#[derive(Clone, Debug)]
pub struct BinaryNafMultiplier {
    core: MultiplierCore,
    direction: ProcessingDirection,
    neg_point: Option<Point<Mod>>,
}

impl BinaryNafMultiplier {
    /// Build a binary-NAF multiplier.
    pub fn new(formulas: Formulas, direction: ProcessingDirection, short_circuit: bool) -> Result<Self> {
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
        Ok(BinaryNafMultiplier {
            core,
            direction,
            neg_point: None,
        })
    }
}

impl ScalarMultiplier for BinaryNafMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point.clone(), bits);
        ctx.enter_action(&Action::Precomputation { point: point.clone() });
        let neg_point = self.core.neg(&point, ctx)?;
        ctx.exit_action(&ActionResult::Point(neg_point.clone()));
        self.neg_point = Some(neg_point);
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if scalar.is_zero() {
            return self.core.neutral();
        }
        let point = self.core.point()?.clone();
        let neg_point = self.neg_point.clone().ok_or(Error::Uninitialized)?;
        ctx.enter_action(&Action::ScalarMultiplication {
            point: point.clone(),
            scalar: scalar.clone(),
        });
        let digits = naf(scalar);
        let term = |d: i64| -> Point<Mod> {
            if d > 0 {
                point.clone()
            } else {
                neg_point.clone()
            }
        };
        let result = match self.direction {
            ProcessingDirection::LeftToRight => {
                let mut q = self.core.neutral()?;
                for &d in digits.iter().rev() {
                    q = self.core.dbl(&q, ctx)?;
                    if d != 0 {
                        q = self.core.accumulate(&q, &term(d), ctx)?;
                    }
                }
                q
            }
            ProcessingDirection::RightToLeft => {
                let mut q = self.core.neutral()?;
                let mut r = point.clone();
                for &d in &digits {
                    if d != 0 {
                        let t = if d > 0 { r.clone() } else { self.core.neg(&r, ctx)? };
                        q = self.core.accumulate(&q, &t, ctx)?;
                    }
                    r = self.core.dbl(&r, ctx)?;
                }
                q
            }
        };
        ctx.exit_action(&ActionResult::Point(result.clone()));
        Ok(result)
    }
}

/// Width-`w` NAF: precomputes odd multiples `1, 3, 5, ..., 2^(w-1)-1`
/// times the point (and their negations, if `precompute_negation`) inside
/// a `PrecomputationAction`, then runs double-and-add over `wnaf(k, w)`.
#[derive(Clone, Debug)]
pub struct WindowNafMultiplier {
    core: MultiplierCore,
    width: u32,
    precompute_negation: bool,
    table: BTreeMap<i64, Point<Mod>>,
}

impl WindowNafMultiplier {
    /// Build a width-`w` NAF multiplier.
    pub fn new(
        formulas: Formulas,
        width: u32,
        precompute_negation: bool,
        short_circuit: bool,
    ) -> Result<Self> {
        if width < 2 {
            return Err(Error::BadConfiguration("WindowNAFMultiplier width must be at least 2"));
        }
        let mut required = alloc::vec![FormulaKind::Addition, FormulaKind::Doubling];
        if !precompute_negation {
            required.push(FormulaKind::Negation);
        }
        let core = MultiplierCore::new(formulas, &required, short_circuit, AccumulationOrder::PeqPR)?;
        Ok(WindowNafMultiplier {
            core,
            width,
            precompute_negation,
            table: BTreeMap::new(),
        })
    }
}

impl ScalarMultiplier for WindowNafMultiplier {
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
        let two_p = self.core.dbl(&point, ctx)?;
        let max_odd = (1i64 << (self.width - 1)) - 1;
        let mut current = point.clone();
        let mut d = 1i64;
        while d + 2 <= max_odd {
            current = self.core.add(&current, &two_p, ctx)?;
            d += 2;
            table.insert(d, current.clone());
        }
        if self.precompute_negation {
            let negatives: alloc::vec::Vec<(i64, Point<Mod>)> = table
                .iter()
                .map(|(&k, p)| Ok::<_, Error>((-k, self.core.neg(p, ctx)?)))
                .collect::<Result<_>>()?;
            for (k, p) in negatives {
                table.insert(k, p);
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
            point: point.clone(),
            scalar: scalar.clone(),
        });
        let digits = wnaf(scalar, self.width);
        let mut q = self.core.neutral()?;
        for &d in digits.iter().rev() {
            q = self.core.dbl(&q, ctx)?;
            if d != 0 {
                let term = if let Some(p) = self.table.get(&d) {
                    p.clone()
                } else {
                    let base = self.table.get(&d.abs()).ok_or(Error::Uninitialized)?;
                    self.core.neg(base, ctx)?
                };
                q = self.core.accumulate(&q, &term, ctx)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(q.clone()));
        Ok(q)
    }
}
