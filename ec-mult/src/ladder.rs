//! Montgomery-ladder multipliers.
//!
//! Grounded on `examples/original_source/pyecsca/ec/mult/ladder.py`'s
//! `LadderMultiplier`/`SimpleLadderMultiplier`/`DifferentialLadderMultiplier`.

use num_bigint::BigUint;
use num_traits::Zero;

use ec_core::{Action, ActionResult, Context, DomainParameters, FormulaKind, NullContext, Point};
use modfield::Mod;

use crate::base::{AccumulationOrder, Formulas, MultiplierCore, ScalarMultiplier};
use crate::error::{Error, Result};

/// Montgomery ladder via a unified `LadderFormula` (simultaneous double +
/// differential add). `complete` starts `(p0, p1) = (neutral, point)` and
/// scans all `bits` steps; otherwise starts `(point, 2*point)` and scans
/// from `scalar.bits()-2` down, which requires a doubling formula for the
/// start step (and is incompatible with `short_circuit`, since the
/// incomplete start step relies on `point` never being neutral).
#[derive(Clone, Debug)]
pub struct LadderMultiplier {
    core: MultiplierCore,
    complete: bool,
}

impl LadderMultiplier {
    /// Build a ladder multiplier. `formulas.dbl` is required unless
    /// `complete` is true and `short_circuit` is false.
    pub fn new(formulas: Formulas, complete: bool, short_circuit: bool) -> Result<Self> {
        if formulas.dbl.is_none() && (!complete || short_circuit) {
            return Err(Error::BadConfiguration(
                "LadderMultiplier needs a doubling formula unless complete and not short-circuiting",
            ));
        }
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Ladder],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(LadderMultiplier { core, complete })
    }
}

impl ScalarMultiplier for LadderMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        _ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point, bits);
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if scalar.is_zero() {
            return self.core.neutral();
        }
        let diff = self.core.point()?.clone();
        ctx.enter_action(&Action::ScalarMultiplication {
            point: diff.clone(),
            scalar: scalar.clone(),
        });
        let (mut p0, mut p1) = if self.complete {
            (self.core.neutral()?, diff.clone())
        } else {
            let doubled = self.core.dbl(&diff, &mut NullContext)?;
            (diff.clone(), doubled)
        };
        let top = if self.complete {
            self.core.bits()?
        } else {
            scalar.bits().saturating_sub(1)
        };
        for i in (0..top).rev() {
            if scalar.bit(i) {
                let (dbl, add) = self.core.ladd(&diff, &p1, &p0, ctx)?;
                p1 = dbl;
                p0 = add;
            } else {
                let (dbl, add) = self.core.ladd(&diff, &p0, &p1, ctx)?;
                p0 = dbl;
                p1 = add;
            }
        }
        let result = if self.core.formulas.scl.is_some() {
            self.core.scl(&p0, ctx)?
        } else {
            p0
        };
        ctx.exit_action(&ActionResult::Point(result.clone()));
        Ok(result)
    }
}

/// Ladder built from separate `add`+`dbl` formulas instead of a unified
/// ladder formula.
#[derive(Clone, Debug)]
pub struct SimpleLadderMultiplier {
    core: MultiplierCore,
}

impl SimpleLadderMultiplier {
    /// Build a simple-ladder multiplier.
    pub fn new(formulas: Formulas, short_circuit: bool) -> Result<Self> {
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(SimpleLadderMultiplier { core })
    }
}

impl ScalarMultiplier for SimpleLadderMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        _ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point, bits);
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
        let bits = self.core.bits()?;
        let (mut p0, mut p1) = (self.core.neutral()?, point);
        for i in (0..bits).rev() {
            if scalar.bit(i) {
                p0 = self.core.add(&p0, &p1, ctx)?;
                p1 = self.core.dbl(&p1, ctx)?;
            } else {
                p1 = self.core.add(&p0, &p1, ctx)?;
                p0 = self.core.dbl(&p0, ctx)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(p0.clone()));
        Ok(p0)
    }
}

/// Ladder built from a `dadd`+`dbl` pair rather than a unified ladder
/// formula or plain addition.
#[derive(Clone, Debug)]
pub struct DifferentialLadderMultiplier {
    core: MultiplierCore,
}

impl DifferentialLadderMultiplier {
    /// Build a differential-ladder multiplier.
    pub fn new(formulas: Formulas, short_circuit: bool) -> Result<Self> {
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::DifferentialAddition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(DifferentialLadderMultiplier { core })
    }
}

impl ScalarMultiplier for DifferentialLadderMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        _ctx: &mut dyn Context,
    ) -> Result<()> {
        self.core.set_state(params, point, bits);
        Ok(())
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if scalar.is_zero() {
            return self.core.neutral();
        }
        let diff = self.core.point()?.clone();
        ctx.enter_action(&Action::ScalarMultiplication {
            point: diff.clone(),
            scalar: scalar.clone(),
        });
        let bits = self.core.bits()?;
        let (mut p0, mut p1) = (self.core.neutral()?, diff.clone());
        for i in (0..bits).rev() {
            if scalar.bit(i) {
                p0 = self.core.dadd(&diff, &p1, &p0, ctx)?;
                p1 = self.core.dbl(&p1, ctx)?;
            } else {
                p1 = self.core.dadd(&diff, &p0, &p1, ctx)?;
                p0 = self.core.dbl(&p0, ctx)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(p0.clone()));
        Ok(p0)
    }
}
