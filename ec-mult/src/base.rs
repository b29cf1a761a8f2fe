//! Shared machinery every scalar multiplier embeds: formula bundles,
//! short-circuit/accumulation-order policy, and post-`init` state.
//!
//! Grounded on `examples/original_source/pyecsca/ec/mult/base.py`'s
//! `ScalarMultiplier`/`AccumulatorMultiplier`. That hierarchy is built from
//! two mixins Python composes via multiple inheritance
//! (`class LTRMultiplier(AccumulatorMultiplier, ScalarMultiplier)`); Rust
//! has no mixin inheritance, so [`MultiplierCore`] bundles both mixins'
//! state and behavior into one struct that each concrete multiplier wraps
//! and delegates to (spec.md §9's redesign flag), exposed through the
//! [`ScalarMultiplier`] trait every multiplier implements.

use alloc::rc::Rc;
use alloc::vec::Vec;
use num_bigint::BigUint;

use ec_core::{Context, DomainParameters, Formula, FormulaKind, Point};
use modfield::Mod;

use crate::error::{Error, Result};

/// Which direction a multiplier scans the scalar's bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessingDirection {
    /// Most-significant bit first.
    LeftToRight,
    /// Least-significant bit first.
    RightToLeft,
}

/// Whether the running accumulator is the first or second argument to the
/// addition formula: `[r]G + [k]P` is not always equal to `[k]P + [r]G`
/// once represented in a fixed coordinate system, since the two inputs
/// may land in different projective classes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccumulationOrder {
    /// `accumulator = add(accumulator, term)`.
    PeqPR,
    /// `accumulator = add(term, accumulator)`.
    PeqRP,
}

/// The formula bundle a multiplier was constructed with. Every field a
/// concrete multiplier actually needs must be `Some`; the rest are opt-in.
#[derive(Clone, Debug, Default)]
pub struct Formulas {
    /// Addition formula.
    pub add: Option<Formula>,
    /// Doubling formula.
    pub dbl: Option<Formula>,
    /// Tripling formula.
    pub tpl: Option<Formula>,
    /// Negation formula.
    pub neg: Option<Formula>,
    /// Scaling formula.
    pub scl: Option<Formula>,
    /// Differential addition formula.
    pub dadd: Option<Formula>,
    /// Montgomery-ladder formula.
    pub ladd: Option<Formula>,
}

impl Formulas {
    /// The one coordinate model every supplied formula shares, or `None`
    /// if no formula was supplied at all.
    fn shared_coordinate_model(&self) -> Option<&Rc<ec_core::CoordinateModel>> {
        [
            &self.add, &self.dbl, &self.tpl, &self.neg, &self.scl, &self.dadd, &self.ladd,
        ]
        .into_iter()
        .flatten()
        .map(|f| &f.coordinate_model)
        .next()
    }

    /// Validate that every supplied formula shares one coordinate model
    /// and that `required` kinds are all present.
    fn validate(&self, required: &[FormulaKind]) -> Result<()> {
        let formulas: Vec<(&Option<Formula>, FormulaKind, &'static str)> = alloc::vec![
            (&self.add, FormulaKind::Addition, "addition"),
            (&self.dbl, FormulaKind::Doubling, "doubling"),
            (&self.tpl, FormulaKind::Tripling, "tripling"),
            (&self.neg, FormulaKind::Negation, "negation"),
            (&self.scl, FormulaKind::Scaling, "scaling"),
            (
                &self.dadd,
                FormulaKind::DifferentialAddition,
                "differential addition",
            ),
            (&self.ladd, FormulaKind::Ladder, "ladder"),
        ];
        if let Some(shared) = self.shared_coordinate_model() {
            for (formula, _, _) in &formulas {
                if let Some(formula) = formula {
                    if !Rc::ptr_eq(&formula.coordinate_model, shared)
                        && formula.coordinate_model != *shared
                    {
                        return Err(Error::MixedCoordinateModel);
                    }
                }
            }
        }
        for kind in required {
            let present = formulas
                .iter()
                .any(|(f, k, _)| k == kind && f.is_some());
            if !present {
                let name = formulas.iter().find(|(_, k, _)| k == kind).unwrap().2;
                return Err(Error::MissingFormula(name));
            }
        }
        Ok(())
    }
}

/// Post-`init` state plus the formula bundle and policy flags, shared by
/// every concrete multiplier. Not itself a [`ScalarMultiplier`] — each
/// variant wraps one and adds its own recoding/precomputation state.
#[derive(Clone, Debug)]
pub struct MultiplierCore {
    /// The formulas this multiplier was built with.
    pub formulas: Formulas,
    /// Whether a neutral-element input short-circuits a formula call
    /// instead of executing it. Disabling this is necessary for
    /// fault/exception analyses that need every formula actually invoked.
    pub short_circuit: bool,
    /// Which argument position the running accumulator occupies in an
    /// addition.
    pub accumulation_order: AccumulationOrder,
    state: Option<State>,
}

#[derive(Clone, Debug)]
struct State {
    params: DomainParameters,
    point: Point<Mod>,
    bits: u64,
}

impl MultiplierCore {
    /// Build a core with `formulas`, validating that `required` kinds are
    /// present and that every supplied formula shares one coordinate
    /// model.
    pub fn new(
        formulas: Formulas,
        required: &[FormulaKind],
        short_circuit: bool,
        accumulation_order: AccumulationOrder,
    ) -> Result<Self> {
        formulas.validate(required)?;
        Ok(MultiplierCore {
            formulas,
            short_circuit,
            accumulation_order,
            state: None,
        })
    }

    /// Record the initialized domain parameters, base point, and bit
    /// length a `multiply` call will scan.
    pub fn set_state(&mut self, params: DomainParameters, point: Point<Mod>, bits: Option<u64>) {
        let bits = bits.unwrap_or_else(|| params.full_order().bits());
        self.state = Some(State {
            params,
            point,
            bits,
        });
    }

    fn state(&self) -> Result<&State> {
        self.state.as_ref().ok_or(Error::Uninitialized)
    }

    /// The domain parameters passed to `init`.
    pub fn params(&self) -> Result<&DomainParameters> {
        Ok(&self.state()?.params)
    }

    /// The point passed to `init`.
    pub fn point(&self) -> Result<&Point<Mod>> {
        Ok(&self.state()?.point)
    }

    /// The bit length `multiply` scans (explicit, or `full_order.bits()`).
    pub fn bits(&self) -> Result<u64> {
        Ok(self.state()?.bits)
    }

    /// The curve's neutral element, in this multiplier's coordinate
    /// model.
    pub fn neutral(&self) -> Result<Point<Mod>> {
        Ok(self.params()?.curve.neutral.clone())
    }

    fn call(
        &self,
        formula: &Option<Formula>,
        kind_name: &'static str,
        points: &[Point<Mod>],
        ctx: &mut dyn Context,
    ) -> Result<Vec<Point<Mod>>> {
        let formula = formula.as_ref().ok_or(Error::MissingFormula(kind_name))?;
        let curve = &self.state()?.params.curve;
        Ok(formula.call(&curve.p, points, &curve.parameters, ctx)?)
    }

    /// `p1 + p2`, short-circuiting on either input being neutral.
    pub fn add(&self, p1: &Point<Mod>, p2: &Point<Mod>, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if self.short_circuit {
            if p1.is_infinity() {
                return Ok(p2.clone());
            }
            if p2.is_infinity() {
                return Ok(p1.clone());
            }
        }
        let out = self.call(&self.formulas.add, "addition", &[p1.clone(), p2.clone()], ctx)?;
        Ok(out.into_iter().next().unwrap())
    }

    /// `2 * p`, short-circuiting on `p` being neutral.
    pub fn dbl(&self, p: &Point<Mod>, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if self.short_circuit && p.is_infinity() {
            return Ok(p.clone());
        }
        let out = self.call(&self.formulas.dbl, "doubling", &[p.clone()], ctx)?;
        Ok(out.into_iter().next().unwrap())
    }

    /// `3 * p`, short-circuiting on `p` being neutral.
    pub fn tpl(&self, p: &Point<Mod>, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if self.short_circuit && p.is_infinity() {
            return Ok(p.clone());
        }
        let out = self.call(&self.formulas.tpl, "tripling", &[p.clone()], ctx)?;
        Ok(out.into_iter().next().unwrap())
    }

    /// `-p`, short-circuiting on `p` being neutral.
    pub fn neg(&self, p: &Point<Mod>, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if self.short_circuit && p.is_infinity() {
            return Ok(p.clone());
        }
        let out = self.call(&self.formulas.neg, "negation", &[p.clone()], ctx)?;
        Ok(out.into_iter().next().unwrap())
    }

    /// Rescale `p`'s representative within its projective class.
    pub fn scl(&self, p: &Point<Mod>, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        if self.short_circuit && p.is_infinity() {
            return Ok(p.clone());
        }
        let out = self.call(&self.formulas.scl, "scaling", &[p.clone()], ctx)?;
        Ok(out.into_iter().next().unwrap())
    }

    /// Differential addition: `p2 - p1` known to be `diff`.
    pub fn dadd(
        &self,
        diff: &Point<Mod>,
        p1: &Point<Mod>,
        p2: &Point<Mod>,
        ctx: &mut dyn Context,
    ) -> Result<Point<Mod>> {
        let out = self.call(
            &self.formulas.dadd,
            "differential addition",
            &[diff.clone(), p1.clone(), p2.clone()],
            ctx,
        )?;
        Ok(out.into_iter().next().unwrap())
    }

    /// Montgomery-ladder step: returns `(2*p1, p1+p2)` given `diff = p2-p1`.
    pub fn ladd(
        &self,
        diff: &Point<Mod>,
        p1: &Point<Mod>,
        p2: &Point<Mod>,
        ctx: &mut dyn Context,
    ) -> Result<(Point<Mod>, Point<Mod>)> {
        let out = self.call(
            &self.formulas.ladd,
            "ladder",
            &[diff.clone(), p1.clone(), p2.clone()],
            ctx,
        )?;
        let mut it = out.into_iter();
        let dbl = it.next().unwrap();
        let add = it.next().unwrap();
        Ok((dbl, add))
    }

    /// Accumulate `term` into `accumulator` per `self.accumulation_order`.
    pub fn accumulate(
        &self,
        accumulator: &Point<Mod>,
        term: &Point<Mod>,
        ctx: &mut dyn Context,
    ) -> Result<Point<Mod>> {
        match self.accumulation_order {
            AccumulationOrder::PeqPR => self.add(accumulator, term, ctx),
            AccumulationOrder::PeqRP => self.add(term, accumulator, ctx),
        }
    }
}

/// The public multiplier contract every variant in this crate implements
/// (spec.md §4.4).
pub trait ScalarMultiplier {
    /// Bind domain parameters and a base point, optionally precomputing
    /// auxiliary points inside a `PrecomputationAction`. `bits` defaults
    /// to `full_order().bits()`.
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()>;

    /// Compute `[scalar] point`. Must be called after `init`. Opens a
    /// `ScalarMultiplicationAction`; returns the neutral point on
    /// `scalar == 0`.
    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formulas_reject_missing_required_kind() {
        let formulas = Formulas::default();
        let err = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            true,
            AccumulationOrder::PeqPR,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingFormula("addition")));
    }

    #[test]
    fn core_methods_fail_uninitialized() {
        let core = MultiplierCore::new(Formulas::default(), &[], true, AccumulationOrder::PeqPR).unwrap();
        assert!(matches!(core.bits(), Err(Error::Uninitialized)));
    }
}
