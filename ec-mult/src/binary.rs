//! Classic double-and-add multipliers.
//!
//! Grounded on `examples/original_source/pyecsca/ec/mult/binary.py`'s
//! `DoubleAndAddMultiplier`/`LTRMultiplier`/`RTLMultiplier`/`CoronMultiplier`.

use num_bigint::BigUint;

use ec_core::{Context, DomainParameters, FormulaKind, Point};
use modfield::Mod;

use crate::base::{AccumulationOrder, Formulas, MultiplierCore, ProcessingDirection, ScalarMultiplier};
use crate::error::Result;

/// Double-and-add, scanning the scalar MSB→LSB or LSB→MSB depending on
/// `direction`. `always` inserts a dummy accumulation on zero bits so the
/// number of formula calls does not depend on the scalar's Hamming weight.
/// `complete` iterates for exactly `bits` steps regardless of the
/// scalar's true bit length.
#[derive(Clone, Debug)]
pub struct DoubleAndAddMultiplier {
    core: MultiplierCore,
    direction: ProcessingDirection,
    always: bool,
    complete: bool,
}

impl DoubleAndAddMultiplier {
    /// Build a double-and-add multiplier.
    pub fn new(
        formulas: Formulas,
        direction: ProcessingDirection,
        always: bool,
        complete: bool,
        short_circuit: bool,
    ) -> Result<Self> {
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(DoubleAndAddMultiplier {
            core,
            direction,
            always,
            complete,
        })
    }

    fn ltr(&self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let bits = self.core.bits()?;
        let point = self.core.point()?.clone();
        if self.complete {
            let mut q = self.core.neutral()?;
            for i in (0..bits).rev() {
                q = self.core.dbl(&q, ctx)?;
                if scalar.bit(i) {
                    q = self.core.accumulate(&q, &point, ctx)?;
                } else if self.always {
                    let _ = self.core.accumulate(&q, &point, ctx)?;
                }
            }
            Ok(q)
        } else {
            let top = scalar.bits() - 1;
            let mut q = point.clone();
            for i in (0..top).rev() {
                q = self.core.dbl(&q, ctx)?;
                if scalar.bit(i) {
                    q = self.core.accumulate(&q, &point, ctx)?;
                } else if self.always {
                    let _ = self.core.accumulate(&q, &point, ctx)?;
                }
            }
            Ok(q)
        }
    }

    fn rtl(&self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        let bits = self.core.bits()?;
        let point = self.core.point()?.clone();
        let mut q = self.core.neutral()?;
        let mut r = point;
        if self.complete {
            for i in 0..bits {
                if scalar.bit(i) {
                    q = self.core.accumulate(&q, &r, ctx)?;
                } else if self.always {
                    let _ = self.core.accumulate(&q, &r, ctx)?;
                }
                r = self.core.dbl(&r, ctx)?;
            }
        } else {
            let top = scalar.bits().saturating_sub(1);
            for i in 0..top {
                if scalar.bit(i) {
                    q = self.core.accumulate(&q, &r, ctx)?;
                } else if self.always {
                    let _ = self.core.accumulate(&q, &r, ctx)?;
                }
                r = self.core.dbl(&r, ctx)?;
            }
            // Top bit is always set (it is the scalar's MSB); no dummy
            // branch needed here regardless of `always`.
            q = self.core.accumulate(&q, &r, ctx)?;
        }
        Ok(q)
    }
}

impl ScalarMultiplier for DoubleAndAddMultiplier {
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
        use num_traits::Zero;
        if scalar.is_zero() {
            return self.core.neutral();
        }
        ctx.enter_action(&ec_core::Action::ScalarMultiplication {
            point: self.core.point()?.clone(),
            scalar: scalar.clone(),
        });
        let result = match self.direction {
            ProcessingDirection::LeftToRight => self.ltr(scalar, ctx)?,
            ProcessingDirection::RightToLeft => self.rtl(scalar, ctx)?,
        };
        let result = if self.core.formulas.scl.is_some() {
            self.core.scl(&result, ctx)?
        } else {
            result
        };
        ctx.exit_action(&ec_core::ActionResult::Point(result.clone()));
        Ok(result)
    }
}

/// Scans MSB→LSB.
#[derive(Clone, Debug)]
pub struct LTRMultiplier(DoubleAndAddMultiplier);

impl LTRMultiplier {
    /// Build an LTR double-and-add multiplier.
    pub fn new(formulas: Formulas, always: bool, complete: bool, short_circuit: bool) -> Result<Self> {
        Ok(LTRMultiplier(DoubleAndAddMultiplier::new(
            formulas,
            ProcessingDirection::LeftToRight,
            always,
            complete,
            short_circuit,
        )?))
    }
}

impl ScalarMultiplier for LTRMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.0.init(params, point, bits, ctx)
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        self.0.multiply(scalar, ctx)
    }
}

/// Scans LSB→MSB.
#[derive(Clone, Debug)]
pub struct RTLMultiplier(DoubleAndAddMultiplier);

impl RTLMultiplier {
    /// Build an RTL double-and-add multiplier.
    pub fn new(formulas: Formulas, always: bool, complete: bool, short_circuit: bool) -> Result<Self> {
        Ok(RTLMultiplier(DoubleAndAddMultiplier::new(
            formulas,
            ProcessingDirection::RightToLeft,
            always,
            complete,
            short_circuit,
        )?))
    }
}

impl ScalarMultiplier for RTLMultiplier {
    fn init(
        &mut self,
        params: DomainParameters,
        point: Point<Mod>,
        bits: Option<u64>,
        ctx: &mut dyn Context,
    ) -> Result<()> {
        self.0.init(params, point, bits, ctx)
    }

    fn multiply(&mut self, scalar: &BigUint, ctx: &mut dyn Context) -> Result<Point<Mod>> {
        self.0.multiply(scalar, ctx)
    }
}

/// Always doubles and adds; selects which accumulator the add feeds into
/// by scalar bit, scanning from the second-top bit down. Does not use
/// [`crate::base::AccumulationOrder`] the way `DoubleAndAddMultiplier`
/// does — it swaps accumulators outright instead.
#[derive(Clone, Debug)]
pub struct CoronMultiplier {
    core: MultiplierCore,
}

impl CoronMultiplier {
    /// Build a Coron multiplier.
    pub fn new(formulas: Formulas, short_circuit: bool) -> Result<Self> {
        let core = MultiplierCore::new(
            formulas,
            &[FormulaKind::Addition, FormulaKind::Doubling],
            short_circuit,
            AccumulationOrder::PeqPR,
        )?;
        Ok(CoronMultiplier { core })
    }
}

impl ScalarMultiplier for CoronMultiplier {
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
        use num_traits::Zero;
        if scalar.is_zero() {
            return self.core.neutral();
        }
        let point = self.core.point()?.clone();
        ctx.enter_action(&ec_core::Action::ScalarMultiplication {
            point: point.clone(),
            scalar: scalar.clone(),
        });
        let top = scalar.bits() - 1;
        let mut p0 = point.clone();
        for i in (0..top).rev() {
            let p1 = self.core.add(&p0, &point, ctx)?;
            p0 = self.core.dbl(&p0, ctx)?;
            if scalar.bit(i) {
                p0 = p1;
            }
        }
        ctx.exit_action(&ec_core::ActionResult::Point(p0.clone()));
        Ok(p0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use ec_core::{Assumption, CodeOp, CoordinateModel, CurveModel, EllipticCurve, Formula, FormulaKind as FK, OpKind, Operand};
    use modfield::symbolic::Expr;
    use rustc_hash::FxHashMap;

    // y^2 = x^3 + 2x + 3 over GF(97), same toy curve ec-core's own tests use.
    fn toy_params() -> DomainParameters {
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
        let model = CurveModel::new(
            "shortw",
            alloc::vec!["a".into(), "b".into()],
            alloc::vec!["x".into(), "y".into()],
            equation,
            base_addition.clone(),
            base_doubling.clone(),
            base_negation.clone(),
            alloc::vec::Vec::new(),
        );
        let coordinate_model = Rc::new(CoordinateModel::affine(model.clone()));
        let mut parameters = FxHashMap::default();
        parameters.insert("a".to_string(), Mod::from_u64(2, p.clone()));
        parameters.insert("b".to_string(), Mod::from_u64(3, p.clone()));
        let neutral = Point::infinity(coordinate_model.clone());
        let curve = EllipticCurve::new(model, coordinate_model, p.clone(), parameters, neutral).unwrap();
        let mut coords = FxHashMap::default();
        coords.insert("x".to_string(), Mod::from_u64(3, p.clone()));
        coords.insert("y".to_string(), Mod::from_u64(6, p.clone()));
        let generator = Point::new(curve.coordinate_model.clone(), coords).unwrap();
        DomainParameters {
            curve: Rc::new(curve),
            generator,
            order: BigUint::from(5u32),
            cofactor: BigUint::from(1u32),
            name: None,
            category: None,
        }
    }

    fn affine_formula(kind: FK, code: alloc::vec::Vec<CodeOp>, coordinate_model: &Rc<CoordinateModel>) -> Formula {
        Formula {
            name: alloc::format!("toy-{}", kind.shortname()),
            kind,
            coordinate_model: coordinate_model.clone(),
            parameters: alloc::vec::Vec::new(),
            assumptions: alloc::vec::Vec::new(),
            code,
            unified: false,
            source: None,
        }
    }

    fn toy_formulas(params: &DomainParameters) -> Formulas {
        let model = &params.curve.coordinate_model;
        let add_code = alloc::vec![
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
        let dbl_code = alloc::vec![
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
        Formulas {
            add: Some(affine_formula(FK::Addition, add_code, model)),
            dbl: Some(affine_formula(FK::Doubling, dbl_code, model)),
            tpl: None,
            neg: None,
            scl: None,
            dadd: None,
            ladd: None,
        }
    }

    #[test]
    fn ltr_matches_naive_curve_multiply() {
        let params = toy_params();
        let formulas = toy_formulas(&params);
        let mut mult = LTRMultiplier::new(formulas, false, false, true).unwrap();
        let mut ctx = ec_core::NullContext;
        mult.init(params.clone(), params.generator.clone(), None, &mut ctx)
            .unwrap();
        let k = BigUint::from(3u32);
        let got = mult.multiply(&k, &mut ctx).unwrap();
        let want = params.curve.multiply(&params.generator, &k).unwrap();
        assert!(got.equals(&want));
    }

    #[test]
    fn rtl_matches_naive_curve_multiply() {
        let params = toy_params();
        let formulas = toy_formulas(&params);
        let mut mult = RTLMultiplier::new(formulas, false, false, true).unwrap();
        let mut ctx = ec_core::NullContext;
        mult.init(params.clone(), params.generator.clone(), None, &mut ctx)
            .unwrap();
        let k = BigUint::from(4u32);
        let got = mult.multiply(&k, &mut ctx).unwrap();
        let want = params.curve.multiply(&params.generator, &k).unwrap();
        assert!(got.equals(&want));
    }

    #[test]
    fn coron_matches_naive_curve_multiply() {
        let params = toy_params();
        let formulas = toy_formulas(&params);
        let mut mult = CoronMultiplier::new(formulas, true).unwrap();
        let mut ctx = ec_core::NullContext;
        mult.init(params.clone(), params.generator.clone(), None, &mut ctx)
            .unwrap();
        let k = BigUint::from(3u32);
        let got = mult.multiply(&k, &mut ctx).unwrap();
        let want = params.curve.multiply(&params.generator, &k).unwrap();
        assert!(got.equals(&want));
    }

    #[test]
    fn scalar_zero_returns_neutral() {
        let params = toy_params();
        let formulas = toy_formulas(&params);
        let mut mult = LTRMultiplier::new(formulas, false, false, true).unwrap();
        let mut ctx = ec_core::NullContext;
        mult.init(params.clone(), params.generator.clone(), None, &mut ctx)
            .unwrap();
        let got = mult.multiply(&BigUint::from(0u32), &mut ctx).unwrap();
        assert!(got.is_infinity());
    }
}
