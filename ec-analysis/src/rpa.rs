//! Refined Power Analysis (RPA) distinguishing: synthesize the two
//! zero-coordinate points a short Weierstrass curve admits, and use them to
//! tell which of several candidate scalar multipliers an oracle's
//! zero-coordinate observations are consistent with (spec.md §4.7).
//!
//! Grounded on `examples/original_source/pyecsca/sca/re/rpa.py`'s
//! `MultipleContext` (already ported as `ec_core::context::MultipleContext`)
//! and on `examples/original_source/test/sca/test_rpa.py`, which is the
//! authoritative source for `rpa_point_x0`/`rpa_point_0y`'s exact
//! coordinate mapping (`rpa_point_x0` has `y == 0`, `rpa_point_0y` has
//! `x == 0` — the reverse of what the names alone suggest).
//!
//! `rpa_point_x0`'s zero-`y` point is a root of the depressed cubic
//! `x^3 + a*x + b = 0`, solved here via Cardano's formula since
//! `ec_core::formula::ground_root` (not public outside `ec-core` in any
//! case) only handles degree <= 2. `rpa_point_0y`'s zero-`x` point just
//! needs `sqrt(b)`.
//!
//! `rpa_distinguish` is deliberately built on `MultipleContext`'s abstract
//! base-point-multiple bookkeeping rather than on literal field-level
//! coordinate inspection: the oracle and the candidates are compared by
//! whether their traces ever reach one of a caller-named set of "target"
//! multiples (e.g. the RPA point itself and its negation), exactly the
//! granularity `graph_to_check_inputs` in `epa.rs` already analyzes EPA
//! checks at. A literal re-of the Python test's "does any formula operand
//! have a real zero coordinate" oracle would require `MultipleContext` to
//! retain concrete field values for every point, not just `precomp`, and
//! is left as a possible extension rather than implemented here.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use num_bigint::BigUint;
use num_traits::Zero;
use rustc_hash::FxHashMap;

use ec_core::context::MultipleContext;
use ec_core::curve::DomainParameters;
use ec_core::point::Point;
use ec_mult::ScalarMultiplier;
use modfield::Mod;

use crate::error::{Error, Result};

pub(crate) fn short_weierstrass_ab(params: &DomainParameters) -> Result<(Mod, Mod)> {
    if params.curve.model.name != "shortw" {
        return Err(Error::NoRpaPoint);
    }
    if !params.curve.coordinate_model.is_affine() {
        return Err(Error::NoRpaPoint);
    }
    let a = params.curve.parameters.get("a").cloned().ok_or(Error::NoRpaPoint)?;
    let b = params.curve.parameters.get("b").cloned().ok_or(Error::NoRpaPoint)?;
    Ok((a, b))
}

pub(crate) fn affine_point(params: &DomainParameters, x: Mod, y: Mod) -> Result<Point<Mod>> {
    let mut coords = FxHashMap::default();
    coords.insert("x".to_string(), x);
    coords.insert("y".to_string(), y);
    Ok(Point::new(params.curve.coordinate_model.clone(), coords)?)
}

/// A root of the depressed cubic `t^3 + p*t + q = 0`, via Cardano's
/// formula. `u*v = -p/3` is enforced explicitly (rather than picking
/// independent cube roots of `u^3`/`v^3`) so the two terms actually
/// recombine into a genuine root instead of an arbitrary pair.
fn cardano_root(p: &Mod, q: &Mod, modulus: &BigUint) -> Result<Mod> {
    let two = Mod::from_u64(2, modulus.clone());
    let three = Mod::from_u64(3, modulus.clone());
    let four = Mod::from_u64(4, modulus.clone());
    let twenty_seven = Mod::from_u64(27, modulus.clone());

    let neg_q = q.neg()?;
    let p_cubed = p.pow_i64(3)?;
    let discriminant = q.mul(q)?.add(&four.mul(&p_cubed)?.div(&twenty_seven)?)?;
    let sqrt_disc = discriminant.sqrt().map_err(|_| Error::NoRpaPoint)?;

    let u_cubed = neg_q.add(&sqrt_disc)?.div(&two)?;
    let u = u_cubed.cube_root().map_err(|_| Error::NoRpaPoint)?;

    let u_is_zero = u.value().map(BigUint::is_zero).unwrap_or(true);
    let x = if !u_is_zero {
        let v = p.neg()?.div(&three)?.div(&u)?;
        u.add(&v)?
    } else {
        let v_cubed = neg_q.sub(&sqrt_disc)?.div(&two)?;
        let v = v_cubed.cube_root().map_err(|_| Error::NoRpaPoint)?;
        u.add(&v)?
    };
    Ok(x)
}

/// The affine point with `y == 0` on `params`'s curve, if it has a short
/// Weierstrass model and one exists: a root of `x^3 + a*x + b = 0`.
pub fn rpa_point_x0(params: &DomainParameters) -> Result<Point<Mod>> {
    let (a, b) = short_weierstrass_ab(params)?;
    let modulus = params.curve.p.clone();
    let x = cardano_root(&a, &b, &modulus)?;
    affine_point(params, x, Mod::from_u64(0, modulus))
}

/// The affine point with `x == 0` on `params`'s curve, if it has a short
/// Weierstrass model and `b` is a quadratic residue: `y = sqrt(b)`.
pub fn rpa_point_0y(params: &DomainParameters) -> Result<Point<Mod>> {
    let (_, b) = short_weierstrass_ab(params)?;
    let modulus = params.curve.p.clone();
    let y = b.sqrt().map_err(|_| Error::NoRpaPoint)?;
    affine_point(params, Mod::from_u64(0, modulus), y)
}

/// Runs each `(name, multiplier)` candidate over `scalars` against `point`,
/// tracing it with a fresh [`MultipleContext`] per scalar, and keeps only
/// the candidates whose traced set of base-point multiples touches one of
/// `targets` on exactly the scalars `oracle` reports a hit for.
///
/// `point` is typically [`rpa_point_x0`] or [`rpa_point_0y`], and `targets`
/// the multiples a real side-channel observer would flag as
/// zero-coordinate for that point (at minimum `1`, the point itself, and
/// `-1`, its negation — both zero-coordinate on a short Weierstrass curve
/// since negation only flips `y`).
pub fn rpa_distinguish(
    params: &DomainParameters,
    point: &Point<Mod>,
    targets: &[i128],
    candidates: &mut [(&str, &mut dyn ScalarMultiplier)],
    scalars: &[BigUint],
    oracle: &dyn Fn(&BigUint) -> bool,
) -> Result<Vec<String>> {
    let mut survivors = Vec::new();
    'candidate: for (name, mult) in candidates.iter_mut() {
        for scalar in scalars {
            let mut ctx = MultipleContext::new(point.clone());
            mult.init(params.clone(), point.clone(), None, &mut ctx)?;
            mult.multiply(scalar, &mut ctx)?;
            let touched = ctx.points.values().any(|m| targets.contains(m));
            if touched != oracle(scalar) {
                continue 'candidate;
            }
        }
        survivors.push((*name).to_string());
    }
    Ok(survivors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec;
    use ec_core::{Assumption, CodeOp, CoordinateModel, CurveModel, EllipticCurve, Formula, FormulaKind, OpKind, Operand};
    use ec_mult::{Formulas, LTRMultiplier};
    use modfield::symbolic::Expr;

    fn shortw_model() -> Rc<CurveModel> {
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
        CurveModel::new(
            "shortw",
            vec!["a".into(), "b".into()],
            vec!["x".into(), "y".into()],
            equation,
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    fn toy_params(a: u64, b: i64) -> DomainParameters {
        let p = BigUint::from(97u32);
        let model = shortw_model();
        let coordinate_model = Rc::new(CoordinateModel::affine(model.clone()));
        let mut parameters = FxHashMap::default();
        parameters.insert("a".to_string(), Mod::from_u64(a, p.clone()));
        let b_abs = Mod::from_u64(b.unsigned_abs(), p.clone());
        let b_mod = if b < 0 { b_abs.neg().unwrap() } else { b_abs };
        parameters.insert("b".to_string(), b_mod);
        let neutral = Point::infinity(coordinate_model.clone());
        let curve = EllipticCurve::new(model, coordinate_model.clone(), p.clone(), parameters, neutral).unwrap();
        let mut coords = FxHashMap::default();
        coords.insert("x".to_string(), Mod::from_u64(3, p.clone()));
        coords.insert("y".to_string(), Mod::from_u64(6, p.clone()));
        let generator = Point::new(coordinate_model, coords).unwrap();
        DomainParameters {
            curve: Rc::new(curve),
            generator,
            order: BigUint::from(5u32),
            cofactor: BigUint::from(1u32),
            name: None,
            category: None,
        }
    }

    #[test]
    fn x0_point_has_zero_y_and_satisfies_the_curve_equation() {
        // a = 0, b = -8 (mod 97): x^3 = 8 has the obvious root x = 2.
        let params = toy_params(0, -8);
        let res = rpa_point_x0(&params).unwrap();
        assert_eq!(*res.coord("y").unwrap(), Mod::from_u64(0, params.curve.p.clone()));
        let a = params.curve.parameters["a"].clone();
        let b = params.curve.parameters["b"].clone();
        let x = res.coord("x").unwrap().clone();
        let lhs = x.pow_i64(3).unwrap().add(&a.mul(&x).unwrap()).unwrap().add(&b).unwrap();
        assert_eq!(lhs, Mod::from_u64(0, params.curve.p.clone()));
    }

    #[test]
    fn zero_y_point_has_zero_x_and_satisfies_the_curve_equation() {
        // a = 0, b = 4: y^2 = 4 at x = 0.
        let params = toy_params(0, 4);
        let res = rpa_point_0y(&params).unwrap();
        assert_eq!(*res.coord("x").unwrap(), Mod::from_u64(0, params.curve.p.clone()));
        let b = params.curve.parameters["b"].clone();
        let y = res.coord("y").unwrap().clone();
        assert_eq!(y.mul(&y).unwrap(), b);
    }

    fn toy_formulas(params: &DomainParameters) -> Formulas {
        let model = &params.curve.coordinate_model;
        let add_code = vec![
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
        let dbl_code = vec![
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
            add: Some(Formula {
                name: "toy-add".into(),
                kind: FormulaKind::Addition,
                coordinate_model: model.clone(),
                parameters: Vec::new(),
                assumptions: Vec::new(),
                code: add_code,
                unified: false,
                source: None,
            }),
            dbl: Some(Formula {
                name: "toy-dbl".into(),
                kind: FormulaKind::Doubling,
                coordinate_model: model.clone(),
                parameters: Vec::new(),
                assumptions: Vec::new(),
                code: dbl_code,
                unified: false,
                source: None,
            }),
            tpl: None,
            neg: None,
            scl: None,
            dadd: None,
            ladd: None,
        }
    }

    /// For any scalar with a zero bit below the top, an `always=true` LTR
    /// multiplier's dummy accumulation touches one extra base-point
    /// multiple an `always=false` run never reaches. `rpa_distinguish`
    /// should keep only the candidate whose touched set agrees with an
    /// oracle built from directly observing that extra multiple.
    #[test]
    fn distinguishes_dummy_add_ltr_from_plain_ltr() {
        let params = toy_params(2, 3);
        let point = params.generator.clone();
        let scalars = vec![BigUint::from(6u8), BigUint::from(3u8)];
        let target = 7i128; // only reachable via the dummy op at scalar = 6.

        let mut oracle_mult = LTRMultiplier::new(toy_formulas(&params), true, false, true).unwrap();
        let oracle_answers: FxHashMap<BigUint, bool> = scalars
            .iter()
            .map(|k| {
                let mut ctx = MultipleContext::new(point.clone());
                oracle_mult.init(params.clone(), point.clone(), None, &mut ctx).unwrap();
                oracle_mult.multiply(k, &mut ctx).unwrap();
                (k.clone(), ctx.points.values().any(|m| *m == target))
            })
            .collect();
        let oracle = |k: &BigUint| oracle_answers[k];

        let mut plain = LTRMultiplier::new(toy_formulas(&params), false, false, true).unwrap();
        let mut dummy = LTRMultiplier::new(toy_formulas(&params), true, false, true).unwrap();
        let mut candidates: [(&str, &mut dyn ScalarMultiplier); 2] =
            [("plain", &mut plain), ("dummy", &mut dummy)];

        let survivors =
            rpa_distinguish(&params, &point, &[target], &mut candidates, &scalars, &oracle).unwrap();
        assert_eq!(survivors, vec!["dummy".to_string()]);
    }
}
