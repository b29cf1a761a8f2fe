//! `Formula`: a named straight-line program over one coordinate model, and
//! its execution contract (spec.md §3, §4.2).
//!
//! Grounded on `examples/original_source/pyecsca/ec/formula/base.py`'s
//! `Formula.__call__` and its three `__validate_assumption_*` helpers.
//! Executes concretely over [`modfield::Mod`] — the generic-over-
//! `FieldValue` capability needed for symbolic unrolling lives directly on
//! [`CodeOp::eval`](crate::op::CodeOp::eval), since assumption solving
//! (equality checks, ground-root finding) is inherently tied to a concrete
//! field.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use num_bigint::BigUint;
use rustc_hash::FxHashMap;

use modfield::symbolic::Expr;
use modfield::Mod;

use crate::context::{Action, ActionResult, Context};
use crate::error::{Error, Result};
use crate::model::{Assumption, CoordinateModel};
use crate::op::CodeOp;
use crate::point::{suffixed, Point};

/// Which of the seven formula shapes spec.md §3 distinguishes a `Formula`
/// as.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FormulaKind {
    /// Adds two distinct points.
    Addition,
    /// Doubles a point.
    Doubling,
    /// Triples a point.
    Tripling,
    /// Negates a point.
    Negation,
    /// Rescales a point's representative within its projective class.
    Scaling,
    /// Adds two points of known difference (`P0 = P2 - P1`).
    DifferentialAddition,
    /// Montgomery-ladder step: simultaneous double and differential add.
    Ladder,
}

impl FormulaKind {
    /// Shortname as used in the EFD and by `crate::context::Action`.
    pub fn shortname(self) -> &'static str {
        match self {
            FormulaKind::Addition => "add",
            FormulaKind::Doubling => "dbl",
            FormulaKind::Tripling => "tpl",
            FormulaKind::Negation => "neg",
            FormulaKind::Scaling => "scl",
            FormulaKind::DifferentialAddition => "dadd",
            FormulaKind::Ladder => "ladd",
        }
    }

    /// Number of input points this kind of formula takes.
    pub fn num_inputs(self) -> usize {
        match self {
            FormulaKind::Addition => 2,
            FormulaKind::Doubling
            | FormulaKind::Tripling
            | FormulaKind::Negation
            | FormulaKind::Scaling => 1,
            FormulaKind::DifferentialAddition | FormulaKind::Ladder => 3,
        }
    }

    /// Number of output points this kind of formula produces.
    pub fn num_outputs(self) -> usize {
        match self {
            FormulaKind::Ladder => 2,
            _ => 1,
        }
    }
}

/// A named program operating on one [`CoordinateModel`].
#[derive(Clone, Debug)]
pub struct Formula {
    /// Formula name, e.g. `"add-2007-bl"`.
    pub name: String,
    /// Which shape this formula has.
    pub kind: FormulaKind,
    /// The coordinate system this formula's inputs/outputs are expressed
    /// in.
    pub coordinate_model: Rc<CoordinateModel>,
    /// Free parameters this formula introduces (e.g. `half = 1/2`).
    pub parameters: Vec<String>,
    /// Equational assumptions (on inputs, or defining a parameter).
    pub assumptions: Vec<Assumption>,
    /// The straight-line code.
    pub code: Vec<CodeOp>,
    /// Whether this formula is safe to use when its inputs coincide
    /// (`P == Q` for an addition formula).
    pub unified: bool,
    /// Where this formula came from (EFD source file, synthesized by a
    /// `FormulaGraph` transform, ...). Purely informational.
    pub source: Option<String>,
}

impl Formula {
    /// Index at which this formula starts reading input-point coordinates
    /// (always `1`, per spec.md §4.2).
    pub fn input_index(&self) -> usize {
        1
    }

    /// Index at which this formula starts writing output-point
    /// coordinates.
    pub fn output_index(&self) -> usize {
        core::cmp::max(self.kind.num_inputs() + 1, 3)
    }

    /// Number of field multiplications in this formula's code.
    pub fn num_multiplications(&self) -> usize {
        self.code
            .iter()
            .filter(|op| op.op == crate::op::OpKind::Mult)
            .count()
    }

    /// Number of field squarings in this formula's code.
    pub fn num_squarings(&self) -> usize {
        self.code
            .iter()
            .filter(|op| op.op == crate::op::OpKind::Sqr)
            .count()
    }

    /// Number of field inversions in this formula's code.
    pub fn num_inversions(&self) -> usize {
        self.code
            .iter()
            .filter(|op| op.op == crate::op::OpKind::Inv)
            .count()
    }

    /// Number of additions and subtractions in this formula's code.
    pub fn num_addsubs(&self) -> usize {
        self.code
            .iter()
            .filter(|op| matches!(op.op, crate::op::OpKind::Add | crate::op::OpKind::Sub))
            .count()
    }

    fn validate_points(&self, p: &BigUint, points: &[Point<Mod>]) -> Result<FxHashMap<String, Mod>> {
        if points.len() != self.kind.num_inputs() {
            return Err(Error::InputMismatch);
        }
        let mut locals = FxHashMap::default();
        for (i, point) in points.iter().enumerate() {
            if !Rc::ptr_eq(point.coordinate_model(), &self.coordinate_model)
                && point.coordinate_model() != &self.coordinate_model
            {
                return Err(Error::InputMismatch);
            }
            for name in &self.coordinate_model.variables {
                let value = point.coord(name).ok_or(Error::InputMismatch)?;
                if value.modulus().ok() != Some(p) {
                    return Err(Error::InputMismatch);
                }
                locals.insert(suffixed(name, i + 1), value.clone());
            }
        }
        Ok(locals)
    }

    fn validate_params(&self, p: &BigUint, params: &FxHashMap<String, Mod>) -> Result<()> {
        for value in params.values() {
            if value.modulus().ok() != Some(p) {
                return Err(Error::InputMismatch);
            }
        }
        Ok(())
    }

    /// Evaluate assumptions against `locals`, binding any formula
    /// parameters they define and validating any point-value checks.
    /// Mutates `locals` in place (spec.md §4.2 step 3).
    fn resolve_assumptions(&self, p: &BigUint, locals: &mut FxHashMap<String, Mod>) -> Result<()> {
        for assumption in &self.assumptions {
            let Some(name) = assumption.defines() else {
                // Generic equation: the unknown may appear non-trivially
                // on either side. Handled below regardless of shape.
                self.resolve_generic_equation(p, locals, assumption)?;
                continue;
            };
            if locals.contains_key(name) {
                // Point-value assumption, e.g. `Z1 == 1`.
                let lhs = eval_expr(&assumption.lhs, locals)?;
                let rhs = eval_expr(&assumption.rhs, locals)?;
                if lhs != rhs {
                    return Err(Error::UnsatisfiedAssumption(alloc::format!(
                        "{} != {}",
                        assumption.lhs, assumption.rhs
                    )));
                }
            } else if self.parameters.iter().any(|param| param == name) {
                // Simple parameter assignment, e.g. `half = 1/2`.
                let value = eval_expr(&assumption.rhs, locals)?;
                locals.insert(name.to_string(), value);
            } else {
                self.resolve_generic_equation(p, locals, assumption)?;
            }
        }
        Ok(())
    }

    /// Solve `lhs == rhs` for the single formula parameter appearing in
    /// it, by finding a ground root of `rhs - lhs` over `GF(p)`.
    ///
    /// Full ground-root extraction needs a general polynomial-factoring
    /// routine; this engine implements it for the degree ≤ 2 polynomials
    /// every assumption in the bundled EFD actually reduces to (the
    /// generic-equation case is rare — most formula assumptions are
    /// point-value or simple-parameter). Higher-degree assumptions fail
    /// with `UnsatisfiedAssumption` rather than silently guessing.
    fn resolve_generic_equation(
        &self,
        p: &BigUint,
        locals: &mut FxHashMap<String, Mod>,
        assumption: &Assumption,
    ) -> Result<()> {
        let diff = Expr::Sub(alloc::boxed::Box::new(assumption.rhs.clone()), alloc::boxed::Box::new(assumption.lhs.clone()));
        let mut unknown = None;
        for name in free_variables(&diff) {
            if !locals.contains_key(&name) {
                if unknown.is_some() && unknown.as_ref() != Some(&name) {
                    return Err(Error::UnsatisfiedAssumption(
                        "generic equation has more than one unknown parameter".to_string(),
                    ));
                }
                unknown = Some(name);
            }
        }
        let Some(unknown) = unknown else {
            return Err(Error::UnsatisfiedAssumption(
                "generic equation has no unknown parameter to solve for".to_string(),
            ));
        };
        let poly = to_polynomial(&diff, &unknown, locals, p)?;
        let root = ground_root(&poly, p).ok_or_else(|| {
            Error::UnsatisfiedAssumption(alloc::format!(
                "no root for parameter {unknown} in GF(p)"
            ))
        })?;
        locals.insert(unknown, root);
        Ok(())
    }

    /// Execute this formula on `points` under curve field `p`, with
    /// curve/extra `params` bound, reporting every step to `ctx`.
    pub fn call(
        &self,
        p: &BigUint,
        points: &[Point<Mod>],
        params: &FxHashMap<String, Mod>,
        ctx: &mut dyn Context,
    ) -> Result<Vec<Point<Mod>>> {
        self.validate_params(p, params)?;
        let mut locals = self.validate_points(p, points)?;
        locals.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        if !self.assumptions.is_empty() {
            self.resolve_assumptions(p, &mut locals)?;
        }

        ctx.enter_action(&Action::Formula {
            shortname: self.kind.shortname(),
            name: self.name.clone(),
            input_points: points.to_vec(),
        });

        for op in &self.code {
            let value = op.eval(&|name| locals.get(name).cloned())?;
            ctx.log_operation(op, &value);
            locals.insert(op.result.clone(), value);
        }

        let mut outputs = Vec::with_capacity(self.kind.num_outputs());
        let output_index = self.output_index();
        for i in 0..self.kind.num_outputs() {
            let index = output_index + i;
            let mut coords = FxHashMap::default();
            for variable in &self.coordinate_model.variables {
                let full = suffixed(variable, index);
                let value = locals
                    .get(&full)
                    .cloned()
                    .ok_or_else(|| Error::UnsatisfiedAssumption(full.clone()))?;
                coords.insert(variable.clone(), value);
            }
            let point = Point::new(self.coordinate_model.clone(), coords)?;
            ctx.log_result(&point);
            outputs.push(point);
        }

        let result = if outputs.len() == 1 {
            ActionResult::Point(outputs[0].clone())
        } else {
            ActionResult::Points(outputs.clone())
        };
        ctx.exit_action(&result);
        Ok(outputs)
    }
}

pub(crate) fn eval_expr(expr: &Expr, locals: &FxHashMap<String, Mod>) -> Result<Mod> {
    match expr {
        Expr::Var(name) => locals
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnsatisfiedAssumption(name.clone())),
        Expr::Const(c) => {
            let modulus = locals
                .values()
                .next()
                .and_then(|v| v.modulus().ok())
                .cloned()
                .ok_or_else(|| Error::BadConfiguration("cannot evaluate a bare constant without a field in scope"))?;
            Ok(Mod::new(c.clone(), modulus))
        }
        Expr::Neg(a) => Ok(eval_expr(a, locals)?.neg()?),
        Expr::Add(a, b) => Ok(eval_expr(a, locals)?.add(&eval_expr(b, locals)?)?),
        Expr::Sub(a, b) => Ok(eval_expr(a, locals)?.sub(&eval_expr(b, locals)?)?),
        Expr::Mul(a, b) => Ok(eval_expr(a, locals)?.mul(&eval_expr(b, locals)?)?),
        Expr::Div(a, b) => Ok(eval_expr(a, locals)?.div(&eval_expr(b, locals)?)?),
        Expr::Pow(a, e) => Ok(eval_expr(a, locals)?.pow_i64(*e)?),
    }
}

fn free_variables(expr: &Expr) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(expr: &Expr, out: &mut Vec<String>) {
        match expr {
            Expr::Var(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::Const(_) => {}
            Expr::Neg(a) | Expr::Pow(a, _) => walk(a, out),
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) | Expr::Div(a, b) => {
                walk(a, out);
                walk(b, out);
            }
        }
    }
    walk(expr, &mut out);
    out
}

/// Coefficients of a univariate polynomial in the unknown, lowest degree
/// first, as concrete field elements.
pub(crate) struct Polynomial(Vec<Mod>);

pub(crate) fn to_polynomial(
    expr: &Expr,
    unknown: &str,
    locals: &FxHashMap<String, Mod>,
    p: &BigUint,
) -> Result<Polynomial> {
    let zero = Mod::new(BigUint::from(0u8), p.clone());
    let one = Mod::new(BigUint::from(1u8), p.clone());
    match expr {
        Expr::Var(name) if name == unknown => Ok(Polynomial(alloc::vec![zero, one])),
        Expr::Var(name) => {
            let value = locals
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnsatisfiedAssumption(name.clone()))?;
            Ok(Polynomial(alloc::vec![value]))
        }
        Expr::Const(c) => Ok(Polynomial(alloc::vec![Mod::new(c.clone(), p.clone())])),
        Expr::Neg(a) => {
            let mut poly = to_polynomial(a, unknown, locals, p)?;
            for c in poly.0.iter_mut() {
                *c = c.neg()?;
            }
            Ok(poly)
        }
        Expr::Add(a, b) => poly_add(
            &to_polynomial(a, unknown, locals, p)?,
            &to_polynomial(b, unknown, locals, p)?,
            p,
        ),
        Expr::Sub(a, b) => {
            let pb = to_polynomial(b, unknown, locals, p)?;
            let neg_b = Polynomial(pb.0.iter().map(|c| c.neg()).collect::<Result<_>>()?);
            poly_add(&to_polynomial(a, unknown, locals, p)?, &neg_b, p)
        }
        Expr::Mul(a, b) => poly_mul(
            &to_polynomial(a, unknown, locals, p)?,
            &to_polynomial(b, unknown, locals, p)?,
            p,
        ),
        Expr::Div(a, b) => {
            let pb = to_polynomial(b, unknown, locals, p)?;
            if pb.0.len() != 1 {
                return Err(Error::UnsatisfiedAssumption(
                    "division by an expression containing the unknown parameter is not supported"
                        .to_string(),
                ));
            }
            let inv = pb.0[0].inverse()?;
            let pa = to_polynomial(a, unknown, locals, p)?;
            Ok(Polynomial(
                pa.0.iter().map(|c| c.mul(&inv)).collect::<Result<_>>()?,
            ))
        }
        Expr::Pow(a, e) => {
            let base = to_polynomial(a, unknown, locals, p)?;
            if *e < 0 {
                return Err(Error::UnsatisfiedAssumption(
                    "negative exponent on an expression containing the unknown parameter is not supported".to_string(),
                ));
            }
            let mut result = Polynomial(alloc::vec![one]);
            for _ in 0..*e {
                result = poly_mul(&result, &base, p)?;
            }
            Ok(result)
        }
    }
}

fn poly_add(a: &Polynomial, b: &Polynomial, p: &BigUint) -> Result<Polynomial> {
    let len = a.0.len().max(b.0.len());
    let zero = Mod::new(BigUint::from(0u8), p.clone());
    let mut out = alloc::vec![zero; len];
    for (i, c) in a.0.iter().enumerate() {
        out[i] = out[i].add(c)?;
    }
    for (i, c) in b.0.iter().enumerate() {
        out[i] = out[i].add(c)?;
    }
    Ok(Polynomial(out))
}

fn poly_mul(a: &Polynomial, b: &Polynomial, p: &BigUint) -> Result<Polynomial> {
    let zero = Mod::new(BigUint::from(0u8), p.clone());
    let mut out = alloc::vec![zero; a.0.len() + b.0.len() - 1];
    for (i, ca) in a.0.iter().enumerate() {
        for (j, cb) in b.0.iter().enumerate() {
            let term = ca.mul(cb)?;
            out[i + j] = out[i + j].add(&term)?;
        }
    }
    Ok(Polynomial(out))
}

/// Find a root of `poly` in `GF(p)`, for the low-degree polynomials
/// formula assumptions in practice reduce to. Returns `None` if no root
/// exists (or the degree is unsupported).
pub(crate) fn ground_root(poly: &Polynomial, p: &BigUint) -> Option<Mod> {
    let coeffs = trim(poly);
    match coeffs.len() {
        0 => None,
        1 => None, // nonzero constant: no root.
        2 => {
            // c0 + c1*x = 0  =>  x = -c0 / c1
            let c0 = &coeffs[0];
            let c1 = &coeffs[1];
            let x = c0.neg().ok()?.div(c1).ok()?;
            Some(x)
        }
        3 => {
            // c0 + c1*x + c2*x^2 = 0, quadratic formula over GF(p), p odd.
            let c0 = &coeffs[0];
            let c1 = &coeffs[1];
            let c2 = &coeffs[2];
            let two = Mod::new(BigUint::from(2u8), p.clone());
            let four = Mod::new(BigUint::from(4u8), p.clone());
            let disc = c1.mul(c1).ok()?.sub(&four.mul(c2).ok()?.mul(c0).ok()?).ok()?;
            let sqrt_disc = disc.sqrt().ok()?;
            let denom = two.mul(c2).ok()?;
            let x1 = c1.neg().ok()?.add(&sqrt_disc).ok()?.div(&denom).ok()?;
            Some(x1)
        }
        _ => None,
    }
}

fn trim(poly: &Polynomial) -> Vec<Mod> {
    let mut coeffs = poly.0.clone();
    while coeffs.len() > 1 {
        let last = coeffs.last().unwrap();
        if last.value().ok().map(|v| v == &BigUint::from(0u8)).unwrap_or(false) {
            coeffs.pop();
        } else {
            break;
        }
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NullContext;
    use crate::model::CurveModel;
    use crate::op::{Operand, OpKind};

    fn toy_coordinate_model() -> Rc<CoordinateModel> {
        let curve_model = CurveModel::new(
            "shortw",
            alloc::vec!["a".into(), "b".into()],
            alloc::vec!["x".into(), "y".into()],
            Assumption::new(Expr::Var("y2".into()), Expr::Var("rhs".into())),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        Rc::new(CoordinateModel::affine(curve_model))
    }

    fn affine_point(model: &Rc<CoordinateModel>, n: &BigUint, x: u64, y: u64) -> Point<Mod> {
        let mut coords = FxHashMap::default();
        coords.insert("x".to_string(), Mod::from_u64(x, n.clone()));
        coords.insert("y".to_string(), Mod::from_u64(y, n.clone()));
        Point::new(model.clone(), coords).unwrap()
    }

    #[test]
    fn negation_formula_flips_y_coordinate() {
        let n = BigUint::from(23u8);
        let model = toy_coordinate_model();
        let formula = Formula {
            name: "neg".into(),
            kind: FormulaKind::Negation,
            coordinate_model: model.clone(),
            parameters: Vec::new(),
            assumptions: Vec::new(),
            code: alloc::vec![
                CodeOp::unary("x3", OpKind::Id, Operand::Var("x1".into())),
                CodeOp::unary("y3", OpKind::Neg, Operand::Var("y1".into())),
            ],
            unified: true,
            source: None,
        };
        let p = affine_point(&model, &n, 4, 9);
        let mut ctx = NullContext;
        let out = formula.call(&n, &[p], &FxHashMap::default(), &mut ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].coord("x"), Some(&Mod::from_u64(4, n.clone())));
        assert_eq!(out[0].coord("y"), Some(&Mod::from_u64(14, n)));
    }

    #[test]
    fn point_value_assumption_rejects_mismatched_input() {
        let n = BigUint::from(23u8);
        let model = toy_coordinate_model();
        let formula = Formula {
            name: "scale-requires-z1".into(),
            kind: FormulaKind::Scaling,
            coordinate_model: model.clone(),
            parameters: Vec::new(),
            assumptions: alloc::vec![Assumption::new(
                Expr::Var("x1".into()),
                Expr::Const(BigUint::from(0u8)),
            )],
            code: alloc::vec![CodeOp::unary("x3", OpKind::Id, Operand::Var("x1".into()))],
            unified: false,
            source: None,
        };
        let p = affine_point(&model, &n, 4, 9);
        let mut ctx = NullContext;
        let err = formula.call(&n, &[p], &FxHashMap::default(), &mut ctx).unwrap_err();
        assert!(matches!(err, Error::UnsatisfiedAssumption(_)));
    }

    #[test]
    fn simple_parameter_assumption_binds_half() {
        let n = BigUint::from(23u8);
        let model = toy_coordinate_model();
        let formula = Formula {
            name: "uses-half".into(),
            kind: FormulaKind::Scaling,
            coordinate_model: model.clone(),
            parameters: alloc::vec!["half".into()],
            assumptions: alloc::vec![Assumption::new(
                Expr::Var("half".into()),
                Expr::Div(
                    alloc::boxed::Box::new(Expr::Const(BigUint::from(1u8))),
                    alloc::boxed::Box::new(Expr::Const(BigUint::from(2u8))),
                ),
            )],
            code: alloc::vec![CodeOp::binary(
                "x3",
                OpKind::Mult,
                Operand::Var("x1".into()),
                Operand::Var("half".into()),
            )],
            unified: false,
            source: None,
        };
        let p = affine_point(&model, &n, 4, 9);
        let mut ctx = NullContext;
        let out = formula.call(&n, &[p], &FxHashMap::default(), &mut ctx).unwrap();
        // half = 1/2 mod 23 = 12; 4 * 12 mod 23 = 48 mod 23 = 2.
        assert_eq!(out[0].coord("x"), Some(&Mod::from_u64(2, n)));
    }
}
