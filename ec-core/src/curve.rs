//! `EllipticCurve` and `DomainParameters` (spec.md §3).
//!
//! Grounded in *contract* on `examples/original_source/pyecsca/ec/curve.py`
//! and `params.py`'s `EllipticCurve`/`DomainParameters` classes, and in
//! *shape* on `weierstrass/src/affine.rs`'s affine add/double/negate
//! methods — generalized here to execute a `CurveModel`'s canonical affine
//! code (`base_addition`/`base_doubling`/...) directly via `CodeOp::eval`
//! instead of a compiled-in formula, since the curve model is chosen at
//! runtime.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use num_bigint::BigUint;
use rand_core::{CryptoRng, RngCore};
use rustc_hash::FxHashMap;

use modfield::symbolic::Expr;
use modfield::Mod;

use crate::context::{Action, ActionResult, Context, NullContext};
use crate::error::{Error, Result};
use crate::formula::{eval_expr, ground_root, to_polynomial};
use crate::model::{CoordinateModel, CurveModel};
use crate::point::Point;

/// An elliptic curve: a curve model and coordinate system instantiated
/// over a concrete prime field, with its parameters bound and its neutral
/// point fixed.
#[derive(Clone, Debug)]
pub struct EllipticCurve {
    /// The algebraic form.
    pub model: Rc<CurveModel>,
    /// The coordinate system points on this curve are represented in.
    pub coordinate_model: Rc<CoordinateModel>,
    /// The field's prime modulus.
    pub p: BigUint,
    /// Curve parameter name → value (e.g. `a`, `b` for short Weierstrass).
    pub parameters: FxHashMap<String, Mod>,
    /// The neutral element, in `coordinate_model`.
    pub neutral: Point<Mod>,
}

impl EllipticCurve {
    /// Build a curve, checking that `parameters` matches the curve
    /// model's declared free parameters exactly and that `neutral` is
    /// expressed in `coordinate_model`.
    pub fn new(
        model: Rc<CurveModel>,
        coordinate_model: Rc<CoordinateModel>,
        p: BigUint,
        parameters: FxHashMap<String, Mod>,
        neutral: Point<Mod>,
    ) -> Result<Self> {
        if !Rc::ptr_eq(&coordinate_model.curve_model, &model) && coordinate_model.curve_model != model {
            return Err(Error::InputMismatch);
        }
        let declared: alloc::collections::BTreeSet<&str> =
            model.parameter_names.iter().map(String::as_str).collect();
        let given: alloc::collections::BTreeSet<&str> = parameters.keys().map(String::as_str).collect();
        if declared != given {
            return Err(Error::InputMismatch);
        }
        if neutral.coordinate_model() != &coordinate_model {
            return Err(Error::InputMismatch);
        }
        Ok(EllipticCurve {
            model,
            coordinate_model,
            p,
            parameters,
            neutral,
        })
    }

    fn affine_locals(&self, point: &Point<Mod>, index: usize) -> Result<FxHashMap<String, Mod>> {
        let mut locals = FxHashMap::default();
        for name in &self.model.coordinate_names {
            let value = point.coord(name).ok_or(Error::InputMismatch)?;
            locals.insert(crate::point::suffixed(name, index), value.clone());
        }
        Ok(locals)
    }

    fn run_code(
        &self,
        code: &[crate::op::CodeOp],
        mut locals: FxHashMap<String, Mod>,
    ) -> Result<FxHashMap<String, Mod>> {
        locals.extend(self.parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
        for op in code {
            let value = op.eval(&|name| locals.get(name).cloned())?;
            locals.insert(op.result.clone(), value);
        }
        Ok(locals)
    }

    fn affine_point_from(&self, locals: &FxHashMap<String, Mod>, index: usize) -> Result<Point<Mod>> {
        let mut coords = FxHashMap::default();
        for name in &self.model.coordinate_names {
            let full = crate::point::suffixed(name, index);
            let value = locals
                .get(&full)
                .cloned()
                .ok_or_else(|| Error::UnsatisfiedAssumption(full.clone()))?;
            coords.insert(name.clone(), value);
        }
        Point::new(self.coordinate_model.clone(), coords)
    }

    /// Affine point addition via the curve model's canonical addition
    /// code, short-circuiting on either input being the neutral element.
    pub fn add(&self, p1: &Point<Mod>, p2: &Point<Mod>) -> Result<Point<Mod>> {
        if p1.is_infinity() {
            return Ok(p2.clone());
        }
        if p2.is_infinity() {
            return Ok(p1.clone());
        }
        if p1.equals(p2) {
            return self.double(p1);
        }
        let mut locals = self.affine_locals(p1, 1)?;
        locals.extend(self.affine_locals(p2, 2)?);
        let locals = self.run_code(&self.model.base_addition, locals)?;
        self.affine_point_from(&locals, 3)
    }

    /// Affine point doubling via the curve model's canonical doubling
    /// code.
    pub fn double(&self, point: &Point<Mod>) -> Result<Point<Mod>> {
        if point.is_infinity() {
            return Ok(point.clone());
        }
        let locals = self.affine_locals(point, 1)?;
        let locals = self.run_code(&self.model.base_doubling, locals)?;
        self.affine_point_from(&locals, 3)
    }

    /// Affine point negation via the curve model's canonical negation
    /// code.
    pub fn neg(&self, point: &Point<Mod>) -> Result<Point<Mod>> {
        if point.is_infinity() {
            return Ok(point.clone());
        }
        let locals = self.affine_locals(point, 1)?;
        let locals = self.run_code(&self.model.base_negation, locals)?;
        self.affine_point_from(&locals, 3)
    }

    /// Scalar multiplication via naive left-to-right double-and-add over
    /// this curve's own affine formulas. This is a reference
    /// implementation for verification and testing; `ec-mult` provides
    /// the configurable, side-channel-relevant multipliers spec.md §4.4
    /// describes.
    pub fn multiply(&self, point: &Point<Mod>, scalar: &BigUint) -> Result<Point<Mod>> {
        self.multiply_traced(point, scalar, &mut NullContext)
    }

    /// As [`EllipticCurve::multiply`], reporting the multiplication to
    /// `ctx`.
    pub fn multiply_traced(
        &self,
        point: &Point<Mod>,
        scalar: &BigUint,
        ctx: &mut dyn Context,
    ) -> Result<Point<Mod>> {
        ctx.enter_action(&Action::ScalarMultiplication {
            point: point.clone(),
            scalar: scalar.clone(),
        });
        let mut acc = self.neutral.clone();
        for bit in (0..scalar.bits()).rev() {
            acc = self.double(&acc)?;
            if scalar.bit(bit) {
                acc = self.add(&acc, point)?;
            }
        }
        ctx.exit_action(&ActionResult::Point(acc.clone()));
        Ok(acc)
    }

    /// Sample a uniformly random point on the curve: draw a random affine
    /// `x`, solve the curve equation for `y`, and retry on non-residues.
    /// Works for any curve model whose equation has exactly one side
    /// computable from `x` and the curve parameters alone (true of every
    /// bundled EFD curve model - the other side is the one solved for `y`).
    pub fn random_point(&self, rng: &mut (impl CryptoRng + RngCore)) -> Result<Point<Mod>> {
        loop {
            let x = Mod::random(self.p.clone(), &mut *rng);
            let mut locals = self.parameters.clone();
            locals.insert("x".to_string(), x.clone());
            let (known, unknown_side) = match eval_expr(&self.model.equation.rhs, &locals) {
                Ok(value) => (value, &self.model.equation.lhs),
                Err(_) => (
                    eval_expr(&self.model.equation.lhs, &locals)?,
                    &self.model.equation.rhs,
                ),
            };
            let diff = Expr::Sub(
                Box::new(unknown_side.clone()),
                Box::new(Expr::Const(known.value()?.clone())),
            );
            let poly = to_polynomial(&diff, "y", &locals, &self.p)?;
            if let Some(y) = ground_root(&poly, &self.p) {
                let mut coords = FxHashMap::default();
                coords.insert("x".to_string(), x);
                coords.insert("y".to_string(), y);
                return Point::new(self.coordinate_model.clone(), coords);
            }
        }
    }
}

/// Domain parameters: a curve, its generator, subgroup order, cofactor,
/// and optional human-readable identity (spec.md §3).
#[derive(Clone, Debug)]
pub struct DomainParameters {
    /// The underlying curve.
    pub curve: Rc<EllipticCurve>,
    /// The generator (base point) of the subgroup.
    pub generator: Point<Mod>,
    /// Subgroup order `n`.
    pub order: BigUint,
    /// Cofactor `h`.
    pub cofactor: BigUint,
    /// Name, if from a standard database.
    pub name: Option<String>,
    /// Category, if from a standard database.
    pub category: Option<String>,
}

impl DomainParameters {
    /// `n * h`: the full order of the generator's containing group.
    pub fn full_order(&self) -> BigUint {
        &self.order * &self.cofactor
    }

    /// Identity string used for display: `"category/name"`, one of the
    /// two if only one is set, or empty.
    pub fn label(&self) -> String {
        match (&self.category, &self.name) {
            (Some(category), Some(name)) => alloc::format!("{category}/{name}"),
            (Some(category), None) => category.clone(),
            (None, Some(name)) => name.clone(),
            (None, None) => String::new(),
        }
    }
}
