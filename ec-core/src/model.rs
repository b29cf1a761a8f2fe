//! `CurveModel` and `CoordinateModel`: the named algebraic shapes a
//! [`crate::curve::EllipticCurve`] is built from (spec.md §3).
//!
//! Grounded on `examples/original_source/pyecsca/ec/model.py` and
//! `coordinates.py`: there, `EFDCurveModel`/`EFDCoordinateModel` are lazily
//! populated by walking the bundled EFD resource tree at import time. We
//! keep the same field shape but load eagerly from `crate::db` and hold the
//! result behind an `Rc` so every `CoordinateModel`/`EllipticCurve` sharing
//! a curve model shares one allocation, the way `Rc<Py<CurveModel>>`
//! aliasing works in the original.

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use modfield::symbolic::Expr;

use crate::op::CodeOp;

/// An equality constraint: `lhs == rhs`, or (when used to define a free
/// parameter) `lhs := rhs`. Used both for a formula's assumptions and for
/// a coordinate model's defining relations (spec.md §3, §4.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assumption {
    /// Left-hand side.
    pub lhs: Expr,
    /// Right-hand side.
    pub rhs: Expr,
}

impl Assumption {
    /// Build an assumption `lhs == rhs`.
    pub fn new(lhs: Expr, rhs: Expr) -> Self {
        Assumption { lhs, rhs }
    }

    /// Name of the single variable this assumption would define, if its
    /// left-hand side is a bare variable (the "simple parameter
    /// assignment" shape of spec.md §4.2 step 3).
    pub fn defines(&self) -> Option<&str> {
        match &self.lhs {
            Expr::Var(name) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// The named algebraic form of a curve: short Weierstrass, Montgomery,
/// (twisted) Edwards, etc.
///
/// Binds the form's free parameter names, its affine coordinate variable
/// names, its defining equation, and the canonical affine add/double/
/// negate/neutral straight-line code every coordinate model under this
/// form must agree with. Immutable once built, matching pyecsca's
/// `EFDCurveModel` which is populated once per class from the bundled EFD
/// tree and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurveModel {
    /// Name of the form, e.g. `"shortw"`, `"montgom"`, `"edwards"`,
    /// `"twisted"`.
    pub name: String,
    /// Free parameter names (e.g. `["a", "b"]` for short Weierstrass).
    pub parameter_names: Vec<String>,
    /// Affine coordinate variable names (e.g. `["x", "y"]`).
    pub coordinate_names: Vec<String>,
    /// The curve equation, e.g. `y^2 = x^3 + a*x + b`.
    pub equation: Assumption,
    /// Canonical affine addition code.
    pub base_addition: Vec<CodeOp>,
    /// Canonical affine doubling code.
    pub base_doubling: Vec<CodeOp>,
    /// Canonical affine negation code.
    pub base_negation: Vec<CodeOp>,
    /// Canonical affine neutral-point code.
    pub base_neutral: Vec<CodeOp>,
}

impl CurveModel {
    /// Construct a curve model. Typically produced by `crate::db`'s loader
    /// from the bundled EFD assets rather than called directly.
    pub fn new(
        name: impl Into<String>,
        parameter_names: Vec<String>,
        coordinate_names: Vec<String>,
        equation: Assumption,
        base_addition: Vec<CodeOp>,
        base_doubling: Vec<CodeOp>,
        base_negation: Vec<CodeOp>,
        base_neutral: Vec<CodeOp>,
    ) -> Rc<Self> {
        Rc::new(CurveModel {
            name: name.into(),
            parameter_names,
            coordinate_names,
            equation,
            base_addition,
            base_doubling,
            base_negation,
            base_neutral,
        })
    }
}

/// A coordinate system for a particular [`CurveModel`].
///
/// Names the variables the system introduces beyond the affine `x, y`
/// (e.g. projective `X, Y, Z`), any extra parameters it introduces, the
/// assumptions relating it back to the affine form, and the (possibly
/// parameter-dependent) neutral-point coordinates. Formulas are looked up
/// by shortname from `crate::db`, not stored inline here — spec.md §6
/// treats the EFD asset tree itself as the source of truth, so a
/// `CoordinateModel` is a lightweight handle plus metadata rather than an
/// owner of every formula.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinateModel {
    /// Short name, e.g. `"jacobian"`, `"projective"`, `"affine"`.
    pub name: String,
    /// Human-readable name.
    pub full_name: String,
    /// The curve model this coordinate system belongs to.
    pub curve_model: Rc<CurveModel>,
    /// Variable names this coordinate system uses (includes the affine
    /// names plus any extras, e.g. `["X", "Y", "Z"]`).
    pub variables: Vec<String>,
    /// Extra parameters this coordinate system introduces beyond the
    /// curve model's own (e.g. a twist constant).
    pub parameters: Vec<String>,
    /// Assumptions relating this system back to the affine form and
    /// defining its extra parameters.
    pub assumptions: Vec<Assumption>,
    /// Code computing the neutral point's coordinates in this system.
    pub neutral: Vec<CodeOp>,
}

impl CoordinateModel {
    /// The universal degenerate case: plain affine `(x, y)` coordinates,
    /// with no extra parameters or assumptions. Every `CurveModel` has
    /// exactly one of these (pyecsca's `AffineCoordinateModel`).
    pub fn affine(curve_model: Rc<CurveModel>) -> Self {
        CoordinateModel {
            name: "affine".into(),
            full_name: "Affine coordinates".into(),
            curve_model,
            variables: alloc::vec!["x".into(), "y".into()],
            parameters: Vec::new(),
            assumptions: Vec::new(),
            neutral: Vec::new(),
        }
    }

    /// Whether this is the universal affine coordinate model.
    pub fn is_affine(&self) -> bool {
        self.name == "affine"
    }
}
